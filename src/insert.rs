// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Inserter - merge candidate records into a project's store
//!
//! All candidates are parsed and validated before the store is loaded, and
//! the store is written once after every candidate has been merged. Any
//! local error therefore leaves the store file untouched.

use crate::error::{Error, Result};
use crate::store::{Entry, Insertion, StoreDir};
use crate::version::StoreOrder;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Read NDJSON candidates, one record per non-blank line
///
/// Stops at the first line that is not a valid record.
pub fn read_candidates<R: BufRead>(reader: R, source_name: &str) -> Result<Vec<Entry>> {
    let mut candidates = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(source_name, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        candidates.push(Entry::parse(line, source_name, i + 1)?.detached());
    }

    debug!("Read {} candidates from {}", candidates.len(), source_name);
    Ok(candidates)
}

/// Store order options for an insertion
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderChoice {
    /// Order asked for on the command line, used if the store is new
    pub requested: Option<StoreOrder>,
    /// Order for stores with nothing recorded
    pub default: StoreOrder,
}

/// What an insertion changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertSummary {
    /// Store file that was written; `None` when nothing was written
    pub path: Option<PathBuf>,
    /// Versions added
    pub inserted: Vec<String>,
    /// Versions whose record was replaced
    pub replaced: Vec<String>,
}

impl InsertSummary {
    /// Number of candidates applied
    #[must_use]
    pub fn total(&self) -> usize {
        self.inserted.len() + self.replaced.len()
    }
}

/// Merge `candidates` into the store of `project`, in order, and save it
pub fn insert_all(
    dir: &mut StoreDir,
    project: &str,
    candidates: Vec<Entry>,
    order: OrderChoice,
) -> Result<InsertSummary> {
    if candidates.is_empty() {
        warn!("No versions provided; {} left unchanged", project);
        return Ok(InsertSummary::default());
    }

    let mut store = dir.load_store(project, order.requested, order.default)?;
    let mut summary = InsertSummary::default();

    for candidate in candidates {
        let version = candidate.record.version.clone();
        match store.insert(candidate) {
            Insertion::Inserted { index } => {
                debug!("Inserted {} at position {}", version, index);
                summary.inserted.push(version);
            }
            Insertion::Replaced { index } => {
                info!("Replaced existing record for {} at position {}", version, index);
                summary.replaced.push(version);
            }
        }
    }

    dir.commit(project, &mut store)?;
    summary.path = Some(store.path().to_path_buf());
    Ok(summary)
}
