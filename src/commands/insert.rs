// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Insert command - merges NDJSON records from stdin into a project's store

use super::{require_piped_stdin, Globals};
use crate::insert::{insert_all, read_candidates, InsertSummary, OrderChoice};
use crate::version::StoreOrder;
use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the insert command
#[derive(Debug, Clone)]
pub struct InsertArgs {
    /// Project name; the store is `<name>.ndjson`
    pub name: String,
    /// Store directory override
    pub output: Option<PathBuf>,
    /// Order for a store created by this run
    pub order: Option<StoreOrder>,
}

/// Run the insert command on stdin
pub fn run(globals: &Globals, args: &InsertArgs) -> Result<()> {
    require_piped_stdin("NDJSON")?;
    let stdin = std::io::stdin();
    run_with(globals, args, stdin.lock()).map(|_| ())
}

/// Run the insert command on any line-oriented input
pub fn run_with<R: BufRead>(globals: &Globals, args: &InsertArgs, input: R) -> Result<InsertSummary> {
    let candidates = read_candidates(input, "stdin").context("Failed to read candidate records")?;
    info!("Read {} candidate records for {}", candidates.len(), args.name);

    let mut dir = globals.store_dir(args.output.as_deref())?;
    let order = OrderChoice {
        requested: args.order,
        default: globals.config.default_order,
    };

    let summary = insert_all(&mut dir, &args.name, candidates, order)
        .with_context(|| format!("Failed to insert versions for {}", args.name))?;

    match (&summary.path, summary.total()) {
        (None, _) => eprintln!("{}", globals.caution("No versions provided on stdin")),
        (Some(path), 1) => {
            let version = summary.inserted.first().or(summary.replaced.first()).map_or("", String::as_str);
            eprintln!("{} version {} into {}", globals.good("Inserted"), version, path.display());
        }
        (Some(path), n) => eprintln!("{} {} versions into {}", globals.good("Inserted"), n, path.display()),
    }
    if !summary.replaced.is_empty() {
        eprintln!("  replaced: {}", summary.replaced.join(", "));
    }

    Ok(summary)
}
