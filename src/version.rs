// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Semantic version parsing and store ordering

use crate::error::{Error, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parse a version string, tolerating a single leading `v`
///
/// The original string stays the record key; only precedence uses the
/// parsed value.
pub fn parse(version: &str, source_name: &str, line: usize) -> Result<Version> {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    Version::parse(trimmed).map_err(|e| Error::InvalidVersion {
        version: version.to_string(),
        source_name: source_name.to_string(),
        line,
        reason: e.to_string(),
    })
}

/// Total order used by stores
///
/// Precedence follows semver (pre-releases before the release). Build
/// metadata does not affect precedence; it only breaks ties so the order is
/// total.
#[must_use]
pub fn compare(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre)
        .cmp(&(b.major, b.minor, b.patch, &b.pre))
        .then_with(|| a.build.cmp(&b.build))
}

/// Direction a store is kept in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreOrder {
    /// Oldest first
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

impl StoreOrder {
    /// Compare two versions in this store's direction
    #[must_use]
    pub fn cmp(self, a: &Version, b: &Version) -> Ordering {
        match self {
            Self::Ascending => compare(a, b),
            Self::Descending => compare(b, a),
        }
    }

    /// The opposite direction
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Name used in manifests and on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

impl fmt::Display for StoreOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascending" | "asc" | "oldest-first" => Ok(Self::Ascending),
            "descending" | "desc" | "newest-first" => Ok(Self::Descending),
            other => Err(format!("unknown store order: {other} (use ascending or descending)")),
        }
    }
}
