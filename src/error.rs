// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error taxonomy shared by the store, inserter, converter and backfill

use std::path::PathBuf;

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the versions library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An input or store line is not valid JSON or breaks the record schema
    #[error("malformed record in {source_name} line {line}: {reason}")]
    MalformedRecord {
        /// Input stream or store file the line came from
        source_name: String,
        /// 1-based line number
        line: usize,
        /// Every problem found on the line
        reason: String,
    },

    /// A version string is not a semantic version
    #[error("invalid version {version:?} in {source_name} line {line}: {reason}")]
    InvalidVersion {
        /// The offending version string
        version: String,
        /// Input stream, store file or release host the version came from
        source_name: String,
        /// 1-based line number (0 when not line oriented)
        line: usize,
        /// Parser message
        reason: String,
    },

    /// The store directory belongs to a schema version this build does not understand
    #[error("schema version mismatch in {}: found v{found}, expected v{expected}", dir.display())]
    SchemaVersionMismatch {
        /// Store directory
        dir: PathBuf,
        /// Version found on disk
        found: u32,
        /// Version understood by this build
        expected: u32,
    },

    /// The digest of an artifact could not be retrieved
    #[error("checksum unavailable for {url}")]
    ChecksumUnavailable {
        /// Artifact download URL
        url: String,
    },

    /// The release host failed or answered with something unusable
    #[error("external host error while {context}: {reason}")]
    ExternalHostError {
        /// What was being requested
        context: String,
        /// Transport or API failure
        reason: String,
    },

    /// A release has no platform archives to record
    #[error("release {version} has no platform archives")]
    MissingArtifacts {
        /// Release version or tag
        version: String,
    },

    /// A build plan document could not be mapped to a record
    #[error("malformed build plan: {0}")]
    MalformedPlan(String),

    /// A store file on disk is not sorted in one direction or repeats a version
    #[error("store {} is not consistently ordered: {reason}", path.display())]
    InconsistentStore {
        /// Store file
        path: PathBuf,
        /// Every ordering or uniqueness problem found
        reason: String,
    },

    /// The store manifest could not be read or written
    #[error("store manifest error: {0}")]
    Manifest(String),

    /// A project name cannot be used as a store file name
    #[error("invalid project name {0:?}")]
    InvalidProjectName(String),

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record serialization failed
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error concerns one item of a batch and may be skipped
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ChecksumUnavailable { .. }
                | Self::ExternalHostError { .. }
                | Self::InvalidVersion { .. }
                | Self::MissingArtifacts { .. }
        )
    }
}
