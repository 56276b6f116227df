// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Versions library - release metadata kept as ordered NDJSON
//!
//! Each project owns one record store: a newline-delimited JSON file with
//! one release record per line, unique by version and ordered by semantic
//! version precedence. The library provides the store itself, the inserter
//! that merges new records into it, and the two producers of new records: a
//! cargo-dist plan converter and a backfill from the release host.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backfill;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod insert;
pub mod plan;
pub mod store;
pub mod version;

pub use error::{Error, Result};

/// Release record types and their validation rules
pub mod types {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use std::fmt;

    // =========================================================================
    // Archive formats
    // =========================================================================

    /// Container format of a downloadable artifact
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub enum ArchiveFormat {
        /// Gzip-compressed tarball
        #[serde(rename = "tar.gz")]
        TarGz,
        /// Zstandard-compressed tarball
        #[serde(rename = "tar.zst")]
        TarZst,
        /// Zip archive
        #[serde(rename = "zip")]
        Zip,
    }

    impl ArchiveFormat {
        /// Every accepted format
        pub const ALL: [Self; 3] = [Self::TarGz, Self::TarZst, Self::Zip];

        /// Name used in records
        #[must_use]
        pub fn as_str(self) -> &'static str {
            match self {
                Self::TarGz => "tar.gz",
                Self::TarZst => "tar.zst",
                Self::Zip => "zip",
            }
        }

        /// File name suffix including the leading dot
        #[must_use]
        pub fn suffix(self) -> &'static str {
            match self {
                Self::TarGz => ".tar.gz",
                Self::TarZst => ".tar.zst",
                Self::Zip => ".zip",
            }
        }

        /// Detect the format from a file name
        #[must_use]
        pub fn from_filename(name: &str) -> Option<Self> {
            Self::ALL.into_iter().find(|f| name.ends_with(f.suffix()))
        }

        /// Parse a record's `archive_format` value
        #[must_use]
        pub fn from_name(name: &str) -> Option<Self> {
            Self::ALL.into_iter().find(|f| f.as_str() == name)
        }
    }

    impl fmt::Display for ArchiveFormat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// One downloadable build output of a release
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Artifact {
        /// Target triple or platform identifier
        pub platform: String,
        /// Build variant label
        pub variant: String,
        /// Download location
        pub url: String,
        /// Archive container format
        pub archive_format: ArchiveFormat,
        /// Lowercase hex SHA-256 of the artifact
        pub sha256: String,
    }

    /// One versioned release entry
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ReleaseRecord {
        /// Semantic version; unique within a store
        pub version: String,
        /// RFC 3339 timestamp with offset
        pub date: String,
        /// Artifacts in the order they were provided
        pub artifacts: Vec<Artifact>,
    }

    impl ReleaseRecord {
        /// Serialize as a single compact NDJSON line (no trailing newline)
        pub fn to_line(&self) -> serde_json::Result<String> {
            serde_json::to_string(self)
        }
    }

    /// Variant label used when a build has a single flavour
    pub const DEFAULT_VARIANT: &str = "default";

    const REQUIRED_ARTIFACT_KEYS: [&str; 5] = ["platform", "variant", "url", "archive_format", "sha256"];

    /// Check a SHA-256 hex digest: 64 lowercase hex characters
    #[must_use]
    pub fn is_sha256_hex(digest: &str) -> bool {
        digest.len() == 64
            && !digest.bytes().any(|b| b.is_ascii_uppercase())
            && hex::decode(digest).is_ok()
    }

    fn non_empty_str(value: Option<&Value>) -> Option<&str> {
        value.and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Validate a decoded JSON line against the record schema
    ///
    /// Returns every problem found; an empty list means the entry is valid.
    #[must_use]
    pub fn validate_entry(entry: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        let Some(obj) = entry.as_object() else {
            errors.push("record is not an object".to_string());
            return errors;
        };

        if non_empty_str(obj.get("version")).is_none() {
            errors.push("missing or empty 'version'".to_string());
        }

        match non_empty_str(obj.get("date")) {
            None => errors.push("missing or empty 'date'".to_string()),
            Some(date) => {
                if chrono::DateTime::parse_from_rfc3339(date).is_err() {
                    errors.push(format!("'date' is not an RFC 3339 timestamp: {date:?}"));
                }
            }
        }

        let artifacts = match obj.get("artifacts").and_then(Value::as_array) {
            Some(a) if !a.is_empty() => a,
            _ => {
                errors.push("missing or empty 'artifacts'".to_string());
                return errors;
            }
        };

        for (i, artifact) in artifacts.iter().enumerate() {
            let Some(artifact) = artifact.as_object() else {
                errors.push(format!("artifact[{i}]: not an object"));
                continue;
            };

            let missing: Vec<&str> = REQUIRED_ARTIFACT_KEYS
                .iter()
                .copied()
                .filter(|k| !artifact.get(*k).is_some_and(Value::is_string))
                .collect();
            if !missing.is_empty() {
                errors.push(format!("artifact[{i}]: missing keys {missing:?}"));
                continue;
            }

            let format = artifact["archive_format"].as_str().unwrap_or_default();
            if ArchiveFormat::from_name(format).is_none() {
                errors.push(format!("artifact[{i}]: invalid archive_format {format:?}"));
            }

            let digest = artifact["sha256"].as_str().unwrap_or_default();
            if !is_sha256_hex(digest) {
                errors.push(format!("artifact[{i}]: sha256 is not 64 lowercase hex characters"));
            }
        }

        errors
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        const DIGEST: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

        fn valid_entry() -> Value {
            json!({
                "version": "1.0.0",
                "date": "2025-01-01T00:00:00+00:00",
                "artifacts": [{
                    "platform": "x86_64-unknown-linux-gnu",
                    "variant": "default",
                    "url": "https://example.com/a.tar.gz",
                    "archive_format": "tar.gz",
                    "sha256": DIGEST,
                }]
            })
        }

        #[test]
        fn test_valid_entry_has_no_errors() {
            assert!(validate_entry(&valid_entry()).is_empty());
        }

        #[test]
        fn test_collects_every_problem() {
            let mut entry = valid_entry();
            entry["version"] = json!("");
            entry["date"] = json!("yesterday");
            entry["artifacts"][0]["archive_format"] = json!("rar");
            let errors = validate_entry(&entry);
            assert_eq!(errors.len(), 3, "{errors:?}");
            assert!(errors[2].contains("invalid archive_format \"rar\""));
        }

        #[test]
        fn test_missing_artifact_keys_are_named() {
            let mut entry = valid_entry();
            entry["artifacts"][0].as_object_mut().unwrap().remove("sha256");
            let errors = validate_entry(&entry);
            assert_eq!(errors, vec!["artifact[0]: missing keys [\"sha256\"]".to_string()]);
        }

        #[test]
        fn test_empty_artifacts_rejected() {
            let mut entry = valid_entry();
            entry["artifacts"] = json!([]);
            assert_eq!(validate_entry(&entry), vec!["missing or empty 'artifacts'".to_string()]);
        }

        #[test]
        fn test_sha256_must_be_lowercase_hex() {
            assert!(is_sha256_hex(DIGEST));
            assert!(!is_sha256_hex(&DIGEST.to_uppercase()));
            assert!(!is_sha256_hex(&DIGEST[..63]));
            assert!(!is_sha256_hex(&"g".repeat(64)));
        }

        #[test]
        fn test_archive_format_from_filename() {
            assert_eq!(ArchiveFormat::from_filename("uv-x86_64-pc-windows-msvc.zip"), Some(ArchiveFormat::Zip));
            assert_eq!(ArchiveFormat::from_filename("uv.tar.zst"), Some(ArchiveFormat::TarZst));
            assert_eq!(ArchiveFormat::from_filename("uv.tar.gz"), Some(ArchiveFormat::TarGz));
            assert_eq!(ArchiveFormat::from_filename("uv-installer.sh"), None);
        }

        #[test]
        fn test_record_line_key_order() {
            let record: ReleaseRecord = serde_json::from_value(valid_entry()).unwrap();
            let line = record.to_line().unwrap();
            assert!(line.starts_with(r#"{"version":"1.0.0","date":"2025-01-01T00:00:00+00:00","artifacts":[{"platform":"#));
            assert!(line.contains(r#""archive_format":"tar.gz","sha256":"#));
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::*;
    pub use crate::version::StoreOrder;
}
