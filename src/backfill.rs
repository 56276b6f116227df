// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Backfill - records for hosted releases missing from a store
//!
//! Releases that cannot be resolved are reported and skipped; only a
//! failure to list releases at all ends the run.

use crate::error::{Error, Result};
use crate::host::{DigestSource, HostRelease, ReleaseHost, RepoSlug};
use crate::plan::{artifact_platform, sort_artifacts};
use crate::store::RecordStore;
use crate::types::{Artifact, ReleaseRecord, DEFAULT_VARIANT};
use crate::version;
use tracing::{debug, info, warn};

/// A release that was not synthesized
#[derive(Debug)]
pub struct Skipped {
    /// Release tag
    pub tag: String,
    /// Why it was skipped
    pub error: Error,
}

/// Outcome of a backfill run
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// Synthesized records, oldest release first
    pub records: Vec<ReleaseRecord>,
    /// Releases that could not be resolved
    pub skipped: Vec<Skipped>,
    /// Releases already present in the store
    pub present: usize,
}

/// What to backfill
#[derive(Debug, Clone)]
pub struct BackfillRequest {
    /// Repository hosting the releases
    pub repo: RepoSlug,
    /// App name prefixing artifact file names
    pub app: String,
    /// Stop after this many synthesized records
    pub limit: Option<usize>,
}

/// Synthesize records for every hosted release absent from `store`
pub fn run(
    store: &RecordStore,
    host: &dyn ReleaseHost,
    digests: &dyn DigestSource,
    request: &BackfillRequest,
) -> Result<BackfillReport> {
    let releases = host.releases(&request.repo)?;
    info!("{} lists {} releases", request.repo, releases.len());

    let mut report = BackfillReport::default();

    // Hosts list newest first.
    for release in releases.iter().rev() {
        if request.limit.is_some_and(|limit| report.records.len() >= limit) {
            debug!("Limit reached; stopping before {}", release.tag);
            break;
        }

        if store.contains(&release.tag) {
            report.present += 1;
            continue;
        }

        match synthesize(release, digests, request) {
            Ok(record) => {
                info!("Synthesized {} with {} artifacts", record.version, record.artifacts.len());
                report.records.push(record);
            }
            Err(error) if error.is_recoverable() => {
                warn!("Skipping {}: {}", release.tag, error);
                report.skipped.push(Skipped {
                    tag: release.tag.clone(),
                    error,
                });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(report)
}

/// Build a record for one hosted release
///
/// Digests published by the host on the asset win over the companion
/// checksum file.
pub fn synthesize(
    release: &HostRelease,
    digests: &dyn DigestSource,
    request: &BackfillRequest,
) -> Result<ReleaseRecord> {
    version::parse(&release.tag, &request.repo.to_string(), 0)?;

    let date = release
        .date()
        .filter(|d| chrono::DateTime::parse_from_rfc3339(d).is_ok())
        .ok_or_else(|| Error::ExternalHostError {
            context: format!("reading release {}", release.tag),
            reason: "release has no valid publication date".to_string(),
        })?;

    let mut artifacts = Vec::new();
    for asset in &release.assets {
        let Some((platform, archive_format)) = artifact_platform(&request.app, &asset.name) else {
            continue;
        };

        let sha256 = match asset.sha256() {
            Some(digest) => digest,
            None => digests
                .sha256(&asset.download_url)?
                .ok_or_else(|| Error::ChecksumUnavailable {
                    url: asset.download_url.clone(),
                })?,
        };

        artifacts.push(Artifact {
            platform,
            variant: DEFAULT_VARIANT.to_string(),
            url: asset.download_url.clone(),
            archive_format,
            sha256,
        });
    }

    if artifacts.is_empty() {
        return Err(Error::MissingArtifacts {
            version: release.tag.clone(),
        });
    }

    sort_artifacts(&mut artifacts);

    Ok(ReleaseRecord {
        version: release.tag.clone(),
        date: date.to_string(),
        artifacts,
    })
}
