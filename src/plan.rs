// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Build plan conversion
//!
//! Maps the JSON printed by `cargo dist plan --output-format=json` onto a
//! release record. Plans list artifact file names without digests; every
//! digest is resolved through a [`DigestSource`].

use crate::error::{Error, Result};
use crate::host::{DigestSource, RepoSlug};
use crate::types::{Artifact, ArchiveFormat, ReleaseRecord, DEFAULT_VARIANT};
use chrono::{DateTime, SecondsFormat, Utc};
use regex_lite::Regex;
use serde::Deserialize;
use tracing::{debug, info};

/// The parts of a cargo-dist plan used for conversion
#[derive(Debug, Clone, Deserialize)]
pub struct DistPlan {
    /// Tag being released; becomes the record version
    pub announcement_tag: String,
    /// Release notes, which embed download links
    #[serde(default)]
    pub announcement_github_body: Option<String>,
    /// Apps in the release
    #[serde(default)]
    pub releases: Vec<DistRelease>,
}

/// One app of a cargo-dist release
#[derive(Debug, Clone, Deserialize)]
pub struct DistRelease {
    /// Binary/app name, the prefix of its artifact names
    pub app_name: String,
    /// Artifact file names
    #[serde(default)]
    pub artifacts: Vec<String>,
}

/// Settings for [`convert`]
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Base URL of release downloads (`https://github.com`)
    pub download_url: String,
    /// Owner used when the plan does not reveal its repository
    pub default_owner: String,
}

/// Parse a plan document
pub fn parse_plan(text: &str) -> Result<DistPlan> {
    serde_json::from_str(text).map_err(|e| Error::MalformedPlan(e.to_string()))
}

/// Find the released app and the repository hosting its downloads
///
/// The first app of the plan is the one converted. Its repository is taken
/// from the first release download link in the announcement body, else
/// `<default_owner>/<app>`.
pub fn locate(plan: &DistPlan, default_owner: &str) -> Result<(String, RepoSlug)> {
    let app = plan
        .releases
        .first()
        .map(|r| r.app_name.clone())
        .ok_or_else(|| Error::MalformedPlan("no releases found in plan".to_string()))?;

    let link = Regex::new(r"https://github\.com/([^/\s]+)/([^/\s]+)/releases/download/")
        .map_err(|e| Error::MalformedPlan(e.to_string()))?;

    let slug = plan
        .announcement_github_body
        .as_deref()
        .and_then(|body| link.captures(body))
        .map(|caps| RepoSlug::new(&caps[1], &caps[2]))
        .unwrap_or_else(|| RepoSlug::new(default_owner, app.clone()));

    Ok((app, slug))
}

/// Platform and format of a release file, `None` for files that are not
/// platform archives of `app` (checksums, installers, source tarballs)
#[must_use]
pub fn artifact_platform(app: &str, file_name: &str) -> Option<(String, ArchiveFormat)> {
    let rest = file_name.strip_prefix(app)?.strip_prefix('-')?;
    let format = ArchiveFormat::from_filename(rest)?;
    let platform = rest.strip_suffix(format.suffix())?;
    (!platform.is_empty()).then(|| (platform.to_string(), format))
}

/// Download URL of a release file
#[must_use]
pub fn download_url(base: &str, repo: &RepoSlug, tag: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}/releases/download/{tag}/{file_name}",
        base.trim_end_matches('/'),
        repo.owner,
        repo.name
    )
}

/// Timestamp format used for record dates
#[must_use]
pub fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Sort artifacts by `(platform, variant)`
pub fn sort_artifacts(artifacts: &mut [Artifact]) {
    artifacts.sort_by(|a, b| (&a.platform, &a.variant).cmp(&(&b.platform, &b.variant)));
}

/// Convert a plan into a release record dated `date`
///
/// Fails with [`Error::ChecksumUnavailable`] as soon as one artifact has no
/// digest; nothing is emitted for a partially resolved release.
pub fn convert(
    plan: &DistPlan,
    digests: &dyn DigestSource,
    options: &ConvertOptions,
    date: DateTime<Utc>,
) -> Result<ReleaseRecord> {
    let (app, repo) = locate(plan, &options.default_owner)?;
    let tag = &plan.announcement_tag;
    info!("Converting {} {} from {}", app, tag, repo);

    let files = plan
        .releases
        .iter()
        .find(|r| r.app_name == app)
        .map(|r| r.artifacts.as_slice())
        .unwrap_or_default();

    let mut artifacts = Vec::new();
    for file_name in files {
        let Some((platform, archive_format)) = artifact_platform(&app, file_name) else {
            debug!("Skipping {}", file_name);
            continue;
        };

        let url = download_url(&options.download_url, &repo, tag, file_name);
        let sha256 = digests
            .sha256(&url)?
            .ok_or_else(|| Error::ChecksumUnavailable { url: url.clone() })?;

        artifacts.push(Artifact {
            platform,
            variant: DEFAULT_VARIANT.to_string(),
            url,
            archive_format,
            sha256,
        });
    }

    if artifacts.is_empty() {
        return Err(Error::MissingArtifacts { version: tag.clone() });
    }

    sort_artifacts(&mut artifacts);

    Ok(ReleaseRecord {
        version: tag.clone(),
        date: format_date(date),
        artifacts,
    })
}
