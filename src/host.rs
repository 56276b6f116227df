// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Release host access
//!
//! Conversion and backfill only see the [`DigestSource`] and
//! [`ReleaseHost`] traits; [`GithubClient`] implements both over the GitHub
//! REST API and release downloads.

use crate::config::{GithubConfig, HttpConfig};
use crate::error::{Error, Result};
use crate::types::is_sha256_hex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Releases requested per API page
const PER_PAGE: usize = 100;

// =============================================================================
// Capabilities
// =============================================================================

/// Resolves the SHA-256 digest of a downloadable artifact
pub trait DigestSource {
    /// Digest for the artifact at `url`, `Ok(None)` when the host has none
    fn sha256(&self, url: &str) -> Result<Option<String>>;
}

/// Lists the published releases of a repository
pub trait ReleaseHost {
    /// Every non-draft release, newest first as the host reports them
    fn releases(&self, repo: &RepoSlug) -> Result<Vec<HostRelease>>;
}

// =============================================================================
// Host data
// =============================================================================

/// `owner/name` of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    /// Organisation or user
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoSlug {
    /// Build a slug from its parts
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!("expected owner/name, got {s:?}")),
        }
    }
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostAsset {
    /// File name
    pub name: String,
    /// Public download URL
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// Host-computed digest such as `sha256:<hex>`, when published
    #[serde(default)]
    pub digest: Option<String>,
}

impl HostAsset {
    /// The host-published SHA-256, if present and well formed
    #[must_use]
    pub fn sha256(&self) -> Option<String> {
        let hex = self.digest.as_deref()?.strip_prefix("sha256:")?.to_ascii_lowercase();
        is_sha256_hex(&hex).then_some(hex)
    }
}

/// A release as listed by the host
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostRelease {
    /// Git tag the release was cut from
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Publication timestamp
    #[serde(default)]
    pub published_at: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Unpublished draft
    #[serde(default)]
    pub draft: bool,
    /// Attached files
    #[serde(default)]
    pub assets: Vec<HostAsset>,
}

impl HostRelease {
    /// Publication date, falling back to creation date
    #[must_use]
    pub fn date(&self) -> Option<&str> {
        self.published_at.as_deref().or(self.created_at.as_deref())
    }
}

/// Extract the digest from the body of a `.sha256` companion file
///
/// The first whitespace separated token is the digest (`sha256sum` output).
#[must_use]
pub fn parse_checksum_body(body: &str) -> Option<String> {
    let token = body.split_whitespace().next()?.to_ascii_lowercase();
    is_sha256_hex(&token).then_some(token)
}

// =============================================================================
// GitHub client
// =============================================================================

/// GitHub REST and download client
pub struct GithubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
    retries: u32,
    backoff: Duration,
}

impl GithubClient {
    /// Build a client from configuration
    pub fn new(github: &GithubConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|e| Error::ExternalHostError {
                context: "building HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        let token = github.resolve_token();
        if token.is_none() {
            warn!("No GitHub token configured; using anonymous rate limits");
        }

        Ok(Self {
            client,
            api_url: github.api_url.trim_end_matches('/').to_string(),
            token,
            retries: http.retries.max(1),
            backoff: Duration::from_secs(1),
        })
    }

    /// Override the base delay between retries
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// GET with retries on gateway errors; the token goes only to the API
    fn get(&self, url: &str, context: &str) -> Result<Response> {
        let host_error = |reason: String| Error::ExternalHostError {
            context: context.to_string(),
            reason,
        };

        let mut attempt = 1;
        loop {
            let mut request = self.client.get(url);
            if url.starts_with(&self.api_url) {
                request = request
                    .header(ACCEPT, "application/vnd.github+json")
                    .header("X-GitHub-Api-Version", "2022-11-28");
                if let Some(token) = &self.token {
                    request = request.header(AUTHORIZATION, format!("Bearer {token}"));
                }
            }

            debug!("GET {} (attempt {}/{})", url, attempt, self.retries);
            match request.send() {
                Ok(response) if is_retryable(response.status()) && attempt < self.retries => {
                    warn!("{} returned {}; retrying", url, response.status());
                }
                Ok(response) => return Ok(response),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retries => {
                    warn!("{} failed: {}; retrying", url, e);
                }
                Err(e) => return Err(host_error(e.to_string())),
            }

            thread::sleep(self.backoff * 2u32.pow(attempt));
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

impl DigestSource for GithubClient {
    fn sha256(&self, url: &str) -> Result<Option<String>> {
        let checksum_url = format!("{url}.sha256");
        let context = format!("fetching {checksum_url}");
        let response = self.get(&checksum_url, &context)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No checksum file at {}", checksum_url);
            return Ok(None);
        }
        let response = response.error_for_status().map_err(|e| Error::ExternalHostError {
            context: context.clone(),
            reason: e.to_string(),
        })?;

        let body = response.text().map_err(|e| Error::ExternalHostError {
            context: context.clone(),
            reason: e.to_string(),
        })?;

        parse_checksum_body(&body).map(Some).ok_or_else(|| Error::ExternalHostError {
            context,
            reason: "checksum file does not start with a SHA-256 digest".to_string(),
        })
    }
}

impl ReleaseHost for GithubClient {
    fn releases(&self, repo: &RepoSlug) -> Result<Vec<HostRelease>> {
        let context = format!("listing releases of {repo}");
        let mut releases = Vec::new();

        for page in 1.. {
            let url = format!(
                "{}/repos/{}/{}/releases?per_page={PER_PAGE}&page={page}",
                self.api_url, repo.owner, repo.name
            );
            let response = self.get(&url, &context)?;

            let status = response.status();
            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                let hint = if self.token.is_none() { " (set GITHUB_TOKEN to raise the limit)" } else { "" };
                return Err(Error::ExternalHostError {
                    context,
                    reason: format!("{status}, likely rate limited{hint}"),
                });
            }
            let response = response.error_for_status().map_err(|e| Error::ExternalHostError {
                context: context.clone(),
                reason: e.to_string(),
            })?;

            let batch: Vec<HostRelease> = response.json().map_err(|e| Error::ExternalHostError {
                context: context.clone(),
                reason: format!("unexpected response: {e}"),
            })?;

            let count = batch.len();
            debug!("Page {} of {}: {} releases", page, repo, count);
            releases.extend(batch.into_iter().filter(|r| !r.draft));

            if count < PER_PAGE {
                break;
            }
        }

        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_repo_slug_parse() {
        assert_eq!("astral-sh/uv".parse::<RepoSlug>(), Ok(RepoSlug::new("astral-sh", "uv")));
        assert!("uv".parse::<RepoSlug>().is_err());
        assert!("a/b/c".parse::<RepoSlug>().is_err());
        assert!("/uv".parse::<RepoSlug>().is_err());
        assert_eq!(RepoSlug::new("astral-sh", "uv").to_string(), "astral-sh/uv");
    }

    #[test]
    fn test_parse_checksum_body() {
        let body = format!("{}  uv-x86_64-unknown-linux-gnu.tar.gz\n", DIGEST.to_uppercase());
        assert_eq!(parse_checksum_body(&body), Some(DIGEST.to_string()));
        assert_eq!(parse_checksum_body("Not Found"), None);
        assert_eq!(parse_checksum_body(""), None);
    }

    #[test]
    fn test_asset_digest() {
        let mut asset = HostAsset {
            name: "uv-aarch64-apple-darwin.tar.gz".into(),
            download_url: "https://example.com/uv.tar.gz".into(),
            digest: Some(format!("sha256:{DIGEST}")),
        };
        assert_eq!(asset.sha256(), Some(DIGEST.to_string()));

        asset.digest = Some(format!("sha512:{DIGEST}"));
        assert_eq!(asset.sha256(), None);

        asset.digest = None;
        assert_eq!(asset.sha256(), None);
    }

    #[test]
    fn test_deserialize_release_listing() {
        let json = r#"[{
            "tag_name": "0.5.0",
            "name": "0.5.0",
            "draft": false,
            "prerelease": false,
            "created_at": "2024-11-07T10:00:00Z",
            "published_at": "2024-11-07T11:00:00Z",
            "assets": [{
                "name": "uv-x86_64-unknown-linux-gnu.tar.gz",
                "browser_download_url": "https://github.com/astral-sh/uv/releases/download/0.5.0/uv-x86_64-unknown-linux-gnu.tar.gz",
                "size": 123,
                "digest": null
            }]
        }]"#;

        let releases: Vec<HostRelease> = serde_json::from_str(json).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].tag, "0.5.0");
        assert_eq!(releases[0].date(), Some("2024-11-07T11:00:00Z"));
        assert_eq!(releases[0].assets[0].digest, None);
    }
}
