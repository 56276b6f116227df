// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest first: built-in defaults, a TOML file (`--config`, or
//! `config.toml` in the user config directory), then `VERSIONS__*`
//! environment variables (`VERSIONS__GITHUB__DEFAULT_OWNER=...`).

use crate::version::StoreOrder;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix for configuration overrides
pub const ENV_PREFIX: &str = "VERSIONS";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Repository root holding the schema directories
    pub root: PathBuf,
    /// Order given to stores created without an explicit one
    pub default_order: StoreOrder,
    /// Release host settings
    pub github: GithubConfig,
    /// HTTP client settings
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            default_order: StoreOrder::Descending,
            github: GithubConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

/// Release host settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base URL
    pub api_url: String,
    /// Base URL of release downloads
    pub download_url: String,
    /// Owner assumed when a plan or project names no repository
    pub default_owner: String,
    /// Access token; falls back to `GITHUB_TOKEN` / `GH_TOKEN`
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            download_url: "https://github.com".to_string(),
            default_owner: "astral-sh".to_string(),
            token: None,
        }
    }
}

impl GithubConfig {
    /// Token from configuration or the ambient environment
    #[must_use]
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per request for retryable gateway errors
    pub retries: u32,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 3,
            user_agent: format!("versions/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Default location of the user configuration file
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "versions")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from disk and environment, falling back to defaults
///
/// An explicit `path` must exist; the default file is optional.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                builder = builder.add_source(config::File::from(path).required(false));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize::<Config>()
        .context("Invalid configuration")?;

    tracing::debug!("Effective configuration: {:?}", config.redacted());
    Ok(config)
}

impl Config {
    /// Copy with secrets masked, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.github.token.is_some() {
            copy.github.token = Some("***".to_string());
        }
        copy
    }

    /// Look up a dotted key (`github.api_url`) in the redacted configuration
    pub fn get(&self, key: &str) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self.redacted()).context("Failed to serialize configuration")?;
        for part in key.split('.') {
            value = match value {
                serde_json::Value::Object(mut map) => map
                    .remove(part)
                    .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {key}"))?,
                _ => anyhow::bail!("Unknown configuration key: {key}"),
            };
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("versions.toml");
        fs::write(
            &path,
            "default_order = \"ascending\"\n\n[github]\ndefault_owner = \"example-org\"\n",
        )
        .unwrap();

        let config = load(Some(path.as_path())).unwrap();

        assert_eq!(config.default_order, StoreOrder::Ascending);
        assert_eq!(config.github.default_owner, "example-org");
        assert_eq!(config.github.api_url, GithubConfig::default().api_url);
        assert_eq!(config.http, HttpConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load(Some(dir.path().join("absent.toml").as_path())).is_err());
    }

    #[test]
    fn test_get_dotted_key_redacts_token() {
        let mut config = Config::default();
        config.github.token = Some("secret".into());

        assert_eq!(config.get("http.retries").unwrap(), serde_json::json!(3));
        assert_eq!(config.get("github.token").unwrap(), serde_json::json!("***"));
        assert!(config.get("github.nope").is_err());
    }
}
