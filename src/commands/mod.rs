// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod backfill;
pub mod completions;
pub mod config;
pub mod convert;
pub mod insert;

use crate::config::Config;
use crate::store::StoreDir;
use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Globals {
    /// Effective configuration (root already overridden by flags)
    pub config: Config,
    /// Colour the operator summary on stderr
    pub color: bool,
}

impl Globals {
    /// Open the store directory: `output` if given, else `<root>/v1`
    pub fn store_dir(&self, output: Option<&Path>) -> Result<StoreDir> {
        match output {
            Some(dir) => StoreDir::at(dir).with_context(|| format!("Failed to open store directory {}", dir.display())),
            None => StoreDir::open(&self.config.root)
                .with_context(|| format!("Failed to open store directory under {}", self.config.root.display())),
        }
    }

    /// Highlight a success note
    #[must_use]
    pub fn good(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    /// Highlight a warning note
    #[must_use]
    pub fn caution(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Refuse to wait on an interactive terminal for piped input
fn require_piped_stdin(expected: &str) -> Result<()> {
    if std::io::stdin().is_terminal() {
        bail!("expected {expected} on stdin");
    }
    Ok(())
}
