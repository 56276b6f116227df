// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - prints the effective configuration

use super::Globals;
use anyhow::{Context, Result};

/// Print one dotted key, or the whole configuration as TOML
pub fn run(globals: &Globals, key: Option<&str>) -> Result<()> {
    println!("{}", render(globals, key)?);
    Ok(())
}

/// Text printed by [`run`]
pub fn render(globals: &Globals, key: Option<&str>) -> Result<String> {
    match key {
        Some(key) => {
            let value = globals.config.get(key)?;
            Ok(match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
        }
        None => {
            let text = toml::to_string_pretty(&globals.config.redacted()).context("Failed to render configuration")?;
            Ok(text.trim_end().to_string())
        }
    }
}
