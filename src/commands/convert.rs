// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Convert command - turns a cargo-dist plan on stdin into an NDJSON record

use super::{require_piped_stdin, Globals};
use crate::host::{DigestSource, GithubClient};
use crate::plan::{convert, parse_plan, ConvertOptions};
use crate::types::ReleaseRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use std::io::{Read, Write};

/// Arguments for the convert command
#[derive(Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Owner to assume when the plan does not name its repository
    pub owner: Option<String>,
}

/// Run the convert command on stdin, writing the record to stdout
pub fn run(globals: &Globals, args: &ConvertArgs) -> Result<()> {
    require_piped_stdin("cargo-dist plan JSON")?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read plan from stdin")?;

    let client = GithubClient::new(&globals.config.github, &globals.config.http)?;
    let mut stdout = std::io::stdout().lock();
    run_with(globals, args, &input, &client, &mut stdout)?;
    Ok(())
}

/// Convert `input` using `digests`, writing one NDJSON line to `out`
pub fn run_with(
    globals: &Globals,
    args: &ConvertArgs,
    input: &str,
    digests: &dyn DigestSource,
    out: &mut dyn Write,
) -> Result<ReleaseRecord> {
    let plan = parse_plan(input).context("Failed to parse plan JSON from stdin")?;

    let options = ConvertOptions {
        download_url: globals.config.github.download_url.clone(),
        default_owner: args
            .owner
            .clone()
            .unwrap_or_else(|| globals.config.github.default_owner.clone()),
    };

    eprintln!("Extracting version information...");
    let record = convert(&plan, digests, &options, Utc::now())
        .with_context(|| format!("Failed to convert plan for {}", plan.announcement_tag))?;

    eprintln!(
        "{} version: {} with {} artifacts",
        globals.good("Found"),
        record.version,
        record.artifacts.len()
    );

    writeln!(out, "{}", record.to_line()?)?;
    out.flush()?;
    Ok(record)
}
