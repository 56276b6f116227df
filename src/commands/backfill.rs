// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Backfill command - emits records for hosted releases missing locally

use super::Globals;
use crate::backfill::{run as backfill, BackfillReport, BackfillRequest};
use crate::host::{DigestSource, GithubClient, ReleaseHost, RepoSlug};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the backfill command
#[derive(Debug, Clone)]
pub struct BackfillArgs {
    /// Project whose store is reconciled
    pub name: String,
    /// Hosting repository, default `<default_owner>/<name>`
    pub repo: Option<RepoSlug>,
    /// Artifact name prefix, default the repository name
    pub app: Option<String>,
    /// Store directory override
    pub output: Option<PathBuf>,
    /// Stop after this many records
    pub limit: Option<usize>,
}

/// Run the backfill command against GitHub, writing records to stdout
pub fn run(globals: &Globals, args: &BackfillArgs) -> Result<()> {
    let client = GithubClient::new(&globals.config.github, &globals.config.http)?;
    let mut stdout = std::io::stdout().lock();
    run_with(globals, args, &client, &client, &mut stdout)?;
    Ok(())
}

/// Run the backfill with explicit host capabilities
pub fn run_with(
    globals: &Globals,
    args: &BackfillArgs,
    host: &dyn ReleaseHost,
    digests: &dyn DigestSource,
    out: &mut dyn Write,
) -> Result<BackfillReport> {
    let dir = globals.store_dir(args.output.as_deref())?;
    let store = dir
        .load_store(&args.name, None, globals.config.default_order)
        .with_context(|| format!("Failed to load store for {}", args.name))?;

    let repo = args
        .repo
        .clone()
        .unwrap_or_else(|| RepoSlug::new(globals.config.github.default_owner.clone(), args.name.clone()));
    let request = BackfillRequest {
        app: args.app.clone().unwrap_or_else(|| repo.name.clone()),
        repo,
        limit: args.limit,
    };

    info!("Backfilling {} from {} ({} local versions)", args.name, request.repo, store.len());
    let report = backfill(&store, host, digests, &request)
        .with_context(|| format!("Failed to backfill {}", args.name))?;

    for record in &report.records {
        writeln!(out, "{}", record.to_line()?)?;
    }
    out.flush()?;

    eprintln!(
        "{} {} missing versions ({} already present)",
        globals.good("Found"),
        report.records.len(),
        report.present
    );
    for skipped in &report.skipped {
        eprintln!("  {} {}: {}", globals.caution("skipped"), skipped.tag, skipped.error);
    }

    Ok(report)
}
