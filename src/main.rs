// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Versions CLI - maintains the release metadata stores

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use versions::commands::{self, Globals};
use versions::host::RepoSlug;
use versions::version::StoreOrder;

#[derive(Parser)]
#[command(name = "versions")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "VERSIONS_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Repository root holding the schema directories
    #[arg(long, env = "VERSIONS_ROOT", global = true)]
    root: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert NDJSON version records from stdin into a project's store
    Insert {
        /// Project name (determines the store file <name>.ndjson)
        #[arg(long)]
        name: String,

        /// Store directory (default: <root>/v1)
        #[arg(long)]
        output: Option<std::path::PathBuf>,

        /// Order of a newly created store (ascending, descending)
        #[arg(long)]
        order: Option<StoreOrder>,
    },

    /// Convert cargo-dist plan JSON from stdin into an NDJSON record
    Convert {
        /// Repository owner when the plan does not name one
        #[arg(long)]
        owner: Option<String>,
    },

    /// Emit records for hosted releases missing from a project's store
    Backfill {
        /// Project name
        #[arg(long)]
        name: String,

        /// Hosting repository as owner/name
        #[arg(long)]
        repo: Option<RepoSlug>,

        /// Artifact name prefix (default: repository name)
        #[arg(long)]
        app: Option<String>,

        /// Store directory (default: <root>/v1)
        #[arg(long)]
        output: Option<std::path::PathBuf>,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the effective configuration
    Config {
        /// Dotted configuration key (omit to print everything)
        key: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => LevelFilter::ERROR,
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let mut config = versions::config::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    let globals = Globals {
        config,
        color: !cli.no_color,
    };

    // Execute command
    match cli.command {
        Commands::Insert { name, output, order } => {
            commands::insert::run(&globals, &commands::insert::InsertArgs { name, output, order })
        }
        Commands::Convert { owner } => {
            commands::convert::run(&globals, &commands::convert::ConvertArgs { owner })
        }
        Commands::Backfill { name, repo, app, output, limit } => {
            commands::backfill::run(
                &globals,
                &commands::backfill::BackfillArgs { name, repo, app, output, limit },
            )
        }
        Commands::Config { key } => {
            commands::config::run(&globals, key.as_deref())
        }
        Commands::Completions { shell } => {
            commands::completions::run(shell, Cli::command())
        }
    }
}
