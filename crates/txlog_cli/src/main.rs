//! txlog CLI
//!
//! Command-line tools for transaction log directories.
//!
//! # Commands
//!
//! - `info` - Display segments, headers and checkpoints
//! - `dump` - Dump committed transactions and chunks for debugging
//! - `prune` - Apply a retention policy

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txlog_core::LogConfig;

/// Transaction log maintenance tools.
#[derive(Parser)]
#[command(name = "txlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the log directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Base name of the transaction log files
    #[arg(global = true, long, default_value = "transaction.log")]
    base_name: String,

    /// Base name of the checkpoint files
    #[arg(global = true, long, default_value = "checkpoint.log")]
    checkpoint_base_name: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display segments, headers and checkpoints
    Info {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump committed transactions and chunks
    Dump {
        /// Maximum number of batches to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Start at this log version instead of the lowest one
        #[arg(long)]
        from_version: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete log files according to a retention policy
    Prune {
        /// Retention policy, e.g. "keep_all", "10 files", "2 days 1g"
        #[arg(long, default_value = "2 days")]
        policy: String,

        /// Exclusive upper version bound (defaults to the tip version)
        #[arg(long)]
        up_to: Option<u64>,

        /// Number of checkpoint files to keep
        #[arg(long, default_value = "3")]
        keep_checkpoints: usize,

        /// Dry run - show what would be deleted
        #[arg(short, long)]
        dry_run: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = LogConfig::default()
        .base_name(cli.base_name)
        .checkpoint_base_name(cli.checkpoint_base_name);

    match cli.command {
        Commands::Info { format } => {
            let path = cli.path.ok_or("Log directory required for info")?;
            commands::info::run(&path, &config, &format)?;
        }
        Commands::Dump {
            limit,
            from_version,
            format,
        } => {
            let path = cli.path.ok_or("Log directory required for dump")?;
            commands::dump::run(&path, &config, from_version, limit, &format)?;
        }
        Commands::Prune {
            policy,
            up_to,
            keep_checkpoints,
            dry_run,
            format,
        } => {
            let path = cli.path.ok_or("Log directory required for prune")?;
            let config = config
                .retention_policy(policy)
                .checkpoint_keep_count(keep_checkpoints);
            let options = commands::prune::PruneOptions { up_to, dry_run };
            commands::prune::run(&path, &config, options, &format)?;
        }
        Commands::Version => {
            println!("txlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("txlog core v{}", txlog_core::VERSION);
        }
    }

    Ok(())
}
