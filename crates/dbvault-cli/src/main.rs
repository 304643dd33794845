mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dbvault",
    about = "Hot backup, retention and guarded restore for the subscription SQLite database",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML settings file (db_path, backup_dir, retention_days, prefix, list_limit)
    #[arg(long, global = true, env = "DBVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Live database file [default: /app/data/subscription.db]
    #[arg(long, global = true, env = "DB_PATH")]
    db_path: Option<PathBuf>,

    /// Delete snapshots older than this many days [default: 30]
    #[arg(long, global = true, env = "RETENTION_DAYS")]
    retention_days: Option<u32>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a compressed hot snapshot of the live database and prune expired ones
    Backup {
        /// Directory for snapshots [default: /app/data/backups]
        backup_dir: Option<PathBuf>,
    },

    /// Replace the live database with a snapshot (asks for confirmation)
    Restore {
        /// Snapshot to restore, e.g. /app/data/backups/subscription_20260201_120000.db.gz
        backup_file: Option<PathBuf>,
    },

    /// List snapshots, newest first
    List {
        /// Directory to list [default: /app/data/backups]
        backup_dir: Option<PathBuf>,
    },

    /// Integrity-check a snapshot without touching the live database
    Verify { backup_file: PathBuf },

    /// Inspect the effective settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let resolve = || {
        settings::resolve_settings(cli.config.as_deref(), cli.db_path.clone(), cli.retention_days)
    };

    match cli.command {
        Commands::Backup { backup_dir } => cmd::backup::run(resolve()?, backup_dir, cli.json),
        Commands::Restore { backup_file } => {
            cmd::restore::run(&resolve()?, backup_file.as_deref(), cli.json)
        }
        Commands::List { backup_dir } => cmd::list::run(resolve()?, backup_dir, cli.json),
        // Settings are irrelevant to a standalone snapshot check.
        Commands::Verify { backup_file } => cmd::verify::run(&backup_file, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&resolve()?, subcommand, cli.json),
    }
}
