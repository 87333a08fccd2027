use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sparkify_etl::config::AppConfig;
use sparkify_etl::logging::{init_logging, OperationTimer};
use sparkify_etl::pipeline::{ensure_root, process_data, LoadOptions, RunSummary};
use sparkify_etl::{Database, SourceKind};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Warehouse SQLite file (overrides configuration)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Extra configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log level (overrides configuration)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog tree, then the activity log tree
    Run {
        /// Root of the catalog tree
        #[arg(long)]
        song_data: Option<PathBuf>,

        /// Root of the activity log tree
        #[arg(long)]
        log_data: Option<PathBuf>,
    },
    /// Load catalog files only
    Songs {
        /// Root of the catalog tree
        root: Option<PathBuf>,
    },
    /// Load activity log files only
    Logs {
        /// Root of the activity log tree
        root: Option<PathBuf>,
    },
    /// Create any missing warehouse table
    InitDb,
    /// Show warehouse row counts
    Stats,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let log_file = config.logging.file_path.as_deref().map(Path::new);
    let _guard = init_logging(Some(&level), log_file, config.logging.format == "json")?;

    info!("Starting sparkify-etl");

    let db_path = cli.database.clone().unwrap_or_else(|| config.get_database_path());
    let mut db = Database::open(&db_path)
        .with_context(|| format!("Failed to open warehouse at {}", db_path.display()))?;
    let options = config.load_options();

    match cli.command {
        Commands::Run { song_data, log_data } => {
            let song_root = song_data.unwrap_or_else(|| config.input.song_data.clone().into());
            let log_root = log_data.unwrap_or_else(|| config.input.log_data.clone().into());
            load_tree(&mut db, &song_root, SourceKind::Catalog, &options)?;
            load_tree(&mut db, &log_root, SourceKind::ActivityLog, &options)?;
        }
        Commands::Songs { root } => {
            let root = root.unwrap_or_else(|| config.input.song_data.clone().into());
            load_tree(&mut db, &root, SourceKind::Catalog, &options)?;
        }
        Commands::Logs { root } => {
            let root = root.unwrap_or_else(|| config.input.log_data.clone().into());
            load_tree(&mut db, &root, SourceKind::ActivityLog, &options)?;
        }
        Commands::InitDb => {
            db.create_tables().context("Failed to create warehouse tables")?;
            info!(path = %db_path.display(), "Warehouse tables ready");
        }
        Commands::Stats => {
            let stats = db.stats()?;
            info!(
                songs = stats.songs,
                artists = stats.artists,
                users = stats.users,
                time = stats.time,
                songplays = stats.songplays,
                matched_songplays = stats.matched_songplays,
                "Warehouse statistics"
            );
        }
    }

    Ok(())
}

fn load_tree(db: &mut Database, root: &Path, kind: SourceKind, options: &LoadOptions) -> Result<RunSummary> {
    ensure_root(root)?;
    let timer = OperationTimer::new(kind.as_str());
    let summary = process_data(db.connection_mut(), root, kind, options)
        .with_context(|| format!("Failed to walk {}", root.display()))?;
    timer.finish();

    for failure in &summary.failures {
        warn!(path = %failure.path.display(), error = %failure.error, "Skipped file");
    }
    info!(
        kind = kind.as_str(),
        found = summary.files_found,
        processed = summary.files_processed,
        failed = summary.failures.len(),
        records = summary.totals.records,
        songplays = summary.totals.songplays,
        matched = summary.totals.matched,
        "Load finished"
    );
    Ok(summary)
}
