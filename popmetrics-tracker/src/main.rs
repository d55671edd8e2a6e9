//! popmetrics-tracker - command-line entry point
//!
//! Subcommands:
//! - `daily`: collect one day of metrics and consolidate it
//! - `resolve-identities`: refresh reference info for every tracked artist
//! - `consolidate`: re-run consolidation for a day
//! - `show-run`: print the lineage of one run
//! - `init-config`: write a starter config file

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use popmetrics_common::config::{default_config_path, load_toml_config, TomlConfig};
use popmetrics_common::time::{format_timestamp, parse_day, yesterday};
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use popmetrics_tracker::config::{init_config_file, TrackerConfig};
use popmetrics_tracker::db::{self, lineage};
use popmetrics_tracker::provenance::Provenance;
use popmetrics_tracker::{registry, services, workflow};

/// Command-line arguments for popmetrics-tracker
#[derive(Parser, Debug)]
#[command(name = "popmetrics-tracker")]
#[command(about = "Artist popularity tracker with run/step/request lineage")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides POPMETRICS_DB and the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Tracked-artist JSON file (overrides POPMETRICS_ARTISTS and the config file)
    #[arg(short, long, global = true)]
    artists: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect and consolidate one day of metrics (default: yesterday, UTC)
    Daily {
        #[arg(long, value_parser = parse_day_arg)]
        day: Option<NaiveDate>,
    },
    /// Resolve platform identities and reference info for every artist
    ResolveIdentities,
    /// Re-run consolidation for a day from the stored snapshots
    Consolidate {
        #[arg(long, value_parser = parse_day_arg)]
        day: NaiveDate,
    },
    /// Show a run with its steps and failed requests
    ShowRun { run_id: String },
    /// Write a starter config file (to --config, else the default location)
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_day_arg(s: &str) -> Result<NaiveDate, String> {
    parse_day(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { force } = args.command {
        let path = args
            .config
            .clone()
            .or_else(default_config_path)
            .context("No config directory on this platform; pass --config")?;
        init_config_file(&path, force).context("Failed to write config file")?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let toml = match args.config.clone().or_else(default_config_path) {
        Some(path) => load_toml_config(&path).context("Failed to load config file")?,
        None => TomlConfig::default(),
    };
    let config = TrackerConfig::resolve(args.database.as_deref(), args.artists.as_deref(), &toml);

    // Initialize tracing; RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        build_version = %config.build_version,
        database = %config.database_path.display(),
        "Starting popmetrics-tracker"
    );

    let pool = db::init_database_pool(&config.database_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Daily { day } => {
            let day = day.unwrap_or_else(yesterday);
            let artists = registry::load_registry(&config.artists_path).context("Failed to load artists")?;
            let clients = config.build_clients();
            let provenance = Provenance::with_uuid_ids(pool, config.build_version.clone());

            let report = workflow::run_daily_job(&provenance, &clients, &artists, day)
                .await
                .context("Daily job failed")?;

            for step in &report.steps {
                println!(
                    "{:<26} success={:<4} errors={}",
                    step.step_name, step.success_count, step.error_count
                );
            }
            println!(
                "run {} ({}): {} unified records, {} artists without data",
                report.run_id, report.day, report.consolidation.written, report.consolidation.skipped
            );
        }
        Command::ResolveIdentities => {
            let artists = registry::load_registry(&config.artists_path).context("Failed to load artists")?;
            let clients = config.build_clients();
            let provenance = Provenance::with_uuid_ids(pool, config.build_version.clone());

            let report = workflow::run_identity_job(&provenance, &clients, &artists)
                .await
                .context("Identity resolution failed")?;

            println!(
                "run {}: {} artists, {} lookups ok, {} failed",
                report.run_id, report.artists, report.lookups_ok, report.lookups_failed
            );
        }
        Command::Consolidate { day } => {
            let artists = registry::load_registry(&config.artists_path).context("Failed to load artists")?;
            let summary = services::consolidate(&pool, &artists, day)
                .await
                .context("Consolidation failed")?;
            println!(
                "{}: {} unified records, {} artists without data",
                day, summary.written, summary.skipped
            );
        }
        Command::ShowRun { run_id } => show_run(&pool, &run_id).await?,
        // Handled before startup
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

async fn show_run(pool: &SqlitePool, run_id: &str) -> Result<()> {
    let run = lineage::load_run(pool, run_id)
        .await?
        .with_context(|| format!("No run with id {}", run_id))?;

    println!(
        "run {} day={} build={} status={} started={} duration_ms={}",
        run.run_id,
        run.run_day,
        run.build_version,
        run.status,
        format_timestamp(&run.started_at),
        run.duration_ms.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
    );
    if let Some(message) = &run.error_message {
        println!("  error [{}]: {}", run.error_type.as_deref().unwrap_or("?"), message);
    }

    for step in lineage::list_steps(pool, run_id).await? {
        let counts = match (step.success_count, step.error_count) {
            (Some(ok), Some(err)) => format!("success={} errors={}", ok, err),
            _ => "no per-item accounting".to_string(),
        };
        println!("  step {} {} {}", step.step_name, step.status, counts);
        if let Some(message) = &step.error_message {
            println!("    error [{}]: {}", step.error_type.as_deref().unwrap_or("?"), message);
        }
    }

    let failed = lineage::list_failed_requests(pool, run_id).await?;
    if !failed.is_empty() {
        println!("  failed requests:");
    }
    for request in failed {
        println!(
            "    {} {} {} status={} [{}] {}",
            request.source,
            request.local_artist_id,
            request.endpoint.as_deref().unwrap_or("-"),
            request.http_status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            request.error_type.as_deref().unwrap_or("?"),
            request.error_message.as_deref().unwrap_or(""),
        );
    }

    Ok(())
}
