//! Leader routing data CLI
//!
//! Produces the leader schedule and validator region documents consumed by
//! the routing layer. Run once per epoch.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use leader_routing_data::config::PipelineConfig;
use leader_routing_data::geo::{region_distribution, GeoPipeline, RegionMap};
use leader_routing_data::output::read_json;
use leader_routing_data::schedule::{ScheduleDocument, SchedulePipeline};

#[derive(Parser)]
#[command(name = "leader-routing-data")]
#[command(version)]
#[command(about = "Leader schedule and validator geolocation pipelines", long_about = None)]
struct Cli {
    /// Path to configuration file (optional, uses env vars if not provided)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the leader schedule for the current epoch
    FetchSchedule {
        /// Solana RPC endpoint
        rpc_url: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Geolocate cluster nodes and map validators to regions
    PrecomputeGeo {
        /// Solana RPC endpoint
        rpc_url: Option<String>,

        /// Output file path
        output: Option<PathBuf>,
    },

    /// Show what the current documents contain
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => PipelineConfig::load().context("Failed to load config from environment")?,
    };

    match cli.command {
        Commands::FetchSchedule { rpc_url, output } => {
            apply_overrides(&mut config, rpc_url);
            if let Some(output) = output {
                config.paths.schedule_output = output;
            }
            cmd_fetch_schedule(&config).await?;
        }
        Commands::PrecomputeGeo { rpc_url, output } => {
            apply_overrides(&mut config, rpc_url);
            if let Some(output) = output {
                config.paths.geo_output = output;
            }
            cmd_precompute_geo(&config).await?;
        }
        Commands::Status => {
            cmd_status(&config)?;
        }
    }

    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, rpc_url: Option<String>) {
    if let Some(url) = rpc_url {
        config.rpc_url = url;
    }
}

async fn cmd_fetch_schedule(config: &PipelineConfig) -> Result<()> {
    info!("=== Fetching Leader Schedule ===");
    info!("Using RPC: {}", config.rpc_url);

    let pipeline = SchedulePipeline::new(config).context("Failed to build RPC client")?;
    let summary = pipeline
        .run()
        .await
        .context("Failed to build leader schedule")?;

    info!(
        "Schedule for slots {}..={}: {} entries from {} validators ({} dropped)",
        summary.start_slot,
        summary.end_slot,
        summary.entries,
        summary.validators,
        summary.dropped_validators
    );
    info!("Schedule saved to {:?}", summary.output_path);

    Ok(())
}

async fn cmd_precompute_geo(config: &PipelineConfig) -> Result<()> {
    info!("=== Precomputing Validator Regions ===");
    info!("Using RPC: {}", config.rpc_url);
    info!("Output: {:?}", config.paths.geo_output);

    let mut pipeline = GeoPipeline::new(config).context("Failed to build HTTP clients")?;
    let summary = pipeline
        .run()
        .await
        .context("Failed to build validator region map")?;

    info!(
        "{} validators mapped ({} geolocated, {} unknown, {} skipped)",
        summary.entries, summary.stats.resolved, summary.stats.unresolved, summary.stats.skipped
    );
    info!("Regions saved to {:?}", summary.output_path);

    Ok(())
}

fn cmd_status(config: &PipelineConfig) -> Result<()> {
    info!("=== Pipeline Status ===");

    let schedule_path = &config.paths.schedule_output;
    if schedule_path.exists() {
        let document: ScheduleDocument = read_json(schedule_path)
            .with_context(|| format!("Failed to read {:?}", schedule_path))?;
        let meta = &document.metadata;
        info!(
            "  ✓ Schedule {:?}: slots {}..={} ({} slots), {} entries ({} KB)",
            schedule_path,
            meta.start_slot,
            meta.end_slot,
            meta.slots_in_epoch(),
            document.entries.len(),
            file_kb(schedule_path)
        );
        info!("    Estimated epoch start: {} ms", meta.start_time_ms);
    } else {
        info!("  ✗ Schedule {:?}: not found", schedule_path);
    }

    let geo_path = &config.paths.geo_output;
    if geo_path.exists() {
        let map: RegionMap =
            read_json(geo_path).with_context(|| format!("Failed to read {:?}", geo_path))?;
        info!(
            "  ✓ Regions {:?}: {} validators ({} KB)",
            geo_path,
            map.len(),
            file_kb(geo_path)
        );
        for (region, count) in region_distribution(&map) {
            info!("    {:<10} {}", region.label(), count);
        }
    } else {
        info!("  ✗ Regions {:?}: not found", geo_path);
    }

    Ok(())
}

fn file_kb(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len() / 1024).unwrap_or(0)
}
