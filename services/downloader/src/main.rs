//! ECMWF field downloader.
//!
//! Fills `{output_dir}/{parameter}/` with half-precision global fields for
//! the window `today ± DAYS`, using analysis data where it exists and
//! forecast steps of the latest published run for the rest.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use dataset_store::Dataset;
use ecmwf_downloader::{Config, EcmwfArchive, Orchestrator, SweepOptions};

#[derive(Parser, Debug)]
#[command(name = "ecmwf-downloader")]
#[command(about = "Download ECMWF open-data fields for today ± DAYS")]
struct Args {
    /// Half-window size in days
    days: u32,

    /// Configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = "config/ecmwf.yaml")]
    config: PathBuf,

    /// Dataset root (overrides the config file)
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Re-download analysis fields whose file already exists
    #[arg(long)]
    force: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(days = args.days, force = args.force, "Starting ECMWF downloader");

    let mut config = Config::load_or_default(&args.config)?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let archive = EcmwfArchive::new(&config).await?;
    let orchestrator = Orchestrator::new(
        &archive,
        &archive,
        Dataset::new(&config.output_dir),
        config.parameters.clone(),
        SweepOptions::from_config(&config, args.days, args.force),
    );

    let report = orchestrator.run(Utc::now()).await?;

    if !report.has_usable_output() {
        error!("No analysis data and no published run found, nothing usable was produced");
        return Ok(ExitCode::FAILURE);
    }

    info!(
        analysis_written = report.analysis.written,
        analysis_present = report.analysis.present,
        analysis_failed = report.analysis.failed,
        run = ?report.run.map(|r| r.to_string()),
        planned = report.plan.steps.len(),
        forecast_written = report.forecast.written,
        forecast_failed = report.forecast.failed,
        shortfall = report.plan.shortfall,
        complete = report.complete_timesteps,
        target = report.target_count,
        "Download session complete"
    );

    Ok(ExitCode::SUCCESS)
}
