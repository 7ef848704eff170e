use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use usgs_l2_prep::{
    collect_scenes, process_all, BatchOptions, GdalRasterReader, PrepareOptions, ValidRegionService,
};

/// Prepare the level 2 products (surface reflectance, brightness temperature
/// and pixel quality) from USGS for ingestion.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folders whose entries are scene directories, .tar.gz or .zip archives
    #[arg(value_name = "INPUT_FOLDER", required = true)]
    inputs: Vec<PathBuf>,

    /// Write output into this directory
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Only prepare scenes created after this date (DD/MM/YYYY)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Re-prepare existing outputs whose checksum no longer matches the sidecar
    #[arg(long)]
    checksum: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Bit mask a sample must match to count as valid (default: nonzero)
    #[arg(long)]
    mask_value: Option<i64>,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .map_err(|e| format!("expected DD/MM/YYYY, got '{}': {}", value, e))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output folder {}", args.output.display()))?;

    let scenes = collect_scenes(&args.inputs)?;
    info!("Found {} scene(s)", scenes.len());

    let options = BatchOptions {
        output_dir: args.output.clone(),
        since: args.date,
        checksum: args.checksum,
        prepare: PrepareOptions {
            mask_value: args.mask_value,
            ..Default::default()
        },
    };
    let service = ValidRegionService::<GdalRasterReader>::default();
    let report = process_all(&scenes, &service, &options);

    info!(
        "Written {}, skipped {}, failed {} in {:?}",
        report.written,
        report.skipped,
        report.failures.len(),
        start_time.elapsed()
    );

    if !report.failures.is_empty() {
        error!("Failed to process {} scenes:", report.failures.len());
        for (scene, _) in &report.failures {
            error!("  {}", scene.display());
        }
        anyhow::bail!("{} scenes failed to process", report.failures.len());
    }

    Ok(())
}
