//! citylight: inspect chart payloads offline.
//!
//! Runs the downsampler and paginator over JSON files so thresholds and page
//! sizes can be tuned without a dashboard.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use citylight::{ChartOption, CitylightError, Downsampler, Paginator, PerfConfig};

/// Citylight payload tool.
#[derive(Parser)]
#[command(name = "citylight")]
#[command(version)]
#[command(about = "Downsample and page dashboard payloads")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true, env = "CITYLIGHT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the optimised form of a chart option file.
    Downsample {
        /// Chart option JSON file.
        file: PathBuf,
        /// Override the configured threshold.
        #[arg(long)]
        threshold: Option<usize>,
    },
    /// Print one page of a JSON array file.
    Page {
        /// JSON array file.
        file: PathBuf,
        /// Zero-based page index.
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Override the configured page size.
        #[arg(long)]
        page_size: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => PerfConfig::load(path)?,
        None => PerfConfig::default(),
    };

    match args.command {
        Command::Downsample { file, threshold } => {
            let option = ChartOption::from_json(&read(&file)?)?;
            let threshold = threshold.unwrap_or(config.render.downsample_threshold);
            let sampler = Downsampler::new(threshold).primary_series(config.render.primary_series);

            let before = primary_len(&option, config.render.primary_series);
            let optimized = sampler.optimize(option);
            let after = primary_len(&optimized, config.render.primary_series);
            info!(threshold, before, after, "downsampled");

            println!("{}", serde_json::to_string_pretty(&optimized)?);
        }
        Command::Page {
            file,
            page,
            page_size,
        } => {
            let items: Vec<Value> = serde_json::from_str(&read(&file)?)?;
            let mut pager = match page_size {
                Some(size) => Paginator::new(size),
                None => Paginator::from(&config.paging),
            };
            pager.set_data(items);
            let slice = pager.page(page).to_vec();

            let out = json!({ "info": pager.info(), "items": slice });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

fn read(path: &Path) -> citylight::Result<String> {
    fs::read_to_string(path)
        .map_err(|e| CitylightError::InvalidInput(format!("Failed to read {path:?}: {e}")))
}

fn primary_len(option: &ChartOption, index: usize) -> usize {
    option.series.get(index).map(|s| s.data.len()).unwrap_or(0)
}
