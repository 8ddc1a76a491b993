//! morphoseg CLI - multi-scale morphological profile segmentation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use morphoseg_algorithms::segmentation::{
    amplitude, region_stats, Convexity, MorphologicalProfilesSegmentation, SegmentationParams,
};
use morphoseg_core::io::{read_geotiff_bands, write_label_geotiff};
use morphoseg_core::{Connectivity, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "morphoseg")]
#[command(author, version, about = "Multi-scale morphological profile segmentation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Segment a raster into convex and concave regions
    Segment {
        /// Input raster file (multi-band input is reduced to its amplitude)
        input: PathBuf,
        /// Output region id raster (u32)
        output: PathBuf,
        /// JSON file with segmentation parameters; flags override it
        #[arg(long)]
        params: Option<PathBuf>,
        /// Number of scales in each profile
        #[arg(long)]
        size: Option<usize>,
        /// Disk radius of the first scale
        #[arg(long)]
        start: Option<usize>,
        /// Radius increment between scales
        #[arg(long)]
        step: Option<usize>,
        /// Minimum derivative magnitude for a pixel to be classified
        #[arg(long)]
        sigma: Option<f64>,
        /// Offset of convex labels (default: start + size * step)
        #[arg(long)]
        separator: Option<u32>,
        /// Group regions with 8-connectivity
        #[arg(long, conflicts_with = "four")]
        eight: bool,
        /// Group regions with 4-connectivity
        #[arg(long)]
        four: bool,
        /// Smallest region kept, in pixels
        #[arg(long)]
        min_size: Option<usize>,
        /// Also write the per-pixel class image
        #[arg(long)]
        classes: Option<PathBuf>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_bands(path: &Path) -> Result<Vec<Raster<f64>>> {
    let pb = spinner("Reading raster...");
    let bands: Vec<Raster<f64>> = read_geotiff_bands(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    if let Some(first) = bands.first() {
        info!("Input: {} x {}, {} band(s)", first.cols(), first.rows(), bands.len());
    }
    Ok(bands)
}

fn write_labels(raster: &Raster<u32>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_label_geotiff(raster, path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn load_params(path: Option<&Path>) -> Result<SegmentationParams> {
    let Some(path) = path else {
        return Ok(SegmentationParams::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameters {}", path.display()))?;
    let params = serde_json::from_str(&text)
        .with_context(|| format!("Invalid parameters in {}", path.display()))?;
    Ok(params)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => {
            let bands = read_bands(&input)?;
            let first = bands.first().context("Raster has no band")?;
            let (rows, cols) = first.shape();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, first.len());
            println!("Bands: {}", bands.len());
            println!("Cell size: {}", first.transform().cell_size());
            if let Some(nodata) = first.nodata() {
                println!("NoData: {}", nodata);
            }
            for (index, band) in bands.iter().enumerate() {
                let stats = band.statistics();
                println!("\nBand {}:", index + 1);
                if let Some(min) = stats.min {
                    println!("  Min: {:.4}", min);
                }
                if let Some(max) = stats.max {
                    println!("  Max: {:.4}", max);
                }
                if let Some(mean) = stats.mean {
                    println!("  Mean: {:.4}", mean);
                }
                println!("  Valid cells: {}", stats.valid_count);
                println!("  NoData cells: {}", stats.nodata_count);
            }
        }

        Commands::Segment {
            input,
            output,
            params,
            size,
            start,
            step,
            sigma,
            separator,
            eight,
            four,
            min_size,
            classes,
        } => {
            let mut params = load_params(params.as_deref())?;
            if let Some(size) = size {
                params.profile_size = size;
            }
            if let Some(start) = start {
                params.profile_start = start;
            }
            if let Some(step) = step {
                params.profile_step = step;
            }
            if let Some(sigma) = sigma {
                params.sigma = sigma;
            }
            if separator.is_some() {
                params.label_separator = separator;
            }
            if eight {
                params.connectivity = Connectivity::Eight;
            } else if four {
                params.connectivity = Connectivity::Four;
            }
            if let Some(min_size) = min_size {
                params.min_region_size = min_size;
            }
            debug!("Parameters: {:?}", params);

            let mut pipeline =
                MorphologicalProfilesSegmentation::new(params).context("Invalid parameters")?;
            let separator = pipeline.params().label_separator()?;

            let bands = read_bands(&input)?;
            let source = if bands.len() > 1 {
                amplitude(&bands).context("Failed to compute band amplitude")?
            } else {
                bands.into_iter().next().context("Raster has no band")?
            };
            pipeline.set_input(source);

            let start = Instant::now();
            let pb = spinner("Segmenting...");
            let result = pipeline.update().context("Segmentation failed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            let stats = region_stats(&result.labels, &result.classes, separator)?;
            let convex = stats
                .iter()
                .filter(|s| s.convexity == Convexity::Convex)
                .count();
            info!(
                "{} regions ({} convex, {} concave), label separator {}",
                result.region_count,
                convex,
                stats.len() - convex,
                separator
            );

            write_labels(&result.labels, &output)?;
            if let Some(path) = classes {
                write_labels(&result.classes, &path)?;
                println!("Classes saved to: {}", path.display());
            }
            println!("Segmentation saved to: {}", output.display());
            println!("  Processing time: {:.2?}", elapsed);
        }
    }

    Ok(())
}
