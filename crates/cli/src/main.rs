//! Phenora CLI - growing-season phenology extraction

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use phenora_phenology::config::{DateWindow, PhenologyConfig};
use phenora_phenology::pipeline::{
    process_tile, run_average, run_decline, run_onset, run_peak,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "phenora")]
#[command(author, version, about = "Growing-season phenology from vegetation-index time series", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the external land/water mask
    #[arg(long, global = true)]
    mask: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the multi-year seasonal average over a date window
    Average {
        /// Directory of input frames (ndvi<YY>_<DDD>.tiff)
        datadir: PathBuf,
        /// Output directory
        outputdir: PathBuf,
        /// File name for the average product
        avg_filename: String,
        /// Window start; year bounds the years considered, month/day
        /// repeat within each year
        #[arg(default_value = "1900-07-04")]
        date_start: String,
        /// Window end
        #[arg(default_value = "2525-08-03")]
        date_end: String,
    },
    /// Detect season onset: first day above a scaled average
    Above {
        /// Directory of input frames
        datadir: PathBuf,
        /// Output directory (must contain the average product)
        outputdir: PathBuf,
        /// Scale applied to the average to form the threshold
        threshold_scale: f64,
        /// File name of the precomputed average product
        avg_filename: String,
    },
    /// Detect season peak: day of the per-pixel maximum
    Peak {
        /// Directory of input frames
        datadir: PathBuf,
        /// Output directory
        outputdir: PathBuf,
    },
    /// Detect season end: first day below a scaled per-year baseline
    Below {
        /// Directory of input frames
        datadir: PathBuf,
        /// Output directory
        outputdir: PathBuf,
        /// Scale applied to the baseline to form the threshold
        threshold_scale: f64,
        /// Baseline window start
        #[arg(default_value = "1900-07-20")]
        date_start: String,
        /// Baseline window end
        #[arg(default_value = "2525-08-09")]
        date_end: String,
    },
    /// Run the full chain for one tile: average, onset, peak, end
    Run {
        /// Directory of input frames
        datadir: PathBuf,
        /// Output directory
        outputdir: PathBuf,
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

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} results in: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn base_config(mask: Option<PathBuf>) -> PhenologyConfig {
    let mut config = PhenologyConfig::default();
    if let Some(mask) = mask {
        config.mask_path = mask;
    }
    config
}

/// Flags whose value arrives as the following token.
const VALUE_FLAGS: &[&str] = &["--mask"];

/// Opcodes are matched case-insensitively: lowercase the first free
/// argument before handing the command line to clap. Flags and their
/// values (e.g. a mask path on a case-sensitive filesystem) are left
/// untouched.
fn normalize_opcode(mut args: Vec<String>) -> Vec<String> {
    let mut expect_value = false;
    for arg in args.iter_mut().skip(1) {
        if expect_value {
            expect_value = false;
            continue;
        }
        if arg.starts_with('-') {
            expect_value = VALUE_FLAGS.contains(&arg.as_str());
            continue;
        }
        *arg = arg.to_lowercase();
        break;
    }
    args
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_opcode(std::env::args().collect()));
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Average {
            datadir,
            outputdir,
            avg_filename,
            date_start,
            date_end,
        } => {
            let mut config = base_config(cli.mask);
            config.avg_filename = avg_filename;
            config.onset_window = DateWindow::parse(&date_start, &date_end)
                .context("Invalid averaging window")?;

            info!(
                "Averaging window {} to {}",
                config.onset_window.start, config.onset_window.end
            );
            let pb = spinner("Computing seasonal average...");
            let start = Instant::now();
            run_average(&datadir, &outputdir, &config)
                .context("Failed to compute seasonal average")?;
            pb.finish_and_clear();
            done("Average", &outputdir, start.elapsed());
        }

        Commands::Above {
            datadir,
            outputdir,
            threshold_scale,
            avg_filename,
        } => {
            let mut config = base_config(cli.mask);
            config.avg_filename = avg_filename;
            config.onset_threshold_scale = threshold_scale;

            let pb = spinner("Detecting season onset...");
            let start = Instant::now();
            run_onset(&datadir, &outputdir, &config).context("Failed to detect onset")?;
            pb.finish_and_clear();
            done("Onset", &outputdir, start.elapsed());
        }

        Commands::Peak { datadir, outputdir } => {
            let config = base_config(cli.mask);

            let pb = spinner("Detecting season peak...");
            let start = Instant::now();
            run_peak(&datadir, &outputdir, &config).context("Failed to detect peak")?;
            pb.finish_and_clear();
            done("Peak", &outputdir, start.elapsed());
        }

        Commands::Below {
            datadir,
            outputdir,
            threshold_scale,
            date_start,
            date_end,
        } => {
            let mut config = base_config(cli.mask);
            config.end_threshold_scale = threshold_scale;
            config.end_window =
                DateWindow::parse(&date_start, &date_end).context("Invalid baseline window")?;

            info!(
                "Baseline window {} to {}",
                config.end_window.start, config.end_window.end
            );
            let pb = spinner("Detecting season end...");
            let start = Instant::now();
            run_decline(&datadir, &outputdir, &config).context("Failed to detect season end")?;
            pb.finish_and_clear();
            done("End", &outputdir, start.elapsed());
        }

        Commands::Run { datadir, outputdir } => {
            let config = base_config(cli.mask);

            let start = Instant::now();
            process_tile(&datadir, &outputdir, &config).context("Failed to process tile")?;
            done("Tile", &outputdir, start.elapsed());
        }
    }

    Ok(())
}
