use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use drift_cli::{DriftEstimator, ImageSource, load_config};
use drift_core::{RegistrationConfig, Strategy, init_thread_pool};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Keypoints,
    PatternSearch,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Keypoints => Strategy::Keypoints,
            StrategyArg::PatternSearch => Strategy::PatternSearch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    Microscopy,
    Fast,
}

/// Stage-drift estimation between two grayscale images.
#[derive(Debug, Parser)]
#[command(author, version, about = "Estimate the translation between a reference and a target image")]
struct Args {
    /// Reference image
    reference: PathBuf,

    /// Target image, the one that drifted
    target: PathBuf,

    /// JSON or TOML RegistrationConfig. Defaults are used if omitted.
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Start from a built-in preset instead of the defaults
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Neighbour radius of the density-mode estimator, in pixels
    #[arg(long)]
    radius: Option<f64>,

    /// Half-width of the pattern-search window, in pixels
    #[arg(long)]
    search_radius: Option<usize>,

    /// Keep one-sided descriptor matches
    #[arg(long)]
    no_cross_check: bool,

    /// Trim offsets beyond one standard deviation before the consensus
    #[arg(long)]
    prefilter: bool,

    #[arg(long)]
    threads: Option<usize>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn build_config(args: &Args) -> Result<RegistrationConfig, Box<dyn Error>> {
    let mut config = match (&args.config, args.preset) {
        (Some(path), _) => load_config(path)?,
        (None, Some(PresetArg::Microscopy)) => RegistrationConfig::microscopy_preset(),
        (None, Some(PresetArg::Fast)) => RegistrationConfig::fast_preset(),
        (None, None) => RegistrationConfig::default(),
    };

    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(radius) = args.radius {
        config.consensus_radius = radius;
    }
    if let Some(search_radius) = args.search_radius {
        config.search_radius = search_radius;
    }
    if args.no_cross_check {
        config.cross_check = false;
    }
    if args.prefilter {
        config.prefilter = true;
    }
    if let Some(threads) = args.threads {
        config.n_threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = build_config(&args)?;
    // An already running pool is kept
    let _ = init_thread_pool(config.n_threads);

    let estimator = DriftEstimator::new(config)?;
    let reference = ImageSource::from(args.reference.clone()).load()?;
    let target = ImageSource::from(args.target.clone()).load()?;

    let t0 = Instant::now();
    let report = estimator.estimate_detailed(&reference, &target)?;
    info!(
        "{:?}: {} offsets, {} in consensus, {:.2?}",
        report.strategy,
        report.offsets.len(),
        report.consensus.members.len(),
        t0.elapsed()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.translation);
    }
    Ok(())
}
