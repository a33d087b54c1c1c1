use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use streamsynth::catalog::{load_catalog, sample_tracks};
use streamsynth::config::GeneratorConfig;
use streamsynth::models::DatasetSummary;
use streamsynth::progress::{format_duration, set_log_only};
use streamsynth::remote::{upload_and_verify, S3Store};
use streamsynth::rng::create_rng;
use streamsynth::safety::validate_output_path;
use streamsynth::simulate::Simulator;
use streamsynth::sink::write_records;

#[derive(Parser)]
#[command(name = "generate-streams")]
#[command(about = "Generate a synthetic daily streaming dataset from a track catalog")]
struct Args {
    /// Generator config (TOML). Falls back to $STREAMSYNTH_CONFIG, then defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Track catalog CSV
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Output CSV
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    sample_tracks: Option<usize>,

    #[arg(long)]
    sample_seed: Option<u64>,

    #[arg(long)]
    days: Option<u32>,

    /// First simulated day (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Region identifiers (comma-separated)
    #[arg(long, value_delimiter = ',')]
    regions: Option<Vec<String>>,

    /// Seed of the stream generator
    #[arg(long)]
    seed: Option<u64>,

    /// Simulate triples in parallel with per-triple sub-streams
    #[arg(long)]
    parallel: bool,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Write the dataset summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Upload the dataset to S3 after writing
    #[arg(long)]
    upload: bool,

    /// Hide progress bars, log only
    #[arg(long)]
    log_only: bool,
}

impl Args {
    fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(path) = &self.catalog {
            config.catalog.path = path.clone();
        }
        if let Some(path) = &self.output {
            config.output.path = path.clone();
        }
        if let Some(n) = self.sample_tracks {
            config.catalog.sample_tracks = n;
        }
        if let Some(seed) = self.sample_seed {
            config.catalog.sample_seed = seed;
        }
        if let Some(days) = self.days {
            config.simulation.num_days = days;
        }
        if let Some(start) = self.start_date {
            config.simulation.start_date = start;
        }
        if let Some(regions) = &self.regions {
            config.simulation.regions = regions.iter().map(|r| r.trim().to_string()).collect();
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(path) = &self.summary_json {
            config.output.summary_json = Some(path.clone());
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    streamsynth::init_logging();
    set_log_only(args.log_only);

    if let Err(e) = run(&args) {
        tracing::error!("Fatal error in data generation: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();
    tracing::info!("=== Starting Streaming Data Generation ===");

    let mut config = GeneratorConfig::resolve(args.config.as_deref())?;
    args.apply(&mut config);
    let sim_config = config.simulation_config()?;

    validate_output_path(&config.output.path, "csv", &[config.catalog.path.as_path()])?;

    let tracks = load_catalog(&config.catalog.path)?;
    let tracks = sample_tracks(tracks, config.catalog.sample_tracks, config.catalog.sample_seed);

    let simulator = Simulator::new(&tracks, &sim_config);
    let records = if args.parallel {
        simulator.run_parallel(config.simulation.seed)
    } else {
        simulator.run(&mut create_rng(config.simulation.seed))
    };

    write_records(&records, &config.output.path)?;

    let summary = DatasetSummary::from_records(&records);
    summary.log_summary();
    if let Some(path) = &config.output.summary_json {
        summary
            .write_to_file(path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    if args.upload {
        tracing::info!("=== Starting S3 Upload ===");
        let store = S3Store::from_settings(&config.remote)?;
        let (locator, _) = upload_and_verify(&store, &config.output.path, &config.remote.prefix)?;
        tracing::info!("=== Upload Complete ===");
        tracing::info!("S3 URI: {}", locator);
    }

    tracing::info!(
        "=== Streaming Data Generation Complete ({}) ===",
        format_duration(start.elapsed())
    );
    Ok(())
}
