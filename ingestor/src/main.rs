use anyhow::Context;
use clap::Parser;
use generator::profile::{write_synthetic_product, GeneratorConfig};
use l1bcore::MissionId;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::IngestConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Decode altimetry L1b products into canonical pulse tracks")]
struct Args {
    /// Load the ingest configuration from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Mission of the INPUT files
    #[arg(long)]
    mission: Option<MissionId>,
    /// IETF leap-seconds.list replacing the built-in table
    #[arg(long)]
    leap_seconds: Option<PathBuf>,
    /// Write the JSON run report here instead of stdout
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Write a synthetic CryoSat-2 product (file or directory) and ingest it
    #[arg(long)]
    synthetic: Option<PathBuf>,
    /// Seed of the synthetic product noise
    #[arg(long, default_value_t = 0)]
    seed: u64,
    inputs: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        IngestConfig::load(path)?
    } else {
        IngestConfig::default()
    };
    if args.leap_seconds.is_some() {
        config.leap_seconds = args.leap_seconds.clone();
    }
    if !args.inputs.is_empty() {
        let mission = args
            .mission
            .context("--mission is required when INPUT files are given")?;
        config.add_inputs(mission, args.inputs.clone());
    }
    if let Some(target) = &args.synthetic {
        let generator = GeneratorConfig {
            seed: args.seed,
            ..Default::default()
        };
        let path = write_synthetic_product(target, &generator)?;
        info!("synthetic product written to {}", path.display());
        config.add_inputs(MissionId::Cryosat2, vec![path]);
    }
    if config.input_count() == 0 {
        warn!("no products to ingest");
        return Ok(());
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.workers.max(1))
        .build()
        .context("creating ingest runtime")?;
    let runner = Runner::new(config);
    let report = runtime.block_on(runner.execute())?;

    println!(
        "Ingest run -> tracks {}, failed {}, pulses {}, trimmed {}",
        report.metrics.tracks_decoded,
        report.metrics.tracks_failed,
        report.metrics.pulses_decoded,
        report.metrics.pulses_trimmed
    );

    let json = serde_json::to_string_pretty(&report).context("serialising ingest report")?;
    match &args.summary {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json).with_context(|| format!("writing summary {}", path.display()))?;
        }
        None => println!("{}", json),
    }

    Ok(())
}
