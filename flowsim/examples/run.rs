use anyhow::{Context, Result};
use clap::Parser;
use flowsim::{Algorithm, LossRate, SimConfig, Simulation, TopologyKind, TrafficLoad};
use flowsim_core::{defaults::DEFAULT_DECAY_INTERVAL, Interval};
use indicatif::ProgressBar;
use std::{fs::File, io::BufWriter, path::PathBuf};
use tracing::info;

/// Run a simulation headless, as fast as possible, and print its final
/// statistics as JSON.
///
/// Simulated time is used for every periodic driver so the outcome only
/// depends on the arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless flow simulation")]
struct Args {
    #[arg(long, default_value = "tree")]
    topology: TopologyKind,

    #[arg(long, default_value = "medium")]
    load: TrafficLoad,

    #[arg(long, default_value = "reno")]
    algorithm: Algorithm,

    /// pre-transmission loss of the random flows, e.g. `2.5%`
    #[arg(long, default_value = "0%")]
    loss: LossRate,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// simulated duration, e.g. `1m 30s`
    #[arg(long, default_value = "60s")]
    duration: Interval,

    /// write the event log as CSV
    #[arg(long)]
    events: Option<PathBuf>,

    /// write the performance history as CSV
    #[arg(long)]
    performance: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = SimConfig {
        seed: args.seed,
        algorithm: args.algorithm,
        traffic_load: args.load,
        loss_rate: args.loss,
        ..SimConfig::default()
    };
    let step = config.advance_step;
    let mut sim = Simulation::new(config);
    let nodes = sim.generate_topology(args.topology);
    info!(topology = %args.topology, nodes = nodes.len(), "starting");

    let generate_every = args.load.profile().generation_interval;
    let total = args.duration.into_duration();
    let rounds = (total.as_millis() / step.as_millis()) as u64;

    let pb = ProgressBar::new(rounds);
    for _ in 0..rounds {
        sim.tick_advance();
        let elapsed = sim.elapsed().as_millis();
        if elapsed % generate_every.as_millis() == 0 {
            sim.tick_generate();
        }
        if elapsed % DEFAULT_DECAY_INTERVAL.as_millis() == 0 {
            sim.tick_decay();
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    if let Some(path) = &args.events {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        sim.events()
            .write_csv(BufWriter::new(file))
            .context("Failed to write the events")?;
    }

    if let Some(path) = &args.performance {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        sim.performance()
            .write_csv(BufWriter::new(file))
            .context("Failed to write the performance history")?;
    }

    let stats = serde_json::to_string_pretty(&sim.stats()).context("Failed to encode the stats")?;
    println!("{stats}");

    Ok(())
}
