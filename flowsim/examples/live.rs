use anyhow::{Context, Result};
use clap::Parser;
use flowsim::{
    Algorithm, LossRate, Schedule, SimConfig, SimContext, SimSnapshot, TopologyKind, TrafficLoad,
};
use flowsim_core::Interval;
use indicatif::{ProgressBar, ProgressStyle};
use std::{thread, time::Instant};

/// Run a simulation in real time and follow it from its snapshots, the
/// way a renderer would.
///
/// Halfway through, the simulation is paused for a second then resumed
/// with the other congestion-control algorithm.
#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time flow simulation")]
struct Args {
    #[arg(long, default_value = "random_tree")]
    topology: TopologyKind,

    #[arg(long, default_value = "heavy")]
    load: TrafficLoad,

    #[arg(long, default_value = "1%")]
    loss: LossRate,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// wall-clock duration of the run
    #[arg(long, default_value = "10s")]
    duration: Interval,

    /// print the last snapshot as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn render(snapshot: &SimSnapshot) -> String {
    let stats = &snapshot.stats;
    format!(
        "{algorithm} | {active} flows | cwnd {cwnd:.2} | lost {lost:.1}% | delivered {delivered} | dropped {dropped}",
        algorithm = stats.algorithm,
        active = stats.active_flows,
        cwnd = stats.average_cwnd,
        lost = stats.lost_percent,
        delivered = stats.counters.delivered,
        dropped = stats.counters.dropped,
    )
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let config = SimConfig {
        seed: args.seed,
        traffic_load: args.load,
        loss_rate: args.loss,
        ..SimConfig::default()
    };
    let context = SimContext::new(config, Schedule::default())?;
    context.generate_topology(args.topology)?;
    context.resume();

    let duration = args.duration.into_duration();
    let switch_at = duration / 2;
    let mut switched = false;

    let pb = ProgressBar::new(duration.as_millis() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:30} {msg}").context("Invalid progress template")?,
    );

    let start = Instant::now();
    while start.elapsed() < duration {
        if !switched && start.elapsed() >= switch_at {
            context.pause();
            thread::sleep(std::time::Duration::from_secs(1));
            context.set_algorithm(Algorithm::Tahoe)?;
            context.resume();
            switched = true;
        }

        let snapshot = context.snapshot()?;
        pb.set_position(start.elapsed().as_millis() as u64);
        pb.set_message(render(&snapshot));

        thread::sleep(context.schedule().advance_every);
    }
    pb.finish();

    if args.json {
        let snapshot = context.snapshot()?;
        let json =
            serde_json::to_string_pretty(&*snapshot).context("Failed to encode the snapshot")?;
        println!("{json}");
    }

    context.shutdown()
}
