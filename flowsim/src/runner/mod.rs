mod control;
mod guard;

pub(crate) use self::guard::slot;
use self::{control::Control, guard::TickGuards};
use crate::schedule::{Schedule, Timers};
use anyhow::{anyhow, bail, Context as _, Result};
use flowsim_core::{
    flow::{Algorithm, FlowId},
    measure::LossRate,
    node::{NodeId, NodeKind},
    stats::SimSnapshot,
    topology::TopologyKind,
    SimConfig, Simulation, Tick, TrafficLoad,
};
use std::{
    io,
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
    time::Instant,
};

/// Result of a [`SimContext::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ran,
    /// the same tick was already running
    Skipped,
}

/// A [`Simulation`] driven in real time by a background runner.
///
/// The runner fires the three [`Tick`]s following the [`Schedule`]. The
/// context starts paused: build the topology first, then
/// [`resume`](Self::resume). Pausing stops every timer; resuming starts
/// fresh periods, missed ticks are not replayed.
///
/// Renderers read [`snapshot`](Self::snapshot), published after every
/// tick and every mutation; reading it never waits for a tick.
///
/// Make sure to call [`SimContext::shutdown`] for a clean stop of the
/// runner.
pub struct SimContext {
    shared: Arc<Shared>,

    thread: JoinHandle<Result<()>>,
}

struct Shared {
    sim: Mutex<Simulation>,

    snapshot: SnapshotCell,

    control: Control,

    guards: TickGuards,

    schedule: Schedule,
}

/// The latest published [`SimSnapshot`].
///
/// Only held long enough to clone or swap the [`Arc`].
struct SnapshotCell(Mutex<Arc<SimSnapshot>>);

impl SnapshotCell {
    fn new(snapshot: SimSnapshot) -> Self {
        Self(Mutex::new(Arc::new(snapshot)))
    }

    fn load(&self) -> Result<Arc<SimSnapshot>> {
        self.0
            .lock()
            .map(|snapshot| Arc::clone(&snapshot))
            .map_err(|error| anyhow!("Failed to read the snapshot, mutex poisoned {error}"))
    }

    fn publish(&self, snapshot: SimSnapshot) -> Result<()> {
        let mut current = self
            .0
            .lock()
            .map_err(|error| anyhow!("Failed to publish the snapshot, mutex poisoned {error}"))?;
        *current = Arc::new(snapshot);
        Ok(())
    }
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Simulation>> {
        self.sim
            .lock()
            .map_err(|error| anyhow!("Failed to acquire the simulation, mutex poisoned {error}"))
    }

    fn run(&self, tick: Tick) -> Result<TickOutcome> {
        let Some(_guard) = self.guards.acquire(tick) else {
            tracing::trace!(?tick, "tick skipped, already running");
            return Ok(TickOutcome::Skipped);
        };

        self.mutate(|sim| sim.tick(tick))?;
        Ok(TickOutcome::Ran)
    }

    /// Apply `f` between two ticks then republish the snapshot.
    ///
    /// The snapshot is published before the simulation is released so
    /// publications follow the order of the mutations.
    fn mutate<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Simulation) -> R,
    {
        let mut sim = self.lock()?;
        let result = f(&mut sim);
        self.snapshot.publish(sim.snapshot())?;
        Ok(result)
    }

    fn traffic_load(&self) -> Result<TrafficLoad> {
        Ok(self.snapshot.load()?.stats.traffic_load)
    }
}

impl SimContext {
    /// Create the simulation and start the runner, paused.
    pub fn new(config: SimConfig, schedule: Schedule) -> Result<Self> {
        let sim = Simulation::new(config);
        let snapshot = SnapshotCell::new(sim.snapshot());

        let shared = Arc::new(Shared {
            sim: Mutex::new(sim),
            snapshot,
            control: Control::new(true),
            guards: TickGuards::default(),
            schedule,
        });

        let runner = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("flowsim-runner".to_owned())
            .spawn(move || runner_run(runner))
            .context("Failed to spawn the runner thread")?;

        Ok(Self { shared, thread })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.shared.schedule
    }

    pub fn is_paused(&self) -> bool {
        self.shared.control.paused()
    }

    pub fn pause(&self) {
        self.shared.control.pause();
        tracing::info!("simulation paused");
    }

    pub fn resume(&self) {
        self.shared.control.resume();
        tracing::info!("simulation resumed");
    }

    /// Run one tick now, whether paused or not.
    pub fn step(&self, tick: Tick) -> Result<TickOutcome> {
        self.shared.run(tick)
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Result<Arc<SimSnapshot>> {
        self.shared.snapshot.load()
    }

    /// Run `f` on the simulation between two ticks, without republishing.
    pub fn inspect<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Simulation) -> R,
    {
        let sim = self.shared.lock()?;
        Ok(f(&sim))
    }

    /// Write the event log as CSV.
    pub fn export_events<W: io::Write>(&self, writer: W) -> Result<()> {
        self.inspect(|sim| sim.events().write_csv(writer))?
            .context("Failed to export the events")
    }

    /// Write the performance history as CSV.
    pub fn export_performance<W: io::Write>(&self, writer: W) -> Result<()> {
        self.inspect(|sim| sim.performance().write_csv(writer))?
            .context("Failed to export the performance history")
    }

    pub fn reset(&self) -> Result<()> {
        self.shared.mutate(Simulation::reset)
    }

    pub fn set_seed(&self, seed: u64) -> Result<()> {
        self.shared.mutate(|sim| sim.set_seed(seed))
    }

    pub fn add_node(&self, kind: NodeKind) -> Result<NodeId> {
        self.shared.mutate(|sim| sim.add_node(kind))
    }

    pub fn connect(&self, a: NodeId, b: NodeId) -> Result<bool> {
        Ok(self.shared.mutate(|sim| sim.connect(a, b))??)
    }

    pub fn disconnect(&self, a: NodeId, b: NodeId) -> Result<bool> {
        Ok(self.shared.mutate(|sim| sim.disconnect(a, b))??)
    }

    pub fn remove_node(&self, id: NodeId) -> Result<()> {
        self.shared.mutate(|sim| sim.remove_node(id))??;
        Ok(())
    }

    pub fn generate_topology(&self, kind: TopologyKind) -> Result<Vec<NodeId>> {
        self.shared.mutate(|sim| sim.generate_topology(kind))
    }

    pub fn set_traffic_load(&self, load: TrafficLoad) -> Result<()> {
        self.shared.mutate(|sim| sim.set_traffic_load(load))
    }

    pub fn set_algorithm(&self, algorithm: Algorithm) -> Result<()> {
        self.shared.mutate(|sim| sim.set_algorithm(algorithm))
    }

    pub fn set_loss_rate(&self, loss_rate: LossRate) -> Result<()> {
        self.shared.mutate(|sim| sim.set_loss_rate(loss_rate))
    }

    pub fn send_manual(&self, source: NodeId, destination: NodeId) -> Result<FlowId> {
        self.shared
            .mutate(|sim| sim.send_manual(source, destination))?
            .with_context(|| anyhow!("Failed to send from {source} to {destination}"))
    }

    pub fn shutdown(self) -> Result<()> {
        self.shared.control.stop();

        match self.thread.join() {
            Err(join_error) => {
                bail!("Runner failed to clean shutdown: {join_error:?}")
            }
            Ok(Err(error)) => Err(error).context("Runner failed with error"),
            Ok(Ok(())) => Ok(()),
        }
    }
}

fn runner_run(shared: Arc<Shared>) -> Result<()> {
    let schedule = shared.schedule;
    let mut load = shared.traffic_load()?;
    let mut timers = Timers::new(Instant::now(), &schedule, load);

    // the context is the only other owner: once it is gone nobody can
    // stop the runner
    while !shared.control.stopped() && Arc::strong_count(&shared) > 1 {
        let now = Instant::now();

        if shared.control.paused() {
            timers.restart(now, &schedule, load);
        } else {
            for tick in timers.elapsed(now, &schedule, load) {
                shared.run(tick)?;
            }
            load = shared.traffic_load()?;
        }

        thread::sleep(schedule.poll);
    }

    tracing::debug!("runner stopped");
    Ok(())
}
