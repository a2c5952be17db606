/*!
# Flow Simulator

Real-time driver of [`flowsim_core`]: a background runner fires the
periodic ticks of a [`Simulation`] while the caller edits the topology,
sends flows and reads snapshots.

```no_run
use flowsim::{Schedule, SimConfig, SimContext, TopologyKind};
use std::{thread, time::Duration};

# fn main() -> anyhow::Result<()> {
let context = SimContext::new(SimConfig::default(), Schedule::default())?;
context.generate_topology(TopologyKind::Tree)?;
context.resume();

thread::sleep(Duration::from_secs(2));
println!("{} flows in flight", context.snapshot()?.flows.len());

context.shutdown()
# }
```
*/

mod runner;
mod schedule;

// convenient re-export of `flowsim_core` core objects
pub use flowsim_core::{
    flow::{Algorithm, FlowId},
    measure::{Latency, LossRate},
    node::{NodeId, NodeKind},
    stats::{SimSnapshot, SimStats},
    topology::TopologyKind,
    SimConfig, Simulation, Tick, TrafficLoad,
};

pub use self::{
    runner::{SimContext, TickOutcome},
    schedule::{Schedule, DEFAULT_POLL},
};
