/*!
Flow-level network simulation with TCP Reno/Tahoe congestion control.

A [`Simulation`] owns a [`topology::Topology`] of typed nodes, routes
[`flow::Flow`]s over it by latency-weighted shortest paths, and moves them
hop by hop while every node entry drives their congestion control. It is
entirely passive: the caller drives it with the three [`Tick`]s, at
whatever pace it likes, and reads [`Simulation::snapshot`] back.

Everything random is drawn from seeded generators so a run replays
exactly.
*/

pub mod defaults;
pub mod event;
pub mod flow;
pub mod measure;
pub mod node;
pub mod stats;
pub mod topology;

mod config;
mod load;
mod random;
mod round;
mod simulation;
mod time;

pub use self::{
    config::SimConfig,
    load::{LoadProfile, TrafficLoad, TrafficLoadParseError},
    round::Round,
    simulation::{Generation, Simulation, Tick},
    time::{Interval, IntervalParseError},
};
