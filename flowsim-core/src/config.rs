use crate::{
    defaults::DEFAULT_ADVANCE_STEP,
    flow::Algorithm,
    load::TrafficLoad,
    measure::LossRate,
};
use std::time::Duration;

/// Initial settings of a [`Simulation`].
///
/// Everything but the advance step can be changed later on the running
/// simulation.
///
/// [`Simulation`]: crate::Simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// seed of the simulation's random generator
    pub seed: u64,
    /// applied to the flows admitted from now on
    pub algorithm: Algorithm,
    pub traffic_load: TrafficLoad,
    /// pre-transmission loss of the random flows
    pub loss_rate: LossRate,
    /// simulated time elapsed on every advance tick
    pub advance_step: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            algorithm: Algorithm::default(),
            traffic_load: TrafficLoad::default(),
            loss_rate: LossRate::NONE,
            advance_step: DEFAULT_ADVANCE_STEP,
        }
    }
}
