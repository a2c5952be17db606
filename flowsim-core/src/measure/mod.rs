mod congestion;
mod latency;
mod loss;

pub use self::{
    congestion::{Congestion, Severity},
    latency::Latency,
    loss::{LossRate, LossRateError, LossRateParseError},
};
