use serde::Serialize;
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// The traffic load presets.
///
/// Each load maps to a [`LoadProfile`] driving random flow generation and
/// the congestion model.
///
/// ```
/// # use flowsim_core::TrafficLoad;
/// let load: TrafficLoad = "heavy".parse().unwrap();
/// let profile = load.profile();
///
/// assert_eq!(profile.concurrency_cap, 50);
/// assert!(profile.performance_mode);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLoad {
    Light,
    #[default]
    Medium,
    Heavy,
}

/// Parameters derived from a [`TrafficLoad`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadProfile {
    /// time between two random flow generation attempts
    pub generation_interval: Duration,
    /// added to the congestion of every node of a newly routed path
    pub congestion_increment: f64,
    /// random flows are shed while this many flows are active
    pub concurrency_cap: usize,
    /// hint to renderers to reduce their update rate
    pub performance_mode: bool,
    /// removed from every node's congestion on each decay tick
    pub decay_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown traffic load `{0}', expected one of light, medium, heavy")]
pub struct TrafficLoadParseError(String);

impl TrafficLoad {
    pub const ALL: [Self; 3] = [Self::Light, Self::Medium, Self::Heavy];

    pub const fn profile(self) -> LoadProfile {
        match self {
            Self::Light => LoadProfile {
                generation_interval: Duration::from_millis(2_000),
                congestion_increment: 0.5,
                concurrency_cap: 50,
                performance_mode: false,
                decay_rate: 0.2,
            },
            Self::Medium => LoadProfile {
                generation_interval: Duration::from_millis(1_000),
                congestion_increment: 1.0,
                concurrency_cap: 80,
                performance_mode: false,
                decay_rate: 0.2,
            },
            // sustained pressure: slower decay
            Self::Heavy => LoadProfile {
                generation_interval: Duration::from_millis(300),
                congestion_increment: 2.0,
                concurrency_cap: 50,
                performance_mode: true,
                decay_rate: 0.1,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
        }
    }
}

impl fmt::Display for TrafficLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficLoad {
    type Err = TrafficLoadParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "heavy" => Ok(Self::Heavy),
            _ => Err(TrafficLoadParseError(s.to_owned())),
        }
    }
}
