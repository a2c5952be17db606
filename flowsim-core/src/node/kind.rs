use serde::Serialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Informational type tag of a node.
///
/// The simulation core treats every kind the same way; the tag only drives
/// naming and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Cloud,
    Router,
    Switch,
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node kind `{0}', expected one of cloud, router, switch, host")]
pub struct NodeKindParseError(String);

impl NodeKind {
    pub const ALL: [Self; 4] = [Self::Cloud, Self::Router, Self::Switch, Self::Host];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Host => "host",
        }
    }

    /// prefix used when a display name is generated, e.g. `SWITCH`
    pub(crate) fn name_prefix(self) -> &'static str {
        match self {
            Self::Cloud => "CLOUD",
            Self::Router => "ROUTER",
            Self::Switch => "SWITCH",
            Self::Host => "HOST",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = NodeKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" => Ok(Self::Cloud),
            "router" => Ok(Self::Router),
            "switch" => Ok(Self::Switch),
            // `pc` is accepted as an alias
            "host" | "pc" => Ok(Self::Host),
            _ => Err(NodeKindParseError(s.to_owned())),
        }
    }
}
