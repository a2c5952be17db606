use crate::{measure::Latency, node::NodeId, topology::Topology};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A routed path through the [`Topology`].
///
/// The path always starts with the source and ends with the destination,
/// both included, and holds at least two nodes. The cost is the sum of the
/// latencies of every node on the path except the destination: leaving a
/// node is what costs, arriving is free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    path: Vec<NodeId>,
    cost: Latency,
}

/// The endpoints of a route request cannot be used.
///
/// Detected before any state is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidEndpoints {
    /// The source node ID was not found in the topology.
    #[error("Source ({node}) Not Found")]
    SourceNotFound { node: NodeId },
    /// The destination node ID was not found in the topology.
    #[error("Destination ({node}) Not Found")]
    DestinationNotFound { node: NodeId },
    #[error("Source and destination are the same node ({node})")]
    SameNode { node: NodeId },
}

/// Error returned when a route between two nodes cannot be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error(transparent)]
    InvalidEndpoints(#[from] InvalidEndpoints),
    /// Both nodes exist but no sequence of edges joins them.
    #[error("No path found from ({from}) to ({to})")]
    NoPathFound { from: NodeId, to: NodeId },
}

/// How the hop count of a route compares with the running network average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HopComparison {
    Shorter,
    Longer,
    Equal,
    /// nothing was routed yet
    NoBaseline,
}

/// Detailed view of a [`Route`], see [`Simulation::analyze_route`].
///
/// [`Simulation::analyze_route`]: crate::Simulation::analyze_route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteAnalysis {
    pub route: Route,
    pub hops: usize,
    pub total_latency: Latency,
    /// in milliseconds
    pub average_latency_per_hop: f64,
    pub network_average_hops: Option<f64>,
    pub comparison: HopComparison,
}

impl Route {
    #[inline]
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    #[inline]
    pub fn cost(&self) -> Latency {
        self.cost
    }

    /// number of edges traversed
    #[inline]
    pub fn hops(&self) -> usize {
        self.path.len() - 1
    }

    pub fn source(&self) -> NodeId {
        self.path[0]
    }

    pub fn destination(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }

    pub(crate) fn into_path(self) -> Vec<NodeId> {
        self.path
    }
}

impl RouteAnalysis {
    pub(crate) fn new(route: Route, network_average_hops: Option<f64>) -> Self {
        let hops = route.hops();
        let total_latency = route.cost();
        let average_latency_per_hop = total_latency.as_millis_f64() / hops as f64;

        let comparison = match network_average_hops {
            None => HopComparison::NoBaseline,
            Some(average) if (hops as f64) < average => HopComparison::Shorter,
            Some(average) if (hops as f64) > average => HopComparison::Longer,
            Some(_) => HopComparison::Equal,
        };

        Self {
            route,
            hops,
            total_latency,
            average_latency_per_hop,
            network_average_hops,
            comparison,
        }
    }
}

impl Topology {
    /// Check that `from` and `to` may be used as the endpoints of a route.
    pub fn check_endpoints(&self, from: NodeId, to: NodeId) -> Result<(), InvalidEndpoints> {
        if !self.contains(from) {
            return Err(InvalidEndpoints::SourceNotFound { node: from });
        }
        if !self.contains(to) {
            return Err(InvalidEndpoints::DestinationNotFound { node: to });
        }
        if from == to {
            return Err(InvalidEndpoints::SameNode { node: from });
        }
        Ok(())
    }

    /// Find the lowest latency path from `from` to `to`.
    ///
    /// Dijkstra's algorithm over the current state of the topology, the
    /// weight of a step being the latency of the node it leaves. Among the
    /// unvisited nodes of equal distance the one added first to the
    /// topology is picked, so the result is stable for a given topology.
    ///
    /// Nothing is cached: edits to the topology are visible to the next
    /// call.
    ///
    /// ```
    /// use flowsim_core::{measure::Latency, node::NodeKind, topology::Topology};
    ///
    /// let mut topology = Topology::new();
    /// let a = topology.new_node(NodeKind::Router).set_latency(Latency::from_millis(10)).build();
    /// let b = topology.new_node(NodeKind::Router).set_latency(Latency::from_millis(20)).build();
    /// let c = topology.new_node(NodeKind::Router).build();
    /// topology.connect(a, b).unwrap();
    /// topology.connect(b, c).unwrap();
    ///
    /// let route = topology.shortest_path(a, c).unwrap();
    /// assert_eq!(route.path(), &[a, b, c]);
    /// assert_eq!(route.cost(), Latency::from_millis(30));
    /// ```
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidEndpoints`] if either node is unknown or both
    ///   are the same.
    /// - [`RouteError::NoPathFound`] if `to` is not reachable from `from`.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Result<Route, RouteError> {
        self.check_endpoints(from, to)?;

        let mut distances: BTreeMap<NodeId, Latency> = BTreeMap::new();
        let mut previous: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        distances.insert(from, Latency::ZERO);

        loop {
            // O(V) scan, in insertion order so the first minimum wins
            let mut current: Option<(NodeId, Latency)> = None;
            for id in self.node_ids() {
                if visited.contains(&id) {
                    continue;
                }
                let Some(distance) = distances.get(&id).copied() else {
                    continue;
                };
                if current.is_none_or(|(_, best)| distance < best) {
                    current = Some((id, distance));
                }
            }

            let Some((current, distance)) = current else {
                break;
            };
            if current == to {
                break;
            }
            visited.insert(current);

            let Some(node) = self.node(current) else {
                break;
            };
            let candidate = distance + node.latency();
            for neighbor in node.neighbors() {
                if visited.contains(neighbor) {
                    continue;
                }
                if distances.get(neighbor).is_none_or(|known| candidate < *known) {
                    distances.insert(*neighbor, candidate);
                    previous.insert(*neighbor, current);
                }
            }
        }

        let Some(cost) = distances.get(&to).copied() else {
            return Err(RouteError::NoPathFound { from, to });
        };

        let mut path = vec![to];
        let mut cursor = to;
        while let Some(prev) = previous.get(&cursor) {
            path.push(*prev);
            cursor = *prev;
        }
        path.reverse();

        Ok(Route { path, cost })
    }
}
