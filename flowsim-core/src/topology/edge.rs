use crate::node::NodeId;
use serde::Serialize;

/// An undirected edge between two nodes.
///
/// Edges carry no weight of their own: the cost of a traversal is the
/// latency of the node being left. For all nodes `n1` and `n2` the edge
/// `(n1, n2)` is the same as the edge `(n2, n1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    smaller_id: NodeId,
    larger_id: NodeId,
}

impl Edge {
    /// create the edge from the given node tuple.
    ///
    /// ```
    /// # use flowsim_core::topology::Edge;
    /// # use flowsim_core::node::NodeId;
    /// # let (n1, n2) = (NodeId::ZERO, NodeId::ONE);
    /// assert_eq!(Edge::new((n1, n2)), Edge::new((n2, n1)));
    /// ```
    pub fn new((a, b): (NodeId, NodeId)) -> Self {
        if a < b {
            Self {
                smaller_id: a,
                larger_id: b,
            }
        } else {
            Self {
                smaller_id: b,
                larger_id: a,
            }
        }
    }

    /// the two endpoints, smallest identifier first
    #[inline]
    pub fn into_nodes(self) -> (NodeId, NodeId) {
        (self.smaller_id, self.larger_id)
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.smaller_id == node || self.larger_id == node
    }

    /// the endpoint opposite to `node`, if `node` is an endpoint
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.smaller_id {
            Some(self.larger_id)
        } else if node == self.larger_id {
            Some(self.smaller_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n1n2_eq_n2n1() {
        let n1 = NodeId::ZERO;
        let n2 = NodeId::ONE;

        assert_eq!(Edge::new((n1, n2)), Edge::new((n2, n1)));
        assert_eq!(Edge::new((n2, n1)).into_nodes(), (n1, n2));
    }

    #[test]
    fn other_endpoint() {
        let n1 = NodeId::ZERO;
        let n2 = NodeId::ONE;
        let edge = Edge::new((n2, n1));

        assert!(edge.contains(n1));
        assert_eq!(edge.other(n1), Some(n2));
        assert_eq!(edge.other(n2), Some(n1));
        assert_eq!(edge.other(NodeId::new(7)), None);
    }
}
