//! Node-splitting transformation of a CPDVRP instance.
//!
//! Every non-depot location `i` is split into an arrival node (`2i - 1`) and a
//! post-service node (`2i`), joined by a service arc that costs the location's
//! load time. Travel between locations always leaves from a post-service node
//! and enters an arrival node, so a route pays every service time exactly once
//! and capacity transits can tell "before service" from "after service".

use serde::{Deserialize, Serialize};

use crate::engine::UNREACHABLE;
use crate::instance::{CpdvrpInstance, DEPOT};

/// A node of the transformed transit graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location")]
pub enum TransformedNode {
    Depot,
    /// Vehicle has reached the location, service not started.
    Arrival(usize),
    /// Service at the location is complete.
    PostService(usize),
}

impl TransformedNode {
    /// Decode a transformed node index.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => TransformedNode::Depot,
            i if i % 2 == 1 => TransformedNode::Arrival(physical_location(i)),
            i => TransformedNode::PostService(physical_location(i)),
        }
    }

    /// Encode into a transformed node index.
    #[inline]
    pub fn index(&self) -> usize {
        match *self {
            TransformedNode::Depot => DEPOT,
            TransformedNode::Arrival(location) => arrival_index(location),
            TransformedNode::PostService(location) => post_service_index(location),
        }
    }

    /// Physical location this node belongs to.
    #[inline]
    pub fn location(&self) -> usize {
        match *self {
            TransformedNode::Depot => DEPOT,
            TransformedNode::Arrival(location) | TransformedNode::PostService(location) => location,
        }
    }

    pub fn is_depot(&self) -> bool {
        matches!(self, TransformedNode::Depot)
    }
}

#[inline]
pub fn arrival_index(location: usize) -> usize {
    debug_assert!(location != DEPOT);
    2 * location - 1
}

#[inline]
pub fn post_service_index(location: usize) -> usize {
    debug_assert!(location != DEPOT);
    2 * location
}

/// Map a transformed node index back to its physical location.
#[inline]
pub fn physical_location(index: usize) -> usize {
    (index + 1) / 2
}

/// Number of transformed nodes for `locations` physical locations.
#[inline]
pub fn transformed_size(locations: usize) -> usize {
    2 * locations - 1
}

/// Dense `(2N - 1) x (2N - 1)` arc cost matrix of the transformed graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitGraph {
    size: usize,
    costs: Vec<i64>,
}

impl TransitGraph {
    pub fn build(instance: &CpdvrpInstance) -> Self {
        let locations = instance.num_locations();
        let size = transformed_size(locations);
        let mut graph = TransitGraph {
            size,
            costs: vec![UNREACHABLE; size * size],
        };

        for i in 0..locations {
            // Leaving a location always happens after service.
            let from = if i == DEPOT { DEPOT } else { post_service_index(i) };
            for j in 0..locations {
                let to = if j == DEPOT { DEPOT } else { arrival_index(j) };
                graph.set(from, to, instance.distance(i, j));
            }
            if i != DEPOT {
                graph.set(arrival_index(i), post_service_index(i), instance.load_time()[i]);
            }
        }

        graph
    }

    #[inline]
    fn set(&mut self, from: usize, to: usize, cost: i64) {
        self.costs[from * self.size + to] = cost;
    }

    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> i64 {
        self.costs[from * self.size + to]
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.distance(from, to) < UNREACHABLE
    }

    /// Rows of the matrix, for display and export.
    pub fn rows(&self) -> impl Iterator<Item = &[i64]> {
        self.costs.chunks(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> CpdvrpInstance {
        CpdvrpInstance::new(
            vec![
                vec![0, 10, 20],
                vec![11, 0, 30],
                vec![21, 31, 0],
            ],
            vec![0, 1, 2],
            vec![0, 2, 1],
            vec![0, 4, 5],
            vec![5],
        )
        .unwrap()
    }

    #[test]
    fn test_node_count() {
        for n in 1..10 {
            assert_eq!(transformed_size(n), 2 * n - 1);
        }
        assert_eq!(TransitGraph::build(&instance()).node_count(), 5);
    }

    #[test]
    fn test_index_mapping_is_bijective() {
        let locations = 6;
        let mut seen = vec![false; transformed_size(locations)];
        seen[TransformedNode::Depot.index()] = true;
        for location in 1..locations {
            for node in [TransformedNode::Arrival(location), TransformedNode::PostService(location)] {
                let index = node.index();
                assert!(!seen[index], "index {} produced twice", index);
                seen[index] = true;
                assert_eq!(TransformedNode::from_index(index), node);
                assert_eq!(physical_location(index), location);
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(TransformedNode::from_index(0), TransformedNode::Depot);
    }

    #[test]
    fn test_arc_costs() {
        let graph = TransitGraph::build(&instance());

        // depot -> arrival
        assert_eq!(graph.distance(0, 1), 10);
        assert_eq!(graph.distance(0, 3), 20);
        // service arcs
        assert_eq!(graph.distance(1, 2), 4);
        assert_eq!(graph.distance(3, 4), 5);
        // post-service -> arrival / depot
        assert_eq!(graph.distance(2, 3), 30);
        assert_eq!(graph.distance(4, 1), 31);
        assert_eq!(graph.distance(2, 0), 11);
        assert_eq!(graph.distance(4, 0), 21);
        assert_eq!(graph.distance(0, 0), 0);
    }

    #[test]
    fn test_unmodeled_arcs_are_unreachable() {
        let graph = TransitGraph::build(&instance());

        // arrival nodes only lead to their own post-service node
        for to in [0, 3, 4] {
            assert!(!graph.is_reachable(1, to));
        }
        // post-service nodes are only entered through their arrival node
        for from in [0, 3, 4] {
            assert!(!graph.is_reachable(from, 2));
        }
        assert!(!graph.is_reachable(1, 3));
        assert_eq!(graph.distance(3, 1), UNREACHABLE);
    }
}
