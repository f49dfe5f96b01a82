//! Solution representation for the CPDVRP.
//!
//! Routes are kept in the transformed node space so the reporter and the
//! capacity checks see exactly what the search saw.

use crate::dimensions::{delivery_transit, net_load_transit};
use crate::instance::CpdvrpInstance;
use crate::transform::TransformedNode;
use serde::{Deserialize, Serialize};

/// One vehicle's route, depot to depot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRoute {
    pub vehicle: usize,
    pub capacity: i64,
    pub nodes: Vec<TransformedNode>,
}

/// Load carried along a route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadProfile {
    /// Cumulative deliveries at each node.
    pub delivered: Vec<i64>,
    /// Cumulative deliveries minus pickups at each node.
    pub net: Vec<i64>,
}

impl VehicleRoute {
    /// Locations served, in visiting order.
    pub fn stops(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TransformedNode::Arrival(location) => Some(*location),
                _ => None,
            })
            .collect()
    }

    /// True for a depot -> depot route.
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| node.is_depot())
    }

    pub fn load_profile(&self, instance: &CpdvrpInstance) -> LoadProfile {
        let (deliveries, pickups) = (instance.deliveries(), instance.pickups());
        let mut profile = LoadProfile::default();
        if self.nodes.is_empty() {
            return profile;
        }
        let (mut delivered, mut net) = (0, 0);
        profile.delivered.push(delivered);
        profile.net.push(net);

        for arc in self.nodes.windows(2) {
            let from = arc[0].index();
            delivered += delivery_transit(deliveries, from);
            net += net_load_transit(deliveries, pickups, from);
            profile.delivered.push(delivered);
            profile.net.push(net);
        }

        profile
    }

    /// Both cumuls stay within `[0, capacity]` at every node.
    pub fn respects_capacity(&self, instance: &CpdvrpInstance) -> bool {
        let profile = self.load_profile(instance);
        profile
            .delivered
            .iter()
            .chain(&profile.net)
            .all(|&load| (0..=self.capacity).contains(&load))
    }
}

/// A complete CPDVRP solution: one route per vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub routes: Vec<VehicleRoute>,
    /// Arc costs plus the span cost of the distance dimension.
    pub objective: i64,
    /// Engine that produced this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    pub iterations: usize,
}

impl Solution {
    /// Locations visited over all routes, route by route.
    pub fn visited_locations(&self) -> Vec<usize> {
        self.routes.iter().flat_map(|route| route.stops()).collect()
    }

    /// Every vehicle has a depot-bounded route and every non-depot location
    /// is visited exactly once.
    pub fn is_complete(&self, instance: &CpdvrpInstance) -> bool {
        if self.routes.len() != instance.num_vehicles() {
            return false;
        }
        let bounded = self.routes.iter().all(|route| {
            route.nodes.len() >= 2
                && route.nodes.first().is_some_and(|n| n.is_depot())
                && route.nodes.last().is_some_and(|n| n.is_depot())
        });
        if !bounded {
            return false;
        }

        let mut visited = self.visited_locations();
        visited.sort_unstable();
        visited == (1..instance.num_locations()).collect::<Vec<_>>()
    }

    pub fn respects_capacity(&self, instance: &CpdvrpInstance) -> bool {
        self.routes.iter().all(|route| route.respects_capacity(instance))
    }

    pub fn used_vehicles(&self) -> usize {
        self.routes.iter().filter(|route| !route.is_empty()).count()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Objective: {}", self.objective)?;
        writeln!(f, "  Vehicles used: {}/{}", self.used_vehicles(), self.routes.len())?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        for route in &self.routes {
            writeln!(f, "  Vehicle {} (capacity {}): {:?}", route.vehicle, route.capacity, route.stops())?;
        }
        Ok(())
    }
}
