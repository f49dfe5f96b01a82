//! Routing model: nodes, vehicles, transit callbacks and cumulative dimensions.

use std::fmt;

use super::{EngineFault, UNREACHABLE};

/// A transit cost evaluated on an arc `from -> to`.
///
/// Unary callbacks only look at the origin node.
pub enum TransitCallback {
    Unary(Box<dyn Fn(usize) -> i64 + Send + Sync>),
    Binary(Box<dyn Fn(usize, usize) -> i64 + Send + Sync>),
}

impl TransitCallback {
    #[inline]
    pub fn transit(&self, from: usize, to: usize) -> i64 {
        match self {
            TransitCallback::Unary(f) => f(from),
            TransitCallback::Binary(f) => f(from, to),
        }
    }
}

impl fmt::Debug for TransitCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitCallback::Unary(_) => write!(f, "TransitCallback::Unary"),
            TransitCallback::Binary(_) => write!(f, "TransitCallback::Binary"),
        }
    }
}

/// Handle returned when a callback is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitCallbackIndex(usize);

impl TransitCallbackIndex {
    pub fn get(&self) -> usize {
        self.0
    }
}

/// A cumulative quantity tracked along every route.
///
/// The cumul grows by the transit of each traversed arc and must stay within
/// `[0, capacity]` of the vehicle at every node.
#[derive(Debug, Clone)]
pub struct Dimension {
    name: String,
    transit: TransitCallbackIndex,
    capacities: Vec<i64>,
    fix_start_cumul_to_zero: bool,
    global_span_cost_coefficient: i64,
}

impl Dimension {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transit(&self) -> TransitCallbackIndex {
        self.transit
    }

    pub fn capacity(&self, vehicle: usize) -> i64 {
        self.capacities[vehicle]
    }

    pub fn capacities(&self) -> &[i64] {
        &self.capacities
    }

    pub fn fix_start_cumul_to_zero(&self) -> bool {
        self.fix_start_cumul_to_zero
    }

    pub fn global_span_cost_coefficient(&self) -> i64 {
        self.global_span_cost_coefficient
    }
}

#[derive(Debug)]
pub struct RoutingModel {
    node_count: usize,
    vehicle_count: usize,
    depot: usize,
    callbacks: Vec<TransitCallback>,
    arc_cost_evaluator: Option<TransitCallbackIndex>,
    dimensions: Vec<Dimension>,
}

impl RoutingModel {
    pub fn new(node_count: usize, vehicle_count: usize, depot: usize) -> Result<Self, EngineFault> {
        if vehicle_count == 0 {
            return Err(EngineFault::NoVehicles);
        }
        if depot >= node_count {
            return Err(EngineFault::DepotOutOfRange { depot, node_count });
        }
        Ok(RoutingModel {
            node_count,
            vehicle_count,
            depot,
            callbacks: Vec::new(),
            arc_cost_evaluator: None,
            dimensions: Vec::new(),
        })
    }

    pub fn register_unary_transit_callback<F>(&mut self, callback: F) -> TransitCallbackIndex
    where
        F: Fn(usize) -> i64 + Send + Sync + 'static,
    {
        self.register(TransitCallback::Unary(Box::new(callback)))
    }

    pub fn register_transit_callback<F>(&mut self, callback: F) -> TransitCallbackIndex
    where
        F: Fn(usize, usize) -> i64 + Send + Sync + 'static,
    {
        self.register(TransitCallback::Binary(Box::new(callback)))
    }

    pub fn register(&mut self, callback: TransitCallback) -> TransitCallbackIndex {
        self.callbacks.push(callback);
        TransitCallbackIndex(self.callbacks.len() - 1)
    }

    fn check_callback(&self, index: TransitCallbackIndex) -> Result<(), EngineFault> {
        if index.0 >= self.callbacks.len() {
            return Err(EngineFault::UnknownCallback(index.0));
        }
        Ok(())
    }

    /// Use a registered callback as the arc cost of every vehicle.
    pub fn set_arc_cost_evaluator_of_all_vehicles(
        &mut self,
        index: TransitCallbackIndex,
    ) -> Result<(), EngineFault> {
        self.check_callback(index)?;
        self.arc_cost_evaluator = Some(index);
        Ok(())
    }

    /// Add a dimension with one capacity per vehicle.
    pub fn add_dimension_with_vehicle_capacity(
        &mut self,
        transit: TransitCallbackIndex,
        capacities: Vec<i64>,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> Result<(), EngineFault> {
        self.check_callback(transit)?;
        if self.dimensions.iter().any(|d| d.name == name) {
            return Err(EngineFault::DuplicateDimension(name.to_string()));
        }
        if capacities.len() != self.vehicle_count {
            return Err(EngineFault::CapacityCountMismatch {
                dimension: name.to_string(),
                expected: self.vehicle_count,
                actual: capacities.len(),
            });
        }
        if let Some((vehicle, &capacity)) = capacities.iter().enumerate().find(|(_, c)| **c < 0) {
            return Err(EngineFault::NegativeCapacity {
                dimension: name.to_string(),
                vehicle,
                capacity,
            });
        }

        self.dimensions.push(Dimension {
            name: name.to_string(),
            transit,
            capacities,
            fix_start_cumul_to_zero,
            global_span_cost_coefficient: 0,
        });
        Ok(())
    }

    /// Add a dimension sharing one capacity across all vehicles.
    pub fn add_dimension(
        &mut self,
        transit: TransitCallbackIndex,
        capacity: i64,
        fix_start_cumul_to_zero: bool,
        name: &str,
    ) -> Result<(), EngineFault> {
        let capacities = vec![capacity; self.vehicle_count];
        self.add_dimension_with_vehicle_capacity(transit, capacities, fix_start_cumul_to_zero, name)
    }

    /// Charge `coefficient * (max end cumul - min start cumul)` over all vehicles.
    pub fn set_global_span_cost_coefficient(
        &mut self,
        name: &str,
        coefficient: i64,
    ) -> Result<(), EngineFault> {
        let dimension = self
            .dimensions
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| EngineFault::UnknownDimension(name.to_string()))?;
        dimension.global_span_cost_coefficient = coefficient;
        Ok(())
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn vehicle_count(&self) -> usize {
        self.vehicle_count
    }

    #[inline]
    pub fn depot(&self) -> usize {
        self.depot
    }

    #[inline]
    pub fn transit(&self, index: TransitCallbackIndex, from: usize, to: usize) -> i64 {
        self.callbacks[index.0].transit(from, to)
    }

    /// Cost of an arc; 0 when no evaluator has been set.
    #[inline]
    pub fn arc_cost(&self, from: usize, to: usize) -> i64 {
        match self.arc_cost_evaluator {
            Some(index) => self.transit(index, from, to),
            None => 0,
        }
    }

    #[inline]
    pub fn is_arc_allowed(&self, from: usize, to: usize) -> bool {
        self.arc_cost(from, to) < UNREACHABLE
    }

    /// Cumul values of a dimension along a full route (depot to depot).
    ///
    /// With a free start, the route starts at the smallest cumul that keeps
    /// every value non-negative.
    pub fn cumuls(&self, name: &str, route: &[usize]) -> Result<Vec<i64>, EngineFault> {
        let dimension = self
            .dimension(name)
            .ok_or_else(|| EngineFault::UnknownDimension(name.to_string()))?;

        let mut cumuls = Vec::with_capacity(route.len());
        let mut cumul = 0;
        let mut lowest = 0;
        cumuls.push(cumul);
        for arc in route.windows(2) {
            cumul += self.transit(dimension.transit, arc[0], arc[1]);
            lowest = lowest.min(cumul);
            cumuls.push(cumul);
        }
        if !dimension.fix_start_cumul_to_zero && lowest < 0 {
            for value in cumuls.iter_mut() {
                *value -= lowest;
            }
        }
        Ok(cumuls)
    }

    /// Sum of arc costs along a full route.
    pub fn route_cost(&self, route: &[usize]) -> i64 {
        route.windows(2).map(|arc| self.arc_cost(arc[0], arc[1])).sum()
    }

    /// Hand the model to the bundled local search engine.
    pub fn solve_with_parameters(
        &self,
        params: &super::SearchParameters,
    ) -> Result<Option<super::Assignment>, EngineFault> {
        use super::RoutingEngine;
        super::LocalSearchEngine::new().solve(self, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_model() -> RoutingModel {
        let mut model = RoutingModel::new(4, 2, 0).unwrap();
        let distance = model.register_transit_callback(|from, to| (from as i64 - to as i64).abs());
        model.set_arc_cost_evaluator_of_all_vehicles(distance).unwrap();
        let demand = model.register_unary_transit_callback(|from| if from == 0 { 0 } else { 1 });
        model
            .add_dimension_with_vehicle_capacity(demand, vec![2, 3], true, "load")
            .unwrap();
        model
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert_eq!(RoutingModel::new(3, 0, 0).unwrap_err(), EngineFault::NoVehicles);
        assert!(matches!(
            RoutingModel::new(3, 1, 3),
            Err(EngineFault::DepotOutOfRange { depot: 3, node_count: 3 })
        ));

        let mut model = line_model();
        let demand = model.dimension("load").unwrap().transit();
        assert!(matches!(
            model.add_dimension_with_vehicle_capacity(demand, vec![1], true, "other"),
            Err(EngineFault::CapacityCountMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            model.add_dimension(demand, 5, true, "load"),
            Err(EngineFault::DuplicateDimension(_))
        ));
        assert!(matches!(
            model.set_global_span_cost_coefficient("missing", 1),
            Err(EngineFault::UnknownDimension(_))
        ));

        let mut other = RoutingModel::new(3, 1, 0).unwrap();
        assert!(matches!(
            other.add_dimension(TransitCallbackIndex(7), 1, true, "x"),
            Err(EngineFault::UnknownCallback(7))
        ));
    }

    #[test]
    fn test_cumuls_and_cost() {
        let model = line_model();
        let route = [0, 2, 3, 0];
        assert_eq!(model.route_cost(&route), 2 + 1 + 3);
        assert_eq!(model.cumuls("load", &route).unwrap(), vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_free_start_cumuls_shift_up() {
        let mut model = RoutingModel::new(3, 1, 0).unwrap();
        let transit = model.register_unary_transit_callback(|from| if from == 1 { -2 } else { 1 });
        model.add_dimension(transit, 10, false, "net").unwrap();
        assert_eq!(model.cumuls("net", &[0, 1, 2, 0]).unwrap(), vec![1, 2, 0, 1]);
    }
}
