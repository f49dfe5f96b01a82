//! Dimension builders.
//!
//! A [`DimensionSpec`] is a plain description of one cumulative quantity:
//! its transit, the per-vehicle capacities, whether the start cumul is pinned
//! to zero and its global span cost. The solver installs the specs on a
//! [`RoutingModel`] in order.

use std::sync::Arc;

use crate::engine::{EngineFault, RoutingModel, TransitCallback, TransitCallbackIndex, UNREACHABLE};
use crate::instance::CpdvrpInstance;
use crate::transform::TransitGraph;

pub const DELIVERIES: &str = "deliveries";
pub const PICKUPS: &str = "pickups";
pub const DISTANCE: &str = "Distance";

/// Default weight of the longest-route term.
pub const DEFAULT_SPAN_COEFFICIENT: i64 = 1000;

#[derive(Debug)]
pub struct DimensionSpec {
    pub name: String,
    pub transit: TransitCallback,
    pub capacities: Vec<i64>,
    pub fix_start_cumul_to_zero: bool,
    pub span_cost_coefficient: i64,
    /// Also use the transit as the arc cost of every vehicle.
    pub drives_arc_cost: bool,
}

impl DimensionSpec {
    pub fn install(self, model: &mut RoutingModel) -> Result<TransitCallbackIndex, EngineFault> {
        let index = model.register(self.transit);
        if self.drives_arc_cost {
            model.set_arc_cost_evaluator_of_all_vehicles(index)?;
        }
        model.add_dimension_with_vehicle_capacity(
            index,
            self.capacities,
            self.fix_start_cumul_to_zero,
            &self.name,
        )?;
        if self.span_cost_coefficient != 0 {
            model.set_global_span_cost_coefficient(&self.name, self.span_cost_coefficient)?;
        }
        Ok(index)
    }
}

/// Delivery load added when leaving a transformed node.
///
/// Arrival nodes (odd) add nothing; the depot and post-service nodes add the
/// delivery of their location.
#[inline]
pub fn delivery_transit(deliveries: &[i64], from: usize) -> i64 {
    if from % 2 == 1 {
        0
    } else {
        deliveries[(from + 1) / 2]
    }
}

/// Net load change (delivery minus pickup) when leaving a transformed node.
///
/// For even nodes `from / 2` and `(from + 1) / 2` name the same location.
#[inline]
pub fn net_load_transit(deliveries: &[i64], pickups: &[i64], from: usize) -> i64 {
    if from % 2 == 1 {
        0
    } else {
        deliveries[from / 2] - pickups[(from + 1) / 2]
    }
}

/// The `deliveries` and `pickups` (net load) dimensions.
pub fn capacity_dimensions(instance: &CpdvrpInstance) -> Vec<DimensionSpec> {
    let deliveries: Arc<[i64]> = instance.deliveries().into();
    let pickups: Arc<[i64]> = instance.pickups().into();

    let delivery = {
        let deliveries = Arc::clone(&deliveries);
        DimensionSpec {
            name: DELIVERIES.to_string(),
            transit: TransitCallback::Unary(Box::new(move |from| delivery_transit(&deliveries, from))),
            capacities: instance.capacities().to_vec(),
            fix_start_cumul_to_zero: true,
            span_cost_coefficient: 0,
            drives_arc_cost: false,
        }
    };

    let net_load = DimensionSpec {
        name: PICKUPS.to_string(),
        transit: TransitCallback::Unary(Box::new(move |from| net_load_transit(&deliveries, &pickups, from))),
        capacities: instance.capacities().to_vec(),
        fix_start_cumul_to_zero: true,
        span_cost_coefficient: 0,
        drives_arc_cost: false,
    };

    vec![delivery, net_load]
}

/// Travelled distance, also used as the arc cost, with a global span cost.
pub fn distance_dimension(graph: Arc<TransitGraph>, vehicles: usize, span_cost_coefficient: i64) -> DimensionSpec {
    DimensionSpec {
        name: DISTANCE.to_string(),
        transit: TransitCallback::Binary(Box::new(move |from, to| graph.distance(from, to))),
        capacities: vec![UNREACHABLE; vehicles],
        fix_start_cumul_to_zero: true,
        span_cost_coefficient,
        drives_arc_cost: true,
    }
}
