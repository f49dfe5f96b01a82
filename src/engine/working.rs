//! Working solution of the local search engine.
//!
//! Routes are stored as sequences of visit units. Each route carries a cached
//! evaluation (cost, dimension cumuls at both ends, guided-search penalty) so a
//! move only re-evaluates the routes it touches.

use std::collections::{BTreeSet, HashMap};

use super::model::RoutingModel;
use super::units::build_units;
use super::Assignment;

/// GLS penalty counters keyed by `(vehicle, from, to)`.
pub(crate) type Penalties = HashMap<(usize, usize, usize), i64>;

/// Problem data shared by every start of one solve.
pub(crate) struct SearchContext<'a> {
    pub model: &'a RoutingModel,
    pub units: Vec<Vec<usize>>,
    pub unassigned_penalty: i64,
    pub max_segment_length: usize,
}

impl<'a> SearchContext<'a> {
    pub(crate) fn new(model: &'a RoutingModel, max_segment_length: usize) -> Self {
        let units = build_units(model);
        let unassigned_penalty = unassigned_penalty(model);
        SearchContext {
            model,
            units,
            unassigned_penalty,
            max_segment_length: max_segment_length.max(1),
        }
    }

    /// Full node sequence of a route, depot to depot.
    pub(crate) fn route_nodes(&self, units: &[usize]) -> Vec<usize> {
        let depot = self.model.depot();
        let mut nodes = Vec::with_capacity(units.len() * 2 + 2);
        nodes.push(depot);
        for &unit in units {
            nodes.extend_from_slice(&self.units[unit]);
        }
        nodes.push(depot);
        nodes
    }

    #[inline]
    pub(crate) fn first_node(&self, unit: usize) -> usize {
        self.units[unit][0]
    }

    #[inline]
    pub(crate) fn last_node(&self, unit: usize) -> usize {
        self.units[unit][self.units[unit].len() - 1]
    }

    /// Evaluate one vehicle's route.
    pub(crate) fn evaluate(&self, vehicle: usize, units: &[usize], penalties: &Penalties) -> RouteState {
        let dimensions = self.model.dimensions();
        if units.is_empty() {
            return RouteState::empty(dimensions.len());
        }

        let nodes = self.route_nodes(units);
        let mut cost = 0i64;
        let mut penalty = 0i64;
        let mut cumuls = vec![0i64; dimensions.len()];
        let mut lowest = vec![0i64; dimensions.len()];
        let mut highest = vec![0i64; dimensions.len()];

        for arc in nodes.windows(2) {
            let (from, to) = (arc[0], arc[1]);
            if !self.model.is_arc_allowed(from, to) {
                return RouteState::infeasible(dimensions.len());
            }
            cost += self.model.arc_cost(from, to);
            if !penalties.is_empty() {
                penalty += penalties.get(&(vehicle, from, to)).copied().unwrap_or(0);
            }
            for (d, dimension) in dimensions.iter().enumerate() {
                cumuls[d] += self.model.transit(dimension.transit(), from, to);
                lowest[d] = lowest[d].min(cumuls[d]);
                highest[d] = highest[d].max(cumuls[d]);
                if dimension.fix_start_cumul_to_zero()
                    && (cumuls[d] < 0 || cumuls[d] > dimension.capacity(vehicle))
                {
                    return RouteState::infeasible(dimensions.len());
                }
            }
        }

        let mut starts = vec![0i64; dimensions.len()];
        let mut ends = vec![0i64; dimensions.len()];
        for (d, dimension) in dimensions.iter().enumerate() {
            let start = if dimension.fix_start_cumul_to_zero() { 0 } else { -lowest[d] };
            if start + highest[d] > dimension.capacity(vehicle) {
                return RouteState::infeasible(dimensions.len());
            }
            starts[d] = start;
            ends[d] = start + cumuls[d];
        }

        RouteState {
            feasible: true,
            cost,
            penalty,
            arcs: nodes.len() - 1,
            starts,
            ends,
        }
    }
}

/// Upper bound on the objective of any assignment, plus one.
///
/// Leaving a unit unassigned always costs more than any way of routing it.
fn unassigned_penalty(model: &RoutingModel) -> i64 {
    let n = model.node_count();
    let max_out = |u: usize| {
        (0..n)
            .filter(|&v| model.is_arc_allowed(u, v))
            .map(|v| model.arc_cost(u, v).max(0))
            .max()
            .unwrap_or(0)
    };
    let mut bound: i64 = (0..n).map(max_out).fold(0i64, |acc, c| acc.saturating_add(c));
    bound = bound.saturating_add(max_out(model.depot()).saturating_mul(model.vehicle_count() as i64));
    // Cumuls never leave [0, capacity], so neither does a span.
    for dimension in model.dimensions() {
        let capacity = dimension.capacities().iter().copied().max().unwrap_or(0);
        let span = dimension.global_span_cost_coefficient().max(0).saturating_mul(capacity);
        bound = bound.saturating_add(span);
    }
    bound.saturating_add(1)
}

/// Cached evaluation of a single route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RouteState {
    pub feasible: bool,
    pub cost: i64,
    pub penalty: i64,
    pub arcs: usize,
    pub starts: Vec<i64>,
    pub ends: Vec<i64>,
}

impl RouteState {
    fn empty(dimensions: usize) -> Self {
        RouteState {
            feasible: true,
            cost: 0,
            penalty: 0,
            arcs: 0,
            starts: vec![0; dimensions],
            ends: vec![0; dimensions],
        }
    }

    fn infeasible(dimensions: usize) -> Self {
        RouteState {
            feasible: false,
            ..RouteState::empty(dimensions)
        }
    }
}

/// A proposed change: replacement routes plus unit moves in and out of the
/// unassigned pool.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub routes: Vec<(usize, Vec<usize>)>,
    pub assigned: Option<usize>,
    pub released: Option<usize>,
}

impl Candidate {
    pub(crate) fn routes(routes: Vec<(usize, Vec<usize>)>) -> Self {
        Candidate { routes, assigned: None, released: None }
    }
}

/// A candidate whose routes are all feasible, with its augmented objective.
pub(crate) struct Evaluated {
    pub candidate: Candidate,
    pub states: Vec<RouteState>,
    pub augmented: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct WorkingSolution {
    pub routes: Vec<Vec<usize>>,
    pub states: Vec<RouteState>,
    pub unassigned: BTreeSet<usize>,
}

impl WorkingSolution {
    pub(crate) fn new(
        ctx: &SearchContext,
        routes: Vec<Vec<usize>>,
        unassigned: BTreeSet<usize>,
        penalties: &Penalties,
    ) -> Self {
        let states = routes
            .iter()
            .enumerate()
            .map(|(vehicle, units)| ctx.evaluate(vehicle, units, penalties))
            .collect();
        WorkingSolution { routes, states, unassigned }
    }

    /// Re-evaluate every route, e.g. after the penalties changed.
    pub(crate) fn refresh(&mut self, ctx: &SearchContext, penalties: &Penalties) {
        for (vehicle, units) in self.routes.iter().enumerate() {
            self.states[vehicle] = ctx.evaluate(vehicle, units, penalties);
        }
    }

    /// Objective (and augmented objective) with some routes replaced.
    fn objectives_with(
        &self,
        ctx: &SearchContext,
        replaced: &[(usize, &RouteState)],
        unassigned: usize,
        lambda: i64,
    ) -> (i64, i64) {
        let state = |vehicle: usize| {
            replaced
                .iter()
                .find(|(v, _)| *v == vehicle)
                .map(|(_, s)| *s)
                .unwrap_or(&self.states[vehicle])
        };

        let vehicles = self.states.len();
        let mut cost = 0i64;
        let mut penalty = 0i64;
        for vehicle in 0..vehicles {
            let s = state(vehicle);
            cost += s.cost;
            penalty += s.penalty;
        }

        for (d, dimension) in ctx.model.dimensions().iter().enumerate() {
            let coefficient = dimension.global_span_cost_coefficient();
            if coefficient == 0 {
                continue;
            }
            let max_end = (0..vehicles).map(|v| state(v).ends[d]).max().unwrap_or(0);
            let min_start = (0..vehicles).map(|v| state(v).starts[d]).min().unwrap_or(0);
            cost = cost.saturating_add(coefficient.saturating_mul(max_end - min_start));
        }

        let objective = cost.saturating_add(ctx.unassigned_penalty.saturating_mul(unassigned as i64));
        let augmented = objective.saturating_add(lambda.saturating_mul(penalty));
        (objective, augmented)
    }

    pub(crate) fn objective(&self, ctx: &SearchContext) -> i64 {
        self.objectives_with(ctx, &[], self.unassigned.len(), 0).0
    }

    pub(crate) fn augmented(&self, ctx: &SearchContext, lambda: i64) -> i64 {
        self.objectives_with(ctx, &[], self.unassigned.len(), lambda).1
    }

    /// Sum of arc costs, without span or unassigned terms.
    pub(crate) fn arc_cost(&self) -> i64 {
        self.states.iter().map(|s| s.cost).sum()
    }

    pub(crate) fn arc_count(&self) -> usize {
        self.states.iter().map(|s| s.arcs).sum()
    }

    /// Evaluate a candidate; `None` if any of its routes is infeasible.
    pub(crate) fn evaluate(
        &self,
        ctx: &SearchContext,
        candidate: Candidate,
        penalties: &Penalties,
        lambda: i64,
    ) -> Option<Evaluated> {
        let mut states = Vec::with_capacity(candidate.routes.len());
        for (vehicle, units) in &candidate.routes {
            let state = ctx.evaluate(*vehicle, units, penalties);
            if !state.feasible {
                return None;
            }
            states.push(state);
        }

        let mut unassigned = self.unassigned.len();
        if candidate.assigned.is_some() {
            unassigned -= 1;
        }
        if candidate.released.is_some() {
            unassigned += 1;
        }

        let replaced: Vec<(usize, &RouteState)> = candidate
            .routes
            .iter()
            .map(|(vehicle, _)| *vehicle)
            .zip(states.iter())
            .collect();
        let (_, augmented) = self.objectives_with(ctx, &replaced, unassigned, lambda);

        Some(Evaluated { candidate, states, augmented })
    }

    pub(crate) fn apply(&mut self, evaluated: Evaluated) {
        let Evaluated { candidate, states, .. } = evaluated;
        for ((vehicle, units), state) in candidate.routes.into_iter().zip(states) {
            self.routes[vehicle] = units;
            self.states[vehicle] = state;
        }
        if let Some(unit) = candidate.assigned {
            self.unassigned.remove(&unit);
        }
        if let Some(unit) = candidate.released {
            self.unassigned.insert(unit);
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }

    pub(crate) fn to_assignment(&self, ctx: &SearchContext, iterations: usize) -> Assignment {
        Assignment {
            routes: self.routes.iter().map(|units| ctx.route_nodes(units)).collect(),
            objective: self.objective(ctx),
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four free nodes on a line, unit demand, two vehicles of capacity 2.
    fn model() -> RoutingModel {
        let mut model = RoutingModel::new(5, 2, 0).unwrap();
        let distance = model.register_transit_callback(|from, to| (from as i64 - to as i64).abs());
        model.set_arc_cost_evaluator_of_all_vehicles(distance).unwrap();
        let demand = model.register_unary_transit_callback(|from| if from == 0 { 0 } else { 1 });
        model.add_dimension(demand, 2, true, "load").unwrap();
        model.add_dimension(distance, 1000, true, "distance").unwrap();
        model.set_global_span_cost_coefficient("distance", 10).unwrap();
        model
    }

    #[test]
    fn test_route_evaluation() {
        let model = model();
        let ctx = SearchContext::new(&model, 3);
        let penalties = Penalties::new();

        let state = ctx.evaluate(0, &[0, 1], &penalties);
        assert!(state.feasible);
        assert_eq!(state.cost, 1 + 1 + 2);
        assert_eq!(state.ends, vec![2, 4]);

        // three stops exceed the load capacity
        assert!(!ctx.evaluate(0, &[0, 1, 2], &penalties).feasible);
    }

    #[test]
    fn test_objective_includes_span_and_unassigned() {
        let model = model();
        let ctx = SearchContext::new(&model, 3);
        let penalties = Penalties::new();

        let solution = WorkingSolution::new(&ctx, vec![vec![0, 1], vec![2]], BTreeSet::from([3]), &penalties);
        // arcs: 4 + 6, span: 10 * max(4, 6)
        assert_eq!(solution.arc_cost(), 10);
        assert_eq!(solution.objective(&ctx), 10 + 60 + ctx.unassigned_penalty);
        assert!(ctx.unassigned_penalty > 10 + 60);
    }

    #[test]
    fn test_apply_insertion() {
        let model = model();
        let ctx = SearchContext::new(&model, 3);
        let penalties = Penalties::new();
        let mut solution = WorkingSolution::new(&ctx, vec![vec![0, 1], vec![2]], BTreeSet::from([3]), &penalties);

        let candidate = Candidate { routes: vec![(1, vec![2, 3])], assigned: Some(3), released: None };
        let before = solution.objective(&ctx);
        let evaluated = solution.evaluate(&ctx, candidate, &penalties, 0).unwrap();
        solution.apply(evaluated);
        assert!(solution.objective(&ctx) < before);

        assert!(solution.is_complete());
        let assignment = solution.to_assignment(&ctx, 0);
        assert_eq!(assignment.routes, vec![vec![0, 1, 2, 0], vec![0, 3, 4, 0]]);
    }
}
