//! Local search neighborhoods over visit units.
//!
//! Each neighborhood enumerates candidate changes and hands them to a visitor
//! that evaluates them; exploration stops as soon as the visitor accepts one.
//! The descent applies the first improving candidate and restarts from the
//! first neighborhood, in the manner of a variable neighborhood descent.

use log::trace;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::params::Termination;
use super::working::{Candidate, Penalties, SearchContext, WorkingSolution};

/// Randomized scan order for one pass over a neighborhood.
pub(crate) struct ScanOrder {
    pub vehicles: Vec<usize>,
    pub unassigned: Vec<usize>,
}

impl ScanOrder {
    pub(crate) fn shuffled(solution: &WorkingSolution, rng: &mut ChaCha8Rng) -> Self {
        let mut vehicles: Vec<usize> = (0..solution.routes.len()).collect();
        vehicles.shuffle(rng);
        let mut unassigned: Vec<usize> = solution.unassigned.iter().copied().collect();
        unassigned.shuffle(rng);
        ScanOrder { vehicles, unassigned }
    }
}

pub(crate) trait Neighborhood: Send + Sync {
    /// Feed candidates to `visit` until it returns `true`. Returns whether it did.
    fn explore(
        &self,
        ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool;

    fn name(&self) -> &str;
}

/// Insert an unassigned unit anywhere.
pub(crate) struct InsertUnassigned;

impl Neighborhood for InsertUnassigned {
    fn explore(
        &self,
        _ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool {
        for &unit in &order.unassigned {
            for &vehicle in &order.vehicles {
                let route = &solution.routes[vehicle];
                for position in 0..=route.len() {
                    let mut new_route = route.clone();
                    new_route.insert(position, unit);
                    let candidate = Candidate {
                        routes: vec![(vehicle, new_route)],
                        assigned: Some(unit),
                        released: None,
                    };
                    if visit(candidate) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &str {
        "InsertUnassigned"
    }
}

/// Replace a routed unit by an unassigned one.
pub(crate) struct SwapUnassigned;

impl Neighborhood for SwapUnassigned {
    fn explore(
        &self,
        _ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool {
        for &unit in &order.unassigned {
            for &vehicle in &order.vehicles {
                let route = &solution.routes[vehicle];
                for position in 0..route.len() {
                    let mut new_route = route.clone();
                    let released = std::mem::replace(&mut new_route[position], unit);
                    let candidate = Candidate {
                        routes: vec![(vehicle, new_route)],
                        assigned: Some(unit),
                        released: Some(released),
                    };
                    if visit(candidate) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &str {
        "SwapUnassigned"
    }
}

/// Or-opt: move a run of consecutive units to another position, in the same
/// route or in another one.
pub(crate) struct Relocate;

impl Neighborhood for Relocate {
    fn explore(
        &self,
        ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool {
        for &from_vehicle in &order.vehicles {
            let route = &solution.routes[from_vehicle];
            for start in 0..route.len() {
                for len in 1..=ctx.max_segment_length {
                    if start + len > route.len() {
                        break;
                    }
                    let segment = &route[start..start + len];
                    let mut rest = route.clone();
                    rest.drain(start..start + len);

                    for &to_vehicle in &order.vehicles {
                        if to_vehicle == from_vehicle {
                            for position in (0..=rest.len()).filter(|&p| p != start) {
                                let mut new_route = rest.clone();
                                new_route.splice(position..position, segment.iter().copied());
                                if visit(Candidate::routes(vec![(from_vehicle, new_route)])) {
                                    return true;
                                }
                            }
                        } else {
                            let target = &solution.routes[to_vehicle];
                            for position in 0..=target.len() {
                                let mut new_target = target.clone();
                                new_target.splice(position..position, segment.iter().copied());
                                let routes = vec![(from_vehicle, rest.clone()), (to_vehicle, new_target)];
                                if visit(Candidate::routes(routes)) {
                                    return true;
                                }
                            }
                        }
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &str {
        "Relocate"
    }
}

/// Swap two units, within a route or across routes.
pub(crate) struct Exchange;

impl Neighborhood for Exchange {
    fn explore(
        &self,
        _ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool {
        for (k, &first) in order.vehicles.iter().enumerate() {
            let first_route = &solution.routes[first];
            for i in 0..first_route.len() {
                for &second in &order.vehicles[k..] {
                    let second_route = &solution.routes[second];
                    if second == first {
                        for j in i + 1..first_route.len() {
                            let mut new_route = first_route.clone();
                            new_route.swap(i, j);
                            if visit(Candidate::routes(vec![(first, new_route)])) {
                                return true;
                            }
                        }
                    } else {
                        for j in 0..second_route.len() {
                            let mut new_first = first_route.clone();
                            let mut new_second = second_route.clone();
                            new_first[i] = second_route[j];
                            new_second[j] = first_route[i];
                            if visit(Candidate::routes(vec![(first, new_first), (second, new_second)])) {
                                return true;
                            }
                        }
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &str {
        "Exchange"
    }
}

/// 2-opt: reverse the order of a run of units inside one route.
pub(crate) struct TwoOpt;

impl Neighborhood for TwoOpt {
    fn explore(
        &self,
        _ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool {
        for &vehicle in &order.vehicles {
            let route = &solution.routes[vehicle];
            for i in 0..route.len() {
                for j in i + 1..route.len() {
                    let mut new_route = route.clone();
                    new_route[i..=j].reverse();
                    if visit(Candidate::routes(vec![(vehicle, new_route)])) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &str {
        "TwoOpt"
    }
}

/// 2-opt*: exchange the tails of two routes.
///
/// Cutting both routes at their start swaps the routes between the two
/// vehicles, which matters when capacities differ.
pub(crate) struct TwoOptStar;

impl Neighborhood for TwoOptStar {
    fn explore(
        &self,
        _ctx: &SearchContext,
        solution: &WorkingSolution,
        order: &ScanOrder,
        visit: &mut dyn FnMut(Candidate) -> bool,
    ) -> bool {
        for (k, &first) in order.vehicles.iter().enumerate() {
            for &second in &order.vehicles[k + 1..] {
                let first_route = &solution.routes[first];
                let second_route = &solution.routes[second];
                if first_route.is_empty() && second_route.is_empty() {
                    continue;
                }
                for cut_first in 0..=first_route.len() {
                    for cut_second in 0..=second_route.len() {
                        if cut_first == first_route.len() && cut_second == second_route.len() {
                            continue;
                        }
                        let new_first: Vec<usize> = first_route[..cut_first]
                            .iter()
                            .chain(&second_route[cut_second..])
                            .copied()
                            .collect();
                        let new_second: Vec<usize> = second_route[..cut_second]
                            .iter()
                            .chain(&first_route[cut_first..])
                            .copied()
                            .collect();
                        if visit(Candidate::routes(vec![(first, new_first), (second, new_second)])) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    fn name(&self) -> &str {
        "TwoOptStar"
    }
}

/// First-improvement descent over a list of neighborhoods.
pub(crate) struct Descent {
    neighborhoods: Vec<Box<dyn Neighborhood>>,
}

impl Descent {
    pub(crate) fn with_standard_neighborhoods() -> Self {
        let neighborhoods: Vec<Box<dyn Neighborhood>> = vec![
            Box::new(InsertUnassigned),
            Box::new(Relocate),
            Box::new(Exchange),
            Box::new(TwoOpt),
            Box::new(TwoOptStar),
            Box::new(SwapUnassigned),
        ];
        Descent { neighborhoods }
    }

    /// Descend to a local optimum of the augmented objective.
    ///
    /// `on_move` is called after each applied move. Returns the number of moves.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn run(
        &self,
        ctx: &SearchContext,
        solution: &mut WorkingSolution,
        penalties: &Penalties,
        lambda: i64,
        rng: &mut ChaCha8Rng,
        termination: &Termination,
        on_move: &mut dyn FnMut(&WorkingSolution),
    ) -> usize {
        let mut moves = 0;
        let mut k = 0;

        while k < self.neighborhoods.len() {
            if termination.out_of_time() {
                break;
            }
            let current = solution.augmented(ctx, lambda);
            let order = ScanOrder::shuffled(solution, rng);
            let mut found = None;

            self.neighborhoods[k].explore(ctx, solution, &order, &mut |candidate| {
                if termination.out_of_time() {
                    return true;
                }
                match solution.evaluate(ctx, candidate, penalties, lambda) {
                    Some(evaluated) if evaluated.augmented < current => {
                        found = Some(evaluated);
                        true
                    }
                    _ => false,
                }
            });

            match found {
                Some(evaluated) => {
                    trace!(
                        "{}: augmented objective {} -> {}",
                        self.neighborhoods[k].name(),
                        current,
                        evaluated.augmented
                    );
                    solution.apply(evaluated);
                    moves += 1;
                    on_move(solution);
                    k = 0;
                }
                None => k += 1,
            }
        }

        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::RoutingModel;
    use crate::engine::params::SearchParameters;
    use std::collections::BTreeSet;

    /// Free nodes 1..=4 on a line, unit demand.
    fn model(capacities: Vec<i64>) -> RoutingModel {
        let mut model = RoutingModel::new(5, capacities.len(), 0).unwrap();
        let distance = model.register_transit_callback(|from, to| (from as i64 - to as i64).abs());
        model.set_arc_cost_evaluator_of_all_vehicles(distance).unwrap();
        let demand = model.register_unary_transit_callback(|from| if from == 0 { 0 } else { 1 });
        model.add_dimension_with_vehicle_capacity(demand, capacities, true, "load").unwrap();
        model
    }

    fn count(neighborhood: &dyn Neighborhood, ctx: &SearchContext, solution: &WorkingSolution) -> usize {
        let order = ScanOrder {
            vehicles: (0..solution.routes.len()).collect(),
            unassigned: solution.unassigned.iter().copied().collect(),
        };
        let mut n = 0;
        neighborhood.explore(ctx, solution, &order, &mut |_| {
            n += 1;
            false
        });
        n
    }

    #[test]
    fn test_neighborhood_sizes() {
        let model = model(vec![4, 4]);
        let ctx = SearchContext::new(&model, 1);
        let penalties = Penalties::new();
        let solution = WorkingSolution::new(&ctx, vec![vec![0, 1], vec![2]], BTreeSet::from([3]), &penalties);

        // 3 + 2 positions
        assert_eq!(count(&InsertUnassigned, &ctx, &solution), 5);
        // one per routed unit
        assert_eq!(count(&SwapUnassigned, &ctx, &solution), 3);
        // intra: 2 units x 1 position, plus 1 unit x 0 positions; inter: 2 x 2 + 1 x 3
        assert_eq!(count(&Relocate, &ctx, &solution), 2 + 4 + 3);
        // one intra pair, two inter pairs
        assert_eq!(count(&Exchange, &ctx, &solution), 3);
        assert_eq!(count(&TwoOpt, &ctx, &solution), 1);
        // 3 x 2 cuts minus the identity
        assert_eq!(count(&TwoOptStar, &ctx, &solution), 5);
    }

    #[test]
    fn test_descent_reaches_complete_local_optimum() {
        let model = model(vec![2, 2]);
        let ctx = SearchContext::new(&model, 3);
        let penalties = Penalties::new();
        // badly ordered start with one unit left out
        let mut solution = WorkingSolution::new(&ctx, vec![vec![2, 0], vec![1]], BTreeSet::from([3]), &penalties);
        let before = solution.objective(&ctx);

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let termination = Termination::new(&SearchParameters::default());
        let mut seen = 0;
        let moves = Descent::with_standard_neighborhoods().run(
            &ctx,
            &mut solution,
            &penalties,
            0,
            &mut rng,
            &termination,
            &mut |_| seen += 1,
        );

        assert!(moves > 0);
        assert_eq!(moves, seen);
        assert!(solution.is_complete());
        assert!(solution.objective(&ctx) < before);
        assert!(solution.states.iter().all(|s| s.feasible));
    }
}
