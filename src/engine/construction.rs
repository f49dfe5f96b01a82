//! First-solution construction.
//!
//! Both strategies only ever build feasible routes. Units that cannot be
//! placed anywhere stay unassigned; the local search keeps trying to insert
//! them.

use std::collections::BTreeSet;

use log::debug;

use super::params::FirstSolutionStrategy;
use super::working::{Penalties, SearchContext, WorkingSolution};

pub(crate) trait ConstructionHeuristic {
    fn construct(&self, ctx: &SearchContext) -> WorkingSolution;
    fn name(&self) -> &str;
}

pub(crate) fn heuristic_for(strategy: FirstSolutionStrategy) -> Box<dyn ConstructionHeuristic + Send + Sync> {
    match strategy {
        FirstSolutionStrategy::PathCheapestArc => Box::new(PathCheapestArc),
        FirstSolutionStrategy::ParallelCheapestInsertion => Box::new(ParallelCheapestInsertion),
    }
}

/// Path Cheapest Arc
///
/// Fills vehicles one after another. Starting at the depot, the path is
/// extended with the unit reached by the cheapest arc from the path's last
/// node, as long as the route closed back to the depot stays feasible.
/// Units left over are then placed by cheapest insertion.
pub(crate) struct PathCheapestArc;

impl ConstructionHeuristic for PathCheapestArc {
    fn construct(&self, ctx: &SearchContext) -> WorkingSolution {
        let model = ctx.model;
        let penalties = Penalties::new();
        let mut routed = vec![false; ctx.units.len()];
        let mut routes = vec![Vec::new(); model.vehicle_count()];

        for (vehicle, route) in routes.iter_mut().enumerate() {
            let mut last = model.depot();
            loop {
                let mut candidates: Vec<(i64, usize)> = (0..ctx.units.len())
                    .filter(|&unit| !routed[unit])
                    .filter(|&unit| model.is_arc_allowed(last, ctx.first_node(unit)))
                    .map(|unit| (model.arc_cost(last, ctx.first_node(unit)), unit))
                    .collect();
                candidates.sort();

                let next = candidates.into_iter().map(|(_, unit)| unit).find(|&unit| {
                    route.push(unit);
                    let feasible = ctx.evaluate(vehicle, route, &penalties).feasible;
                    route.pop();
                    feasible
                });

                match next {
                    Some(unit) => {
                        route.push(unit);
                        routed[unit] = true;
                        last = ctx.last_node(unit);
                    }
                    None => break,
                }
            }
        }

        let leftovers: BTreeSet<usize> = (0..ctx.units.len()).filter(|&u| !routed[u]).collect();
        if !leftovers.is_empty() {
            debug!("{}: {} units left after path extension", self.name(), leftovers.len());
        }
        let mut solution = WorkingSolution::new(ctx, routes, leftovers, &penalties);
        insert_cheapest(ctx, &mut solution);
        solution
    }

    fn name(&self) -> &str {
        "PathCheapestArc"
    }
}

/// Parallel Cheapest Insertion
///
/// Starts with empty routes and repeatedly performs the feasible insertion
/// with the smallest arc cost increase over all vehicles.
pub(crate) struct ParallelCheapestInsertion;

impl ConstructionHeuristic for ParallelCheapestInsertion {
    fn construct(&self, ctx: &SearchContext) -> WorkingSolution {
        let penalties = Penalties::new();
        let routes = vec![Vec::new(); ctx.model.vehicle_count()];
        let unassigned = (0..ctx.units.len()).collect();
        let mut solution = WorkingSolution::new(ctx, routes, unassigned, &penalties);
        insert_cheapest(ctx, &mut solution);
        solution
    }

    fn name(&self) -> &str {
        "ParallelCheapestInsertion"
    }
}

/// Insert unassigned units one at a time at their cheapest feasible position
/// until no unit fits anywhere.
pub(crate) fn insert_cheapest(ctx: &SearchContext, solution: &mut WorkingSolution) {
    let penalties = Penalties::new();

    loop {
        let mut best: Option<(i64, usize, usize, Vec<usize>)> = None;

        for &unit in &solution.unassigned {
            for (vehicle, route) in solution.routes.iter().enumerate() {
                let current = solution.states[vehicle].cost;
                for position in 0..=route.len() {
                    let mut candidate = route.clone();
                    candidate.insert(position, unit);
                    let state = ctx.evaluate(vehicle, &candidate, &penalties);
                    if !state.feasible {
                        continue;
                    }
                    let delta = state.cost - current;
                    if best.as_ref().map_or(true, |(d, ..)| delta < *d) {
                        best = Some((delta, unit, vehicle, candidate));
                    }
                }
            }
        }

        let Some((_, unit, vehicle, route)) = best else {
            break;
        };
        solution.routes[vehicle] = route;
        solution.unassigned.remove(&unit);
        solution.refresh(ctx, &penalties);
    }
}
