//! Guided local search driver.
//!
//! Each start builds a first solution, descends to a local optimum, then
//! penalizes the `(vehicle, arc)` features of maximal utility and descends
//! again on the augmented objective. The best real objective seen is kept.

use std::sync::Arc;

use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::construction::heuristic_for;
use super::local_search::Descent;
use super::params::{LocalSearchMetaheuristic, SearchListener, SearchParameters, Termination};
use super::working::{Penalties, SearchContext, WorkingSolution};
use super::{Assignment, EngineFault, RoutingEngine, RoutingModel};

/// Construction plus descent, optionally driven by guided local search.
#[derive(Default)]
pub struct LocalSearchEngine {
    listener: Option<Arc<dyn SearchListener>>,
}

struct StartOutcome {
    best: WorkingSolution,
    objective: i64,
    iterations: usize,
}

impl LocalSearchEngine {
    pub fn new() -> Self {
        LocalSearchEngine { listener: None }
    }

    pub fn with_listener(listener: Arc<dyn SearchListener>) -> Self {
        LocalSearchEngine { listener: Some(listener) }
    }

    fn run_start(
        &self,
        ctx: &SearchContext,
        params: &SearchParameters,
        termination: &Termination,
        start: usize,
    ) -> StartOutcome {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(start as u64));
        let heuristic = heuristic_for(params.first_solution_strategy);

        let mut current = heuristic.construct(ctx);
        let mut best = current.clone();
        let mut best_objective = best.objective(ctx);
        debug!(
            "start {}: {} built objective {} with {} unassigned units",
            start,
            heuristic.name(),
            best_objective,
            best.unassigned.len()
        );
        self.notify_best(start, &best, best_objective, termination);

        let descent = Descent::with_standard_neighborhoods();
        let mut penalties = Penalties::new();
        let mut lambda = 0i64;
        let mut iterations = 0usize;

        loop {
            descent.run(ctx, &mut current, &penalties, lambda, &mut rng, termination, &mut |solution| {
                let objective = solution.objective(ctx);
                if objective < best_objective {
                    best = solution.clone();
                    best_objective = objective;
                    self.notify_best(start, &best, best_objective, termination);
                }
            });
            iterations += 1;

            if params.local_search_metaheuristic == LocalSearchMetaheuristic::GreedyDescent
                || termination.should_terminate(iterations)
            {
                break;
            }

            let features: Vec<(usize, usize, usize)> = current
                .routes
                .iter()
                .enumerate()
                .filter(|(_, units)| !units.is_empty())
                .flat_map(|(vehicle, units)| {
                    ctx.route_nodes(units)
                        .windows(2)
                        .map(|arc| (vehicle, arc[0], arc[1]))
                        .collect::<Vec<_>>()
                })
                .collect();
            if features.is_empty() {
                debug!("start {}: no arcs left to penalize", start);
                break;
            }

            if lambda == 0 {
                lambda = lambda_for(&current, params.guided_local_search_lambda_coefficient);
            }

            let utility = |feature: &(usize, usize, usize)| {
                let penalty = penalties.get(feature).copied().unwrap_or(0);
                OrderedFloat(ctx.model.arc_cost(feature.1, feature.2) as f64 / (1 + penalty) as f64)
            };
            let Some(max_utility) = features.iter().map(|f| utility(f)).max() else {
                break;
            };
            if max_utility.0 <= 0.0 {
                debug!("start {}: every arc is free, stopping", start);
                break;
            }

            let penalized: Vec<(usize, usize, usize)> =
                features.iter().copied().filter(|f| utility(f) == max_utility).collect();
            for feature in penalized {
                *penalties.entry(feature).or_insert(0) += 1;
            }
            current.refresh(ctx, &penalties);
        }

        if let Some(listener) = &self.listener {
            listener.on_start_end(start, iterations);
        }
        debug!(
            "start {}: {} local optima, best objective {}",
            start, iterations, best_objective
        );

        StartOutcome { best, objective: best_objective, iterations }
    }

    fn notify_best(&self, start: usize, solution: &WorkingSolution, objective: i64, termination: &Termination) {
        if let Some(listener) = &self.listener {
            listener.on_new_best(start, objective, solution.unassigned.len(), termination.elapsed());
        }
    }
}

/// Penalty weight: a fraction of the mean arc cost of the first local optimum.
fn lambda_for(solution: &WorkingSolution, coefficient: f64) -> i64 {
    let arcs = solution.arc_count().max(1) as f64;
    let lambda = (coefficient * solution.arc_cost() as f64 / arcs).round() as i64;
    lambda.max(1)
}

impl RoutingEngine for LocalSearchEngine {
    fn solve(
        &self,
        model: &RoutingModel,
        params: &SearchParameters,
    ) -> Result<Option<Assignment>, EngineFault> {
        if model.vehicle_count() == 0 {
            return Err(EngineFault::NoVehicles);
        }

        let ctx = SearchContext::new(model, params.max_segment_length);
        let termination = Termination::new(params);
        let starts = params.num_starts.max(1);
        info!(
            "{}: {} nodes in {} units, {} vehicles, {} starts",
            self.name(),
            model.node_count(),
            ctx.units.len(),
            model.vehicle_count(),
            starts
        );

        let outcomes: Vec<StartOutcome> = (0..starts)
            .into_par_iter()
            .map(|start| self.run_start(&ctx, params, &termination, start))
            .collect();

        let iterations: usize = outcomes.iter().map(|o| o.iterations).sum();
        let Some(winner) = outcomes.into_iter().min_by_key(|o| o.objective) else {
            return Ok(None);
        };

        if !winner.best.is_complete() {
            info!(
                "{}: {} units still unassigned after {:.2?}",
                self.name(),
                winner.best.unassigned.len(),
                termination.elapsed()
            );
            return Ok(None);
        }

        info!(
            "{}: objective {} after {} local optima in {:.2?}",
            self.name(),
            winner.objective,
            iterations,
            termination.elapsed()
        );
        Ok(Some(winner.best.to_assignment(&ctx, iterations)))
    }

    fn name(&self) -> &str {
        "LocalSearch"
    }
}
