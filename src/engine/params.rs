//! Search parameters and termination.

use std::time::{Duration, Instant};

/// How the first assignment is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstSolutionStrategy {
    /// Extend each vehicle's path with the cheapest feasible arc.
    #[default]
    PathCheapestArc,
    /// Repeatedly perform the cheapest feasible insertion over all vehicles.
    ParallelCheapestInsertion,
}

/// How the search escapes local optima.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalSearchMetaheuristic {
    /// Stop at the first local optimum.
    GreedyDescent,
    /// Penalize the arcs of maximal utility at each local optimum and keep going.
    #[default]
    GuidedLocalSearch,
}

#[derive(Debug, Clone)]
pub struct SearchParameters {
    pub first_solution_strategy: FirstSolutionStrategy,
    pub local_search_metaheuristic: LocalSearchMetaheuristic,
    /// Wall-clock budget of one solve.
    pub time_limit: Duration,
    /// Maximum number of local optima visited per start.
    pub iteration_limit: Option<usize>,
    pub seed: u64,
    /// Independent searches run in parallel; the best one wins.
    pub num_starts: usize,
    pub guided_local_search_lambda_coefficient: f64,
    /// Longest run of visit units moved by a single relocation.
    pub max_segment_length: usize,
}

impl Default for SearchParameters {
    fn default() -> Self {
        SearchParameters {
            first_solution_strategy: FirstSolutionStrategy::PathCheapestArc,
            local_search_metaheuristic: LocalSearchMetaheuristic::GuidedLocalSearch,
            time_limit: Duration::from_secs(60),
            iteration_limit: None,
            seed: 42,
            num_starts: 1,
            guided_local_search_lambda_coefficient: 0.1,
            max_segment_length: 3,
        }
    }
}

/// Observer notified while a search runs.
pub trait SearchListener: Send + Sync {
    /// A start found a new best assignment.
    fn on_new_best(&self, _start: usize, _objective: i64, _unassigned: usize, _elapsed: Duration) {}
    /// A start finished.
    fn on_start_end(&self, _start: usize, _iterations: usize) {}
}

pub(crate) struct Termination {
    start: Instant,
    max_duration: Duration,
    iteration_limit: Option<usize>,
}

impl Termination {
    pub(crate) fn new(params: &SearchParameters) -> Self {
        Termination {
            start: Instant::now(),
            max_duration: params.time_limit,
            iteration_limit: params.iteration_limit,
        }
    }

    pub(crate) fn out_of_time(&self) -> bool {
        self.start.elapsed() >= self.max_duration
    }

    pub(crate) fn should_terminate(&self, iterations: usize) -> bool {
        self.out_of_time() || self.iteration_limit.is_some_and(|limit| iterations >= limit)
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
