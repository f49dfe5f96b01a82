//! Route search engine.
//!
//! The core configures a [`RoutingModel`] (transit callbacks, cumulative
//! dimensions, span costs) and hands it to a [`RoutingEngine`] together with
//! [`SearchParameters`]. The engine answers with the best assignment it found
//! within its budget, or with `None` when no complete feasible assignment was
//! reached.
//!
//! [`LocalSearchEngine`] is the bundled implementation: path-cheapest-arc or
//! parallel-cheapest-insertion construction followed by guided local search.

pub mod guided;
pub mod model;
pub mod params;
mod construction;
mod local_search;
mod units;
mod working;

pub use guided::LocalSearchEngine;
pub use model::{Dimension, RoutingModel, TransitCallback, TransitCallbackIndex};
pub use params::{FirstSolutionStrategy, LocalSearchMetaheuristic, SearchListener, SearchParameters};

use thiserror::Error;

/// Arc costs at or above this value mark arcs that do not exist.
pub const UNREACHABLE: i64 = 1_000_000_000;

/// Unexpected failures of the engine or of the model it was given.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    #[error("routing model needs at least one vehicle")]
    NoVehicles,
    #[error("depot {depot} is outside the {node_count} model nodes")]
    DepotOutOfRange { depot: usize, node_count: usize },
    #[error("unknown transit callback #{0}")]
    UnknownCallback(usize),
    #[error("dimension `{dimension}` has {actual} capacities for {expected} vehicles")]
    CapacityCountMismatch {
        dimension: String,
        expected: usize,
        actual: usize,
    },
    #[error("dimension `{dimension}` has negative capacity {capacity} for vehicle {vehicle}")]
    NegativeCapacity {
        dimension: String,
        vehicle: usize,
        capacity: i64,
    },
    #[error("dimension `{0}` is already defined")]
    DuplicateDimension(String),
    #[error("unknown dimension `{0}`")]
    UnknownDimension(String),
    #[error("route {vehicle} is malformed: {reason}")]
    MalformedRoute { vehicle: usize, reason: String },
    #[error("assignment does not visit every location exactly once")]
    IncompleteAssignment,
}

/// A complete assignment of nodes to vehicles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// One node sequence per vehicle, starting and ending at the depot.
    pub routes: Vec<Vec<usize>>,
    /// Arc costs plus global span costs.
    pub objective: i64,
    /// Local optima visited by the metaheuristic.
    pub iterations: usize,
}

/// A search engine able to solve a configured routing model.
pub trait RoutingEngine {
    fn solve(
        &self,
        model: &RoutingModel,
        params: &SearchParameters,
    ) -> Result<Option<Assignment>, EngineFault>;

    fn name(&self) -> &str;
}
