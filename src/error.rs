//! Error types for CPDVRP solving.
//!
//! Validation problems are reported before any search starts. Engine faults
//! come from a misconfigured routing model and are propagated as-is. An
//! exhausted search is not an error: it surfaces as `Ok(None)` from the solver.

use thiserror::Error;

use crate::engine::EngineFault;

/// Malformed problem data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("distance matrix is empty")]
    EmptyMatrix,
    #[error("distance matrix is not square: row {row} has {len} entries, expected {expected}")]
    NotSquare { row: usize, len: usize, expected: usize },
    #[error("`{field}` has {actual} entries, expected one per location ({expected})")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("at least one vehicle capacity is required")]
    NoVehicles,
    #[error("vehicle {vehicle} has non-positive capacity {capacity}")]
    NonPositiveCapacity { vehicle: usize, capacity: i64 },
    #[error("depot `{field}` must be 0, got {value}")]
    NonZeroDepot { field: &'static str, value: i64 },
    #[error("`{field}` at location {location} is negative ({value})")]
    Negative {
        field: &'static str,
        location: usize,
        value: i64,
    },
    #[error("distance from {from} to {to} is negative ({value})")]
    NegativeDistance { from: usize, to: usize, value: i64 },
}

/// Anything that stops a solve from producing a result.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("invalid problem data: {0}")]
    Validation(#[from] ValidationError),
    #[error("routing engine failure: {0}")]
    Engine(#[from] EngineFault),
}
