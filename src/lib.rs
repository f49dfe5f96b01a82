//! CPDVRP Solver Library
//!
//! A solver for the single-depot Capacitated Pickup and Delivery Vehicle
//! Routing Problem with per-location service times.
//!
//! # Features
//!
//! - Node splitting: each location becomes an arrival and a post-service node
//!   joined by a service arc
//! - Cumulative capacity dimensions for delivered load and net load
//! - Distance dimension with a global span cost that balances route lengths
//! - Pluggable routing engine; the bundled one combines path-cheapest-arc
//!   construction with guided local search
//! - Console, JSON and CSV reporting
//!
//! # Example
//!
//! ```no_run
//! use cpdvrp_solver::demo_data::reference_instance;
//! use cpdvrp_solver::report::SolutionReport;
//! use cpdvrp_solver::solver::{Solver, SolverConfig};
//!
//! let instance = reference_instance(5).unwrap();
//! let solver = Solver::new(SolverConfig::default());
//!
//! match solver.solve(&instance).unwrap() {
//!     Some(solution) => println!("{}", SolutionReport::new(&instance, &solution)),
//!     None => println!("No solution found !"),
//! }
//! ```

pub mod demo_data;
pub mod dimensions;
pub mod engine;
pub mod error;
pub mod instance;
pub mod report;
pub mod solution;
pub mod solver;
pub mod transform;

pub use error::{SolveError, ValidationError};
pub use instance::CpdvrpInstance;
pub use report::SolutionReport;
pub use solution::Solution;
pub use solver::{solve, Solver, SolverConfig};
