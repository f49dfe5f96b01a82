//! CPDVRP Solver - Command Line Interface
//!
//! Solves capacitated pickup-and-delivery vehicle routing instances read from
//! JSON files or taken from the built-in reference data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use cpdvrp_solver::demo_data::{self, reference_instance};
use cpdvrp_solver::dimensions::DEFAULT_SPAN_COEFFICIENT;
use cpdvrp_solver::engine::{
    FirstSolutionStrategy, LocalSearchEngine, LocalSearchMetaheuristic, SearchListener, UNREACHABLE,
};
use cpdvrp_solver::instance::CpdvrpInstance;
use cpdvrp_solver::report::SolutionReport;
use cpdvrp_solver::solution::Solution;
use cpdvrp_solver::solver::{Solver, SolverConfig};
use cpdvrp_solver::transform::TransitGraph;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "cpdvrp-solver")]
#[command(version = "1.0")]
#[command(about = "Capacitated pickup-and-delivery vehicle routing with service times")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InstanceSource {
    /// Path to a JSON instance file
    #[arg(short, long, conflicts_with = "demo_locations")]
    instance: Option<PathBuf>,

    /// Use the first N locations of the built-in reference data (depot included)
    #[arg(long, default_value = "5")]
    demo_locations: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance
    Solve {
        #[command(flatten)]
        source: InstanceSource,

        /// Time limit in seconds
        #[arg(short, long, default_value = "60")]
        time_limit: f64,

        /// Maximum number of local optima visited per start
        #[arg(long)]
        iterations: Option<usize>,

        /// Weight of the longest route in the objective
        #[arg(long, default_value_t = DEFAULT_SPAN_COEFFICIENT)]
        span_coefficient: i64,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Number of independent searches run in parallel
        #[arg(long, default_value = "1")]
        starts: usize,

        #[arg(long, value_enum, default_value = "path-cheapest-arc")]
        first_solution: FirstSolution,

        #[arg(long, value_enum, default_value = "guided-local-search")]
        metaheuristic: Metaheuristic,

        /// Output solution and report to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export route stops to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Analyze an instance
    Analyze {
        #[command(flatten)]
        source: InstanceSource,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum FirstSolution {
    /// Extend each route with the cheapest feasible arc
    PathCheapestArc,
    /// Cheapest feasible insertion over all routes
    ParallelCheapestInsertion,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Metaheuristic {
    /// Penalize costly arcs at local optima and keep searching
    GuidedLocalSearch,
    /// Stop at the first local optimum
    GreedyDescent,
}

impl From<FirstSolution> for FirstSolutionStrategy {
    fn from(value: FirstSolution) -> Self {
        match value {
            FirstSolution::PathCheapestArc => FirstSolutionStrategy::PathCheapestArc,
            FirstSolution::ParallelCheapestInsertion => FirstSolutionStrategy::ParallelCheapestInsertion,
        }
    }
}

impl From<Metaheuristic> for LocalSearchMetaheuristic {
    fn from(value: Metaheuristic) -> Self {
        match value {
            Metaheuristic::GuidedLocalSearch => LocalSearchMetaheuristic::GuidedLocalSearch,
            Metaheuristic::GreedyDescent => LocalSearchMetaheuristic::GreedyDescent,
        }
    }
}

/// Spinner showing the best objective found so far.
struct ProgressListener {
    bar: ProgressBar,
}

impl ProgressListener {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} [{elapsed}] {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        bar.set_message("building first solution");
        ProgressListener { bar }
    }
}

impl SearchListener for ProgressListener {
    fn on_new_best(&self, start: usize, objective: i64, unassigned: usize, elapsed: Duration) {
        if unassigned > 0 {
            self.bar.set_message(format!(
                "start {}: {} locations unplaced ({:.1?})",
                start, unassigned, elapsed
            ));
        } else {
            self.bar.set_message(format!("start {}: best objective {} ({:.1?})", start, objective, elapsed));
        }
    }
}

#[derive(Serialize)]
struct SolveOutput<'a> {
    instance: &'a str,
    solution: &'a Solution,
    report: &'a SolutionReport,
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Solve { verbose: true, .. });
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Solve {
            source,
            time_limit,
            iterations,
            span_coefficient,
            seed,
            starts,
            first_solution,
            metaheuristic,
            output,
            csv,
            verbose,
        } => {
            let time_limit = match time_limit_from_secs(time_limit) {
                Ok(limit) => limit,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let config = SolverConfig {
                time_limit,
                iteration_limit: iterations,
                span_cost_coefficient: span_coefficient,
                seed,
                num_starts: starts,
                first_solution_strategy: first_solution.into(),
                local_search_metaheuristic: metaheuristic.into(),
                ..SolverConfig::default()
            };
            solve_instance(&source, config, output, csv, verbose);
        }

        Commands::Analyze { source } => {
            analyze_instance(&source);
        }
    }
}

fn time_limit_from_secs(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid time limit {}: {}", secs, e))
}

fn load_instance(source: &InstanceSource) -> CpdvrpInstance {
    let loaded = match &source.instance {
        Some(path) => {
            println!("Loading instance from {:?}...", path);
            CpdvrpInstance::from_file(path)
        }
        None => {
            println!(
                "Using the first {} of {} reference locations...",
                source.demo_locations,
                demo_data::LOCATIONS
            );
            reference_instance(source.demo_locations).map_err(|e| e.to_string())
        }
    };

    match loaded {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_instance(
    source: &InstanceSource,
    config: SolverConfig,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
    verbose: bool,
) {
    let instance = load_instance(source);

    if verbose {
        println!("{}", instance.statistics());
        println!("Search: {:?}", config);
    }

    let listener = Arc::new(ProgressListener::new());
    let engine = LocalSearchEngine::with_listener(listener.clone());
    let solver = Solver::with_engine(config, Box::new(engine));

    let result = solver.solve(&instance);
    listener.bar.finish_and_clear();

    let solution = match result {
        Ok(Some(solution)) => solution,
        Ok(None) => {
            println!("No solution found !");
            return;
        }
        Err(e) => {
            eprintln!("Solver error: {}", e);
            std::process::exit(1);
        }
    };

    let report = SolutionReport::new(&instance, &solution);
    println!("{}", report);

    if verbose {
        println!("\n{}", solution);
        for route in solution.routes.iter().filter(|r| !r.is_empty()) {
            let profile = route.load_profile(&instance);
            println!("Vehicle {} deliveries: {:?}", route.vehicle, profile.delivered);
            println!("Vehicle {} net load:   {:?}", route.vehicle, profile.net);
        }
    }

    if let Some(out_path) = output {
        let document = SolveOutput {
            instance: instance.name(),
            solution: &solution,
            report: &report,
        };
        let written = serde_json::to_string_pretty(&document)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&out_path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("\nSolution saved to {:?}", out_path),
            Err(e) => {
                eprintln!("Failed to write output: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(csv_path) = csv {
        match report.export_to_csv(&csv_path) {
            Ok(()) => println!("Stops exported to {:?}", csv_path),
            Err(e) => {
                eprintln!("Failed to export stops: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn analyze_instance(source: &InstanceSource) {
    let instance = load_instance(source);

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let graph = TransitGraph::build(&instance);
    let arcs: usize = graph
        .rows()
        .map(|row| row.iter().filter(|&&cost| cost < UNREACHABLE).count())
        .sum();
    println!("Transformed graph: {} nodes, {} arcs", graph.node_count(), arcs);

    let max_capacity = instance.capacities().iter().copied().max().unwrap_or(0);
    let oversized: Vec<usize> = (1..instance.num_locations())
        .filter(|&location| instance.deliveries()[location] > max_capacity)
        .collect();
    if !oversized.is_empty() {
        println!("Locations delivering more than any vehicle carries: {:?}", oversized);
    }

    let total_delivery: i64 = instance.deliveries().iter().sum();
    let total_capacity: i64 = instance.capacities().iter().sum();
    println!(
        "Delivery/capacity ratio: {:.2}",
        total_delivery as f64 / total_capacity.max(1) as f64
    );
    if total_delivery > total_capacity {
        println!("Total delivery exceeds the fleet capacity: no solution exists.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_limit_from_secs() {
        assert_eq!(time_limit_from_secs(1.5), Ok(Duration::from_millis(1500)));
        assert_eq!(time_limit_from_secs(0.0), Ok(Duration::ZERO));
        assert!(time_limit_from_secs(f64::INFINITY).is_err());
        assert!(time_limit_from_secs(f64::NAN).is_err());
        assert!(time_limit_from_secs(-1.0).is_err());
        assert!(time_limit_from_secs(1e30).is_err());
    }
}
