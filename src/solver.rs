//! Solve orchestration.
//!
//! Transforms a validated instance, configures a [`RoutingModel`] from the
//! dimension specs, runs the engine and maps the assignment back to
//! [`TransformedNode`] routes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::dimensions::{capacity_dimensions, distance_dimension, DEFAULT_SPAN_COEFFICIENT};
use crate::engine::{
    Assignment, EngineFault, FirstSolutionStrategy, LocalSearchEngine, LocalSearchMetaheuristic, RoutingEngine,
    RoutingModel, SearchParameters,
};
use crate::error::SolveError;
use crate::instance::{CpdvrpInstance, DEPOT};
use crate::solution::{Solution, VehicleRoute};
use crate::transform::{transformed_size, TransformedNode, TransitGraph};

#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub time_limit: Duration,
    pub iteration_limit: Option<usize>,
    /// Weight of the longest-route term of the distance dimension.
    pub span_cost_coefficient: i64,
    pub seed: u64,
    pub num_starts: usize,
    pub first_solution_strategy: FirstSolutionStrategy,
    pub local_search_metaheuristic: LocalSearchMetaheuristic,
    pub guided_local_search_lambda_coefficient: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: Duration::from_secs(60),
            iteration_limit: None,
            span_cost_coefficient: DEFAULT_SPAN_COEFFICIENT,
            seed: 42,
            num_starts: 1,
            first_solution_strategy: FirstSolutionStrategy::PathCheapestArc,
            local_search_metaheuristic: LocalSearchMetaheuristic::GuidedLocalSearch,
            guided_local_search_lambda_coefficient: 0.1,
        }
    }
}

impl SolverConfig {
    pub fn search_parameters(&self) -> SearchParameters {
        SearchParameters {
            first_solution_strategy: self.first_solution_strategy,
            local_search_metaheuristic: self.local_search_metaheuristic,
            time_limit: self.time_limit,
            iteration_limit: self.iteration_limit,
            seed: self.seed,
            num_starts: self.num_starts,
            guided_local_search_lambda_coefficient: self.guided_local_search_lambda_coefficient,
            ..SearchParameters::default()
        }
    }
}

pub struct Solver {
    config: SolverConfig,
    engine: Box<dyn RoutingEngine + Send + Sync>,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Solver::with_engine(config, Box::new(LocalSearchEngine::new()))
    }

    pub fn with_engine(config: SolverConfig, engine: Box<dyn RoutingEngine + Send + Sync>) -> Self {
        Solver { config, engine }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Routing model over the transformed graph with the capacity and
    /// distance dimensions installed.
    pub fn build_model(&self, instance: &CpdvrpInstance) -> Result<RoutingModel, EngineFault> {
        let graph = Arc::new(TransitGraph::build(instance));
        let vehicles = instance.num_vehicles();
        let mut model = RoutingModel::new(graph.node_count(), vehicles, DEPOT)?;

        let mut specs = capacity_dimensions(instance);
        specs.push(distance_dimension(graph, vehicles, self.config.span_cost_coefficient));
        for spec in specs {
            debug!("installing dimension `{}`", spec.name);
            spec.install(&mut model)?;
        }
        Ok(model)
    }

    /// Solve an instance. `Ok(None)` means no feasible solution was found
    /// within the budget.
    pub fn solve(&self, instance: &CpdvrpInstance) -> Result<Option<Solution>, SolveError> {
        let start = Instant::now();
        let model = self.build_model(instance)?;
        info!(
            "solving {} locations ({} transformed nodes) with {} vehicles using {}",
            instance.num_locations(),
            model.node_count(),
            instance.num_vehicles(),
            self.engine.name()
        );

        let Some(assignment) = self.engine.solve(&model, &self.config.search_parameters())? else {
            info!("no solution found after {:.2?}", start.elapsed());
            return Ok(None);
        };

        let solution = self.to_solution(instance, &model, assignment, start.elapsed())?;
        info!(
            "objective {} with {} of {} vehicles in {:.3}s",
            solution.objective,
            solution.used_vehicles(),
            solution.routes.len(),
            solution.computation_time
        );
        Ok(Some(solution))
    }

    fn to_solution(
        &self,
        instance: &CpdvrpInstance,
        model: &RoutingModel,
        assignment: Assignment,
        elapsed: Duration,
    ) -> Result<Solution, EngineFault> {
        if assignment.routes.len() != instance.num_vehicles() {
            return Err(EngineFault::MalformedRoute {
                vehicle: assignment.routes.len(),
                reason: format!("expected {} routes", instance.num_vehicles()),
            });
        }

        let node_count = transformed_size(instance.num_locations());
        let routes = assignment
            .routes
            .iter()
            .enumerate()
            .map(|(vehicle, route)| vehicle_route(instance, model, node_count, vehicle, route))
            .collect::<Result<Vec<_>, _>>()?;

        let solution = Solution {
            routes,
            objective: assignment.objective,
            algorithm: self.engine.name().to_string(),
            computation_time: elapsed.as_secs_f64(),
            iterations: assignment.iterations,
        };
        if !solution.is_complete(instance) {
            return Err(EngineFault::IncompleteAssignment);
        }
        if let Some(route) = solution.routes.iter().find(|route| !route.respects_capacity(instance)) {
            return Err(EngineFault::MalformedRoute {
                vehicle: route.vehicle,
                reason: format!("load leaves [0, {}]", route.capacity),
            });
        }
        Ok(solution)
    }
}

fn vehicle_route(
    instance: &CpdvrpInstance,
    model: &RoutingModel,
    node_count: usize,
    vehicle: usize,
    route: &[usize],
) -> Result<VehicleRoute, EngineFault> {
    let malformed = |reason: String| EngineFault::MalformedRoute { vehicle, reason };

    if route.len() < 2 || route[0] != DEPOT || route[route.len() - 1] != DEPOT {
        return Err(malformed("route must start and end at the depot".to_string()));
    }
    if let Some(&node) = route.iter().find(|&&node| node >= node_count) {
        return Err(malformed(format!("node {} is out of range", node)));
    }
    if let Some(arc) = route.windows(2).find(|arc| !model.is_arc_allowed(arc[0], arc[1])) {
        return Err(malformed(format!("arc {} -> {} is not allowed", arc[0], arc[1])));
    }

    Ok(VehicleRoute {
        vehicle,
        capacity: instance.capacities()[vehicle],
        nodes: route.iter().map(|&index| TransformedNode::from_index(index)).collect(),
    })
}

/// Solve raw problem data with the default configuration.
pub fn solve(
    distances: Vec<Vec<i64>>,
    deliveries: Vec<i64>,
    pickups: Vec<i64>,
    load_time: Vec<i64>,
    capacities: Vec<i64>,
) -> Result<Option<Solution>, SolveError> {
    let instance = CpdvrpInstance::new(distances, deliveries, pickups, load_time, capacities)?;
    Solver::new(SolverConfig::default()).solve(&instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_data::reference_instance;
    use crate::error::ValidationError;
    use crate::report::SolutionReport;

    fn config() -> SolverConfig {
        SolverConfig {
            time_limit: Duration::from_secs(10),
            iteration_limit: Some(50),
            ..SolverConfig::default()
        }
    }

    #[test]
    fn test_reference_slice() {
        let instance = reference_instance(5).unwrap();
        let solution = Solver::new(config()).solve(&instance).unwrap().unwrap();

        assert!(solution.is_complete(&instance));
        assert!(solution.respects_capacity(&instance));
        assert_eq!(solution.algorithm, "LocalSearch");

        let report = SolutionReport::new(&instance, &solution);
        assert_eq!(report.total_load, 7);
        assert_eq!(report.objective, solution.objective);
    }

    #[test]
    fn test_infeasible_capacity_yields_none() {
        let instance = CpdvrpInstance::new(
            vec![vec![0, 5], vec![5, 0]],
            vec![0, 2],
            vec![0, 0],
            vec![0, 1],
            vec![1],
        )
        .unwrap();
        assert!(Solver::new(config()).solve(&instance).unwrap().is_none());
    }

    #[test]
    fn test_two_vehicles_split_load() {
        let instance = CpdvrpInstance::new(
            vec![vec![0, 10, 10], vec![10, 0, 1], vec![10, 1, 0]],
            vec![0, 2, 2],
            vec![0, 1, 1],
            vec![0, 3, 3],
            vec![2, 2],
        )
        .unwrap();
        let solution = Solver::new(config()).solve(&instance).unwrap().unwrap();

        assert!(solution.is_complete(&instance));
        assert!(solution.respects_capacity(&instance));
        assert_eq!(solution.used_vehicles(), 2);
        // two routes of length 23, span 23
        assert_eq!(solution.objective, 46 + 1000 * 23);
    }

    #[test]
    fn test_pickup_above_delivery_cannot_start_a_route() {
        let instance = CpdvrpInstance::new(
            vec![vec![0, 5], vec![5, 0]],
            vec![0, 1],
            vec![0, 2],
            vec![0, 1],
            vec![5],
        )
        .unwrap();
        assert!(Solver::new(config()).solve(&instance).unwrap().is_none());
    }

    #[test]
    fn test_net_load_forces_visit_order() {
        // Location 1 is cheaper to reach first, but its pickup exceeds its
        // delivery, so it has to follow location 2.
        let instance = CpdvrpInstance::new(
            vec![vec![0, 1, 50], vec![50, 0, 1], vec![1, 50, 0]],
            vec![0, 1, 3],
            vec![0, 2, 1],
            vec![0, 1, 1],
            vec![5],
        )
        .unwrap();
        let solution = Solver::new(config()).solve(&instance).unwrap().unwrap();

        assert_eq!(solution.routes[0].stops(), vec![2, 1]);
        assert!(solution.respects_capacity(&instance));
        let profile = solution.routes[0].load_profile(&instance);
        assert!(profile.net.iter().all(|&load| load >= 0));
    }

    #[test]
    fn test_validation_before_search() {
        let result = solve(
            vec![vec![0, 1], vec![1, 0]],
            vec![1, 1],
            vec![0, 0],
            vec![0, 0],
            vec![3],
        );
        assert!(matches!(
            result,
            Err(SolveError::Validation(ValidationError::NonZeroDepot { field: "deliveries", value: 1 }))
        ));
    }

    #[test]
    fn test_same_seed_same_solution() {
        let instance = reference_instance(6).unwrap();
        let solver = Solver::new(config());
        let first = solver.solve(&instance).unwrap();
        let second = solver.solve(&instance).unwrap();

        assert_eq!(first.map(|s| (s.objective, s.routes)), second.map(|s| (s.objective, s.routes)));
    }

    struct FixedEngine(Result<Option<Assignment>, EngineFault>);

    impl RoutingEngine for FixedEngine {
        fn solve(&self, _model: &RoutingModel, _params: &SearchParameters) -> Result<Option<Assignment>, EngineFault> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    fn small_instance() -> CpdvrpInstance {
        CpdvrpInstance::new(
            vec![vec![0, 4], vec![4, 0]],
            vec![0, 1],
            vec![0, 1],
            vec![0, 2],
            vec![5],
        )
        .unwrap()
    }

    #[test]
    fn test_engine_fault_propagates() {
        let engine = FixedEngine(Err(EngineFault::UnknownDimension("Time".to_string())));
        let solver = Solver::with_engine(config(), Box::new(engine));

        assert!(matches!(
            solver.solve(&small_instance()),
            Err(SolveError::Engine(EngineFault::UnknownDimension(_)))
        ));
    }

    #[test]
    fn test_assignment_is_mapped_back() {
        let assignment = Assignment { routes: vec![vec![0, 1, 2, 0]], objective: 10, iterations: 3 };
        let solver = Solver::with_engine(config(), Box::new(FixedEngine(Ok(Some(assignment)))));
        let solution = solver.solve(&small_instance()).unwrap().unwrap();

        assert_eq!(
            solution.routes[0].nodes,
            vec![
                TransformedNode::Depot,
                TransformedNode::Arrival(1),
                TransformedNode::PostService(1),
                TransformedNode::Depot
            ]
        );
        assert_eq!(solution.routes[0].capacity, 5);
        assert_eq!(solution.algorithm, "Fixed");
        assert_eq!(solution.iterations, 3);
    }

    #[test]
    fn test_malformed_assignment_is_rejected() {
        for routes in [vec![vec![1, 2, 0]], vec![vec![0, 7, 0]], vec![vec![0, 0]], vec![]] {
            let assignment = Assignment { routes, objective: 0, iterations: 0 };
            let solver = Solver::with_engine(config(), Box::new(FixedEngine(Ok(Some(assignment)))));
            assert!(matches!(solver.solve(&small_instance()), Err(SolveError::Engine(_))));
        }
    }

    #[test]
    fn test_assignment_breaking_arcs_or_capacity_is_rejected() {
        let instance = CpdvrpInstance::new(
            vec![vec![0, 4], vec![4, 0]],
            vec![0, 3],
            vec![0, 0],
            vec![0, 2],
            vec![1],
        )
        .unwrap();

        // missing service arc, then post-service before arrival
        for route in [vec![0, 1, 0], vec![0, 2, 1, 0]] {
            let assignment = Assignment { routes: vec![route], objective: 0, iterations: 0 };
            let solver = Solver::with_engine(config(), Box::new(FixedEngine(Ok(Some(assignment)))));
            assert!(matches!(
                solver.solve(&instance),
                Err(SolveError::Engine(EngineFault::MalformedRoute { vehicle: 0, .. }))
            ));
        }

        // well-formed, but delivers 3 with capacity 1
        let assignment = Assignment { routes: vec![vec![0, 1, 2, 0]], objective: 0, iterations: 0 };
        let solver = Solver::with_engine(config(), Box::new(FixedEngine(Ok(Some(assignment)))));
        match solver.solve(&instance) {
            Err(SolveError::Engine(EngineFault::MalformedRoute { vehicle, reason })) => {
                assert_eq!(vehicle, 0);
                assert!(reason.contains("load"));
            }
            other => panic!("expected a capacity fault, got {:?}", other),
        }
    }
}
