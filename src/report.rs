//! Solution reporting: per-route stops, distances and loads, console
//! rendering and CSV export.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::instance::CpdvrpInstance;
use crate::solution::Solution;
use crate::transform::{TransformedNode, TransitGraph};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub location: usize,
    pub delivery: i64,
    pub pickup: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteReport {
    pub vehicle: usize,
    pub stops: Vec<Stop>,
    /// Travel plus service time along the route.
    pub distance: i64,
    /// Sum of the deliveries made on the route.
    pub load: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionReport {
    pub objective: i64,
    pub routes: Vec<RouteReport>,
    pub total_distance: i64,
    pub total_load: i64,
}

/// One CSV row.
#[derive(Debug, Serialize)]
struct StopRecord {
    vehicle: usize,
    sequence: usize,
    location: usize,
    delivery: i64,
    pickup: i64,
}

impl SolutionReport {
    pub fn new(instance: &CpdvrpInstance, solution: &Solution) -> Self {
        let graph = TransitGraph::build(instance);
        let deliveries = instance.deliveries();
        let pickups = instance.pickups();

        let routes: Vec<RouteReport> = solution
            .routes
            .iter()
            .map(|route| {
                let stops: Vec<Stop> = route
                    .nodes
                    .iter()
                    .filter_map(|node| match node {
                        TransformedNode::Arrival(location) => Some(Stop {
                            location: *location,
                            delivery: deliveries[*location],
                            pickup: pickups[*location],
                        }),
                        _ => None,
                    })
                    .collect();
                let distance = route
                    .nodes
                    .windows(2)
                    .map(|arc| graph.distance(arc[0].index(), arc[1].index()))
                    .sum();
                let load = stops.iter().map(|stop| stop.delivery).sum();
                RouteReport { vehicle: route.vehicle, stops, distance, load }
            })
            .collect();

        SolutionReport {
            objective: solution.objective,
            total_distance: routes.iter().map(|r| r.distance).sum(),
            total_load: routes.iter().map(|r| r.load).sum(),
            routes,
        }
    }

    /// Write every stop as a CSV row.
    pub fn write_csv<W: Write>(&self, writer: W) -> std::io::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);

        for route in &self.routes {
            for (sequence, stop) in route.stops.iter().enumerate() {
                writer.serialize(StopRecord {
                    vehicle: route.vehicle,
                    sequence,
                    location: stop.location,
                    delivery: stop.delivery,
                    pickup: stop.pickup,
                })?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        self.write_csv(File::create(path)?)
    }
}

impl std::fmt::Display for SolutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Objective: {}", self.objective)?;
        for route in &self.routes {
            writeln!(f, "Route for vehicle {}:", route.vehicle)?;
            for stop in &route.stops {
                write!(f, "Node {}: -{}+{} --> ", stop.location, stop.delivery, stop.pickup)?;
            }
            writeln!(f, "Node 0: start {})", route.load)?;
            writeln!(f, "Distance of the route: {}m", route.distance)?;
            writeln!(f, "Load of the route: {}", route.load)?;
            writeln!(f)?;
        }
        writeln!(f, "Total distance of all routes: {}m", self.total_distance)?;
        write!(f, "Total load of all routes: {}", self.total_load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::VehicleRoute;
    use crate::transform::TransformedNode::*;

    fn instance() -> CpdvrpInstance {
        CpdvrpInstance::new(
            vec![vec![0, 4, 6], vec![4, 0, 3], vec![6, 3, 0]],
            vec![0, 2, 1],
            vec![0, 1, 2],
            vec![0, 5, 7],
            vec![3, 3],
        )
        .unwrap()
    }

    fn solution() -> Solution {
        Solution {
            routes: vec![
                VehicleRoute {
                    vehicle: 0,
                    capacity: 3,
                    nodes: vec![Depot, Arrival(2), PostService(2), Arrival(1), PostService(1), Depot],
                },
                VehicleRoute { vehicle: 1, capacity: 3, nodes: vec![Depot, Depot] },
            ],
            objective: 29_029,
            algorithm: "test".to_string(),
            computation_time: 0.0,
            iterations: 0,
        }
    }

    #[test]
    fn test_report_matches_physical_route() {
        let instance = instance();
        let report = SolutionReport::new(&instance, &solution());

        let first = &report.routes[0];
        let locations: Vec<usize> = first.stops.iter().map(|s| s.location).collect();
        assert_eq!(locations, vec![2, 1]);
        assert_eq!(first.distance, instance.route_length(&locations));
        assert_eq!(first.distance, 6 + 7 + 3 + 5 + 4);
        assert_eq!(first.load, 3);

        assert!(report.routes[1].stops.is_empty());
        assert_eq!(report.routes[1].distance, 0);
        assert_eq!(report.total_distance, 25);
        assert_eq!(report.total_load, instance.deliveries().iter().sum::<i64>());
    }

    #[test]
    fn test_console_format() {
        let report = SolutionReport::new(&instance(), &solution());
        let text = report.to_string();

        assert!(text.starts_with("Objective: 29029\n"));
        assert!(text.contains("Route for vehicle 0:\nNode 2: -1+2 --> Node 1: -2+1 --> Node 0: start 3)\n"));
        assert!(text.contains("Distance of the route: 25m\nLoad of the route: 3\n"));
        assert!(text.contains("Route for vehicle 1:\nNode 0: start 0)\nDistance of the route: 0m\n"));
        assert!(text.ends_with("Total distance of all routes: 25m\nTotal load of all routes: 3"));
    }

    #[test]
    fn test_csv_export() {
        let report = SolutionReport::new(&instance(), &solution());
        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["vehicle,sequence,location,delivery,pickup", "0,0,2,1,2", "0,1,1,2,1"]);
    }
}
