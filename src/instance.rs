//! Module for validating and representing CPDVRP instances.
//!
//! An instance holds the integer distance matrix between physical locations,
//! the per-location delivery and pickup quantities, the per-location load time
//! and the ordered list of vehicle capacities. Location 0 is the depot.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Index of the depot among physical locations.
pub const DEPOT: usize = 0;

/// Raw problem data as it appears in instance files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemData {
    #[serde(default)]
    pub name: String,
    pub distances: Vec<Vec<i64>>,
    pub deliveries: Vec<i64>,
    pub pickups: Vec<i64>,
    pub load_time: Vec<i64>,
    pub capacities: Vec<i64>,
}

/// A validated CPDVRP instance.
///
/// Built once per solve and never mutated afterwards. All derivation steps
/// borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ProblemData", into = "ProblemData")]
pub struct CpdvrpInstance {
    name: String,
    distances: Vec<Vec<i64>>,
    deliveries: Vec<i64>,
    pickups: Vec<i64>,
    load_time: Vec<i64>,
    capacities: Vec<i64>,
}

impl CpdvrpInstance {
    /// Validate raw data and build an instance.
    pub fn new(
        distances: Vec<Vec<i64>>,
        deliveries: Vec<i64>,
        pickups: Vec<i64>,
        load_time: Vec<i64>,
        capacities: Vec<i64>,
    ) -> Result<Self, ValidationError> {
        let n = distances.len();
        if n == 0 {
            return Err(ValidationError::EmptyMatrix);
        }
        for (row, values) in distances.iter().enumerate() {
            if values.len() != n {
                return Err(ValidationError::NotSquare { row, len: values.len(), expected: n });
            }
            if let Some((to, &value)) = values.iter().enumerate().find(|(_, d)| **d < 0) {
                return Err(ValidationError::NegativeDistance { from: row, to, value });
            }
        }

        for (field, values) in [
            ("deliveries", &deliveries),
            ("pickups", &pickups),
            ("load_time", &load_time),
        ] {
            if values.len() != n {
                return Err(ValidationError::LengthMismatch {
                    field,
                    expected: n,
                    actual: values.len(),
                });
            }
            if values[DEPOT] != 0 {
                return Err(ValidationError::NonZeroDepot { field, value: values[DEPOT] });
            }
            if let Some((location, &value)) = values.iter().enumerate().find(|(_, v)| **v < 0) {
                return Err(ValidationError::Negative { field, location, value });
            }
        }

        if capacities.is_empty() {
            return Err(ValidationError::NoVehicles);
        }
        if let Some((vehicle, &capacity)) = capacities.iter().enumerate().find(|(_, c)| **c <= 0) {
            return Err(ValidationError::NonPositiveCapacity { vehicle, capacity });
        }

        Ok(CpdvrpInstance {
            name: String::new(),
            distances,
            deliveries,
            pickups,
            load_time,
            capacities,
        })
    }

    /// Attach a display name to the instance.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Parse an instance from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Cannot open file: {}", e))?;
        let mut instance = Self::from_json_str(&content)?;
        if instance.name.is_empty() {
            if let Some(stem) = path.as_ref().file_stem() {
                instance.name = stem.to_string_lossy().to_string();
            }
        }
        Ok(instance)
    }

    /// Parse an instance from JSON text
    pub fn from_json_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Invalid instance: {}", e))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of physical locations, depot included.
    #[inline]
    pub fn num_locations(&self) -> usize {
        self.distances.len()
    }

    #[inline]
    pub fn num_vehicles(&self) -> usize {
        self.capacities.len()
    }

    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> i64 {
        self.distances[from][to]
    }

    pub fn distances(&self) -> &[Vec<i64>] {
        &self.distances
    }

    pub fn deliveries(&self) -> &[i64] {
        &self.deliveries
    }

    pub fn pickups(&self) -> &[i64] {
        &self.pickups
    }

    pub fn load_time(&self) -> &[i64] {
        &self.load_time
    }

    pub fn capacities(&self) -> &[i64] {
        &self.capacities
    }

    /// Travel distance of a physical route `depot -> stops... -> depot`,
    /// including the load time spent at every stop.
    pub fn route_length(&self, stops: &[usize]) -> i64 {
        if stops.is_empty() {
            return 0;
        }
        let mut length = 0;
        let mut previous = DEPOT;
        for &location in stops {
            length += self.distance(previous, location) + self.load_time[location];
            previous = location;
        }
        length + self.distance(previous, DEPOT)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.num_locations();
        let mut distances: Vec<i64> = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    distances.push(self.distance(i, j));
                }
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<i64>() as f64 / distances.len() as f64
        };

        InstanceStatistics {
            name: self.name.clone(),
            locations: n,
            vehicles: self.num_vehicles(),
            total_delivery: self.deliveries.iter().sum(),
            total_pickup: self.pickups.iter().sum(),
            total_load_time: self.load_time.iter().sum(),
            total_capacity: self.capacities.iter().sum(),
            max_capacity: self.capacities.iter().copied().max().unwrap_or(0),
            avg_distance,
            max_distance: distances.iter().copied().max().unwrap_or(0),
        }
    }
}

impl TryFrom<ProblemData> for CpdvrpInstance {
    type Error = ValidationError;

    fn try_from(data: ProblemData) -> Result<Self, Self::Error> {
        Ok(CpdvrpInstance::new(
            data.distances,
            data.deliveries,
            data.pickups,
            data.load_time,
            data.capacities,
        )?
        .with_name(data.name))
    }
}

impl From<CpdvrpInstance> for ProblemData {
    fn from(instance: CpdvrpInstance) -> Self {
        ProblemData {
            name: instance.name,
            distances: instance.distances,
            deliveries: instance.deliveries,
            pickups: instance.pickups,
            load_time: instance.load_time,
            capacities: instance.capacities,
        }
    }
}

/// Statistics about a CPDVRP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub locations: usize,
    pub vehicles: usize,
    pub total_delivery: i64,
    pub total_pickup: i64,
    pub total_load_time: i64,
    pub total_capacity: i64,
    pub max_capacity: i64,
    pub avg_distance: f64,
    pub max_distance: i64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Locations: {} (1 depot + {} customers)", self.locations, self.locations - 1)?;
        writeln!(f, "  Vehicles: {} (total capacity {}, max {})", self.vehicles, self.total_capacity, self.max_capacity)?;
        writeln!(f, "  Total delivery: {}", self.total_delivery)?;
        writeln!(f, "  Total pickup: {}", self.total_pickup)?;
        writeln!(f, "  Total load time: {}", self.total_load_time)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(n: usize) -> Vec<Vec<i64>> {
        (0..n).map(|i| (0..n).map(|j| (i as i64 - j as i64).abs() * 10).collect()).collect()
    }

    #[test]
    fn test_valid_instance() {
        let instance = CpdvrpInstance::new(
            square(3),
            vec![0, 1, 2],
            vec![0, 2, 1],
            vec![0, 5, 5],
            vec![4, 4],
        )
        .unwrap();

        assert_eq!(instance.num_locations(), 3);
        assert_eq!(instance.num_vehicles(), 2);
        assert_eq!(instance.distance(0, 2), 20);
    }

    #[test]
    fn test_rejects_non_square_matrix() {
        let mut distances = square(3);
        distances[1].push(7);
        let err = CpdvrpInstance::new(distances, vec![0; 3], vec![0; 3], vec![0; 3], vec![1]).unwrap_err();
        assert_eq!(err, ValidationError::NotSquare { row: 1, len: 4, expected: 3 });
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = CpdvrpInstance::new(square(3), vec![0; 3], vec![0; 2], vec![0; 3], vec![1]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::LengthMismatch { field: "pickups", expected: 3, actual: 2 }
        );
    }

    #[test]
    fn test_rejects_non_zero_depot() {
        for (deliveries, pickups, load_time, field) in [
            (vec![1, 0], vec![0, 0], vec![0, 0], "deliveries"),
            (vec![0, 0], vec![2, 0], vec![0, 0], "pickups"),
            (vec![0, 0], vec![0, 0], vec![3, 0], "load_time"),
        ] {
            let err = CpdvrpInstance::new(square(2), deliveries, pickups, load_time, vec![5]).unwrap_err();
            assert!(matches!(err, ValidationError::NonZeroDepot { field: f, .. } if f == field));
        }
    }

    #[test]
    fn test_rejects_bad_fleet() {
        let err = CpdvrpInstance::new(square(2), vec![0; 2], vec![0; 2], vec![0; 2], vec![]).unwrap_err();
        assert_eq!(err, ValidationError::NoVehicles);

        let err = CpdvrpInstance::new(square(2), vec![0; 2], vec![0; 2], vec![0; 2], vec![3, 0]).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveCapacity { vehicle: 1, capacity: 0 });
    }

    #[test]
    fn test_rejects_negative_quantities() {
        let err = CpdvrpInstance::new(square(2), vec![0, -1], vec![0; 2], vec![0; 2], vec![3]).unwrap_err();
        assert_eq!(err, ValidationError::Negative { field: "deliveries", location: 1, value: -1 });

        let mut distances = square(2);
        distances[0][1] = -4;
        let err = CpdvrpInstance::new(distances, vec![0; 2], vec![0; 2], vec![0; 2], vec![3]).unwrap_err();
        assert_eq!(err, ValidationError::NegativeDistance { from: 0, to: 1, value: -4 });
    }

    #[test]
    fn test_json_round_trip_validates() {
        let json = r#"{
            "name": "tiny",
            "distances": [[0, 4], [4, 0]],
            "deliveries": [0, 1],
            "pickups": [0, 1],
            "load_time": [0, 2],
            "capacities": [2]
        }"#;
        let instance = CpdvrpInstance::from_json_str(json).unwrap();
        assert_eq!(instance.name(), "tiny");
        assert_eq!(instance.route_length(&[1]), 10);

        let bad = json.replace("\"deliveries\": [0, 1]", "\"deliveries\": [3, 1]");
        assert!(CpdvrpInstance::from_json_str(&bad).is_err());
    }
}
