//! Reference data set: 17 locations (depot included) served by 4 vehicles.

use crate::error::ValidationError;
use crate::instance::CpdvrpInstance;

pub const LOCATIONS: usize = 17;

pub const DISTANCES: [[i64; LOCATIONS]; LOCATIONS] = [
    [0, 548, 776, 696, 582, 274, 502, 194, 308, 194, 536, 502, 388, 354, 468, 776, 662],
    [548, 0, 684, 308, 194, 502, 730, 354, 696, 742, 1084, 594, 480, 674, 1016, 868, 1210],
    [776, 684, 0, 992, 878, 502, 274, 810, 468, 742, 400, 1278, 1164, 1130, 788, 1552, 754],
    [696, 308, 992, 0, 114, 650, 878, 502, 844, 890, 1232, 514, 628, 822, 1164, 560, 1358],
    [582, 194, 878, 114, 0, 536, 764, 388, 730, 776, 1118, 400, 514, 708, 1050, 674, 1244],
    [274, 502, 502, 650, 536, 0, 228, 308, 194, 240, 582, 776, 662, 628, 514, 1050, 708],
    [502, 730, 274, 878, 764, 228, 0, 536, 194, 468, 354, 1004, 890, 856, 514, 1278, 480],
    [194, 354, 810, 502, 388, 308, 536, 0, 342, 388, 730, 468, 354, 320, 662, 742, 856],
    [308, 696, 468, 844, 730, 194, 194, 342, 0, 274, 388, 810, 696, 662, 320, 1084, 514],
    [194, 742, 742, 890, 776, 240, 468, 388, 274, 0, 342, 536, 422, 388, 274, 810, 468],
    [536, 1084, 400, 1232, 1118, 582, 354, 730, 388, 342, 0, 878, 764, 730, 388, 1152, 354],
    [502, 594, 1278, 514, 400, 776, 1004, 468, 810, 536, 878, 0, 114, 308, 650, 274, 844],
    [388, 480, 1164, 628, 514, 662, 890, 354, 696, 422, 764, 114, 0, 194, 536, 388, 730],
    [354, 674, 1130, 822, 708, 628, 856, 320, 662, 388, 730, 308, 194, 0, 342, 422, 536],
    [468, 1016, 788, 1164, 1050, 514, 514, 662, 320, 274, 388, 650, 536, 342, 0, 764, 194],
    [776, 868, 1552, 560, 674, 1050, 1278, 742, 1084, 810, 1152, 274, 388, 422, 764, 0, 798],
    [662, 1210, 754, 1358, 1244, 708, 480, 856, 514, 468, 354, 844, 730, 536, 194, 798, 0],
];

pub const DELIVERIES: [i64; LOCATIONS] = [0, 1, 2, 3, 1, 1, 2, 1, 5, 1, 1, 1, 2, 1, 1, 4, 1];
pub const PICKUPS: [i64; LOCATIONS] = [0, 2, 1, 2, 2, 1, 4, 0, 1, 5, 2, 0, 1, 0, 2, 0, 2];
pub const LOAD_TIME: [i64; LOCATIONS] = [0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2];
pub const CAPACITIES: [i64; 4] = [3, 4, 5, 6];

/// The first `locations` locations of the reference data (depot included),
/// with the distance matrix cut to a `locations x locations` block.
pub fn reference_instance(locations: usize) -> Result<CpdvrpInstance, ValidationError> {
    let n = locations.min(LOCATIONS);
    let distances = DISTANCES[..n].iter().map(|row| row[..n].to_vec()).collect();

    Ok(CpdvrpInstance::new(
        distances,
        DELIVERIES[..n].to_vec(),
        PICKUPS[..n].to_vec(),
        LOAD_TIME[..n].to_vec(),
        CAPACITIES.to_vec(),
    )?
    .with_name(format!("reference-{}", n)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_matrix_is_symmetric() {
        for i in 0..LOCATIONS {
            assert_eq!(DISTANCES[i][i], 0);
            for j in 0..LOCATIONS {
                assert_eq!(DISTANCES[i][j], DISTANCES[j][i]);
            }
        }
    }

    #[test]
    fn test_slice() {
        let instance = reference_instance(5).unwrap();
        assert_eq!(instance.num_locations(), 5);
        assert_eq!(instance.num_vehicles(), 4);
        assert_eq!(instance.deliveries(), &[0, 1, 2, 3, 1]);
        assert_eq!(instance.pickups(), &[0, 2, 1, 2, 2]);
        assert_eq!(instance.distances()[4], vec![582, 194, 878, 114, 0]);
        assert_eq!(instance.name(), "reference-5");

        assert_eq!(reference_instance(100).unwrap().num_locations(), LOCATIONS);
        assert!(matches!(reference_instance(0), Err(ValidationError::EmptyMatrix)));
    }
}
