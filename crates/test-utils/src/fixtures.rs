//! Common test fixtures.
//!
//! Small grids whose interpolated values can be checked by hand, and
//! record JSON in the shape the dashboard's data endpoints produce.

use field_common::{GeoGrid, GridHeader};

/// Header of the 3×3 fixture: origin (0, 10), 1° steps, rows north first.
pub const FIXTURE_3X3_HEADER: GridHeader = GridHeader {
    lon_origin: 0.0,
    lat_origin: 10.0,
    lon_step: 1.0,
    lat_step: -1.0,
    width: 3,
    height: 3,
};

/// Values 1..=9 row-major; row 0 is the northern row.
pub const FIXTURE_3X3_VALUES: [f32; 9] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];

/// Scalar 3×3 grid: `interpolate(0.5, 9.5)` is the mean of 1, 2, 4, 5.
pub fn grid_3x3() -> GeoGrid {
    GeoGrid::scalar_dense(FIXTURE_3X3_HEADER, &FIXTURE_3X3_VALUES).expect("valid 3x3 fixture")
}

/// Vector 3×3 grid with u = value and v = -value.
pub fn vector_grid_3x3() -> GeoGrid {
    let values = FIXTURE_3X3_VALUES
        .iter()
        .map(|&v| Some([v, -v]))
        .collect();
    GeoGrid::vector(FIXTURE_3X3_HEADER, values).expect("valid 3x3 vector fixture")
}

/// u-component record on a 27 km Lambert grid (meters).
pub const LCC_27KM_U_RECORD: &str = r#"{
    "header": {"lo1": -2700000.0, "la1": 2700000.0, "dx": 27000.0, "dy": -27000.0, "nx": 4, "ny": 3},
    "data": [1.0, 2.0, 3.0, 4.0, 1.0, 2.0, null, 4.0, 1.0, 2.0, 3.0, 4.0]
}"#;

/// v-component record matching [`LCC_27KM_U_RECORD`].
pub const LCC_27KM_V_RECORD: &str = r#"{
    "header": {"lo1": -2700000.0, "la1": 2700000.0, "dx": 27000.0, "dy": -27000.0, "nx": 4, "ny": 3},
    "data": [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5]
}"#;

/// Scalar record in lat/lon degrees with a missing cell.
pub const TEMP_RECORD: &str = r#"{
    "header": {"lo1": 124.0, "la1": 39.0, "dx": 0.5, "dy": -0.5, "nx": 3, "ny": 3},
    "data": [280.0, 281.0, 282.0, 283.0, 284.0, null, 286.0, 287.0, 288.0]
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::GridRecord;

    #[test]
    fn test_records_parse() {
        let u = GridRecord::from_json(LCC_27KM_U_RECORD).unwrap();
        let v = GridRecord::from_json(LCC_27KM_V_RECORD).unwrap();
        let grid = GeoGrid::vector_from_records(&u, &v).unwrap();
        assert_eq!(grid.header().lon_step, 27000.0);
        assert_eq!(grid.vector_cell(2, 1), None);

        let temp = GridRecord::from_json(TEMP_RECORD).unwrap();
        assert!(GeoGrid::scalar_from_record(&temp).is_ok());
    }

    #[test]
    fn test_fixture_shape() {
        let grid = grid_3x3();
        assert_eq!(grid.scalar_cell(0, 0), Some(1.0));
        assert_eq!(grid.scalar_cell(2, 2), Some(9.0));
    }
}
