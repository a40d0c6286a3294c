//! Synthetic grid generators.
//!
//! These generators create predictable, verifiable field patterns that can
//! be used across the test suite and the benchmarks.

use field_common::{GeoGrid, GridHeader};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A north-to-south lat/lon header covering `[lon0, lon0 + (w-1)·step]`
/// by `[lat0 - (h-1)·step, lat0]`.
pub fn lat_lon_header(lon0: f64, lat0: f64, step: f64, width: usize, height: usize) -> GridHeader {
    GridHeader::new(lon0, lat0, step, -step, width, height)
}

/// Constant wind `(u, v)` everywhere.
pub fn uniform_wind_grid(header: GridHeader, u: f32, v: f32) -> GeoGrid {
    let n = header.len();
    GeoGrid::vector(header, vec![Some([u, v]); n]).expect("valid uniform wind grid")
}

/// Counter-clockwise rotation around the grid center.
///
/// Speed grows linearly with distance from the center and reaches
/// `max_speed` at the edge midpoints.
pub fn vortex_wind_grid(header: GridHeader, max_speed: f32) -> GeoGrid {
    let cx = (header.width - 1) as f32 / 2.0;
    let cy = (header.height - 1) as f32 / 2.0;
    let radius = cx.max(cy).max(1.0);

    let mut values = Vec::with_capacity(header.len());
    for row in 0..header.height {
        for col in 0..header.width {
            let dx = (col as f32 - cx) / radius;
            // rows run north to south, so flip to a y-up frame
            let dy = (cy - row as f32) / radius;
            values.push(Some([-dy * max_speed, dx * max_speed]));
        }
    }
    GeoGrid::vector(header, values).expect("valid vortex grid")
}

/// Temperature-like gradient in Kelvin, cold in the north-west and warm
/// in the south-east (250K to 310K).
pub fn temperature_grid(header: GridHeader) -> GeoGrid {
    let mut values = Vec::with_capacity(header.len());
    for row in 0..header.height {
        for col in 0..header.width {
            let x_factor = col as f32 / header.width.max(1) as f32;
            let y_factor = row as f32 / header.height.max(1) as f32;
            values.push(250.0 + x_factor * 30.0 + y_factor * 30.0);
        }
    }
    GeoGrid::scalar_dense(header, &values).expect("valid temperature grid")
}

/// Scalar grid where each cell is `col * 1000 + row`.
pub fn indexed_scalar_grid(header: GridHeader) -> GeoGrid {
    let mut values = Vec::with_capacity(header.len());
    for row in 0..header.height {
        for col in 0..header.width {
            values.push((col * 1000 + row) as f32);
        }
    }
    GeoGrid::scalar_dense(header, &values).expect("valid indexed grid")
}

/// Random wind with components in `[-max, max]`, reproducible from `seed`.
pub fn random_wind_grid(header: GridHeader, max: f32, seed: u64) -> GeoGrid {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..header.len())
        .map(|_| Some([rng.gen_range(-max..=max), rng.gen_range(-max..=max)]))
        .collect();
    GeoGrid::vector(header, values).expect("valid random wind grid")
}

/// Mask out every cell for which `missing(col, row)` is true.
pub fn with_missing_cells(grid: &GeoGrid, missing: impl Fn(usize, usize) -> bool) -> GeoGrid {
    let header = *grid.header();
    if grid.is_vector() {
        let mut values = Vec::with_capacity(header.len());
        for row in 0..header.height {
            for col in 0..header.width {
                let cell = grid.vector_cell(col, row);
                values.push(if missing(col, row) { None } else { cell });
            }
        }
        GeoGrid::vector(header, values).expect("masked vector grid")
    } else {
        let mut values = Vec::with_capacity(header.len());
        for row in 0..header.height {
            for col in 0..header.width {
                let cell = grid.scalar_cell(col, row);
                values.push(if missing(col, row) { None } else { cell });
            }
        }
        GeoGrid::scalar(header, values).expect("masked scalar grid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vortex_center_is_calm() {
        let grid = vortex_wind_grid(lat_lon_header(0.0, 10.0, 1.0, 5, 5), 10.0);
        assert_eq!(grid.vector_cell(2, 2), Some([0.0, 0.0]));
        // east edge blows north
        assert_eq!(grid.vector_cell(4, 2), Some([0.0, 10.0]));
    }

    #[test]
    fn test_random_grid_is_reproducible() {
        let header = lat_lon_header(0.0, 10.0, 1.0, 4, 4);
        assert_eq!(
            random_wind_grid(header, 5.0, 7),
            random_wind_grid(header, 5.0, 7)
        );
    }

    #[test]
    fn test_with_missing_cells() {
        let grid = temperature_grid(lat_lon_header(0.0, 10.0, 1.0, 3, 3));
        let masked = with_missing_cells(&grid, |col, row| col == 1 && row == 1);
        assert_eq!(masked.scalar_cell(1, 1), None);
        assert_eq!(masked.scalar_cell(0, 0), grid.scalar_cell(0, 0));
    }
}
