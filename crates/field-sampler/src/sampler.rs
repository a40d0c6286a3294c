//! Grid sampler.

use std::sync::Arc;

use field_common::{GeoGrid, GridHeader, GridValues};
use tracing::debug;

use crate::bilinear::bilinear;

/// Interpolated field value at one coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Scalar(f64),
    Vector { u: f64, v: f64, magnitude: f64 },
}

impl Sample {
    /// Scalar value, or the magnitude of a vector sample.
    pub fn magnitude(&self) -> f64 {
        match *self {
            Sample::Scalar(value) => value,
            Sample::Vector { magnitude, .. } => magnitude,
        }
    }
}

/// Extremes of the defined cells of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRange {
    Scalar {
        min: f64,
        max: f64,
    },
    Vector {
        u_min: f64,
        u_max: f64,
        v_min: f64,
        v_max: f64,
    },
}

/// Bilinear interpolator over one grid snapshot.
///
/// Immutable after [`GridSampler::build`]; share it behind an `Arc` and
/// query it from any thread.
#[derive(Debug, Clone)]
pub struct GridSampler {
    grid: Arc<GeoGrid>,
    range: Option<ValueRange>,
}

impl GridSampler {
    pub fn build(grid: Arc<GeoGrid>) -> Self {
        let range = compute_range(grid.values());
        let header = grid.header();
        debug!(
            width = header.width,
            height = header.height,
            vector = grid.is_vector(),
            "built grid sampler"
        );
        Self { grid, range }
    }

    pub fn grid(&self) -> &Arc<GeoGrid> {
        &self.grid
    }

    pub fn header(&self) -> &GridHeader {
        self.grid.header()
    }

    pub fn is_vector(&self) -> bool {
        self.grid.is_vector()
    }

    /// Min/max of the defined cells, `None` if every cell is missing.
    pub fn value_range(&self) -> Option<ValueRange> {
        self.range
    }

    /// Fractional lattice indices of a coordinate.
    pub fn lattice_position(&self, lon: f64, lat: f64) -> (f64, f64) {
        let h = self.grid.header();
        let i = (lon - h.lon_origin) / h.lon_step;
        let j = if h.lat_step < 0.0 {
            (h.lat_origin - lat) / -h.lat_step
        } else {
            (lat - h.lat_origin) / h.lat_step
        };
        (i, j)
    }

    /// Bilinear value at (lon, lat).
    ///
    /// `None` when the query is non-finite, when any of the four surrounding
    /// vertices lies outside the grid, or when any of them is missing. The
    /// last row and column are only reachable as the far corner of a cell.
    pub fn interpolate(&self, lon: f64, lat: f64) -> Option<Sample> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }

        let (i, j) = self.lattice_position(lon, lat);
        let (fi, fj) = (i.floor(), j.floor());
        let h = self.grid.header();
        if fi < 0.0 || fj < 0.0 || fi + 1.0 >= h.width as f64 || fj + 1.0 >= h.height as f64 {
            return None;
        }

        let (fi, fj) = (fi as usize, fj as usize);
        let (x, y) = (i - fi as f64, j - fj as f64);

        match self.grid.values() {
            GridValues::Scalar(_) => {
                let g00 = self.grid.scalar_cell(fi, fj)? as f64;
                let g10 = self.grid.scalar_cell(fi + 1, fj)? as f64;
                let g01 = self.grid.scalar_cell(fi, fj + 1)? as f64;
                let g11 = self.grid.scalar_cell(fi + 1, fj + 1)? as f64;
                Some(Sample::Scalar(bilinear(x, y, g00, g10, g01, g11)))
            }
            GridValues::Vector(_) => {
                let g00 = self.grid.vector_cell(fi, fj)?;
                let g10 = self.grid.vector_cell(fi + 1, fj)?;
                let g01 = self.grid.vector_cell(fi, fj + 1)?;
                let g11 = self.grid.vector_cell(fi + 1, fj + 1)?;

                let u = bilinear(
                    x,
                    y,
                    g00[0] as f64,
                    g10[0] as f64,
                    g01[0] as f64,
                    g11[0] as f64,
                );
                let v = bilinear(
                    x,
                    y,
                    g00[1] as f64,
                    g10[1] as f64,
                    g01[1] as f64,
                    g11[1] as f64,
                );
                Some(Sample::Vector {
                    u,
                    v,
                    magnitude: (u * u + v * v).sqrt(),
                })
            }
        }
    }

    /// Scalar value at (lon, lat); `None` for misses and for vector grids.
    pub fn scalar_at(&self, lon: f64, lat: f64) -> Option<f64> {
        match self.interpolate(lon, lat)? {
            Sample::Scalar(value) => Some(value),
            Sample::Vector { .. } => None,
        }
    }

    /// `[u, v, magnitude]` at (lon, lat); `None` for misses and scalar grids.
    pub fn vector_at(&self, lon: f64, lat: f64) -> Option<[f64; 3]> {
        match self.interpolate(lon, lat)? {
            Sample::Vector { u, v, magnitude } => Some([u, v, magnitude]),
            Sample::Scalar(_) => None,
        }
    }
}

fn compute_range(values: &GridValues) -> Option<ValueRange> {
    match values {
        GridValues::Scalar(cells) => {
            let (min, max) = min_max(cells.iter().flatten().map(|&v| v as f64))?;
            Some(ValueRange::Scalar { min, max })
        }
        GridValues::Vector(cells) => {
            let (u_min, u_max) = min_max(cells.iter().flatten().map(|c| c[0] as f64))?;
            let (v_min, v_max) = min_max(cells.iter().flatten().map(|c| c[1] as f64))?;
            Some(ValueRange::Vector {
                u_min,
                u_max,
                v_min,
                v_max,
            })
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::GridHeader;

    fn sampler_3x3() -> GridSampler {
        let header = GridHeader::new(0.0, 10.0, 1.0, -1.0, 3, 3);
        let grid =
            GeoGrid::scalar_dense(header, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
        GridSampler::build(Arc::new(grid))
    }

    #[test]
    fn test_top_left_block_midpoint() {
        assert_eq!(sampler_3x3().scalar_at(0.5, 9.5), Some(3.0));
    }

    #[test]
    fn test_vertex_returns_stored_value() {
        let sampler = sampler_3x3();
        assert_eq!(sampler.scalar_at(0.0, 10.0), Some(1.0));
        assert_eq!(sampler.scalar_at(1.0, 9.0), Some(5.0));
    }

    #[test]
    fn test_last_row_and_column_not_addressable() {
        let sampler = sampler_3x3();
        assert_eq!(sampler.scalar_at(2.0, 9.0), None);
        assert_eq!(sampler.scalar_at(1.0, 8.0), None);
    }

    #[test]
    fn test_outside_and_non_finite() {
        let sampler = sampler_3x3();
        assert_eq!(sampler.scalar_at(-0.1, 9.5), None);
        assert_eq!(sampler.scalar_at(0.5, 10.1), None);
        assert_eq!(sampler.scalar_at(f64::NAN, 9.5), None);
        assert_eq!(sampler.scalar_at(0.5, f64::INFINITY), None);
    }

    #[test]
    fn test_scalar_range() {
        assert_eq!(
            sampler_3x3().value_range(),
            Some(ValueRange::Scalar { min: 1.0, max: 9.0 })
        );
    }

    #[test]
    fn test_positive_lat_step() {
        let header = GridHeader::new(0.0, 0.0, 1.0, 1.0, 2, 2);
        let grid = GeoGrid::scalar_dense(header, &[0.0, 0.0, 10.0, 10.0]).unwrap();
        let sampler = GridSampler::build(Arc::new(grid));
        assert_eq!(sampler.scalar_at(0.5, 0.25), Some(2.5));
    }
}
