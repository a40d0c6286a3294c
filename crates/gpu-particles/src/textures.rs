//! CPU-side field images for upload.
//!
//! The simulator consumes fields as RGBA8 images with rows ordered north
//! to south, so texture `v = 0` is the northern edge. Wind components are
//! normalized into `[u_min, u_max]` / `[v_min, v_max]` and decoded in the
//! shaders with `mix(min, max, texel.rg)`.

use field_common::{FieldError, GridHeader};
use field_sampler::{GridSampler, ValueRange};
use tracing::debug;

use crate::error::GpuResult;

fn normalize(value: f64, min: f64, max: f64) -> u8 {
    let span = max - min;
    let t = if span > 0.0 { (value - min) / span } else { 0.0 };
    (t.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Grid row shown at image row `row`.
fn source_row(header: &GridHeader, row: usize) -> usize {
    if header.lat_step < 0.0 {
        row
    } else {
        header.height - 1 - row
    }
}

/// Wind image: R = u, G = v, B = 0, A = 255.
#[derive(Debug, Clone, PartialEq)]
pub struct WindTexture {
    pub width: u32,
    pub height: u32,
    pub u_min: f32,
    pub u_max: f32,
    pub v_min: f32,
    pub v_max: f32,
    /// Grid spacing along x, in grid units.
    pub grid_spacing: f64,
    pub pixels: Vec<u8>,
}

impl WindTexture {
    /// Encode a vector grid. Missing cells are stored as calm wind.
    pub fn from_sampler(sampler: &GridSampler) -> GpuResult<Self> {
        let Some(ValueRange::Vector {
            u_min,
            u_max,
            v_min,
            v_max,
        }) = sampler.value_range()
        else {
            return Err(FieldError::invalid_grid(
                "wind texture needs a vector grid with at least one defined cell",
            )
            .into());
        };

        let grid = sampler.grid();
        let header = *grid.header();
        let mut pixels = Vec::with_capacity(header.len() * 4);
        for row in 0..header.height {
            let j = source_row(&header, row);
            for i in 0..header.width {
                let [u, v] = grid.vector_cell(i, j).unwrap_or([0.0, 0.0]);
                pixels.extend_from_slice(&[
                    normalize(u as f64, u_min, u_max),
                    normalize(v as f64, v_min, v_max),
                    0,
                    255,
                ]);
            }
        }

        debug!(
            width = header.width,
            height = header.height,
            u_min,
            u_max,
            v_min,
            v_max,
            "encoded wind texture"
        );

        Ok(Self {
            width: header.width as u32,
            height: header.height as u32,
            u_min: u_min as f32,
            u_max: u_max as f32,
            v_min: v_min as f32,
            v_max: v_max as f32,
            grid_spacing: header.lon_step.abs(),
            pixels,
        })
    }

    /// Decoded `(u, v)` of texel `(x, y)`.
    pub fn velocity_at(&self, x: u32, y: u32) -> Option<[f32; 2]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let t = |b: u8| b as f32 / 255.0;
        Some([
            self.u_min + t(self.pixels[i]) * (self.u_max - self.u_min),
            self.v_min + t(self.pixels[i + 1]) * (self.v_max - self.v_min),
        ])
    }
}

/// Scalar image normalized to a value domain: R = G = B = t, A = 255, with
/// missing cells fully transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarTexture {
    pub width: u32,
    pub height: u32,
    pub min: f64,
    pub max: f64,
    pub pixels: Vec<u8>,
}

impl ScalarTexture {
    /// Encode a scalar grid (or the speed of a vector grid) against
    /// `domain`, usually the color ramp's domain. Without a domain the
    /// grid's own range is used.
    pub fn from_sampler(sampler: &GridSampler, domain: Option<(f64, f64)>) -> GpuResult<Self> {
        let (min, max) = match (domain, sampler.value_range()) {
            (Some(domain), _) => domain,
            (None, Some(ValueRange::Scalar { min, max })) => (min, max),
            (None, Some(ValueRange::Vector { u_min, u_max, v_min, v_max })) => {
                let u = u_min.abs().max(u_max.abs());
                let v = v_min.abs().max(v_max.abs());
                (0.0, u.hypot(v))
            }
            (None, None) => {
                return Err(FieldError::invalid_grid(
                    "scalar texture needs at least one defined cell",
                )
                .into())
            }
        };

        let grid = sampler.grid();
        let header = *grid.header();
        let mut pixels = Vec::with_capacity(header.len() * 4);
        for row in 0..header.height {
            let j = source_row(&header, row);
            for i in 0..header.width {
                let value = if grid.is_vector() {
                    grid.vector_cell(i, j).map(|[u, v]| (u as f64).hypot(v as f64))
                } else {
                    grid.scalar_cell(i, j).map(f64::from)
                };
                match value {
                    Some(value) => {
                        let t = normalize(value, min, max);
                        pixels.extend_from_slice(&[t, t, t, 255]);
                    }
                    None => pixels.extend_from_slice(&[0, 0, 0, 0]),
                }
            }
        }

        debug!(width = header.width, height = header.height, min, max, "encoded scalar texture");

        Ok(Self {
            width: header.width as u32,
            height: header.height as u32,
            min,
            max,
            pixels,
        })
    }
}
