//! Viewport field projector.
//!
//! Rebuilt wholesale whenever the viewport moves or resizes: every `step`
//! pixels the viewport is unprojected, the wind sampled and scaled into a
//! per-frame pixel displacement, and the result stored for the whole
//! `step × step` block. Lookups between rebuilds are then a single index.

use field_common::Viewport;
use field_sampler::GridSampler;
use rand::{Rng, RngCore};
use rayon::prelude::*;
use tracing::debug;

use crate::particle::Particle;

/// Extra attempts [`VectorField::randomize`] makes to land on a defined pixel.
pub const RANDOMIZE_RETRIES: usize = 30;

/// Pixel displacement per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldVector {
    pub dx: f64,
    pub dy: f64,
    /// `None` where the wind is undefined.
    pub magnitude: Option<f64>,
}

impl FieldVector {
    /// Returned for pixels outside the projected area.
    pub const UNDEFINED: FieldVector = FieldVector {
        dx: f64::NAN,
        dy: f64::NAN,
        magnitude: None,
    };

    pub fn new(dx: f64, dy: f64) -> Self {
        Self {
            dx,
            dy,
            magnitude: Some((dx * dx + dy * dy).sqrt()),
        }
    }
}

/// A screen-space vector field particles can be advected through.
pub trait VectorField {
    /// Pixel size of the field.
    fn size(&self) -> (u32, u32);

    /// Displacement at a (fractional) pixel, [`FieldVector::UNDEFINED`]
    /// outside.
    fn field(&self, x: f64, y: f64) -> FieldVector;

    /// Whether the pixel holds a stored sample rather than the outside
    /// sentinel.
    fn is_inside_boundary(&self, x: f64, y: f64) -> bool;

    fn is_defined(&self, x: f64, y: f64) -> bool {
        self.field(x, y).magnitude.is_some()
    }

    /// Move a particle to a random pixel, retrying while the pixel is
    /// undefined. The last attempt is kept even if it never hits a defined
    /// pixel. Returns whether the final position is defined.
    fn randomize(&self, particle: &mut Particle, rng: &mut dyn RngCore) -> bool {
        let (width, height) = self.size();
        let x_max = width.saturating_sub(1) as f64;
        let y_max = height.saturating_sub(1) as f64;

        let mut attempts = 0;
        loop {
            let x = rng.gen::<f64>() * x_max;
            let y = rng.gen::<f64>() * y_max;
            particle.x = x;
            particle.y = y;

            let defined = self.is_defined(x, y);
            if defined || attempts >= RANDOMIZE_RETRIES {
                return defined;
            }
            attempts += 1;
        }
    }
}

/// Projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    /// Multiplier from wind units to pixels per frame.
    pub velocity_scale: f64,
    /// Sampling stride in pixels.
    pub step: usize,
    /// Negate v so that northward wind moves up the screen.
    pub flip_y: bool,
}

/// `height × factor × speed_scale`: taller viewports move particles further.
pub fn velocity_scale_for(height: u32, factor: f64, speed_scale: f64) -> f64 {
    height as f64 * factor * speed_scale
}

/// Dense per-pixel cache of a vector field over one viewport state.
#[derive(Debug, Clone)]
pub struct ProjectedField {
    width: u32,
    height: u32,
    /// Column-major: `x * height + y`. `None` is the outside sentinel.
    cells: Vec<Option<FieldVector>>,
}

impl ProjectedField {
    /// Project `sampler` through `viewport`. `None` while the viewport has
    /// no size.
    pub fn build(
        params: &FieldParams,
        viewport: &dyn Viewport,
        sampler: &GridSampler,
    ) -> Option<ProjectedField> {
        let (width, height) = viewport.size()?;
        let step = params.step.max(1);
        let (w, h) = (width as usize, height as usize);

        let mut cells = vec![None; w * h];
        if h > 0 {
            cells
                .par_chunks_mut(h * step)
                .enumerate()
                .for_each(|(block, columns)| {
                    let x = (block * step) as f64;
                    let column = project_column(params, step, h, x, viewport, sampler);
                    for out in columns.chunks_mut(h) {
                        out.copy_from_slice(&column);
                    }
                });
        }

        debug!(
            width,
            height,
            step,
            velocity_scale = params.velocity_scale,
            defined = cells.iter().filter(|c| c.is_some()).count(),
            "projected wind field"
        );

        Some(ProjectedField {
            width,
            height,
            cells,
        })
    }

    /// Drop the cached cells. Every lookup afterwards is outside.
    pub fn release(&mut self) {
        self.cells = Vec::new();
    }

    fn cell(&self, x: f64, y: f64) -> Option<FieldVector> {
        // half-up rounding to the nearest pixel
        let xi = (x + 0.5).floor();
        let yi = (y + 0.5).floor();
        if !(xi >= 0.0 && yi >= 0.0 && xi < self.width as f64 && yi < self.height as f64) {
            return None;
        }
        let index = xi as usize * self.height as usize + yi as usize;
        self.cells.get(index).copied().flatten()
    }
}

fn project_column(
    params: &FieldParams,
    step: usize,
    height: usize,
    x: f64,
    viewport: &dyn Viewport,
    sampler: &GridSampler,
) -> Vec<Option<FieldVector>> {
    let mut column = vec![None; height];
    for y in (0..height).step_by(step) {
        let value = viewport
            .coordinate_from_pixel([x, y as f64])
            .filter(|c| c[0].is_finite() && c[1].is_finite())
            .and_then(|c| sampler.vector_at(c[0], c[1]))
            .map(|[u, v, _]| {
                let u = u * params.velocity_scale;
                let v = v * params.velocity_scale;
                FieldVector::new(u, if params.flip_y { -v } else { v })
            });

        let end = (y + step).min(height);
        column[y..end].fill(value);
    }
    column
}

impl VectorField for ProjectedField {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn field(&self, x: f64, y: f64) -> FieldVector {
        self.cell(x, y).unwrap_or(FieldVector::UNDEFINED)
    }

    fn is_inside_boundary(&self, x: f64, y: f64) -> bool {
        self.cell(x, y).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::{GeoGrid, GridHeader, MapView};
    use std::sync::Arc;

    fn uniform_sampler(u: f32, v: f32) -> GridSampler {
        let header = GridHeader::new(0.0, 10.0, 1.0, -1.0, 11, 11);
        let grid = GeoGrid::vector(header, vec![Some([u, v]); 121]).unwrap();
        GridSampler::build(Arc::new(grid))
    }

    fn params(velocity_scale: f64) -> FieldParams {
        FieldParams {
            velocity_scale,
            step: 2,
            flip_y: true,
        }
    }

    #[test]
    fn test_velocity_scale_for() {
        assert_eq!(velocity_scale_for(600, 1.0 / 30000.0, 10.0), 0.2);
    }

    #[test]
    fn test_unsized_viewport() {
        let field = ProjectedField::build(
            &params(1.0),
            &MapView::unsized_view(),
            &uniform_sampler(1.0, 1.0),
        );
        assert!(field.is_none());
    }

    #[test]
    fn test_flip_y_and_scale() {
        let view = MapView::new([5.0, 5.0], 0.1, (20, 20));
        let field = ProjectedField::build(&params(2.0), &view, &uniform_sampler(3.0, 4.0)).unwrap();
        let v = field.field(10.0, 10.0);
        assert_eq!(v.dx, 6.0);
        assert_eq!(v.dy, -8.0);
        assert_eq!(v.magnitude, Some(10.0));
    }

    #[test]
    fn test_outside_pixels_are_sentinel() {
        let view = MapView::new([5.0, 5.0], 0.1, (20, 20));
        let field = ProjectedField::build(&params(1.0), &view, &uniform_sampler(1.0, 0.0)).unwrap();
        assert!(!field.is_inside_boundary(-1.0, 5.0));
        assert!(!field.is_inside_boundary(5.0, 20.0));
        let v = field.field(25.0, 5.0);
        assert!(v.dx.is_nan() && v.dy.is_nan() && v.magnitude.is_none());
    }

    #[test]
    fn test_release_clears() {
        let view = MapView::new([5.0, 5.0], 0.1, (20, 20));
        let mut field =
            ProjectedField::build(&params(1.0), &view, &uniform_sampler(1.0, 0.0)).unwrap();
        assert!(field.is_defined(3.0, 3.0));
        field.release();
        assert!(!field.is_defined(3.0, 3.0));
        assert!(!field.is_inside_boundary(3.0, 3.0));
    }

    #[test]
    fn test_odd_size_blocks_are_clipped() {
        let view = MapView::new([5.0, 5.0], 0.1, (7, 5));
        let field = ProjectedField::build(
            &FieldParams {
                velocity_scale: 1.0,
                step: 4,
                flip_y: false,
            },
            &view,
            &uniform_sampler(1.0, 2.0),
        )
        .unwrap();
        assert_eq!(field.size(), (7, 5));
        assert!(field.is_defined(6.0, 4.0));
        assert!((field.field(6.0, 4.0).dy - 2.0).abs() < 1e-9);
    }
}
