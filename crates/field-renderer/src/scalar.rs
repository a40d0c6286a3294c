//! Canvas scalar field renderer.
//!
//! Paints a scalar grid as a mosaic of `step × step` blocks: every `step`
//! CSS pixels the viewport is unprojected, the grid sampled and the block
//! filled with the color-scale color at the configured opacity. Blocks are
//! drawn into an offscreen pixmap at device resolution, then composited
//! onto the caller's surface with source-over.

use std::sync::Arc;

use field_common::Viewport;
use field_sampler::GridSampler;
use serde::{Deserialize, Serialize};
use tiny_skia::{Paint, Pixmap, PixmapMut, PixmapPaint, Rect, Transform};
use tracing::debug;

use crate::color_scale::ColorScale;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalarRenderOptions {
    /// Block opacity in `[0, 1]`.
    pub alpha: f64,
    /// Block size in CSS pixels.
    pub step: u32,
}

impl Default for ScalarRenderOptions {
    fn default() -> Self {
        Self {
            alpha: 0.8,
            step: 4,
        }
    }
}

pub struct ScalarRenderer {
    sampler: Arc<GridSampler>,
    scale: ColorScale,
    options: ScalarRenderOptions,
    canvas: Option<Pixmap>,
    pixel_ratio: f64,
}

impl ScalarRenderer {
    pub fn new(sampler: Arc<GridSampler>, scale: ColorScale, options: ScalarRenderOptions) -> Self {
        Self {
            sampler,
            scale,
            options,
            canvas: None,
            pixel_ratio: 1.0,
        }
    }

    pub fn options(&self) -> &ScalarRenderOptions {
        &self.options
    }

    /// Swap in the next time-step.
    pub fn set_sampler(&mut self, sampler: Arc<GridSampler>) {
        self.sampler = sampler;
    }

    pub fn set_color_scale(&mut self, scale: ColorScale) {
        self.scale = scale;
    }

    /// Offscreen canvas size in device pixels, once a frame was drawn.
    pub fn canvas_size(&self) -> Option<(u32, u32)> {
        self.canvas.as_ref().map(|c| (c.width(), c.height()))
    }

    /// Resize the offscreen canvas if the viewport size or pixel ratio
    /// changed. Returns whether it was reallocated.
    fn ensure_canvas_size(&mut self, width: u32, height: u32, ratio: f64) -> bool {
        let target_w = (width as f64 * ratio).round() as u32;
        let target_h = (height as f64 * ratio).round() as u32;

        let unchanged = self.canvas_size() == Some((target_w, target_h)) && self.pixel_ratio == ratio;
        if unchanged {
            return false;
        }

        self.pixel_ratio = ratio;
        self.canvas = Pixmap::new(target_w, target_h);
        debug!(
            width = target_w,
            height = target_h,
            ratio,
            "resized scalar canvas"
        );
        true
    }

    /// Render one frame and composite it onto `target`.
    ///
    /// Vector grids are painted by speed. Does nothing while the viewport
    /// has no size.
    pub fn draw_frame(&mut self, viewport: &dyn Viewport, target: &mut PixmapMut<'_>) {
        let Some((width, height)) = viewport.size() else {
            return;
        };
        let ratio = viewport.pixel_ratio();
        self.ensure_canvas_size(width, height, ratio);

        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        canvas.fill(tiny_skia::Color::TRANSPARENT);

        let transform = Transform::from_scale(ratio as f32, ratio as f32);
        let mut paint = Paint {
            anti_alias: false,
            ..Paint::default()
        };
        let step = self.options.step.max(1);

        let mut painted = 0usize;
        for y in (0..height).step_by(step as usize) {
            for x in (0..width).step_by(step as usize) {
                let Some(coord) = viewport.coordinate_from_pixel([x as f64, y as f64]) else {
                    continue;
                };
                let Some(sample) = self.sampler.interpolate(coord[0], coord[1]) else {
                    continue;
                };

                let color = self.scale.rgba_at(sample.magnitude(), self.options.alpha);
                paint.set_color_rgba8(color.r, color.g, color.b, color.a);
                if let Some(rect) = Rect::from_xywh(x as f32, y as f32, step as f32, step as f32) {
                    canvas.fill_rect(rect, &paint, transform, None);
                    painted += 1;
                }
            }
        }

        target.draw_pixmap(
            0,
            0,
            canvas.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        debug!(blocks = painted, "drew scalar frame");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::{GeoGrid, GridHeader, MapView};

    fn renderer(options: ScalarRenderOptions) -> ScalarRenderer {
        let header = GridHeader::new(0.0, 10.0, 1.0, -1.0, 11, 11);
        let grid = GeoGrid::scalar_dense(header, &vec![5.0; 121]).unwrap();
        let scale = ColorScale::new(vec![(0.0, [0, 0, 0]), (10.0, [255, 255, 255])]).unwrap();
        ScalarRenderer::new(Arc::new(GridSampler::build(Arc::new(grid))), scale, options)
    }

    #[test]
    fn test_canvas_follows_pixel_ratio() {
        let mut r = renderer(ScalarRenderOptions::default());
        let view = MapView::new([5.0, 5.0], 0.5, (20, 10)).with_pixel_ratio(2.0);
        let mut target = Pixmap::new(40, 20).unwrap();
        r.draw_frame(&view, &mut target.as_mut());
        assert_eq!(r.canvas_size(), Some((40, 20)));
    }

    #[test]
    fn test_unsized_viewport_draws_nothing() {
        let mut r = renderer(ScalarRenderOptions::default());
        let mut target = Pixmap::new(4, 4).unwrap();
        r.draw_frame(&MapView::unsized_view(), &mut target.as_mut());
        assert!(r.canvas_size().is_none());
        assert!(target.pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn test_blocks_use_configured_alpha() {
        let mut r = renderer(ScalarRenderOptions { alpha: 0.8, step: 2 });
        let view = MapView::new([5.0, 5.0], 0.25, (8, 8));
        let mut target = Pixmap::new(8, 8).unwrap();
        r.draw_frame(&view, &mut target.as_mut());
        let pixel = target.pixel(3, 3).unwrap();
        assert_eq!(pixel.alpha(), 204);
    }
}
