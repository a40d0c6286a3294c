//! GPU wind layer kept registered over a map viewport.
//!
//! The simulator renders into a texture covering the wind grid's extent.
//! The host places that texture on screen at [`GpuWindOverlay::placement`].
//! While the map moves the layer is hidden and paused; once the move ends
//! it is re-projected, resized and resumed.

use std::sync::Arc;

use field_common::{
    BoundingBox, FrameHandle, FrameScheduler, Subscription, Viewport, ViewportEvent,
    ViewportEvents,
};
use field_renderer::PaletteConfig;
use tracing::{debug, info};

use crate::context::GpuContext;
use crate::error::GpuResult;
use crate::textures::{ScalarTexture, WindTexture};
use crate::wind_gl::WindGl;

/// Upper bound on simulated particles.
pub const MAX_OVERLAY_PARTICLES: f64 = 65536.0;

const FINE_GRID_SPACING: f64 = 9000.0;

/// Where the output texture sits on screen, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPlacement {
    pub left: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
    pub visible: bool,
}

/// Screen box of `extent`; `None` while the viewport can't project it.
pub fn placement_for(extent: &BoundingBox, viewport: &dyn Viewport) -> Option<CanvasPlacement> {
    let top_left = viewport.pixel_from_coordinate([extent.min_x, extent.max_y])?;
    let bottom_right = viewport.pixel_from_coordinate([extent.max_x, extent.min_y])?;

    let left = top_left[0].min(bottom_right[0]);
    let top = top_left[1].min(bottom_right[1]);
    let width = (bottom_right[0] - top_left[0]).abs().max(1.0) as u32;
    let height = (bottom_right[1] - top_left[1]).abs().max(1.0) as u32;

    Some(CanvasPlacement {
        left,
        top,
        width,
        height,
        visible: true,
    })
}

/// Particles for a wind texture: denser on 9 km grids, capped at
/// [`MAX_OVERLAY_PARTICLES`].
pub fn overlay_particle_count(wind: &WindTexture) -> usize {
    let multiplier = if wind.grid_spacing == FINE_GRID_SPACING {
        1.3
    } else {
        0.9
    };
    let cells = wind.width as f64 * wind.height as f64;
    (cells * multiplier).min(MAX_OVERLAY_PARTICLES) as usize
}

pub struct GpuWindOverlay {
    gl: WindGl,
    extent: BoundingBox,
    placement: Option<CanvasPlacement>,
    subscription: Option<Subscription>,
    pending_frame: Option<FrameHandle>,
    paused: bool,
    running: bool,
}

impl GpuWindOverlay {
    /// Upload the fields, seed particles and pick the color ramp and mode
    /// for `parameter`.
    pub fn new(
        ctx: Arc<GpuContext>,
        extent: BoundingBox,
        wind: &WindTexture,
        scalar: Option<&ScalarTexture>,
        parameter: &str,
        palettes: &PaletteConfig,
    ) -> GpuResult<Self> {
        let mut gl = WindGl::new(ctx, 1, 1)?;
        gl.set_wind(wind);
        gl.set_num_particles(overlay_particle_count(wind));
        if let Some(scalar) = scalar {
            gl.set_scalar(scalar, parameter, palettes);
        }
        gl.set_color_mode(parameter);
        gl.set_color_ramp_for(parameter, palettes);

        info!(
            parameter,
            particles = gl.num_particles(),
            color_mode = ?gl.color_mode(),
            "GPU wind overlay created"
        );

        Ok(Self {
            gl,
            extent,
            placement: None,
            subscription: None,
            pending_frame: None,
            paused: false,
            running: false,
        })
    }

    pub fn gl(&self) -> &WindGl {
        &self.gl
    }

    pub fn gl_mut(&mut self) -> &mut WindGl {
        &mut self.gl
    }

    pub fn extent(&self) -> &BoundingBox {
        &self.extent
    }

    pub fn placement(&self) -> Option<CanvasPlacement> {
        self.placement
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    /// Position the canvas, subscribe to map moves and request the first
    /// frame. Does nothing if already running.
    pub fn start(
        &mut self,
        viewport: &dyn Viewport,
        events: &ViewportEvents,
        scheduler: &mut dyn FrameScheduler,
    ) {
        if self.running {
            return;
        }
        self.running = true;
        self.paused = false;
        self.update_canvas(viewport);
        self.subscription =
            Some(events.subscribe(&[ViewportEvent::MoveStart, ViewportEvent::MoveEnd]));
        self.pending_frame = Some(scheduler.request_frame());
    }

    /// Apply queued map moves. The host calls this whenever the viewport
    /// emits, since no frames fire while the overlay is paused.
    pub fn handle_events(&mut self, viewport: &dyn Viewport, scheduler: &mut dyn FrameScheduler) {
        let Some(events) = self.subscription.as_ref().map(Subscription::drain) else {
            return;
        };
        for event in events {
            match event {
                ViewportEvent::MoveStart => {
                    self.paused = true;
                    if let Some(handle) = self.pending_frame.take() {
                        scheduler.cancel_frame(handle);
                    }
                    if let Some(placement) = self.placement.as_mut() {
                        placement.visible = false;
                    }
                }
                ViewportEvent::MoveEnd => {
                    self.update_canvas(viewport);
                    self.paused = false;
                    if self.pending_frame.is_none() {
                        self.pending_frame = Some(scheduler.request_frame());
                    }
                }
                ViewportEvent::Resize => {}
            }
        }
    }

    /// Frame-clock callback: draws one simulation step and requests the
    /// next frame. Returns whether a frame was drawn.
    pub fn on_frame(
        &mut self,
        viewport: &dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) -> bool {
        if !self.running {
            return false;
        }
        self.pending_frame = None;
        self.handle_events(viewport, scheduler);
        if self.paused {
            return false;
        }

        self.gl.draw();
        if self.pending_frame.is_none() {
            self.pending_frame = Some(scheduler.request_frame());
        }
        true
    }

    /// RGBA bytes of the last drawn frame.
    pub fn read_frame(&self) -> GpuResult<Vec<u8>> {
        self.gl.read_frame()
    }

    /// Cancel the pending frame and unsubscribe.
    pub fn destroy(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(handle) = self.pending_frame.take() {
            scheduler.cancel_frame(handle);
        }
        self.subscription = None;
        if self.running {
            info!("GPU wind overlay destroyed");
        }
        self.running = false;
    }

    fn update_canvas(&mut self, viewport: &dyn Viewport) {
        let Some(placement) = placement_for(&self.extent, viewport) else {
            if let Some(placement) = self.placement.as_mut() {
                placement.visible = false;
            }
            return;
        };

        let ratio = viewport.pixel_ratio();
        let width = ((placement.width as f64 * ratio) as u32).max(1);
        let height = ((placement.height as f64 * ratio) as u32).max(1);
        if self.gl.size() != (width, height) {
            self.gl.resize(width, height);
        }

        debug!(
            left = placement.left,
            top = placement.top,
            width = placement.width,
            height = placement.height,
            "repositioned GPU wind canvas"
        );
        self.placement = Some(placement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::MapView;

    fn wind_texture(width: u32, height: u32, grid_spacing: f64) -> WindTexture {
        WindTexture {
            width,
            height,
            u_min: -1.0,
            u_max: 1.0,
            v_min: -1.0,
            v_max: 1.0,
            grid_spacing,
            pixels: vec![128; (width * height * 4) as usize],
        }
    }

    #[test]
    fn test_placement_covers_projected_extent() {
        let view = MapView::new([10.0, 50.0], 0.5, (200, 100));
        let extent = BoundingBox::new(0.0, 45.0, 20.0, 55.0);
        let placement = placement_for(&extent, &view).unwrap();
        assert_eq!(placement.left, 80.0);
        assert_eq!(placement.top, 40.0);
        assert_eq!((placement.width, placement.height), (40, 20));
        assert!(placement.visible);
    }

    #[test]
    fn test_placement_is_at_least_one_pixel() {
        let view = MapView::new([0.0, 0.0], 1000.0, (100, 100));
        let extent = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let placement = placement_for(&extent, &view).unwrap();
        assert_eq!((placement.width, placement.height), (1, 1));
    }

    #[test]
    fn test_unsized_view_has_no_placement() {
        let extent = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(placement_for(&extent, &MapView::unsized_view()).is_none());
    }

    #[test]
    fn test_particle_count_by_grid_spacing() {
        assert_eq!(overlay_particle_count(&wind_texture(100, 100, 9000.0)), 13000);
        assert_eq!(overlay_particle_count(&wind_texture(100, 100, 27000.0)), 9000);
        assert_eq!(overlay_particle_count(&wind_texture(400, 400, 0.25)), 65536);
    }
}
