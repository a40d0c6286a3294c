//! Map viewport abstraction.

use tracing::debug;

use crate::{BoundingBox, ViewportEvent, ViewportEvents};

/// The host map as seen by the renderers.
///
/// Pixel coordinates are CSS pixels with the origin at the top-left corner.
/// Map coordinates are whatever the grids use (degrees or projected meters).
pub trait Viewport: Sync {
    /// Pixel size, `None` while the map is not laid out yet.
    fn size(&self) -> Option<(u32, u32)>;

    /// Device pixels per CSS pixel.
    fn pixel_ratio(&self) -> f64 {
        1.0
    }

    /// Map coordinate under a pixel, `None` if the pixel is unprojectable.
    fn coordinate_from_pixel(&self, pixel: [f64; 2]) -> Option<[f64; 2]>;

    /// Pixel position of a map coordinate.
    fn pixel_from_coordinate(&self, coord: [f64; 2]) -> Option<[f64; 2]>;
}

/// Reference viewport: a north-up view with uniform resolution.
#[derive(Debug, Clone)]
pub struct MapView {
    center: [f64; 2],
    resolution: f64,
    size: Option<(u32, u32)>,
    pixel_ratio: f64,
    events: Option<ViewportEvents>,
}

impl MapView {
    /// `resolution` is map units per CSS pixel.
    pub fn new(center: [f64; 2], resolution: f64, size: (u32, u32)) -> Self {
        Self {
            center,
            resolution,
            size: Some(size),
            pixel_ratio: 1.0,
            events: None,
        }
    }

    /// View sized so that `bbox` fits entirely, centered on it.
    pub fn fit(bbox: &BoundingBox, size: (u32, u32)) -> Self {
        let (w, h) = (size.0.max(1) as f64, size.1.max(1) as f64);
        let resolution = (bbox.width() / w).max(bbox.height() / h);
        let resolution = if resolution > 0.0 { resolution } else { 1.0 };
        Self::new(bbox.center(), resolution, size)
    }

    /// A view that has not been laid out.
    pub fn unsized_view() -> Self {
        Self {
            center: [0.0, 0.0],
            resolution: 1.0,
            size: None,
            pixel_ratio: 1.0,
            events: None,
        }
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Attach the hub that receives this view's change notifications.
    pub fn with_events(mut self, events: ViewportEvents) -> Self {
        self.events = Some(events);
        self
    }

    pub fn events(&self) -> Option<&ViewportEvents> {
        self.events.as_ref()
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Extent currently visible, `None` while unsized.
    pub fn extent(&self) -> Option<BoundingBox> {
        let (w, h) = self.size?;
        let half_w = w as f64 / 2.0 * self.resolution;
        let half_h = h as f64 / 2.0 * self.resolution;
        Some(BoundingBox::new(
            self.center[0] - half_w,
            self.center[1] - half_h,
            self.center[0] + half_w,
            self.center[1] + half_h,
        ))
    }

    /// Pan to a new center. Emits move-start then move-end.
    pub fn pan_to(&mut self, center: [f64; 2]) {
        self.emit(ViewportEvent::MoveStart);
        self.center = center;
        debug!(x = center[0], y = center[1], "viewport panned");
        self.emit(ViewportEvent::MoveEnd);
    }

    /// Zoom to a new resolution. Emits move-start then move-end.
    pub fn set_resolution(&mut self, resolution: f64) {
        self.emit(ViewportEvent::MoveStart);
        self.resolution = resolution;
        debug!(resolution, "viewport zoomed");
        self.emit(ViewportEvent::MoveEnd);
    }

    /// Resize the view. Emits resize.
    pub fn set_size(&mut self, size: (u32, u32)) {
        self.size = Some(size);
        debug!(width = size.0, height = size.1, "viewport resized");
        self.emit(ViewportEvent::Resize);
    }

    fn emit(&self, event: ViewportEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

impl Viewport for MapView {
    fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn coordinate_from_pixel(&self, pixel: [f64; 2]) -> Option<[f64; 2]> {
        let (w, h) = self.size?;
        if !pixel[0].is_finite() || !pixel[1].is_finite() {
            return None;
        }
        Some([
            self.center[0] + (pixel[0] - w as f64 / 2.0) * self.resolution,
            self.center[1] - (pixel[1] - h as f64 / 2.0) * self.resolution,
        ])
    }

    fn pixel_from_coordinate(&self, coord: [f64; 2]) -> Option<[f64; 2]> {
        let (w, h) = self.size?;
        if !coord[0].is_finite() || !coord[1].is_finite() || self.resolution == 0.0 {
            return None;
        }
        Some([
            (coord[0] - self.center[0]) / self.resolution + w as f64 / 2.0,
            (self.center[1] - coord[1]) / self.resolution + h as f64 / 2.0,
        ])
    }
}
