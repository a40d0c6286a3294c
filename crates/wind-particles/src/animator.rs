//! Canvas particle animator.
//!
//! Each frame the offscreen trail canvas is faded (destination-in with
//! alpha 0.97), every particle is advected one step through the projected
//! field, and the moves are stroked as short segments grouped by speed
//! bucket: one path and one stroke per bucket. The trail canvas is then
//! composited onto the host surface.
//!
//! The animator never owns a timer. The host calls [`WindAnimator::on_frame`]
//! when a requested frame fires and [`WindAnimator::draw_frame`] when it
//! repaints.

use std::sync::Arc;

use field_common::{
    FieldResult, FrameHandle, FrameScheduler, FrameThrottle, GridHeader, Subscription,
    Viewport, ViewportEvent, ViewportEvents,
};
use field_renderer::IntensityPalette;
use field_sampler::GridSampler;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tiny_skia::{
    BlendMode, Paint, PathBuilder, Pixmap, PixmapMut, PixmapPaint, Rect, Stroke, Transform,
};
use tracing::{debug, info};

use crate::field::{velocity_scale_for, FieldParams, ProjectedField, VectorField};
use crate::particle::Particle;

pub const MAX_PARTICLE_AGE: f64 = 100.0;
pub const PARTICLE_AGE_INCREMENT: f64 = 0.6;
pub const FRAME_RATE_MS: f64 = 20.0;
pub const PARTICLE_LINE_WIDTH: f64 = 1.5;
pub const INTENSITY_SCALE_STEP: u32 = 2;
pub const FADE_ALPHA: f64 = 0.97;

/// Grid spacing (meters) of the coarse Lambert conformal domain.
const COARSE_GRID_SPACING: f64 = 27000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindAnimatorOptions {
    pub velocity_scale_factor: f64,
    /// Particles per screen pixel.
    pub particle_multiplier: f64,
    /// Speed mapped to the brightest stroke bucket.
    pub max_intensity: f64,
    /// Base stroke color, `#rrggbb`.
    pub color: String,
    pub step: usize,
    pub speed_scale: f64,
    pub flip_y: bool,
    pub frame_interval_ms: f64,
    pub fade_alpha: f64,
    pub line_width: f64,
}

impl Default for WindAnimatorOptions {
    fn default() -> Self {
        Self {
            velocity_scale_factor: 1.0 / 30000.0,
            particle_multiplier: 0.003,
            max_intensity: 17.0,
            color: "#ffffff".to_string(),
            step: 2,
            speed_scale: 10.0,
            flip_y: true,
            frame_interval_ms: FRAME_RATE_MS,
            fade_alpha: FADE_ALPHA,
            line_width: PARTICLE_LINE_WIDTH,
        }
    }
}

impl WindAnimatorOptions {
    /// Tuning for a grid: the coarse 27 km grid moves particles half as
    /// fast and seeds more of them.
    pub fn for_grid(header: &GridHeader) -> Self {
        if header.lon_step == COARSE_GRID_SPACING {
            Self {
                velocity_scale_factor: 1.0 / 60000.0,
                particle_multiplier: 0.005,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }
}

/// Advance every particle one frame.
///
/// Over-age particles are respawned first. A particle on an undefined
/// pixel drifts by any finite raw displacement while inside the field and
/// is marked for respawn outside it. A particle whose target is defined is
/// queued in `buckets` (by speed) for stroking; otherwise it jumps to its
/// target without drawing.
pub fn evolve<F: VectorField + ?Sized>(
    field: &F,
    particles: &mut [Particle],
    buckets: &mut [Vec<usize>],
    palette: &IntensityPalette,
    rng: &mut dyn RngCore,
) {
    for bucket in buckets.iter_mut() {
        bucket.clear();
    }

    for (index, p) in particles.iter_mut().enumerate() {
        if p.age > MAX_PARTICLE_AGE {
            field.randomize(p, rng);
            p.age = 0.0;
        }

        let (x, y) = (p.x, p.y);
        let v = field.field(x, y);

        match v.magnitude {
            None => {
                if field.is_inside_boundary(x, y) {
                    p.x = x + if v.dx.is_finite() { v.dx } else { 0.0 };
                    p.y = y + if v.dy.is_finite() { v.dy } else { 0.0 };
                } else {
                    p.age = MAX_PARTICLE_AGE;
                }
            }
            Some(m) => {
                let xt = x + v.dx;
                let yt = y + v.dy;
                if field.is_defined(xt, yt) {
                    p.xt = xt;
                    p.yt = yt;
                    if let Some(bucket) = buckets.get_mut(palette.index_for(m)) {
                        bucket.push(index);
                    }
                } else {
                    p.x = xt;
                    p.y = yt;
                }
            }
        }

        p.age += PARTICLE_AGE_INCREMENT;
    }
}

/// Stroke queued moves, one path per bucket, and commit them.
fn draw_buckets(
    canvas: &mut Pixmap,
    particles: &mut [Particle],
    buckets: &[Vec<usize>],
    palette: &IntensityPalette,
    line_width: f64,
    transform: Transform,
) {
    let stroke = Stroke {
        width: line_width as f32,
        ..Stroke::default()
    };

    for (i, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }

        let mut pb = PathBuilder::new();
        for &index in bucket {
            let p = &mut particles[index];
            pb.move_to(p.x as f32, p.y as f32);
            pb.line_to(p.xt as f32, p.yt as f32);
            p.x = p.xt;
            p.y = p.yt;
        }

        if let Some(path) = pb.finish() {
            let color = palette.color(i);
            let mut paint = Paint::default();
            paint.set_color_rgba8(color.r, color.g, color.b, color.a);
            paint.anti_alias = true;
            canvas.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }
}

pub struct WindAnimator {
    sampler: Arc<GridSampler>,
    options: WindAnimatorOptions,
    palette: IntensityPalette,
    buckets: Vec<Vec<usize>>,
    particles: Vec<Particle>,
    field: Option<ProjectedField>,
    trail: Option<Pixmap>,
    pixel_ratio: f64,
    throttle: FrameThrottle,
    running: bool,
    subscription: Option<Subscription>,
    pending_frame: Option<FrameHandle>,
    rng: StdRng,
}

impl WindAnimator {
    pub fn new(sampler: Arc<GridSampler>, options: WindAnimatorOptions) -> FieldResult<Self> {
        let palette =
            IntensityPalette::new(INTENSITY_SCALE_STEP, options.max_intensity, &options.color)?;
        let buckets = vec![Vec::new(); palette.len()];
        let throttle = FrameThrottle::new(options.frame_interval_ms);

        Ok(Self {
            sampler,
            options,
            palette,
            buckets,
            particles: Vec::new(),
            field: None,
            trail: None,
            pixel_ratio: 1.0,
            throttle,
            running: false,
            subscription: None,
            pending_frame: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Reproducible particle seeding.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn options(&self) -> &WindAnimatorOptions {
        &self.options
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn field(&self) -> Option<&ProjectedField> {
        self.field.as_ref()
    }

    pub fn trail(&self) -> Option<&Pixmap> {
        self.trail.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    /// Swap in the next time-step and reproject.
    pub fn set_sampler(&mut self, sampler: Arc<GridSampler>, viewport: &dyn Viewport) {
        self.sampler = sampler;
        self.rebuild_field(viewport);
    }

    fn ensure_canvas_size(&mut self, viewport: &dyn Viewport) -> bool {
        let Some((w, h)) = viewport.size() else {
            return false;
        };
        let ratio = viewport.pixel_ratio();
        let target_w = (w as f64 * ratio).round() as u32;
        let target_h = (h as f64 * ratio).round() as u32;

        let current = self.trail.as_ref().map(|t| (t.width(), t.height()));
        if current == Some((target_w, target_h)) && self.pixel_ratio == ratio {
            return false;
        }

        self.pixel_ratio = ratio;
        self.trail = Pixmap::new(target_w, target_h);
        debug!(width = target_w, height = target_h, ratio, "resized trail canvas");
        true
    }

    /// Reproject the field for the current viewport and reseed particles.
    pub fn rebuild_field(&mut self, viewport: &dyn Viewport) {
        self.ensure_canvas_size(viewport);

        let Some((_, height)) = viewport.size() else {
            self.field = None;
            self.particles.clear();
            return;
        };
        let params = FieldParams {
            velocity_scale: velocity_scale_for(
                height,
                self.options.velocity_scale_factor,
                self.options.speed_scale,
            ),
            step: self.options.step,
            flip_y: self.options.flip_y,
        };

        let Some(field) = ProjectedField::build(&params, viewport, &self.sampler) else {
            self.field = None;
            self.particles.clear();
            return;
        };

        let (w, h) = field.size();
        let count = (w as f64 * h as f64 * self.options.particle_multiplier).round() as usize;
        let rng = &mut self.rng;
        self.particles = (0..count)
            .map(|_| {
                let age = (rng.gen::<f64>() * MAX_PARTICLE_AGE).floor();
                let mut p = Particle::new(age);
                field.randomize(&mut p, &mut *rng);
                p.xt = p.x;
                p.yt = p.y;
                p
            })
            .collect();
        self.field = Some(field);

        debug!(particles = count, width = w, height = h, "rebuilt wind field");
    }

    /// Build the field, subscribe to viewport changes and request the
    /// first frame. Does nothing if already running.
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
        self.throttle.reset();

        self.rebuild_field(viewport);
        self.subscription = Some(events.subscribe(&[ViewportEvent::MoveEnd, ViewportEvent::Resize]));
        self.pending_frame = Some(scheduler.request_frame());

        info!(particles = self.particles.len(), "wind animation started");
    }

    /// Frame-clock callback. Applies queued viewport changes, requests the
    /// next frame and returns whether the host should repaint now.
    pub fn on_frame(
        &mut self,
        now_ms: f64,
        viewport: &dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) -> bool {
        if !self.running {
            return false;
        }
        self.pending_frame = None;
        self.apply_viewport_changes(viewport);

        let redraw = self.throttle.ready(now_ms);
        self.pending_frame = Some(scheduler.request_frame());
        redraw
    }

    /// Reproject if a move or resize arrived since the last call.
    fn apply_viewport_changes(&mut self, viewport: &dyn Viewport) -> bool {
        let changed = self
            .subscription
            .as_ref()
            .map(|s| !s.drain().is_empty())
            .unwrap_or(false);
        if changed {
            self.rebuild_field(viewport);
        }
        changed
    }

    /// Cancel the pending frame and unsubscribe.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(handle) = self.pending_frame.take() {
            scheduler.cancel_frame(handle);
        }
        self.subscription = None;
        if self.running {
            info!("wind animation stopped");
        }
        self.running = false;
    }

    /// Fade, advect, stroke and composite one frame onto `target`.
    ///
    /// Viewport changes still queued are applied first, so a repaint right
    /// after a move draws with the new projection.
    pub fn draw_frame(&mut self, viewport: &dyn Viewport, target: &mut PixmapMut<'_>) {
        if !self.running {
            return;
        }
        self.apply_viewport_changes(viewport);
        if self.field.is_none() {
            return;
        }
        self.ensure_canvas_size(viewport);

        let (Some(field), Some(trail)) = (self.field.as_ref(), self.trail.as_mut()) else {
            return;
        };

        if let Some(rect) = Rect::from_xywh(0.0, 0.0, trail.width() as f32, trail.height() as f32) {
            let mut fade = Paint::default();
            let alpha = (self.options.fade_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
            fade.set_color_rgba8(0, 0, 0, alpha);
            fade.blend_mode = BlendMode::DestinationIn;
            trail.fill_rect(rect, &fade, Transform::identity(), None);
        }

        evolve(
            field,
            &mut self.particles,
            &mut self.buckets,
            &self.palette,
            &mut self.rng,
        );

        let ratio = self.pixel_ratio as f32;
        draw_buckets(
            trail,
            &mut self.particles,
            &self.buckets,
            &self.palette,
            self.options.line_width,
            Transform::from_scale(ratio, ratio),
        );

        target.draw_pixmap(
            0,
            0,
            trail.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    /// Erase the accumulated trails.
    pub fn clear_trails(&mut self) {
        if let Some(trail) = self.trail.as_mut() {
            trail.fill(tiny_skia::Color::TRANSPARENT);
        }
    }
}
