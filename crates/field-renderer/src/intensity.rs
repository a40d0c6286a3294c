//! Brightness buckets for wind particle strokes.
//!
//! Faster particles are drawn slightly brighter. The palette scales a base
//! color from 235/255 up to full brightness over `ceil(20 / step)` buckets,
//! and [`IntensityPalette::index_for`] maps a speed to its bucket.

use field_common::{FieldError, FieldResult};

use crate::color_scale::{hex_to_rgb, Color};

const MIN_BRIGHTNESS: f64 = 235.0 / 255.0;
const MAX_BRIGHTNESS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IntensityPalette {
    colors: Vec<Color>,
    max_intensity: f64,
}

impl IntensityPalette {
    /// `step` is the brightness step in 8-bit units, `max_intensity` the
    /// speed mapped to the brightest bucket, `base_hex` a `#rrggbb` color.
    pub fn new(step: u32, max_intensity: f64, base_hex: &str) -> FieldResult<Self> {
        if step == 0 {
            return Err(FieldError::invalid_color_scale("intensity step must be positive"));
        }
        if !(max_intensity.is_finite() && max_intensity > 0.0) {
            return Err(FieldError::invalid_color_scale(format!(
                "max intensity must be positive, got {}",
                max_intensity
            )));
        }
        let [r0, g0, b0] = hex_to_rgb(base_hex).ok_or_else(|| {
            FieldError::invalid_color_scale(format!("invalid base color '{}'", base_hex))
        })?;

        let count = (255 - 235 + step - 1) / step;
        let colors = (0..count)
            .map(|i| {
                let t = if count > 1 {
                    i as f64 / (count - 1) as f64
                } else {
                    0.0
                };
                let brightness = MIN_BRIGHTNESS + t * (MAX_BRIGHTNESS - MIN_BRIGHTNESS);
                let scale = |c: u8| (c as f64 * brightness).round() as u8;
                Color::new(scale(r0), scale(g0), scale(b0), 255)
            })
            .collect();

        Ok(Self {
            colors,
            max_intensity,
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn color(&self, index: usize) -> Color {
        self.colors[index.min(self.colors.len() - 1)]
    }

    /// Bucket of a speed: `floor(min(m, max) / max * (len - 1))`.
    pub fn index_for(&self, magnitude: f64) -> usize {
        if !(magnitude > 0.0) {
            return 0;
        }
        let t = magnitude.min(self.max_intensity) / self.max_intensity;
        (t * (self.colors.len() - 1) as f64).floor() as usize
    }
}
