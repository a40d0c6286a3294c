//! Segmented color scales.
//!
//! A scale is an ordered list of `(threshold, rgb)` breakpoints. Values
//! between two thresholds are linearly interpolated; values outside the
//! covered range clamp to the first or last color.
//!
//! Channels are truncated with `floor`, not rounded: halfway between
//! black and white is `[127, 127, 127]`.

use field_common::{FieldError, FieldResult};

/// 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn from_rgb(rgb: Rgb, a: u8) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2], a)
    }

    /// Parse `#rrggbb` into an opaque color.
    pub fn from_hex(hex: &str) -> Option<Self> {
        hex_to_rgb(hex).map(|rgb| Self::from_rgb(rgb, 255))
    }

    pub fn rgb(&self) -> Rgb {
        [self.r, self.g, self.b]
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some([r, g, b])
}

/// Piecewise-linear color scale over ascending thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    segments: Vec<(f64, Rgb)>,
}

impl ColorScale {
    /// Build a scale from breakpoints sorted by ascending threshold.
    ///
    /// Equal consecutive thresholds are allowed; such a zero-width segment
    /// yields its start color.
    pub fn new(segments: Vec<(f64, Rgb)>) -> FieldResult<Self> {
        if segments.is_empty() {
            return Err(FieldError::invalid_color_scale("scale has no segments"));
        }
        if let Some((t, _)) = segments.iter().find(|(t, _)| !t.is_finite()) {
            return Err(FieldError::invalid_color_scale(format!(
                "threshold {} is not finite",
                t
            )));
        }
        if let Some(pair) = segments.windows(2).find(|w| w[1].0 < w[0].0) {
            return Err(FieldError::invalid_color_scale(format!(
                "thresholds must ascend, {} follows {}",
                pair[1].0, pair[0].0
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[(f64, Rgb)] {
        &self.segments
    }

    /// Lowest and highest threshold.
    pub fn domain(&self) -> (f64, f64) {
        let first = self.segments[0].0;
        let last = self.segments[self.segments.len() - 1].0;
        (first, last)
    }

    pub fn rgb_at(&self, value: f64) -> Rgb {
        let n = self.segments.len();
        if n == 1 || value.is_nan() {
            return self.segments[0].1;
        }

        // First pair whose upper threshold reaches the value; the last pair
        // takes everything above.
        let last = n - 2;
        let i = (0..last)
            .find(|&i| value <= self.segments[i + 1].0)
            .unwrap_or(last);

        let (low, start) = self.segments[i];
        let (high, end) = self.segments[i + 1];
        if high == low {
            return start;
        }

        let t = (value.clamp(low, high) - low) / (high - low);
        let channel = |k: usize| {
            let s = start[k] as f64;
            let e = end[k] as f64;
            (s + t * (e - s)).floor().clamp(0.0, 255.0) as u8
        };
        [channel(0), channel(1), channel(2)]
    }

    /// Color with an opacity in `[0, 1]`.
    pub fn rgba_at(&self, value: f64, alpha: f64) -> Color {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::from_rgb(self.rgb_at(value), a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black_white() -> ColorScale {
        ColorScale::new(vec![(0.0, [0, 0, 0]), (10.0, [255, 255, 255])]).unwrap()
    }

    #[test]
    fn test_midpoint_floors() {
        assert_eq!(black_white().rgb_at(5.0), [127, 127, 127]);
    }

    #[test]
    fn test_clamps_both_ends() {
        let scale = black_white();
        assert_eq!(scale.rgb_at(-100.0), [0, 0, 0]);
        assert_eq!(scale.rgb_at(1e9), [255, 255, 255]);
    }

    #[test]
    fn test_thresholds_hit_their_colors() {
        let scale = ColorScale::new(vec![
            (0.0, [10, 20, 30]),
            (5.0, [200, 100, 50]),
            (7.0, [0, 255, 0]),
            (12.0, [9, 9, 9]),
        ])
        .unwrap();
        for (t, rgb) in scale.segments().to_vec() {
            assert_eq!(scale.rgb_at(t), rgb);
        }
    }

    #[test]
    fn test_single_segment_is_constant() {
        let scale = ColorScale::new(vec![(3.0, [1, 2, 3])]).unwrap();
        assert_eq!(scale.rgb_at(-5.0), [1, 2, 3]);
        assert_eq!(scale.rgb_at(50.0), [1, 2, 3]);
    }

    #[test]
    fn test_degenerate_segment_returns_start() {
        let scale = ColorScale::new(vec![
            (0.0, [0, 0, 0]),
            (0.0, [255, 0, 0]),
            (10.0, [255, 255, 255]),
        ])
        .unwrap();
        assert_eq!(scale.rgb_at(0.0), [0, 0, 0]);
    }

    #[test]
    fn test_nan_maps_to_first_color() {
        assert_eq!(black_white().rgb_at(f64::NAN), [0, 0, 0]);
    }

    #[test]
    fn test_rejects_empty_and_unsorted() {
        assert!(matches!(
            ColorScale::new(vec![]),
            Err(FieldError::InvalidColorScale(_))
        ));
        assert!(ColorScale::new(vec![(5.0, [0, 0, 0]), (1.0, [0, 0, 0])]).is_err());
        assert!(ColorScale::new(vec![(f64::NAN, [0, 0, 0])]).is_err());
    }

    #[test]
    fn test_rgba_alpha() {
        assert_eq!(black_white().rgba_at(10.0, 0.8), Color::new(255, 255, 255, 204));
    }

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#3288bd"), Some([0x32, 0x88, 0xbd]));
        assert_eq!(hex_to_rgb("ffffff"), Some([255, 255, 255]));
        assert_eq!(hex_to_rgb("#fff"), None);
        assert_eq!(hex_to_rgb("#gg0000"), None);
    }
}
