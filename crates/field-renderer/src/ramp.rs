//! 256-texel color ramps.
//!
//! The GPU draw pass colors a particle by turning a normalized value `t`
//! into a texel index `floor(clamp(t, 0, 1) * 255)` and fetching that texel
//! from a 16×16 RGBA texture. [`ColorRamp`] holds those 1024 bytes.

use tracing::debug;

use crate::color_scale::{Color, ColorScale};
use crate::palette::PaletteRange;

/// Texels per side of the ramp texture.
pub const RAMP_SIDE: u32 = 16;

/// Number of texels in a ramp.
pub const RAMP_TEXELS: usize = 256;

/// Default particle gradient, blue through yellow to red.
pub const DEFAULT_RAMP_STOPS: [(f32, &str); 8] = [
    (0.0, "#3288bd"),
    (0.1, "#66c2a5"),
    (0.2, "#abdda4"),
    (0.3, "#e6f598"),
    (0.4, "#fee08b"),
    (0.5, "#fdae61"),
    (0.6, "#f46d43"),
    (1.0, "#d53e4f"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    texels: Vec<u8>,
}

impl ColorRamp {
    fn from_fn(mut color_at: impl FnMut(usize) -> Color) -> Self {
        let mut texels = Vec::with_capacity(RAMP_TEXELS * 4);
        for i in 0..RAMP_TEXELS {
            let c = color_at(i);
            texels.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        Self { texels }
    }

    /// Every texel the same color.
    pub fn solid(color: Color) -> Self {
        Self::from_fn(|_| color)
    }

    /// Sample a color scale at 256 evenly spaced values over `[min, max]`.
    pub fn from_scale(scale: &ColorScale, min: f64, max: f64) -> Self {
        Self::from_fn(|i| {
            let v = min + (i as f64 / 255.0) * (max - min);
            Color::from_rgb(scale.rgb_at(v), 255)
        })
    }

    /// Stepped ramp over the finite extent of `ranges`.
    ///
    /// The domain runs from the first fully bounded range's `min` to the
    /// last fully bounded range's `max`. Each texel takes the color of the
    /// range containing its value, or of the last range when none does.
    /// Without any fully bounded range the ramp is solid red.
    pub fn from_ranges(ranges: &[PaletteRange]) -> Self {
        let Some((min, max)) = ranges_domain(ranges) else {
            debug!("no bounded palette range, using solid red ramp");
            return Self::solid(Color::new(255, 0, 0, 255));
        };

        let fallback = ranges[ranges.len() - 1];
        Self::from_fn(|i| {
            let v = min + (i as f64 / 255.0) * (max - min);
            let range = ranges.iter().find(|r| r.contains(v)).unwrap_or(&fallback);
            Color::from_rgb(range.color, 255)
        })
    }

    /// Linear gradient through `(offset, color)` stops with offsets in `[0, 1]`.
    pub fn from_gradient_stops(stops: &[(f32, Color)]) -> Self {
        let mut stops = stops.to_vec();
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        let Some(&(_, first_color)) = stops.first() else {
            return Self::solid(Color::transparent());
        };

        Self::from_fn(|i| {
            let t = i as f32 / 255.0;
            let upper = stops.iter().position(|(offset, _)| *offset >= t);
            match upper {
                Some(0) => first_color,
                Some(k) => {
                    let (o0, c0) = stops[k - 1];
                    let (o1, c1) = stops[k];
                    let f = if o1 > o0 { (t - o0) / (o1 - o0) } else { 1.0 };
                    lerp_color(c0, c1, f)
                }
                None => stops[stops.len() - 1].1,
            }
        })
    }

    /// The default particle gradient.
    pub fn default_gradient() -> Self {
        let stops: Vec<(f32, Color)> = DEFAULT_RAMP_STOPS
            .iter()
            .filter_map(|(offset, hex)| Color::from_hex(hex).map(|c| (*offset, c)))
            .collect();
        Self::from_gradient_stops(&stops)
    }

    pub fn texel(&self, index: usize) -> Color {
        let i = index.min(RAMP_TEXELS - 1) * 4;
        Color::new(
            self.texels[i],
            self.texels[i + 1],
            self.texels[i + 2],
            self.texels[i + 3],
        )
    }

    /// RGBA bytes, row-major 16×16.
    pub fn as_bytes(&self) -> &[u8] {
        &self.texels
    }
}

/// Value domain a stepped ramp covers: the first fully bounded range's
/// `min` to the last fully bounded range's `max`.
pub fn ranges_domain(ranges: &[PaletteRange]) -> Option<(f64, f64)> {
    let mut finite = ranges.iter().filter(|r| r.is_finite());
    let first = finite.next()?;
    let last = finite.last().unwrap_or(first);
    Some((first.lower(), last.upper()))
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::default_gradient()
    }
}

fn lerp_color(a: Color, b: Color, f: f32) -> Color {
    let mix = |x: u8, y: u8| (x as f32 + f * (y as f32 - x as f32)).round().clamp(0.0, 255.0) as u8;
    Color::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gradient_endpoints() {
        let ramp = ColorRamp::default_gradient();
        assert_eq!(ramp.as_bytes().len(), 1024);
        assert_eq!(ramp.texel(0), Color::new(0x32, 0x88, 0xbd, 255));
        assert_eq!(ramp.texel(255), Color::new(0xd5, 0x3e, 0x4f, 255));
    }

    #[test]
    fn test_no_bounded_range_is_red() {
        let ranges = [PaletteRange {
            min: Some(0.0),
            max: None,
            color: [0, 0, 255],
        }];
        let ramp = ColorRamp::from_ranges(&ranges);
        assert_eq!(ramp.texel(0), Color::new(255, 0, 0, 255));
        assert_eq!(ramp.texel(200), Color::new(255, 0, 0, 255));
        assert_eq!(ColorRamp::from_ranges(&[]), ramp);
    }

    #[test]
    fn test_stepped_ranges() {
        let ranges = [
            PaletteRange { min: Some(0.0), max: Some(1.0), color: [1, 1, 1] },
            PaletteRange { min: Some(1.0), max: Some(2.0), color: [2, 2, 2] },
            PaletteRange { min: Some(2.0), max: None, color: [3, 3, 3] },
        ];
        let ramp = ColorRamp::from_ranges(&ranges);
        assert_eq!(ramp.texel(0).rgb(), [1, 1, 1]);
        assert_eq!(ramp.texel(127).rgb(), [1, 1, 1]);
        assert_eq!(ramp.texel(128).rgb(), [2, 2, 2]);
        // the domain ends at 2.0, which falls in the open-ended range
        assert_eq!(ramp.texel(255).rgb(), [3, 3, 3]);
    }

    #[test]
    fn test_ranges_domain_skips_open_ranges() {
        let ranges = [
            PaletteRange { min: None, max: Some(0.0), color: [0, 0, 0] },
            PaletteRange { min: Some(0.0), max: Some(5.0), color: [1, 1, 1] },
            PaletteRange { min: Some(5.0), max: Some(9.0), color: [2, 2, 2] },
            PaletteRange { min: Some(9.0), max: None, color: [3, 3, 3] },
        ];
        assert_eq!(ranges_domain(&ranges), Some((0.0, 9.0)));
        assert_eq!(ranges_domain(&ranges[..2]), Some((0.0, 5.0)));
        assert_eq!(ranges_domain(&ranges[3..]), None);
    }

    #[test]
    fn test_from_scale_endpoints() {
        let scale = ColorScale::new(vec![(0.0, [0, 0, 0]), (10.0, [255, 255, 255])]).unwrap();
        let ramp = ColorRamp::from_scale(&scale, 0.0, 10.0);
        assert_eq!(ramp.texel(0).rgb(), [0, 0, 0]);
        assert_eq!(ramp.texel(255).rgb(), [255, 255, 255]);
    }
}
