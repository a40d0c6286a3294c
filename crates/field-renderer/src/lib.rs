//! Color mapping and raster output for gridded fields.
//!
//! - [`color_scale`]: piecewise-linear value → color scales
//! - [`ramp`]: 256-texel color ramps laid out for GPU upload
//! - [`intensity`]: brightness buckets for particle strokes
//! - [`palette`]: per-parameter palette configuration
//! - [`scalar`]: the canvas scalar field renderer
//! - [`png`]: PNG encoding of rendered frames

pub mod color_scale;
pub mod intensity;
pub mod palette;
pub mod png;
pub mod ramp;
pub mod scalar;

pub use color_scale::{hex_to_rgb, Color, ColorScale, Rgb};
pub use intensity::IntensityPalette;
pub use palette::{PaletteConfig, PaletteRange, ParameterPalette};
pub use ramp::{ranges_domain, ColorRamp};
pub use scalar::{ScalarRenderOptions, ScalarRenderer};
