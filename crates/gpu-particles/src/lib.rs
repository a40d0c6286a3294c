//! Shader-driven wind particles on a headless wgpu device.
//!
//! [`WindGl`] keeps particle positions in RGBA8 state textures, advects
//! them through a wind texture in a fragment pass and draws them as points
//! over a fading screen texture. [`GpuWindOverlay`] keeps one simulator
//! registered over a map viewport.

pub mod context;
pub mod encoding;
pub mod error;
pub mod overlay;
pub mod textures;
pub mod wind_gl;

pub use context::GpuContext;
pub use encoding::{decode_position, encode_position, particle_resolution};
pub use error::{GpuError, GpuResult};
pub use overlay::{overlay_particle_count, placement_for, CanvasPlacement, GpuWindOverlay};
pub use textures::{ScalarTexture, WindTexture};
pub use wind_gl::{ColorMode, WindGl, WindGlOptions, WIND_PARAMETER};
