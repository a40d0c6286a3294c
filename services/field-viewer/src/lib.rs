//! Headless viewer: renders wind and scalar fields to PNG frames with
//! either the canvas animator or the GPU simulator.

pub mod config;
pub mod render;

pub use config::ViewerConfig;
pub use render::{run, Fields, RenderJob, RenderMode};
