//! Bilinear sampling of georeferenced grids.
//!
//! [`GridSampler`] wraps an immutable [`GeoGrid`](field_common::GeoGrid)
//! and answers "what is the field value at this map coordinate?" for the
//! renderers and the particle field projector. Misses (outside the grid,
//! a missing corner, a non-finite query) are `None`, never errors.

pub mod bilinear;
pub mod sampler;

pub use bilinear::bilinear;
pub use sampler::{GridSampler, Sample, ValueRange};
