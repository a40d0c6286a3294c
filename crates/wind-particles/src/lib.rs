//! Wind particle animation on a 2D canvas.
//!
//! [`ProjectedField`] caches, for every screen pixel, how far a particle
//! there moves per frame. [`WindAnimator`] advects a pool of particles
//! through that field and strokes their short trails onto a fading
//! offscreen canvas.

pub mod animator;
pub mod field;
pub mod particle;

pub use animator::{evolve, WindAnimator, WindAnimatorOptions};
pub use field::{velocity_scale_for, FieldParams, FieldVector, ProjectedField, VectorField};
pub use particle::Particle;
