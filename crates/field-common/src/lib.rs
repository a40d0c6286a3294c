//! Common types and utilities shared across the field rendering engine.

pub mod bbox;
pub mod error;
pub mod events;
pub mod frame;
pub mod grid;
pub mod viewport;

pub use bbox::BoundingBox;
pub use error::{FieldError, FieldResult};
pub use events::{Subscription, ViewportEvent, ViewportEvents};
pub use frame::{FrameHandle, FrameScheduler, FrameThrottle, ManualScheduler};
pub use grid::{GeoGrid, GridHeader, GridRecord, GridValues, RecordHeader};
pub use viewport::{MapView, Viewport};
