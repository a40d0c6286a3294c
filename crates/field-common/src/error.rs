//! Error types for the field engine.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

/// Construction-level failures.
///
/// Sampling-level misses are never errors: they surface as `None` or as
/// the projected field's sentinel vector and are skipped by the renderers.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid color scale: {0}")]
    InvalidColorScale(String),

    #[error("Invalid palette configuration: {0}")]
    InvalidPalette(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldError {
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    pub fn invalid_color_scale(msg: impl Into<String>) -> Self {
        Self::InvalidColorScale(msg.into())
    }

    pub fn invalid_palette(msg: impl Into<String>) -> Self {
        Self::InvalidPalette(msg.into())
    }
}
