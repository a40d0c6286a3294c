//! GPU error types.

use field_common::FieldError;
use thiserror::Error;

pub type GpuResult<T> = Result<T, GpuError>;

/// Failures of the GPU path. Shader and pipeline errors are fatal at
/// construction: there is no fallback renderer once GPU mode is chosen.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    RequestDevice(String),

    #[error("Failed to compile {program} shader: {message}")]
    ShaderCompile { program: String, message: String },

    #[error("Failed to link {program} pipeline: {message}")]
    ProgramLink { program: String, message: String },

    #[error("Texture readback failed: {0}")]
    Readback(String),

    #[error(transparent)]
    Field(#[from] FieldError),
}
