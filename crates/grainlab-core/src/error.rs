//! Error types for the film grain pipeline.

use thiserror::Error;

/// Errors produced by [`crate::process::process`] and the validation layer
/// feeding it.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Settings failed validation (ISO range, unknown film type, non-RGBA
    /// buffer length, non-positive dimensions).
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Width or height was zero; there is no image to process.
    #[error("degenerate image: width and height must both be positive")]
    DegenerateImage,

    /// An internal invariant was violated. Only raised by debug assertions;
    /// seeing this in a release build indicates a bug in the library.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolated(String),
}

/// Errors from the ambient PNG convenience wrapper. Distinct from
/// [`ProcessError`]; never returned by `process` itself.
#[derive(Debug, Error)]
pub enum PngError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("png decode error: {0}")]
    Decode(#[from] png::DecodingError),

    #[error("png encode error: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("unsupported png color format: expected 8-bit RGBA, got {0:?}/{1:?}")]
    UnsupportedFormat(png::ColorType, png::BitDepth),
}
