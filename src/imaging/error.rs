//! Error taxonomy for the imaging core.
//!
//! Every failure is returned to the immediate caller; nothing in
//! [`imaging`](super) logs and swallows an error.

use super::params::ImageFormat;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Missing capability: {0} support is not available")]
    MissingCapability(ImageFormat),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("File not readable: {}: {source}", path.display())]
    FileNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid image data: {0}")]
    InvalidImageData(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
    #[error("Invalid crop result: {width}x{height}")]
    InvalidCropResult { width: i64, height: i64 },
    #[error("Encoding failed: {0}")]
    EncodingFailure(String),
    #[error("Write failed: {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for imaging operations.
pub type Result<T> = std::result::Result<T, ImagingError>;
