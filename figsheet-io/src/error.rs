//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TIFF decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Error from the general-purpose image decoder.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Recognized file type without a decoder.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoded data does not form a usable 2-D plane.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Persisted report selection is incomplete.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The user declined to supply required input.
    #[error("operation cancelled")]
    Cancelled,

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] figsheet_core::Error),
}
