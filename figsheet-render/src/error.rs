//! Rendering error types.

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Rendering error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Drawing backend failure (including font lookup).
    #[error("drawing error: {0}")]
    Drawing(String),

    /// PDF assembly failure.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// PNG encoding failure.
    #[error("PNG encoding error: {0}")]
    Encode(#[from] image::ImageError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] figsheet_core::Error),

    /// Error from the I/O crate.
    #[error(transparent)]
    IoCrate(#[from] figsheet_io::Error),
}

impl<E> From<DrawingAreaErrorKind<E>> for Error
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        Error::Drawing(e.to_string())
    }
}
