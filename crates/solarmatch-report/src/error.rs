//! Error types for report generation

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to build PDF: {reason}")]
    Pdf { reason: String },

    #[error("Image {index} is referenced by page {page} but was never embedded")]
    MissingImage { page: usize, index: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for ReportError {
    fn from(err: lopdf::Error) -> Self {
        ReportError::Pdf {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
