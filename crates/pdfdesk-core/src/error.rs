use thiserror::Error;

/// Failure taxonomy for the transform operations.
///
/// Every variant is recoverable: callers surface the message and leave the
/// active document untouched.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Failed to decode PDF: {0}")]
    Decode(String),

    #[error("Failed to decode signature image: {0}")]
    ImageDecode(String),

    #[error("No documents to merge")]
    EmptyInput,

    #[error("Invalid page selection: {0}")]
    InvalidSelection(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}

impl TransformError {
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        TransformError::Decode(err.to_string())
    }

    pub(crate) fn operation(err: impl std::fmt::Display) -> Self {
        TransformError::Operation(err.to_string())
    }
}
