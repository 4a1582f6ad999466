//! Error types for record document parsing.

use thiserror::Error;

/// Errors that can occur while reading a baseline, import, or saved document.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Content is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON with a shape that is neither a marker array nor a
    /// `{markers, zones}` object
    #[error("Invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural problem
        message: String,
    },
}

impl FormatError {
    /// Create an invalid structure error with a message.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }
}
