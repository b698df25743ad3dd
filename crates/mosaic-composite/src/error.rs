//! Error types for mosaic-composite

use thiserror::Error;

/// Errors that can occur while compositing
#[derive(Debug, Error)]
pub enum CompositeError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] mosaic_core::Error),

    /// An option value failed validation
    #[error("invalid argument `{value}': -{option}")]
    InvalidOption {
        /// Option name
        option: &'static str,
        /// Rejected value
        value: String,
    },
}

impl CompositeError {
    /// Condition name, as recorded in an image's exception record
    pub fn reason(&self) -> &'static str {
        match self {
            CompositeError::Core(e) => e.reason(),
            CompositeError::InvalidOption { .. } => "InvalidArgument",
        }
    }
}

/// Result type for composite operations
pub type CompositeResult<T> = Result<T, CompositeError>;
