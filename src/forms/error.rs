//! Form session error types

use thiserror::Error;

use crate::domain::path::PropertyPath;

#[derive(Debug, Error)]
pub enum FormError {
    /// Path does not name a field of the schema
    #[error("Unknown field: '{0}'")]
    UnknownField(PropertyPath),

    /// Operation needs a different kind of field
    #[error("Field '{path}' is not {expected}")]
    WrongFieldKind { path: PropertyPath, expected: &'static str },

    #[error("Variant {index} is out of range for '{path}' ({count} variants)")]
    InvalidVariant { path: PropertyPath, index: usize, count: usize },

    #[error("'{path}' already has the maximum of {max} items")]
    TooManyItems { path: PropertyPath, max: u64 },

    #[error("'{path}' needs at least {min} items")]
    TooFewItems { path: PropertyPath, min: u64 },

    #[error("Item {index} does not exist in '{path}'")]
    NoSuchItem { path: PropertyPath, index: usize },

    /// Raw input could not be converted for the field
    #[error("Invalid value for '{path}': {reason}")]
    InvalidInput { path: PropertyPath, reason: String },

    #[error("Schema has no properties to render")]
    NoProperties,

    /// Submission failed its rule set
    #[error("{0}")]
    Rejected(String),
}

impl FormError {
    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::UnknownField(_) | Self::NoSuchItem { .. } => StatusCode::NOT_FOUND,
            Self::TooManyItems { .. } | Self::TooFewItems { .. } => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
