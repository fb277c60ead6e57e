//! Validation errors raised before work is queued.

use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Fast-start progress ({fast_start}) must be lower than fast-end progress ({fast_end})")]
    ProgressPhasesOverlap { fast_start: f64, fast_end: f64 },

    #[error("Invalid field {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Unknown element: {0}")]
    UnknownElement(String),

    #[error("Alternative index {index} out of range for axis {axis} ({count} alternatives)")]
    IndexOutOfRange { axis: String, index: u32, count: u32 },
}

impl ValidationError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
