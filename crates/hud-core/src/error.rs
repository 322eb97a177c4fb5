//! Domain-specific error types following panic-free policy.

use thiserror::Error;

use crate::EventKind;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Event payload could not be serialized into a frame
    #[error("Failed to serialize {kind} event: {reason}")]
    Serialize { kind: EventKind, reason: String },

    /// Invalid field value
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidFieldValue {
        field: String,
        value: String,
        expected: String,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
