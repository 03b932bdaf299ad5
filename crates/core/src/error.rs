//! Domain error model.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub rejected_value: JsonValue,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        rejected_value: impl Into<JsonValue>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rejected_value: rejected_value.into(),
            message: message.into(),
        }
    }
}

/// Domain-level error.
///
/// Every failure the service surfaces falls into one of these categories. The
/// HTTP layer maps each variant to a distinct status; infrastructure errors are
/// folded into `Internal` (or `Conflict` for lost optimistic-concurrency races)
/// before they reach callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input. Carries per-field detail when available.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        violations: Vec<FieldViolation>,
    },

    /// The record exists but is not in a state that allows the operation
    /// (e.g. insufficient stock).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness collision or stale version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unclassified failure. The message is for logs, not for clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            violations: Vec::new(),
        }
    }

    pub fn invalid_fields(violations: Vec<FieldViolation>) -> Self {
        Self::Validation {
            message: "submitted data is not valid".to_string(),
            violations,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Field-level violations, empty for anything but `Validation`.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_fields_keeps_violations() {
        let err = DomainError::invalid_fields(vec![FieldViolation::new(
            "price",
            "-1",
            "price must be greater than 0",
        )]);

        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, "price");
        assert_eq!(err.violations()[0].rejected_value, JsonValue::from("-1"));
    }

    #[test]
    fn non_validation_errors_have_no_violations() {
        assert!(DomainError::not_found("product 1").violations().is_empty());
        assert!(DomainError::invalid_state("insufficient stock").violations().is_empty());
    }

    #[test]
    fn display_includes_category() {
        assert_eq!(
            DomainError::conflict("sku W-1 already exists").to_string(),
            "conflict: sku W-1 already exists"
        );
    }
}
