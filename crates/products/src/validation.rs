//! Input limits and a small violation collector.

use serde_json::Value as JsonValue;

use stockroom_core::{DomainError, DomainResult, FieldViolation};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const CATEGORY_MAX_CHARS: usize = 50;
pub const SKU_MAX_CHARS: usize = 20;

/// Collects every field problem of one payload so callers see all of them at once.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, rejected: impl Into<JsonValue>, message: impl Into<String>) {
        self.0.push(FieldViolation::new(field, rejected, message));
    }

    pub fn check_len(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let chars = value.chars().count();
        if chars < min || chars > max {
            let message = if min == 0 {
                format!("{field} must be at most {max} characters")
            } else {
                format!("{field} must be between {min} and {max} characters")
            };
            self.push(field, value, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> DomainResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::invalid_fields(self.0))
        }
    }
}

/// Stock adjustments must move at least one unit.
pub fn positive_quantity(quantity: i64) -> DomainResult<u32> {
    if quantity <= 0 {
        return Err(DomainError::Validation {
            message: "quantity must be greater than 0".to_string(),
            violations: vec![FieldViolation::new(
                "quantity",
                quantity,
                "quantity must be greater than 0",
            )],
        });
    }
    u32::try_from(quantity).map_err(|_| {
        DomainError::Validation {
            message: format!("quantity must be at most {}", u32::MAX),
            violations: vec![FieldViolation::new(
                "quantity",
                quantity,
                format!("quantity must be at most {}", u32::MAX),
            )],
        }
    })
}

/// Blank optional text collapses to `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_quantity_rejects_zero_and_negative() {
        assert!(positive_quantity(0).is_err());
        assert!(positive_quantity(-5).is_err());
        assert_eq!(positive_quantity(5).unwrap(), 5);
    }

    #[test]
    fn positive_quantity_reports_field() {
        let err = positive_quantity(-1).unwrap_err();
        assert_eq!(err.violations()[0].field, "quantity");
    }

    #[test]
    fn length_check_counts_chars_not_bytes() {
        let mut v = Violations::new();
        v.check_len("name", "éé", NAME_MIN_CHARS, NAME_MAX_CHARS);
        assert!(v.is_empty());

        v.check_len("name", "x", NAME_MIN_CHARS, NAME_MAX_CHARS);
        assert!(!v.is_empty());
    }

    #[test]
    fn blank_text_is_none() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" Tools ")), Some("Tools".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
