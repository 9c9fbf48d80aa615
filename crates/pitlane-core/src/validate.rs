//! Input validators.
//!
//! Pure assertions invoked before handler logic touches the input. Each
//! raises a ValidationError-family error carrying the offending field and
//! constraint; success returns no value.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use pitlane_types::{AppError, ErrorKind};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex")
});

// RFC-4122 versions 1-5
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$",
    )
    .expect("uuid regex")
});

fn fail(kind: ErrorKind, field: &str, constraint: &str) -> AppError {
    AppError::new(kind, format!("{field}: {constraint}"))
        .with_details(json!({ "field": field, "constraint": constraint }))
}

/// The field must be present and non-empty.
pub fn required(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(fail(ErrorKind::MissingRequiredField, field, "is required")),
    }
}

/// The field must be a string within the given character bounds.
pub fn string(
    field: &str,
    value: &str,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), AppError> {
    let len = value.chars().count();
    if let Some(min) = min {
        if len < min {
            return Err(fail(
                ErrorKind::ValidationError,
                field,
                &format!("must be at least {min} characters"),
            ));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(fail(
                ErrorKind::ValidationError,
                field,
                &format!("must be at most {max} characters"),
            ));
        }
    }
    Ok(())
}

/// The field must look like an email address.
pub fn email(field: &str, value: &str) -> Result<(), AppError> {
    if EMAIL_RE.is_match(value) {
        Ok(())
    } else {
        Err(fail(ErrorKind::InvalidInput, field, "must be a valid email address"))
    }
}

/// The field must be an RFC-4122 UUID (versions 1-5).
pub fn uuid(field: &str, value: &str) -> Result<(), AppError> {
    if UUID_RE.is_match(value) {
        Ok(())
    } else {
        Err(fail(ErrorKind::InvalidInput, field, "must be a valid UUID"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(required("title", Some("Trip")).is_ok());
        let err = required("title", None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredField);
        assert_eq!(err.details.unwrap()["field"], "title");
        assert!(required("title", Some("   ")).is_err());
    }

    #[test]
    fn test_string_bounds() {
        assert!(string("message", "hello", Some(1), Some(4000)).is_ok());
        assert!(string("message", "", Some(1), None).is_err());
        let long = "x".repeat(101);
        let err = string("title", &long, Some(1), Some(100)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }

    #[test]
    fn test_email() {
        assert!(email("email", "a@b.co").is_ok());
        assert!(email("email", "not-an-email").is_err());
        assert!(email("email", "a b@c.co").is_err());
    }

    #[test]
    fn test_uuid() {
        assert!(uuid("chat_id", "8c7e66b1-9d5a-4f7e-8a8b-2f64c2cbb001").is_ok());
        assert!(uuid("chat_id", "1234").is_err());
        // version nibble outside 1-5
        assert!(uuid("chat_id", "8c7e66b1-9d5a-0f7e-8a8b-2f64c2cbb001").is_err());
    }
}
