//! Boundary validation shared by all record types.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@,;]+@[^\s@,;]+\.[^\s@,;]+$").expect("valid email regex")
});
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").expect("valid date regex")
});

/// Record validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    Blank(&'static str),
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Date is not `YYYY-MM-DD`.
    InvalidDate { field: &'static str, value: String },
    /// Numeric field outside its accepted range.
    OutOfRange { field: &'static str, details: String },
    /// List field exceeds its maximum length.
    TooMany { field: &'static str, max: usize },
    /// Password shorter than the provider minimum.
    WeakPassword { min_len: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::InvalidDate { field, value } => {
                write!(f, "{field} must be a YYYY-MM-DD date, got `{value}`")
            }
            Self::OutOfRange { field, details } => write!(f, "{field} is out of range: {details}"),
            Self::TooMany { field, max } => write!(f, "{field} accepts at most {max} entries"),
            Self::WeakPassword { min_len } => {
                write!(f, "password must be at least {min_len} characters")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims and lowercases an email, rejecting values that are not addresses.
pub fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let normalized = value.trim().to_lowercase();
    if EMAIL_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidEmail(value.trim().to_string()))
    }
}

/// Returns the trimmed value or `Blank(field)`.
pub fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Blank(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Checks a calendar date in `YYYY-MM-DD` form.
pub fn validate_date(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if DATE_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate {
            field,
            value: value.to_string(),
        })
    }
}

pub fn validate_optional_date(
    field: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => validate_date(field, value),
        None => Ok(()),
    }
}

/// Checks a money amount: finite and not negative.
pub fn validate_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            details: format!("expected a non-negative amount, got {value}"),
        })
    }
}

/// Maps blank optional text to `None`, trimming otherwise.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
