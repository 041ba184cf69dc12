//! Input validation for group settings.

use std::fmt;

use chrono_tz::Tz;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Unknown IANA timezone name.
    InvalidTimezone(String),
    /// Calculation method outside the time source's documented range.
    MethodOutOfRange { method: i64, max: i64 },
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidTimezone(name) => {
                write!(f, "Unknown timezone: {}", name)
            }
            ValidationError::MethodOutOfRange { method, max } => {
                write!(f, "Calculation method {} out of range (0..={})", method, max)
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for city and country names.
pub const MAX_PLACE_LENGTH: usize = 100;

/// Highest calculation-method id accepted by the time source.
pub const MAX_CALCULATION_METHOD: i64 = 23;

/// Validate a city or country name (non-empty, bounded length).
pub fn validate_place(field: &str, value: &str) -> Result<(), ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    if value.len() > MAX_PLACE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_PLACE_LENGTH,
            actual: value.len(),
        });
    }

    Ok(())
}

/// Validate an IANA timezone name (e.g., "Africa/Cairo").
///
/// The name must resolve in the bundled tz database; the scheduler converts
/// group-local instants through it on every rebuild, so a name that does not
/// parse here would poison every cycle for the group.
pub fn validate_timezone(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty("timezone".to_string()));
    }

    name.parse::<Tz>()
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidTimezone(name.to_string()))
}

/// Validate a calculation-method id.
pub fn validate_method(method: i64) -> Result<(), ValidationError> {
    if !(0..=MAX_CALCULATION_METHOD).contains(&method) {
        return Err(ValidationError::MethodOutOfRange {
            method,
            max: MAX_CALCULATION_METHOD,
        });
    }

    Ok(())
}
