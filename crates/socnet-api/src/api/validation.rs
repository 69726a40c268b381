// Input validation for user APIs
//
// Limits mirror the `users` column widths so that bad input is a 400
// instead of a database error.

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use super::common::ApiError;

// =============================================================================
// Limits
// =============================================================================

pub const MIN_PASSWORD_CHARS: usize = 8;

/// Width of `first_name`, `second_name` and `city`
pub const MAX_NAME_CHARS: usize = 50;

pub const BIRTHDATE_FORMAT: &str = "%Y-%m-%d";

/// Registered users must be born in this range (inclusive)
pub const MIN_BIRTH_YEAR: i32 = 1900;
pub const MAX_BIRTH_YEAR: i32 = 2007;

// =============================================================================
// Validation Functions
// =============================================================================

pub fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        tracing::warn!(id = raw, "Request param 'id' is not a UUID");
        ApiError::bad_request("request param 'id' is not a UUID")
    })
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::bad_request(format!(
            "request param 'password' should contain at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn parse_birthdate(raw: &str) -> Result<NaiveDate, ApiError> {
    let invalid = || ApiError::bad_request("request param 'birthdate' is invalid");

    let date = NaiveDate::parse_from_str(raw, BIRTHDATE_FORMAT).map_err(|_| invalid())?;
    if !(MIN_BIRTH_YEAR..=MAX_BIRTH_YEAR).contains(&date.year()) {
        return Err(invalid());
    }
    Ok(date)
}

pub fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.chars().count() > MAX_NAME_CHARS {
        tracing::warn!(field, len = value.len(), "Field exceeds limit");
        return Err(ApiError::bad_request(format!(
            "request param '{field}' should contain at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("пароль").is_err());
    }

    #[test]
    fn test_birthdate_bounds() {
        assert_eq!(
            parse_birthdate("1900-01-01").unwrap(),
            NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()
        );
        assert!(parse_birthdate("2007-12-31").is_ok());
        assert!(parse_birthdate("1899-12-31").is_err());
        assert!(parse_birthdate("2008-01-01").is_err());
    }

    #[test]
    fn test_birthdate_format() {
        assert!(parse_birthdate("01.02.1990").is_err());
        assert!(parse_birthdate("1990-02-30").is_err());
        assert!(parse_birthdate("").is_err());
    }

    #[test]
    fn test_user_id() {
        assert!(parse_user_id("0192f0c1-7a4b-7c3e-9d2f-1a2b3c4d5e6f").is_ok());
        assert!(parse_user_id("42").is_err());
    }

    #[test]
    fn test_name_width() {
        assert!(validate_name("city", &"ю".repeat(50)).is_ok());
        assert!(validate_name("city", &"a".repeat(51)).is_err());
    }
}
