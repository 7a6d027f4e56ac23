/// Input validators for account fields
///
/// Each validator trims its input and returns the normalised value, so
/// handlers store exactly what was checked.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_FULL_NAME_LENGTH: usize = 256;
const MIN_USER_NAME_LENGTH: usize = 3;
const MAX_USER_NAME_LENGTH: usize = 30;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");

    static ref USER_NAME_REGEX: Regex = Regex::new(r"^[a-z0-9._]+$").expect("user name regex is valid");
}

/// Validates an email address and returns it trimmed and lowercased
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim().to_lowercase();
    let trimmed = trimmed.as_str();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // Local part is limited to 64 octets
    if let Some(at) = trimmed.find('@') {
        if at > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Validates a display name
pub fn is_valid_full_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("fullName".to_string()));
    }
    if trimmed.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::TooLong("fullName".to_string(), MAX_FULL_NAME_LENGTH));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::SuspiciousContent("fullName".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a user name; user names are stored lowercase
pub fn is_valid_user_name(user_name: &str) -> Result<String, ValidationError> {
    let normalised = user_name.trim().to_lowercase();

    if normalised.is_empty() {
        return Err(ValidationError::EmptyField("userName".to_string()));
    }
    if normalised.len() < MIN_USER_NAME_LENGTH {
        return Err(ValidationError::TooShort("userName".to_string(), MIN_USER_NAME_LENGTH));
    }
    if normalised.len() > MAX_USER_NAME_LENGTH {
        return Err(ValidationError::TooLong("userName".to_string(), MAX_USER_NAME_LENGTH));
    }
    if !USER_NAME_REGEX.is_match(&normalised) {
        return Err(ValidationError::InvalidFormat("userName".to_string()));
    }

    Ok(normalised)
}

/// Rejects a missing or blank required field
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::EmptyField(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
        assert_eq!(is_valid_email("  user@example.com ").unwrap(), "user@example.com");
    }

    #[test]
    fn test_email_is_lowercased() {
        assert_eq!(is_valid_email("Alice@Example.COM").unwrap(), "alice@example.com");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&long_local).is_err());

        assert!(is_valid_email("a@b").is_err());
    }

    #[test]
    fn test_full_name() {
        assert!(is_valid_full_name("John Doe").is_ok());
        assert!(is_valid_full_name("O'Brien").is_ok());
        assert!(is_valid_full_name("   ").is_err());
        assert!(is_valid_full_name("Name\0with\0null").is_err());
        assert!(is_valid_full_name(&"a".repeat(257)).is_err());
    }

    #[test]
    fn test_user_name_is_lowercased() {
        assert_eq!(is_valid_user_name(" Chai.Aur_Code ").unwrap(), "chai.aur_code");
    }

    #[test]
    fn test_invalid_user_names() {
        assert!(is_valid_user_name("ab").is_err());
        assert!(is_valid_user_name(&"a".repeat(31)).is_err());
        assert!(is_valid_user_name("has space").is_err());
        assert!(is_valid_user_name("emoji🙂").is_err());
    }

    #[test]
    fn test_required() {
        assert_eq!(required(Some("x"), "f").unwrap(), "x");
        assert!(required(Some("  "), "f").is_err());
        assert!(required(None, "f").is_err());
    }
}
