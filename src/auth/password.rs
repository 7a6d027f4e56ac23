/// Password Hashing and Verification
///
/// bcrypt hashing plus the strength rules applied at registration and on
/// password change. Both calls are CPU-bound; async callers go through
/// `hash_password_blocking` / `verify_password_blocking`, which run them on
/// actix's blocking pool.

use actix_web::web;
use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Well-formed bcrypt hash at `DEFAULT_COST` that no password matches.
/// Verified against when a login names no account, so that path costs the
/// same bcrypt round as a wrong password.
const DUMMY_PASSWORD_HASH: &str = "$2b$12$.....................................................";

/// Hash a password after checking it against the strength rules
///
/// # Errors
/// - Validation error if the password is too weak
/// - Internal error if bcrypt fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its bcrypt hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    web::block(move || hash_password(&password)).await?
}

pub async fn verify_password_blocking(
    password: String,
    password_hash: String,
) -> Result<bool, AppError> {
    web::block(move || verify_password(&password, &password_hash)).await?
}

/// Burns one bcrypt verification for a login that matched no account.
/// Always yields `false`.
pub async fn verify_password_against_dummy(password: String) -> Result<bool, AppError> {
    verify_password_blocking(password, DUMMY_PASSWORD_HASH.to_string()).await
}

/// Strength rules: 8..=128 characters with at least one digit, one lowercase
/// and one uppercase letter.
pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password".to_string(), MIN_PASSWORD_LENGTH).into());
    }

    // bcrypt only looks at the first 72 bytes; the upper bound also caps hashing work
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_LENGTH).into());
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lowercase = password.chars().any(char::is_lowercase);
    let has_uppercase = password.chars().any(char::is_uppercase);

    if !(has_digit && has_lowercase && has_uppercase) {
        return Err(ValidationError::Rejected(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )
        .into());
    }

    Ok(())
}
