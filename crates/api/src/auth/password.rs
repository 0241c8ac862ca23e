//! Password hashing with Argon2

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub const MIN_PASSWORD_LENGTH: usize = 10;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Case-insensitive exact matches that are always rejected
const COMMON_PASSWORDS: &[&str] = &[
    "password123",
    "password1234",
    "1234567890",
    "qwertyuiop",
    "iloveyou123",
    "letmein123",
    "welcome123",
    "retirement",
    "retirement1",
    "retireearly",
    "changeme123",
    "administrator",
];

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Reject passwords that are too short, too long, single-class or well known
pub fn validate_password_strength(password: &str) -> Result<(), PasswordValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(PasswordValidationError::TooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(PasswordValidationError::TooLong);
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_non_letter = password.chars().any(|c| !c.is_alphabetic());
    if !(has_letter && has_non_letter) {
        return Err(PasswordValidationError::NoVariety);
    }

    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(PasswordValidationError::TooCommon);
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordValidationError {
    #[error("Password must be at least 10 characters")]
    TooShort,
    #[error("Password must be at most 128 characters")]
    TooLong,
    #[error("Password must mix letters with digits or symbols")]
    NoVariety,
    #[error("This password is too common - please choose a unique password")]
    TooCommon,
}
