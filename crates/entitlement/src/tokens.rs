//! Email verification and password reset tokens
//!
//! Raw tokens are 32 random bytes, hex-encoded, and leave the engine exactly
//! once so the caller can deliver them. Only the SHA-256 digest is stored.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};

use crate::error::{EntitlementError, EntitlementResult};

/// Token type for verification flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "email_verification",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

/// A freshly generated token, its stored digest and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub hash: String,
    pub expires_at: OffsetDateTime,
}

impl IssuedToken {
    pub fn generate(now: OffsetDateTime, ttl: Duration) -> Self {
        let raw = generate_token();
        let hash = hash_token(&raw);
        Self {
            raw,
            hash,
            expires_at: now + ttl,
        }
    }
}

/// Generate a 32-byte hex-encoded token (64 characters)
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

/// Hash a token using SHA-256
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a presented token against the stored digest and expiry.
///
/// Mismatch is reported before expiry so an attacker learns nothing about
/// whether some other token exists. `now == expires_at` is still valid.
pub fn check_token(
    raw_token: &str,
    stored_hash: Option<&str>,
    expires_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> EntitlementResult<()> {
    let (stored_hash, expires_at) = match (stored_hash, expires_at) {
        (Some(hash), Some(expires_at)) => (hash, expires_at),
        _ => return Err(EntitlementError::InvalidToken),
    };

    let presented = hash_token(raw_token);
    let matches: bool = presented.as_bytes().ct_eq(stored_hash.as_bytes()).into();
    if !matches {
        return Err(EntitlementError::InvalidToken);
    }

    if now > expires_at {
        return Err(EntitlementError::ExpiredToken);
    }

    Ok(())
}
