//! JWT session token generation and validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use retirezest_shared::AccountId;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Clock skew tolerated when checking `exp`
const LEEWAY_SECONDS: u64 = 60;

/// Claims carried by a RetireZest session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: AccountId,
    pub email: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
    /// JWT ID
    pub jti: String,
}

/// JWT manager for session tokens
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    /// Issue a session token for an account
    pub fn generate_token(&self, account_id: AccountId, email: &str) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::hours(self.expiry_hours);

        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECONDS;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })
    }

    /// Token lifetime in seconds
    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_hours * 3600
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-chars!";

    #[test]
    fn test_token_generation_and_validation() {
        let jwt = JwtManager::new(SECRET, 24);
        let account_id = AccountId::new();

        let token = jwt
            .generate_token(account_id, "saver@example.com")
            .expect("Failed to generate token");
        let claims = jwt.validate_token(&token).expect("Invalid token");

        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.email, "saver@example.com");
        assert!(!claims.jti.is_empty());
        assert_eq!(jwt.expiry_seconds(), 86_400);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let issuer = JwtManager::new("another-secret-key-at-least-32-chars", 24);
        let verifier = JwtManager::new(SECRET, 24);

        let token = issuer
            .generate_token(AccountId::new(), "saver@example.com")
            .expect("Failed to generate token");

        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Expired well beyond the leeway
        let jwt = JwtManager::new(SECRET, -2);
        let token = jwt
            .generate_token(AccountId::new(), "saver@example.com")
            .expect("Failed to generate token");

        assert!(matches!(jwt.validate_token(&token), Err(JwtError::Expired)));
    }
}
