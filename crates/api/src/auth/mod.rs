//! Authentication module for RetireZest

pub mod jwt;
pub mod password;
pub mod session;

pub use jwt::{Claims, JwtError, JwtManager};
pub use password::{hash_password, validate_password_strength, verify_password};
pub use session::{require_auth, AuthAccount, JwtSessionProvider, SessionProvider};
