//! RetireZest Entitlement & Lifecycle Engine
//!
//! Decides whether an account may run a retirement projection, which premium
//! features it has, and which lifecycle transitions (verify, soft-delete,
//! recover, subscription change, purge) are currently legal.
//!
//! The decision functions in [`quota`], [`verification`], [`deletion`],
//! [`subscription`] and [`entitlement`] are pure. [`LifecycleEngine`] pairs
//! them with an [`AccountStore`] that applies each decision as a single
//! conditional write.

pub mod change;
pub mod config;
pub mod deletion;
pub mod engine;
pub mod entitlement;
pub mod error;
pub mod quota;
pub mod store;
pub mod subscription;
pub mod tokens;
pub mod verification;

pub use change::AccountChange;
pub use config::{DowngradeQuotaPolicy, EngineConfig, EngineConfigError};
pub use deletion::DeletionState;
pub use engine::{CreditConsumed, LifecycleEngine, Signup};
pub use entitlement::{Entitlement, EntitlementFeatures, EntitlementSource, EntitlementState};
pub use error::{EntitlementError, EntitlementResult};
pub use quota::{QuotaStatus, UNLIMITED};
pub use store::{AccountStore, InMemoryAccountStore, PgAccountStore};
pub use subscription::SubscriptionUpdate;
pub use tokens::TokenKind;
