//! RetireZest Shared Types and Utilities
//!
//! Account model, errors and database helpers shared across the RetireZest services.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
