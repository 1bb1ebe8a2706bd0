//! Shared Types
//!
//! Crate-wide error type and result alias.

pub mod error;

pub use error::{Result, WikiError};
