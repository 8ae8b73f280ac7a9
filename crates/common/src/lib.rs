//! Shared error and secret types for the gateway workspace

pub mod error;
pub mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
