//! Backend capability abstraction for upstream model providers
//!
//! Defines the `Backend` trait that decouples pool management and request
//! resolution from vendor wire formats. A backend is constructed from an
//! `EffectiveConfig` (base configuration with a pool record's credential
//! fields merged over it) and exposes a single `generate_content` operation.
//! The HTTP implementation covers the four canonical protocol shapes; other
//! implementations (mocks in tests) implement the same trait.

pub mod config;
pub mod http;
pub mod probe;

pub use config::{EffectiveConfig, ProtocolKind, deep_merge, default_check_model};
pub use http::{HttpBackend, HttpBackendFactory};
pub use probe::probe_request;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Errors from backend construction and invocation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The effective configuration is unusable (missing/malformed credentials).
    #[error("invalid backend configuration: {0}")]
    Config(String),

    /// The upstream accepted the connection but returned a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// A constructed capability for one upstream provider account.
///
/// `generate_content` takes a canonical request body whose shape matches the
/// provider's protocol (see [`probe::probe_request`] for the minimal forms)
/// and returns the upstream response body as JSON.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Backend>`).
pub trait Backend: Send + Sync {
    fn generate_content<'a>(
        &'a self,
        model: &'a str,
        request: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send + 'a>>;
}

/// Constructs backend capabilities from effective configurations.
///
/// Construction is synchronous and may fail on malformed credentials; that
/// failure is a health-degrading event for the pool record the configuration
/// came from, so the factory must not silently accept unusable configs.
pub trait BackendFactory: Send + Sync {
    fn construct(&self, config: &EffectiveConfig) -> Result<Arc<dyn Backend>>;
}
