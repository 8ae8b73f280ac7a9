//! Provider pool management
//!
//! Tracks pools of credentialed provider accounts: per-record health and
//! usage state, round-robin selection with per-model exclusion, a periodic
//! health prober, and a debounced persistence flusher. The `PoolStore` is
//! the single source of truth; selection, probing, admin mutation, and
//! live-traffic failure reports all flow through it.

pub mod error;
pub mod persist;
pub mod prober;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use persist::{load_document, spawn_flusher};
pub use prober::{BaseConfigs, probe_record, spawn_health_sweep};
pub use record::{PoolDocument, ProviderRecord};
pub use store::PoolStore;
