//! Provider record model and persisted pool document shape
//!
//! The pool document is a JSON object mapping provider-type keys to arrays
//! of records. A record carries a fixed set of pool-management fields plus
//! an open, flattened mapping of vendor credential fields (apiKey, baseUrl,
//! OAuth file paths) that the pool core never interprets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// On-disk document: provider type -> ordered record list.
///
/// Ordered map so repeated serializations produce stable output.
pub type PoolDocument = BTreeMap<String, Vec<ProviderRecord>>;

fn default_true() -> bool {
    true
}

/// One credentialed backend account within a provider-type pool.
///
/// Serialized camelCase. Missing pool-management fields deserialize to
/// defaults (healthy, enabled, zero counters, probing on), so hand-edited
/// documents that only list credentials load cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    /// Stable identity, assigned at creation, never reused
    #[serde(default)]
    pub uuid: String,

    /// Operator-facing label for admin listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_true")]
    pub is_healthy: bool,

    /// Operator-imposed exclusion, independent of health
    #[serde(default)]
    pub is_disabled: bool,

    #[serde(default)]
    pub usage_count: u64,

    #[serde(default)]
    pub error_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,

    /// Whether the health prober may touch this record
    #[serde(default = "default_true")]
    pub check_health: bool,

    /// Probe model override; per-type default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_model_name: Option<String>,

    /// Models this record must never serve
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_supported_models: Vec<String>,

    /// Vendor credential fields, opaque to the pool core
    #[serde(flatten)]
    pub credentials: Map<String, Value>,
}

impl Default for ProviderRecord {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            name: None,
            is_healthy: true,
            is_disabled: false,
            usage_count: 0,
            error_count: 0,
            last_used: None,
            last_error_time: None,
            last_error_message: None,
            check_health: true,
            check_model_name: None,
            not_supported_models: Vec::new(),
            credentials: Map::new(),
        }
    }
}

impl ProviderRecord {
    /// Whether this record declares `model` unsupported.
    pub fn excludes_model(&self, model: &str) -> bool {
        self.not_supported_models.iter().any(|m| m == model)
    }

    /// Whether this record may serve a request for `requested_model`.
    pub fn eligible(&self, requested_model: Option<&str>) -> bool {
        if !self.is_healthy || self.is_disabled {
            return false;
        }
        match requested_model {
            Some(model) => !self.excludes_model(model),
            None => true,
        }
    }
}
