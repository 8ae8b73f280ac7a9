//! Service resolution: request to concrete backend capability
//!
//! Binds a desired provider type (plus optional model) to a capability.
//! A pooled type goes through round-robin selection and the record's
//! credential fields are deep-merged over the base configuration (record
//! wins); a type without a pool, or an exhausted pool, degrades to the
//! base configuration alone. The selected record's uuid travels with the
//! capability so live-traffic failures can be reported against the right
//! record.

use std::sync::Arc;

use tracing::{debug, warn};

use backend::{Backend, BackendFactory, EffectiveConfig};
use provider_pool::{BaseConfigs, PoolStore};

/// A resolved capability plus the pool identity it came from.
pub struct Resolved {
    pub capability: Arc<dyn Backend>,
    /// Set when a pool record backs the capability; absent in
    /// single-provider or degraded mode
    pub record_uuid: Option<String>,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("record_uuid", &self.record_uuid)
            .finish_non_exhaustive()
    }
}

pub struct Resolver {
    store: Arc<PoolStore>,
    factory: Arc<dyn BackendFactory>,
    base: BaseConfigs,
}

impl Resolver {
    pub fn new(store: Arc<PoolStore>, factory: Arc<dyn BackendFactory>, base: BaseConfigs) -> Self {
        Self {
            store,
            factory,
            base,
        }
    }

    fn base_config(&self, provider_type: &str) -> EffectiveConfig {
        EffectiveConfig::new(
            provider_type,
            self.base.get(provider_type).cloned().unwrap_or_default(),
        )
    }

    /// Resolve a capability for one request.
    ///
    /// Construction failure against a selected record is reported to the
    /// store as a health-degrading event, then propagated; repeated bad
    /// credentials disable themselves.
    pub async fn resolve(
        &self,
        provider_type: &str,
        requested_model: Option<&str>,
    ) -> backend::Result<Resolved> {
        let base = self.base_config(provider_type);

        if !self.store.has_pool(provider_type).await {
            debug!(provider_type, "no pool configured, using base configuration");
            let capability = self.factory.construct(&base)?;
            return Ok(Resolved {
                capability,
                record_uuid: None,
            });
        }

        match self.store.select(provider_type, requested_model).await {
            Some(record) => {
                let config = base.merged(&record.credentials);
                match self.factory.construct(&config) {
                    Ok(capability) => {
                        debug!(provider_type, uuid = %record.uuid, "resolved pooled capability");
                        Ok(Resolved {
                            capability,
                            record_uuid: Some(record.uuid),
                        })
                    }
                    Err(e) => {
                        self.store
                            .mark_unhealthy(provider_type, &record.uuid, Some(&e.to_string()))
                            .await;
                        Err(e)
                    }
                }
            }
            None => {
                // Pool exhaustion is not a rejection: the base credentials
                // may still be independently valid
                warn!(provider_type, "pool exhausted, degrading to base configuration");
                let capability = self.factory.construct(&base)?;
                Ok(Resolved {
                    capability,
                    record_uuid: None,
                })
            }
        }
    }

    /// Live-traffic failure report from the request handler.
    pub async fn report_failure(&self, provider_type: &str, uuid: &str, message: Option<&str>) {
        self.store.mark_unhealthy(provider_type, uuid, message).await;
    }
}
