//! Periodic health sweep
//!
//! Walks every pool on a fixed timer (plus one sweep right after startup)
//! and probes records through the backend-capability seam. Probes run
//! against a cloned snapshot so no store lock is held across network I/O;
//! only the resulting state transition takes the lock. A record that
//! failed recently is left alone until the backoff interval elapses, and
//! records with probing switched off are never touched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use backend::{BackendFactory, EffectiveConfig, probe_request};

use crate::record::ProviderRecord;
use crate::store::PoolStore;

/// Base provider configuration merged under each record's credential
/// fields when building the probe's effective configuration.
pub type BaseConfigs = HashMap<String, Map<String, Value>>;

/// Spawn the background sweep task.
///
/// The first tick fires immediately, giving one sweep shortly after
/// startup; `interval` doubles as the per-record failure backoff.
pub fn spawn_health_sweep(
    store: Arc<PoolStore>,
    factory: Arc<dyn BackendFactory>,
    base: BaseConfigs,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            run_sweep(&store, factory.as_ref(), &base, interval).await;
        }
    })
}

/// Run one sweep over every record of every pool.
///
/// Each record's probe failure is absorbed into its own state transition;
/// nothing here can abort the sweep.
pub async fn run_sweep(
    store: &PoolStore,
    factory: &dyn BackendFactory,
    base: &BaseConfigs,
    backoff: Duration,
) {
    let snapshot = store.snapshot_all().await;
    let started = Instant::now();
    let mut probed = 0usize;

    for (provider_type, records) in &snapshot {
        for record in records {
            if !record.is_healthy
                && let Some(last_error) = record.last_error_time
            {
                let since = (Utc::now() - last_error).to_std().unwrap_or_default();
                if since < backoff {
                    debug!(
                        provider_type,
                        uuid = %record.uuid,
                        "recent failure, backing off before reprobe"
                    );
                    continue;
                }
            }
            if !record.check_health {
                debug!(provider_type, uuid = %record.uuid, "probing disabled for record");
                continue;
            }

            probe_record(store, factory, base, provider_type, record).await;
            probed += 1;
        }
    }

    debug!(
        probed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "health sweep complete"
    );
}

/// Probe one record through the capability seam and apply the resulting
/// state transition. Public so the admin layer can trigger an on-demand
/// check outside the sweep.
pub async fn probe_record(
    store: &PoolStore,
    factory: &dyn BackendFactory,
    base: &BaseConfigs,
    provider_type: &str,
    record: &ProviderRecord,
) {
    let base_fields = base.get(provider_type).cloned().unwrap_or_default();
    let config = EffectiveConfig::new(provider_type, base_fields).merged(&record.credentials);

    // Construction failure is a health-degrading event like any probe failure
    let capability = match factory.construct(&config) {
        Ok(capability) => capability,
        Err(e) => {
            warn!(provider_type, uuid = %record.uuid, error = %e, "probe construction failed");
            store
                .mark_unhealthy(provider_type, &record.uuid, Some(&e.to_string()))
                .await;
            return;
        }
    };

    // Probe model precedence: record override, base-config override,
    // per-type static default
    let model = match record.check_model_name.as_deref() {
        Some(model) if !model.trim().is_empty() => model,
        _ => config
            .str_field("checkModelName")
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| backend::default_check_model(provider_type)),
    };
    let request = probe_request(config.protocol(), model);

    let started = Instant::now();
    let outcome = capability.generate_content(model, &request).await;
    let result = if outcome.is_ok() { "ok" } else { "error" };
    metrics::histogram!(
        "probe_duration_seconds",
        "provider_type" => provider_type.to_string(),
        "result" => result
    )
    .record(started.elapsed().as_secs_f64());

    match outcome {
        Ok(_) => {
            debug!(provider_type, uuid = %record.uuid, model, "probe succeeded");
            store.mark_healthy(provider_type, &record.uuid, false).await;
        }
        Err(e) => {
            warn!(provider_type, uuid = %record.uuid, model, error = %e, "probe failed");
            store
                .mark_unhealthy(provider_type, &record.uuid, Some(&e.to_string()))
                .await;
        }
    }
}
