//! Health state store and round-robin selection
//!
//! `PoolStore` holds every pool's records behind a single `RwLock` so the
//! eligibility scan, cursor advance, and usage bump of one `select` call
//! form one critical section. Cursor arithmetic is always taken modulo the
//! current eligible length, so the cursor self-heals when records flip
//! health or get disabled between calls.
//!
//! Every mutation notifies the persistence flusher over an unbounded
//! channel; disk I/O never happens on the caller's path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use backend::deep_merge;

use crate::record::{PoolDocument, ProviderRecord};

#[derive(Default)]
struct Inner {
    pools: HashMap<String, Vec<ProviderRecord>>,
    /// Rotation cursor per `type` or `type:model` key
    cursors: HashMap<String, usize>,
}

/// Single source of truth for pool state.
///
/// Selection, probing, admin mutation, and live-traffic failure reports
/// all go through this store; nothing else replicates record state.
pub struct PoolStore {
    inner: RwLock<Inner>,
    max_error_count: u32,
    flush_tx: mpsc::UnboundedSender<String>,
    flushes_completed: AtomicU64,
}

fn rotation_key(provider_type: &str, model: Option<&str>) -> String {
    match model {
        Some(model) => format!("{provider_type}:{model}"),
        None => provider_type.to_string(),
    }
}

impl PoolStore {
    /// Create an empty store.
    ///
    /// Returns the store and the flush-notification receiver; hand the
    /// receiver to [`crate::persist::spawn_flusher`]. A record flips
    /// unhealthy once its error count reaches `max_error_count`.
    pub fn new(max_error_count: u32) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        let store = Self {
            inner: RwLock::new(Inner::default()),
            max_error_count,
            flush_tx,
            flushes_completed: AtomicU64::new(0),
        };
        (store, flush_rx)
    }

    /// Replace in-memory pools from a loaded document.
    ///
    /// Records without a uuid get one assigned; serde already filled
    /// defaults for missing pool-management fields. Rotation cursors are
    /// reset.
    pub async fn initialize(&self, document: PoolDocument) {
        let mut pools: HashMap<String, Vec<ProviderRecord>> = HashMap::new();
        let mut total = 0usize;
        for (provider_type, mut records) in document {
            for record in &mut records {
                if record.uuid.trim().is_empty() {
                    record.uuid = Uuid::new_v4().to_string();
                }
            }
            total += records.len();
            pools.insert(provider_type, records);
        }

        let mut inner = self.inner.write().await;
        inner.pools = pools;
        inner.cursors.clear();
        info!(
            pools = inner.pools.len(),
            records = total,
            "pool store initialized"
        );
    }

    /// Whether a non-empty pool exists for `provider_type`.
    pub async fn has_pool(&self, provider_type: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .pools
            .get(provider_type)
            .is_some_and(|records| !records.is_empty())
    }

    /// Clone of one record, if present.
    pub async fn find(&self, provider_type: &str, uuid: &str) -> Option<ProviderRecord> {
        let inner = self.inner.read().await;
        inner
            .pools
            .get(provider_type)?
            .iter()
            .find(|r| r.uuid == uuid)
            .cloned()
    }

    /// Select the next eligible record round-robin.
    ///
    /// Eligible means healthy, not disabled, and not excluding
    /// `requested_model` when one is given. Each `type` or `type:model`
    /// rotation key owns an independent cursor. The selected record's
    /// `usage_count` and `last_used` are bumped inside the same critical
    /// section; a cloned snapshot is returned.
    ///
    /// An unknown pool or an empty eligible set returns `None` — the
    /// caller degrades to its default configuration.
    pub async fn select(
        &self,
        provider_type: &str,
        requested_model: Option<&str>,
    ) -> Option<ProviderRecord> {
        let selected = {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;
            let records = inner.pools.get_mut(provider_type)?;

            let eligible: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.eligible(requested_model))
                .map(|(i, _)| i)
                .collect();
            if eligible.is_empty() {
                metrics::counter!("pool_exhausted_total", "provider_type" => provider_type.to_string())
                    .increment(1);
                debug!(provider_type, model = ?requested_model, "no eligible record in pool");
                return None;
            }

            let cursor = inner
                .cursors
                .entry(rotation_key(provider_type, requested_model))
                .or_insert(0);
            let index = *cursor % eligible.len();
            *cursor = (index + 1) % eligible.len();

            let record = &mut records[eligible[index]];
            record.usage_count += 1;
            record.last_used = Some(Utc::now());
            record.clone()
        };

        metrics::counter!("pool_selections_total", "provider_type" => provider_type.to_string())
            .increment(1);
        self.schedule_flush(provider_type);
        Some(selected)
    }

    /// Record one failure against a record.
    ///
    /// Increments the error count and stamps the error time; the record
    /// flips unhealthy once the count reaches the configured maximum.
    /// Returns false (logged, no-op) for an unknown record.
    pub async fn mark_unhealthy(
        &self,
        provider_type: &str,
        uuid: &str,
        message: Option<&str>,
    ) -> bool {
        let max = self.max_error_count;
        let mut flipped = false;
        let found = self
            .mutate(provider_type, uuid, "mark_unhealthy", |record| {
                record.error_count = record.error_count.saturating_add(1);
                record.last_error_time = Some(Utc::now());
                if let Some(message) = message {
                    record.last_error_message = Some(message.to_string());
                }
                if record.error_count >= max && record.is_healthy {
                    record.is_healthy = false;
                    flipped = true;
                }
            })
            .await;

        if found {
            metrics::counter!("pool_record_errors_total", "provider_type" => provider_type.to_string())
                .increment(1);
            if flipped {
                warn!(provider_type, uuid, max_error_count = max, "record marked unhealthy");
            }
        }
        found
    }

    /// Recover a record: healthy, zero errors, error timestamps cleared.
    ///
    /// `reset_usage` additionally zeroes the usage counter; recovery alone
    /// never touches it.
    pub async fn mark_healthy(&self, provider_type: &str, uuid: &str, reset_usage: bool) -> bool {
        let mut recovered = false;
        let found = self
            .mutate(provider_type, uuid, "mark_healthy", |record| {
                recovered = !record.is_healthy;
                record.is_healthy = true;
                record.error_count = 0;
                record.last_error_time = None;
                record.last_error_message = None;
                if reset_usage {
                    record.usage_count = 0;
                }
            })
            .await;
        if found && recovered {
            info!(provider_type, uuid, "record recovered");
        }
        found
    }

    /// Zero both counters without touching the health flag.
    pub async fn reset_counters(&self, provider_type: &str, uuid: &str) -> bool {
        self.mutate(provider_type, uuid, "reset_counters", |record| {
            record.error_count = 0;
            record.usage_count = 0;
        })
        .await
    }

    /// Set the operator-controlled disabled flag.
    pub async fn set_disabled(&self, provider_type: &str, uuid: &str, disabled: bool) -> bool {
        let found = self
            .mutate(provider_type, uuid, "set_disabled", |record| {
                record.is_disabled = disabled;
            })
            .await;
        if found {
            info!(provider_type, uuid, disabled, "record disabled flag set");
        }
        found
    }

    /// Add a record to a pool, assigning a uuid when absent.
    ///
    /// A record carrying the uuid of an existing pool member replaces it,
    /// keeping uuids unique within the pool. Returns the record's uuid.
    pub async fn add_record(&self, provider_type: &str, mut record: ProviderRecord) -> String {
        if record.uuid.trim().is_empty() {
            record.uuid = Uuid::new_v4().to_string();
        }
        let uuid = record.uuid.clone();

        {
            let mut inner = self.inner.write().await;
            let records = inner.pools.entry(provider_type.to_string()).or_default();
            match records.iter().position(|r| r.uuid == uuid) {
                Some(index) => records[index] = record,
                None => records.push(record),
            }
        }

        info!(provider_type, uuid, "record added to pool");
        self.schedule_flush(provider_type);
        uuid
    }

    /// Deep-merge a JSON patch into a record (patch fields win).
    ///
    /// The uuid is immutable; a patch attempting to change it is ignored
    /// for that field. A patch producing an undeserializable record is
    /// rejected without modifying the store.
    pub async fn update_record(
        &self,
        provider_type: &str,
        uuid: &str,
        patch: &serde_json::Map<String, serde_json::Value>,
    ) -> bool {
        let updated = {
            let mut inner = self.inner.write().await;
            let Some(records) = inner.pools.get_mut(provider_type) else {
                warn!(provider_type, uuid, "update on unknown pool ignored");
                return false;
            };
            let Some(index) = records.iter().position(|r| r.uuid == uuid) else {
                warn!(provider_type, uuid, "update on unknown record ignored");
                return false;
            };

            let mut value = match serde_json::to_value(&records[index]) {
                Ok(value) => value,
                Err(e) => {
                    warn!(provider_type, uuid, error = %e, "record serialization failed");
                    return false;
                }
            };
            deep_merge(&mut value, &serde_json::Value::Object(patch.clone()));
            match serde_json::from_value::<ProviderRecord>(value) {
                Ok(mut record) => {
                    record.uuid = uuid.to_string();
                    records[index] = record;
                    true
                }
                Err(e) => {
                    warn!(provider_type, uuid, error = %e, "rejecting patch, record would not parse");
                    false
                }
            }
        };

        if updated {
            info!(provider_type, uuid, "record updated");
            self.schedule_flush(provider_type);
        }
        updated
    }

    /// Remove a record from its pool. Returns whether it existed.
    pub async fn remove_record(&self, provider_type: &str, uuid: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write().await;
            match inner.pools.get_mut(provider_type) {
                Some(records) => {
                    let before = records.len();
                    records.retain(|r| r.uuid != uuid);
                    records.len() != before
                }
                None => false,
            }
        };

        if removed {
            info!(provider_type, uuid, "record removed from pool");
            self.schedule_flush(provider_type);
        } else {
            warn!(provider_type, uuid, "remove on unknown record ignored");
        }
        removed
    }

    /// Clone of one pool's record list, if the pool exists.
    pub async fn snapshot(&self, provider_type: &str) -> Option<Vec<ProviderRecord>> {
        let inner = self.inner.read().await;
        inner.pools.get(provider_type).cloned()
    }

    /// Clone of every pool, in document form.
    pub async fn snapshot_all(&self) -> PoolDocument {
        let inner = self.inner.read().await;
        inner
            .pools
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Pool health summary for the health endpoint.
    ///
    /// All records available (or no pools configured, which is
    /// single-provider mode) maps to healthy; some available to degraded;
    /// none to unhealthy.
    pub async fn summary(&self) -> serde_json::Value {
        let inner = self.inner.read().await;
        let mut pools = serde_json::Map::new();
        let mut total = 0usize;
        let mut available = 0usize;

        for (provider_type, records) in &inner.pools {
            let pool_available = records
                .iter()
                .filter(|r| r.is_healthy && !r.is_disabled)
                .count();
            let unhealthy = records.iter().filter(|r| !r.is_healthy).count();
            let disabled = records.iter().filter(|r| r.is_disabled).count();
            total += records.len();
            available += pool_available;
            pools.insert(
                provider_type.clone(),
                json!({
                    "total": records.len(),
                    "available": pool_available,
                    "unhealthy": unhealthy,
                    "disabled": disabled,
                }),
            );
        }

        let status = if total == 0 || available == total {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        json!({
            "status": status,
            "records_total": total,
            "records_available": available,
            "pools": pools,
        })
    }

    /// Number of completed persistence flushes.
    pub fn flushes_completed(&self) -> u64 {
        self.flushes_completed.load(Ordering::Relaxed)
    }

    pub(crate) fn note_flush(&self) {
        self.flushes_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Apply `f` to one record under the write lock; logged no-op when
    /// the record is unknown so mutators never fail into a request path.
    async fn mutate<F>(&self, provider_type: &str, uuid: &str, op: &str, f: F) -> bool
    where
        F: FnOnce(&mut ProviderRecord),
    {
        let found = {
            let mut inner = self.inner.write().await;
            match inner
                .pools
                .get_mut(provider_type)
                .and_then(|records| records.iter_mut().find(|r| r.uuid == uuid))
            {
                Some(record) => {
                    f(record);
                    true
                }
                None => false,
            }
        };

        if found {
            self.schedule_flush(provider_type);
        } else {
            warn!(provider_type, uuid, op, "mutation on unknown record ignored");
        }
        found
    }

    fn schedule_flush(&self, provider_type: &str) {
        // Send failure means the flusher is gone (shutdown); in-memory
        // state is still correct, so this is not an error.
        if self.flush_tx.send(provider_type.to_string()).is_err() {
            debug!(provider_type, "flush channel closed, skipping persistence");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(uuid: &str) -> ProviderRecord {
        ProviderRecord {
            uuid: uuid.into(),
            credentials: serde_json::Map::from_iter([(
                "apiKey".to_string(),
                json!(format!("key-{uuid}")),
            )]),
            ..Default::default()
        }
    }

    async fn store_with(
        provider_type: &str,
        records: Vec<ProviderRecord>,
    ) -> (PoolStore, mpsc::UnboundedReceiver<String>) {
        let (store, rx) = PoolStore::new(3);
        let mut document = PoolDocument::new();
        document.insert(provider_type.into(), records);
        store.initialize(document).await;
        (store, rx)
    }

    #[tokio::test]
    async fn round_robin_visits_each_record_once_in_order() {
        let (store, _rx) =
            store_with("openai", vec![record("a"), record("b"), record("c")]).await;

        let picks: Vec<String> = [
            store.select("openai", None).await.unwrap().uuid,
            store.select("openai", None).await.unwrap().uuid,
            store.select("openai", None).await.unwrap().uuid,
            store.select("openai", None).await.unwrap().uuid,
        ]
        .into();
        assert_eq!(picks, vec!["a", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn selection_bumps_usage_and_last_used() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        let selected = store.select("openai", None).await.unwrap();
        assert_eq!(selected.usage_count, 1);
        assert!(selected.last_used.is_some());

        let stored = store.find("openai", "a").await.unwrap();
        assert_eq!(stored.usage_count, 1);
    }

    #[tokio::test]
    async fn unknown_pool_selects_none() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;
        assert!(store.select("B", None).await.is_none());
    }

    #[tokio::test]
    async fn empty_eligible_set_selects_none() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;
        store.set_disabled("openai", "a", true).await;
        assert!(store.select("openai", None).await.is_none());
    }

    #[tokio::test]
    async fn model_exclusion_filters_only_that_model() {
        let mut excluded = record("a");
        excluded.not_supported_models = vec!["m1".into()];
        let (store, _rx) = store_with("openai", vec![excluded, record("b")]).await;

        for _ in 0..4 {
            let selected = store.select("openai", Some("m1")).await.unwrap();
            assert_eq!(selected.uuid, "b");
        }
        let uuids: Vec<String> = [
            store.select("openai", Some("m2")).await.unwrap().uuid,
            store.select("openai", Some("m2")).await.unwrap().uuid,
        ]
        .into();
        assert!(uuids.contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn model_rotation_cursor_is_independent_of_type_cursor() {
        let (store, _rx) = store_with("openai", vec![record("a"), record("b")]).await;

        // Advance the type-wide cursor past "a"
        assert_eq!(store.select("openai", None).await.unwrap().uuid, "a");
        // Fresh model-specific cursor still starts at the beginning
        assert_eq!(store.select("openai", Some("m1")).await.unwrap().uuid, "a");
        // Type-wide cursor unaffected by the model-specific rotation
        assert_eq!(store.select("openai", None).await.unwrap().uuid, "b");
    }

    #[tokio::test]
    async fn cursor_self_heals_when_eligible_set_shrinks() {
        let (store, _rx) =
            store_with("openai", vec![record("a"), record("b"), record("c")]).await;

        assert_eq!(store.select("openai", None).await.unwrap().uuid, "a");
        store.set_disabled("openai", "b", true).await;

        // Eligible set is now [a, c]; cursor 1 mod 2 picks "c"
        assert_eq!(store.select("openai", None).await.unwrap().uuid, "c");
        assert_eq!(store.select("openai", None).await.unwrap().uuid, "a");
    }

    #[tokio::test]
    async fn circuit_breaker_flips_exactly_at_max() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        store.mark_unhealthy("openai", "a", None).await;
        store.mark_unhealthy("openai", "a", None).await;
        let r = store.find("openai", "a").await.unwrap();
        assert!(r.is_healthy, "two errors must not flip with max 3");
        assert_eq!(r.error_count, 2);

        store.mark_unhealthy("openai", "a", Some("timeout")).await;
        let r = store.find("openai", "a").await.unwrap();
        assert!(!r.is_healthy);
        assert_eq!(r.error_count, 3);
        assert!(r.last_error_time.is_some());
        assert_eq!(r.last_error_message.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn mark_healthy_clears_error_state() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;
        store.select("openai", None).await.unwrap();
        for _ in 0..5 {
            store.mark_unhealthy("openai", "a", Some("boom")).await;
        }

        store.mark_healthy("openai", "a", false).await;
        let r = store.find("openai", "a").await.unwrap();
        assert!(r.is_healthy);
        assert_eq!(r.error_count, 0);
        assert!(r.last_error_time.is_none());
        assert!(r.last_error_message.is_none());
        assert_eq!(r.usage_count, 1, "recovery alone keeps usage");
    }

    #[tokio::test]
    async fn mark_healthy_with_reset_usage_zeroes_usage() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;
        store.select("openai", None).await.unwrap();
        store.select("openai", None).await.unwrap();

        store.mark_healthy("openai", "a", true).await;
        let r = store.find("openai", "a").await.unwrap();
        assert_eq!(r.usage_count, 0);
    }

    #[tokio::test]
    async fn reset_counters_leaves_health_flag_alone() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;
        for _ in 0..3 {
            store.mark_unhealthy("openai", "a", None).await;
        }

        store.reset_counters("openai", "a").await;
        let r = store.find("openai", "a").await.unwrap();
        assert_eq!(r.error_count, 0);
        assert_eq!(r.usage_count, 0);
        assert!(!r.is_healthy, "reset_counters must not recover health");
    }

    #[tokio::test]
    async fn unknown_record_mutations_are_noops() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        assert!(!store.mark_unhealthy("openai", "ghost", None).await);
        assert!(!store.mark_healthy("ghost-type", "a", false).await);
        assert!(!store.set_disabled("openai", "ghost", true).await);
        assert!(!store.reset_counters("openai", "ghost").await);

        let r = store.find("openai", "a").await.unwrap();
        assert!(r.is_healthy);
        assert_eq!(r.error_count, 0);
    }

    #[tokio::test]
    async fn concurrent_selection_loses_no_increments() {
        use std::sync::Arc;

        let (store, _rx) =
            store_with("openai", vec![record("a"), record("b"), record("c")]).await;
        let store = Arc::new(store);

        // 30 selectors over 3 records: the single critical section must
        // keep the rotation even and every usage bump accounted for
        let mut handles = Vec::new();
        for _ in 0..30 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.select("openai", None).await.unwrap().uuid
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let records = store.snapshot("openai").await.unwrap();
        let total: u64 = records.iter().map(|r| r.usage_count).sum();
        assert_eq!(total, 30, "no usage increment may be lost");
        for r in &records {
            assert_eq!(
                r.usage_count, 10,
                "rotation must stay even under concurrency, {} got {}",
                r.uuid, r.usage_count
            );
        }
    }

    #[tokio::test]
    async fn failover_scenario_two_records() {
        // maxErrorCount = 2 for this walkthrough
        let (store, _rx) = PoolStore::new(2);
        let mut document = PoolDocument::new();
        document.insert("A".into(), vec![record("a1"), record("a2")]);
        store.initialize(document).await;

        let first = store.select("A", None).await.unwrap();
        assert_eq!(first.uuid, "a1");
        assert_eq!(first.usage_count, 1);

        store.mark_unhealthy("A", "a1", None).await;
        store.mark_unhealthy("A", "a1", None).await;
        let a1 = store.find("A", "a1").await.unwrap();
        assert!(!a1.is_healthy);
        assert_eq!(a1.error_count, 2);

        // a2 is the only eligible record, whatever the stored cursor says
        assert_eq!(store.select("A", None).await.unwrap().uuid, "a2");
        assert_eq!(store.select("A", None).await.unwrap().uuid, "a2");
    }

    #[tokio::test]
    async fn add_record_assigns_uuid_and_upserts_on_collision() {
        let (store, _rx) = store_with("openai", vec![]).await;

        let uuid = store.add_record("openai", ProviderRecord::default()).await;
        assert!(!uuid.is_empty());
        assert!(store.find("openai", &uuid).await.is_some());

        let mut replacement = record(&uuid);
        replacement.name = Some("replacement".into());
        store.add_record("openai", replacement).await;

        let records = store.snapshot("openai").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("replacement"));
    }

    #[tokio::test]
    async fn update_record_merges_patch_and_keeps_uuid() {
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        let patch = match json!({
            "uuid": "evil",
            "apiKey": "rotated",
            "checkModelName": "gpt-4o",
            "notSupportedModels": ["m1"]
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert!(store.update_record("openai", "a", &patch).await);

        let r = store.find("openai", "a").await.unwrap();
        assert_eq!(r.uuid, "a");
        assert_eq!(r.credentials["apiKey"], "rotated");
        assert_eq!(r.check_model_name.as_deref(), Some("gpt-4o"));
        assert_eq!(r.not_supported_models, vec!["m1"]);

        assert!(!store.update_record("openai", "ghost", &patch).await);
    }

    #[tokio::test]
    async fn remove_record_then_missing() {
        let (store, _rx) = store_with("openai", vec![record("a"), record("b")]).await;

        assert!(store.remove_record("openai", "a").await);
        assert!(!store.remove_record("openai", "a").await);
        assert_eq!(store.snapshot("openai").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mutations_notify_the_flusher() {
        let (store, mut rx) = store_with("openai", vec![record("a")]).await;

        store.select("openai", None).await.unwrap();
        store.mark_unhealthy("openai", "a", None).await;

        assert_eq!(rx.try_recv().unwrap(), "openai");
        assert_eq!(rx.try_recv().unwrap(), "openai");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn initialize_assigns_missing_uuids() {
        let (store, _rx) = PoolStore::new(3);
        let mut document = PoolDocument::new();
        document.insert(
            "openai".into(),
            vec![ProviderRecord::default(), record("fixed")],
        );
        store.initialize(document).await;

        let records = store.snapshot("openai").await.unwrap();
        assert!(!records[0].uuid.is_empty());
        assert_eq!(records[1].uuid, "fixed");
    }

    #[tokio::test]
    async fn summary_reports_per_pool_counts() {
        let (store, _rx) = store_with("openai", vec![record("a"), record("b")]).await;
        store.set_disabled("openai", "b", true).await;

        let summary = store.summary().await;
        assert_eq!(summary["status"], "degraded");
        assert_eq!(summary["records_total"], 2);
        assert_eq!(summary["records_available"], 1);
        assert_eq!(summary["pools"]["openai"]["disabled"], 1);
    }

    #[tokio::test]
    async fn summary_empty_store_is_healthy() {
        let (store, _rx) = PoolStore::new(3);
        let summary = store.summary().await;
        assert_eq!(summary["status"], "healthy");
        assert_eq!(summary["records_total"], 0);
    }
}
