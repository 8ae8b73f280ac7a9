//! Debounced pool document persistence
//!
//! Mutations notify the flusher task with the dirty provider type; the
//! flusher accumulates types while the debounce window keeps restarting,
//! then merges the dirty pools into the on-disk document and writes it
//! atomically (temp file + rename, 0600 since the file carries
//! credentials). A failed write keeps the pending set so the next cycle
//! retries; callers never see persistence errors.
//!
//! Single-writer-process is assumed: the read-merge-write sequence is not
//! transactional across processes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::PoolDocument;
use crate::store::PoolStore;

/// Load the pool document, treating a missing file as an empty document
/// (cold start with zero pooled records).
pub async fn load_document(path: &Path) -> Result<PoolDocument> {
    if !path.exists() {
        info!(path = %path.display(), "pool file not found, starting empty");
        return Ok(PoolDocument::new());
    }
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io(format!("reading pool file: {e}")))?;
    let document: PoolDocument = serde_json::from_str(&contents)
        .map_err(|e| Error::Parse(format!("parsing pool file: {e}")))?;
    let records: usize = document.values().map(Vec::len).sum();
    info!(path = %path.display(), pools = document.len(), records, "loaded pool document");
    Ok(document)
}

/// Spawn the background flusher consuming the store's notifications.
///
/// The first notification opens a debounce window; further notifications
/// restart it. When the window goes quiet the pending provider types are
/// flushed in one write.
pub fn spawn_flusher(
    store: Arc<PoolStore>,
    path: PathBuf,
    debounce: Duration,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut pending: HashSet<String> = HashSet::new();
        loop {
            match rx.recv().await {
                Some(provider_type) => {
                    pending.insert(provider_type);
                }
                None => {
                    flush_pending(&store, &path, &mut pending).await;
                    break;
                }
            }

            loop {
                match tokio::time::timeout(debounce, rx.recv()).await {
                    Ok(Some(provider_type)) => {
                        pending.insert(provider_type);
                    }
                    Ok(None) | Err(_) => break,
                }
            }

            flush_pending(&store, &path, &mut pending).await;
        }
        debug!("pool flusher stopped");
    })
}

/// Merge the pending pools into the on-disk document and write it back.
///
/// Only pending provider types are overwritten, so document keys this
/// process never touched survive. On write failure the pending set is
/// kept for the next cycle.
async fn flush_pending(store: &PoolStore, path: &Path, pending: &mut HashSet<String>) {
    if pending.is_empty() {
        return;
    }

    let mut document = match load_document(path).await {
        Ok(document) => document,
        Err(e) => {
            warn!(error = %e, "unreadable pool document, rewriting from memory");
            PoolDocument::new()
        }
    };

    for provider_type in pending.iter() {
        match store.snapshot(provider_type).await {
            Some(records) => {
                document.insert(provider_type.clone(), records);
            }
            None => {
                document.remove(provider_type);
            }
        }
    }

    match write_atomic(path, &document).await {
        Ok(()) => {
            debug!(types = pending.len(), path = %path.display(), "pool document flushed");
            pending.clear();
            store.note_flush();
            metrics::counter!("pool_flushes_total").increment(1);
        }
        Err(e) => {
            warn!(error = %e, "pool flush failed, keeping pending set for retry");
        }
    }
}

/// Write the document atomically: temp file in the same directory, 0600
/// permissions, rename over the target.
async fn write_atomic(path: &Path, document: &PoolDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| Error::Parse(format!("serializing pool document: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("pool file path has no parent directory".into()))?;
    let tmp_path = dir.join(format!(".pool.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp pool file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting pool file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp pool file: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ProviderRecord;
    use serde_json::json;

    fn record(uuid: &str) -> ProviderRecord {
        ProviderRecord {
            uuid: uuid.into(),
            ..Default::default()
        }
    }

    async fn store_with(
        provider_type: &str,
        records: Vec<ProviderRecord>,
    ) -> (Arc<PoolStore>, mpsc::UnboundedReceiver<String>) {
        let (store, rx) = PoolStore::new(3);
        let mut document = PoolDocument::new();
        document.insert(provider_type.into(), records);
        store.initialize(document).await;
        (Arc::new(store), rx)
    }

    #[tokio::test]
    async fn load_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let document = load_document(&dir.path().join("pool.json")).await.unwrap();
        assert!(document.is_empty());
    }

    #[tokio::test]
    async fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = load_document(&path).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got: {err}");
    }

    #[tokio::test]
    async fn burst_of_mutations_produces_one_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        let (store, rx) = store_with("openai", vec![record("a")]).await;
        let _flusher = spawn_flusher(
            store.clone(),
            path.clone(),
            Duration::from_millis(50),
            rx,
        );

        for _ in 0..5 {
            store.mark_unhealthy("openai", "a", None).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(store.flushes_completed(), 1);
        let document = load_document(&path).await.unwrap();
        let a = &document["openai"][0];
        assert_eq!(a.error_count, 5, "flush must reflect the final state");
        assert!(!a.is_healthy);
    }

    #[tokio::test]
    async fn flush_preserves_untouched_document_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        tokio::fs::write(
            &path,
            json!({"other": [{"uuid": "o-1", "apiKey": "sk-o"}]}).to_string(),
        )
        .await
        .unwrap();

        let (store, _rx) = store_with("openai", vec![record("a")]).await;
        let mut pending = HashSet::from(["openai".to_string()]);
        flush_pending(&store, &path, &mut pending).await;

        let document = load_document(&path).await.unwrap();
        assert!(document.contains_key("other"), "foreign key must survive");
        assert_eq!(document["openai"][0].uuid, "a");
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn removed_pool_disappears_from_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        let mut pending = HashSet::from(["openai".to_string(), "ghost".to_string()]);
        flush_pending(&store, &path, &mut pending).await;

        let document = load_document(&path).await.unwrap();
        assert!(document.contains_key("openai"));
        assert!(!document.contains_key("ghost"));
    }

    #[tokio::test]
    async fn failed_write_keeps_pending_set() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so the temp-file write fails
        let path = dir.path().join("missing").join("pool.json");
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        let mut pending = HashSet::from(["openai".to_string()]);
        flush_pending(&store, &path, &mut pending).await;

        assert_eq!(store.flushes_completed(), 0);
        assert!(pending.contains("openai"), "pending must be re-queued");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pool_file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        let (store, _rx) = store_with("openai", vec![record("a")]).await;

        let mut pending = HashSet::from(["openai".to_string()]);
        flush_pending(&store, &path, &mut pending).await;

        let mode = tokio::fs::metadata(&path)
            .await
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600, "pool file must be 0600, got {mode:o}");
    }
}
