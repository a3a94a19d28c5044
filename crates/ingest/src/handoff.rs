//! Handoff of an encoded batch through the shared key-value store.

use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    async_trait::async_trait,
    sharebridge_common::Error as StoreError,
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use crate::{
    error::{IngestError, Result},
    model::Batch,
};

/// String-valued key-value store scoped to one shared-storage identity.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> sharebridge_common::Result<()>;

    async fn string(&self, key: &str) -> sharebridge_common::Result<Option<String>>;

    /// Flush pending writes so other processes see them.
    async fn synchronize(&self) -> sharebridge_common::Result<()>;
}

/// A key-value suite persisted as a JSON object at `<dir>/<suite>.json`.
///
/// Writes are buffered until [`KeyValueStore::synchronize`], which replaces
/// the file atomically.
pub struct SuiteDefaults {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl SuiteDefaults {
    /// Open (or start) the suite named `suite` under `dir`.
    pub async fn open(dir: impl AsRef<Path>, suite: &str) -> sharebridge_common::Result<Self> {
        let path = dir.as_ref().join(format!("{suite}.json"));
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                StoreError::external(format!("failed to parse {}", path.display()), e)
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = entries.len(), "opened defaults suite");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for SuiteDefaults {
    async fn set_string(&self, key: &str, value: &str) -> sharebridge_common::Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), serde_json::Value::String(value.to_owned()));
        Ok(())
    }

    async fn string(&self, key: &str) -> sharebridge_common::Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_owned))
    }

    async fn synchronize(&self) -> sharebridge_common::Result<()> {
        let body = {
            let entries = self.entries.lock().await;
            serde_json::to_vec_pretty(&*entries)
                .map_err(|e| StoreError::external("failed to encode defaults suite", e))?
        };
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &body))
            .await
            .map_err(|e| StoreError::external("defaults writer task failed", e))?
    }
}

fn write_atomic(path: &Path, body: &[u8]) -> sharebridge_common::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StoreError::message(format!("{} has no parent", path.display())))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::from(e.error))?;
    Ok(())
}

/// Writes and reads the shared batch under its fixed key.
pub struct HandoffStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl HandoffStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Encode `batch` and store it, replacing any previous batch.
    pub async fn write(&self, batch: &Batch) -> Result<()> {
        let encoded = batch.encode()?;
        self.store
            .set_string(&self.key, &encoded)
            .await
            .map_err(|source| IngestError::StoreFailed { source })?;
        self.store
            .synchronize()
            .await
            .map_err(|source| IngestError::StoreFailed { source })?;
        info!(key = %self.key, items = batch.len(), tag = %batch.redirect_tag(), "batch handed off");
        Ok(())
    }

    /// The batch currently stored, if any.
    pub async fn read(&self) -> Result<Option<Batch>> {
        let raw = self
            .store
            .string(&self.key)
            .await
            .map_err(|source| IngestError::StoreFailed { source })?;
        raw.map(|raw| Batch::decode(&raw))
            .transpose()
            .map_err(IngestError::from)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SharedMediaDescriptor, SharedMediaType};

    /// Store whose writes always fail.
    struct Broken;

    #[async_trait]
    impl KeyValueStore for Broken {
        async fn set_string(&self, _key: &str, _value: &str) -> sharebridge_common::Result<()> {
            Err(StoreError::message("read-only suite"))
        }

        async fn string(&self, _key: &str) -> sharebridge_common::Result<Option<String>> {
            Ok(None)
        }

        async fn synchronize(&self) -> sharebridge_common::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn suite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let suite = SuiteDefaults::open(dir.path(), "group.test").await.unwrap();
        suite.set_string("ShareKey", "[]").await.unwrap();
        suite.synchronize().await.unwrap();
        assert!(dir.path().join("group.test.json").exists());

        let reopened = SuiteDefaults::open(dir.path(), "group.test").await.unwrap();
        assert_eq!(reopened.string("ShareKey").await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn unsynchronized_writes_stay_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let suite = SuiteDefaults::open(dir.path(), "group.test").await.unwrap();
        suite.set_string("k", "v").await.unwrap();
        assert!(!suite.path().exists());
    }

    #[tokio::test]
    async fn other_keys_survive_a_write() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.json"), r#"{"other": 7}"#).unwrap();
        let suite = SuiteDefaults::open(dir.path(), "s").await.unwrap();
        suite.set_string("k", "v").await.unwrap();
        suite.synchronize().await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("s.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["other"], 7);
        assert_eq!(value["k"], "v");
        // Non-string values are not visible as strings.
        assert!(suite.string("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_suite_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.json"), "not json").unwrap();
        assert!(SuiteDefaults::open(dir.path(), "s").await.is_err());
    }

    #[tokio::test]
    async fn handoff_round_trips_a_batch() {
        let dir = tempfile::tempdir().unwrap();
        let suite = Arc::new(SuiteDefaults::open(dir.path(), "g").await.unwrap());
        let handoff = HandoffStore::new(suite, "ShareKey");
        assert!(handoff.read().await.unwrap().is_none());

        let batch = Batch::Media(vec![SharedMediaDescriptor::file_backed(
            "/c/a.png",
            "image/png",
            SharedMediaType::Image,
        )]);
        handoff.write(&batch).await.unwrap();
        assert_eq!(handoff.read().await.unwrap(), Some(batch));
    }

    #[tokio::test]
    async fn handoff_replaces_previous_batch() {
        let dir = tempfile::tempdir().unwrap();
        let suite = Arc::new(SuiteDefaults::open(dir.path(), "g").await.unwrap());
        let handoff = HandoffStore::new(suite, "ShareKey");
        handoff.write(&Batch::Text(vec!["one".into()])).await.unwrap();
        handoff.write(&Batch::Text(vec!["two".into()])).await.unwrap();
        assert_eq!(
            handoff.read().await.unwrap(),
            Some(Batch::Text(vec!["two".into()]))
        );
    }

    #[tokio::test]
    async fn store_failure_is_reported() {
        let handoff = HandoffStore::new(Arc::new(Broken), "ShareKey");
        let err = handoff.write(&Batch::Text(vec![])).await.unwrap_err();
        assert!(matches!(err, IngestError::StoreFailed { .. }));
    }
}
