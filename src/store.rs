//! Storage backends for the dataset.
//!
//! The dataset is always read and written whole. [`JsonFileStore`] keeps it in
//! a pretty-printed JSON file; [`MemoryStore`] keeps it in memory and is what
//! the tests run against.

use anyhow::{Context, Result};
use async_trait::async_trait;
use model::entities::Dataset;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

#[async_trait]
pub trait DatasetStore: Send + Sync + std::fmt::Debug {
    /// Reads the stored dataset, or `None` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<Dataset>>;

    /// Replaces the stored dataset.
    async fn save(&self, dataset: &Dataset) -> Result<()>;

    /// Human-readable location, used in logs and the health check.
    fn describe(&self) -> String;
}

/// Dataset stored as a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DatasetStore for JsonFileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<Dataset>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("Data file does not exist yet");
            return Ok(None);
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let dataset: Dataset = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        trace!(bytes = bytes.len(), "Loaded data file");
        Ok(Some(dataset))
    }

    #[instrument(skip(self, dataset), fields(path = %self.path.display()))]
    async fn save(&self, dataset: &Dataset) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let bytes = serde_json::to_vec_pretty(dataset).context("failed to serialize dataset")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        debug!(bytes = bytes.len(), "Saved data file");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// In-memory store. Can be switched into a failing mode to exercise
/// storage error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dataset: Arc<RwLock<Option<Dataset>>>,
    fail_saves: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(Some(dataset))),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every following `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn load(&self) -> Result<Option<Dataset>> {
        Ok(self.dataset.read().await.clone())
    }

    async fn save(&self, dataset: &Dataset) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("memory store is configured to fail saves");
        }
        *self.dataset.write().await = Some(dataset.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
