//! Disk-backed artifact cache implementation.

use crate::entry::Envelope;
use crate::key::normalize_stage;
use crate::{CacheEntry, CacheKey};
use derive_getters::Getters;
use parable_core::ParableConfig;
use parable_error::{CacheError, CacheErrorKind, ParableResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "entry";

/// Configuration for the artifact cache.
#[derive(
    Debug, Clone, Serialize, Deserialize, Getters, derive_setters::Setters, derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into))]
pub struct ArtifactCacheConfig {
    /// Directory holding one subdirectory per stage
    root: PathBuf,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ArtifactCacheConfig {
    /// Cache rooted at `root`, enabled.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enabled: default_enabled(),
        }
    }

    /// Cache settings taken from the loaded Parable configuration.
    pub fn from_config(config: &ParableConfig) -> Self {
        Self {
            root: config.storage.cache_dir.clone(),
            enabled: config.cache.enabled,
        }
    }
}

/// Cache for pipeline stage artifacts.
///
/// Entries live at `{root}/{stage}/{digest}.entry` and are written through a
/// uniquely named temporary file plus rename, so concurrent writers to the
/// same key never expose a torn entry. Any entry that cannot be read back
/// intact is reported as a miss.
///
/// # Example
///
/// ```
/// use parable_cache::{ArtifactCache, ArtifactCacheConfig, CacheKey};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let cache = ArtifactCache::open(ArtifactCacheConfig::new(dir.path())).await?;
///
/// let key = CacheKey::new("story", "守株待兔");
/// assert!(cache.get(&key).await.is_none());
///
/// cache.put(&key, "从前有个农夫。".as_bytes()).await?;
/// assert_eq!(cache.get(&key).await, Some("从前有个农夫。".as_bytes().to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    config: ArtifactCacheConfig,
}

impl ArtifactCache {
    /// Open the cache, creating its root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::DirectoryCreation`] if an enabled cache's root
    /// cannot be created.
    #[tracing::instrument(skip(config), fields(root = %config.root.display(), enabled = config.enabled))]
    pub async fn open(config: ArtifactCacheConfig) -> ParableResult<Self> {
        if config.enabled {
            tokio::fs::create_dir_all(&config.root).await.map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    config.root.display(),
                    e
                )))
            })?;
        }

        tracing::debug!("Opened artifact cache");
        Ok(Self { config })
    }

    /// Cache configuration.
    pub fn config(&self) -> &ArtifactCacheConfig {
        &self.config
    }

    /// Derive the key for `content` processed by `stage`.
    pub fn key(&self, stage: &str, content: impl AsRef<[u8]>) -> CacheKey {
        CacheKey::new(stage, content)
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.config
            .root
            .join(key.stage())
            .join(format!("{}.{}", key.digest(), ENTRY_EXTENSION))
    }

    /// Look up an entry, including its write timestamp.
    ///
    /// Missing entries and corrupted entries both return `None`; corruption is
    /// logged as a warning.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.config.enabled {
            return None;
        }

        let path = self.entry_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable cache entry, treating as miss");
                return None;
            }
        };

        let opened = serde_json::from_slice::<Envelope>(&raw)
            .map_err(|e| format!("invalid envelope: {}", e))
            .and_then(|envelope| envelope.open(key));

        match opened {
            Ok(entry) => {
                tracing::debug!(size = entry.payload().len(), "Cache hit");
                Some(entry)
            }
            Err(reason) => {
                tracing::warn!(path = %path.display(), reason = %reason, "Corrupted cache entry, treating as miss");
                None
            }
        }
    }

    /// Look up a payload.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entry(key).await.map(CacheEntry::into_payload)
    }

    /// Store a payload, overwriting any previous entry for the key.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the entry cannot be written. Callers
    /// should log it and continue; the cache is never required for correctness.
    #[tracing::instrument(skip(self, payload), fields(key = %key, size = payload.len()))]
    pub async fn put(&self, key: &CacheKey, payload: &[u8]) -> ParableResult<()> {
        if !self.config.enabled {
            tracing::debug!("Cache disabled, skipping put");
            return Ok(());
        }

        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::new(CacheErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let envelope = serde_json::to_vec(&Envelope::seal(key, payload)).map_err(|e| {
            CacheError::new(CacheErrorKind::Serialization(e.to_string()))
        })?;

        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, &envelope).await.map_err(|e| {
            CacheError::new(CacheErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(CacheError::new(CacheErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
            .into());
        }

        tracing::debug!(path = %path.display(), "Stored cache entry");
        Ok(())
    }

    /// Remove a single entry. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::Clear`] if an existing entry cannot be removed.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn remove(&self, key: &CacheKey) -> ParableResult<bool> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Removed cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::new(CacheErrorKind::Clear(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    /// Typed lookup: deserialize the payload as JSON.
    ///
    /// A payload that does not deserialize into `T` is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let payload = self.get(key).await?;
        match serde_json::from_slice(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached payload has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Typed store: serialize `value` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::Serialization`] or a write error.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> ParableResult<()> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| CacheError::new(CacheErrorKind::Serialization(e.to_string())))?;
        self.put(key, &payload).await
    }

    /// Return the cached value for `key`, or run `stage` and cache its output.
    ///
    /// Errors from `stage` propagate. Failing to store the fresh value is only
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns whatever error `stage` returns on a miss.
    pub async fn get_or_insert_with<T, F, Fut>(&self, key: &CacheKey, stage: F) -> ParableResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ParableResult<T>>,
    {
        if let Some(value) = self.get_json(key).await {
            return Ok(value);
        }

        let value = stage().await?;
        if let Err(e) = self.put_json(key, &value).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache stage output");
        }
        Ok(value)
    }

    /// Delete every entry whose stage starts with `prefix`, or all entries.
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::Clear`] if a stage directory cannot be
    /// listed or removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, prefix: Option<&str>) -> ParableResult<usize> {
        let prefix = prefix.map(normalize_stage);
        let mut removed = 0;

        for stage_dir in self.stage_dirs().await? {
            let matches = match (&prefix, stage_dir.file_name().and_then(|n| n.to_str())) {
                (None, _) => true,
                (Some(prefix), Some(name)) => name.starts_with(prefix.as_str()),
                (Some(_), None) => false,
            };
            if !matches {
                continue;
            }

            removed += count_entries(&stage_dir).await?;
            tokio::fs::remove_dir_all(&stage_dir).await.map_err(|e| {
                CacheError::new(CacheErrorKind::Clear(format!(
                    "{}: {}",
                    stage_dir.display(),
                    e
                )))
            })?;
        }

        tracing::info!(removed, "Cleared cache entries");
        Ok(removed)
    }

    /// Number of entries currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`CacheErrorKind::Clear`] if the cache directory cannot be listed.
    pub async fn len(&self) -> ParableResult<usize> {
        let mut total = 0;
        for stage_dir in self.stage_dirs().await? {
            total += count_entries(&stage_dir).await?;
        }
        Ok(total)
    }

    /// Whether the cache holds no entries.
    ///
    /// # Errors
    ///
    /// See [`ArtifactCache::len`].
    pub async fn is_empty(&self) -> ParableResult<bool> {
        Ok(self.len().await? == 0)
    }

    async fn stage_dirs(&self) -> ParableResult<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&self.config.root).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(dirs),
            Err(e) => return Err(clear_error(&self.config.root, e)),
        };

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| clear_error(&self.config.root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| clear_error(&entry.path(), e))?
                .is_dir();
            if is_dir {
                dirs.push(entry.path());
            }
        }
        Ok(dirs)
    }
}

async fn count_entries(dir: &Path) -> ParableResult<usize> {
    let mut count = 0;
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| clear_error(dir, e))?;

    while let Some(entry) = read_dir.next_entry().await.map_err(|e| clear_error(dir, e))? {
        if entry.path().extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
            count += 1;
        }
    }
    Ok(count)
}

fn clear_error(path: &Path, e: std::io::Error) -> parable_error::ParableError {
    CacheError::new(CacheErrorKind::Clear(format!("{}: {}", path.display(), e))).into()
}
