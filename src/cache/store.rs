//! Persistent source-to-cache mapping
//!
//! Records are read once at startup into the loaded layer. New records are
//! staged in memory and only hit the disk on flush.
//!
//! Not safe for concurrent writers: two processes flushing into the same
//! cache directory race, and the last writer wins.

use crate::cache::record::{CacheRecord, PathAnchors, StateFile, STATE_FORMAT_VERSION};
use crate::error::{WeftError, WeftResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the state file inside the cache directory
pub const CACHE_STATE_FILE: &str = "_file.path.cache.json";

/// Path manager for transformed sources
#[derive(Debug)]
pub struct CacheStore {
    root_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    loaded: BTreeMap<PathBuf, CacheRecord>,
    pending: BTreeMap<PathBuf, CacheRecord>,
}

impl CacheStore {
    /// Open the cache for `root_dir`
    ///
    /// A missing or empty `cache_dir` disables caching entirely.
    pub fn open(root_dir: impl Into<PathBuf>, cache_dir: Option<PathBuf>) -> WeftResult<Self> {
        let cache_dir = cache_dir.filter(|dir| !dir.as_os_str().is_empty());
        let mut store = Self {
            root_dir: root_dir.into(),
            cache_dir,
            loaded: BTreeMap::new(),
            pending: BTreeMap::new(),
        };

        if let Some(dir) = store.cache_dir.clone() {
            ensure_cache_dir(&dir)?;
            store.loaded = store.read_state(&dir.join(CACHE_STATE_FILE))?;
            debug!(
                "Opened cache {} with {} records",
                dir.display(),
                store.loaded.len()
            );
        } else {
            debug!("Caching disabled");
        }

        Ok(store)
    }

    /// Create a store with caching disabled
    pub fn disabled(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            cache_dir: None,
            loaded: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Cache directory, None when caching is disabled
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.cache_dir.is_some()
    }

    /// Path of the state file, None when caching is disabled
    pub fn state_file(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| dir.join(CACHE_STATE_FILE))
    }

    /// Map a source path to its location in the cache directory
    ///
    /// Paths outside the root directory come back unchanged.
    pub fn get_cache_path_for_resource(&self, resource: &Path) -> Option<PathBuf> {
        let cache_dir = self.cache_dir.as_ref()?;

        match resource.strip_prefix(&self.root_dir) {
            Ok(relative) => Some(cache_dir.join(relative)),
            Err(_) => Some(resource.to_path_buf()),
        }
    }

    /// Best known record for `resource`, staged records first
    pub fn query_cache_state(&self, resource: &Path) -> Option<&CacheRecord> {
        self.pending
            .get(resource)
            .or_else(|| self.loaded.get(resource))
    }

    /// Every record loaded from disk (staged records are not included)
    pub fn query_all(&self) -> &BTreeMap<PathBuf, CacheRecord> {
        &self.loaded
    }

    /// Stage a record; it is persisted on the next flush
    pub fn set_cache_state(&mut self, resource: &Path, record: CacheRecord) -> WeftResult<()> {
        let Some(cache_dir) = self.cache_dir.as_ref() else {
            return Ok(());
        };

        if let Some(uri) = record.cache_uri.as_ref() {
            if !uri.starts_with(cache_dir) {
                return Err(WeftError::PathInvalid {
                    path: uri.clone(),
                    reason: format!("cached copy must live under {}", cache_dir.display()),
                });
            }
        }

        self.pending.insert(resource.to_path_buf(), record);
        Ok(())
    }

    /// Whether there are staged records waiting for a flush
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Persist staged records together with the loaded ones
    pub fn flush_cache_state(&mut self) -> WeftResult<()> {
        let Some(cache_dir) = self.cache_dir.clone() else {
            return Ok(());
        };
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut merged = self.loaded.clone();
        merged.extend(self.pending.iter().map(|(k, v)| (k.clone(), v.clone())));

        let anchors = PathAnchors {
            root_dir: &self.root_dir,
            cache_dir: &cache_dir,
        };
        let content = serde_json::to_string_pretty(&StateFile::encode(&merged, anchors))?;

        let path = cache_dir.join(CACHE_STATE_FILE);
        let tmp = cache_dir.join(format!("{}.tmp", CACHE_STATE_FILE));
        fs::write(&tmp, content)
            .map_err(|e| WeftError::io(format!("writing cache state {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| WeftError::io(format!("replacing cache state {}", path.display()), e))?;

        info!(
            "Flushed {} new cache records to {}",
            self.pending.len(),
            path.display()
        );
        self.loaded = merged;
        self.pending.clear();
        Ok(())
    }

    /// Run `f` against the store and flush afterwards, on every exit path
    ///
    /// An error from `f` takes precedence over a flush error.
    pub fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> WeftResult<T>) -> WeftResult<T> {
        let result = f(self);
        let flushed = self.flush_cache_state();
        match (result, flushed) {
            (Err(e), Err(flush_err)) => {
                warn!("Cache flush failed after error: {}", flush_err);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(_), Err(flush_err)) => Err(flush_err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    fn read_state(&self, path: &Path) -> WeftResult<BTreeMap<PathBuf, CacheRecord>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| WeftError::io(format!("reading cache state {}", path.display()), e))?;

        let state: StateFile = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    "Ignoring corrupt cache state {}: {}",
                    path.display(),
                    e
                );
                return Ok(BTreeMap::new());
            }
        };

        if state.version != STATE_FORMAT_VERSION {
            warn!(
                "Ignoring cache state {} with unsupported version {}",
                path.display(),
                state.version
            );
            return Ok(BTreeMap::new());
        }

        let Some(cache_dir) = self.cache_dir.as_deref() else {
            return Ok(BTreeMap::new());
        };
        Ok(state.decode(PathAnchors {
            root_dir: &self.root_dir,
            cache_dir,
        }))
    }
}

/// Create the cache directory if needed
fn ensure_cache_dir(dir: &Path) -> WeftResult<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let parent = dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let writable = fs::metadata(parent)
        .map(|meta| meta.is_dir() && !meta.permissions().readonly())
        .unwrap_or(false);
    if !writable {
        return Err(WeftError::CacheInit {
            path: dir.to_path_buf(),
            reason: format!(
                "parent directory {} is not writable or does not exist",
                parent.display()
            ),
        });
    }

    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o770);
    }
    builder.create(dir).map_err(|e| WeftError::CacheInit {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })
}
