//! Pipeline context
//!
//! One context is built at startup and shared by every loader hook. It
//! owns the engine, the cache store and the inclusion policy.

use crate::cache::{CacheRecord, CacheStore};
use crate::config::Config;
use crate::engine::{RustSource, SourceTransformer, TransformEngine};
use crate::error::{WeftError, WeftResult};
use crate::extensions::{self, ExtensionOptions};
use crate::hook::ResolvedModule;
use crate::policy::InclusionPolicy;
use crate::stream::DeferredTransformReader;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Shared state of the transformation pipeline
pub struct PipelineContext {
    engine: Arc<dyn SourceTransformer>,
    cache: Mutex<CacheStore>,
    policy: InclusionPolicy,
    production_mode: AtomicBool,
}

impl PipelineContext {
    pub fn new(
        engine: Arc<dyn SourceTransformer>,
        cache: CacheStore,
        policy: InclusionPolicy,
    ) -> Self {
        Self {
            engine,
            cache: Mutex::new(cache),
            policy,
            production_mode: AtomicBool::new(false),
        }
    }

    /// Build a context from configuration
    ///
    /// Relative root and cache directories are resolved against `base_dir`,
    /// include and exclude paths against the root directory. A cache
    /// directory inside the root is always excluded from processing.
    pub fn from_config(config: &Config, base_dir: &Path) -> WeftResult<Self> {
        let pipeline = &config.pipeline;

        let root_path = base_dir.join(&pipeline.root_dir);
        let root_dir = root_path
            .canonicalize()
            .map_err(|_| WeftError::PathNotFound(root_path.clone()))?;

        let cache_dir = pipeline
            .cache_dir
            .as_ref()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| base_dir.join(dir));
        let cache = CacheStore::open(&root_dir, cache_dir)?;

        let mut exclude_paths: Vec<PathBuf> = pipeline
            .exclude_paths
            .iter()
            .map(|p| root_dir.join(p))
            .collect();
        if let Some(dir) = cache.cache_dir() {
            let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
            if dir.starts_with(&root_dir) {
                exclude_paths.push(dir);
            }
        }

        let policy = InclusionPolicy::new(&root_dir, pipeline.source_extension.clone())
            .with_include_paths(pipeline.include_paths.iter().map(|p| root_dir.join(p)))
            .with_exclude_paths(exclude_paths);

        let engine = TransformEngine::new(RustSource);
        let options = ExtensionOptions {
            probe_macro: config.extensions.probe_macro.clone(),
        };
        extensions::register_named(&engine, &config.extensions.enabled, &options)?;
        debug!("Pipeline extensions: {:?}", engine.extension_names());

        let context = Self::new(Arc::new(engine), cache, policy);
        context.set_production_mode(pipeline.production_mode);
        Ok(context)
    }

    pub fn policy(&self) -> &InclusionPolicy {
        &self.policy
    }

    pub fn transformer(&self) -> &Arc<dyn SourceTransformer> {
        &self.engine
    }

    pub fn set_production_mode(&self, enabled: bool) {
        self.production_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn is_production_mode(&self) -> bool {
        self.production_mode.load(Ordering::Relaxed)
    }

    /// Run `f` with exclusive access to the cache store
    pub fn with_cache<T>(&self, f: impl FnOnce(&mut CacheStore) -> T) -> T {
        f(&mut self.lock_cache())
    }

    /// Decide how the loader should read `real_path`
    pub fn decide(&self, real_path: PathBuf) -> ResolvedModule {
        if self.is_production_mode() {
            let cached = self.with_cache(|cache| {
                cache
                    .query_cache_state(&real_path)
                    .and_then(|record| record.cache_uri.clone())
            });
            if let Some(cache_uri) = cached {
                debug!("Serving cached copy of {}", real_path.display());
                return ResolvedModule::Cached {
                    source: real_path,
                    cache_uri,
                };
            }
        }

        if self.policy.accepts(&real_path) {
            debug!("Deferring transform of {}", real_path.display());
            return ResolvedModule::Deferred(real_path);
        }

        debug!("Passing through {}", real_path.display());
        ResolvedModule::Original(real_path)
    }

    /// Open a resolved module for reading
    pub fn open(self: &Arc<Self>, module: &ResolvedModule) -> WeftResult<Box<dyn Read + Send>> {
        match module {
            ResolvedModule::Original(path) | ResolvedModule::Cached { cache_uri: path, .. } => {
                Ok(Box::new(open_file(path)?))
            }
            ResolvedModule::Deferred(path) => {
                let file = BufReader::new(open_file(path)?);
                let context = Arc::clone(self);
                let source = path.clone();
                let reader = DeferredTransformReader::new(file, Arc::clone(&self.engine))
                    .on_complete(Box::new(move |input: &[u8], output: &[u8]| {
                        context.materialize(&source, input, output);
                    }));
                Ok(Box::new(reader))
            }
        }
    }

    /// Read a resolved module to the end
    pub fn read_module(self: &Arc<Self>, module: &ResolvedModule) -> WeftResult<Vec<u8>> {
        let mut reader = self.open(module)?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content).map_err(|e| {
            WeftError::from_read_error(format!("reading {}", module.path().display()), e)
        })?;
        Ok(content)
    }

    /// Persist staged cache records
    pub fn flush(&self) -> WeftResult<()> {
        self.lock_cache().flush_cache_state()
    }

    /// Guard that flushes the cache when the owning scope ends
    pub fn flush_on_exit(self: &Arc<Self>) -> FlushGuard {
        FlushGuard {
            context: Some(Arc::clone(self)),
        }
    }

    /// Write the transformed copy into the cache and stage its record
    ///
    /// Failures are logged: the load itself already succeeded.
    fn materialize(&self, source: &Path, input: &[u8], output: &[u8]) {
        let mut cache = self.lock_cache();
        let Some(target) = cache.get_cache_path_for_resource(source) else {
            return;
        };

        let inside_cache = cache.cache_dir().is_some_and(|dir| target.starts_with(dir));
        if !inside_cache || target == source {
            debug!("Not caching {}: outside the root directory", source.display());
            return;
        }

        if let Err(e) = write_cache_copy(&target, output) {
            warn!("Failed to cache {}: {}", source.display(), e);
            return;
        }

        let record = CacheRecord::materialized(source, target, input);
        if let Err(e) = cache.set_cache_state(source, record) {
            warn!("Failed to record cache entry for {}: {}", source.display(), e);
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, CacheStore> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn open_file(path: &Path) -> WeftResult<File> {
    File::open(path).map_err(|e| WeftError::io(format!("opening {}", path.display()), e))
}

fn write_cache_copy(target: &Path, content: &[u8]) -> WeftResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| WeftError::io(format!("creating {}", parent.display()), e))?;
    }
    fs::write(target, content)
        .map_err(|e| WeftError::io(format!("writing {}", target.display()), e))
}

/// Flushes the pipeline cache when dropped
///
/// Use [`FlushGuard::finish`] to observe flush errors; on drop they are
/// only logged.
#[must_use = "the cache is flushed when the guard is dropped"]
pub struct FlushGuard {
    context: Option<Arc<PipelineContext>>,
}

impl FlushGuard {
    /// Flush now and report the outcome
    pub fn finish(mut self) -> WeftResult<()> {
        match self.context.take() {
            Some(context) => context.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            if let Err(e) = context.flush() {
                warn!("Failed to flush cache state: {}", e);
            }
        }
    }
}
