//! Resolver wrapper that reroutes loads through the pipeline

use crate::context::PipelineContext;
use crate::error::WeftResult;
use crate::hook::resolver::ModuleResolver;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the loader should read a module from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedModule {
    /// The original file, untouched
    Original(PathBuf),
    /// A previously transformed copy from the cache
    Cached { source: PathBuf, cache_uri: PathBuf },
    /// The original file, transformed while it is read
    Deferred(PathBuf),
}

impl ResolvedModule {
    /// Path the loader will read bytes from
    pub fn path(&self) -> &Path {
        match self {
            Self::Original(path) | Self::Deferred(path) => path,
            Self::Cached { cache_uri, .. } => cache_uri,
        }
    }

    /// Path the resolver originally returned
    pub fn source_path(&self) -> &Path {
        match self {
            Self::Original(path) | Self::Deferred(path) => path,
            Self::Cached { source, .. } => source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Original(_) => "original",
            Self::Cached { .. } => "cached",
            Self::Deferred(_) => "transform",
        }
    }
}

impl fmt::Display for ResolvedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred(path) => write!(f, "transform://{}", path.display()),
            other => write!(f, "{}", other.path().display()),
        }
    }
}

/// Wraps a host resolver without changing its contract
pub struct Interceptor {
    original: Box<dyn ModuleResolver>,
    context: Arc<PipelineContext>,
}

impl Interceptor {
    pub fn new(original: Box<dyn ModuleResolver>, context: Arc<PipelineContext>) -> Self {
        Self { original, context }
    }

    /// Resolve through the original resolver, then pick the source to serve
    pub fn resolve(&self, module_id: &str) -> Option<ResolvedModule> {
        let real_path = self.original.find_file(module_id)?;
        Some(self.context.decide(real_path))
    }

    pub fn open(&self, module: &ResolvedModule) -> WeftResult<Box<dyn Read + Send>> {
        self.context.open(module)
    }

    pub fn read(&self, module: &ResolvedModule) -> WeftResult<Vec<u8>> {
        self.context.read_module(module)
    }

    pub fn original(&self) -> &dyn ModuleResolver {
        self.original.as_ref()
    }

    pub fn context(&self) -> &Arc<PipelineContext> {
        &self.context
    }

    /// Unwrap, returning the original resolver
    pub fn into_original(self) -> Box<dyn ModuleResolver> {
        self.original
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("original", &self.original.name())
            .finish_non_exhaustive()
    }
}
