//! CLI command implementations

pub mod cache;
pub mod config;
pub mod load;
pub mod resolve;

pub use cache::execute as cache;
pub use config::execute as config;
pub use load::execute as load;
pub use resolve::execute as resolve;

use crate::config::{Config, ConfigManager};
use crate::context::PipelineContext;
use crate::error::{WeftError, WeftResult};
use crate::hook::{DirectoryResolver, LoaderRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Loaded configuration and where its relative paths are anchored
#[derive(Debug, Clone)]
pub struct Workspace {
    pub config: Config,
    /// File the configuration was read from (or would be)
    pub config_path: PathBuf,
    /// Directory `root_dir` and `cache_dir` are resolved against
    pub base_dir: PathBuf,
    pub production: bool,
}

impl Workspace {
    /// Locate and load configuration
    ///
    /// An explicit path wins, then a `weft.toml` found from the current
    /// directory upwards, then the user configuration.
    pub async fn load(explicit: Option<PathBuf>, production: bool) -> WeftResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| WeftError::io("getting current directory", e))?;

        let project_config = explicit.or_else(|| ConfigManager::find_local_config(&cwd));

        let (manager, base_dir) = match project_config {
            Some(path) => {
                let base_dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
                    _ => cwd.clone(),
                };
                (ConfigManager::with_path(path), base_dir)
            }
            None => (ConfigManager::new(), cwd),
        };

        let config = manager.load().await?;
        let production = production || config.pipeline.production_mode;

        Ok(Self {
            config,
            config_path: manager.path().to_path_buf(),
            base_dir,
            production,
        })
    }

    /// Build the pipeline context for this workspace
    pub fn context(&self) -> WeftResult<Arc<PipelineContext>> {
        PipelineContext::from_config(&self.config, &self.base_dir).map(Arc::new)
    }

    /// Build the context and an activated registry resolving from the root
    pub fn activate(&self) -> WeftResult<(Arc<PipelineContext>, LoaderRegistry)> {
        let context = self.context()?;
        let policy = context.policy();

        let mut registry = LoaderRegistry::new();
        registry.register_resolver(DirectoryResolver::new(
            policy.root_dir(),
            policy.source_extension(),
        ));
        registry.activate(Arc::clone(&context), self.production)?;

        Ok((context, registry))
    }

    /// Absolute form of a user-supplied path
    pub fn absolute(&self, path: &Path) -> WeftResult<PathBuf> {
        let cwd = std::env::current_dir()
            .map_err(|e| WeftError::io("getting current directory", e))?;
        let path = cwd.join(path);
        path.canonicalize()
            .map_err(|_| WeftError::PathNotFound(path))
    }
}
