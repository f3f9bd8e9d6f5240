//! Loader hooks
//!
//! The registry holds the module-loading hooks in lookup order. Activation
//! wraps every resolver hook in an [`Interceptor`] so loads are routed
//! through the pipeline; deactivation restores the original resolvers.

mod interceptor;
mod resolver;

pub use interceptor::{Interceptor, ResolvedModule};
pub use resolver::{DirectoryResolver, ModuleResolver};

use crate::context::PipelineContext;
use crate::error::{WeftError, WeftResult};
use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

/// Loader that produces module bytes by its own means
pub type OpaqueLoader = Box<dyn Fn(&str) -> Option<Vec<u8>> + Send + Sync>;

/// A registered module-loading hook
pub enum LoaderHook {
    /// File-based resolver; can be intercepted
    Resolver(Box<dyn ModuleResolver>),
    /// Resolver currently routed through the pipeline
    Intercepted(Interceptor),
    /// Loader that never exposes a file; left alone by activation
    Opaque { name: String, load: OpaqueLoader },
}

impl LoaderHook {
    pub fn name(&self) -> &str {
        match self {
            Self::Resolver(resolver) => resolver.name(),
            Self::Intercepted(interceptor) => interceptor.original().name(),
            Self::Opaque { name, .. } => name,
        }
    }

    /// Resolve `module_id`; opaque hooks never resolve to a file
    pub fn resolve(&self, module_id: &str) -> Option<ResolvedModule> {
        match self {
            Self::Resolver(resolver) => {
                resolver.find_file(module_id).map(ResolvedModule::Original)
            }
            Self::Intercepted(interceptor) => interceptor.resolve(module_id),
            Self::Opaque { .. } => None,
        }
    }

    /// Load the bytes of `module_id`, None if this hook does not know it
    pub fn load(&self, module_id: &str) -> WeftResult<Option<Vec<u8>>> {
        match self {
            Self::Resolver(resolver) => match resolver.find_file(module_id) {
                Some(path) => fs::read(&path)
                    .map(Some)
                    .map_err(|e| WeftError::io(format!("reading {}", path.display()), e)),
                None => Ok(None),
            },
            Self::Intercepted(interceptor) => match interceptor.resolve(module_id) {
                Some(module) => interceptor.read(&module).map(Some),
                None => Ok(None),
            },
            Self::Opaque { load, .. } => Ok(load(module_id)),
        }
    }

    fn is_compatible(&self) -> bool {
        matches!(self, Self::Resolver(_) | Self::Intercepted(_))
    }
}

/// Ordered set of module-loading hooks
#[derive(Default)]
pub struct LoaderRegistry {
    hooks: Vec<LoaderHook>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: LoaderHook) {
        debug!("Registered loader hook {}", hook.name());
        self.hooks.push(hook);
    }

    pub fn register_resolver(&mut self, resolver: impl ModuleResolver + 'static) {
        self.register(LoaderHook::Resolver(Box::new(resolver)));
    }

    pub fn hooks(&self) -> &[LoaderHook] {
        &self.hooks
    }

    /// Route every resolver through the pipeline
    ///
    /// Hooks that are already intercepted are not wrapped again. Returns the
    /// number of newly wrapped hooks.
    pub fn activate(
        &mut self,
        context: Arc<PipelineContext>,
        production_mode: bool,
    ) -> WeftResult<usize> {
        if !self.hooks.iter().any(LoaderHook::is_compatible) {
            return Err(WeftError::Activation(
                "no module resolver is registered".to_string(),
            ));
        }

        context.set_production_mode(production_mode);

        let mut wrapped = 0;
        self.hooks = std::mem::take(&mut self.hooks)
            .into_iter()
            .map(|hook| match hook {
                LoaderHook::Resolver(resolver) => {
                    wrapped += 1;
                    LoaderHook::Intercepted(Interceptor::new(resolver, Arc::clone(&context)))
                }
                other => other,
            })
            .collect();

        info!(
            "Loader hook activated ({} wrapped, production mode {})",
            wrapped, production_mode
        );
        Ok(wrapped)
    }

    /// Restore the original resolvers; a no-op when not active
    pub fn deactivate(&mut self) {
        if !self.is_active() {
            return;
        }

        self.hooks = std::mem::take(&mut self.hooks)
            .into_iter()
            .map(|hook| match hook {
                LoaderHook::Intercepted(interceptor) => {
                    LoaderHook::Resolver(interceptor.into_original())
                }
                other => other,
            })
            .collect();
        info!("Loader hook deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.hooks
            .iter()
            .any(|hook| matches!(hook, LoaderHook::Intercepted(_)))
    }

    /// Resolve through the hooks in order; first match wins
    pub fn resolve(&self, module_id: &str) -> Option<ResolvedModule> {
        self.hooks.iter().find_map(|hook| hook.resolve(module_id))
    }

    /// Load module bytes through the hooks in order; first match wins
    pub fn load(&self, module_id: &str) -> WeftResult<Option<Vec<u8>>> {
        for hook in &self.hooks {
            if let Some(content) = hook.load(module_id)? {
                return Ok(Some(content));
            }
        }
        Ok(None)
    }
}
