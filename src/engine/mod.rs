//! Transform engine
//!
//! Composes a parse -> traverse -> print pipeline from registered
//! extensions. Parsing and printing belong to a [`SourceBackend`]; the
//! engine only owns the ordered extension registry.

pub mod rust;

pub use rust::RustSource;

use crate::error::{ExtensionFault, WeftError, WeftResult};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Parser and printer for one source language
pub trait SourceBackend: Send + Sync {
    /// Syntax tree produced by `parse`
    type Tree;

    /// Parse source text, failing with `WeftError::Syntax` on invalid input
    fn parse(&self, source: &str) -> WeftResult<Self::Tree>;

    /// Print a (possibly rewritten) tree back to source text
    fn print(&self, tree: &Self::Tree) -> String;
}

/// A pluggable visitor that may inspect and rewrite the syntax tree
///
/// Hooks run in three passes over all registered extensions:
/// every `before_traverse`, then every `traverse`, then every
/// `after_traverse`, each pass in registration order.
pub trait Extension<T>: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    fn before_traverse(&self, _tree: &mut T) -> Result<(), ExtensionFault> {
        Ok(())
    }

    /// Walk the tree and apply the rewrite
    fn traverse(&self, tree: &mut T) -> Result<(), ExtensionFault>;

    fn after_traverse(&self, _tree: &mut T) -> Result<(), ExtensionFault> {
        Ok(())
    }
}

/// Object-safe view of an engine: source text in, source text out
pub trait SourceTransformer: Send + Sync {
    fn transform(&self, source: &str) -> WeftResult<String>;
}

/// Shared handle to a registered extension
pub type ExtensionRef<T> = Arc<dyn Extension<T>>;

/// Transform engine over a source backend
pub struct TransformEngine<B: SourceBackend> {
    backend: B,
    extensions: RwLock<Vec<ExtensionRef<B::Tree>>>,
}

impl<B: SourceBackend> TransformEngine<B> {
    /// Create an engine with no extensions
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            extensions: RwLock::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Append an extension to the registry
    ///
    /// Registering the same instance twice applies it twice.
    pub fn register_extension(&self, extension: ExtensionRef<B::Tree>) -> WeftResult<()> {
        if extension.name().trim().is_empty() {
            return Err(WeftError::InvalidExtension(
                "extension must have a non-empty name".to_string(),
            ));
        }

        debug!("Registered extension {}", extension.name());
        self.write_registry().push(extension);
        Ok(())
    }

    /// Remove the first registration of this exact instance, if any
    pub fn unregister_extension(&self, extension: &ExtensionRef<B::Tree>) {
        let mut registry = self.write_registry();
        if let Some(index) = registry.iter().position(|e| Arc::ptr_eq(e, extension)) {
            registry.remove(index);
            debug!("Unregistered extension {}", extension.name());
        }
    }

    /// Names of registered extensions in execution order
    pub fn extension_names(&self) -> Vec<String> {
        self.read_registry()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn extension_count(&self) -> usize {
        self.read_registry().len()
    }

    /// Parse, run every extension, and print the result
    pub fn transform(&self, source: &str) -> WeftResult<String> {
        let mut tree = self.backend.parse(source)?;

        // Snapshot so extensions never run while the registry is locked
        let extensions: Vec<_> = self.read_registry().clone();

        for ext in &extensions {
            ext.before_traverse(&mut tree).map_err(|e| fault(ext, e))?;
        }
        for ext in &extensions {
            ext.traverse(&mut tree).map_err(|e| fault(ext, e))?;
        }
        for ext in &extensions {
            ext.after_traverse(&mut tree).map_err(|e| fault(ext, e))?;
        }

        Ok(self.backend.print(&tree))
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Vec<ExtensionRef<B::Tree>>> {
        self.extensions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Vec<ExtensionRef<B::Tree>>> {
        self.extensions.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl<B: SourceBackend> SourceTransformer for TransformEngine<B> {
    fn transform(&self, source: &str) -> WeftResult<String> {
        TransformEngine::transform(self, source)
    }
}

fn fault<T>(extension: &ExtensionRef<T>, source: ExtensionFault) -> WeftError {
    WeftError::Transform {
        extension: extension.name().to_string(),
        source,
    }
}
