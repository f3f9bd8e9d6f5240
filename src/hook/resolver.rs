//! Module resolvers
//!
//! A resolver is the host loader's file-resolution step: it maps a module
//! identifier to the file defining it.

use std::path::{Path, PathBuf};
use tracing::debug;

/// File-resolution step of a module loader
pub trait ModuleResolver: Send + Sync {
    /// Human-readable resolver name for logs
    fn name(&self) -> &str;

    /// Find the file defining `module_id`, None if there is none
    fn find_file(&self, module_id: &str) -> Option<PathBuf>;
}

/// Resolves `a::b::c` to `<base>/a/b/c.<ext>` or `<base>/a/b/c/mod.<ext>`
///
/// Returned paths are canonical.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    base_dir: PathBuf,
    extension: String,
}

impl DirectoryResolver {
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Module segments must be plain identifiers (no separators, no `..`)
fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ModuleResolver for DirectoryResolver {
    fn name(&self) -> &str {
        "directory"
    }

    fn find_file(&self, module_id: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = module_id.split("::").collect();
        if !segments.iter().all(|s| is_valid_segment(s)) {
            debug!("Rejecting malformed module id '{}'", module_id);
            return None;
        }

        let module_path: PathBuf = segments.iter().collect();
        let base = self.base_dir.join(module_path);
        let candidates = [
            base.with_extension(&self.extension),
            base.join(format!("mod.{}", self.extension)),
        ];

        candidates
            .iter()
            .find(|path| path.is_file())
            .and_then(|path| path.canonicalize().ok())
    }
}
