//! Inclusion policy
//!
//! Decides whether a resolved source file is eligible for transformation.
//! Files outside the managed root are never touched.

use std::path::{Path, PathBuf};

/// File filter for the transformation pipeline
///
/// Prefixes are compared component-wise, so `/app/src` does not claim
/// `/app/srcgen/main.rs`.
#[derive(Debug, Clone)]
pub struct InclusionPolicy {
    root_dir: PathBuf,
    source_extension: String,
    include_paths: Vec<PathBuf>,
    exclude_paths: Vec<PathBuf>,
}

impl InclusionPolicy {
    /// Create a policy accepting every source file under `root_dir`
    ///
    /// The extension may be given with or without its leading dot.
    pub fn new(root_dir: impl Into<PathBuf>, source_extension: impl Into<String>) -> Self {
        let source_extension = source_extension.into();
        Self {
            root_dir: root_dir.into(),
            source_extension: source_extension.trim_start_matches('.').to_string(),
            include_paths: Vec::new(),
            exclude_paths: Vec::new(),
        }
    }

    /// Restrict processing to files under at least one of `paths`
    pub fn with_include_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_paths = paths.into_iter().collect();
        self
    }

    /// Never process files under any of `paths`
    pub fn with_exclude_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.exclude_paths = paths.into_iter().collect();
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn source_extension(&self) -> &str {
        &self.source_extension
    }

    /// Check whether `path` should be transformed
    ///
    /// Expects an already resolved, absolute path.
    pub fn accepts(&self, path: &Path) -> bool {
        if path.extension().and_then(|e| e.to_str()) != Some(self.source_extension.as_str()) {
            return false;
        }

        // Do not touch files that are not under the root directory
        if !path.starts_with(&self.root_dir) {
            return false;
        }

        if !self.include_paths.is_empty()
            && !self.include_paths.iter().any(|inc| path.starts_with(inc))
        {
            return false;
        }

        !self.exclude_paths.iter().any(|exc| path.starts_with(exc))
    }
}
