//! Error types for Weft
//!
//! All modules use `WeftResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Weft operations
pub type WeftResult<T> = Result<T, WeftError>;

/// Fault raised by an extension while it visits a syntax tree
pub type ExtensionFault = Box<dyn std::error::Error + Send + Sync>;

/// All errors that can occur in Weft
#[derive(Error, Debug)]
pub enum WeftError {
    // Transformation errors
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Extension '{extension}' failed: {source}")]
    Transform {
        extension: String,
        #[source]
        source: ExtensionFault,
    },

    #[error("Invalid extension: {0}")]
    InvalidExtension(String),

    // Cache errors
    #[error("Can not use cache directory {path}: {reason}")]
    CacheInit { path: PathBuf, reason: String },

    // Loader errors
    #[error("Loader hook was not activated: {0}")]
    Activation(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeftError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a syntax error without position information
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            line: 0,
            column: 0,
            message: message.into(),
        }
    }

    /// Recover a `WeftError` that travelled through an `io::Error`
    ///
    /// Readers can only report `io::Error`, so transformation failures are
    /// wrapped on the way out. Anything else becomes an `Io` error.
    pub fn from_read_error(context: impl Into<String>, err: std::io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<WeftError>()) {
            if let Some(inner) = err.into_inner() {
                if let Ok(weft) = inner.downcast::<WeftError>() {
                    return *weft;
                }
            }
            return Self::Internal("wrapped transform error was lost".to_string());
        }
        Self::io(context, err)
    }

    /// Whether this error means the module could not be loaded at all
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::Transform { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheInit { .. } => {
                Some("Create the parent directory or point pipeline.cache_dir somewhere writable")
            }
            Self::Activation(_) => Some("Register a module resolver before activating the hook"),
            Self::InvalidExtension(_) => {
                Some("Known extensions: entry-probe, strip-debug-asserts")
            }
            Self::ModuleNotFound(_) => {
                Some("Module ids are relative to pipeline.root_dir, e.g. net::tcp")
            }
            Self::ConfigInvalid { .. } => {
                Some("Fix the TOML in the file above, or pass another with --config")
            }
            _ => None,
        }
    }
}
