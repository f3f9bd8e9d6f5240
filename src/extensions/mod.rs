//! Built-in extensions for Rust sources
//!
//! Extensions are created through [`ExtensionKind`], a closed set of tags
//! resolved at compile time. Configuration refers to them by name.

mod entry_probe;
mod strip_asserts;

pub use entry_probe::EntryProbe;
pub use strip_asserts::StripDebugAsserts;

use crate::engine::{ExtensionRef, RustSource, TransformEngine};
use crate::error::{WeftError, WeftResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default macro invoked by the entry probe
pub const DEFAULT_PROBE_MACRO: &str = "::tracing::trace";

/// Settings shared by the built-in extensions
#[derive(Debug, Clone)]
pub struct ExtensionOptions {
    /// Path of the macro `entry-probe` inserts at function entry
    pub probe_macro: String,
}

impl Default for ExtensionOptions {
    fn default() -> Self {
        Self {
            probe_macro: DEFAULT_PROBE_MACRO.to_string(),
        }
    }
}

/// Built-in extension tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    /// Insert a probe macro call at the start of every function body
    EntryProbe,
    /// Drop `debug_assert*!` statements
    StripDebugAsserts,
}

impl ExtensionKind {
    /// All built-in extensions
    pub fn all() -> &'static [Self] {
        &[Self::EntryProbe, Self::StripDebugAsserts]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EntryProbe => "entry-probe",
            Self::StripDebugAsserts => "strip-debug-asserts",
        }
    }

    /// Construct the extension
    pub fn instantiate(&self, options: &ExtensionOptions) -> WeftResult<ExtensionRef<syn::File>> {
        match self {
            Self::EntryProbe => Ok(Arc::new(EntryProbe::new(&options.probe_macro)?)),
            Self::StripDebugAsserts => Ok(Arc::new(StripDebugAsserts)),
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ExtensionKind {
    type Err = WeftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| WeftError::InvalidExtension(format!("unknown extension '{}'", s)))
    }
}

/// Register the named built-in extensions, in order
pub fn register_named(
    engine: &TransformEngine<RustSource>,
    names: &[String],
    options: &ExtensionOptions,
) -> WeftResult<()> {
    for name in names {
        let kind: ExtensionKind = name.parse()?;
        engine.register_extension(kind.instantiate(options)?)?;
    }
    Ok(())
}
