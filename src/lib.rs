//! Weft - load-time source transformation
//!
//! Intercepts module loading, rewrites eligible sources through a chain of
//! syntax-tree extensions and caches the results in a portable layout.

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod hook;
pub mod policy;
pub mod stream;

pub use context::{FlushGuard, PipelineContext};
pub use error::{WeftError, WeftResult};
