//! Rust source backend built on `syn`

use crate::engine::SourceBackend;
use crate::error::{WeftError, WeftResult};
use quote::ToTokens;

/// Parses Rust source files into `syn::File` and prints them as tokens
///
/// Printing normalizes whitespace and turns doc comments into `#[doc]`
/// attributes; the token sequence is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustSource;

impl SourceBackend for RustSource {
    type Tree = syn::File;

    fn parse(&self, source: &str) -> WeftResult<Self::Tree> {
        syn::parse_file(source).map_err(|e| {
            let start = e.span().start();
            WeftError::Syntax {
                line: start.line,
                column: start.column + 1,
                message: e.to_string(),
            }
        })
    }

    fn print(&self, tree: &Self::Tree) -> String {
        tree.to_token_stream().to_string()
    }
}
