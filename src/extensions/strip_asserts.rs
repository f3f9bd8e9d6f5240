//! Removes debug assertions from statement position

use crate::engine::Extension;
use crate::error::ExtensionFault;
use syn::visit_mut::{self, VisitMut};

/// Drops `debug_assert!`, `debug_assert_eq!` and `debug_assert_ne!`
/// statements from every block
#[derive(Debug, Clone, Copy, Default)]
pub struct StripDebugAsserts;

impl Extension<syn::File> for StripDebugAsserts {
    fn name(&self) -> &str {
        "strip-debug-asserts"
    }

    fn traverse(&self, tree: &mut syn::File) -> Result<(), ExtensionFault> {
        AssertStripper.visit_file_mut(tree);
        Ok(())
    }
}

struct AssertStripper;

fn is_debug_assert(stmt: &syn::Stmt) -> bool {
    let syn::Stmt::Macro(stmt) = stmt else {
        return false;
    };
    stmt.mac
        .path
        .segments
        .last()
        .is_some_and(|seg| seg.ident.to_string().starts_with("debug_assert"))
}

impl VisitMut for AssertStripper {
    fn visit_block_mut(&mut self, node: &mut syn::Block) {
        node.stmts.retain(|stmt| !is_debug_assert(stmt));
        visit_mut::visit_block_mut(self, node);
    }
}
