//! Function entry instrumentation

use crate::engine::Extension;
use crate::error::{ExtensionFault, WeftError, WeftResult};
use quote::ToTokens;
use syn::visit_mut::{self, VisitMut};

/// Inserts `<probe>!("enter <label>");` as the first statement of every
/// function and method body
///
/// Methods and trait default methods are labelled `Type::method`, free
/// functions by name. `const fn` bodies are left alone.
#[derive(Debug, Clone)]
pub struct EntryProbe {
    /// Macro path, validated on construction
    probe: String,
}

impl EntryProbe {
    /// Create a probe invoking the macro at `probe_macro`
    pub fn new(probe_macro: &str) -> WeftResult<Self> {
        let path = parse_probe(probe_macro).map_err(|e| {
            WeftError::InvalidExtension(format!(
                "entry-probe macro '{}' is not a path: {}",
                probe_macro, e
            ))
        })?;
        Ok(Self {
            probe: path.to_token_stream().to_string(),
        })
    }

    pub fn probe_macro(&self) -> &str {
        &self.probe
    }
}

fn parse_probe(probe_macro: &str) -> syn::Result<syn::Path> {
    syn::parse_str::<syn::Path>(probe_macro)
}

impl Extension<syn::File> for EntryProbe {
    fn name(&self) -> &str {
        "entry-probe"
    }

    fn traverse(&self, tree: &mut syn::File) -> Result<(), ExtensionFault> {
        // `syn::Path` is neither Send nor Sync
        let probe = parse_probe(&self.probe)?;
        let mut visitor = ProbeVisitor {
            probe: &probe,
            owner: Vec::new(),
        };
        visitor.visit_file_mut(tree);
        Ok(())
    }
}

struct ProbeVisitor<'a> {
    probe: &'a syn::Path,
    /// Stack of enclosing impl self types and trait names
    owner: Vec<String>,
}

impl ProbeVisitor<'_> {
    fn probe_stmt(&self, label: &str) -> syn::Stmt {
        let probe = self.probe;
        let message = format!("enter {}", label);
        syn::parse_quote! { #probe!(#message); }
    }

    fn method_label(&self, ident: &syn::Ident) -> String {
        match self.owner.last() {
            Some(owner) => format!("{}::{}", owner, ident),
            None => ident.to_string(),
        }
    }
}

impl VisitMut for ProbeVisitor<'_> {
    fn visit_item_impl_mut(&mut self, node: &mut syn::ItemImpl) {
        let ty = match node.self_ty.as_ref() {
            syn::Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|seg| seg.ident.to_string())
                .unwrap_or_default(),
            other => other.to_token_stream().to_string(),
        };
        self.owner.push(ty);
        visit_mut::visit_item_impl_mut(self, node);
        self.owner.pop();
    }

    fn visit_item_trait_mut(&mut self, node: &mut syn::ItemTrait) {
        self.owner.push(node.ident.to_string());
        visit_mut::visit_item_trait_mut(self, node);
        self.owner.pop();
    }

    fn visit_item_fn_mut(&mut self, node: &mut syn::ItemFn) {
        // Recurse first so nested functions get their own probes
        visit_mut::visit_item_fn_mut(self, node);
        if node.sig.constness.is_some() {
            return;
        }
        let stmt = self.probe_stmt(&node.sig.ident.to_string());
        node.block.stmts.insert(0, stmt);
    }

    fn visit_impl_item_fn_mut(&mut self, node: &mut syn::ImplItemFn) {
        visit_mut::visit_impl_item_fn_mut(self, node);
        if node.sig.constness.is_some() {
            return;
        }
        let stmt = self.probe_stmt(&self.method_label(&node.sig.ident));
        node.block.stmts.insert(0, stmt);
    }

    fn visit_trait_item_fn_mut(&mut self, node: &mut syn::TraitItemFn) {
        visit_mut::visit_trait_item_fn_mut(self, node);
        if node.sig.constness.is_some() {
            return;
        }
        let stmt = self.probe_stmt(&self.method_label(&node.sig.ident));
        if let Some(body) = node.default.as_mut() {
            body.stmts.insert(0, stmt);
        }
    }
}
