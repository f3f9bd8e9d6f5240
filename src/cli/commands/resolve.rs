//! Resolve command - show how a module would be loaded

use crate::cli::args::ModuleArgs;
use crate::cli::commands::Workspace;
use crate::error::{WeftError, WeftResult};
use crate::hook::ResolvedModule;
use console::style;

/// Execute the resolve command
pub async fn execute(args: ModuleArgs, workspace: &Workspace) -> WeftResult<()> {
    let (_context, registry) = workspace.activate()?;

    let module = registry
        .resolve(&args.module)
        .ok_or_else(|| WeftError::ModuleNotFound(args.module.clone()))?;

    let kind = match module {
        ResolvedModule::Original(_) => style(module.kind()).dim(),
        ResolvedModule::Cached { .. } => style(module.kind()).green(),
        ResolvedModule::Deferred(_) => style(module.kind()).cyan(),
    };
    println!("{:<10} {}", kind, module);

    if let ResolvedModule::Cached { source, .. } = &module {
        println!("{:<10} {}", "source", source.display());
    }

    Ok(())
}
