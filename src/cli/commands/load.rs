//! Load command - print what the loader would receive

use crate::cli::args::ModuleArgs;
use crate::cli::commands::Workspace;
use crate::error::{WeftError, WeftResult};
use std::io::{self, Write};

/// Execute the load command
pub async fn execute(args: ModuleArgs, workspace: &Workspace) -> WeftResult<()> {
    let (context, registry) = workspace.activate()?;
    let flush = context.flush_on_exit();

    let content = registry
        .load(&args.module)?
        .ok_or_else(|| WeftError::ModuleNotFound(args.module.clone()))?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&content)
        .and_then(|()| stdout.flush())
        .map_err(|e| WeftError::io("writing module to stdout", e))?;

    flush.finish()
}
