//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::cli::commands::Workspace;
use crate::error::WeftResult;

/// Execute the config command
pub async fn execute(args: ConfigArgs, workspace: &Workspace) -> WeftResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => {
            let toml = toml::to_string_pretty(&workspace.config)?;
            println!("{}", toml);
        }
        Some(ConfigAction::Path) => println!("{}", workspace.config_path.display()),
    }

    Ok(())
}
