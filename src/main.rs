//! Weft - load-time source transformation
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use weft::cli::commands::Workspace;
use weft::cli::{Cli, Commands};
use weft::error::WeftResult;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> WeftResult<()> {
    let cli = Cli::parse();

    // Load configuration first: it selects the log format
    let workspace = Workspace::load(cli.config.clone(), cli.production).await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("weft=warn"),
        1 => EnvFilter::new("weft=info"),
        _ => EnvFilter::new("weft=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if workspace.config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Using config {}", workspace.config_path.display());

    match cli.command {
        Commands::Resolve(args) => weft::cli::commands::resolve(args, &workspace).await,
        Commands::Load(args) => weft::cli::commands::load(args, &workspace).await,
        Commands::Cache(args) => weft::cli::commands::cache(args, &workspace).await,
        Commands::Config(args) => weft::cli::commands::config(args, &workspace).await,
    }
}
