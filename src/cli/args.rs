//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Weft - load-time source transformation
///
/// Resolves modules the way a loader would, rewriting eligible sources
/// through the configured extensions and caching the results.
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WEFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve recorded cache copies instead of transforming
    #[arg(long, global = true)]
    pub production: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show where a module would be loaded from
    Resolve(ModuleArgs),

    /// Print the bytes the loader would receive for a module
    Load(ModuleArgs),

    /// Inspect the transformation cache
    Cache(CacheArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments naming a module
#[derive(Parser, Debug)]
pub struct ModuleArgs {
    /// Module id, e.g. net::tcp
    pub module: String,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List recorded cache entries
    Show {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print the cache location of a source file
    Path {
        /// Source file
        file: PathBuf,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["weft", "resolve", "net::tcp", "-vv", "--production"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.production);
        assert!(matches!(cli.command, Commands::Resolve(ref args) if args.module == "net::tcp"));
    }

    #[test]
    fn cache_show_defaults_to_table() {
        let cli = Cli::try_parse_from(["weft", "cache", "show"]).unwrap();
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Show { format },
            }) => assert!(matches!(format, OutputFormat::Table)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
