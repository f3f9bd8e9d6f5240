//! Cache command - inspect the transformation cache

use crate::cache::CacheRecord;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::cli::commands::Workspace;
use crate::error::WeftResult;
use console::style;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Execute the cache command
pub async fn execute(args: CacheArgs, workspace: &Workspace) -> WeftResult<()> {
    match args.action {
        CacheAction::Show { format } => show_cache(workspace, format),
        CacheAction::Path { file } => show_path(workspace, &file),
    }
}

/// Freshness of a record against the source on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Fresh,
    Stale,
    Missing,
}

fn freshness(record: &CacheRecord) -> Freshness {
    match fs::read(&record.source_path) {
        Ok(bytes) if record.matches_source(&bytes) => Freshness::Fresh,
        Ok(_) => Freshness::Stale,
        Err(_) => Freshness::Missing,
    }
}

fn show_cache(workspace: &Workspace, format: OutputFormat) -> WeftResult<()> {
    let context = workspace.context()?;
    let (root_dir, records) = context.with_cache(|cache| {
        if !cache.is_enabled() {
            return (cache.root_dir().to_path_buf(), None);
        }
        (cache.root_dir().to_path_buf(), Some(cache.query_all().clone()))
    });

    let Some(records) = records else {
        println!("Caching is disabled (pipeline.cache_dir is not set).");
        return Ok(());
    };

    match format {
        OutputFormat::Table => print_cache_table(&root_dir, &records),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }

    Ok(())
}

fn print_cache_table(root_dir: &Path, records: &BTreeMap<PathBuf, CacheRecord>) {
    if records.is_empty() {
        println!("No cache records found.");
        return;
    }

    println!(
        "{:<40} {:<8} {:<14} {:<20}",
        "SOURCE", "STATE", "HASH", "TRANSFORMED"
    );
    println!("{}", "-".repeat(82));

    for (source, record) in records {
        let name = source.strip_prefix(root_dir).unwrap_or(source);
        let state = match freshness(record) {
            Freshness::Fresh => style("fresh").green().to_string(),
            Freshness::Stale => style("stale").yellow().to_string(),
            Freshness::Missing => style("missing").red().to_string(),
        };
        let hash = record.source_hash.as_deref().unwrap_or("-");
        let transformed = record
            .transformed_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<40} {:<8} {:<14} {:<20}",
            name.display(),
            state,
            hash,
            transformed
        );
    }

    println!();
    println!("Total: {} record(s)", records.len());
}

fn show_path(workspace: &Workspace, file: &Path) -> WeftResult<()> {
    let source = workspace.absolute(file)?;
    let context = workspace.context()?;

    match context.with_cache(|cache| cache.get_cache_path_for_resource(&source)) {
        Some(target) if target != source => println!("{}", target.display()),
        Some(_) => println!(
            "{} is outside the root directory; it is not cached",
            source.display()
        ),
        None => println!("Caching is disabled (pipeline.cache_dir is not set)."),
    }

    Ok(())
}
