// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Talpa CLI: index, search, and watch a markdown vault.
//!
//! ```bash
//! # Build the index and report corpus statistics
//! talpa index ~/notes
//!
//! # Ranked query with the full syntax
//! talpa search ~/notes 'tag:work "action items" -draft /dead\w+/i'
//!
//! # Keep the index live while editing
//! talpa watch ~/notes --cache ~/.cache/talpa/notes.json
//! ```

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use talpa::{
    parse_with_errors, EventCoalescer, FsVault, QueryOpts, Settings, VaultIndexer, VaultWatcher,
};

mod cli;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Index {
            vault,
            config,
            cache,
        } => run_index(&vault, config.as_deref(), cache.as_deref()).await,
        Commands::Search {
            vault,
            query,
            limit,
            config,
            json,
        } => run_search(&vault, &query, limit, config.as_deref(), json).await,
        Commands::Watch {
            vault,
            config,
            cache,
        } => run_watch(&vault, config.as_deref(), cache.as_deref()).await,
    };

    if let Err(err) = outcome {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    match config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(Settings::from_toml(&text)?)
        }
        None => Ok(Settings::default()),
    }
}

fn build_indexer(vault: &Path, settings: Settings) -> Arc<VaultIndexer> {
    let source = Arc::new(FsVault::new(vault));
    Arc::new(VaultIndexer::new(source, settings))
}

/// Two-phase cold index with a progress spinner.
async fn cold_index(indexer: &VaultIndexer) -> usize {
    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    spinner.set_message("indexing metadata...");
    let count = indexer.index_vault().await;

    spinner.set_message(format!("indexing bodies for {count} notes..."));
    indexer.run_body_pass().await;

    spinner.finish_and_clear();
    count
}

async fn run_index(
    vault: &Path,
    config: Option<&Path>,
    cache: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(config)?;
    let indexer = build_indexer(vault, settings);

    let started = Instant::now();
    let count = cold_index(&indexer).await;
    println!(
        "indexed {count} notes in {:.1?} ({})",
        started.elapsed(),
        vault.display()
    );

    if let Some(cache) = cache {
        write_cache(&indexer, cache)?;
        println!("file cache written to {}", cache.display());
    }
    Ok(())
}

async fn run_search(
    vault: &Path,
    raw: &str,
    limit: usize,
    config: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(config)?;
    let (query, issues) = parse_with_errors(raw, &settings);
    for issue in &issues {
        eprintln!("query issue at {}: {}", issue.position, issue.message);
    }

    let indexer = build_indexer(vault, settings);
    cold_index(&indexer).await;

    let index = indexer.index();
    let guard = index.read().await;
    let results = guard.query(&query, &QueryOpts::with_limit(limit))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for result in &results {
        println!("{:>8.3}  {}", result.score, result.id);
    }
    Ok(())
}

async fn run_watch(
    vault: &Path,
    config: Option<&Path>,
    cache: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(config)?;
    let coalesce = Duration::from_millis(settings.watcher.coalesce_ms);
    let indexer = build_indexer(vault, settings);

    if let Some(cache) = cache {
        if let Ok(blob) = std::fs::read_to_string(cache) {
            let loaded = indexer.load_file_cache(&blob)?;
            println!("loaded file cache ({loaded} entries)");
        }
    }

    let count = cold_index(&indexer).await;
    println!("watching {} ({count} notes); ctrl-c to stop", vault.display());

    let (tx, rx) = mpsc::unbounded_channel();
    let watcher = VaultWatcher::new(vault, tx)?;
    let coalescer = EventCoalescer::new(Arc::clone(&indexer), coalesce);
    let run = tokio::spawn(coalescer.run(rx));

    tokio::signal::ctrl_c().await?;
    drop(watcher); // closes the event channel, winding down the coalescer
    run.await?;

    if let Some(cache) = cache {
        write_cache(&indexer, cache)?;
        println!("file cache written to {}", cache.display());
    }
    Ok(())
}

fn write_cache(indexer: &VaultIndexer, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, indexer.file_cache_blob())?;
    Ok(())
}
