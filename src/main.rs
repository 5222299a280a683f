//! # Segue - Harmonic DJ Transitions
//!
//! Segue suggests which song in a local collection to mix into next, using
//! Camelot-wheel key compatibility and tempo proximity. Tempo and key are
//! detected once per file by an external analyzer and cached on disk.
//!
//! ## Usage
//!
//! ```bash
//! # Best follow-up, file name only (script friendly)
//! segue best "Gangnam Style - PSY.mp3"
//!
//! # Top 10 with ratings and reasons
//! segue rank gangnam
//!
//! # Pre-analyze the collection
//! segue scan --collection ~/crate
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::{debug, info};
use segue::analyzer::Analyzer;
use segue::cache::{CacheLock, FeatureCache};
use segue::catalog;
use segue::cli::{self, CacheAction};
use segue::completion;
use segue::config::RuntimeConfig;
use segue::recommend::{Recommendation, TransitionFinder, TransitionReport};
use std::process::ExitCode;

/// Explain a lookup that produced no recommendation on stderr.
fn report_missing<A: Analyzer>(finder: &TransitionFinder<A>, song: &str, report: &TransitionReport) -> Result<()> {
    match report {
        TransitionReport::Found(_) => {}
        TransitionReport::SourceNotFound => {
            eprintln!("Song not found: {song}");
            let titles = catalog::list_titles(finder.collection_dir())?;
            if !titles.is_empty() {
                eprintln!("Available songs:");
                for title in titles {
                    eprintln!("  {title}");
                }
            }
        }
        TransitionReport::SourceUnanalyzable { path, reason } => {
            eprintln!("Could not analyze {}: {reason}", path.display());
        }
        TransitionReport::NoCandidates { source } => {
            eprintln!("No other analyzable songs to transition to from {}", source.file_name);
        }
    }
    Ok(())
}

fn print_ranking(recommendation: &Recommendation) {
    let source = &recommendation.source;
    println!(
        "From: {} ({}, {:.1} BPM)",
        source.file_name,
        source.features.harmonic_code(),
        source.features.tempo()
    );
    println!();
    println!("{:>2}  {:>6}  {:>6}  {:>7}  {:<7}  {:<40}  Reason", "#", "Rating", "Score", "BPM", "Camelot", "File");
    for (position, transition) in recommendation.transitions.iter().enumerate() {
        println!(
            "{:>2}  {:>4}/10  {:>6.2}  {:>7.1}  {:<7}  {:<40}  {}",
            position + 1,
            transition.rating,
            transition.score,
            transition.features.tempo(),
            transition.features.harmonic_code().to_string(),
            transition.file_name,
            transition.reason
        );
    }
}

/// Main entry point for Segue.
///
/// # Logging
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=info segue rank gangnam` - Show analysis progress
/// - `RUST_LOG=segue::cache=debug segue scan` - Module-specific logging
fn main() -> Result<ExitCode> {
    env_logger::init();

    let args = cli::Args::parse();
    let config = RuntimeConfig::load()?.with_overrides(
        args.collection,
        args.cache,
        args.analyzer,
        args.analyzer_timeout,
    );
    debug!("Runtime config: {config:?}");

    match args.command {
        cli::Command::Best { song } => {
            let finder = TransitionFinder::from_config(&config, config.analyzer.build());
            let report = finder.find_transitions(&song)?;
            if let TransitionReport::Found(recommendation) = &report {
                println!("{}", recommendation.best().file_name);
            } else {
                report_missing(&finder, &song, &report)?;
                return Ok(ExitCode::FAILURE);
            }
        }
        cli::Command::Rank { song } => {
            let finder = TransitionFinder::from_config(&config, config.analyzer.build());
            let report = finder.find_transitions(&song)?;
            if let TransitionReport::Found(recommendation) = &report {
                print_ranking(recommendation);
            } else {
                report_missing(&finder, &song, &report)?;
                return Ok(ExitCode::FAILURE);
            }
        }
        cli::Command::Scan => {
            info!("Scanning {}", config.collection_dir.display());
            let finder = TransitionFinder::from_config(&config, config.analyzer.build());
            let entries = finder.scan()?;
            for entry in &entries {
                println!(
                    "{:<7} {:>7.1}  {}",
                    entry.features.harmonic_code().to_string(),
                    entry.features.tempo(),
                    entry.file_name
                );
            }
            println!("{} songs analyzed", entries.len());
        }
        cli::Command::List => {
            for title in catalog::list_titles(&config.collection_dir)? {
                println!("{title}");
            }
        }
        cli::Command::Cache { action } => {
            let _lock = CacheLock::acquire(&config.cache_path)?;
            let cache = FeatureCache::load(&config.cache_path)?;
            match action {
                CacheAction::Show => {
                    for (path, features) in cache.iter() {
                        println!(
                            "{:<7} {:>7.1}  {:<3} {:<5}  {path}",
                            features.harmonic_code().to_string(),
                            features.tempo(),
                            features.key(),
                            features.scale().as_str()
                        );
                    }
                    println!("{} entries in {}", cache.len(), cache.path().display());
                }
                CacheAction::Migrate => {
                    println!(
                        "Migrated {} legacy entries ({} total) in {}",
                        cache.migrated(),
                        cache.len(),
                        cache.path().display()
                    );
                }
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
        cli::Command::CompleteSongs => {
            completion::print_song_completions(&config.collection_dir)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
