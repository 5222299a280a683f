//! Harmonic DJ transition suggestions for a local song collection.
//!
//! Given a song, Segue picks the track in the collection that mixes into it
//! best, using the Camelot wheel for key compatibility and tempo proximity.
//!
//! Core modules:
//! - [`key`] - Key normalization (flat to sharp) and scales
//! - [`camelot`] - Camelot wheel mapping
//! - [`cache`] - Persistent feature cache with legacy migration
//! - [`catalog`] - Collection scanning and song lookup
//! - [`algorithm`] - Transition scoring
//! - [`ranker`] - Top-10 ranking, ratings and reasons
//! - [`recommend`] - End-to-end transition lookup
//!
//! ### Supporting Modules
//!
//! - [`analyzer`] - External tempo/key detector
//! - [`song`] - Track features and catalog entries
//! - [`config`] - Runtime configuration
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use segue::analyzer::CommandAnalyzer;
//! use segue::recommend::TransitionFinder;
//! use std::time::Duration;
//!
//! let analyzer = CommandAnalyzer::python("python3", Duration::from_secs(300));
//! let finder = TransitionFinder::new("database", "analysis_cache.json", analyzer);
//!
//! match finder.best_transition("gangnam")? {
//!     Some(file) => println!("Play next: {file}"),
//!     None => println!("No transition found"),
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Scoring
//!
//! ```text
//! score = min(|Δbpm|, 8) + 2 * harmonic
//! ```
//!
//! where `harmonic` is 0 for the same Camelot code, 1 for adjacent numbers,
//! 3 for two apart, 8 for further, and 10 for a mode mismatch or an unknown
//! key. Lower is better.
//!
//! ## Error Handling
//!
//! Fallible functions return `anyhow::Result`. Only an unreadable or
//! malformed feature cache is fatal; a song that can't be analyzed is left
//! out of the catalog, and "not found" or "no candidates" are reported as
//! values, not errors.

pub mod algorithm;
pub mod analyzer;
pub mod cache;
pub mod camelot;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod key;
pub mod ranker;
pub mod recommend;
pub mod song;
