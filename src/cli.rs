//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Segue using Clap derive macros.
//!
//! ## Commands
//!
//! - `best`: Print the file name of the best transition for a song
//! - `rank`: Show the top transitions with ratings and reasons
//! - `scan`: Analyze the whole collection and warm the cache
//! - `list`: List song titles in the collection
//! - `cache`: Inspect or migrate the feature cache
//!
//! ## Examples
//!
//! ```bash
//! segue best "gangnam.mp3"
//! segue rank "Gangnam Style" --collection ~/crate
//! segue cache migrate
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Global options override the config file; each also reads a `SEGUE_*`
/// environment variable.
#[derive(Parser, Debug)]
#[command(name = "segue")]
#[command(about = "Segue: harmonic DJ transition suggestions for a local song collection")]
#[command(version)]
pub struct Args {
    /// Directory holding the audio collection
    #[arg(long, global = true, env = "SEGUE_COLLECTION")]
    pub collection: Option<PathBuf>,

    /// Feature cache file
    #[arg(long, global = true, env = "SEGUE_CACHE")]
    pub cache: Option<PathBuf>,

    /// Analyzer program (a Python interpreter with essentia and librosa)
    #[arg(long, global = true, env = "SEGUE_ANALYZER")]
    pub analyzer: Option<String>,

    /// Per-file analyzer timeout in seconds
    #[arg(long, global = true, env = "SEGUE_ANALYZER_TIMEOUT")]
    pub analyzer_timeout: Option<u64>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the file name of the best transition for a song
    ///
    /// The song is looked up by file name (with or without extension) and,
    /// failing that, by a case-insensitive title match. Prints nothing and
    /// exits non-zero when no transition is available.
    Best {
        /// File name or title of the song to transition from
        song: String,
    },

    /// Show the top transitions for a song with ratings and reasons
    Rank {
        /// File name or title of the song to transition from
        song: String,
    },

    /// Analyze every song in the collection and update the cache
    Scan,

    /// List song titles in the collection
    List,

    /// Inspect or migrate the feature cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completions
    ///
    /// Outputs shell completion script for the specified shell.
    /// Redirect output to appropriate completion file for your shell.
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// List song titles for shell completion (internal use)
    #[command(hide = true)]
    CompleteSongs,
}

/// Feature cache actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print every cached track
    Show,
    /// Upgrade legacy cache entries in place
    Migrate,
}
