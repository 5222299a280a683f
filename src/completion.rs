//! # Shell Completion Module
//!
//! Shell completion for Segue:
//! - Generation of completion scripts for various shells via clap_complete
//! - Dynamic song-title completions read from the collection directory
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! segue completion bash > ~/.local/share/bash-completion/completions/segue
//!
//! # Titles for the `best` and `rank` arguments
//! segue complete-songs
//! ```

use crate::catalog;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use log::debug;
use std::io::{self, Write};
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Song titles available in `collection_dir`, sorted and deduplicated.
/// An unreadable collection yields no completions rather than an error.
pub fn get_song_completions(collection_dir: &Path) -> Vec<String> {
    match catalog::list_titles(collection_dir) {
        Ok(mut titles) => {
            titles.retain(|title| !title.is_empty());
            titles.sort();
            titles.dedup();
            titles
        }
        Err(err) => {
            debug!("No song completions: {err:#}");
            Vec::new()
        }
    }
}

/// Write completions one per line, quoting entries that contain whitespace.
pub fn write_song_completions<W: Write>(out: &mut W, completions: &[String]) -> io::Result<()> {
    for completion in completions {
        if completion.chars().any(char::is_whitespace) {
            writeln!(out, "\"{}\"", completion.replace('"', "\\\""))?;
        } else {
            writeln!(out, "{completion}")?;
        }
    }
    Ok(())
}

/// Print song completions for `collection_dir` to stdout.
pub fn print_song_completions(collection_dir: &Path) -> io::Result<()> {
    let completions = get_song_completions(collection_dir);
    write_song_completions(&mut io::stdout().lock(), &completions)
}
