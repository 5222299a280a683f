//! # Key Normalization Module
//!
//! Canonical spellings for musical keys. Analyzers and older cache files may
//! spell the same pitch as a flat (`Bb`) or a sharp (`A#`); everything past
//! this module only ever sees sharps, so one pitch never produces two cache
//! rows or two Camelot lookups.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The twelve canonical pitch names, sharps only.
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Map a flat spelling to its sharp equivalent.
///
/// Only the five flats `Db`, `Eb`, `Gb`, `Ab` and `Bb` are rewritten. Every
/// other input, including malformed keys, passes through untouched.
///
/// # Examples
///
/// ```
/// use segue::key::normalize_key;
///
/// assert_eq!(normalize_key("Bb"), "A#");
/// assert_eq!(normalize_key("A#"), "A#");
/// assert_eq!(normalize_key("H"), "H");
/// ```
#[must_use]
pub fn normalize_key(key: &str) -> String {
    match key {
        "Db" => "C#",
        "Eb" => "D#",
        "Gb" => "F#",
        "Ab" => "G#",
        "Bb" => "A#",
        other => other,
    }
    .to_string()
}

/// Musical mode of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Major,
    Minor,
}

impl Scale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Scale::Major => "major",
            Scale::Minor => "minor",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Scale::Major),
            "minor" => Ok(Scale::Minor),
            other => Err(anyhow!("Unknown scale `{other}', expected `major' or `minor'")),
        }
    }
}
