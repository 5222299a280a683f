//! # Camelot Wheel Module
//!
//! Maps a `(key, scale)` pair to its position on the Camelot harmonic-mixing
//! wheel. Numbers run 1 to 12 around the wheel; the letter is `B` for major
//! and `A` for minor, so relative major/minor keys share a number (C major is
//! `8B`, A minor is `8A`).
//!
//! Keys that are not in the table map to [`CamelotCode::Unknown`]. That is
//! never an error: the scorer treats it as harmonically incompatible.

use crate::key::{normalize_key, Scale};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mode letter on the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CamelotLetter {
    /// Minor keys.
    A,
    /// Major keys.
    B,
}

impl CamelotLetter {
    pub const fn for_scale(scale: Scale) -> Self {
        match scale {
            Scale::Major => CamelotLetter::B,
            Scale::Minor => CamelotLetter::A,
        }
    }
}

/// A position on the Camelot wheel, or `Unknown` when the key could not be
/// placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CamelotCode {
    Known { number: u8, letter: CamelotLetter },
    Unknown,
}

impl CamelotCode {
    pub fn is_unknown(&self) -> bool {
        matches!(self, CamelotCode::Unknown)
    }
}

/// `(key, wheel number)` for major keys.
const MAJOR_WHEEL: [(&str, u8); 12] = [
    ("C", 8),
    ("C#", 3),
    ("D", 10),
    ("D#", 5),
    ("E", 12),
    ("F", 7),
    ("F#", 2),
    ("G", 9),
    ("G#", 4),
    ("A", 11),
    ("A#", 6),
    ("B", 1),
];

/// `(key, wheel number)` for minor keys.
const MINOR_WHEEL: [(&str, u8); 12] = [
    ("C", 5),
    ("C#", 12),
    ("D", 7),
    ("D#", 2),
    ("E", 9),
    ("F", 4),
    ("F#", 11),
    ("G", 6),
    ("G#", 1),
    ("A", 8),
    ("A#", 3),
    ("B", 10),
];

/// Look up the Camelot code for `key` in `scale`.
///
/// The key is normalized first, so `Bb` and `A#` land on the same code.
///
/// # Examples
///
/// ```
/// use segue::camelot::to_camelot;
/// use segue::key::Scale;
///
/// assert_eq!(to_camelot("C", Scale::Major).to_string(), "8B");
/// assert_eq!(to_camelot("A", Scale::Minor).to_string(), "8A");
/// assert!(to_camelot("H", Scale::Major).is_unknown());
/// ```
#[must_use]
pub fn to_camelot(key: &str, scale: Scale) -> CamelotCode {
    let key = normalize_key(key);
    let wheel = match scale {
        Scale::Major => &MAJOR_WHEEL,
        Scale::Minor => &MINOR_WHEEL,
    };

    wheel
        .iter()
        .find(|(name, _)| *name == key)
        .map_or(CamelotCode::Unknown, |&(_, number)| CamelotCode::Known {
            number,
            letter: CamelotLetter::for_scale(scale),
        })
}

impl fmt::Display for CamelotCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CamelotCode::Known { number, letter } => {
                let letter = match letter {
                    CamelotLetter::A => 'A',
                    CamelotLetter::B => 'B',
                };
                write!(f, "{number}{letter}")
            }
            CamelotCode::Unknown => f.write_str("Unknown"),
        }
    }
}

impl FromStr for CamelotCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "Unknown" {
            return Ok(CamelotCode::Unknown);
        }

        let letter = match s.chars().last() {
            Some('A') => CamelotLetter::A,
            Some('B') => CamelotLetter::B,
            _ => return Err(anyhow!("Invalid Camelot code `{s}': missing A/B letter")),
        };
        let number: u8 = s[..s.len() - 1]
            .parse()
            .map_err(|_| anyhow!("Invalid Camelot code `{s}': bad wheel number"))?;
        if !(1..=12).contains(&number) {
            return Err(anyhow!("Invalid Camelot code `{s}': wheel number out of range"));
        }

        Ok(CamelotCode::Known { number, letter })
    }
}

impl TryFrom<String> for CamelotCode {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CamelotCode> for String {
    fn from(code: CamelotCode) -> Self {
        code.to_string()
    }
}
