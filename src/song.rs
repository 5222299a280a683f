//! Track data: extracted audio features and catalog entries.

use crate::camelot::{to_camelot, CamelotCode};
use crate::key::{normalize_key, Scale};
use std::path::{Path, PathBuf};

/// Features extracted from one audio file.
///
/// The harmonic code is always derived from `(key, scale)`, so there is no
/// way to build a `TrackFeatures` whose code disagrees with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFeatures {
    tempo: f64,
    key: String,
    scale: Scale,
    harmonic_code: CamelotCode,
}

impl TrackFeatures {
    /// Build features from analyzer output. The key is normalized to its
    /// sharp spelling before the Camelot lookup.
    pub fn new(tempo: f64, key: &str, scale: Scale) -> Self {
        let key = normalize_key(key);
        let harmonic_code = to_camelot(&key, scale);
        Self {
            tempo,
            key,
            scale,
            harmonic_code,
        }
    }

    /// Tempo in BPM.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn harmonic_code(&self) -> CamelotCode {
        self.harmonic_code
    }
}

/// One analyzed audio file in the collection. Built fresh from the cache
/// and the directory listing on every request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Absolute path, also the cache key.
    pub file_path: PathBuf,
    pub file_name: String,
    /// Lowercased title derived from the file name.
    pub title: String,
    pub features: TrackFeatures,
}

/// Derive a song title from a `"<Title> - <Artist>.<ext>"` file name.
///
/// Strips the extension, keeps everything before the first `" - "`, trims
/// and lowercases. This is the only notion of "same song" used when
/// excluding a track from its own recommendations.
///
/// # Examples
///
/// ```
/// use segue::song::extract_title;
///
/// assert_eq!(extract_title("Gangnam Style - PSY.mp3"), "gangnam style");
/// assert_eq!(extract_title("Intro.wav"), "intro");
/// ```
#[must_use]
pub fn extract_title(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map_or_else(|| file_name.to_string(), |s| s.to_string_lossy().into_owned());

    stem.split(" - ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
