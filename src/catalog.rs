//! # Collection Indexer Module
//!
//! Scans a collection directory of audio files and turns it into catalog
//! entries, pulling features from the [`FeatureCache`] and falling back to
//! the [`Analyzer`] on a miss.
//!
//! ## Ordering
//!
//! Audio files are listed in file-name order. That order is the only
//! tie-break for equal transition scores and decides which file wins an
//! ambiguous [`find_by_title`] lookup, so it is fixed here rather than left
//! to the filesystem.
//!
//! ## Failure Policy
//!
//! One unreadable or unanalyzable file never aborts a scan: it is logged and
//! left out of the catalog. Features already analyzed stay in the cache.

use crate::analyzer::Analyzer;
use crate::cache::FeatureCache;
use crate::song::{extract_title, CatalogEntry, TrackFeatures};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use path_absolutize::Absolutize;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Audio file extensions the collection may contain, lowercase, no dot.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Whether `path` has a supported audio extension (case-insensitive).
pub fn is_supported_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// List supported audio files directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read collection directory {}", dir.display()))?
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry in {}: {err}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && is_supported_audio(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Absolute form of `path`, used as the cache key.
fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .with_context(|| format!("Failed to resolve absolute path for {}", path.display()))?
        .into_owned())
}

/// Cached features for `path`, analyzing and caching on a miss.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the analyzer fails.
pub fn features_for(
    path: &Path,
    cache: &mut FeatureCache,
    analyzer: &dyn Analyzer,
) -> Result<(PathBuf, TrackFeatures)> {
    let absolute = absolute_path(path)?;
    let key = absolute.to_string_lossy().into_owned();

    if let Some(features) = cache.get(&key) {
        return Ok((absolute, features.clone()));
    }

    let features = analyzer.analyze(&absolute)?;
    cache.put(key, features.clone());
    Ok((absolute, features))
}

/// Build the catalog for every audio file in `dir`.
///
/// Cache misses are analyzed and stored in `cache`; the caller decides when
/// to persist it. Files whose analysis fails are skipped.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be listed.
pub fn build_catalog(
    dir: &Path,
    cache: &mut FeatureCache,
    analyzer: &dyn Analyzer,
) -> Result<Vec<CatalogEntry>> {
    let files = list_audio_files(dir)?;
    let mut catalog = Vec::with_capacity(files.len());
    let cached_before = cache.len();

    for path in files {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match features_for(&path, cache, analyzer) {
            Ok((file_path, features)) => {
                catalog.push(CatalogEntry {
                    file_path,
                    title: extract_title(&file_name),
                    file_name,
                    features,
                });
            }
            Err(err) => {
                warn!("Skipping {file_name}: {err:#}");
            }
        }
    }

    let analyzed = cache.len() - cached_before;
    if analyzed > 0 {
        info!("Analyzed {analyzed} new tracks in {}", dir.display());
    }
    debug!("Catalog for {} has {} tracks", dir.display(), catalog.len());
    Ok(catalog)
}

/// Find a song by title, case-insensitively.
///
/// Matches when the query is contained in a file's derived title or the
/// title is contained in the query. The first match in file-name order
/// wins, so an ambiguous query resolves deterministically but not
/// necessarily to the intended song; use [`find_by_filename`] for exact
/// identity. An unreadable directory behaves like no match.
pub fn find_by_title(query: &str, dir: &Path) -> Option<PathBuf> {
    let query = query.to_lowercase();

    let files = match list_audio_files(dir) {
        Ok(files) => files,
        Err(err) => {
            warn!("{err:#}");
            return None;
        }
    };

    files.into_iter().find(|path| {
        let title = path
            .file_name()
            .map(|name| extract_title(&name.to_string_lossy()))
            .unwrap_or_default();
        title.contains(&query) || query.contains(&title)
    })
}

/// Find a song by file name.
///
/// Tries `name` as given, then `name` with each supported extension
/// appended, and returns the first path that exists. `name` must be a bare
/// file name; anything with a directory part (`../x.mp3`, `/abs/x.mp3`)
/// would escape `dir` and never matches.
pub fn find_by_filename(name: &str, dir: &Path) -> Option<PathBuf> {
    let mut components = Path::new(name).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        debug!("`{name}' is not a bare file name");
        return None;
    }

    std::iter::once(name.to_string())
        .chain(SUPPORTED_EXTENSIONS.iter().map(|ext| format!("{name}.{ext}")))
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}

/// Derived titles of every audio file in `dir`, in file-name order.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_titles(dir: &Path) -> Result<Vec<String>> {
    Ok(list_audio_files(dir)?
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| extract_title(&name.to_string_lossy()))
        .collect())
}
