//! # Feature Cache Module
//!
//! Durable mapping from an absolute audio file path to its extracted
//! [`TrackFeatures`]. Analysis is slow, so every file is analyzed once and
//! the result kept in a single human-readable JSON file:
//!
//! ```text
//! {
//!   "/music/Strobe - Deadmau5.mp3": [128.0, "F#", "minor", "11A"],
//!   "/music/Old Entry.wav": [120.0, "Bb"]
//! }
//! ```
//!
//! ## Row Versions
//!
//! - **Current**: `[tempo, key, scale, camelot]`
//! - **Legacy**: `[tempo, key]`, written before scale detection existed
//!
//! Legacy rows are upgraded on [`FeatureCache::load`]: the key is
//! normalized, the scale defaults to major (no re-analysis) and the Camelot
//! code is derived. Current rows holding a flat key or a stale code are
//! normalized the same way. When anything was upgraded the whole file is
//! rewritten once, after all rows are processed.
//!
//! A row whose tempo is not a positive number makes the file malformed.
//!
//! ## Durability
//!
//! [`FeatureCache::save`] writes to a temporary file next to the target and
//! renames it into place, so a crash never leaves a truncated cache.
//! Concurrent processes should hold a [`CacheLock`] across
//! load-mutate-save; without it the last writer wins.

use crate::key::Scale;
use crate::song::TrackFeatures;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A cache row as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Current(f64, String, Scale, crate::camelot::CamelotCode),
    Legacy(f64, String),
}

/// What loading did to a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowUpgrade {
    Unchanged,
    /// Current shape, but a flat key or stale code was rewritten.
    Normalized,
    /// Legacy `[tempo, key]` shape.
    Migrated,
}

impl StoredEntry {
    fn tempo(&self) -> f64 {
        match self {
            StoredEntry::Current(tempo, ..) | StoredEntry::Legacy(tempo, _) => *tempo,
        }
    }

    /// Upgrade to features, reporting whether the stored row differs from
    /// what would be written back.
    ///
    /// # Errors
    ///
    /// Returns an error if the tempo is not a positive number.
    fn into_features(self, path: &str) -> Result<(TrackFeatures, RowUpgrade)> {
        let tempo = self.tempo();
        if !tempo.is_finite() || tempo <= 0.0 {
            bail!("Invalid tempo {tempo} for {path}");
        }

        match self {
            StoredEntry::Current(tempo, key, scale, stored_code) => {
                let features = TrackFeatures::new(tempo, &key, scale);
                if features.key() == key && features.harmonic_code() == stored_code {
                    return Ok((features, RowUpgrade::Unchanged));
                }
                debug!(
                    "Normalized cache row for {path}: stored {key} {stored_code}, now {} {}",
                    features.key(),
                    features.harmonic_code()
                );
                Ok((features, RowUpgrade::Normalized))
            }
            StoredEntry::Legacy(tempo, key) => {
                Ok((TrackFeatures::new(tempo, &key, Scale::Major), RowUpgrade::Migrated))
            }
        }
    }
}

impl From<&TrackFeatures> for StoredEntry {
    fn from(features: &TrackFeatures) -> Self {
        StoredEntry::Current(
            features.tempo(),
            features.key().to_string(),
            features.scale(),
            features.harmonic_code(),
        )
    }
}

/// In-memory view of the cache file.
#[derive(Debug)]
pub struct FeatureCache {
    path: PathBuf,
    entries: BTreeMap<String, TrackFeatures>,
    dirty: bool,
    migrated: usize,
}

impl FeatureCache {
    /// An empty cache that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            dirty: false,
            migrated: 0,
        }
    }

    /// Load the cache file at `path`, migrating legacy rows.
    ///
    /// A missing file yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if writing back migrated rows fails. Callers should treat this as
    /// fatal: a corrupt cache must not be silently overwritten.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut cache = Self::new(path);

        if !cache.path.exists() {
            debug!("No cache at {}, starting empty", cache.path.display());
            return Ok(cache);
        }

        let contents = fs::read_to_string(&cache.path)
            .with_context(|| format!("Failed to read feature cache {}", cache.path.display()))?;
        let stored: BTreeMap<String, StoredEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed feature cache {}", cache.path.display()))?;

        let mut normalized = 0;
        for (file, entry) in stored {
            let (features, upgrade) = entry
                .into_features(&file)
                .with_context(|| format!("Malformed feature cache {}", cache.path.display()))?;
            match upgrade {
                RowUpgrade::Unchanged => {}
                RowUpgrade::Normalized => normalized += 1,
                RowUpgrade::Migrated => cache.migrated += 1,
            }
            cache.entries.insert(file, features);
        }

        if cache.migrated > 0 || normalized > 0 {
            info!(
                "Migrated {} legacy and normalized {normalized} cache entries in {}",
                cache.migrated,
                cache.path.display()
            );
            cache.save()?;
        }

        debug!("Loaded {} cached tracks from {}", cache.len(), cache.path.display());
        Ok(cache)
    }

    /// Cached features for an absolute file path.
    pub fn get(&self, path: &str) -> Option<&TrackFeatures> {
        self.entries.get(path)
    }

    /// Insert or replace the features for `path`. Storing an identical
    /// value is a no-op.
    pub fn put(&mut self, path: impl Into<String>, features: TrackFeatures) {
        let path = path.into();
        if self.entries.get(&path) == Some(&features) {
            return;
        }
        self.entries.insert(path, features);
        self.dirty = true;
    }

    /// Rewrite the whole cache file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed.
    pub fn save(&mut self) -> Result<()> {
        let dir = parent_dir(&self.path);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;

        let stored: BTreeMap<&str, StoredEntry> = self
            .entries
            .iter()
            .map(|(path, features)| (path.as_str(), StoredEntry::from(features)))
            .collect();

        let tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary cache file in {}", dir.display()))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &stored)
                .context("Failed to serialize feature cache")?;
            writer.flush().context("Failed to write feature cache")?;
        }
        tmp.as_file()
            .sync_all()
            .context("Failed to sync feature cache")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace feature cache {}", self.path.display()))?;

        self.dirty = false;
        debug!("Saved {} cached tracks to {}", self.len(), self.path.display());
        Ok(())
    }

    /// Save only if something changed since the last load or save.
    ///
    /// # Errors
    ///
    /// See [`FeatureCache::save`].
    pub fn save_if_dirty(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Number of legacy rows upgraded by the last [`FeatureCache::load`].
    pub fn migrated(&self) -> usize {
        self.migrated
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackFeatures)> {
        self.entries.iter().map(|(path, features)| (path.as_str(), features))
    }
}

/// Directory holding `path`; `.` for bare file names.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Exclusive advisory lock guarding a cache file across load-mutate-save.
///
/// Backed by `flock(2)` on a sibling `<cache>.lock` file. Released when
/// dropped.
#[derive(Debug)]
pub struct CacheLock {
    _file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Block until the lock for `cache_path` is held.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub fn acquire(cache_path: &Path) -> Result<Self> {
        let mut name = cache_path.as_os_str().to_os_string();
        name.push(".lock");
        let path = PathBuf::from(name);

        let dir = parent_dir(&path);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open cache lock {}", path.display()))?;

        lock_exclusive(&file).with_context(|| format!("Failed to lock {}", path.display()))?;
        debug!("Acquired cache lock {}", path.display());

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // The lock is dropped with the descriptor when `CacheLock` goes away.
    let ret = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if ret == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}
