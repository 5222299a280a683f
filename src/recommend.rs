//! # Transition Recommendation Module
//!
//! The end-to-end pipeline behind `segue best` and `segue rank`:
//!
//! 1. Resolve the source track by file name, falling back to a fuzzy title
//!    match
//! 2. Lock and load the feature cache
//! 3. Analyze the source if it isn't cached
//! 4. Build the collection catalog (analyzing cache misses)
//! 5. Persist the cache if anything new was analyzed
//! 6. Rank the catalog against the source, excluding the source's title
//!
//! Only a cache that cannot be loaded, or a collection directory that cannot
//! be listed, is reported as an error. A missing source, a source that fails
//! analysis and an empty candidate list are ordinary [`TransitionReport`]
//! variants that callers must check.

use crate::algorithm::ScoringContext;
use crate::analyzer::Analyzer;
use crate::cache::{CacheLock, FeatureCache};
use crate::catalog::{self, build_catalog, find_by_filename, find_by_title};
use crate::config::RuntimeConfig;
use crate::ranker::{self, rating, reason};
use crate::song::{extract_title, CatalogEntry, TrackFeatures};
use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// The track a recommendation was made for.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    pub file_path: PathBuf,
    pub file_name: String,
    pub title: String,
    pub features: TrackFeatures,
}

/// A ranked follow-up with display data.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTransition {
    pub file_name: String,
    pub title: String,
    pub features: TrackFeatures,
    pub score: f64,
    /// 1..=10, 10 is best.
    pub rating: u8,
    pub reason: String,
}

/// Ranked transitions for one source, best first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub source: SourceTrack,
    pub transitions: Vec<RankedTransition>,
}

impl Recommendation {
    pub fn best(&self) -> &RankedTransition {
        &self.transitions[0]
    }
}

/// Outcome of a transition lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionReport {
    Found(Recommendation),
    /// No file in the collection matched the identifier.
    SourceNotFound,
    /// The source exists but the analyzer could not process it.
    SourceUnanalyzable { path: PathBuf, reason: String },
    /// Every other track was excluded or failed analysis.
    NoCandidates { source: SourceTrack },
}

/// Finds DJ transitions within one collection.
pub struct TransitionFinder<A: Analyzer> {
    collection_dir: PathBuf,
    cache_path: PathBuf,
    analyzer: A,
    context: ScoringContext,
}

impl<A: Analyzer> TransitionFinder<A> {
    pub fn new(collection_dir: impl Into<PathBuf>, cache_path: impl Into<PathBuf>, analyzer: A) -> Self {
        Self {
            collection_dir: collection_dir.into(),
            cache_path: cache_path.into(),
            analyzer,
            context: ScoringContext::default(),
        }
    }

    /// Finder using the directories from `config`.
    pub fn from_config(config: &RuntimeConfig, analyzer: A) -> Self {
        Self::new(config.collection_dir.clone(), config.cache_path.clone(), analyzer)
    }

    #[must_use]
    pub fn with_context(mut self, context: ScoringContext) -> Self {
        self.context = context;
        self
    }

    pub fn collection_dir(&self) -> &Path {
        &self.collection_dir
    }

    /// Locate a track by file name (with or without extension), then by
    /// title containment.
    pub fn resolve_source(&self, identifier: &str) -> Option<PathBuf> {
        find_by_filename(identifier, &self.collection_dir).or_else(|| {
            debug!("No file named `{identifier}', trying title match");
            find_by_title(identifier, &self.collection_dir)
        })
    }

    /// Write the cache back if it changed. Failures are logged, not fatal:
    /// the recommendation is still valid, only the next run re-analyzes.
    fn persist(cache: &mut FeatureCache) {
        match cache.save_if_dirty() {
            Ok(true) => debug!("Feature cache saved to {}", cache.path().display()),
            Ok(false) => {}
            Err(err) => warn!("Could not save feature cache: {err:#}"),
        }
    }

    /// Rank the collection as follow-ups to `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is corrupt or unreadable, or the
    /// collection directory cannot be listed.
    pub fn find_transitions(&self, identifier: &str) -> Result<TransitionReport> {
        let Some(source_path) = self.resolve_source(identifier) else {
            info!("Song `{identifier}' not found in {}", self.collection_dir.display());
            return Ok(TransitionReport::SourceNotFound);
        };

        let _lock = CacheLock::acquire(&self.cache_path)?;
        let mut cache = FeatureCache::load(&self.cache_path)?;

        let (file_path, features) = match catalog::features_for(&source_path, &mut cache, &self.analyzer) {
            Ok(found) => found,
            Err(err) => {
                warn!("Could not analyze {}: {err:#}", source_path.display());
                return Ok(TransitionReport::SourceUnanalyzable {
                    path: source_path,
                    reason: format!("{err:#}"),
                });
            }
        };

        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let source = SourceTrack {
            title: extract_title(&file_name),
            file_name,
            file_path,
            features,
        };
        info!(
            "Source: {} ({}, {:.1} BPM)",
            source.file_name,
            source.features.harmonic_code(),
            source.features.tempo()
        );

        let catalog = build_catalog(&self.collection_dir, &mut cache, &self.analyzer);
        Self::persist(&mut cache);
        let catalog = catalog?;

        Ok(self.report(source, &catalog))
    }

    fn report(&self, source: SourceTrack, catalog: &[CatalogEntry]) -> TransitionReport {
        let ranked = ranker::rank(&source.features, catalog, Some(&source.title), &self.context);
        if ranked.is_empty() {
            return TransitionReport::NoCandidates { source };
        }

        let target_code = source.features.harmonic_code();
        let target_tempo = source.features.tempo();
        let transitions = ranked
            .into_iter()
            .map(|scored| {
                let entry = scored.candidate;
                RankedTransition {
                    file_name: entry.file_name.clone(),
                    title: entry.title.clone(),
                    features: entry.features.clone(),
                    score: scored.score,
                    rating: rating(scored.score),
                    reason: reason(
                        target_code,
                        entry.features.harmonic_code(),
                        target_tempo,
                        entry.features.tempo(),
                    ),
                }
            })
            .collect();

        TransitionReport::Found(Recommendation { source, transitions })
    }

    /// File name of the best follow-up to `identifier`, or `None` when the
    /// source is missing, unanalyzable, or has no candidates.
    ///
    /// # Errors
    ///
    /// See [`TransitionFinder::find_transitions`].
    pub fn best_transition(&self, identifier: &str) -> Result<Option<String>> {
        match self.find_transitions(identifier)? {
            TransitionReport::Found(recommendation) => Ok(Some(recommendation.best().file_name.clone())),
            _ => Ok(None),
        }
    }

    /// Analyze the whole collection, filling the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be loaded or the collection
    /// directory cannot be listed.
    pub fn scan(&self) -> Result<Vec<CatalogEntry>> {
        let _lock = CacheLock::acquire(&self.cache_path)?;
        let mut cache = FeatureCache::load(&self.cache_path)?;
        let catalog = build_catalog(&self.collection_dir, &mut cache, &self.analyzer);
        Self::persist(&mut cache);
        catalog
    }
}
