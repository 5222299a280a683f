//! # Segue Performance Benchmarks
//!
//! Benchmarks for the hot paths of a transition lookup.
//!
//! ## Benchmark Categories
//!
//! - **Scoring**: Single transition scores and key lookups
//! - **Ranking**: Top-10 selection over collections of various sizes
//! - **Cache**: Loading and saving the feature cache
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench ranking
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use segue::algorithm::{self, ScoringContext};
use segue::cache::FeatureCache;
use segue::camelot;
use segue::key::{Scale, PITCH_CLASSES};
use segue::ranker;
use segue::song::{CatalogEntry, TrackFeatures};
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::TempDir;

/// Deterministic catalog spread across every key, scale and a 70-180 BPM range.
fn create_test_catalog(count: usize) -> Vec<CatalogEntry> {
    (0..count)
        .map(|i| {
            let key = PITCH_CLASSES[i % PITCH_CLASSES.len()];
            let scale = if i % 2 == 0 { Scale::Major } else { Scale::Minor };
            let tempo = 70.0 + (i * 37 % 110) as f64 + (i % 10) as f64 / 10.0;
            let file_name = format!("Track {i} - Artist {}.mp3", i % 17);
            CatalogEntry {
                file_path: PathBuf::from("/music").join(&file_name),
                title: format!("track {i}"),
                file_name,
                features: TrackFeatures::new(tempo, key, scale),
            }
        })
        .collect()
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let context = ScoringContext::default();
    let target = TrackFeatures::new(128.0, "A", Scale::Minor);
    let candidate = TrackFeatures::new(126.0, "E", Scale::Minor);

    group.bench_function("single_transition", |b| {
        b.iter(|| {
            algorithm::calculate_transition_score(
                black_box(target.tempo()),
                black_box(target.harmonic_code()),
                black_box(&candidate),
                black_box(&context),
            )
        })
    });

    group.bench_function("camelot_lookup_flat_key", |b| {
        b.iter(|| camelot::to_camelot(black_box("Bb"), black_box(Scale::Minor)))
    });

    group.finish();
}

fn benchmark_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    let context = ScoringContext::default();
    let target = TrackFeatures::new(124.0, "F#", Scale::Minor);

    for size in [10, 100, 1000, 5000] {
        let catalog = create_test_catalog(size);
        group.bench_with_input(BenchmarkId::new("rank_top_10", size), &catalog, |b, catalog| {
            b.iter(|| ranker::rank(black_box(&target), black_box(catalog), Some("track 0"), &context).len())
        });
    }

    group.finish();
}

fn benchmark_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("analysis_cache.json");

    let mut cache = FeatureCache::new(&path);
    for entry in create_test_catalog(1000) {
        cache.put(entry.file_path.to_string_lossy().into_owned(), entry.features);
    }
    cache.save().expect("Failed to save cache");

    group.bench_function("load_1000_entries", |b| {
        b.iter(|| FeatureCache::load(black_box(&path)).expect("Failed to load cache").len())
    });

    group.bench_function("save_1000_entries", |b| {
        b.iter_batched(
            || FeatureCache::load(&path).expect("Failed to load cache"),
            |mut cache| cache.save().expect("Failed to save cache"),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, benchmark_scoring, benchmark_ranking, benchmark_cache);

criterion_main!(benches);
