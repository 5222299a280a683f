//! # Transition Ranking Module
//!
//! Turns per-candidate scores into a recommendation list:
//!
//! 1. Drop every candidate whose derived title equals the target's title
//!    (exact equality, so `"gangnam (remix)"` survives an exclusion of
//!    `"gangnam"`).
//! 2. Score the rest with [`calculate_transition_score`].
//! 3. Stable-sort ascending and keep the first [`TOP_K`].
//!
//! Equal scores keep catalog order, which is file-name order.
//!
//! Ratings and reasons are presentation helpers for the CLI and downstream
//! tools; they don't influence ordering.

use crate::algorithm::{calculate_transition_score, HarmonicRelation, ScoringContext};
use crate::camelot::CamelotCode;
use crate::song::{CatalogEntry, TrackFeatures};

/// Maximum number of ranked candidates returned.
pub const TOP_K: usize = 10;

/// A catalog entry with its transition score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a CatalogEntry,
    pub score: f64,
}

/// Rank `catalog` as follow-ups to `target`.
///
/// Returns at most [`TOP_K`] candidates, best (lowest score) first.
#[must_use]
pub fn rank<'a>(
    target: &TrackFeatures,
    catalog: &'a [CatalogEntry],
    exclude_title: Option<&str>,
    context: &ScoringContext,
) -> Vec<ScoredCandidate<'a>> {
    let mut scored: Vec<ScoredCandidate<'a>> = catalog
        .iter()
        .filter(|entry| exclude_title != Some(entry.title.as_str()))
        .map(|entry| ScoredCandidate {
            candidate: entry,
            score: calculate_transition_score(
                target.tempo(),
                target.harmonic_code(),
                &entry.features,
                context,
            ),
        })
        .collect();

    // `sort_by` is stable, ties stay in catalog order.
    scored.sort_by(|a, b| a.score.total_cmp(&b.score));
    scored.truncate(TOP_K);
    scored
}

/// The single best follow-up, or `None` when nothing is left after
/// exclusion.
#[must_use]
pub fn best<'a>(
    target: &TrackFeatures,
    catalog: &'a [CatalogEntry],
    exclude_title: Option<&str>,
    context: &ScoringContext,
) -> Option<ScoredCandidate<'a>> {
    rank(target, catalog, exclude_title, context).into_iter().next()
}

/// Convert a transition score to a 1..=10 rating, 10 being best.
#[must_use]
pub fn rating(score: f64) -> u8 {
    if score <= 0.5 {
        10
    } else if score <= 1.5 {
        9
    } else if score <= 2.5 {
        8
    } else if score <= 3.5 {
        7
    } else if score <= 4.5 {
        6
    } else if score <= 5.5 {
        5
    } else if score <= 6.5 {
        4
    } else if score <= 7.5 {
        3
    } else if score <= 8.5 {
        2
    } else {
        1
    }
}

/// Signed tempo change, rounded to whole BPM.
fn tempo_delta_text(target_tempo: f64, candidate_tempo: f64) -> String {
    let delta = (candidate_tempo - target_tempo).round() as i64;
    if delta == 0 {
        "same BPM".to_string()
    } else {
        format!("{delta:+} BPM")
    }
}

/// Human-readable explanation of a transition, e.g.
/// `"Adjacent harmonic (-8 BPM)"`.
///
/// The harmonic label follows the same distance rule as scoring; the tempo
/// part is the raw, uncapped difference.
#[must_use]
pub fn reason(
    target_code: CamelotCode,
    candidate_code: CamelotCode,
    target_tempo: f64,
    candidate_tempo: f64,
) -> String {
    let relation = HarmonicRelation::between(target_code, candidate_code);
    format!(
        "{} ({})",
        relation.label(),
        tempo_delta_text(target_tempo, candidate_tempo)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Scale;
    use std::path::PathBuf;

    fn entry(file_name: &str, tempo: f64, key: &str, scale: Scale) -> CatalogEntry {
        CatalogEntry {
            file_path: PathBuf::from("/music").join(file_name),
            file_name: file_name.to_string(),
            title: crate::song::extract_title(file_name),
            features: TrackFeatures::new(tempo, key, scale),
        }
    }

    fn names<'a>(ranked: &[ScoredCandidate<'a>]) -> Vec<&'a str> {
        ranked.iter().map(|s| s.candidate.file_name.as_str()).collect()
    }

    #[test]
    fn test_worked_example_order() {
        let target = TrackFeatures::new(128.0, "A", Scale::Minor);
        let catalog = vec![
            entry("B - Two.mp3", 120.0, "E", Scale::Minor),
            entry("A - One.mp3", 130.0, "A", Scale::Minor),
        ];
        let ranked = rank(&target, &catalog, None, &ScoringContext::default());
        assert_eq!(names(&ranked), vec!["A - One.mp3", "B - Two.mp3"]);
        assert_eq!(ranked[0].score, 2.0);
        assert_eq!(ranked[1].score, 10.0);
    }

    #[test]
    fn test_self_exclusion_is_exact() {
        let target = TrackFeatures::new(120.0, "C", Scale::Major);
        let catalog = vec![
            entry("gangnam - psy.mp3", 120.0, "C", Scale::Major),
            entry("gangnam (remix) - psy.mp3", 121.0, "C", Scale::Major),
            entry("Gangnam - PSY.wav", 120.0, "C", Scale::Major),
        ];
        let ranked = rank(&target, &catalog, Some("gangnam"), &ScoringContext::default());
        assert_eq!(names(&ranked), vec!["gangnam (remix) - psy.mp3"]);
    }

    #[test]
    fn test_top_ten_cap() {
        let target = TrackFeatures::new(100.0, "A", Scale::Minor);
        // Tempo offsets 0.0, 0.5, ... 7.0 give 15 distinct scores.
        let catalog: Vec<CatalogEntry> = (0..15)
            .rev()
            .map(|i| entry(&format!("Song {i:02}.mp3"), 100.0 + f64::from(i) * 0.5, "A", Scale::Minor))
            .collect();

        let ranked = rank(&target, &catalog, None, &ScoringContext::default());
        assert_eq!(ranked.len(), TOP_K);
        assert!(ranked.windows(2).all(|pair| pair[0].score < pair[1].score));
        assert_eq!(ranked[0].candidate.file_name, "Song 00.mp3");
        assert_eq!(ranked[9].candidate.file_name, "Song 09.mp3");
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let target = TrackFeatures::new(128.0, "A", Scale::Minor);
        let catalog = vec![
            entry("c.mp3", 126.0, "A", Scale::Minor),
            entry("a.mp3", 130.0, "A", Scale::Minor),
            entry("b.mp3", 128.0, "E", Scale::Minor),
        ];
        let ranked = rank(&target, &catalog, None, &ScoringContext::default());
        assert_eq!(names(&ranked), vec!["c.mp3", "a.mp3", "b.mp3"]);
    }

    #[test]
    fn test_reordering_catalog_keeps_individual_scores() {
        let target = TrackFeatures::new(128.0, "A", Scale::Minor);
        let mut catalog = vec![
            entry("x.mp3", 140.0, "C", Scale::Major),
            entry("y.mp3", 127.0, "B", Scale::Minor),
            entry("z.mp3", 128.0, "??", Scale::Minor),
        ];
        let context = ScoringContext::default();
        let score_of = |ranked: &[ScoredCandidate<'_>], name: &str| {
            ranked.iter().find(|s| s.candidate.file_name == name).unwrap().score
        };

        let forward: Vec<(String, f64)> = {
            let ranked = rank(&target, &catalog, None, &context);
            ["x.mp3", "y.mp3", "z.mp3"]
                .iter()
                .map(|n| (n.to_string(), score_of(&ranked, n)))
                .collect()
        };
        catalog.reverse();
        let ranked = rank(&target, &catalog, None, &context);
        for (name, s) in forward {
            assert_eq!(score_of(&ranked, &name), s);
        }
    }

    #[test]
    fn test_best_and_empty() {
        let target = TrackFeatures::new(128.0, "A", Scale::Minor);
        let context = ScoringContext::default();
        assert!(best(&target, &[], None, &context).is_none());

        let catalog = vec![entry("only - me.mp3", 128.0, "A", Scale::Minor)];
        assert!(best(&target, &catalog, Some("only"), &context).is_none());
        let winner = best(&target, &catalog, None, &context).unwrap();
        assert_eq!(winner.candidate.file_name, "only - me.mp3");
        assert_eq!(winner.score, 0.0);
    }

    #[test]
    fn test_rating_ladder_boundaries() {
        assert_eq!(rating(0.0), 10);
        assert_eq!(rating(0.5), 10);
        assert_eq!(rating(0.51), 9);
        assert_eq!(rating(1.5), 9);
        assert_eq!(rating(2.0), 8);
        assert_eq!(rating(3.5), 7);
        assert_eq!(rating(4.5), 6);
        assert_eq!(rating(5.5), 5);
        assert_eq!(rating(6.5), 4);
        assert_eq!(rating(7.5), 3);
        assert_eq!(rating(8.5), 2);
        assert_eq!(rating(8.51), 1);
        assert_eq!(rating(28.0), 1);

        let mut previous = rating(0.0);
        for step in 1..100 {
            let current = rating(f64::from(step) * 0.1);
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn test_reason_strings() {
        let code = |s: &str| s.parse::<CamelotCode>().unwrap();

        assert_eq!(reason(code("8A"), code("8A"), 128.0, 128.0), "Same key (same BPM)");
        assert_eq!(reason(code("8A"), code("9A"), 128.0, 120.0), "Adjacent harmonic (-8 BPM)");
        assert_eq!(reason(code("8A"), code("10A"), 128.0, 131.6), "Good harmonic (+4 BPM)");
        assert_eq!(reason(code("8A"), code("12A"), 128.0, 140.0), "Poor harmonic (+12 BPM)");
        assert_eq!(reason(code("8A"), code("8B"), 128.0, 128.2), "Different mode (same BPM)");
        assert_eq!(
            reason(code("8A"), CamelotCode::Unknown, 128.0, 100.0),
            "Unknown key (avoid) (-28 BPM)"
        );
    }
}
