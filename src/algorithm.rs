//! Transition scoring for DJ mixes.
//!
//! Scores how well a candidate track follows a target track. Lower is
//! better; 0 means same Camelot code and same tempo.

use crate::camelot::CamelotCode;
use crate::song::TrackFeatures;

/// Tunable weights for [`calculate_transition_score`].
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext {
    /// Tempo differences beyond this many BPM all score the same.
    pub tempo_cap: f64,
    /// Multiplier applied to the harmonic term.
    pub harmonic_weight: f64,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            tempo_cap: 8.0,
            harmonic_weight: 2.0,
        }
    }
}

/// How two Camelot codes relate on the wheel.
///
/// Distances are plain numeric differences between wheel numbers; `12A`
/// and `1A` are eleven apart, not adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicRelation {
    /// Either code could not be determined.
    Unknown,
    /// One major, one minor.
    DifferentMode,
    Same,
    Adjacent,
    /// Two steps apart.
    Near,
    /// Three or more steps apart.
    Distant,
}

impl HarmonicRelation {
    pub fn between(target: CamelotCode, candidate: CamelotCode) -> Self {
        match (target, candidate) {
            (
                CamelotCode::Known { number: t_num, letter: t_letter },
                CamelotCode::Known { number: c_num, letter: c_letter },
            ) => {
                if t_letter != c_letter {
                    return HarmonicRelation::DifferentMode;
                }
                match t_num.abs_diff(c_num) {
                    0 => HarmonicRelation::Same,
                    1 => HarmonicRelation::Adjacent,
                    2 => HarmonicRelation::Near,
                    _ => HarmonicRelation::Distant,
                }
            }
            _ => HarmonicRelation::Unknown,
        }
    }

    /// Unweighted harmonic term.
    pub const fn penalty(self) -> f64 {
        match self {
            HarmonicRelation::Same => 0.0,
            HarmonicRelation::Adjacent => 1.0,
            HarmonicRelation::Near => 3.0,
            HarmonicRelation::Distant => 8.0,
            HarmonicRelation::DifferentMode | HarmonicRelation::Unknown => 10.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            HarmonicRelation::Unknown => "Unknown key (avoid)",
            HarmonicRelation::DifferentMode => "Different mode",
            HarmonicRelation::Same => "Same key",
            HarmonicRelation::Adjacent => "Adjacent harmonic",
            HarmonicRelation::Near => "Good harmonic",
            HarmonicRelation::Distant => "Poor harmonic",
        }
    }
}

/// Capped absolute tempo difference.
#[inline]
fn tempo_term(target_tempo: f64, candidate_tempo: f64, cap: f64) -> f64 {
    (candidate_tempo - target_tempo).abs().min(cap)
}

/// Score `candidate` as the track to play after a target with
/// `target_tempo` and `target_code`.
///
/// ```text
/// score = min(|Δbpm|, tempo_cap) + harmonic_weight * harmonic_penalty
/// ```
///
/// With the default context the score lies in `0..=28`. An unknown
/// candidate key costs 20, which is better than a mode mismatch with a
/// far-off tempo (28) but worse than any same-mode pairing (at most 24).
///
/// # Examples
///
/// ```
/// use segue::algorithm::{calculate_transition_score, ScoringContext};
/// use segue::key::Scale;
/// use segue::song::TrackFeatures;
///
/// let target = TrackFeatures::new(128.0, "A", Scale::Minor); // 8A
/// let candidate = TrackFeatures::new(130.0, "A", Scale::Minor);
/// let score = calculate_transition_score(
///     target.tempo(),
///     target.harmonic_code(),
///     &candidate,
///     &ScoringContext::default(),
/// );
/// assert_eq!(score, 2.0);
/// ```
#[must_use]
pub fn calculate_transition_score(
    target_tempo: f64,
    target_code: CamelotCode,
    candidate: &TrackFeatures,
    context: &ScoringContext,
) -> f64 {
    let tempo = tempo_term(target_tempo, candidate.tempo(), context.tempo_cap);
    let harmonic = HarmonicRelation::between(target_code, candidate.harmonic_code()).penalty();
    tempo + harmonic * context.harmonic_weight
}
