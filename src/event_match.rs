//! Reconciles externally-sourced odds bundles with internally-known tour
//! events. The confidence scoring and the accept/skip policy are separate
//! units: scoring is pure arithmetic, policy interprets scores, and neither
//! touches persistence.

use chrono::NaiveDate;

use crate::types::TourEvent;

/// Matches at or above this confidence attach odds to the event.
pub const ACCEPT_THRESHOLD: f64 = 0.8;

const NAME_WEIGHT: f64 = 0.7;
const DATE_WEIGHT: f64 = 0.3;

/// Candidate score for one (bundle, event) pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub event_index: usize,
    pub confidence: f64,
}

/// Policy verdict over a bundle's scored candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    /// Exactly one candidate cleared the threshold.
    Accept(CandidateScore),
    /// Multiple candidates cleared the threshold; never pick one arbitrarily.
    Conflict(Vec<CandidateScore>),
    /// A plausible candidate exists but confidence is below threshold.
    LowConfidence(CandidateScore),
    /// No candidate scored above zero.
    NoMatch,
}

/// Confidence in [0, 1] that an odds bundle describes this event.
///
/// Token-set name similarity dominates (weight 0.7); date proximity breaks
/// near-misses (weight 0.3). Zero name overlap means zero confidence no
/// matter how close the dates are.
pub fn match_confidence(bundle_name: &str, bundle_date: NaiveDate, event: &TourEvent) -> f64 {
    let name = name_similarity(bundle_name, &event.event_name);
    if name <= 0.0 {
        return 0.0;
    }
    let date = date_proximity(bundle_date, event.start_date, event.end_date);
    NAME_WEIGHT * name + DATE_WEIGHT * date
}

/// Case-, whitespace- and punctuation-insensitive token overlap.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.iter().filter(|t| tb.contains(*t)).count();
    let union = ta.len() + tb.len() - shared;
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// Exact-day matches (or a bundle date inside the event's date range) score
/// highest; nearby days decay quickly.
pub fn date_proximity(bundle_date: NaiveDate, event_start: NaiveDate, event_end: NaiveDate) -> f64 {
    if bundle_date >= event_start && bundle_date <= event_end {
        return 1.0;
    }
    let distance = (bundle_date - event_start)
        .num_days()
        .abs()
        .min((bundle_date - event_end).num_days().abs());
    match distance {
        0 => 1.0,
        1 => 0.6,
        2 | 3 => 0.25,
        _ => 0.0,
    }
}

/// Score a bundle against every known event for the window.
pub fn score_candidates(
    bundle_name: &str,
    bundle_date: NaiveDate,
    events: &[TourEvent],
) -> Vec<CandidateScore> {
    events
        .iter()
        .enumerate()
        .map(|(event_index, event)| CandidateScore {
            event_index,
            confidence: match_confidence(bundle_name, bundle_date, event),
        })
        .filter(|c| c.confidence > 0.0)
        .collect()
}

/// Apply the accept/skip policy to scored candidates.
pub fn decide(candidates: &[CandidateScore]) -> MatchDecision {
    let mut accepted: Vec<CandidateScore> = candidates
        .iter()
        .copied()
        .filter(|c| c.confidence >= ACCEPT_THRESHOLD)
        .collect();

    match accepted.len() {
        0 => {
            let best = candidates
                .iter()
                .copied()
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
            match best {
                Some(c) => MatchDecision::LowConfidence(c),
                None => MatchDecision::NoMatch,
            }
        }
        1 => MatchDecision::Accept(accepted.remove(0)),
        _ => {
            accepted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            MatchDecision::Conflict(accepted)
        }
    }
}

fn name_tokens(raw: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            cleaned.extend(ch.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    let mut tokens: Vec<String> = cleaned
        .split_whitespace()
        .filter(|w| !matches!(*w, "the" | "a" | "an" | "at" | "of" | "by" | "and" | "presented"))
        .map(|w| w.to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}
