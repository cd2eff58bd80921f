//! Turns (model probability, best price) pairs into tiered recommendations.
//!
//! All arithmetic here is pure and deterministic: given identical candidates
//! the output is byte-identical, which the end-to-end determinism tests
//! rely on.

use crate::config::{SelectionPolicy, TierThresholds};
use crate::issues::{IssueTracker, Severity, steps};
use crate::odds_book::implied_probability;
use crate::types::{BetRecommendation, MarketKey, OddsOffer, Provenance, Tier, Tour};

// Edge bands feeding the confidence rating.
const EDGE_STRONG: f64 = 0.08;
const EDGE_SOLID: f64 = 0.04;
const EDGE_THIN: f64 = 0.01;

/// A selection that has both a model probability and a best price.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tour: Tour,
    pub event_external_id: String,
    pub event_name: String,
    pub selection: String,
    pub market: MarketKey,
    pub model_prob: f64,
    pub provenance: Provenance,
    pub offer: OddsOffer,
}

/// Odds-only tier assignment. Boundary semantics are exact: 6.0 is PAR,
/// 6.01 is BIRDIE, 11.0 is BIRDIE, 61.0 is LONG_SHOTS.
pub fn tier_for(odds_decimal: f64, thresholds: &TierThresholds) -> Tier {
    if odds_decimal <= thresholds.par_max {
        Tier::Par
    } else if odds_decimal <= thresholds.birdie_max {
        Tier::Birdie
    } else if odds_decimal < thresholds.long_shot_min {
        Tier::Eagle
    } else {
        Tier::LongShots
    }
}

/// Expected profit per unit stake at the given price under the model.
pub fn expected_value(model_prob: f64, odds_decimal: f64) -> f64 {
    model_prob * (odds_decimal - 1.0) - (1.0 - model_prob)
}

/// Deterministic 1–5 confidence from edge size, provenance and sample size.
///
/// Predicted probabilities outrank simulated ones all else equal, and a
/// simulation below the iteration floor can never reach top confidence.
pub fn confidence_rating(edge: f64, provenance: Provenance, iteration_floor: u32) -> u8 {
    let base: u8 = if edge >= EDGE_STRONG {
        4
    } else if edge >= EDGE_SOLID {
        3
    } else if edge >= EDGE_THIN {
        2
    } else {
        1
    };
    match provenance {
        Provenance::Predicted => (base + 1).min(5),
        Provenance::Simulated { iterations } if iterations < iteration_floor => base.min(3),
        Provenance::Simulated { .. } => base,
    }
}

/// Apply the per-tier selection policy and produce the run's pick list,
/// globally ordered by edge (best value first).
pub fn select_recommendations(
    run_id: i64,
    candidates: Vec<Candidate>,
    thresholds: &TierThresholds,
    policy: &SelectionPolicy,
    iteration_floor: u32,
    issues: &IssueTracker,
) -> Vec<BetRecommendation> {
    let mut scored: Vec<BetRecommendation> = candidates
        .into_iter()
        .map(|c| score_candidate(run_id, c, thresholds, iteration_floor))
        .collect();

    // Stable in-tier order: edge, then confidence, then price, then name.
    scored.sort_by(|a, b| {
        b.edge
            .total_cmp(&a.edge)
            .then_with(|| b.confidence.cmp(&a.confidence))
            .then_with(|| b.odds_decimal.total_cmp(&a.odds_decimal))
            .then_with(|| a.selection.cmp(&b.selection))
            .then_with(|| a.market.as_str().cmp(b.market.as_str()))
    });

    let mut picks: Vec<BetRecommendation> = Vec::new();
    for tier in Tier::ALL {
        let tier_pool: Vec<&BetRecommendation> =
            scored.iter().filter(|r| r.tier == tier).collect();

        let mut taken: Vec<BetRecommendation> = tier_pool
            .iter()
            .filter(|r| r.edge > 0.0)
            .take(policy.max_picks_per_tier)
            .map(|r| (*r).clone())
            .collect();

        if taken.len() < policy.min_picks_per_tier && policy.allow_fallback {
            let shortfall = policy.min_picks_per_tier - taken.len();
            let fallback: Vec<BetRecommendation> = tier_pool
                .iter()
                .filter(|r| r.edge <= 0.0)
                .take(shortfall)
                .map(|r| {
                    let mut pick = (*r).clone();
                    pick.fallback = true;
                    pick.labels.push("fallback-pick".to_string());
                    pick
                })
                .collect();
            if !fallback.is_empty() {
                issues.record(
                    steps::RECOMMENDATION,
                    Severity::Info,
                    format!(
                        "tier {} backfilled with {} non-positive-edge picks",
                        tier.as_str(),
                        fallback.len()
                    ),
                );
                taken.extend(fallback);
            }
        }

        if taken.len() < policy.min_picks_per_tier {
            issues.record(
                steps::RECOMMENDATION,
                Severity::Warn,
                format!(
                    "tier {} has {} of {} required picks",
                    tier.as_str(),
                    taken.len(),
                    policy.min_picks_per_tier
                ),
            );
        }

        picks.extend(taken);
    }

    // Global report order: value first, independent of tier membership.
    picks.sort_by(|a, b| {
        b.edge
            .total_cmp(&a.edge)
            .then_with(|| b.confidence.cmp(&a.confidence))
            .then_with(|| b.odds_decimal.total_cmp(&a.odds_decimal))
            .then_with(|| a.selection.cmp(&b.selection))
            .then_with(|| a.market.as_str().cmp(b.market.as_str()))
    });
    picks
}

fn score_candidate(
    run_id: i64,
    c: Candidate,
    thresholds: &TierThresholds,
    iteration_floor: u32,
) -> BetRecommendation {
    let implied = implied_probability(c.offer.odds_decimal);
    let edge = c.model_prob - implied;
    let tier = tier_for(c.offer.odds_decimal, thresholds);
    let confidence = confidence_rating(edge, c.provenance, iteration_floor);
    BetRecommendation {
        run_id,
        tour: c.tour,
        event_external_id: c.event_external_id,
        event_name: c.event_name,
        selection: c.selection,
        market: c.market,
        tier,
        odds_decimal: c.offer.odds_decimal,
        odds_display: c.offer.odds_display,
        bookmaker: c.offer.bookmaker,
        model_prob: c.model_prob,
        implied_prob: implied,
        edge,
        expected_value: expected_value(c.model_prob, c.offer.odds_decimal),
        confidence,
        provenance: c.provenance,
        fallback: false,
        labels: vec![c.provenance.label().to_string()],
    }
}
