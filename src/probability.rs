//! Produces per-player market probabilities for one event.
//!
//! Vendor pre-tournament predictions are used verbatim when the provider has
//! them; simulation fills every gap (missing players, missing feeds, and the
//! first-round-leader market, which the prediction payload never carries).

use std::collections::{HashMap, HashSet};

use crate::config::SimulationConfig;
use crate::error::FetchOutcome;
use crate::issues::{IssueTracker, Severity, steps};
use crate::provider::PredictionRow;
use crate::simulate::{SimPlayer, simulate_event};
use crate::types::{
    MarketKey, ProbabilityResult, Provenance, canonical_player_name,
};

const PREDICTED_MARKETS: [MarketKey; 5] = [
    MarketKey::Win,
    MarketKey::Top5,
    MarketKey::Top10,
    MarketKey::Top20,
    MarketKey::MakeCut,
];

/// Build the probability set for one event's active field.
///
/// `active` holds canonical player names; `ratings` maps canonical name to
/// skill rating. Returns nothing for an empty field — absent data is never
/// fabricated as zeros.
pub fn build_event_probabilities(
    event_label: &str,
    active: &[String],
    predictions: &FetchOutcome<Vec<PredictionRow>>,
    ratings: &HashMap<String, f64>,
    needs_first_round_leader: bool,
    sim_cfg: &SimulationConfig,
    issues: &IssueTracker,
) -> Vec<ProbabilityResult> {
    if active.is_empty() {
        return Vec::new();
    }

    let predicted_by_name: HashMap<String, &PredictionRow> = match predictions {
        FetchOutcome::Fetched(rows) => rows
            .iter()
            .map(|row| (canonical_player_name(&row.player_name), row))
            .collect(),
        FetchOutcome::Empty => HashMap::new(),
        FetchOutcome::Failed(err) => {
            issues.record_with_evidence(
                steps::PROBABILITY,
                Severity::Warn,
                format!("{event_label}: prediction fetch failed, falling back to simulation"),
                Some(err.clone()),
            );
            HashMap::new()
        }
    };

    let mut out = Vec::new();
    let mut uncovered: Vec<&String> = Vec::new();
    for name in active {
        match predicted_by_name.get(name) {
            Some(row) => {
                for market in PREDICTED_MARKETS {
                    let probability = row
                        .probability_for(market)
                        .expect("predicted markets carry probabilities");
                    out.push(ProbabilityResult {
                        canonical_name: name.clone(),
                        market,
                        probability,
                        provenance: Provenance::Predicted,
                    });
                }
            }
            None => uncovered.push(name),
        }
    }

    if !predicted_by_name.is_empty() && !uncovered.is_empty() {
        issues.record(
            steps::PROBABILITY,
            Severity::Info,
            format!(
                "{event_label}: {} of {} field players missing vendor predictions, simulating them",
                uncovered.len(),
                active.len()
            ),
        );
    }

    let needs_simulation = !uncovered.is_empty() || needs_first_round_leader;
    if !needs_simulation {
        return out;
    }

    let missing_ratings = active
        .iter()
        .filter(|name| !ratings.contains_key(*name))
        .count();
    if missing_ratings > 0 {
        issues.record(
            steps::PROBABILITY,
            Severity::Info,
            format!(
                "{event_label}: {missing_ratings} players without skill ratings simulate from baseline"
            ),
        );
    }

    // The whole field is simulated together so relative finishing positions
    // are meaningful; only the needed slices of the output are kept.
    let sim_field: Vec<SimPlayer> = active
        .iter()
        .map(|name| SimPlayer {
            canonical_name: name.clone(),
            rating: ratings.get(name).copied().unwrap_or(0.0),
        })
        .collect();
    let simulated = simulate_event(&sim_field, sim_cfg);

    let uncovered_set: HashSet<&str> = uncovered.iter().map(|s| s.as_str()).collect();
    for result in simulated {
        let keep = match result.market {
            MarketKey::FirstRoundLeader => needs_first_round_leader,
            _ => uncovered_set.contains(result.canonical_name.as_str()),
        };
        if keep {
            out.push(result);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(name: &str, win: f64) -> PredictionRow {
        PredictionRow {
            player_name: name.to_string(),
            win,
            top5: (win * 2.0).min(1.0),
            top10: (win * 3.0).min(1.0),
            top20: (win * 4.0).min(1.0),
            make_cut: 0.9,
        }
    }

    fn sim_cfg() -> SimulationConfig {
        SimulationConfig {
            iterations: 500,
            seed: 5,
            cut_size: 65,
            confidence_floor: 5_000,
        }
    }

    #[test]
    fn empty_field_produces_nothing() {
        let issues = IssueTracker::new();
        let out = build_event_probabilities(
            "ev",
            &[],
            &FetchOutcome::Fetched(vec![prediction("A", 0.2)]),
            &HashMap::new(),
            true,
            &sim_cfg(),
            &issues,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn predictions_are_used_verbatim_with_predicted_provenance() {
        let issues = IssueTracker::new();
        let active = vec![canonical_player_name("Scottie Scheffler")];
        let out = build_event_probabilities(
            "ev",
            &active,
            &FetchOutcome::Fetched(vec![prediction("Scheffler, Scottie", 0.23)]),
            &HashMap::new(),
            false,
            &sim_cfg(),
            &issues,
        );
        assert_eq!(out.len(), 5);
        let win = out.iter().find(|r| r.market == MarketKey::Win).unwrap();
        assert_eq!(win.probability, 0.23);
        assert_eq!(win.provenance, Provenance::Predicted);
        assert!(issues.is_empty());
    }

    #[test]
    fn missing_prediction_feed_falls_back_to_simulation() {
        let issues = IssueTracker::new();
        let active: Vec<String> = (0..6).map(|i| format!("player {i}")).collect();
        let ratings: HashMap<String, f64> =
            active.iter().map(|n| (n.clone(), 1.0)).collect();
        let out = build_event_probabilities(
            "ev",
            &active,
            &FetchOutcome::Empty,
            &ratings,
            false,
            &sim_cfg(),
            &issues,
        );
        // Five placement markets per player, all simulated.
        assert_eq!(out.len(), 6 * 5);
        assert!(out
            .iter()
            .all(|r| matches!(r.provenance, Provenance::Simulated { .. })));
    }

    #[test]
    fn first_round_leader_is_simulated_even_with_predictions() {
        let issues = IssueTracker::new();
        let active = vec![
            canonical_player_name("A One"),
            canonical_player_name("B Two"),
        ];
        let preds = FetchOutcome::Fetched(vec![prediction("A One", 0.3), prediction("B Two", 0.1)]);
        let out = build_event_probabilities(
            "ev",
            &active,
            &preds,
            &HashMap::new(),
            true,
            &sim_cfg(),
            &issues,
        );
        let frl: Vec<_> = out
            .iter()
            .filter(|r| r.market == MarketKey::FirstRoundLeader)
            .collect();
        assert_eq!(frl.len(), 2);
        assert!(frl
            .iter()
            .all(|r| matches!(r.provenance, Provenance::Simulated { .. })));
        // Predicted rows untouched by the simulation pass.
        let win: Vec<_> = out.iter().filter(|r| r.market == MarketKey::Win).collect();
        assert!(win.iter().all(|r| r.provenance == Provenance::Predicted));
    }

    #[test]
    fn partially_covered_field_mixes_provenance_and_logs() {
        let issues = IssueTracker::new();
        let active: Vec<String> = (0..4).map(|i| format!("player {i}")).collect();
        let preds = FetchOutcome::Fetched(vec![
            prediction("player 0", 0.3),
            prediction("player 1", 0.2),
        ]);
        let out = build_event_probabilities(
            "ev",
            &active,
            &preds,
            &HashMap::new(),
            false,
            &sim_cfg(),
            &issues,
        );
        let p0: Vec<_> = out
            .iter()
            .filter(|r| r.canonical_name == "player 0")
            .collect();
        let p3: Vec<_> = out
            .iter()
            .filter(|r| r.canonical_name == "player 3")
            .collect();
        assert!(p0.iter().all(|r| r.provenance == Provenance::Predicted));
        assert!(p3
            .iter()
            .all(|r| matches!(r.provenance, Provenance::Simulated { .. })));
        // One issue for uncovered players, one for the missing ratings.
        assert_eq!(issues.count_for_step(steps::PROBABILITY), 2);
    }
}
