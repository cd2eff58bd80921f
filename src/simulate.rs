//! Monte Carlo tournament simulator.
//!
//! Used when the provider has no pre-tournament predictions for an event:
//! each simulation draws four independent round scores per player from a
//! skill-rating-derived distribution, applies the cut after round two, ranks
//! the survivors' 72-hole totals, and counts how often each player satisfies
//! each market condition.
//!
//! Determinism: every player samples from an RNG seeded by
//! `(seed, player index)`, and per-iteration tallies are combined by
//! addition, so results are identical under any thread scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::types::{MarketKey, ProbabilityResult, Provenance};

/// Scratch scoring average for a zero-rated player.
const BASE_ROUND_MEAN: f64 = 71.0;
/// Strokes per round shaved off per rating point.
const RATING_SCORE_FACTOR: f64 = 0.9;
/// Round-to-round score spread.
const ROUND_STDDEV: f64 = 2.75;

/// Markets the simulator prices, in output order.
const SIMULATED_MARKETS: [MarketKey; 6] = [
    MarketKey::Win,
    MarketKey::Top5,
    MarketKey::Top10,
    MarketKey::Top20,
    MarketKey::MakeCut,
    MarketKey::FirstRoundLeader,
];

#[derive(Debug, Clone)]
pub struct SimPlayer {
    pub canonical_name: String,
    pub rating: f64,
}

/// One player's scores for one simulated tournament.
#[derive(Debug, Clone, Copy)]
struct SimScore {
    round1: i32,
    halfway: i32,
    total: i32,
}

/// Price every simulated market for the given field.
///
/// An empty field yields no results; probabilities are frequencies and so
/// always land in [0, 1].
pub fn simulate_event(players: &[SimPlayer], cfg: &SimulationConfig) -> Vec<ProbabilityResult> {
    if players.is_empty() || cfg.iterations == 0 {
        return Vec::new();
    }

    let iterations = cfg.iterations as usize;
    let scores = sample_scores(players, cfg);

    // Join barrier: every player's samples for an iteration must exist
    // before that tournament instance can be ranked.
    let counts = (0..iterations)
        .into_par_iter()
        .fold(
            || vec![0u32; players.len() * SIMULATED_MARKETS.len()],
            |mut acc, iter_idx| {
                tally_iteration(&scores, iter_idx, cfg.cut_size, &mut acc);
                acc
            },
        )
        .reduce(
            || vec![0u32; players.len() * SIMULATED_MARKETS.len()],
            |mut a, b| {
                for (slot, add) in a.iter_mut().zip(b) {
                    *slot += add;
                }
                a
            },
        );

    let provenance = Provenance::Simulated {
        iterations: cfg.iterations,
    };
    let mut out = Vec::with_capacity(players.len() * SIMULATED_MARKETS.len());
    for (p_idx, player) in players.iter().enumerate() {
        for (m_idx, market) in SIMULATED_MARKETS.iter().enumerate() {
            let hits = counts[p_idx * SIMULATED_MARKETS.len() + m_idx];
            out.push(ProbabilityResult {
                canonical_name: player.canonical_name.clone(),
                market: *market,
                probability: hits as f64 / cfg.iterations as f64,
                provenance,
            });
        }
    }
    out
}

/// Draw the full score matrix, one row per player.
fn sample_scores(players: &[SimPlayer], cfg: &SimulationConfig) -> Vec<Vec<SimScore>> {
    players
        .par_iter()
        .enumerate()
        .map(|(p_idx, player)| {
            let mut rng = StdRng::seed_from_u64(sub_seed(cfg.seed, p_idx));
            let mean = BASE_ROUND_MEAN - RATING_SCORE_FACTOR * player.rating;
            (0..cfg.iterations)
                .map(|_| {
                    let r1 = sample_round(&mut rng, mean);
                    let r2 = sample_round(&mut rng, mean);
                    let r3 = sample_round(&mut rng, mean);
                    let r4 = sample_round(&mut rng, mean);
                    SimScore {
                        round1: r1,
                        halfway: r1 + r2,
                        total: r1 + r2 + r3 + r4,
                    }
                })
                .collect()
        })
        .collect()
}

fn tally_iteration(scores: &[Vec<SimScore>], iter_idx: usize, cut_size: usize, acc: &mut [u32]) {
    let markets = SIMULATED_MARKETS.len();
    let field: Vec<SimScore> = scores.iter().map(|row| row[iter_idx]).collect();

    // Cut line: the `cut_size`-th best halfway score; ties survive.
    let cut_line = {
        let mut halfway: Vec<i32> = field.iter().map(|s| s.halfway).collect();
        halfway.sort_unstable();
        let idx = cut_size.min(halfway.len()).saturating_sub(1);
        halfway[idx]
    };

    let leader_round1 = field.iter().map(|s| s.round1).min().expect("non-empty field");

    for (p_idx, score) in field.iter().enumerate() {
        let base = p_idx * markets;

        if score.round1 == leader_round1 {
            acc[base + 5] += 1; // first_round_leader
        }

        if score.halfway > cut_line {
            continue; // missed the cut; no finishing position
        }
        acc[base + 4] += 1; // make_cut

        // Competition ranking among survivors: 1 + players strictly better.
        let position = 1 + field
            .iter()
            .filter(|other| other.halfway <= cut_line && other.total < score.total)
            .count();

        if position == 1 {
            acc[base] += 1; // win
        }
        if position <= 5 {
            acc[base + 1] += 1;
        }
        if position <= 10 {
            acc[base + 2] += 1;
        }
        if position <= 20 {
            acc[base + 3] += 1;
        }
    }
}

fn sample_round(rng: &mut StdRng, mean: f64) -> i32 {
    (mean + ROUND_STDDEV * sample_standard_normal(rng)).round() as i32
}

/// Box–Muller transform over two uniform draws.
fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>(); // (0, 1]
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn sub_seed(seed: u64, player_idx: usize) -> u64 {
    seed.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add((player_idx as u64 + 1).wrapping_mul(0xD1B5_4A32_D192_ED03))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(n: usize, top_rating: f64) -> Vec<SimPlayer> {
        (0..n)
            .map(|i| SimPlayer {
                canonical_name: format!("player {i}"),
                rating: if i == 0 { top_rating } else { 0.0 },
            })
            .collect()
    }

    fn small_cfg(seed: u64) -> SimulationConfig {
        SimulationConfig {
            iterations: 2_000,
            seed,
            cut_size: 10,
            confidence_floor: 5_000,
        }
    }

    fn prob_of(results: &[ProbabilityResult], name: &str, market: MarketKey) -> f64 {
        results
            .iter()
            .find(|r| r.canonical_name == name && r.market == market)
            .map(|r| r.probability)
            .expect("probability present")
    }

    #[test]
    fn empty_field_yields_no_results() {
        assert!(simulate_event(&[], &small_cfg(7)).is_empty());
    }

    #[test]
    fn same_seed_is_byte_identical() {
        let players = field(20, 2.0);
        let a = simulate_event(&players, &small_cfg(42));
        let b = simulate_event(&players, &small_cfg(42));
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let players = field(20, 2.0);
        let a = simulate_event(&players, &small_cfg(42));
        let b = simulate_event(&players, &small_cfg(43));
        assert_ne!(a, b);
    }

    #[test]
    fn probabilities_are_frequencies_in_unit_range() {
        let players = field(15, 1.5);
        let results = simulate_event(&players, &small_cfg(9));
        assert_eq!(results.len(), 15 * 6);
        for r in &results {
            assert!((0.0..=1.0).contains(&r.probability), "{r:?}");
            assert_eq!(
                r.provenance,
                Provenance::Simulated { iterations: 2_000 }
            );
        }
    }

    #[test]
    fn better_rated_player_wins_more() {
        let players = field(20, 3.0);
        let results = simulate_event(&players, &small_cfg(11));
        let strong = prob_of(&results, "player 0", MarketKey::Win);
        let weak = prob_of(&results, "player 1", MarketKey::Win);
        assert!(
            strong > weak * 2.0,
            "expected dominant favourite, got {strong} vs {weak}"
        );
        assert!(
            prob_of(&results, "player 0", MarketKey::Top10)
                >= prob_of(&results, "player 0", MarketKey::Win)
        );
    }

    #[test]
    fn everyone_makes_the_cut_when_field_fits_inside_it() {
        let players = field(8, 1.0);
        let results = simulate_event(&players, &small_cfg(3));
        for p in &players {
            assert_eq!(prob_of(&results, &p.canonical_name, MarketKey::MakeCut), 1.0);
        }
    }

    #[test]
    fn cut_eliminates_when_field_exceeds_cut_size() {
        let players = field(30, 1.0);
        let results = simulate_event(&players, &small_cfg(3));
        let avg_make_cut: f64 = players
            .iter()
            .map(|p| prob_of(&results, &p.canonical_name, MarketKey::MakeCut))
            .sum::<f64>()
            / players.len() as f64;
        assert!(avg_make_cut < 1.0);
        assert!(avg_make_cut > 0.2);
    }
}
