use std::fs;
use std::path::PathBuf;

use fairway_edge::config::SimulationConfig;
use fairway_edge::simulate::{SimPlayer, simulate_event};
use fairway_edge::types::MarketKey;

#[derive(Debug, serde::Deserialize)]
struct SimCase {
    #[serde(default)]
    iterations: Option<u32>,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    cut_size: Option<usize>,
    players: Vec<SimCasePlayer>,
}

#[derive(Debug, serde::Deserialize)]
struct SimCasePlayer {
    name: String,
    rating: f64,
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/sim_field.json"));

    let raw = fs::read_to_string(&path)?;
    let case: SimCase = serde_json::from_str(&raw)?;

    let defaults = SimulationConfig::default();
    let cfg = SimulationConfig {
        iterations: case.iterations.unwrap_or(defaults.iterations),
        seed: case.seed.unwrap_or(defaults.seed),
        cut_size: case.cut_size.unwrap_or(defaults.cut_size),
        confidence_floor: defaults.confidence_floor,
    };

    let players: Vec<SimPlayer> = case
        .players
        .iter()
        .map(|p| SimPlayer {
            canonical_name: p.name.clone(),
            rating: p.rating,
        })
        .collect();

    // This binary is intentionally simple: it prices one field offline and
    // prints the result, for quick tuning iterations with no network or db.
    let results = simulate_event(&players, &cfg);

    let mut wins: Vec<(&str, f64)> = results
        .iter()
        .filter(|r| r.market == MarketKey::Win)
        .map(|r| (r.canonical_name.as_str(), r.probability))
        .collect();
    wins.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!(
        "{} players, {} iterations, seed {}",
        players.len(),
        cfg.iterations,
        cfg.seed
    );
    println!("{:<28} {:>6} {:>6} {:>6} {:>8}", "player", "win", "top5", "top10", "makecut");
    for (name, win) in wins.iter().take(15) {
        let lookup = |market: MarketKey| {
            results
                .iter()
                .find(|r| r.canonical_name == *name && r.market == market)
                .map(|r| r.probability)
                .unwrap_or(0.0)
        };
        println!(
            "{:<28} {:>5.1}% {:>5.1}% {:>5.1}% {:>7.1}%",
            name,
            win * 100.0,
            lookup(MarketKey::Top5) * 100.0,
            lookup(MarketKey::Top10) * 100.0,
            lookup(MarketKey::MakeCut) * 100.0,
        );
    }

    Ok(())
}
