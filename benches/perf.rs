use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::NaiveDate;

use fairway_edge::config::SimulationConfig;
use fairway_edge::event_match::{match_confidence, name_similarity};
use fairway_edge::simulate::{SimPlayer, simulate_event};
use fairway_edge::types::{Tour, TourEvent};

fn bench_field(size: usize) -> Vec<SimPlayer> {
    (0..size)
        .map(|i| SimPlayer {
            canonical_name: format!("player {i}"),
            rating: 2.5 - 0.03 * i as f64,
        })
        .collect()
}

fn bench_simulation(c: &mut Criterion) {
    let players = bench_field(120);
    let cfg = SimulationConfig {
        iterations: 1_000,
        seed: 7,
        cut_size: 65,
        confidence_floor: 5_000,
    };
    c.bench_function("simulate_event_120_players_1k_iters", |b| {
        b.iter(|| {
            let results = simulate_event(black_box(&players), black_box(&cfg));
            black_box(results.len());
        })
    });
}

fn bench_matching(c: &mut Criterion) {
    let event = TourEvent {
        id: 1,
        tour: Tour::Pga,
        external_id: "e1".to_string(),
        provider: "sportsdata".to_string(),
        event_name: "Genesis Scottish Open presented by Aberdeen Standard".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 7, 9).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 7, 12).unwrap(),
        location: None,
        in_play: false,
    };
    let bundle_date = NaiveDate::from_ymd_opt(2026, 7, 9).unwrap();

    c.bench_function("match_confidence", |b| {
        b.iter(|| {
            black_box(match_confidence(
                black_box("Scottish Open 2026"),
                black_box(bundle_date),
                black_box(&event),
            ))
        })
    });

    c.bench_function("name_similarity", |b| {
        b.iter(|| {
            black_box(name_similarity(
                black_box("The Open Championship"),
                black_box("Open Championship presented by Mastercard"),
            ))
        })
    });
}

criterion_group!(benches, bench_simulation, bench_matching);
criterion_main!(benches);
