use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use fairway_edge::config::PipelineConfig;
use fairway_edge::error::FetchOutcome;
use fairway_edge::fake_provider::{FakeGolfProvider, FakeOddsFeed};
use fairway_edge::live::{MoveDirection, TrackingStatus};
use fairway_edge::provider::LeaderboardRow;
use fairway_edge::service::BettingService;
use fairway_edge::store::Store;
use fairway_edge::types::{
    BetOutcome, BetRecommendation, MarketKey, OddsOffer, Provenance, RunArtifact, RunMode,
    RunStatus, Tier, Tour,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Friday of the tracked event's week.
fn friday_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 17, 12, 0, 0).unwrap()
}

fn rec(run_id: i64, selection: &str, market: MarketKey, odds: f64) -> BetRecommendation {
    BetRecommendation {
        run_id,
        tour: Tour::Pga,
        event_external_id: "e1".to_string(),
        event_name: "Open Championship".to_string(),
        selection: selection.to_string(),
        market,
        tier: Tier::Birdie,
        odds_decimal: odds,
        odds_display: format!("{odds:.1}"),
        bookmaker: "bet365".to_string(),
        model_prob: 0.2,
        implied_prob: 1.0 / odds,
        edge: 0.2 - 1.0 / odds,
        expected_value: 0.2 * (odds - 1.0) - 0.8,
        confidence: 3,
        provenance: Provenance::Predicted,
        fallback: false,
        labels: vec!["predicted".to_string()],
    }
}

fn live_offer(selection: &str, book: &str, odds: f64) -> OddsOffer {
    OddsOffer {
        selection: selection.to_string(),
        bookmaker: book.to_string(),
        odds_decimal: odds,
        odds_display: format!("{odds:.1}"),
        fetched_at: Utc.with_ymd_and_hms(2026, 7, 17, 11, 0, 0).unwrap(),
    }
}

fn board_row(name: &str, position: u32, status: &str) -> LeaderboardRow {
    LeaderboardRow {
        player_name: name.to_string(),
        position: Some(position),
        status: status.to_string(),
        round_scores: vec![70, 68],
        today: Some(-2),
        thru: Some(12),
    }
}

/// Store seeded with one completed run over one live event and the given
/// picks.
fn seeded_store(picks: &[BetRecommendation]) -> Store {
    let mut store = Store::open_in_memory().expect("in-memory store");
    let event_id = store
        .upsert_event(
            Tour::Pga,
            "e1",
            "fake",
            "Open Championship",
            date(2026, 7, 16),
            date(2026, 7, 19),
            None,
            true,
        )
        .expect("seed event");
    for pick in picks {
        store
            .upsert_field_entry(
                event_id,
                &fairway_edge::types::canonical_player_name(&pick.selection),
                &pick.selection,
                fairway_edge::types::FieldStatus::Active,
            )
            .expect("seed field entry");
    }
    let run_id = store
        .insert_run_start(RunMode::CurrentWeek, date(2026, 7, 13), date(2026, 7, 19))
        .expect("seed run");
    let artifact = RunArtifact {
        run_id,
        mode: RunMode::CurrentWeek,
        week_start: date(2026, 7, 13),
        week_end: date(2026, 7, 19),
        events_seen: 1,
        candidates: picks.len(),
        picks: picks.len(),
        status: RunStatus::Completed,
        error_summary: None,
    };
    store.finalize_run(&artifact, picks).expect("seed picks");
    store
}

/// Scenario C: baseline 10.0 at bet365, current best 8.0 at bet365 →
/// direction DOWN, delta −2.00, not cross-book.
#[test]
fn scenario_c_shortening_price_reports_down_movement() {
    let picks = vec![rec(1, "Player A", MarketKey::Win, 10.0)];
    let store = seeded_store(&picks);

    let mut provider = FakeGolfProvider::default();
    provider.leaderboards.insert(
        "e1".to_string(),
        FetchOutcome::Fetched(vec![board_row("Player A", 3, "active")]),
    );
    let mut feed = FakeOddsFeed::default();
    feed.live.insert(
        ("Open Championship".to_string(), MarketKey::Win),
        FetchOutcome::Fetched(vec![live_offer("Player A", "bet365", 8.0)]),
    );

    let service = BettingService::new(
        Box::new(provider),
        Box::new(feed),
        store,
        PipelineConfig::default(),
    );
    let report = service
        .live_tracking_for_event(Tour::Pga, "e1", friday_now())
        .expect("report");

    assert_eq!(report.status, TrackingStatus::Live);
    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.position, Some(3));
    let movement = row.movement.as_ref().expect("movement");
    assert_eq!(movement.direction, MoveDirection::Down);
    assert!((movement.delta - -2.0).abs() < 1e-9);
    assert!((movement.pct_change - -20.0).abs() < 1e-9);
    assert!(!movement.cross_book);
    assert!(!movement.baseline_substituted);
    assert_eq!(row.outcome, BetOutcome::Pending);
}

/// A missed cut flips placement-market picks to lost, but never matchup
/// picks — their settlement semantics differ.
#[test]
fn missed_cut_loses_top10_but_not_matchup() {
    let picks = vec![
        rec(1, "Player A", MarketKey::Top10, 6.0),
        rec(1, "Player A", MarketKey::TournamentMatchup, 1.9),
    ];
    let store = seeded_store(&picks);

    let mut provider = FakeGolfProvider::default();
    provider.leaderboards.insert(
        "e1".to_string(),
        FetchOutcome::Fetched(vec![board_row("Player A", 71, "MC")]),
    );

    let service = BettingService::new(
        Box::new(provider),
        Box::new(FakeOddsFeed::default()),
        store,
        PipelineConfig::default(),
    );
    let report = service
        .live_tracking_for_event(Tour::Pga, "e1", friday_now())
        .expect("report");

    let top10 = report
        .rows
        .iter()
        .find(|r| r.market == MarketKey::Top10)
        .expect("top10 row");
    let matchup = report
        .rows
        .iter()
        .find(|r| r.market == MarketKey::TournamentMatchup)
        .expect("matchup row");

    assert_eq!(top10.outcome, BetOutcome::Lost);
    assert_eq!(matchup.outcome, BetOutcome::Pending);
}

#[test]
fn withdrawal_reported_by_stored_field_when_feed_is_silent() {
    let picks = vec![rec(1, "Player A", MarketKey::Win, 12.0)];
    let mut store = seeded_store(&picks);
    let event_id = store
        .upsert_event(
            Tour::Pga,
            "e1",
            "fake",
            "Open Championship",
            date(2026, 7, 16),
            date(2026, 7, 19),
            None,
            true,
        )
        .expect("event id");
    store
        .upsert_field_entry(
            event_id,
            &fairway_edge::types::canonical_player_name("Player A"),
            "Player A",
            fairway_edge::types::FieldStatus::Withdrawn,
        )
        .expect("update status");

    // Leaderboard has no row for the withdrawn player.
    let mut provider = FakeGolfProvider::default();
    provider.leaderboards.insert(
        "e1".to_string(),
        FetchOutcome::Fetched(vec![board_row("Player B", 1, "active")]),
    );

    let service = BettingService::new(
        Box::new(provider),
        Box::new(FakeOddsFeed::default()),
        store,
        PipelineConfig::default(),
    );
    let report = service
        .live_tracking_for_event(Tour::Pga, "e1", friday_now())
        .expect("report");
    assert_eq!(report.rows[0].outcome, BetOutcome::Lost);
    assert_eq!(report.rows[0].position, None);
}

/// No allow-listed book prices the selection live: odds render unavailable
/// instead of silently substituting a disallowed book.
#[test]
fn live_price_from_disallowed_book_is_unavailable() {
    let picks = vec![rec(1, "Player A", MarketKey::Win, 10.0)];
    let store = seeded_store(&picks);

    let mut provider = FakeGolfProvider::default();
    provider.leaderboards.insert(
        "e1".to_string(),
        FetchOutcome::Fetched(vec![board_row("Player A", 5, "active")]),
    );
    let mut feed = FakeOddsFeed::default();
    feed.live.insert(
        ("Open Championship".to_string(), MarketKey::Win),
        FetchOutcome::Fetched(vec![live_offer("Player A", "shadowbook", 7.5)]),
    );

    let service = BettingService::new(
        Box::new(provider),
        Box::new(feed),
        store,
        PipelineConfig::default(),
    );
    let report = service
        .live_tracking_for_event(Tour::Pga, "e1", friday_now())
        .expect("report");

    let row = &report.rows[0];
    assert!(row.current.is_none());
    assert!(row.movement.is_none());
    // Baseline is still reported untouched.
    assert_eq!(row.baseline_odds, 10.0);
}

/// A dead live feed degrades this event to in_progress_no_data with an
/// issue; the rows still render from stored state.
#[test]
fn feed_failure_degrades_event_without_aborting() {
    let picks = vec![rec(1, "Player A", MarketKey::Win, 10.0)];
    let store = seeded_store(&picks);

    let mut provider = FakeGolfProvider::default();
    provider.leaderboards.insert(
        "e1".to_string(),
        FetchOutcome::Failed("connect timeout".to_string()),
    );

    let service = BettingService::new(
        Box::new(provider),
        Box::new(FakeOddsFeed::default()),
        store,
        PipelineConfig::default(),
    );
    let report = service
        .live_tracking_for_event(Tour::Pga, "e1", friday_now())
        .expect("report");

    assert_eq!(report.status, TrackingStatus::InProgressNoData);
    assert!(report.data_issues.iter().any(|i| i.step == "live-feed"));
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].position, None);
    assert_eq!(report.rows[0].outcome, BetOutcome::Pending);
}

#[test]
fn settlement_signal_overrides_local_inference() {
    let picks = vec![rec(1, "Player A", MarketKey::Win, 10.0)];
    let store = seeded_store(&picks);

    let mut provider = FakeGolfProvider::default();
    provider.leaderboards.insert(
        "e1".to_string(),
        FetchOutcome::Fetched(vec![board_row("Player A", 1, "active")]),
    );

    let service = BettingService::new(
        Box::new(provider),
        Box::new(FakeOddsFeed::default()),
        store,
        PipelineConfig::default(),
    );
    service
        .record_settlement(Tour::Pga, "e1", "Player A", MarketKey::Win, BetOutcome::Won)
        .expect("record settlement");

    let report = service
        .live_tracking_for_event(Tour::Pga, "e1", friday_now())
        .expect("report");
    assert_eq!(report.rows[0].outcome, BetOutcome::Won);
}

#[test]
fn tracked_event_listing_reports_upcoming_and_counts() {
    let picks = vec![
        rec(1, "Player A", MarketKey::Win, 10.0),
        rec(1, "Player B", MarketKey::Top10, 4.0),
    ];
    let store = seeded_store(&picks);

    let service = BettingService::new(
        Box::new(FakeGolfProvider::default()),
        Box::new(FakeOddsFeed::default()),
        store,
        PipelineConfig::default(),
    );

    // Two days before the event starts.
    let before = Utc.with_ymd_and_hms(2026, 7, 14, 9, 0, 0).unwrap();
    let events = service.active_tracked_events(before).expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tracked_count, 2);
    assert_eq!(events[0].days_until_start, 2);

    // After the event finishes it drops off the active list.
    let after = Utc.with_ymd_and_hms(2026, 7, 21, 9, 0, 0).unwrap();
    assert!(service.active_tracked_events(after).expect("events").is_empty());
}
