//! Live tracking of persisted recommendations.
//!
//! Reads the latest completed run's picks, overlays in-play leaderboard
//! positions and current allow-listed odds, and reports movement against the
//! recommendation-time baseline plus a settlement state. Feed failures
//! degrade the affected event only.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Europe::London;
use serde::{Deserialize, Serialize};

use crate::error::FetchOutcome;
use crate::issues::{IssueTracker, Severity, steps};
use crate::odds_book::best_allowed_price;
use crate::provider::{GolfDataProvider, LeaderboardRow, OddsFeed};
use crate::store::{RecommendationFilter, Store};
use crate::types::{
    BetOutcome, BetRecommendation, FieldStatus, OddsOffer, TourEvent, canonical_player_name,
};

const MOVE_EPSILON: f64 = 1e-9;

/// Tracking state of one event. `InProgressNoData` is explicit: the event
/// has started but the live feed has not produced scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingStatus {
    Upcoming,
    Live,
    Completed,
    InProgressNoData,
}

impl TrackingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingStatus::Upcoming => "upcoming",
            TrackingStatus::Live => "live",
            TrackingStatus::Completed => "completed",
            TrackingStatus::InProgressNoData => "in_progress_no_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveDirection {
    /// Odds lengthened: the market is drifting away from the selection.
    Up,
    /// Odds shortened: the selection is strengthening.
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub direction: MoveDirection,
    pub delta: f64,
    pub pct_change: f64,
    /// Baseline and current best prices came from different bookmakers.
    pub cross_book: bool,
    /// The baseline was missing at recommendation time and the first live
    /// snapshot stands in for it.
    pub baseline_substituted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveTrackingRow {
    pub selection: String,
    pub market: crate::types::MarketKey,
    pub tier: crate::types::Tier,
    pub position: Option<u32>,
    pub player_status: FieldStatus,
    pub round_scores: Vec<i32>,
    pub today: Option<i32>,
    pub thru: Option<u32>,
    pub baseline_odds: f64,
    pub baseline_display: String,
    pub baseline_bookmaker: String,
    /// `None` renders as "unavailable": no allow-listed book prices this
    /// selection right now. Never silently substituted from another book.
    pub current: Option<OddsOffer>,
    pub movement: Option<Movement>,
    pub outcome: BetOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveTrackingReport {
    pub event_name: String,
    pub status: TrackingStatus,
    pub rows: Vec<LiveTrackingRow>,
    pub data_issues: Vec<crate::issues::DataQualityIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEventSummary {
    pub event: TourEvent,
    pub status: TrackingStatus,
    pub days_until_start: i64,
    pub tracked_count: usize,
}

/// Price movement against the recommendation baseline. Pure.
pub fn movement(
    baseline_odds: f64,
    baseline_bookmaker: &str,
    current: &OddsOffer,
    baseline_substituted: bool,
) -> Movement {
    let delta = current.odds_decimal - baseline_odds;
    let direction = if delta > MOVE_EPSILON {
        MoveDirection::Up
    } else if delta < -MOVE_EPSILON {
        MoveDirection::Down
    } else {
        MoveDirection::Flat
    };
    Movement {
        direction,
        delta,
        pct_change: if baseline_odds > 0.0 {
            delta / baseline_odds * 100.0
        } else {
            0.0
        },
        cross_book: !current
            .bookmaker
            .eq_ignore_ascii_case(baseline_bookmaker.trim()),
        baseline_substituted,
    }
}

/// Settlement policy. `won` only ever comes from the consumed settlement
/// signal; `lost` is inferred locally for placement markets when the player
/// is eliminated. Matchup markets never auto-lose on elimination — their
/// settlement semantics differ.
pub fn outcome_for(
    market: crate::types::MarketKey,
    settlement: Option<BetOutcome>,
    player_status: FieldStatus,
) -> BetOutcome {
    match settlement {
        Some(BetOutcome::Won) => BetOutcome::Won,
        Some(BetOutcome::Lost) => BetOutcome::Lost,
        Some(BetOutcome::Pending) | None => {
            if market.is_placement() && player_status.is_eliminated() {
                BetOutcome::Lost
            } else {
                BetOutcome::Pending
            }
        }
    }
}

/// Date-driven tracking state, refined by whether the live feed has data.
pub fn tracking_status(
    event: &TourEvent,
    today: NaiveDate,
    leaderboard: &FetchOutcome<Vec<LeaderboardRow>>,
) -> TrackingStatus {
    let started = today >= event.start_date || event.in_play;
    if !started {
        return TrackingStatus::Upcoming;
    }
    if today > event.end_date {
        return TrackingStatus::Completed;
    }
    match leaderboard {
        FetchOutcome::Fetched(rows) if !rows.is_empty() => TrackingStatus::Live,
        _ => TrackingStatus::InProgressNoData,
    }
}

pub struct LiveTracker<'a> {
    pub provider: &'a dyn GolfDataProvider,
    pub odds: &'a dyn OddsFeed,
    pub allowed_bookmakers: &'a [String],
}

impl LiveTracker<'_> {
    /// Events carrying picks from the latest completed run that have not
    /// finished yet, soonest first.
    pub fn active_tracked_events(
        &self,
        store: &Store,
        now: DateTime<Utc>,
    ) -> Result<Vec<TrackedEventSummary>> {
        let today = now.with_timezone(&London).date_naive();
        let mut out = Vec::new();
        for (event, tracked_count) in store.tracked_events().context("load tracked events")? {
            if today > event.end_date {
                continue;
            }
            // Coarse status only; the per-event report inspects the feed.
            let status = if today < event.start_date && !event.in_play {
                TrackingStatus::Upcoming
            } else {
                TrackingStatus::Live
            };
            out.push(TrackedEventSummary {
                days_until_start: (event.start_date - today).num_days().max(0),
                status,
                tracked_count,
                event,
            });
        }
        Ok(out)
    }

    /// Full tracking rows for one event's recommendations.
    pub fn live_tracking_for_event(
        &self,
        store: &Store,
        tour: crate::types::Tour,
        external_event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LiveTrackingReport> {
        let issues = IssueTracker::new();
        let today = now.with_timezone(&London).date_naive();

        let event = store
            .event_by_external_id(tour, external_event_id)
            .context("load event")?
            .with_context(|| format!("unknown event {}/{external_event_id}", tour.label()))?;

        let recommendations: Vec<BetRecommendation> = store
            .list_recommendations(RecommendationFilter::default())
            .context("load recommendations")?
            .into_iter()
            .filter(|r| r.tour == tour && r.event_external_id == external_event_id)
            .collect();

        let leaderboard = self.provider.live_leaderboard(&event.external_id);
        if let FetchOutcome::Failed(err) = &leaderboard {
            issues.record_with_evidence(
                steps::LIVE_FEED,
                Severity::Warn,
                format!("{}: live leaderboard unavailable", event.event_name),
                Some(err.clone()),
            );
        }
        let status = tracking_status(&event, today, &leaderboard);
        let leaderboard_rows = match &leaderboard {
            FetchOutcome::Fetched(rows) => rows.as_slice(),
            _ => &[],
        };
        let field_statuses = store
            .field_statuses(event.id)
            .context("load field statuses")?;

        let rows = recommendations
            .iter()
            .map(|rec| {
                self.build_row(store, &event, rec, leaderboard_rows, &field_statuses, &issues)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LiveTrackingReport {
            event_name: event.event_name,
            status,
            rows,
            data_issues: issues.snapshot(),
        })
    }

    fn build_row(
        &self,
        store: &Store,
        event: &TourEvent,
        rec: &BetRecommendation,
        leaderboard: &[LeaderboardRow],
        field_statuses: &std::collections::HashMap<String, FieldStatus>,
        issues: &IssueTracker,
    ) -> Result<LiveTrackingRow> {
        let canonical = canonical_player_name(&rec.selection);
        let board = leaderboard
            .iter()
            .find(|row| canonical_player_name(&row.player_name) == canonical);

        let player_status = board
            .map(|row| FieldStatus::parse(&row.status))
            .or_else(|| field_statuses.get(&canonical).copied())
            .unwrap_or(FieldStatus::Active);

        let current = match self.odds.live_offers(&event.event_name, rec.market) {
            FetchOutcome::Fetched(offers) => {
                let for_selection: Vec<&OddsOffer> = offers
                    .iter()
                    .filter(|o| canonical_player_name(&o.selection) == canonical)
                    .collect();
                best_allowed_price(&for_selection, self.allowed_bookmakers)
            }
            FetchOutcome::Empty => None,
            FetchOutcome::Failed(err) => {
                issues.record_with_evidence(
                    steps::LIVE_FEED,
                    Severity::Warn,
                    format!(
                        "{}/{}: live odds unavailable for {}",
                        event.event_name,
                        rec.market.as_str(),
                        rec.selection
                    ),
                    Some(err),
                );
                None
            }
        };

        // A recommendation normally carries its baseline. When it genuinely
        // doesn't, the first live snapshot stands in and the substitution is
        // reported, never hidden.
        let baseline_missing = rec.odds_decimal <= 1.0;
        let (baseline_odds, baseline_display, baseline_bookmaker, substituted) =
            if baseline_missing {
                match &current {
                    Some(offer) => (
                        offer.odds_decimal,
                        offer.odds_display.clone(),
                        offer.bookmaker.clone(),
                        true,
                    ),
                    None => (rec.odds_decimal, rec.odds_display.clone(), rec.bookmaker.clone(), false),
                }
            } else {
                (
                    rec.odds_decimal,
                    rec.odds_display.clone(),
                    rec.bookmaker.clone(),
                    false,
                )
            };

        let movement = current
            .as_ref()
            .filter(|_| !baseline_missing || substituted)
            .map(|offer| movement(baseline_odds, &baseline_bookmaker, offer, substituted));

        let settlement = store
            .settlement_for(event.tour, &event.external_id, &canonical, rec.market)
            .context("load settlement")?;

        Ok(LiveTrackingRow {
            selection: rec.selection.clone(),
            market: rec.market,
            tier: rec.tier,
            position: board.and_then(|row| row.position),
            player_status,
            round_scores: board.map(|row| row.round_scores.clone()).unwrap_or_default(),
            today: board.and_then(|row| row.today),
            thru: board.and_then(|row| row.thru),
            baseline_odds,
            baseline_display,
            baseline_bookmaker,
            current,
            movement,
            outcome: outcome_for(rec.market, settlement, player_status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketKey, Tour};
    use chrono::TimeZone;

    fn offer(book: &str, odds: f64) -> OddsOffer {
        OddsOffer {
            selection: "Player A".to_string(),
            bookmaker: book.to_string(),
            odds_decimal: odds,
            odds_display: format!("{odds:.1}"),
            fetched_at: Utc.with_ymd_and_hms(2026, 7, 17, 12, 0, 0).unwrap(),
        }
    }

    fn event(start: (i32, u32, u32), end: (i32, u32, u32), in_play: bool) -> TourEvent {
        TourEvent {
            id: 1,
            tour: Tour::Pga,
            external_id: "e1".to_string(),
            provider: "sportsdata".to_string(),
            event_name: "Open Championship".to_string(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            location: None,
            in_play,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn shortening_price_moves_down_same_book() {
        // Baseline 10.0 at bet365, current best 8.0 at bet365.
        let m = movement(10.0, "bet365", &offer("bet365", 8.0), false);
        assert_eq!(m.direction, MoveDirection::Down);
        assert!((m.delta - -2.0).abs() < 1e-9);
        assert!((m.pct_change - -20.0).abs() < 1e-9);
        assert!(!m.cross_book);
        assert!(!m.baseline_substituted);
    }

    #[test]
    fn lengthening_price_moves_up_and_flags_cross_book() {
        let m = movement(10.0, "bet365", &offer("skybet", 12.0), false);
        assert_eq!(m.direction, MoveDirection::Up);
        assert!((m.delta - 2.0).abs() < 1e-9);
        assert!(m.cross_book);
    }

    #[test]
    fn unchanged_price_is_flat() {
        let m = movement(10.0, "bet365", &offer("bet365", 10.0), false);
        assert_eq!(m.direction, MoveDirection::Flat);
        assert_eq!(m.delta, 0.0);
    }

    #[test]
    fn elimination_loses_placement_markets_only() {
        for market in [
            MarketKey::Win,
            MarketKey::Top10,
            MarketKey::MakeCut,
            MarketKey::FirstRoundLeader,
        ] {
            assert_eq!(
                outcome_for(market, None, FieldStatus::Cut),
                BetOutcome::Lost,
                "{market:?} should auto-lose on elimination"
            );
        }
        assert_eq!(
            outcome_for(MarketKey::TournamentMatchup, None, FieldStatus::Cut),
            BetOutcome::Pending
        );
        assert_eq!(
            outcome_for(MarketKey::TournamentMatchup, None, FieldStatus::Withdrawn),
            BetOutcome::Pending
        );
    }

    #[test]
    fn settlement_signal_is_authoritative() {
        assert_eq!(
            outcome_for(MarketKey::Win, Some(BetOutcome::Won), FieldStatus::Cut),
            BetOutcome::Won
        );
        assert_eq!(
            outcome_for(MarketKey::TournamentMatchup, Some(BetOutcome::Lost), FieldStatus::Active),
            BetOutcome::Lost
        );
    }

    #[test]
    fn active_player_stays_pending() {
        assert_eq!(
            outcome_for(MarketKey::Top10, None, FieldStatus::Active),
            BetOutcome::Pending
        );
    }

    #[test]
    fn status_machine_covers_all_states() {
        let ev = event((2026, 7, 16), (2026, 7, 19), false);
        let with_rows = FetchOutcome::Fetched(vec![LeaderboardRow {
            player_name: "Player A".to_string(),
            position: Some(1),
            status: "active".to_string(),
            round_scores: vec![68],
            today: Some(-2),
            thru: Some(9),
        }]);

        assert_eq!(
            tracking_status(&ev, date(2026, 7, 14), &with_rows),
            TrackingStatus::Upcoming
        );
        assert_eq!(
            tracking_status(&ev, date(2026, 7, 17), &with_rows),
            TrackingStatus::Live
        );
        assert_eq!(
            tracking_status(&ev, date(2026, 7, 17), &FetchOutcome::Empty),
            TrackingStatus::InProgressNoData
        );
        assert_eq!(
            tracking_status(
                &ev,
                date(2026, 7, 17),
                &FetchOutcome::Failed("timeout".to_string())
            ),
            TrackingStatus::InProgressNoData
        );
        assert_eq!(
            tracking_status(&ev, date(2026, 7, 20), &with_rows),
            TrackingStatus::Completed
        );
    }

    #[test]
    fn in_play_flag_forces_started_treatment() {
        let ev = event((2026, 7, 16), (2026, 7, 19), true);
        assert_eq!(
            tracking_status(&ev, date(2026, 7, 15), &FetchOutcome::Empty),
            TrackingStatus::InProgressNoData
        );
    }
}
