//! Deterministic in-process provider and odds feed.
//!
//! Drives the integration tests and the `FAKE_FEED` demo mode, so the whole
//! pipeline can run end-to-end with no network and reproducible output.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};

use crate::error::FetchOutcome;
use crate::provider::{
    FieldRow, GolfDataProvider, LeaderboardRow, OddsFeed, OddsFeedBundle, OddsFeedMarket,
    OddsFeedOffer, PredictionRow, RatingRow, ScheduleRow,
};
use crate::types::{MarketKey, OddsOffer, Tour};

#[derive(Debug, Default)]
pub struct FakeGolfProvider {
    pub schedules: HashMap<Tour, Vec<ScheduleRow>>,
    pub fields: HashMap<String, FetchOutcome<Vec<FieldRow>>>,
    pub predictions: HashMap<String, FetchOutcome<Vec<PredictionRow>>>,
    pub ratings: HashMap<Tour, Vec<RatingRow>>,
    pub leaderboards: HashMap<String, FetchOutcome<Vec<LeaderboardRow>>>,
}

impl GolfDataProvider for FakeGolfProvider {
    fn provider_name(&self) -> &str {
        "fake"
    }

    fn schedule(
        &self,
        tour: Tour,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> FetchOutcome<Vec<ScheduleRow>> {
        match self.schedules.get(&tour) {
            Some(rows) if !rows.is_empty() => FetchOutcome::Fetched(rows.clone()),
            _ => FetchOutcome::Empty,
        }
    }

    fn field(&self, external_event_id: &str) -> FetchOutcome<Vec<FieldRow>> {
        self.fields
            .get(external_event_id)
            .cloned()
            .unwrap_or(FetchOutcome::Empty)
    }

    fn pre_tournament_predictions(
        &self,
        external_event_id: &str,
    ) -> FetchOutcome<Vec<PredictionRow>> {
        self.predictions
            .get(external_event_id)
            .cloned()
            .unwrap_or(FetchOutcome::Empty)
    }

    fn skill_ratings(&self, tour: Tour) -> FetchOutcome<Vec<RatingRow>> {
        match self.ratings.get(&tour) {
            Some(rows) if !rows.is_empty() => FetchOutcome::Fetched(rows.clone()),
            _ => FetchOutcome::Empty,
        }
    }

    fn live_leaderboard(&self, external_event_id: &str) -> FetchOutcome<Vec<LeaderboardRow>> {
        self.leaderboards
            .get(external_event_id)
            .cloned()
            .unwrap_or(FetchOutcome::Empty)
    }
}

#[derive(Debug, Default)]
pub struct FakeOddsFeed {
    pub bundles: Option<FetchOutcome<Vec<OddsFeedBundle>>>,
    pub live: HashMap<(String, MarketKey), FetchOutcome<Vec<OddsOffer>>>,
}

impl OddsFeed for FakeOddsFeed {
    fn bundles(&self, _from: NaiveDate, _to: NaiveDate) -> FetchOutcome<Vec<OddsFeedBundle>> {
        self.bundles.clone().unwrap_or(FetchOutcome::Empty)
    }

    fn live_offers(&self, event_name: &str, market: MarketKey) -> FetchOutcome<Vec<OddsOffer>> {
        self.live
            .get(&(event_name.to_string(), market))
            .cloned()
            .unwrap_or(FetchOutcome::Empty)
    }
}

/// Invented field for the demo event; ratings fall off down the list.
const DEMO_PLAYERS: [&str; 24] = [
    "Tom Alderley",
    "Marcus Vane",
    "Ollie Renshaw",
    "Jack Templeman",
    "Rory Caldwell",
    "Ben Ashdown",
    "Sam Witley",
    "Harry Oakes",
    "Lewis Draycott",
    "Finn Marlowe",
    "Callum Reeve",
    "Dan Hartwell",
    "Joe Silverton",
    "Max Birchall",
    "Adam Kestrel",
    "Luke Fenwick",
    "Ryan Stanhope",
    "Nathan Purcell",
    "Chris Welford",
    "Matt Dunmore",
    "Aaron Lindsey",
    "Scott Haverill",
    "Pete Grantham",
    "Will Farleigh",
];

/// A self-contained demo week: one PGA event priced across three books,
/// no vendor predictions, so the simulation path runs.
pub fn demo_week(week_start: NaiveDate) -> (FakeGolfProvider, FakeOddsFeed) {
    let start = week_start + Duration::days(3); // Thursday
    let end = week_start + Duration::days(6); // Sunday
    let event_name = "Highland Links Invitational";
    let external_id = "demo-hl-001";

    let mut provider = FakeGolfProvider::default();
    provider.schedules.insert(
        Tour::Pga,
        vec![ScheduleRow {
            external_id: external_id.to_string(),
            event_name: event_name.to_string(),
            start_date: start,
            end_date: end,
            location: Some("Highland Links".to_string()),
        }],
    );
    provider.fields.insert(
        external_id.to_string(),
        FetchOutcome::Fetched(
            DEMO_PLAYERS
                .iter()
                .map(|name| FieldRow {
                    player_name: name.to_string(),
                    status: "active".to_string(),
                })
                .collect(),
        ),
    );
    provider.ratings.insert(
        Tour::Pga,
        DEMO_PLAYERS
            .iter()
            .enumerate()
            .map(|(i, name)| RatingRow {
                player_name: name.to_string(),
                rating: 2.4 - 0.2 * i as f64,
            })
            .collect(),
    );

    let fetched_at = Utc
        .from_utc_datetime(&week_start.and_hms_opt(9, 0, 0).expect("valid time"))
        + Duration::days(1);
    let books = ["bet365", "skybet", "williamhill"];
    let markets = [MarketKey::Win, MarketKey::Top5, MarketKey::Top10, MarketKey::MakeCut];

    let feed_markets: Vec<OddsFeedMarket> = markets
        .iter()
        .map(|market| OddsFeedMarket {
            market_key: market.as_str().to_string(),
            offers: DEMO_PLAYERS
                .iter()
                .enumerate()
                .flat_map(|(rank, name)| {
                    books.iter().enumerate().map(move |(b, book)| {
                        let odds = demo_odds(*market, rank, b);
                        OddsFeedOffer {
                            selection: name.to_string(),
                            bookmaker: book.to_string(),
                            odds_decimal: odds,
                            odds_display: format!("{odds:.1}"),
                            fetched_at,
                        }
                    })
                })
                .collect(),
        })
        .collect();

    let feed = FakeOddsFeed {
        bundles: Some(FetchOutcome::Fetched(vec![OddsFeedBundle {
            event_name: event_name.to_string(),
            event_date: start,
            markets: feed_markets,
        }])),
        live: HashMap::new(),
    };

    (provider, feed)
}

fn demo_odds(market: MarketKey, rank: usize, book_idx: usize) -> f64 {
    let spread = 0.2 * book_idx as f64;
    let base = match market {
        MarketKey::Win => 5.0 + 4.5 * rank as f64,
        MarketKey::Top5 => 2.2 + 1.4 * rank as f64,
        MarketKey::Top10 => 1.7 + 0.8 * rank as f64,
        _ => 1.3 + 0.12 * rank as f64,
    };
    (base + spread).max(1.05)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_week_is_deterministic() {
        let monday = NaiveDate::from_ymd_opt(2026, 7, 13).unwrap();
        let (provider_a, feed_a) = demo_week(monday);
        let (provider_b, feed_b) = demo_week(monday);
        assert_eq!(
            provider_a.schedule(Tour::Pga, monday, monday),
            provider_b.schedule(Tour::Pga, monday, monday)
        );
        assert_eq!(feed_a.bundles(monday, monday), feed_b.bundles(monday, monday));
    }

    #[test]
    fn missing_keys_read_as_empty() {
        let provider = FakeGolfProvider::default();
        assert_eq!(provider.field("nope"), FetchOutcome::Empty);
        assert_eq!(
            provider.live_leaderboard("nope"),
            FetchOutcome::Empty
        );
    }
}
