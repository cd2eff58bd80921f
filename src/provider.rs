use std::env;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::{FetchOutcome, ProviderError};
use crate::types::{MarketKey, OddsOffer, Tour};

const REQUEST_TIMEOUT_SECS: u64 = 10;
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY_MS: u64 = 250;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client, ProviderError> {
    CLIENT.get_or_try_init(|| {
        Ok(Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?)
    })
}

// ---------------------------------------------------------------------------
// Provider row shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleRow {
    #[serde(rename = "eventId")]
    pub external_id: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldRow {
    #[serde(rename = "playerName")]
    pub player_name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionRow {
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub win: f64,
    pub top5: f64,
    pub top10: f64,
    pub top20: f64,
    #[serde(rename = "makeCut")]
    pub make_cut: f64,
}

impl PredictionRow {
    pub fn probability_for(&self, market: MarketKey) -> Option<f64> {
        match market {
            MarketKey::Win => Some(self.win),
            MarketKey::Top5 => Some(self.top5),
            MarketKey::Top10 => Some(self.top10),
            MarketKey::Top20 => Some(self.top20),
            MarketKey::MakeCut => Some(self.make_cut),
            MarketKey::FirstRoundLeader | MarketKey::TournamentMatchup => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RatingRow {
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeaderboardRow {
    #[serde(rename = "playerName")]
    pub player_name: String,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "roundScores", default)]
    pub round_scores: Vec<i32>,
    #[serde(default)]
    pub today: Option<i32>,
    #[serde(default)]
    pub thru: Option<u32>,
}

// ---------------------------------------------------------------------------
// Odds feed shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OddsFeedBundle {
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventDate")]
    pub event_date: NaiveDate,
    #[serde(default)]
    pub markets: Vec<OddsFeedMarket>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OddsFeedMarket {
    #[serde(rename = "marketKey")]
    pub market_key: String,
    #[serde(default)]
    pub offers: Vec<OddsFeedOffer>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OddsFeedOffer {
    pub selection: String,
    pub bookmaker: String,
    #[serde(rename = "oddsDecimal")]
    pub odds_decimal: f64,
    #[serde(rename = "oddsDisplay", default)]
    pub odds_display: String,
    #[serde(rename = "fetchedAt")]
    pub fetched_at: DateTime<Utc>,
}

impl OddsFeedOffer {
    pub fn into_offer(self) -> OddsOffer {
        OddsOffer {
            selection: self.selection,
            bookmaker: self.bookmaker,
            odds_decimal: self.odds_decimal,
            odds_display: self.odds_display,
            fetched_at: self.fetched_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The golf-data provider boundary. Every call is blocking and already
/// retried internally; callers act on the typed outcome and never see raw
/// transport errors.
pub trait GolfDataProvider: Send + Sync {
    /// Source tag recorded against upserted events.
    fn provider_name(&self) -> &str {
        "provider"
    }
    fn schedule(&self, tour: Tour, from: NaiveDate, to: NaiveDate)
    -> FetchOutcome<Vec<ScheduleRow>>;
    fn field(&self, external_event_id: &str) -> FetchOutcome<Vec<FieldRow>>;
    fn pre_tournament_predictions(
        &self,
        external_event_id: &str,
    ) -> FetchOutcome<Vec<PredictionRow>>;
    fn skill_ratings(&self, tour: Tour) -> FetchOutcome<Vec<RatingRow>>;
    fn live_leaderboard(&self, external_event_id: &str) -> FetchOutcome<Vec<LeaderboardRow>>;
}

/// The bookmaker odds-market boundary.
pub trait OddsFeed: Send + Sync {
    /// Pre-tournament odds bundles whose event date falls inside the range.
    fn bundles(&self, from: NaiveDate, to: NaiveDate) -> FetchOutcome<Vec<OddsFeedBundle>>;
    /// Current in-play offers for one event/market.
    fn live_offers(&self, event_name: &str, market: MarketKey) -> FetchOutcome<Vec<OddsOffer>>;
}

// ---------------------------------------------------------------------------
// HTTP implementations
// ---------------------------------------------------------------------------

/// Blocking client for the golf-data provider's JSON API.
#[derive(Debug, Clone)]
pub struct SportsDataClient {
    base_url: String,
    api_key: Option<String>,
    provider_name: String,
}

impl SportsDataClient {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("GOLF_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.sportsdata.example/golf/v2".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("GOLF_API_KEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            provider_name: env::var("GOLF_API_PROVIDER")
                .unwrap_or_else(|_| "sportsdata".to_string()),
        }
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let client = http_client()?;
        retry_with_backoff(RETRY_ATTEMPTS, || {
            let mut req = client.get(&url).query(query);
            if let Some(key) = &self.api_key {
                req = req.query(&[("key", key.as_str())]);
            }
            let resp = req.send()?;
            let status = resp.status();
            let body = resp.text()?;
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body: truncate(&body, 200),
                });
            }
            Ok(body)
        })
    }
}

impl GolfDataProvider for SportsDataClient {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn schedule(
        &self,
        tour: Tour,
        from: NaiveDate,
        to: NaiveDate,
    ) -> FetchOutcome<Vec<ScheduleRow>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        outcome_from(self
            .get(
                "schedule",
                &[("tour", tour.provider_code()), ("from", &from), ("to", &to)],
            )
            .and_then(|body| parse_schedule_json(&body)))
    }

    fn field(&self, external_event_id: &str) -> FetchOutcome<Vec<FieldRow>> {
        outcome_from(
            self.get(&format!("field/{external_event_id}"), &[])
                .and_then(|body| parse_field_json(&body)),
        )
    }

    fn pre_tournament_predictions(
        &self,
        external_event_id: &str,
    ) -> FetchOutcome<Vec<PredictionRow>> {
        outcome_from(
            self.get(&format!("predictions/{external_event_id}"), &[])
                .and_then(|body| parse_predictions_json(&body)),
        )
    }

    fn skill_ratings(&self, tour: Tour) -> FetchOutcome<Vec<RatingRow>> {
        outcome_from(
            self.get("ratings", &[("tour", tour.provider_code())])
                .and_then(|body| parse_ratings_json(&body)),
        )
    }

    fn live_leaderboard(&self, external_event_id: &str) -> FetchOutcome<Vec<LeaderboardRow>> {
        outcome_from(
            self.get(&format!("leaderboard/{external_event_id}"), &[])
                .and_then(|body| parse_leaderboard_json(&body)),
        )
    }
}

/// Blocking client for the odds-market feed.
#[derive(Debug, Clone)]
pub struct OddsApiClient {
    base_url: String,
    api_key: Option<String>,
}

impl OddsApiClient {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("ODDS_FEED_BASE_URL")
                .unwrap_or_else(|_| "https://api.oddsfeed.example/golf/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("ODDS_FEED_API_KEY")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let client = http_client()?;
        retry_with_backoff(RETRY_ATTEMPTS, || {
            let mut req = client.get(&url).query(query);
            if let Some(key) = &self.api_key {
                req = req.query(&[("apiKey", key.as_str())]);
            }
            let resp = req.send()?;
            let status = resp.status();
            let body = resp.text()?;
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body: truncate(&body, 200),
                });
            }
            Ok(body)
        })
    }
}

impl OddsFeed for OddsApiClient {
    fn bundles(&self, from: NaiveDate, to: NaiveDate) -> FetchOutcome<Vec<OddsFeedBundle>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        outcome_from(
            self.get("bundles", &[("from", &from), ("to", &to)])
                .and_then(|body| parse_bundles_json(&body)),
        )
    }

    fn live_offers(&self, event_name: &str, market: MarketKey) -> FetchOutcome<Vec<OddsOffer>> {
        let parsed = self
            .get(
                "live",
                &[("event", event_name), ("market", market.as_str())],
            )
            .and_then(|body| parse_live_offers_json(&body));
        outcome_from(parsed)
    }
}

fn outcome_from<T>(result: Result<Vec<T>, ProviderError>) -> FetchOutcome<Vec<T>> {
    match result {
        Ok(rows) if rows.is_empty() => FetchOutcome::Empty,
        Ok(rows) => FetchOutcome::Fetched(rows),
        Err(err) => FetchOutcome::Failed(err.to_string()),
    }
}

fn retry_with_backoff<T>(
    attempts: u32,
    mut op: impl FnMut() -> Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                tracing::debug!(attempt, error = %err, "fetch attempt failed");
                last_err = Some(err);
                if attempt < attempts {
                    thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt"))
}

fn truncate(raw: &str, max: usize) -> String {
    raw.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(max)
        .collect()
}

// ---------------------------------------------------------------------------
// Parse helpers (separately testable, no I/O)
// ---------------------------------------------------------------------------

pub fn parse_schedule_json(body: &str) -> Result<Vec<ScheduleRow>, ProviderError> {
    let rows: Vec<ScheduleRow> = serde_json::from_str(body.trim())?;
    Ok(rows
        .into_iter()
        .filter(|r| !r.external_id.trim().is_empty() && !r.event_name.trim().is_empty())
        .collect())
}

pub fn parse_field_json(body: &str) -> Result<Vec<FieldRow>, ProviderError> {
    let rows: Vec<FieldRow> = serde_json::from_str(body.trim())?;
    Ok(rows
        .into_iter()
        .filter(|r| !r.player_name.trim().is_empty())
        .collect())
}

pub fn parse_predictions_json(body: &str) -> Result<Vec<PredictionRow>, ProviderError> {
    let rows: Vec<PredictionRow> = serde_json::from_str(body.trim())?;
    // Out-of-range vendor rows are dropped, not clamped: a probability above
    // one is a feed bug we must not launder into the model.
    Ok(rows
        .into_iter()
        .filter(|r| {
            [r.win, r.top5, r.top10, r.top20, r.make_cut]
                .iter()
                .all(|p| (0.0..=1.0).contains(p))
        })
        .collect())
}

pub fn parse_ratings_json(body: &str) -> Result<Vec<RatingRow>, ProviderError> {
    let rows: Vec<RatingRow> = serde_json::from_str(body.trim())?;
    Ok(rows
        .into_iter()
        .filter(|r| r.rating.is_finite() && !r.player_name.trim().is_empty())
        .collect())
}

pub fn parse_leaderboard_json(body: &str) -> Result<Vec<LeaderboardRow>, ProviderError> {
    let rows: Vec<LeaderboardRow> = serde_json::from_str(body.trim())?;
    Ok(rows
        .into_iter()
        .filter(|r| !r.player_name.trim().is_empty())
        .collect())
}

pub fn parse_bundles_json(body: &str) -> Result<Vec<OddsFeedBundle>, ProviderError> {
    let bundles: Vec<OddsFeedBundle> = serde_json::from_str(body.trim())?;
    Ok(bundles
        .into_iter()
        .filter(|b| !b.event_name.trim().is_empty())
        .collect())
}

pub fn parse_live_offers_json(body: &str) -> Result<Vec<OddsOffer>, ProviderError> {
    let offers: Vec<OddsFeedOffer> = serde_json::from_str(body.trim())?;
    Ok(offers
        .into_iter()
        .filter(|o| o.odds_decimal > 1.0)
        .map(OddsFeedOffer::into_offer)
        .collect())
}
