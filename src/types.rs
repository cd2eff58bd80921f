use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Tours the pipeline can score. The provider uses its own short codes; see
/// [`Tour::provider_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tour {
    Pga,
    DpWorld,
    KornFerry,
}

impl Tour {
    pub fn provider_code(self) -> &'static str {
        match self {
            Tour::Pga => "pga",
            Tour::DpWorld => "euro",
            Tour::KornFerry => "kft",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tour::Pga => "PGA",
            Tour::DpWorld => "DPWT",
            Tour::KornFerry => "KFT",
        }
    }

    pub fn parse(raw: &str) -> Option<Tour> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pga" => Some(Tour::Pga),
            "dpwt" | "dp" | "euro" | "european" => Some(Tour::DpWorld),
            "kft" | "kornferry" | "korn_ferry" => Some(Tour::KornFerry),
            _ => None,
        }
    }
}

/// A tournament as known internally, unique by `(tour, external_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourEvent {
    pub id: i64,
    pub tour: Tour,
    pub external_id: String,
    pub provider: String,
    pub event_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: Option<String>,
    pub in_play: bool,
}

/// Elimination status of a player within one event's field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldStatus {
    Active,
    Withdrawn,
    Disqualified,
    Cut,
}

impl FieldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldStatus::Active => "active",
            FieldStatus::Withdrawn => "withdrawn",
            FieldStatus::Disqualified => "disqualified",
            FieldStatus::Cut => "cut",
        }
    }

    pub fn parse(raw: &str) -> FieldStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wd" | "withdrawn" => FieldStatus::Withdrawn,
            "dq" | "dsq" | "disqualified" => FieldStatus::Disqualified,
            "mc" | "cut" | "mdf" => FieldStatus::Cut,
            _ => FieldStatus::Active,
        }
    }

    /// True when the player can no longer finish the event.
    pub fn is_eliminated(self) -> bool {
        !matches!(self, FieldStatus::Active)
    }
}

/// A player's participation record for one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEntry {
    pub tour_event_id: i64,
    pub canonical_name: String,
    pub display_name: String,
    pub status: FieldStatus,
}

/// Markets the system understands. Everything except `TournamentMatchup` is
/// a placement market: settlement depends on where the player finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketKey {
    Win,
    Top5,
    Top10,
    Top20,
    MakeCut,
    FirstRoundLeader,
    TournamentMatchup,
}

impl MarketKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketKey::Win => "win",
            MarketKey::Top5 => "top_5",
            MarketKey::Top10 => "top_10",
            MarketKey::Top20 => "top_20",
            MarketKey::MakeCut => "make_cut",
            MarketKey::FirstRoundLeader => "first_round_leader",
            MarketKey::TournamentMatchup => "tournament_matchup",
        }
    }

    pub fn parse(raw: &str) -> Option<MarketKey> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "win" | "winner" | "outright" => Some(MarketKey::Win),
            "top_5" | "top5" => Some(MarketKey::Top5),
            "top_10" | "top10" => Some(MarketKey::Top10),
            "top_20" | "top20" => Some(MarketKey::Top20),
            "make_cut" | "to_make_cut" => Some(MarketKey::MakeCut),
            "first_round_leader" | "frl" => Some(MarketKey::FirstRoundLeader),
            "tournament_matchup" | "matchup" | "head_to_head" | "h2h" => {
                Some(MarketKey::TournamentMatchup)
            }
            _ => None,
        }
    }

    pub fn is_placement(self) -> bool {
        !matches!(self, MarketKey::TournamentMatchup)
    }

    /// Finishing position threshold for top-N markets.
    pub fn position_cutoff(self) -> Option<usize> {
        match self {
            MarketKey::Win => Some(1),
            MarketKey::Top5 => Some(5),
            MarketKey::Top10 => Some(10),
            MarketKey::Top20 => Some(20),
            _ => None,
        }
    }
}

/// One bookmaker's price for one selection, as fetched at `fetched_at`.
/// Offers are append-only snapshots; "current" means most recent per book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsOffer {
    pub selection: String,
    pub bookmaker: String,
    pub odds_decimal: f64,
    pub odds_display: String,
    pub fetched_at: DateTime<Utc>,
}

/// Where a probability came from. Downstream confidence scoring matches on
/// this exhaustively, so new sources force a compile-time decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Provenance {
    Predicted,
    Simulated { iterations: u32 },
}

impl Provenance {
    pub fn label(self) -> &'static str {
        match self {
            Provenance::Predicted => "predicted",
            Provenance::Simulated { .. } => "simulated",
        }
    }
}

/// Per-player, per-market model probability.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityResult {
    pub canonical_name: String,
    pub market: MarketKey,
    pub probability: f64,
    pub provenance: Provenance,
}

/// Odds-based risk bucket for a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Par,
    Birdie,
    Eagle,
    LongShots,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Par, Tier::Birdie, Tier::Eagle, Tier::LongShots];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Par => "PAR",
            Tier::Birdie => "BIRDIE",
            Tier::Eagle => "EAGLE",
            Tier::LongShots => "LONG_SHOTS",
        }
    }

    pub fn parse(raw: &str) -> Option<Tier> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAR" => Some(Tier::Par),
            "BIRDIE" => Some(Tier::Birdie),
            "EAGLE" => Some(Tier::Eagle),
            "LONG_SHOTS" | "LONGSHOTS" => Some(Tier::LongShots),
            _ => None,
        }
    }
}

/// A single tiered pick emitted by a run. Immutable once created; later runs
/// supersede rather than mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecommendation {
    pub run_id: i64,
    pub tour: Tour,
    pub event_external_id: String,
    pub event_name: String,
    pub selection: String,
    pub market: MarketKey,
    pub tier: Tier,
    pub odds_decimal: f64,
    pub odds_display: String,
    pub bookmaker: String,
    pub model_prob: f64,
    pub implied_prob: f64,
    pub edge: f64,
    pub expected_value: f64,
    pub confidence: u8,
    pub provenance: Provenance,
    pub fallback: bool,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> RunStatus {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    CurrentWeek,
    Backfill,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::CurrentWeek => "current_week",
            RunMode::Backfill => "backfill",
        }
    }

    pub fn parse(raw: &str) -> RunMode {
        match raw.trim().to_ascii_lowercase().as_str() {
            "backfill" | "legacy" => RunMode::Backfill,
            _ => RunMode::CurrentWeek,
        }
    }
}

/// One record per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    pub run_id: i64,
    pub mode: RunMode,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub events_seen: usize,
    pub candidates: usize,
    pub picks: usize,
    pub status: RunStatus,
    pub error_summary: Option<String>,
}

/// Settlement state of a tracked recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetOutcome {
    Pending,
    Won,
    Lost,
}

impl BetOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            BetOutcome::Pending => "pending",
            BetOutcome::Won => "won",
            BetOutcome::Lost => "lost",
        }
    }
}

/// Canonical form of a player name: the cross-source matching key.
///
/// Lowercased, punctuation-insensitive, token-order-insensitive, so
/// "Scheffler, Scottie" and "Scottie Scheffler" collapse to the same key.
pub fn canonical_player_name(raw: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.retain(|t| !matches!(t.as_str(), "jr" | "sr" | "ii" | "iii" | "iv"));
    tokens.sort();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_is_order_and_punctuation_insensitive() {
        assert_eq!(
            canonical_player_name("Scheffler, Scottie"),
            canonical_player_name("Scottie Scheffler"),
        );
        assert_eq!(
            canonical_player_name("Matt Fitzpatrick  "),
            "fitzpatrick matt"
        );
    }

    #[test]
    fn canonical_name_drops_suffixes() {
        assert_eq!(
            canonical_player_name("Davis Love III"),
            canonical_player_name("Love, Davis"),
        );
    }

    #[test]
    fn field_status_parses_feed_codes() {
        assert_eq!(FieldStatus::parse("WD"), FieldStatus::Withdrawn);
        assert_eq!(FieldStatus::parse("mc"), FieldStatus::Cut);
        assert_eq!(FieldStatus::parse("dq"), FieldStatus::Disqualified);
        assert_eq!(FieldStatus::parse("A"), FieldStatus::Active);
    }

    #[test]
    fn market_key_round_trips() {
        for key in [
            MarketKey::Win,
            MarketKey::Top5,
            MarketKey::Top10,
            MarketKey::Top20,
            MarketKey::MakeCut,
            MarketKey::FirstRoundLeader,
            MarketKey::TournamentMatchup,
        ] {
            assert_eq!(MarketKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(MarketKey::parse("three_balls"), None);
    }

    #[test]
    fn matchup_is_not_a_placement_market() {
        assert!(MarketKey::Win.is_placement());
        assert!(MarketKey::MakeCut.is_placement());
        assert!(!MarketKey::TournamentMatchup.is_placement());
    }
}
