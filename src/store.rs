//! SQLite repository for pipeline state.
//!
//! Every write is an idempotent upsert keyed by natural identity
//! (tour + external event id, event + canonical player, run + selection +
//! market), so retried writes never duplicate rows. Recommendations and the
//! run row they belong to commit in one transaction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, params};

use crate::issues::DataQualityIssue;
use crate::types::{
    BetOutcome, BetRecommendation, FieldStatus, MarketKey, Provenance, RunArtifact, RunMode,
    RunStatus, Tier, Tour,
};

pub fn default_db_path() -> PathBuf {
    std::env::var("FAIRWAY_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("fairway_edge.sqlite"))
}

pub struct Store {
    conn: Connection,
}

/// Query filter for persisted recommendations. An unset `run_id` resolves to
/// the latest completed run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationFilter {
    pub run_id: Option<i64>,
    pub tier: Option<Tier>,
    pub tour: Option<Tour>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                PRAGMA journal_mode = WAL;
                CREATE TABLE IF NOT EXISTS tour_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tour TEXT NOT NULL,
                    external_id TEXT NOT NULL,
                    provider TEXT NOT NULL,
                    event_name TEXT NOT NULL,
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    location TEXT NULL,
                    in_play INTEGER NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(tour, external_id)
                );
                CREATE INDEX IF NOT EXISTS idx_tour_events_dates
                    ON tour_events(start_date, end_date);

                CREATE TABLE IF NOT EXISTS players (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    canonical_name TEXT NOT NULL UNIQUE,
                    display_name TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS field_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tour_event_id INTEGER NOT NULL,
                    canonical_name TEXT NOT NULL,
                    display_name TEXT NOT NULL,
                    status TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(tour_event_id, canonical_name)
                );

                CREATE TABLE IF NOT EXISTS odds_markets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tour_event_id INTEGER NOT NULL,
                    market TEXT NOT NULL,
                    UNIQUE(tour_event_id, market)
                );

                CREATE TABLE IF NOT EXISTS odds_offers (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    market_id INTEGER NOT NULL,
                    selection TEXT NOT NULL,
                    bookmaker TEXT NOT NULL,
                    odds_decimal REAL NOT NULL,
                    odds_display TEXT NOT NULL,
                    fetched_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_odds_offers_market
                    ON odds_offers(market_id, selection);

                CREATE TABLE IF NOT EXISTS pipeline_runs (
                    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mode TEXT NOT NULL,
                    week_start TEXT NOT NULL,
                    week_end TEXT NOT NULL,
                    events_seen INTEGER NOT NULL,
                    candidates INTEGER NOT NULL,
                    picks INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    error_summary TEXT NULL,
                    started_at TEXT NOT NULL,
                    finished_at TEXT NULL
                );

                CREATE TABLE IF NOT EXISTS bet_recommendations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    run_id INTEGER NOT NULL,
                    tour TEXT NOT NULL,
                    event_external_id TEXT NOT NULL,
                    event_name TEXT NOT NULL,
                    selection TEXT NOT NULL,
                    market TEXT NOT NULL,
                    tier TEXT NOT NULL,
                    odds_decimal REAL NOT NULL,
                    odds_display TEXT NOT NULL,
                    bookmaker TEXT NOT NULL,
                    model_prob REAL NOT NULL,
                    implied_prob REAL NOT NULL,
                    edge REAL NOT NULL,
                    expected_value REAL NOT NULL,
                    confidence INTEGER NOT NULL,
                    provenance TEXT NOT NULL,
                    sim_iterations INTEGER NULL,
                    fallback INTEGER NOT NULL,
                    labels TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE(run_id, event_external_id, selection, market)
                );

                CREATE TABLE IF NOT EXISTS data_quality_issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    run_id INTEGER NULL,
                    step TEXT NOT NULL,
                    severity TEXT NOT NULL,
                    message TEXT NOT NULL,
                    evidence TEXT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS settlements (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    tour TEXT NOT NULL,
                    event_external_id TEXT NOT NULL,
                    selection TEXT NOT NULL,
                    market TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    settled_at TEXT NOT NULL,
                    UNIQUE(tour, event_external_id, selection, market)
                );
                "#,
            )
            .context("create sqlite schema")?;
        Ok(())
    }

    // -- Events and fields --------------------------------------------------

    /// Insert or refresh an event by `(tour, external_id)`, returning its id.
    pub fn upsert_event(
        &self,
        tour: Tour,
        external_id: &str,
        provider: &str,
        event_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        location: Option<&str>,
        in_play: bool,
    ) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO tour_events (
                    tour, external_id, provider, event_name,
                    start_date, end_date, location, in_play, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(tour, external_id) DO UPDATE SET
                    provider = excluded.provider,
                    event_name = excluded.event_name,
                    start_date = excluded.start_date,
                    end_date = excluded.end_date,
                    location = excluded.location,
                    in_play = excluded.in_play,
                    updated_at = excluded.updated_at
                "#,
                params![
                    tour.label(),
                    external_id,
                    provider,
                    event_name,
                    start_date.to_string(),
                    end_date.to_string(),
                    location,
                    in_play as i64,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert tour event")?;
        self.conn
            .query_row(
                "SELECT id FROM tour_events WHERE tour = ?1 AND external_id = ?2",
                params![tour.label(), external_id],
                |row| row.get(0),
            )
            .context("read back tour event id")
    }

    /// Refresh a player's field row for one event. The player's canonical
    /// identity is kept in `players` independently of per-event status.
    pub fn upsert_field_entry(
        &self,
        tour_event_id: i64,
        canonical_name: &str,
        display_name: &str,
        status: FieldStatus,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO players (canonical_name, display_name, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(canonical_name) DO UPDATE SET
                    display_name = excluded.display_name,
                    updated_at = excluded.updated_at",
                params![canonical_name, display_name, Utc::now().to_rfc3339()],
            )
            .context("upsert player")?;
        self.conn
            .execute(
                r#"
                INSERT INTO field_entries (
                    tour_event_id, canonical_name, display_name, status, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(tour_event_id, canonical_name) DO UPDATE SET
                    display_name = excluded.display_name,
                    status = excluded.status,
                    updated_at = excluded.updated_at
                "#,
                params![
                    tour_event_id,
                    canonical_name,
                    display_name,
                    status.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert field entry")?;
        Ok(())
    }

    pub fn field_statuses(&self, tour_event_id: i64) -> Result<HashMap<String, FieldStatus>> {
        let mut stmt = self
            .conn
            .prepare("SELECT canonical_name, status FROM field_entries WHERE tour_event_id = ?1")
            .context("prepare field status query")?;
        let rows = stmt
            .query_map(params![tour_event_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    FieldStatus::parse(&row.get::<_, String>(1)?),
                ))
            })
            .context("query field statuses")?;
        let mut out = HashMap::new();
        for row in rows {
            let (name, status) = row.context("decode field status row")?;
            out.insert(name, status);
        }
        Ok(out)
    }

    pub fn player_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))
            .context("count players")?;
        Ok(n as usize)
    }

    pub fn field_entry_count(&self, tour_event_id: i64) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM field_entries WHERE tour_event_id = ?1",
                params![tour_event_id],
                |row| row.get(0),
            )
            .context("count field entries")?;
        Ok(n as usize)
    }

    // -- Odds snapshots -----------------------------------------------------

    pub fn append_offers(
        &mut self,
        tour_event_id: i64,
        market: MarketKey,
        offers: &[crate::types::OddsOffer],
    ) -> Result<()> {
        let tx = self.conn.transaction().context("begin offers transaction")?;
        tx.execute(
            "INSERT INTO odds_markets (tour_event_id, market) VALUES (?1, ?2)
             ON CONFLICT(tour_event_id, market) DO NOTHING",
            params![tour_event_id, market.as_str()],
        )
        .context("ensure odds market")?;
        let market_id: i64 = tx
            .query_row(
                "SELECT id FROM odds_markets WHERE tour_event_id = ?1 AND market = ?2",
                params![tour_event_id, market.as_str()],
                |row| row.get(0),
            )
            .context("read odds market id")?;
        for offer in offers {
            tx.execute(
                "INSERT INTO odds_offers (
                    market_id, selection, bookmaker, odds_decimal, odds_display, fetched_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    market_id,
                    offer.selection,
                    offer.bookmaker,
                    offer.odds_decimal,
                    offer.odds_display,
                    offer.fetched_at.to_rfc3339(),
                ],
            )
            .context("append odds offer")?;
        }
        tx.commit().context("commit offers transaction")?;
        Ok(())
    }

    // -- Runs and recommendations -------------------------------------------

    pub fn insert_run_start(
        &self,
        mode: RunMode,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO pipeline_runs (
                    mode, week_start, week_end, events_seen, candidates, picks,
                    status, error_summary, started_at, finished_at
                ) VALUES (?1, ?2, ?3, 0, 0, 0, ?4, NULL, ?5, NULL)",
                params![
                    mode.as_str(),
                    week_start.to_string(),
                    week_end.to_string(),
                    RunStatus::Running.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert run start")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Commit the run's picks and its terminal state atomically.
    pub fn finalize_run(
        &mut self,
        artifact: &RunArtifact,
        picks: &[BetRecommendation],
    ) -> Result<()> {
        let tx = self.conn.transaction().context("begin run transaction")?;
        for pick in picks {
            let (provenance, sim_iterations) = match pick.provenance {
                Provenance::Predicted => ("predicted", None),
                Provenance::Simulated { iterations } => ("simulated", Some(iterations as i64)),
            };
            tx.execute(
                r#"
                INSERT INTO bet_recommendations (
                    run_id, tour, event_external_id, event_name, selection, market,
                    tier, odds_decimal, odds_display, bookmaker,
                    model_prob, implied_prob, edge, expected_value, confidence,
                    provenance, sim_iterations, fallback, labels, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                          ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
                ON CONFLICT(run_id, event_external_id, selection, market) DO UPDATE SET
                    tier = excluded.tier,
                    odds_decimal = excluded.odds_decimal,
                    odds_display = excluded.odds_display,
                    bookmaker = excluded.bookmaker,
                    model_prob = excluded.model_prob,
                    implied_prob = excluded.implied_prob,
                    edge = excluded.edge,
                    expected_value = excluded.expected_value,
                    confidence = excluded.confidence,
                    provenance = excluded.provenance,
                    sim_iterations = excluded.sim_iterations,
                    fallback = excluded.fallback,
                    labels = excluded.labels
                "#,
                params![
                    artifact.run_id,
                    pick.tour.label(),
                    pick.event_external_id,
                    pick.event_name,
                    pick.selection,
                    pick.market.as_str(),
                    pick.tier.as_str(),
                    pick.odds_decimal,
                    pick.odds_display,
                    pick.bookmaker,
                    pick.model_prob,
                    pick.implied_prob,
                    pick.edge,
                    pick.expected_value,
                    pick.confidence as i64,
                    provenance,
                    sim_iterations,
                    pick.fallback as i64,
                    serde_json::to_string(&pick.labels).unwrap_or_else(|_| "[]".to_string()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert bet recommendation")?;
        }
        tx.execute(
            "UPDATE pipeline_runs SET
                events_seen = ?1, candidates = ?2, picks = ?3,
                status = ?4, error_summary = ?5, finished_at = ?6
             WHERE run_id = ?7",
            params![
                artifact.events_seen as i64,
                artifact.candidates as i64,
                artifact.picks as i64,
                artifact.status.as_str(),
                artifact.error_summary,
                Utc::now().to_rfc3339(),
                artifact.run_id,
            ],
        )
        .context("finalize run row")?;
        tx.commit().context("commit run transaction")?;
        Ok(())
    }

    pub fn record_issues(&mut self, run_id: Option<i64>, issues: &[DataQualityIssue]) -> Result<()> {
        let tx = self.conn.transaction().context("begin issues transaction")?;
        for issue in issues {
            tx.execute(
                "INSERT INTO data_quality_issues (
                    run_id, step, severity, message, evidence, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id,
                    issue.step,
                    issue.severity.as_str(),
                    issue.message,
                    issue.evidence,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("append data quality issue")?;
        }
        tx.commit().context("commit issues transaction")?;
        Ok(())
    }

    pub fn issues_for_run(&self, run_id: i64) -> Result<Vec<DataQualityIssue>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT step, severity, message, evidence
                 FROM data_quality_issues WHERE run_id = ?1 ORDER BY id ASC",
            )
            .context("prepare issues query")?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(DataQualityIssue {
                    step: row.get(0)?,
                    severity: match row.get::<_, String>(1)?.as_str() {
                        "error" => crate::issues::Severity::Error,
                        "warn" => crate::issues::Severity::Warn,
                        _ => crate::issues::Severity::Info,
                    },
                    message: row.get(2)?,
                    evidence: row.get(3)?,
                })
            })
            .context("query issues")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode issue row")?);
        }
        Ok(out)
    }

    pub fn run(&self, run_id: i64) -> Result<Option<RunArtifact>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT run_id, mode, week_start, week_end, events_seen, candidates,
                        picks, status, error_summary
                 FROM pipeline_runs WHERE run_id = ?1",
            )
            .context("prepare run query")?;
        let mut rows = stmt
            .query_map(params![run_id], decode_run_row)
            .context("query run")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("decode run row")?)),
            None => Ok(None),
        }
    }

    pub fn latest_completed_run(&self) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT MAX(run_id) FROM pipeline_runs WHERE status = 'completed'",
                [],
                |row| row.get::<_, Option<i64>>(0),
            )
            .context("query latest completed run")
    }

    pub fn recommendation_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM bet_recommendations", [], |row| row.get(0))
            .context("count recommendations")?;
        Ok(n as usize)
    }

    pub fn run_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pipeline_runs", [], |row| row.get(0))
            .context("count runs")?;
        Ok(n as usize)
    }

    pub fn event_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tour_events", [], |row| row.get(0))
            .context("count events")?;
        Ok(n as usize)
    }

    pub fn list_recommendations(
        &self,
        filter: RecommendationFilter,
    ) -> Result<Vec<BetRecommendation>> {
        let run_id = match filter.run_id {
            Some(id) => Some(id),
            None => self.latest_completed_run()?,
        };
        let Some(run_id) = run_id else {
            return Ok(Vec::new());
        };

        let mut stmt = self
            .conn
            .prepare(
                "SELECT run_id, tour, event_external_id, event_name, selection, market,
                        tier, odds_decimal, odds_display, bookmaker,
                        model_prob, implied_prob, edge, expected_value, confidence,
                        provenance, sim_iterations, fallback, labels
                 FROM bet_recommendations
                 WHERE run_id = ?1
                 ORDER BY edge DESC, confidence DESC, odds_decimal DESC, selection ASC",
            )
            .context("prepare recommendations query")?;
        let rows = stmt
            .query_map(params![run_id], decode_recommendation_row)
            .context("query recommendations")?;

        let mut out = Vec::new();
        for row in rows {
            let rec = row.context("decode recommendation row")?;
            if let Some(tier) = filter.tier
                && rec.tier != tier
            {
                continue;
            }
            if let Some(tour) = filter.tour
                && rec.tour != tour
            {
                continue;
            }
            out.push(rec);
        }
        Ok(out)
    }

    /// Events referenced by the latest completed run's picks, with pick
    /// counts, most recent first by start date.
    pub fn tracked_events(&self) -> Result<Vec<(crate::types::TourEvent, usize)>> {
        let Some(run_id) = self.latest_completed_run()? else {
            return Ok(Vec::new());
        };
        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.id, e.tour, e.external_id, e.provider, e.event_name,
                        e.start_date, e.end_date, e.location, e.in_play,
                        COUNT(r.id) AS tracked
                 FROM bet_recommendations r
                 JOIN tour_events e
                   ON e.external_id = r.event_external_id AND e.tour = r.tour
                 WHERE r.run_id = ?1
                 GROUP BY e.id
                 ORDER BY e.start_date ASC, e.id ASC",
            )
            .context("prepare tracked events query")?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok((decode_event_row(row)?, row.get::<_, i64>(9)? as usize))
            })
            .context("query tracked events")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode tracked event row")?);
        }
        Ok(out)
    }

    pub fn event_by_external_id(
        &self,
        tour: Tour,
        external_id: &str,
    ) -> Result<Option<crate::types::TourEvent>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, tour, external_id, provider, event_name,
                        start_date, end_date, location, in_play
                 FROM tour_events WHERE tour = ?1 AND external_id = ?2",
            )
            .context("prepare event query")?;
        let mut rows = stmt
            .query_map(params![tour.label(), external_id], decode_event_row)
            .context("query event")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("decode event row")?)),
            None => Ok(None),
        }
    }

    // -- Settlements --------------------------------------------------------

    /// Consume an authoritative settlement signal from outside the core.
    pub fn record_settlement(
        &self,
        tour: Tour,
        event_external_id: &str,
        selection_canonical: &str,
        market: MarketKey,
        outcome: BetOutcome,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settlements (
                    tour, event_external_id, selection, market, outcome, settled_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(tour, event_external_id, selection, market) DO UPDATE SET
                    outcome = excluded.outcome,
                    settled_at = excluded.settled_at",
                params![
                    tour.label(),
                    event_external_id,
                    selection_canonical,
                    market.as_str(),
                    outcome.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("record settlement")?;
        Ok(())
    }

    pub fn settlement_for(
        &self,
        tour: Tour,
        event_external_id: &str,
        selection_canonical: &str,
        market: MarketKey,
    ) -> Result<Option<BetOutcome>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT outcome FROM settlements
                 WHERE tour = ?1 AND event_external_id = ?2
                   AND selection = ?3 AND market = ?4",
            )
            .context("prepare settlement query")?;
        let mut rows = stmt
            .query_map(
                params![
                    tour.label(),
                    event_external_id,
                    selection_canonical,
                    market.as_str()
                ],
                |row| row.get::<_, String>(0),
            )
            .context("query settlement")?;
        match rows.next() {
            Some(raw) => {
                let raw = raw.context("decode settlement row")?;
                Ok(match raw.as_str() {
                    "won" => Some(BetOutcome::Won),
                    "lost" => Some(BetOutcome::Lost),
                    _ => Some(BetOutcome::Pending),
                })
            }
            None => Ok(None),
        }
    }
}

fn decode_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunArtifact> {
    Ok(RunArtifact {
        run_id: row.get(0)?,
        mode: RunMode::parse(&row.get::<_, String>(1)?),
        week_start: parse_date(&row.get::<_, String>(2)?),
        week_end: parse_date(&row.get::<_, String>(3)?),
        events_seen: row.get::<_, i64>(4)? as usize,
        candidates: row.get::<_, i64>(5)? as usize,
        picks: row.get::<_, i64>(6)? as usize,
        status: RunStatus::parse(&row.get::<_, String>(7)?),
        error_summary: row.get(8)?,
    })
}

fn decode_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<crate::types::TourEvent> {
    Ok(crate::types::TourEvent {
        id: row.get(0)?,
        tour: Tour::parse(&row.get::<_, String>(1)?).unwrap_or(Tour::Pga),
        external_id: row.get(2)?,
        provider: row.get(3)?,
        event_name: row.get(4)?,
        start_date: parse_date(&row.get::<_, String>(5)?),
        end_date: parse_date(&row.get::<_, String>(6)?),
        location: row.get(7)?,
        in_play: row.get::<_, i64>(8)? != 0,
    })
}

fn decode_recommendation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BetRecommendation> {
    let provenance_raw: String = row.get(15)?;
    let sim_iterations: Option<i64> = row.get(16)?;
    let provenance = match provenance_raw.as_str() {
        "simulated" => Provenance::Simulated {
            iterations: sim_iterations.unwrap_or(0) as u32,
        },
        _ => Provenance::Predicted,
    };
    let labels_raw: String = row.get(18)?;
    Ok(BetRecommendation {
        run_id: row.get(0)?,
        tour: Tour::parse(&row.get::<_, String>(1)?).unwrap_or(Tour::Pga),
        event_external_id: row.get(2)?,
        event_name: row.get(3)?,
        selection: row.get(4)?,
        market: MarketKey::parse(&row.get::<_, String>(5)?).unwrap_or(MarketKey::Win),
        tier: Tier::parse(&row.get::<_, String>(6)?).unwrap_or(Tier::Eagle),
        odds_decimal: row.get(7)?,
        odds_display: row.get(8)?,
        bookmaker: row.get(9)?,
        model_prob: row.get(10)?,
        implied_prob: row.get(11)?,
        edge: row.get(12)?,
        expected_value: row.get(13)?,
        confidence: row.get::<_, i64>(14)? as u8,
        provenance,
        fallback: row.get::<_, i64>(17)? != 0,
        labels: serde_json::from_str(&labels_raw).unwrap_or_default(),
    })
}

fn parse_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).expect("epoch date"))
}
