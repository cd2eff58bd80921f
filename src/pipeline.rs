//! One pipeline run per scoring window.
//!
//! Window → schedule → odds matching → probabilities → odds book →
//! recommendations → persistence. Per-event work fans out on a bounded rayon
//! pool; everything that touches storage happens after the join, on the
//! calling thread, so retried writes stay idempotent and dry runs can skip
//! persistence entirely.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::FetchOutcome;
use crate::event_match::{MatchDecision, decide, score_candidates};
use crate::issues::{DataQualityIssue, IssueTracker, Severity, steps};
use crate::odds_book::best_prices;
use crate::probability::build_event_probabilities;
use crate::provider::{GolfDataProvider, OddsFeed, OddsFeedBundle, ScheduleRow};
use crate::recommend::{Candidate, select_recommendations};
use crate::schedule::{FieldSeed, fetch_event_field, fetch_tour_schedule, resolve_tours};
use crate::store::Store;
use crate::types::{
    BetRecommendation, FieldStatus, MarketKey, OddsOffer, RunArtifact, RunMode, RunStatus, Tour,
    TourEvent,
};
use crate::window::{WeekWindow, scoring_week, scoring_week_for_date};

pub struct PipelineContext<'a> {
    pub provider: &'a dyn GolfDataProvider,
    pub odds: &'a dyn OddsFeed,
    pub config: &'a PipelineConfig,
}

/// Everything a run produced, whether or not it was persisted.
#[derive(Debug)]
pub struct RunOutcome {
    pub artifact: RunArtifact,
    pub recommendations: Vec<BetRecommendation>,
    pub issues: Vec<DataQualityIssue>,
}

/// Per-event result of the parallel phase.
struct EventComputation {
    tour: Tour,
    row: ScheduleRow,
    field: Vec<FieldSeed>,
    offers_by_market: Vec<(MarketKey, Vec<OddsOffer>)>,
    candidates: Vec<Candidate>,
}

/// Execute one run. `abort` (shared with the caller) stops new event tasks;
/// in-flight ones finish or fail into the issue tracker and partial results
/// are still kept.
pub fn run_pipeline(
    ctx: &PipelineContext<'_>,
    store: &mut Store,
    now: DateTime<Utc>,
    abort: Option<Arc<AtomicBool>>,
) -> Result<RunOutcome> {
    let cfg = ctx.config;
    let issues = IssueTracker::new();
    let abort = abort.unwrap_or_default();
    let deadline = Instant::now() + Duration::from_secs(cfg.max_run_secs);

    let window = match cfg.mode {
        RunMode::CurrentWeek => scoring_week(now),
        RunMode::Backfill => {
            scoring_week_for_date(cfg.backfill_date.unwrap_or_else(|| now.date_naive()))
        }
    };
    tracing::info!(
        mode = cfg.mode.as_str(),
        week_start = %window.start_date(),
        week_end = %window.end_date(),
        dry_run = cfg.dry_run,
        "pipeline run starting"
    );

    let run_id = if cfg.dry_run {
        0
    } else {
        store
            .insert_run_start(cfg.mode, window.start_date(), window.end_date())
            .context("record run start")?
    };

    // -- Schedule phase -----------------------------------------------------
    let tours = resolve_tours(&cfg.tour_codes, &issues);
    let mut scheduled: Vec<(Tour, ScheduleRow)> = Vec::new();
    for tour in &tours {
        for row in fetch_tour_schedule(ctx.provider, *tour, &window, &issues) {
            scheduled.push((*tour, row));
        }
    }
    let events_seen = scheduled.len();

    if scheduled.is_empty() {
        let artifact = RunArtifact {
            run_id,
            mode: cfg.mode,
            week_start: window.start_date(),
            week_end: window.end_date(),
            events_seen: 0,
            candidates: 0,
            picks: 0,
            status: RunStatus::Failed,
            error_summary: Some("no tour events found for the scoring window".to_string()),
        };
        return finish(store, cfg, artifact, Vec::new(), issues);
    }

    // -- Odds bundle matching ----------------------------------------------
    let drafts: Vec<TourEvent> = scheduled
        .iter()
        .map(|(tour, row)| TourEvent {
            id: 0,
            tour: *tour,
            external_id: row.external_id.clone(),
            provider: ctx.provider.provider_name().to_string(),
            event_name: row.event_name.clone(),
            start_date: row.start_date,
            end_date: row.end_date,
            location: row.location.clone(),
            in_play: false,
        })
        .collect();
    let bundles_by_event = match_bundles(ctx.odds, &window, &drafts, &issues);

    // -- Per-tour skill ratings ---------------------------------------------
    let mut ratings: HashMap<Tour, HashMap<String, f64>> = HashMap::new();
    for tour in &tours {
        match ctx.provider.skill_ratings(*tour) {
            FetchOutcome::Fetched(rows) => {
                let map = rows
                    .into_iter()
                    .map(|r| (crate::types::canonical_player_name(&r.player_name), r.rating))
                    .collect();
                ratings.insert(*tour, map);
            }
            FetchOutcome::Empty => {}
            FetchOutcome::Failed(err) => issues.record_with_evidence(
                steps::PROBABILITY,
                Severity::Warn,
                format!("{} skill ratings unavailable", tour.label()),
                Some(err),
            ),
        }
    }

    // -- Parallel per-event phase -------------------------------------------
    let pool = build_fetch_pool(cfg.fetch_parallelism);
    let empty_bundles: Vec<OddsFeedBundle> = Vec::new();
    let computations: Vec<EventComputation> = with_fetch_pool(&pool, || {
        scheduled
            .par_iter()
            .enumerate()
            .filter_map(|(idx, (tour, row))| {
                if abort.load(Ordering::Relaxed) || Instant::now() >= deadline {
                    abort.store(true, Ordering::Relaxed);
                    issues.record(
                        steps::SCHEDULE_FETCH,
                        Severity::Warn,
                        format!(
                            "{}/{}: skipped, run aborted or deadline reached",
                            tour.label(),
                            row.event_name
                        ),
                    );
                    return None;
                }
                let bundles = bundles_by_event.get(&idx).unwrap_or(&empty_bundles);
                compute_event(ctx, *tour, row, bundles, ratings.get(tour), &issues)
            })
            .collect()
    });

    // -- Join: rank, persist, finalize --------------------------------------
    let usable_events = computations
        .iter()
        .filter(|c| !c.candidates.is_empty())
        .count();
    let all_candidates: Vec<Candidate> = computations
        .iter()
        .flat_map(|c| c.candidates.iter().cloned())
        .collect();
    let candidate_count = all_candidates.len();

    let picks = select_recommendations(
        run_id,
        all_candidates,
        &cfg.tiers,
        &cfg.selection,
        cfg.simulation.confidence_floor,
        &issues,
    );

    let (status, error_summary) = terminal_status(
        usable_events,
        picks.len(),
        cfg.selection.min_total_picks,
        &issues,
    );

    let artifact = RunArtifact {
        run_id,
        mode: cfg.mode,
        week_start: window.start_date(),
        week_end: window.end_date(),
        events_seen,
        candidates: candidate_count,
        picks: picks.len(),
        status,
        error_summary,
    };

    if !cfg.dry_run {
        persist_computations(store, ctx.provider.provider_name(), &computations)
            .context("persist window data")?;
    }
    finish(store, cfg, artifact, picks, issues)
}

fn compute_event(
    ctx: &PipelineContext<'_>,
    tour: Tour,
    row: &ScheduleRow,
    bundles: &[OddsFeedBundle],
    ratings: Option<&HashMap<String, f64>>,
    issues: &IssueTracker,
) -> Option<EventComputation> {
    let label = format!("{}/{}", tour.label(), row.event_name);

    let field = fetch_event_field(ctx.provider, tour, &row.external_id, &row.event_name, issues)?;
    let active: Vec<String> = field
        .iter()
        .filter(|f| f.status == FieldStatus::Active)
        .map(|f| f.canonical_name.clone())
        .collect();

    let offers_by_market = collect_market_offers(bundles);
    if offers_by_market.is_empty() {
        issues.record(
            steps::ODDS_BOOK,
            Severity::Warn,
            format!("{label}: no odds markets matched, excluded from candidates"),
        );
        return Some(EventComputation {
            tour,
            row: row.clone(),
            field,
            offers_by_market,
            candidates: Vec::new(),
        });
    }

    let needs_frl = offers_by_market
        .iter()
        .any(|(market, _)| *market == MarketKey::FirstRoundLeader);
    let predictions = ctx.provider.pre_tournament_predictions(&row.external_id);
    let empty_ratings = HashMap::new();
    let probabilities = build_event_probabilities(
        &label,
        &active,
        &predictions,
        ratings.unwrap_or(&empty_ratings),
        needs_frl,
        &ctx.config.simulation,
        issues,
    );
    let prob_by_key: HashMap<(String, MarketKey), (f64, crate::types::Provenance)> = probabilities
        .into_iter()
        .map(|p| ((p.canonical_name, p.market), (p.probability, p.provenance)))
        .collect();
    let display_by_canonical: HashMap<&str, &str> = field
        .iter()
        .map(|f| (f.canonical_name.as_str(), f.display_name.as_str()))
        .collect();

    let mut candidates = Vec::new();
    for (market, offers) in &offers_by_market {
        if !market.is_placement() {
            continue; // matchup markets have no model probability
        }
        let best = best_prices(&label, *market, offers, &ctx.config.bookmakers, issues);
        for (canonical, offer) in best {
            let Some((model_prob, provenance)) = prob_by_key.get(&(canonical.clone(), *market))
            else {
                continue;
            };
            let selection = display_by_canonical
                .get(canonical.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| offer.selection.clone());
            candidates.push(Candidate {
                tour,
                event_external_id: row.external_id.clone(),
                event_name: row.event_name.clone(),
                selection,
                market: *market,
                model_prob: *model_prob,
                provenance: *provenance,
                offer,
            });
        }
    }

    tracing::info!(
        event = %label,
        field = field.len(),
        markets = offers_by_market.len(),
        candidates = candidates.len(),
        "event computed"
    );

    Some(EventComputation {
        tour,
        row: row.clone(),
        field,
        offers_by_market,
        candidates,
    })
}

/// Fetch the window's odds bundles and attach each to at most one event.
fn match_bundles(
    odds: &dyn OddsFeed,
    window: &WeekWindow,
    events: &[TourEvent],
    issues: &IssueTracker,
) -> HashMap<usize, Vec<OddsFeedBundle>> {
    let bundles = match odds.bundles(window.start_date(), window.end_date()) {
        FetchOutcome::Fetched(bundles) => bundles,
        FetchOutcome::Empty => {
            issues.record(
                steps::ODDS_MATCH,
                Severity::Warn,
                "odds feed returned no bundles for the window",
            );
            return HashMap::new();
        }
        FetchOutcome::Failed(err) => {
            issues.record_with_evidence(
                steps::ODDS_MATCH,
                Severity::Error,
                "odds bundle fetch failed",
                Some(err),
            );
            return HashMap::new();
        }
    };

    let mut out: HashMap<usize, Vec<OddsFeedBundle>> = HashMap::new();
    for bundle in bundles {
        let scored = score_candidates(&bundle.event_name, bundle.event_date, events);
        match decide(&scored) {
            MatchDecision::Accept(winner) => {
                out.entry(winner.event_index).or_default().push(bundle);
            }
            MatchDecision::Conflict(list) => {
                let names: Vec<&str> = list
                    .iter()
                    .map(|c| events[c.event_index].event_name.as_str())
                    .collect();
                issues.record_with_evidence(
                    steps::ODDS_MATCH,
                    Severity::Warn,
                    format!(
                        "odds bundle '{}' matches {} events, skipped",
                        bundle.event_name,
                        list.len()
                    ),
                    Some(names.join(" | ")),
                );
            }
            MatchDecision::LowConfidence(best) => issues.record_with_evidence(
                steps::ODDS_MATCH,
                Severity::Warn,
                format!("odds bundle '{}' below match threshold, skipped", bundle.event_name),
                Some(format!(
                    "best candidate '{}' confidence {:.2}",
                    events[best.event_index].event_name, best.confidence
                )),
            ),
            MatchDecision::NoMatch => issues.record(
                steps::ODDS_MATCH,
                Severity::Warn,
                format!("odds bundle '{}' matches no known event", bundle.event_name),
            ),
        }
    }
    out
}

fn collect_market_offers(bundles: &[OddsFeedBundle]) -> Vec<(MarketKey, Vec<OddsOffer>)> {
    let mut by_market: HashMap<MarketKey, Vec<OddsOffer>> = HashMap::new();
    for bundle in bundles {
        for market in &bundle.markets {
            let Some(key) = MarketKey::parse(&market.market_key) else {
                continue;
            };
            by_market.entry(key).or_default().extend(
                market
                    .offers
                    .iter()
                    .cloned()
                    .map(crate::provider::OddsFeedOffer::into_offer),
            );
        }
    }
    let mut out: Vec<(MarketKey, Vec<OddsOffer>)> = by_market.into_iter().collect();
    out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    out
}

/// Run-status policy: event-level failures are issues, but a window with no
/// usable data at all, or fewer picks than the floor, fails the run.
fn terminal_status(
    usable_events: usize,
    picks: usize,
    min_total_picks: usize,
    issues: &IssueTracker,
) -> (RunStatus, Option<String>) {
    if usable_events == 0 {
        return (
            RunStatus::Failed,
            Some(format!(
                "no event produced usable field and odds data ({} issues logged)",
                issues.len()
            )),
        );
    }
    if picks < min_total_picks {
        return (
            RunStatus::Failed,
            Some(format!(
                "only {picks} picks produced, {min_total_picks} required ({} issues logged)",
                issues.len()
            )),
        );
    }
    (RunStatus::Completed, None)
}

fn persist_computations(
    store: &mut Store,
    provider_name: &str,
    computations: &[EventComputation],
) -> Result<()> {
    for c in computations {
        let event_id = store.upsert_event(
            c.tour,
            &c.row.external_id,
            provider_name,
            &c.row.event_name,
            c.row.start_date,
            c.row.end_date,
            c.row.location.as_deref(),
            false,
        )?;
        for seed in &c.field {
            store.upsert_field_entry(event_id, &seed.canonical_name, &seed.display_name, seed.status)?;
        }
        for (market, offers) in &c.offers_by_market {
            store.append_offers(event_id, *market, offers)?;
        }
    }
    Ok(())
}

fn finish(
    store: &mut Store,
    cfg: &PipelineConfig,
    artifact: RunArtifact,
    picks: Vec<BetRecommendation>,
    issues: IssueTracker,
) -> Result<RunOutcome> {
    if !cfg.dry_run {
        if let Err(err) = store.finalize_run(&artifact, &picks) {
            // Persistence failures are fatal: surface them after marking the
            // run failed so pollers never see a run stuck in `running`.
            let failed = RunArtifact {
                status: RunStatus::Failed,
                error_summary: Some(format!("persistence error: {err:#}")),
                picks: 0,
                ..artifact
            };
            let _ = store.finalize_run(&failed, &[]);
            return Err(err.context("finalize run"));
        }
        store
            .record_issues(Some(artifact.run_id), &issues.snapshot())
            .context("record run issues")?;
    }

    tracing::info!(
        run_id = artifact.run_id,
        status = artifact.status.as_str(),
        events = artifact.events_seen,
        candidates = artifact.candidates,
        picks = artifact.picks,
        issues = issues.len(),
        "pipeline run finished"
    );

    Ok(RunOutcome {
        artifact,
        recommendations: picks,
        issues: issues.snapshot(),
    })
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_with_no_usable_events_fails() {
        let issues = IssueTracker::new();
        let (status, summary) = terminal_status(0, 0, 1, &issues);
        assert_eq!(status, RunStatus::Failed);
        assert!(summary.unwrap().contains("no event produced"));
    }

    #[test]
    fn too_few_picks_fails_with_summary() {
        let issues = IssueTracker::new();
        let (status, summary) = terminal_status(2, 1, 3, &issues);
        assert_eq!(status, RunStatus::Failed);
        assert!(summary.unwrap().contains("only 1 picks"));
    }

    #[test]
    fn enough_picks_completes() {
        let issues = IssueTracker::new();
        let (status, summary) = terminal_status(1, 4, 1, &issues);
        assert_eq!(status, RunStatus::Completed);
        assert!(summary.is_none());
    }
}
