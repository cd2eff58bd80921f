//! The operations exposed to outside collaborators (admin tooling, site
//! rendering). Thin coordination over the pipeline, store and live tracker;
//! all domain logic lives in the modules they delegate to.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::PipelineConfig;
use crate::live::{LiveTracker, LiveTrackingReport, TrackedEventSummary};
use crate::pipeline::{PipelineContext, RunOutcome, run_pipeline};
use crate::provider::{GolfDataProvider, OddsFeed};
use crate::store::{RecommendationFilter, Store};
use crate::types::{BetOutcome, BetRecommendation, MarketKey, RunArtifact, RunMode, Tour};

pub struct BettingService {
    provider: Box<dyn GolfDataProvider>,
    odds: Box<dyn OddsFeed>,
    store: Store,
    config: PipelineConfig,
}

impl BettingService {
    pub fn new(
        provider: Box<dyn GolfDataProvider>,
        odds: Box<dyn OddsFeed>,
        store: Store,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            odds,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Execute a pipeline run for the week containing `now`.
    ///
    /// The run row is inserted with status `running` before any work and
    /// finalized at the end, so external pollers watching [`Self::run`]
    /// observe the documented lifecycle. Dry runs write nothing and return
    /// the full in-memory result instead.
    pub fn trigger_run(
        &mut self,
        mode: RunMode,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        let mut config = self.config.clone();
        config.mode = mode;
        config.dry_run = dry_run;
        let ctx = PipelineContext {
            provider: self.provider.as_ref(),
            odds: self.odds.as_ref(),
            config: &config,
        };
        run_pipeline(&ctx, &mut self.store, now, None)
    }

    /// Poll a run's artifact by id.
    pub fn run(&self, run_id: i64) -> Result<Option<RunArtifact>> {
        self.store.run(run_id)
    }

    /// Data-quality issues recorded against a persisted run.
    pub fn issues_for_run(&self, run_id: i64) -> Result<Vec<crate::issues::DataQualityIssue>> {
        self.store.issues_for_run(run_id)
    }

    pub fn list_recommendations(
        &self,
        filter: RecommendationFilter,
    ) -> Result<Vec<BetRecommendation>> {
        self.store.list_recommendations(filter)
    }

    pub fn active_tracked_events(&self, now: DateTime<Utc>) -> Result<Vec<TrackedEventSummary>> {
        self.tracker().active_tracked_events(&self.store, now)
    }

    pub fn live_tracking_for_event(
        &self,
        tour: Tour,
        external_event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LiveTrackingReport> {
        self.tracker()
            .live_tracking_for_event(&self.store, tour, external_event_id, now)
    }

    /// Consume an authoritative settlement signal from outside the core.
    pub fn record_settlement(
        &self,
        tour: Tour,
        external_event_id: &str,
        selection: &str,
        market: MarketKey,
        outcome: BetOutcome,
    ) -> Result<()> {
        self.store.record_settlement(
            tour,
            external_event_id,
            &crate::types::canonical_player_name(selection),
            market,
            outcome,
        )?;
        Ok(())
    }

    fn tracker(&self) -> LiveTracker<'_> {
        LiveTracker {
            provider: self.provider.as_ref(),
            odds: self.odds.as_ref(),
            allowed_bookmakers: &self.config.bookmakers,
        }
    }
}
