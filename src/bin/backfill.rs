use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use fairway_edge::config::{PipelineConfig, env_bool};
use fairway_edge::fake_provider;
use fairway_edge::provider::{OddsApiClient, SportsDataClient};
use fairway_edge::service::BettingService;
use fairway_edge::store::{Store, default_db_path};
use fairway_edge::types::RunMode;
use fairway_edge::window::scoring_week_for_date;

/// Re-run the pipeline for the week containing a past date:
/// `backfill 2026-04-09 [--dry-run]`.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let date = args
        .first()
        .context("usage: backfill <YYYY-MM-DD> [--dry-run]")
        .and_then(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").context("invalid date")
        })?;
    let dry_run = args.iter().any(|a| a == "--dry-run");

    let mut config = PipelineConfig::from_env();
    config.mode = RunMode::Backfill;
    config.backfill_date = Some(date);

    let store = Store::open(&default_db_path())?;
    let mut service = if env_bool("FAKE_FEED", false) {
        let window = scoring_week_for_date(date);
        let (provider, odds) = fake_provider::demo_week(window.start_date());
        BettingService::new(Box::new(provider), Box::new(odds), store, config)
    } else {
        BettingService::new(
            Box::new(SportsDataClient::from_env()),
            Box::new(OddsApiClient::from_env()),
            store,
            config,
        )
    };

    let outcome = service.trigger_run(RunMode::Backfill, dry_run, Utc::now())?;
    let artifact = &outcome.artifact;
    println!(
        "backfill run {} week {}..{} status={} picks={}",
        artifact.run_id,
        artifact.week_start,
        artifact.week_end,
        artifact.status.as_str(),
        artifact.picks,
    );
    if let Some(summary) = &artifact.error_summary {
        println!("error: {summary}");
    }
    Ok(())
}
