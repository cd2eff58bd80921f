use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use fairway_edge::config::{PipelineConfig, env_bool};
use fairway_edge::fake_provider;
use fairway_edge::provider::{OddsApiClient, SportsDataClient};
use fairway_edge::service::BettingService;
use fairway_edge::store::{RecommendationFilter, Store, default_db_path};
use fairway_edge::types::Tour;
use fairway_edge::window::scoring_week;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("run");

    let config = PipelineConfig::from_env();
    let mut service = build_service(config)?;

    match command {
        "run" => run_command(&mut service),
        "recs" => recs_command(&service, args.get(1)),
        "events" => events_command(&service),
        "live" => live_command(&service, args.get(1), args.get(2)),
        other => {
            eprintln!("unknown command '{other}'");
            eprintln!("usage: fairway_edge [run|recs [run_id]|events|live <tour> <event_id>]");
            std::process::exit(2);
        }
    }
}

fn build_service(config: PipelineConfig) -> Result<BettingService> {
    let store = Store::open(&default_db_path())?;
    if env_bool("FAKE_FEED", false) {
        let window = scoring_week(Utc::now());
        let (provider, odds) = fake_provider::demo_week(window.start_date());
        Ok(BettingService::new(
            Box::new(provider),
            Box::new(odds),
            store,
            config,
        ))
    } else {
        Ok(BettingService::new(
            Box::new(SportsDataClient::from_env()),
            Box::new(OddsApiClient::from_env()),
            store,
            config,
        ))
    }
}

fn run_command(service: &mut BettingService) -> Result<()> {
    let mode = service.config().mode;
    let dry_run = service.config().dry_run;
    let outcome = service.trigger_run(mode, dry_run, Utc::now())?;
    let artifact = &outcome.artifact;

    println!(
        "run {} [{}] week {}..{} status={}",
        artifact.run_id,
        artifact.mode.as_str(),
        artifact.week_start,
        artifact.week_end,
        artifact.status.as_str(),
    );
    println!(
        "events={} candidates={} picks={} issues={}",
        artifact.events_seen,
        artifact.candidates,
        artifact.picks,
        outcome.issues.len(),
    );
    if let Some(summary) = &artifact.error_summary {
        println!("error: {summary}");
    }

    for pick in &outcome.recommendations {
        println!(
            "{:<11} {:<24} {:<18} {:<5} {:>6} @{:<12} edge {:+.3} ev {:+.3} conf {}{}",
            pick.tier.as_str(),
            pick.selection,
            pick.market.as_str(),
            pick.tour.label(),
            pick.odds_display,
            pick.bookmaker,
            pick.edge,
            pick.expected_value,
            pick.confidence,
            if pick.fallback { " [fallback]" } else { "" },
        );
    }
    Ok(())
}

fn recs_command(service: &BettingService, run_id: Option<&String>) -> Result<()> {
    let filter = RecommendationFilter {
        run_id: run_id.and_then(|raw| raw.parse::<i64>().ok()),
        ..Default::default()
    };
    let picks = service.list_recommendations(filter)?;
    if picks.is_empty() {
        println!("no recommendations found");
        return Ok(());
    }
    for pick in picks {
        println!(
            "run {} {:<11} {:<24} {:<18} {:>6} edge {:+.3}",
            pick.run_id,
            pick.tier.as_str(),
            pick.selection,
            pick.market.as_str(),
            pick.odds_display,
            pick.edge,
        );
    }
    Ok(())
}

fn events_command(service: &BettingService) -> Result<()> {
    let events = service.active_tracked_events(Utc::now())?;
    if events.is_empty() {
        println!("no tracked events");
        return Ok(());
    }
    for summary in events {
        println!(
            "{:<5} {:<30} {:<20} starts in {}d, {} picks",
            summary.event.tour.label(),
            summary.event.event_name,
            summary.status.as_str(),
            summary.days_until_start,
            summary.tracked_count,
        );
    }
    Ok(())
}

fn live_command(
    service: &BettingService,
    tour: Option<&String>,
    event_id: Option<&String>,
) -> Result<()> {
    let tour = tour
        .and_then(|raw| Tour::parse(raw))
        .context("usage: fairway_edge live <tour> <event_id>")?;
    let event_id = event_id.context("usage: fairway_edge live <tour> <event_id>")?;

    let report = service.live_tracking_for_event(tour, event_id, Utc::now())?;
    println!("{} [{}]", report.event_name, report.status.as_str());
    for row in &report.rows {
        let position = row
            .position
            .map(|p| format!("P{p}"))
            .unwrap_or_else(|| "-".to_string());
        let current = row
            .current
            .as_ref()
            .map(|o| format!("{} @{}", o.odds_display, o.bookmaker))
            .unwrap_or_else(|| "unavailable".to_string());
        let movement = row
            .movement
            .as_ref()
            .map(|m| format!("{:?} {:+.2} ({:+.1}%)", m.direction, m.delta, m.pct_change))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<18} {:<4} base {:>6} @{:<12} now {:<20} {} [{}]",
            row.selection,
            row.market.as_str(),
            position,
            row.baseline_display,
            row.baseline_bookmaker,
            current,
            movement,
            row.outcome.as_str(),
        );
    }
    for issue in &report.data_issues {
        println!("issue [{}] {}", issue.step, issue.message);
    }
    Ok(())
}
