//! Schedule and field fetching for the scoring window.
//!
//! Provider failures here are always event- or tour-local: they become
//! data-quality issues and the affected item is skipped, never aborting the
//! run.

use std::collections::HashMap;

use crate::error::FetchOutcome;
use crate::issues::{IssueTracker, Severity, steps};
use crate::provider::{FieldRow, GolfDataProvider, ScheduleRow};
use crate::types::{FieldStatus, Tour, canonical_player_name};
use crate::window::WeekWindow;

/// A player row normalized for one event's field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSeed {
    pub canonical_name: String,
    pub display_name: String,
    pub status: FieldStatus,
}

/// Resolve raw configured tour codes to the internal enum. Unknown codes are
/// recorded and skipped rather than failing the run.
pub fn resolve_tours(codes: &[String], issues: &IssueTracker) -> Vec<Tour> {
    let mut out = Vec::new();
    for code in codes {
        match Tour::parse(code) {
            Some(tour) if !out.contains(&tour) => out.push(tour),
            Some(_) => {}
            None => issues.record(
                steps::SCHEDULE_FETCH,
                Severity::Warn,
                format!("unknown tour code '{}' skipped", code.trim()),
            ),
        }
    }
    out
}

/// Fetch one tour's schedule and keep the events intersecting the window.
pub fn fetch_tour_schedule(
    provider: &dyn GolfDataProvider,
    tour: Tour,
    window: &WeekWindow,
    issues: &IssueTracker,
) -> Vec<ScheduleRow> {
    match provider.schedule(tour, window.start_date(), window.end_date()) {
        FetchOutcome::Fetched(rows) => {
            let total = rows.len();
            let kept: Vec<ScheduleRow> = rows
                .into_iter()
                .filter(|row| window.intersects(row.start_date, row.end_date))
                .collect();
            tracing::info!(
                tour = tour.label(),
                kept = kept.len(),
                total,
                "schedule fetched"
            );
            kept
        }
        FetchOutcome::Empty => {
            tracing::info!(tour = tour.label(), "no scheduled events in window");
            Vec::new()
        }
        FetchOutcome::Failed(err) => {
            issues.record_with_evidence(
                steps::SCHEDULE_FETCH,
                Severity::Error,
                format!("{} schedule fetch failed", tour.label()),
                Some(err),
            );
            Vec::new()
        }
    }
}

/// Fetch and normalize one event's field.
///
/// Returns `None` when the provider failed or had no rows; the caller
/// excludes the event from this run. Distinct display names collapsing onto
/// one canonical key are logged, never silently merged.
pub fn fetch_event_field(
    provider: &dyn GolfDataProvider,
    tour: Tour,
    external_event_id: &str,
    event_name: &str,
    issues: &IssueTracker,
) -> Option<Vec<FieldSeed>> {
    let label = format!("{}/{}", tour.label(), event_name);
    match provider.field(external_event_id) {
        FetchOutcome::Fetched(rows) => Some(normalize_field(&rows, &label, issues)),
        FetchOutcome::Empty => {
            issues.record(
                steps::FIELD_FETCH,
                Severity::Warn,
                format!("{label}: provider returned no field entries"),
            );
            None
        }
        FetchOutcome::Failed(err) => {
            issues.record_with_evidence(
                steps::FIELD_FETCH,
                Severity::Error,
                format!("{label}: field fetch failed"),
                Some(err),
            );
            None
        }
    }
}

pub fn normalize_field(rows: &[FieldRow], event_label: &str, issues: &IssueTracker) -> Vec<FieldSeed> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<FieldSeed> = Vec::new();

    for row in rows {
        let canonical = canonical_player_name(&row.player_name);
        if canonical.is_empty() {
            continue;
        }
        let status = FieldStatus::parse(&row.status);
        match seen.get(&canonical) {
            Some(&idx) => {
                let existing = &mut out[idx];
                if existing.display_name.eq_ignore_ascii_case(row.player_name.trim()) {
                    // Same player repeated: latest status wins.
                    existing.status = status;
                } else {
                    issues.record(
                        steps::FIELD_FETCH,
                        Severity::Warn,
                        format!(
                            "{event_label}: '{}' and '{}' collapse to the same canonical player",
                            existing.display_name,
                            row.player_name.trim()
                        ),
                    );
                }
            }
            None => {
                seen.insert(canonical.clone(), out.len());
                out.push(FieldSeed {
                    canonical_name: canonical,
                    display_name: row.player_name.trim().to_string(),
                    status,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, status: &str) -> FieldRow {
        FieldRow {
            player_name: name.to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn unknown_tour_codes_are_logged_and_skipped() {
        let issues = IssueTracker::new();
        let tours = resolve_tours(
            &["pga".to_string(), "liv".to_string(), "dpwt".to_string()],
            &issues,
        );
        assert_eq!(tours, vec![Tour::Pga, Tour::DpWorld]);
        assert_eq!(issues.count_for_step(steps::SCHEDULE_FETCH), 1);
    }

    #[test]
    fn duplicate_tour_codes_resolve_once() {
        let issues = IssueTracker::new();
        let tours = resolve_tours(&["pga".to_string(), "PGA".to_string()], &issues);
        assert_eq!(tours, vec![Tour::Pga]);
        assert!(issues.is_empty());
    }

    #[test]
    fn field_normalization_parses_statuses() {
        let issues = IssueTracker::new();
        let seeds = normalize_field(
            &[row("Scottie Scheffler", "active"), row("Jon Rahm", "WD")],
            "ev",
            &issues,
        );
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].status, FieldStatus::Active);
        assert_eq!(seeds[1].status, FieldStatus::Withdrawn);
        assert!(issues.is_empty());
    }

    #[test]
    fn repeated_rows_for_one_player_update_status() {
        let issues = IssueTracker::new();
        let seeds = normalize_field(
            &[row("Jon Rahm", "active"), row("Rahm, Jon", "MC")],
            "ev",
            &issues,
        );
        assert_eq!(seeds.len(), 1);
        // "Rahm, Jon" differs from the stored display name, so the collapse
        // is surfaced instead of silently merged.
        assert_eq!(issues.count_for_step(steps::FIELD_FETCH), 1);
        assert_eq!(seeds[0].status, FieldStatus::Active);
    }

    #[test]
    fn ambiguous_canonical_names_raise_an_issue() {
        let issues = IssueTracker::new();
        let seeds = normalize_field(
            &[row("An Byeong-hun", "active"), row("Byeong-hun An", "active")],
            "ev",
            &issues,
        );
        assert_eq!(seeds.len(), 1);
        assert_eq!(issues.count_for_step(steps::FIELD_FETCH), 1);
    }
}
