use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// A non-fatal data-quality finding. Append-only; never blocks a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub step: String,
    pub severity: Severity,
    pub message: String,
    pub evidence: Option<String>,
}

/// Shared collector threaded explicitly through every pipeline component.
///
/// Cloning shares the underlying log, so concurrent event tasks append into
/// one place while each run keeps its own independent tracker.
#[derive(Debug, Clone, Default)]
pub struct IssueTracker {
    inner: Arc<Mutex<Vec<DataQualityIssue>>>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, step: &str, severity: Severity, message: impl Into<String>) {
        self.record_with_evidence(step, severity, message, None);
    }

    pub fn record_with_evidence(
        &self,
        step: &str,
        severity: Severity,
        message: impl Into<String>,
        evidence: Option<String>,
    ) {
        let issue = DataQualityIssue {
            step: step.to_string(),
            severity,
            message: message.into(),
            evidence,
        };
        match severity {
            Severity::Info => tracing::debug!(step, message = %issue.message, "data-quality issue"),
            Severity::Warn => tracing::warn!(step, message = %issue.message, "data-quality issue"),
            Severity::Error => tracing::error!(step, message = %issue.message, "data-quality issue"),
        }
        self.inner.lock().expect("issue log poisoned").push(issue);
    }

    pub fn snapshot(&self) -> Vec<DataQualityIssue> {
        self.inner.lock().expect("issue log poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("issue log poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for_step(&self, step: &str) -> usize {
        self.inner
            .lock()
            .expect("issue log poisoned")
            .iter()
            .filter(|i| i.step == step)
            .count()
    }
}

// Step names shared between the pipeline and its tests.
pub mod steps {
    pub const SCHEDULE_FETCH: &str = "schedule-fetch";
    pub const FIELD_FETCH: &str = "field-fetch";
    pub const ODDS_MATCH: &str = "odds-match";
    pub const PROBABILITY: &str = "probability";
    pub const ODDS_BOOK: &str = "odds-book";
    pub const RECOMMENDATION: &str = "recommendation";
    pub const PERSISTENCE: &str = "persistence";
    pub const LIVE_FEED: &str = "live-feed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_log() {
        let tracker = IssueTracker::new();
        let clone = tracker.clone();
        clone.record(steps::FIELD_FETCH, Severity::Warn, "no field rows");
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.count_for_step(steps::FIELD_FETCH), 1);
        assert_eq!(tracker.count_for_step(steps::ODDS_MATCH), 0);
    }

    #[test]
    fn evidence_is_preserved() {
        let tracker = IssueTracker::new();
        tracker.record_with_evidence(
            steps::ODDS_MATCH,
            Severity::Warn,
            "low-confidence match",
            Some("confidence=0.42".to_string()),
        );
        let issues = tracker.snapshot();
        assert_eq!(issues[0].evidence.as_deref(), Some("confidence=0.42"));
    }
}
