use thiserror::Error;

/// Failures at the provider/odds-feed boundary. Everything here is
/// transient from the pipeline's point of view: after bounded retries it
/// becomes a [`FetchOutcome::Failed`] and a data-quality issue, never a
/// run abort.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of a single provider fetch after retries.
///
/// `Empty` means the provider answered with no rows (not an error);
/// `Failed` carries the exhausted-retry error text for the issue log.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    Empty,
    Failed(String),
}

impl<T> FetchOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// Collapse to an `Option`, treating both `Empty` and `Failed` as absent.
    pub fn into_option(self) -> Option<T> {
        match self {
            FetchOutcome::Fetched(value) => Some(value),
            FetchOutcome::Empty | FetchOutcome::Failed(_) => None,
        }
    }
}
