//! Per-version fit statistics, published alongside the estimator through the
//! same [`crate::cell::ModelCell`] so readers get a consistent snapshot
//! without a separate lock.

use chrono::{DateTime, Utc};

/// A snapshot of an entry's training history as of the currently-published
/// version.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FitStats {
    /// Total examples ever pushed into this entry's buffer.
    pub n_examples_seen: u64,
    /// Total number of committed swaps (version increments) so far.
    pub n_swaps: u64,
    /// MSE of the most recently *committed* estimator, measured on the batch
    /// that trained it.
    pub last_mse: f64,
    /// MAE of the most recently *committed* estimator.
    pub last_mae: f64,
    /// Wall-clock time of the most recent committed swap. `None` until the
    /// first commit.
    pub last_trained_at: Option<DateTime<Utc>>,
    /// Most recent trainer-side error, if the last retrain attempt failed
    /// (fit error, or validator discard). `None` once a successful commit
    /// has superseded it.
    pub last_error: Option<String>,
}

impl FitStats {
    /// One-line, human-readable summary suitable for [`crate::ModelInfo::stats`].
    pub fn summary(&self) -> String {
        let trained_at = self
            .last_trained_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        match &self.last_error {
            Some(err) => format!(
                "n_examples_seen={} n_swaps={} last_mse={:.6} last_trained_at={trained_at} last_error={err}",
                self.n_examples_seen, self.n_swaps, self.last_mse
            ),
            None => format!(
                "n_examples_seen={} n_swaps={} last_mse={:.6} last_trained_at={trained_at}",
                self.n_examples_seen, self.n_swaps, self.last_mse
            ),
        }
    }
}
