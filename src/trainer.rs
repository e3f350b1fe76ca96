//! The background continuous-learning loop.
//!
//! A single task ticks on a fixed interval, scans a registry snapshot, and
//! retrains whichever entries are due, shutting down cleanly on a
//! [`tokio::sync::Notify`] rather than a polled flag.

use crate::cell::Triple;
use crate::config::LearningConfig;
use crate::entry::ModelEntry;
use crate::estimator::{self, Metrics};
use crate::example::Example;
use crate::registry::Registry;
use crate::stats::FitStats;
use crate::validator::{self, Decision};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a running continuous-learning task. Dropping this without
/// calling [`TrainerHandle::stop`] leaves the task running in the
/// background; callers that want a clean shutdown should call `stop`.
pub struct TrainerHandle {
    shutdown: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl TrainerHandle {
    /// Signal the loop to stop after its current tick and wait for it to
    /// exit. Idempotent: calling this more than once, or after the task has
    /// already stopped itself, is a no-op.
    pub async fn stop(self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.shutdown.notify_one();
        }
        let _ = self.join.await;
    }
}

/// Spawn the continuous-learning task for `registry`, ticking every
/// `config.interval_sec` seconds.
///
/// If `config.enabled` is `false`, this still spawns a task, but it parks
/// immediately on the shutdown signal and never ticks — callers get a
/// uniform [`TrainerHandle`] regardless of whether learning is enabled.
pub fn spawn(registry: Arc<Registry>, config: LearningConfig) -> TrainerHandle {
    let shutdown = Arc::new(Notify::new());
    let stopped = Arc::new(AtomicBool::new(false));
    let shutdown_for_task = Arc::clone(&shutdown);

    let join = tokio::spawn(async move {
        if !config.enabled {
            shutdown_for_task.notified().await;
            return;
        }

        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(config.interval_sec));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_tick(&registry, &config).await;
                }
                _ = shutdown_for_task.notified() => {
                    debug!("continuous learning loop received shutdown signal");
                    break;
                }
            }
        }
    });

    TrainerHandle {
        shutdown,
        stopped,
        join,
    }
}

/// One scan of the registry, in two steps: first claim every eligible entry
/// (the CAS guard means at most one tick-or-ad-hoc retrain is ever in flight
/// per entry), then fit/validate/commit the claimed entries concurrently —
/// a slow fit on one model never delays another model's retrain this tick.
async fn run_tick(registry: &Registry, config: &LearningConfig) {
    let claimed: Vec<(String, Arc<ModelEntry>)> = registry
        .snapshot()
        .into_iter()
        .filter(|(name, entry)| {
            if entry.buffer().len() < config.min_samples as u64 {
                return false;
            }
            if !entry.try_claim_training() {
                debug!(model = %name, "skipping tick, retrain already in flight");
                return false;
            }
            true
        })
        .collect();

    let fits = claimed.into_iter().map(|(name, entry)| async move {
        let outcome = retrain_one(&entry, config).await;
        entry.release_training();
        (name, outcome)
    });

    for (name, outcome) in futures::future::join_all(fits).await {
        match outcome {
            RetrainOutcome::Committed { version } => {
                info!(model = %name, version, "committed new model version");
            }
            RetrainOutcome::Discarded { reason } => {
                info!(model = %name, reason = %reason, "discarded candidate, incumbent unchanged");
            }
            RetrainOutcome::FitFailed { error } => {
                warn!(model = %name, error = %error, "candidate fit failed");
            }
            RetrainOutcome::NothingDrained => {
                debug!(model = %name, "buffer emptied by a concurrent drain before claim, nothing to do");
            }
        }
    }
}

pub(crate) enum RetrainOutcome {
    Committed { version: u64 },
    Discarded { reason: &'static str },
    FitFailed { error: String },
    NothingDrained,
}

/// Drain, fit, validate, and (maybe) commit a single entry. Called only by a
/// caller already holding that entry's training claim.
///
/// `pub(crate)` so [`crate::runtime::Runtime::retrain_now`] can drive an
/// out-of-band retrain without waiting for the scheduled tick.
pub(crate) async fn retrain_one(entry: &Arc<ModelEntry>, config: &LearningConfig) -> RetrainOutcome {
    let batch = entry.buffer().drain_all();
    if batch.is_empty() {
        return RetrainOutcome::NothingDrained;
    }

    let family = entry.family();
    let hp = entry.hyperparameters();
    let batch_for_fit = batch.clone();

    // Fitting is CPU-bound and can in principle panic on an estimator bug;
    // isolate it on a blocking thread and convert any panic into an ordinary
    // error rather than taking the whole trainer task down with it.
    let fit_result = tokio::task::spawn_blocking(move || {
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            estimator::fit(family, &batch_for_fit, hp)
        }))
    })
    .await;

    let candidate = match fit_result {
        Ok(Ok(Ok(candidate))) => candidate,
        Ok(Ok(Err(err))) => {
            record_failure(entry, &batch, err.to_string());
            return RetrainOutcome::FitFailed { error: err.to_string() };
        }
        Ok(Err(_panic)) => {
            let message = "candidate fit panicked".to_string();
            record_failure(entry, &batch, message.clone());
            return RetrainOutcome::FitFailed { error: message };
        }
        Err(join_err) => {
            let message = format!("fit task failed to join: {join_err}");
            record_failure(entry, &batch, message.clone());
            return RetrainOutcome::FitFailed { error: message };
        }
    };

    let candidate_metrics = candidate.metrics_on(&batch);
    let candidate_preds = predictions(candidate.as_ref(), &batch);

    let current = entry.cell().load();
    let incumbent_metrics = current
        .estimator
        .as_ref()
        .map(|est| est.metrics_on(&batch));
    let incumbent_preds = current
        .estimator
        .as_ref()
        .map(|est| predictions(est.as_ref(), &batch))
        .unwrap_or_default();

    let decision = validator::validate(
        incumbent_metrics.as_ref(),
        &candidate_metrics,
        config,
        &incumbent_preds,
        &candidate_preds,
    );

    match decision {
        Decision::Commit => {
            let version = current.version + 1;
            let stats = Arc::new(next_stats(&current, &batch, &candidate_metrics, version, None));
            entry.lock_dimension(candidate.dimension());
            entry.cell().store(Arc::from(candidate), version, stats);
            RetrainOutcome::Committed { version }
        }
        Decision::Discard => {
            let stats = Arc::new(next_stats(
                &current,
                &batch,
                &candidate_metrics,
                current.version,
                Some("candidate discarded by validator".to_string()),
            ));
            entry.cell().store_stats(stats);
            RetrainOutcome::Discarded {
                reason: "validator discarded candidate",
            }
        }
    }
}

fn record_failure(entry: &Arc<ModelEntry>, batch: &[Example], message: String) {
    let current = entry.cell().load();
    let stats = Arc::new(FitStats {
        n_examples_seen: current.stats.n_examples_seen + batch.len() as u64,
        n_swaps: current.stats.n_swaps,
        last_mse: current.stats.last_mse,
        last_mae: current.stats.last_mae,
        last_trained_at: current.stats.last_trained_at,
        last_error: Some(message),
    });
    entry.cell().store_stats(stats);
}

fn next_stats(
    current: &Triple,
    batch: &[Example],
    candidate_metrics: &Metrics,
    new_version: u64,
    discard_reason: Option<String>,
) -> FitStats {
    let swapped = new_version != current.version;
    FitStats {
        n_examples_seen: current.stats.n_examples_seen + batch.len() as u64,
        n_swaps: current.stats.n_swaps + if swapped { 1 } else { 0 },
        last_mse: if swapped { candidate_metrics.mse } else { current.stats.last_mse },
        last_mae: if swapped { candidate_metrics.mae } else { current.stats.last_mae },
        last_trained_at: if swapped {
            Some(chrono::Utc::now())
        } else {
            current.stats.last_trained_at
        },
        last_error: discard_reason,
    }
}

fn predictions(est: &dyn crate::estimator::Estimator, batch: &[Example]) -> Vec<f64> {
    batch
        .iter()
        .filter_map(|ex| est.predict(&ex.features).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelHyperparameters;
    use crate::estimator::Family;
    use crate::example::Example;

    fn registry_with_one_model(min_samples: usize) -> (Arc<Registry>, LearningConfig) {
        let registry = Arc::new(Registry::new());
        registry
            .register("m1", ModelEntry::new(Family::Linear, ModelHyperparameters::default()))
            .unwrap();
        let config = LearningConfig {
            min_samples,
            interval_sec: 1,
            ..LearningConfig::default()
        };
        (registry, config)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_commits_with_no_incumbent() {
        let (registry, config) = registry_with_one_model(3);
        let entry = registry.lookup("m1").unwrap();
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)] {
            entry.buffer().push(Example::new(vec![x], y));
        }

        run_tick(&registry, &config).await;

        let triple = entry.cell().load();
        assert_eq!(triple.version, 1);
        assert!(triple.estimator.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_with_too_few_samples_does_nothing() {
        let (registry, config) = registry_with_one_model(100);
        let entry = registry.lookup("m1").unwrap();
        entry.buffer().push(Example::new(vec![0.0], 1.0));

        run_tick(&registry, &config).await;

        assert_eq!(entry.cell().load().version, 0);
        assert_eq!(entry.buffer().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn one_tick_commits_multiple_independent_entries() {
        let registry = Arc::new(Registry::new());
        registry
            .register("a", ModelEntry::new(Family::Linear, ModelHyperparameters::default()))
            .unwrap();
        registry
            .register("b", ModelEntry::new(Family::Linear, ModelHyperparameters::default()))
            .unwrap();
        let config = LearningConfig {
            min_samples: 3,
            interval_sec: 1,
            ..LearningConfig::default()
        };

        for name in ["a", "b"] {
            let entry = registry.lookup(name).unwrap();
            for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)] {
                entry.buffer().push(Example::new(vec![x], y));
            }
        }

        run_tick(&registry, &config).await;

        assert_eq!(registry.lookup("a").unwrap().cell().load().version, 1);
        assert_eq!(registry.lookup("b").unwrap().cell().load().version, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_stops_cleanly() {
        let (registry, config) = registry_with_one_model(3);
        let handle = spawn(registry, config);
        handle.stop().await;
    }
}
