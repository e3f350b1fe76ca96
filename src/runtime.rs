//! The public façade: the object applications actually hold onto.
//!
//! Wraps a [`Registry`] and an optional running [`TrainerHandle`], and is the
//! only place in the crate where "serving" and "training" concerns meet.

use crate::buffer::{OverflowPolicy, PushOutcome};
use crate::config::{LearningConfig, ModelHyperparameters};
use crate::entry::ModelEntry;
use crate::error::{Error, Result};
use crate::estimator::Family;
use crate::example::Example;
use crate::registry::Registry;
use crate::trainer::{self, TrainerHandle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// A point-in-time description of one registered model, safe to hand back
/// across an API boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: u64,
    pub is_training: bool,
    /// Human-readable fit-history summary; see [`crate::stats::FitStats::summary`].
    pub stats: String,
}

/// The result of a single prediction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: f64,
    /// The model version that produced this prediction — lets a caller
    /// notice mid-batch version changes if it cares to.
    pub model_version: u64,
}

/// The result of a batch prediction: every row is guaranteed to have been
/// predicted against the exact same model version, from a single snapshot
/// load — a batch can never tear across a swap mid-way through.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<f64>,
    pub model_version: u64,
}

/// The in-process, zero-downtime-swap model serving and training runtime.
pub struct Runtime {
    registry: Arc<Registry>,
    learning_config: LearningConfig,
    trainer: Mutex<Option<TrainerHandle>>,
}

impl Runtime {
    /// A runtime with the given default learning configuration, applied to
    /// the continuous-learning task once [`Runtime::start_continuous_learning`]
    /// is called.
    pub fn new(learning_config: LearningConfig) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            learning_config,
            trainer: Mutex::new(None),
        }
    }

    /// Register a new model with the default buffer capacity and policy.
    pub fn register_model(
        &self,
        name: impl Into<String>,
        family: Family,
        hyperparameters: ModelHyperparameters,
    ) -> Result<()> {
        self.registry
            .register(name, ModelEntry::new(family, hyperparameters))
    }

    /// Register a new model selecting its estimator family by the external
    /// string tag (e.g. `"linear"`) rather than the typed [`Family`] enum —
    /// the entry point a language-binding layer calls, where the family
    /// arrives as a string over the FFI boundary rather than as a Rust enum
    /// value. Fails with [`Error::UnknownFamily`] for an unrecognized tag,
    /// without touching the registry.
    pub fn register_model_by_tag(
        &self,
        name: impl Into<String>,
        family_tag: &str,
        hyperparameters: ModelHyperparameters,
    ) -> Result<()> {
        let family = Family::parse(family_tag)?;
        self.register_model(name, family, hyperparameters)
    }

    /// Register a new model with an explicit buffer capacity and overflow
    /// policy.
    pub fn register_model_with_buffer(
        &self,
        name: impl Into<String>,
        family: Family,
        hyperparameters: ModelHyperparameters,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Result<()> {
        self.registry.register(
            name,
            ModelEntry::with_capacity_and_policy(family, hyperparameters, capacity, policy),
        )
    }

    /// Remove a model. Fails with [`Error::Busy`] if a retrain is in flight.
    pub fn unregister_model(&self, name: &str) -> Result<()> {
        self.registry.unregister(name)
    }

    /// Buffer one training example for `name`, optionally forcing a
    /// synchronous, inline retrain attempt right now rather than waiting for
    /// the next scheduled tick.
    ///
    /// Fails with [`Error::DimensionMismatch`] — without buffering anything —
    /// if the model has already locked in a feature width from an earlier
    /// successful fit and `example.features.len()` disagrees with it.
    ///
    /// `do_train_immediately` is best-effort: if another retrain already
    /// holds the entry's training claim, this call still buffers the
    /// example and returns successfully, it simply skips the inline attempt
    /// (the next scheduled tick will pick it up instead).
    pub async fn add_training_example(
        &self,
        name: &str,
        example: Example,
        do_train_immediately: bool,
    ) -> Result<PushOutcome> {
        let entry = self.registry.lookup(name)?;
        if let Some(expected) = entry.dimension() {
            if example.features.len() != expected {
                return Err(Error::DimensionMismatch {
                    expected,
                    got: example.features.len(),
                });
            }
        }
        let outcome = entry.buffer().push(example);

        if do_train_immediately {
            self.retrain_now(name).await?;
        }

        Ok(outcome)
    }

    /// Force an immediate retrain attempt for `name`, bypassing the
    /// `min_samples` gate (an explicit request always attempts a fit on
    /// whatever is currently buffered). A no-op, returning `Ok`, if another
    /// retrain is already in flight or the buffer is empty.
    pub async fn retrain_now(&self, name: &str) -> Result<()> {
        let entry = self.registry.lookup(name)?;
        if !entry.try_claim_training() {
            return Ok(());
        }
        let config = LearningConfig {
            min_samples: 0,
            ..self.learning_config
        };
        trainer::retrain_one(&entry, &config).await;
        entry.release_training();
        Ok(())
    }

    /// Predict against the currently-published model for `name`.
    pub fn predict(&self, name: &str, features: &[f64]) -> Result<PredictionResponse> {
        let entry = self.registry.lookup(name)?;
        let triple = entry.cell().load();
        let estimator = triple
            .estimator
            .as_ref()
            .ok_or_else(|| Error::NotTrained(name.to_string()))?;
        let prediction = estimator.predict(features)?;
        Ok(PredictionResponse {
            prediction,
            model_version: triple.version,
        })
    }

    /// Predict a whole batch against a single, consistent snapshot of the
    /// currently-published model — the cell is loaded exactly once, so no
    /// row in the batch can ever be split across a swap.
    pub fn predict_batch(&self, name: &str, features: &[Vec<f64>]) -> Result<BatchPredictionResponse> {
        let entry = self.registry.lookup(name)?;
        let triple = entry.cell().load();
        let estimator = triple
            .estimator
            .as_ref()
            .ok_or_else(|| Error::NotTrained(name.to_string()))?;

        let mut predictions = Vec::with_capacity(features.len());
        for row in features {
            predictions.push(estimator.predict(row)?);
        }

        Ok(BatchPredictionResponse {
            predictions,
            model_version: triple.version,
        })
    }

    /// A snapshot description of one model.
    pub fn get_model_info(&self, name: &str) -> Result<ModelInfo> {
        let entry = self.registry.lookup(name)?;
        let triple = entry.cell().load();
        Ok(ModelInfo {
            name: name.to_string(),
            version: triple.version,
            is_training: entry.is_training(),
            stats: triple.stats.summary(),
        })
    }

    /// Every registered model name.
    pub fn list_models(&self) -> Vec<String> {
        self.registry.list_names()
    }

    /// Start the background continuous-learning task, if not already
    /// running. Idempotent.
    pub fn start_continuous_learning(&self) {
        let mut guard = self.trainer.lock();
        if guard.is_some() {
            return;
        }
        info!("starting continuous learning loop");
        *guard = Some(trainer::spawn(Arc::clone(&self.registry), self.learning_config));
    }

    /// Stop the background continuous-learning task, if running. Idempotent.
    pub async fn stop_continuous_learning(&self) {
        let handle = {
            let mut guard = self.trainer.lock();
            guard.take()
        };
        if let Some(handle) = handle {
            info!("stopping continuous learning loop");
            handle.stop().await;
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelHyperparameters;

    fn runtime() -> Runtime {
        Runtime::new(LearningConfig::default())
    }

    #[test]
    fn register_model_by_tag_rejects_unknown_family() {
        let rt = runtime();
        let err = rt
            .register_model_by_tag("m1", "random-forest", ModelHyperparameters::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownFamily(_)));
        assert!(rt.list_models().is_empty());
    }

    #[test]
    fn register_model_by_tag_accepts_linear() {
        let rt = runtime();
        rt.register_model_by_tag("m1", "linear", ModelHyperparameters::default())
            .unwrap();
        assert_eq!(rt.list_models(), vec!["m1".to_string()]);
    }

    #[test]
    fn predict_before_training_fails() {
        let rt = runtime();
        rt.register_model("m1", Family::Linear, ModelHyperparameters::default())
            .unwrap();
        let err = rt.predict("m1", &[1.0]).unwrap_err();
        assert!(matches!(err, Error::NotTrained(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn retrain_now_commits_and_unblocks_predict() {
        let rt = runtime();
        rt.register_model("m1", Family::Linear, ModelHyperparameters::default())
            .unwrap();
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)] {
            rt.add_training_example("m1", Example::new(vec![x], y), false)
                .await
                .unwrap();
        }
        rt.retrain_now("m1").await.unwrap();

        let response = rt.predict("m1", &[10.0]).unwrap();
        assert!((response.prediction - 21.0).abs() < 1e-6);
        assert_eq!(response.model_version, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn predict_batch_uses_one_consistent_version() {
        let rt = runtime();
        rt.register_model("m1", Family::Linear, ModelHyperparameters::default())
            .unwrap();
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)] {
            rt.add_training_example("m1", Example::new(vec![x], y), false)
                .await
                .unwrap();
        }
        rt.retrain_now("m1").await.unwrap();

        let response = rt
            .predict_batch("m1", &[vec![0.0], vec![5.0], vec![10.0]])
            .unwrap();
        assert_eq!(response.predictions.len(), 3);
        assert_eq!(response.model_version, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dimension_locks_in_after_first_fit() {
        let rt = runtime();
        rt.register_model("m1", Family::Linear, ModelHyperparameters::default())
            .unwrap();
        for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)] {
            rt.add_training_example("m1", Example::new(vec![x], y), false)
                .await
                .unwrap();
        }
        rt.retrain_now("m1").await.unwrap();

        let err = rt
            .add_training_example("m1", Example::new(vec![1.0, 2.0], 3.0), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 1, got: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_continuous_learning_is_idempotent() {
        let rt = runtime();
        rt.start_continuous_learning();
        rt.start_continuous_learning();
        rt.stop_continuous_learning().await;
        rt.stop_continuous_learning().await;
    }
}
