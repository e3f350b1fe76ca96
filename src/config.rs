//! In-memory configuration structs.
//!
//! No file or env concern here: configuration is handed in programmatically
//! by the embedding application, never read from disk, sockets, or env vars.
//! Just the struct + preset-constructor shape.

use serde::{Deserialize, Serialize};

/// Hyperparameters used to build and fit an estimator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelHyperparameters {
    /// Append an implicit 1.0 feature so the fit can learn an intercept.
    pub with_bias: bool,
    /// Step size for iterative (gradient-based) estimators. Ignored by
    /// closed-form fits.
    pub learning_rate: f64,
    /// Iteration cap for iterative estimators. A value of 0 means "prefer
    /// closed-form where the family supports it".
    pub max_iterations: u32,
    /// L2 regularization strength. `None` means no regularization.
    pub regularization: Option<f64>,
}

impl Default for ModelHyperparameters {
    fn default() -> Self {
        Self {
            with_bias: true,
            learning_rate: 0.01,
            max_iterations: 0,
            regularization: None,
        }
    }
}

impl ModelHyperparameters {
    /// Hyperparameters for an iterative (SGD) fit instead of the closed-form
    /// default.
    pub fn iterative(learning_rate: f64, max_iterations: u32) -> Self {
        Self {
            with_bias: true,
            learning_rate,
            max_iterations,
            regularization: None,
        }
    }

    /// Builder-style setter for `regularization`.
    pub fn with_regularization(mut self, lambda: f64) -> Self {
        self.regularization = Some(lambda);
        self
    }
}

/// Controls the background trainer's cadence and swap policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// The trainer loop runs while this is true.
    pub enabled: bool,
    /// Wake period of the trainer loop, in seconds.
    pub interval_sec: u32,
    /// Minimum unconsumed examples before an entry is eligible for retraining.
    pub min_samples: u32,
    /// If false, candidates are fit and validated but never committed
    /// (dry-run mode).
    pub auto_swap: bool,
    /// Minimum relative MSE improvement required to swap (MSE mode), or
    /// minimum KL divergence required to swap (KL mode). See
    /// [`crate::validator`].
    pub validation_threshold: f64,
    /// Selects the validator metric: relative MSE improvement (false, the
    /// default) or KL divergence between predicted distributions (true).
    /// KL mode is a drift detector, not an accuracy check — see
    /// [`crate::validator`] for the full semantics before enabling it.
    pub use_kl_divergence: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_sec: 60,
            min_samples: 100,
            auto_swap: true,
            validation_threshold: 0.0,
            use_kl_divergence: false,
        }
    }
}

impl LearningConfig {
    /// Short interval, low sample threshold — retrains quickly as data
    /// arrives. Good for demos and for models that need to track fast drift.
    pub fn frequent_updates() -> Self {
        Self {
            enabled: true,
            interval_sec: 5,
            min_samples: 10,
            auto_swap: true,
            validation_threshold: 0.0,
            use_kl_divergence: false,
        }
    }

    /// Long interval, high sample threshold, and a positive improvement bar
    /// — avoids version churn in favor of stability.
    pub fn conservative() -> Self {
        Self {
            enabled: true,
            interval_sec: 300,
            min_samples: 500,
            auto_swap: true,
            validation_threshold: 0.05,
            use_kl_divergence: false,
        }
    }
}
