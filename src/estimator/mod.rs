//! The pluggable math behind a model: fit a batch, predict one input,
//! self-describe. Everything outside this module treats an estimator as an
//! opaque, deep-copyable value — the swap is a pure pointer replacement
//! precisely because estimators never mutate after `fit`.

pub mod linear;

use crate::config::ModelHyperparameters;
use crate::error::{Error, Result};
use crate::example::Example;
use std::fmt::Debug;

/// Aggregate accuracy metrics computed over a batch of examples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    /// Mean squared error.
    pub mse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Number of examples the metrics were computed over.
    pub n: u64,
}

/// A fitted estimator family.
///
/// Implementations must be stateless between `fit` calls and must not share
/// mutable state across clones: `clone_params` has to produce an instance
/// fully independent of its source, since the trainer holds an incumbent and
/// a candidate side by side before the winner is published.
pub trait Estimator: Debug + Send + Sync {
    /// Fit a fresh estimator from a batch of examples.
    ///
    /// # Errors
    ///
    /// - [`Error::InsufficientData`] if `batch.len()` is below the family's
    ///   required minimum.
    /// - [`Error::DimensionMismatch`] if examples in the batch disagree on
    ///   feature length.
    /// - [`Error::NumericalFailure`] if the underlying math fails (e.g. a
    ///   singular normal-equations matrix).
    fn fit(batch: &[Example], hp: ModelHyperparameters) -> Result<Self>
    where
        Self: Sized;

    /// Predict the label for a single feature vector.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if `x.len()` differs from the dimension
    /// this estimator was fit on.
    fn predict(&self, x: &[f64]) -> Result<f64>;

    /// Compute MSE/MAE over a batch, e.g. the batch that just trained the
    /// candidate, for both the candidate and the incumbent (same held-out
    /// set) so the validator can compare like for like.
    fn metrics_on(&self, batch: &[Example]) -> Metrics {
        let mut se = 0.0;
        let mut ae = 0.0;
        let mut n = 0u64;
        for ex in batch {
            match self.predict(&ex.features) {
                Ok(pred) => {
                    let err = pred - ex.label;
                    se += err * err;
                    ae += err.abs();
                    n += 1;
                }
                Err(_) => continue,
            }
        }
        if n == 0 {
            return Metrics { mse: 0.0, mae: 0.0, n: 0 };
        }
        Metrics {
            mse: se / n as f64,
            mae: ae / n as f64,
            n,
        }
    }

    /// Produce an independent copy — no shared mutable state with `self`.
    fn clone_params(&self) -> Box<dyn Estimator>;

    /// The feature dimension this estimator was fit on.
    fn dimension(&self) -> usize;
}

/// Closed set of estimator families the registry knows how to construct.
/// New families are added here and in [`build`], never as an open-ended
/// string dispatch table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// Linear regression (closed-form least squares or SGD).
    Linear,
}

impl Family {
    /// Parse the external string selector used by `register_model`.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "linear" => Ok(Family::Linear),
            other => Err(Error::UnknownFamily(other.to_string())),
        }
    }
}

/// Fit a fresh boxed estimator of `family` from `batch`.
pub fn fit(family: Family, batch: &[Example], hp: ModelHyperparameters) -> Result<Box<dyn Estimator>> {
    match family {
        Family::Linear => linear::LinearModel::fit(batch, hp).map(|m| Box::new(m) as Box<dyn Estimator>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_family_is_rejected() {
        assert_eq!(
            Family::parse("random-forest"),
            Err(Error::UnknownFamily("random-forest".to_string()))
        );
    }

    #[test]
    fn known_family_parses() {
        assert_eq!(Family::parse("linear"), Ok(Family::Linear));
    }
}
