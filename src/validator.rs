//! The pure decision function that gates a swap: `validate(...) -> Decision`.
//!
//! Deliberately side-effect free — the trainer is the only caller, and it's
//! the trainer's job to act on the [`Decision`], not this function's.

use crate::config::LearningConfig;
use crate::estimator::Metrics;

/// Numerical floor used in the MSE-mode relative-improvement ratio, to avoid
/// dividing by (near) zero when the incumbent is already a perfect fit.
const EPS: f64 = 1e-12;

/// Smoothing constant applied to both distributions before KL divergence, to
/// avoid taking `log(0)`.
const KL_SMOOTHING: f64 = 1e-10;

/// The validator's verdict on a freshly fit candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Commit the candidate: swap it in as the new incumbent.
    Commit,
    /// Discard the candidate; the incumbent keeps serving.
    Discard,
}

/// Decide whether a candidate should replace the incumbent.
///
/// `incumbent_preds`/`candidate_preds` are each model's predictions over the
/// same held-out batch (the examples that just trained the candidate), used
/// only in KL mode; MSE mode only needs the two [`Metrics`].
///
/// Case order matters:
/// 1. No incumbent yet (`incumbent` is `None`) — always commit.
/// 2. `config.auto_swap == false` — always discard (dry run).
/// 3. `config.use_kl_divergence == false` — relative MSE improvement test.
/// 4. `config.use_kl_divergence == true` — KL-divergence drift test.
pub fn validate(
    incumbent: Option<&Metrics>,
    candidate: &Metrics,
    config: &LearningConfig,
    incumbent_preds: &[f64],
    candidate_preds: &[f64],
) -> Decision {
    let incumbent = match incumbent {
        None => return Decision::Commit,
        Some(m) => m,
    };

    if !config.auto_swap {
        return Decision::Discard;
    }

    if config.use_kl_divergence {
        validate_kl(incumbent_preds, candidate_preds, config.validation_threshold)
    } else {
        validate_mse(incumbent, candidate, config.validation_threshold)
    }
}

fn validate_mse(incumbent: &Metrics, candidate: &Metrics, threshold: f64) -> Decision {
    let denom = incumbent.mse.max(EPS);
    let relative_improvement = (incumbent.mse - candidate.mse) / denom;

    // Exact equality (including the "no improvement at all" case) is
    // conservative: discard to avoid version churn.
    if relative_improvement > 0.0 && relative_improvement >= threshold {
        Decision::Commit
    } else {
        Decision::Discard
    }
}

fn validate_kl(incumbent_preds: &[f64], candidate_preds: &[f64], threshold: f64) -> Decision {
    let divergence = kl_divergence(incumbent_preds, candidate_preds);
    if divergence > 0.0 && divergence >= threshold {
        Decision::Commit
    } else {
        Decision::Discard
    }
}

/// `KL(candidate || incumbent)` over the two prediction sequences, treated as
/// empirical distributions after min-max normalization and smoothing.
///
/// This is a *drift detector*, not an accuracy check: a large divergence
/// means the candidate's predictions look very different from the
/// incumbent's, which is the signal you want when chasing distribution
/// drift, not when optimizing for lower error. Do not default to this mode.
fn kl_divergence(incumbent_preds: &[f64], candidate_preds: &[f64]) -> f64 {
    let p = normalize(candidate_preds);
    let q = normalize(incumbent_preds);
    if p.is_empty() || q.is_empty() || p.len() != q.len() {
        return 0.0;
    }
    p.iter().zip(&q).map(|(pi, qi)| pi * (pi / qi).ln()).sum()
}

/// Min-max normalize to `[0, 1]`, smooth by `KL_SMOOTHING`, then renormalize
/// to a probability distribution.
fn normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(EPS);

    let smoothed: Vec<f64> = values
        .iter()
        .map(|v| (v - min) / range + KL_SMOOTHING)
        .collect();
    let sum: f64 = smoothed.iter().sum();
    smoothed.iter().map(|v| v / sum).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// No incumbent always commits, whatever the candidate's error looks like.
        #[test]
        fn no_incumbent_always_commits(candidate_mse in 0.0f64..1e6, threshold in 0.0f64..5.0) {
            let cfg = LearningConfig { validation_threshold: threshold, ..LearningConfig::default() };
            let candidate = Metrics { mse: candidate_mse, mae: candidate_mse.sqrt(), n: 10 };
            prop_assert_eq!(validate(None, &candidate, &cfg, &[], &[]), Decision::Commit);
        }

        /// With auto_swap off, an incumbent is never replaced no matter the metrics.
        #[test]
        fn dry_run_never_commits(
            incumbent_mse in 0.0f64..1e6,
            candidate_mse in 0.0f64..1e6,
            threshold in 0.0f64..5.0,
        ) {
            let cfg = LearningConfig {
                auto_swap: false,
                validation_threshold: threshold,
                ..LearningConfig::default()
            };
            let incumbent = Metrics { mse: incumbent_mse, mae: incumbent_mse.sqrt(), n: 10 };
            let candidate = Metrics { mse: candidate_mse, mae: candidate_mse.sqrt(), n: 10 };
            prop_assert_eq!(
                validate(Some(&incumbent), &candidate, &cfg, &[], &[]),
                Decision::Discard
            );
        }

        /// In MSE mode, a candidate whose error is no lower than the incumbent's
        /// is never committed, for any positive threshold.
        #[test]
        fn mse_mode_never_commits_a_non_improving_candidate(
            incumbent_mse in 0.0f64..1e6,
            extra_error in 0.0f64..1e6,
            threshold in 0.0f64..5.0,
        ) {
            let cfg = LearningConfig { validation_threshold: threshold, ..LearningConfig::default() };
            let incumbent = Metrics { mse: incumbent_mse, mae: incumbent_mse.sqrt(), n: 10 };
            let candidate = Metrics {
                mse: incumbent_mse + extra_error,
                mae: (incumbent_mse + extra_error).sqrt(),
                n: 10,
            };
            prop_assert_eq!(
                validate_mse(&incumbent, &candidate, cfg.validation_threshold),
                Decision::Discard
            );
        }

        /// Normalizing any non-empty, finite slice always yields a distribution
        /// of the same length that sums to 1.
        #[test]
        fn normalize_always_yields_a_probability_distribution(
            values in prop::collection::vec(-1e6f64..1e6, 1..20)
        ) {
            let normalized = normalize(&values);
            prop_assert_eq!(normalized.len(), values.len());
            let sum: f64 = normalized.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-6);
        }
    }
}
