//! Linear regression: the one reference [`super::Estimator`] family.
//!
//! Closed-form weighted least squares (normal equations with optional L2
//! ridge) is the default — a cold fit from scratch on every candidate.
//! Setting `hp.max_iterations > 0` switches to an iterative gradient-descent
//! fit instead; that path *could* warm-start from an incumbent's weights,
//! but this estimator never does so implicitly — only the trainer,
//! explicitly, could choose to pass warm weights in, and today it doesn't.

use super::{Estimator, Metrics};
use crate::config::ModelHyperparameters;
use crate::error::{Error, Result};
use crate::example::Example;

/// A fitted linear model: `y = w . x (+ bias)`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearModel {
    /// Learned coefficients. If `with_bias`, the last entry is the
    /// intercept and `weights.len() == dimension + 1`; otherwise
    /// `weights.len() == dimension`.
    weights: Vec<f64>,
    dimension: usize,
    with_bias: bool,
}

impl LinearModel {
    fn augmented(&self, x: &[f64]) -> Vec<f64> {
        if self.with_bias {
            let mut v = x.to_vec();
            v.push(1.0);
            v
        } else {
            x.to_vec()
        }
    }

    fn required_minimum(dimension: usize, with_bias: bool) -> usize {
        dimension + if with_bias { 1 } else { 0 }
    }

    fn fit_closed_form(batch: &[Example], dimension: usize, hp: ModelHyperparameters) -> Result<Self> {
        let width = dimension + if hp.with_bias { 1 } else { 0 };
        let lambda = hp.regularization.unwrap_or(0.0);

        // Normal equations: (X^T W X + lambda I) beta = X^T W y
        let mut xtx = vec![vec![0.0f64; width]; width];
        let mut xty = vec![0.0f64; width];

        for ex in batch {
            let mut row = ex.features.clone();
            if hp.with_bias {
                row.push(1.0);
            }
            let w = ex.weight;
            for i in 0..width {
                xty[i] += w * row[i] * ex.label;
                for j in 0..width {
                    xtx[i][j] += w * row[i] * row[j];
                }
            }
        }

        for i in 0..width {
            xtx[i][i] += lambda;
        }

        let weights = solve_linear_system(xtx, xty)
            .ok_or_else(|| Error::NumericalFailure("singular normal-equations matrix".to_string()))?;

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::NumericalFailure("non-finite coefficient".to_string()));
        }

        Ok(Self {
            weights,
            dimension,
            with_bias: hp.with_bias,
        })
    }

    fn fit_sgd(batch: &[Example], dimension: usize, hp: ModelHyperparameters) -> Result<Self> {
        let width = dimension + if hp.with_bias { 1 } else { 0 };
        let lambda = hp.regularization.unwrap_or(0.0);
        let mut weights = vec![0.0f64; width];

        let rows: Vec<(Vec<f64>, f64, f64)> = batch
            .iter()
            .map(|ex| {
                let mut row = ex.features.clone();
                if hp.with_bias {
                    row.push(1.0);
                }
                (row, ex.label, ex.weight)
            })
            .collect();

        for _ in 0..hp.max_iterations {
            let mut grad = vec![0.0f64; width];
            for (row, label, w) in &rows {
                let pred: f64 = row.iter().zip(&weights).map(|(a, b)| a * b).sum();
                let err = pred - label;
                for i in 0..width {
                    grad[i] += w * err * row[i];
                }
            }
            let n = rows.len().max(1) as f64;
            for i in 0..width {
                grad[i] = grad[i] / n + lambda * weights[i];
            }

            let grad_norm: f64 = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
            if grad_norm < 1e-6 {
                break;
            }

            for i in 0..width {
                weights[i] -= hp.learning_rate * grad[i];
            }

            if weights.iter().any(|w| !w.is_finite()) {
                return Err(Error::NumericalFailure("SGD diverged".to_string()));
            }
        }

        Ok(Self {
            weights,
            dimension,
            with_bias: hp.with_bias,
        })
    }
}

impl Estimator for LinearModel {
    fn fit(batch: &[Example], hp: ModelHyperparameters) -> Result<Self> {
        if batch.is_empty() {
            return Err(Error::InsufficientData { required: 1, got: 0 });
        }

        let dimension = batch[0].features.len();
        for ex in batch {
            if ex.features.len() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    got: ex.features.len(),
                });
            }
        }

        let required = Self::required_minimum(dimension, hp.with_bias);
        if batch.len() < required {
            return Err(Error::InsufficientData {
                required,
                got: batch.len(),
            });
        }

        if hp.max_iterations > 0 {
            Self::fit_sgd(batch, dimension, hp)
        } else {
            Self::fit_closed_form(batch, dimension, hp)
        }
    }

    fn predict(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                got: x.len(),
            });
        }
        let row = self.augmented(x);
        Ok(row.iter().zip(&self.weights).map(|(a, b)| a * b).sum())
    }

    fn clone_params(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Solve `a x = b` via Gauss-Jordan elimination with partial pivoting.
/// Returns `None` if `a` is singular (or near enough that pivoting fails).
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] /= pivot;
        }
        b[col] /= pivot;

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::Example;

    fn examples(pairs: &[(f64, f64)]) -> Vec<Example> {
        pairs
            .iter()
            .map(|&(x, y)| Example::new(vec![x], y))
            .collect()
    }

    #[test]
    fn fits_exact_line_with_bias() {
        // y = 2x + 1
        let data = examples(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0), (4.0, 9.0)]);
        let hp = ModelHyperparameters::default();
        let model = LinearModel::fit(&data, hp).unwrap();
        let pred = model.predict(&[10.0]).unwrap();
        assert!((pred - 21.0).abs() < 1e-6, "got {pred}");
    }

    #[test]
    fn fits_exact_line_without_bias() {
        // y = 3x
        let data = examples(&[(1.0, 3.0), (2.0, 6.0), (3.0, 9.0)]);
        let hp = ModelHyperparameters {
            with_bias: false,
            ..ModelHyperparameters::default()
        };
        let model = LinearModel::fit(&data, hp).unwrap();
        let pred = model.predict(&[5.0]).unwrap();
        assert!((pred - 15.0).abs() < 1e-6, "got {pred}");
    }

    #[test]
    fn rejects_insufficient_data() {
        let data = examples(&[(0.0, 1.0)]);
        let hp = ModelHyperparameters::default();
        let err = LinearModel::fit(&data, hp).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { .. }));
    }

    #[test]
    fn rejects_inconsistent_dimension_in_batch() {
        let mut data = examples(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
        data.push(Example::new(vec![1.0, 2.0], 3.0));
        let hp = ModelHyperparameters::default();
        let err = LinearModel::fit(&data, hp).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn predict_rejects_wrong_dimension() {
        let data = examples(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]);
        let model = LinearModel::fit(&data, ModelHyperparameters::default()).unwrap();
        let err = model.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn sgd_converges_close_to_closed_form() {
        let data = examples(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0), (4.0, 9.0)]);
        let hp = ModelHyperparameters {
            learning_rate: 0.05,
            max_iterations: 2000,
            ..ModelHyperparameters::default()
        };
        let model = LinearModel::fit(&data, hp).unwrap();
        let pred = model.predict(&[10.0]).unwrap();
        assert!((pred - 21.0).abs() < 0.5, "got {pred}");
    }

    #[test]
    fn metrics_on_batch_reports_zero_error_for_perfect_fit() {
        let data = examples(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)]);
        let model = LinearModel::fit(&data, ModelHyperparameters::default()).unwrap();
        let metrics: Metrics = model.metrics_on(&data);
        assert!(metrics.mse < 1e-9);
        assert_eq!(metrics.n, 4);
    }
}
