//! Crate-wide error taxonomy.

use thiserror::Error;

/// Everything that can go wrong calling into the runtime.
///
/// Trainer-internal failures (a candidate that fails to fit, a panic inside
/// an estimator) never surface through this type — they are recorded in the
/// offending entry's stats instead. See [`crate::stats::FitStats`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No model registered under this name.
    #[error("model not found: {0}")]
    NotFound(String),

    /// `register_model` called with a name already in the registry.
    #[error("model already exists: {0}")]
    AlreadyExists(String),

    /// `register_model` called with an estimator family tag the registry
    /// doesn't know how to construct.
    #[error("unknown estimator family: {0}")]
    UnknownFamily(String),

    /// Predict was called before the entry ever completed a successful fit
    /// (cell is still at version 0).
    #[error("model has not completed a fit yet: {0}")]
    NotTrained(String),

    /// Feature vector length disagrees with the dimension the model learned
    /// on at its first successful fit.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension the model was fit on.
        expected: usize,
        /// Dimension of the offending vector.
        got: usize,
    },

    /// `fit` was called with fewer examples than the family requires.
    #[error("insufficient data: need at least {required}, got {got}")]
    InsufficientData {
        /// Minimum batch size the family requires.
        required: usize,
        /// Size of the batch actually supplied.
        got: usize,
    },

    /// The estimator's math failed (singular system, NaN parameter, etc.).
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// Requested operation is forbidden while the entry is training.
    #[error("model is busy training: {0}")]
    Busy(String),

    /// An invariant the runtime relies on was violated. Should never escape
    /// a correct implementation; reaching this is a bug.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
