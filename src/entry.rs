//! A single registered model: its cell, its buffer, and the bookkeeping the
//! trainer needs to decide whether to touch it on a given tick.

use crate::buffer::{OverflowPolicy, TrainingBuffer};
use crate::cell::ModelCell;
use crate::config::ModelHyperparameters;
use crate::estimator::Family;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Sentinel stored in `dimension_lock` before any successful fit has
/// established a feature width.
const UNSET_DIMENSION: i64 = -1;

/// One entry in the registry: everything needed to serve, buffer, and
/// eventually retrain one named model.
///
/// `is_training` is the CAS-guarded flag the trainer uses to claim exclusive
/// rights to drain and refit this entry — at most one in-flight fit per
/// entry at a time.
pub struct ModelEntry {
    cell: ModelCell,
    buffer: TrainingBuffer,
    family: Family,
    hyperparameters: ModelHyperparameters,
    is_training: AtomicBool,
    /// Feature dimension established at the first successful fit, or
    /// [`UNSET_DIMENSION`] before that. One-shot: once set, later examples of
    /// a different length are rejected rather than silently re-deriving it.
    /// Checked by [`crate::runtime::Runtime::add_training_example`] before a
    /// push ever reaches the buffer.
    dimension_lock: AtomicI64,
}

impl ModelEntry {
    /// A fresh, untrained entry with the default buffer capacity and policy.
    pub fn new(family: Family, hyperparameters: ModelHyperparameters) -> Self {
        Self::with_buffer(family, hyperparameters, TrainingBuffer::new())
    }

    /// A fresh entry with a caller-supplied buffer (custom capacity/policy).
    pub fn with_buffer(
        family: Family,
        hyperparameters: ModelHyperparameters,
        buffer: TrainingBuffer,
    ) -> Self {
        Self {
            cell: ModelCell::new(),
            buffer,
            family,
            hyperparameters,
            is_training: AtomicBool::new(false),
            dimension_lock: AtomicI64::new(UNSET_DIMENSION),
        }
    }

    /// A fresh entry with a custom buffer capacity and overflow policy.
    pub fn with_capacity_and_policy(
        family: Family,
        hyperparameters: ModelHyperparameters,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Self {
        Self::with_buffer(
            family,
            hyperparameters,
            TrainingBuffer::with_capacity_and_policy(capacity, policy),
        )
    }

    pub fn cell(&self) -> &ModelCell {
        &self.cell
    }

    pub fn buffer(&self) -> &TrainingBuffer {
        &self.buffer
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn hyperparameters(&self) -> ModelHyperparameters {
        self.hyperparameters
    }

    /// Whether a fit is currently in flight for this entry.
    pub fn is_training(&self) -> bool {
        self.is_training.load(Ordering::Acquire)
    }

    /// Attempt to claim exclusive training rights. Returns `true` if this
    /// call won the claim (was the one to flip `false -> true`); `false` if
    /// another caller already holds it.
    pub fn try_claim_training(&self) -> bool {
        self.is_training
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release a previously-claimed training slot. Only the claimant should
    /// call this.
    pub fn release_training(&self) {
        self.is_training.store(false, Ordering::Release);
    }

    /// The feature dimension locked in at the first successful fit, if any.
    pub fn dimension(&self) -> Option<usize> {
        match self.dimension_lock.load(Ordering::Acquire) {
            UNSET_DIMENSION => None,
            n => Some(n as usize),
        }
    }

    /// Record the feature dimension of the first successful fit. A no-op if
    /// the dimension is already locked in — the lock is one-shot by design.
    pub fn lock_dimension(&self, dimension: usize) {
        self.dimension_lock
            .compare_exchange(
                UNSET_DIMENSION,
                dimension as i64,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelHyperparameters;
    use crate::estimator::Family;

    fn entry() -> ModelEntry {
        ModelEntry::new(Family::Linear, ModelHyperparameters::default())
    }

    #[test]
    fn fresh_entry_is_untrained_and_not_training() {
        let e = entry();
        assert_eq!(e.cell().load().version, 0);
        assert!(!e.is_training());
    }

    #[test]
    fn only_one_caller_wins_the_training_claim() {
        let e = entry();
        assert!(e.try_claim_training());
        assert!(!e.try_claim_training());
        e.release_training();
        assert!(e.try_claim_training());
    }

    #[test]
    fn dimension_is_unset_until_locked() {
        let e = entry();
        assert_eq!(e.dimension(), None);
        e.lock_dimension(3);
        assert_eq!(e.dimension(), Some(3));
    }

    #[test]
    fn dimension_lock_is_one_shot() {
        let e = entry();
        e.lock_dimension(3);
        e.lock_dimension(7);
        assert_eq!(e.dimension(), Some(3));
    }
}
