//! The named-model directory: a concurrent map from model name to its
//! [`ModelEntry`], using `dashmap::DashMap` for sharded, lock-striped
//! concurrent lookups.

use crate::entry::ModelEntry;
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;

/// The registry of all models known to a runtime instance.
///
/// Lookups and inserts are independent of each other model's training state
/// — registering or looking up model "b" never contends with a fit in
/// progress on model "a".
pub struct Registry {
    models: DashMap<String, Arc<ModelEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            models: DashMap::new(),
        }
    }

    /// Register a new model under `name`. Fails with [`Error::AlreadyExists`]
    /// if the name is already taken.
    pub fn register(&self, name: impl Into<String>, entry: ModelEntry) -> Result<()> {
        let name = name.into();
        match self.models.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::AlreadyExists(name)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(entry));
                Ok(())
            }
        }
    }

    /// Remove a model by name. Fails with [`Error::Busy`] if a fit is
    /// currently in flight for it — a retrain in progress must finish (or be
    /// abandoned by the trainer loop) before the entry can be torn down,
    /// otherwise the trainer could try to commit into a cell nobody holds
    /// anymore.
    ///
    /// Claims the entry's own training CAS rather than taking a point-in-time
    /// `is_training()` read: a plain read-then-remove leaves a window between
    /// the check and the removal where the trainer can win the same CAS and
    /// start fitting an entry that's about to disappear. Claiming it here
    /// closes that window — either we win the claim (no fit was or can
    /// concurrently become in flight) or we lose it to a real in-progress
    /// fit and correctly report `Busy`. The claim is never released since the
    /// entry is removed either way.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let entry = self
            .models
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if !entry.try_claim_training() {
            return Err(Error::Busy(name.to_string()));
        }
        self.models.remove(name);
        Ok(())
    }

    /// Look up a model by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ModelEntry>> {
        self.models
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// All registered model names, in no particular order.
    pub fn list_names(&self) -> Vec<String> {
        self.models.iter().map(|r| r.key().clone()).collect()
    }

    /// A snapshot of every `(name, entry)` pair currently registered, used by
    /// the trainer to scan the registry once per tick without holding any
    /// single shard lock for the whole scan.
    pub fn snapshot(&self) -> Vec<(String, Arc<ModelEntry>)> {
        self.models
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelHyperparameters;
    use crate::estimator::Family;

    fn fresh_entry() -> ModelEntry {
        ModelEntry::new(Family::Linear, ModelHyperparameters::default())
    }

    #[test]
    fn register_then_lookup_succeeds() {
        let reg = Registry::new();
        reg.register("m1", fresh_entry()).unwrap();
        assert!(reg.lookup("m1").is_ok());
    }

    #[test]
    fn double_register_is_rejected() {
        let reg = Registry::new();
        reg.register("m1", fresh_entry()).unwrap();
        let err = reg.register("m1", fresh_entry()).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn lookup_missing_model_fails() {
        let reg = Registry::new();
        let err = reg.lookup("ghost").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn unregister_while_training_is_rejected() {
        let reg = Registry::new();
        reg.register("m1", fresh_entry()).unwrap();
        let entry = reg.lookup("m1").unwrap();
        assert!(entry.try_claim_training());

        let err = reg.unregister("m1").unwrap_err();
        assert!(matches!(err, Error::Busy(_)));

        entry.release_training();
        assert!(reg.unregister("m1").is_ok());
    }

    #[test]
    fn unregister_claims_training_so_a_concurrent_fit_cannot_start() {
        let reg = Registry::new();
        reg.register("m1", fresh_entry()).unwrap();
        // Simulate a trainer tick that already holds an `Arc<ModelEntry>`
        // from an earlier snapshot, racing the unregister call below.
        let entry = reg.lookup("m1").unwrap();

        assert!(reg.unregister("m1").is_ok());

        // The entry is gone from the registry, but the instance a racing
        // trainer tick is still holding can never win the training claim
        // `unregister` already took — it would otherwise be free to fit an
        // entry nobody can look up or commit into anymore.
        assert!(!entry.try_claim_training());
    }

    #[test]
    fn snapshot_reflects_current_registrations() {
        let reg = Registry::new();
        reg.register("a", fresh_entry()).unwrap();
        reg.register("b", fresh_entry()).unwrap();
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
    }
}
