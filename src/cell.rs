//! The versioned, atomically-swappable slot an entry's estimator lives in.
//!
//! `load()` is a wait-free atomic pointer read, `store()` is a single atomic
//! swap, and reclamation of the outgoing triple is ordinary `Arc` refcounting
//! (no readers holding a guard ever see it freed out from under them).

use crate::estimator::Estimator;
use crate::stats::FitStats;
use arc_swap::{ArcSwap, Guard};
use std::sync::Arc;

/// The `(estimator, version, stats)` triple a cell publishes.
///
/// Version 0 is the sentinel "registered but never successfully fit" state;
/// `estimator` is `None` exactly when `version == 0`.
pub struct Triple {
    /// The currently-published estimator, or `None` before the first commit.
    pub estimator: Option<Arc<dyn Estimator>>,
    /// Monotonically increasing version. 0 means never fit.
    pub version: u64,
    /// Stats as of this version (examples seen, swap count, last error...).
    pub stats: Arc<FitStats>,
}

impl Triple {
    fn genesis() -> Self {
        Self {
            estimator: None,
            version: 0,
            stats: Arc::new(FitStats::default()),
        }
    }
}

/// A lock-free, single-writer-many-reader slot holding the live triple for
/// one model entry.
pub struct ModelCell {
    current: ArcSwap<Triple>,
}

impl ModelCell {
    /// A fresh cell at version 0 (no estimator yet).
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Triple::genesis()),
        }
    }

    /// Wait-free load of the current triple. The returned guard is valid for
    /// as long as the caller holds it, even across a concurrent `store`.
    #[inline]
    pub fn load(&self) -> Guard<Arc<Triple>> {
        self.current.load()
    }

    /// Atomically publish a new triple. The previous one is released for
    /// reclamation once the last reader holding it drops its guard.
    pub fn store(&self, estimator: Arc<dyn Estimator>, version: u64, stats: Arc<FitStats>) {
        self.current.store(Arc::new(Triple {
            estimator: Some(estimator),
            version,
            stats,
        }));
    }

    /// Replace only the stats half of the current triple (used by the
    /// trainer to record a failed-fit observation without touching the
    /// served estimator or bumping the version).
    pub fn store_stats(&self, stats: Arc<FitStats>) {
        let current = self.current.load();
        self.current.store(Arc::new(Triple {
            estimator: current.estimator.clone(),
            version: current.version,
            stats,
        }));
    }
}

impl Default for ModelCell {
    fn default() -> Self {
        Self::new()
    }
}
