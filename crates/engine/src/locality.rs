//! Locality tracker
//!
//! Per-object write-authority classification. The tracker only records the
//! value; the store accepts writes regardless of locality.

use rustc_hash::FxHashMap;
use tether_core::{Change, Locality, ObjectHandle};

/// Object → locality map
#[derive(Debug, Default)]
pub struct LocalityTracker {
    localities: FxHashMap<ObjectHandle, Locality>,
}

impl LocalityTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `object`
    pub fn insert(&mut self, object: ObjectHandle, locality: Locality) {
        self.localities.insert(object, locality);
    }

    /// Set the locality of a tracked object
    ///
    /// Setting the current value is `Unchanged`. Untracked objects start
    /// from `Unknown`.
    pub fn set(&mut self, object: ObjectHandle, locality: Locality) -> Change<Locality> {
        let slot = self.localities.entry(object).or_default();
        if *slot == locality {
            return Change::Unchanged;
        }
        let previous = std::mem::replace(slot, locality);
        Change::Set {
            previous: Some(previous),
        }
    }

    /// Locality of `object`, `Unknown` if untracked
    pub fn get(&self, object: ObjectHandle) -> Locality {
        self.localities.get(&object).copied().unwrap_or_default()
    }

    /// Stop tracking `object`
    pub fn remove(&mut self, object: ObjectHandle) -> Option<Locality> {
        self.localities.remove(&object)
    }
}
