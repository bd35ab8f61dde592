//! Latest-value cell shared between a producer and request handlers.

use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

/// Holds the most recently published value.
///
/// Publishing swaps in a new `Arc`; readers clone the `Arc` out, so no lock is
/// held while a reader serializes the value.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }
}

impl<T> SnapshotCell<T> {
    /// Replaces the current value.
    pub fn publish(&self, value: T) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(value));
    }

    /// Most recently published value.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets the current value.
    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Handle for publishing the result reported by the `query` method.
#[derive(Debug, Clone, Default)]
pub struct ResultPublisher {
    cell: Arc<SnapshotCell<Map<String, Value>>>,
}

impl ResultPublisher {
    /// Publishes a new result object.
    pub fn publish(&self, result: Map<String, Value>) {
        self.cell.publish(result);
    }

    /// Latest published result.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<Map<String, Value>>> {
        self.cell.latest()
    }

    /// Withdraws the published result.
    pub fn clear(&self) {
        self.cell.clear();
    }
}
