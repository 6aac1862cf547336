//! Entity store adapter.
//!
//! Ingestion publishes snapshots; solves and repairs read one snapshot and
//! keep it for their whole lifetime, so a newer publication never
//! invalidates an in-flight call.

use std::sync::{Arc, PoisonError, RwLock};

use super::snapshot::EntitySnapshot;

/// Read-only source of entity snapshots.
pub trait EntityStore: Send + Sync {
    /// Returns the current snapshot.
    fn snapshot(&self) -> Arc<EntitySnapshot>;
}

/// An in-memory store with copy-on-read semantics.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use timeweave_core::{Calendar, CalendarConfig, EntitySnapshot, EntityStore, SharedEntityStore};
///
/// let calendar = Calendar::derive(&CalendarConfig::default()).unwrap();
/// let store = SharedEntityStore::new(EntitySnapshot::new(calendar.clone()));
///
/// let held = store.snapshot();
/// store.publish(EntitySnapshot::new(calendar));
///
/// // The earlier reader still sees its own snapshot.
/// assert!(!Arc::ptr_eq(&held, &store.snapshot()));
/// ```
#[derive(Debug)]
pub struct SharedEntityStore {
    current: RwLock<Arc<EntitySnapshot>>,
}

impl SharedEntityStore {
    pub fn new(snapshot: EntitySnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Replaces the current snapshot. Readers holding the previous one keep it.
    pub fn publish(&self, snapshot: EntitySnapshot) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(snapshot);
    }
}

impl EntityStore for SharedEntityStore {
    fn snapshot(&self) -> Arc<EntitySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EntityStore for Arc<EntitySnapshot> {
    fn snapshot(&self) -> Arc<EntitySnapshot> {
        Arc::clone(self)
    }
}
