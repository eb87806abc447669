use std::collections::HashMap;

use parking_lot::RwLock;

use crate::key::{EntityKey, SlotId};

#[derive(Default)]
struct Inner {
    slots: HashMap<EntityKey, SlotId>,
    last_values: HashMap<EntityKey, f64>,
}

/// Shared mapping from tracked entity to display slot, plus the last value
/// observed for each entity.
///
/// Both maps sit behind one lock so a reader never sees a value whose slot
/// has already been removed.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the slot for `key`.
    ///
    /// Replacing with a different slot drops the cached value, since it
    /// described what the old slot displayed.
    pub fn add(&self, key: EntityKey, slot: SlotId) -> Option<SlotId> {
        let mut inner = self.inner.write();
        let previous = inner.slots.insert(key.clone(), slot);
        if previous.is_some_and(|old| old != slot) {
            inner.last_values.remove(&key);
        }
        previous
    }

    /// Remove `key` and its cached value. Removing an absent key is a no-op.
    pub fn remove(&self, key: &EntityKey) -> Option<SlotId> {
        let mut inner = self.inner.write();
        inner.last_values.remove(key);
        inner.slots.remove(key)
    }

    pub fn slot(&self, key: &EntityKey) -> Option<SlotId> {
        self.inner.read().slots.get(key).copied()
    }

    /// Copy of the current entries, for iterating without holding the lock
    /// across network calls.
    pub fn snapshot(&self) -> Vec<(EntityKey, SlotId)> {
        self.inner
            .read()
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), *slot))
            .collect()
    }

    pub fn last_value(&self, key: &EntityKey) -> Option<f64> {
        self.inner.read().last_values.get(key).copied()
    }

    /// Previous value for `key`, or `current` when nothing was observed yet.
    pub fn last_value_or(&self, key: &EntityKey, current: f64) -> f64 {
        self.last_value(key).unwrap_or(current)
    }

    /// Record `value` for `key`. Ignored (returns false) when the entity has
    /// been removed in the meantime.
    pub fn set_last_value(&self, key: &EntityKey, value: f64) -> bool {
        let mut inner = self.inner.write();
        if !inner.slots.contains_key(key) {
            return false;
        }
        inner.last_values.insert(key.clone(), value);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
