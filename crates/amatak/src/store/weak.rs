//! Weak handles

use crate::error::{AmatakError, Result};
use crate::value::{ValueRef, WeakHandle};

use super::ObjectStore;

impl ObjectStore {
    /// Take a weak handle to `v`. The type must support weak references.
    pub fn downgrade(&mut self, v: ValueRef) -> Result<WeakHandle> {
        let entry = self.entry_mut(v)?;
        if !entry.ty.is_weakrefable() {
            return Err(AmatakError::Type(format!(
                "cannot create weak reference to '{}' object",
                entry.ty.name()
            )));
        }
        entry.weak_handles += 1;
        Ok(WeakHandle { target: v })
    }

    /// A new strong reference to the target, or `None` once it was destroyed.
    pub fn upgrade(&mut self, weak: &WeakHandle) -> Option<ValueRef> {
        let entry = self.entry_mut(weak.target).ok()?;
        entry.refcount += 1;
        Some(weak.target)
    }
}

impl WeakHandle {
    /// Whether the target is still alive in `store`.
    pub fn is_alive(&self, store: &ObjectStore) -> bool {
        store.is_live(self.target)
    }
}
