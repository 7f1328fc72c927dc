//! Cycle detection and store teardown
//!
//! Reference counting alone cannot reclaim values that only reference each
//! other. Detection uses trial deletion: start from each value's count,
//! subtract references held by other live values, and treat anything left
//! with a positive count as externally referenced. Values not reachable from
//! those roots are cyclic garbage.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::value::ValueRef;

use super::ObjectStore;

/// What `ObjectStore::teardown` found and freed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Values reclaimed by cycle collection: cycle members plus the values
    /// only they kept alive
    pub cyclic_objects: usize,
    /// Values still referenced from outside the store that were force-freed
    pub leaked_objects: usize,
}

impl ObjectStore {
    /// Values that are only reachable through reference cycles.
    ///
    /// Includes values outside any cycle that nothing but cycle members
    /// references.
    pub fn find_cycles(&self) -> Vec<ValueRef> {
        let live = self.live_handles();
        let mut external: HashMap<ValueRef, usize> = HashMap::with_capacity(live.len());
        for v in &live {
            if let Ok(entry) = self.entry(*v) {
                external.insert(*v, entry.refcount);
            }
        }

        let mut children = Vec::new();
        for v in &live {
            if let Ok(entry) = self.entry(*v) {
                children.clear();
                entry.payload.children(&mut children);
                for child in &children {
                    if let Some(count) = external.get_mut(child) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
        }

        let mut reachable: HashSet<ValueRef> = HashSet::with_capacity(live.len());
        let mut stack: Vec<ValueRef> = external
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(v, _)| *v)
            .collect();
        while let Some(v) = stack.pop() {
            if !reachable.insert(v) {
                continue;
            }
            if let Ok(entry) = self.entry(v) {
                children.clear();
                entry.payload.children(&mut children);
                stack.extend(children.iter().filter(|c| !reachable.contains(*c)));
            }
        }

        live.into_iter()
            .filter(|v| !reachable.contains(v))
            .collect()
    }

    /// Free every value only kept alive by reference cycles.
    ///
    /// Returns the number of values reclaimed, counting everything
    /// [`find_cycles`](Self::find_cycles) reports. References from the
    /// garbage to surviving values are released normally.
    pub fn collect_cycles(&mut self) -> usize {
        let garbage = self.find_cycles();
        if garbage.is_empty() {
            return 0;
        }
        let doomed: HashSet<ValueRef> = garbage.iter().copied().collect();
        let mut outside = Vec::new();
        let mut children = Vec::new();
        for v in &garbage {
            if let Some(entry) = self.free_slot(*v) {
                trace!(handle = ?v, ty = entry.ty.name(), "reclaiming cyclic value");
                children.clear();
                entry.payload.children(&mut children);
                outside.extend(children.iter().filter(|c| !doomed.contains(*c)));
            }
        }
        self.release_all(outside);
        self.stats.cycles_collected += garbage.len();
        debug!(count = garbage.len(), "collected reference cycles");
        garbage.len()
    }

    /// Bring every reference count to zero.
    ///
    /// Cycles are reclaimed and reported first, then the store's singletons
    /// are released, then anything still alive (handles the embedder never
    /// released) is freed by force. The store refuses new values afterwards.
    pub fn teardown(&mut self) -> TeardownReport {
        let cyclic_objects = self.collect_cycles();
        if cyclic_objects > 0 {
            warn!(
                count = cyclic_objects,
                "reference cycles could not be reclaimed by reference counting"
            );
        }

        if let Some(singletons) = self.singletons.take() {
            self.discard(singletons.none);
            self.discard(singletons.true_value);
            self.discard(singletons.false_value);
        }

        let leaked = self.live_handles();
        if !leaked.is_empty() {
            warn!(count = leaked.len(), "values still referenced at teardown");
        }
        for v in &leaked {
            if let Some(entry) = self.free_slot(*v) {
                trace!(handle = ?v, ty = entry.ty.name(), refcount = entry.refcount, "force-freed value");
            }
        }
        self.attr_cache.clear();

        TeardownReport {
            cyclic_objects,
            leaked_objects: leaked.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::StoreLimits;
    use super::*;

    #[test]
    fn test_self_referencing_list_is_cyclic() {
        let mut store = ObjectStore::new(StoreLimits::default()).unwrap();
        let list = store.list(vec![]).unwrap();
        store.retain(list).unwrap();
        if let crate::value::Payload::List(items) = store.payload_mut(list).unwrap() {
            items.push(list);
        }
        assert!(store.find_cycles().is_empty());
        store.release(list).unwrap();
        assert_eq!(store.find_cycles(), vec![list]);
        assert_eq!(store.collect_cycles(), 1);
        assert!(!store.is_live(list));
    }

    #[test]
    fn test_teardown_frees_everything() {
        let mut store = ObjectStore::new(StoreLimits::default()).unwrap();
        let _leaked = store.string("kept").unwrap();
        let report = store.teardown();
        assert_eq!(report.leaked_objects, 1);
        assert_eq!(report.cyclic_objects, 0);
        assert_eq!(store.live_count(), 0);
        assert!(store.is_torn_down());
        assert!(store.none().is_err());
    }
}
