//! Reference-counted object store
//!
//! All runtime values live in an arena of slots addressed by [`ValueRef`]
//! handles. Each slot records a reference count, the value's type and its
//! payload. Freed slots go on a free list and their generation is bumped,
//! so a handle that outlived its value is reported instead of silently
//! aliasing whatever reuses the slot.
//!
//! Ownership convention: constructors, `dispatch` and attribute/item getters
//! return a new owned reference. Functions that take `&[ValueRef]` arguments
//! only borrow them. `list` consumes the handles it is given.

mod attrs;
mod collect;
mod dispatch;
mod host;
mod repr;
mod weak;

pub use collect::TeardownReport;

use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::error::{AmatakError, Result};
use crate::types::{BuiltinTypes, TypeRef};
use crate::value::{ModuleData, Payload, ValueRef};

use attrs::AttrCache;

static LIVE_OBJECTS: AtomicUsize = AtomicUsize::new(0);

/// Number of live values across every store in the process.
///
/// Diagnostic only: it is shared by all contexts, so it is not suitable for
/// assertions while other contexts run.
pub fn global_live_objects() -> usize {
    LIVE_OBJECTS.load(Ordering::Relaxed)
}

/// Allocation limits of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum number of live values
    pub max_objects: Option<usize>,
    /// Maximum accounted bytes (type basic size plus payload estimate)
    pub memory_limit: Option<usize>,
}

/// Counters kept for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Values allocated
    pub allocations: usize,
    /// Values destroyed
    pub deallocations: usize,
    /// Weak handles invalidated by destruction of their target
    pub weak_invalidations: usize,
    /// Values reclaimed by cycle collection
    pub cycles_collected: usize,
    /// Attribute lookups served from the cache
    pub attr_cache_hits: usize,
    /// Attribute lookups that missed the cache
    pub attr_cache_misses: usize,
}

struct Entry {
    refcount: usize,
    ty: TypeRef,
    payload: Payload,
    size: usize,
    weak_handles: usize,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Debug, Clone, Copy)]
struct Singletons {
    none: ValueRef,
    true_value: ValueRef,
    false_value: ValueRef,
}

/// Arena of reference-counted values.
pub struct ObjectStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    types: BuiltinTypes,
    limits: StoreLimits,
    live: usize,
    allocated_bytes: usize,
    singletons: Option<Singletons>,
    attr_cache: AttrCache,
    stats: StoreStats,
}

impl ObjectStore {
    /// Create a store with its own built-in types and `None`/`true`/`false` singletons.
    pub fn new(limits: StoreLimits) -> Result<Self> {
        let mut store = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            types: BuiltinTypes::new(),
            limits: StoreLimits::default(),
            live: 0,
            allocated_bytes: 0,
            singletons: None,
            attr_cache: AttrCache::default(),
            stats: StoreStats::default(),
        };
        let none_ty = store.types.none.clone();
        let bool_ty = store.types.bool.clone();
        let singletons = Singletons {
            none: store.allocate(&none_ty, Payload::None)?,
            true_value: store.allocate(&bool_ty, Payload::Bool(true))?,
            false_value: store.allocate(&bool_ty, Payload::Bool(false))?,
        };
        store.singletons = Some(singletons);
        store.limits = limits;
        Ok(store)
    }

    /// The store's built-in types.
    pub fn types(&self) -> &BuiltinTypes {
        &self.types
    }

    /// Configured limits.
    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    /// Number of live values in this store.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Accounted bytes of live values.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Whether `teardown` has run.
    pub fn is_torn_down(&self) -> bool {
        self.singletons.is_none()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Allocation and lifetime
    // ═══════════════════════════════════════════════════════════════════

    /// Allocate a value of type `ty` with a reference count of 1.
    ///
    /// The payload's child handles are owned by the new value. If allocation
    /// fails they are released before the error is returned.
    pub fn allocate(&mut self, ty: &TypeRef, payload: Payload) -> Result<ValueRef> {
        match self.reserve_slot(ty, &payload) {
            Ok((index, size)) => Ok(self.install(index, ty, payload, size)),
            Err(err) => {
                self.release_payload(payload);
                Err(err)
            }
        }
    }

    /// Check that a value of `ty` whose payload owns `payload_bytes` would
    /// fit the store limits, before the payload is built.
    pub fn check_capacity(&self, ty: &TypeRef, payload_bytes: usize) -> Result<()> {
        if let Some(max) = self.limits.max_objects {
            if self.live >= max {
                return Err(AmatakError::Allocation(format!(
                    "object limit of {} live values reached",
                    max
                )));
            }
        }
        if let Some(limit) = self.limits.memory_limit {
            let size = ty.basic_size().saturating_add(payload_bytes);
            if self.allocated_bytes.saturating_add(size) > limit {
                return Err(AmatakError::Allocation(format!(
                    "memory limit of {} bytes exceeded allocating '{}'",
                    limit,
                    ty.name()
                )));
            }
        }
        Ok(())
    }

    fn reserve_slot(&mut self, ty: &TypeRef, payload: &Payload) -> Result<(Option<u32>, usize)> {
        let payload_bytes = payload.estimate_size();
        self.check_capacity(ty, payload_bytes)?;
        let size = ty.basic_size() + payload_bytes;
        if let Some(index) = self.free_list.pop() {
            return Ok((Some(index), size));
        }
        if u32::try_from(self.slots.len()).is_err() {
            return Err(AmatakError::Allocation(
                "value handle space exhausted".to_string(),
            ));
        }
        self.slots
            .try_reserve(1)
            .map_err(|e| AmatakError::Allocation(format!("cannot grow object store: {}", e)))?;
        Ok((None, size))
    }

    fn install(&mut self, index: Option<u32>, ty: &TypeRef, payload: Payload, size: usize) -> ValueRef {
        let entry = Entry {
            refcount: 1,
            ty: ty.clone(),
            payload,
            size,
            weak_handles: 0,
        };
        let handle = match index {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ValueRef::new(index, slot.generation)
            }
            None => {
                // reserve_slot checked the length fits in u32
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                ValueRef::new(index, 0)
            }
        };
        self.live += 1;
        self.allocated_bytes += size;
        self.stats.allocations += 1;
        LIVE_OBJECTS.fetch_add(1, Ordering::Relaxed);
        handle
    }

    /// Increment the reference count of `v`.
    pub fn retain(&mut self, v: ValueRef) -> Result<()> {
        let entry = self.entry_mut(v)?;
        entry.refcount += 1;
        Ok(())
    }

    /// Decrement the reference count of `v`, destroying it at zero.
    ///
    /// Destruction releases every child the payload owned; children that
    /// drop to zero are destroyed in turn (iteratively, so deep structures
    /// do not exhaust the call stack).
    pub fn release(&mut self, v: ValueRef) -> Result<()> {
        let entry = self.entry_mut(v)?;
        if entry.refcount > 1 {
            entry.refcount -= 1;
            return Ok(());
        }
        let mut pending = Vec::new();
        if let Some(entry) = self.free_slot(v) {
            entry.payload.children(&mut pending);
        }
        self.release_all(pending);
        Ok(())
    }

    /// Release `v`, logging instead of failing on a stale handle.
    ///
    /// Used on error paths that already carry a more relevant error.
    pub fn discard(&mut self, v: ValueRef) {
        if let Err(err) = self.release(v) {
            debug!(handle = ?v, %err, "discarding an already released value");
        }
    }

    fn release_all(&mut self, mut pending: Vec<ValueRef>) {
        while let Some(child) = pending.pop() {
            let last = match self.entry_mut(child) {
                Ok(entry) if entry.refcount > 1 => {
                    entry.refcount -= 1;
                    false
                }
                Ok(_) => true,
                Err(_) => {
                    warn!(handle = ?child, "owned child handle is no longer live");
                    false
                }
            };
            if last {
                if let Some(entry) = self.free_slot(child) {
                    entry.payload.children(&mut pending);
                }
            }
        }
    }

    fn release_payload(&mut self, payload: Payload) {
        let mut pending = Vec::new();
        payload.children(&mut pending);
        self.release_all(pending);
    }

    /// Empty the slot behind `v` and do the bookkeeping; the caller decides
    /// what to do with the payload's children.
    fn free_slot(&mut self, v: ValueRef) -> Option<Entry> {
        let slot = self.slots.get_mut(v.index())?;
        if slot.generation != v.generation() {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(v.raw_index());
        self.live -= 1;
        self.allocated_bytes = self.allocated_bytes.saturating_sub(entry.size);
        self.stats.deallocations += 1;
        LIVE_OBJECTS.fetch_sub(1, Ordering::Relaxed);
        if entry.weak_handles > 0 {
            self.stats.weak_invalidations += entry.weak_handles;
            trace!(handle = ?v, weak = entry.weak_handles, "invalidated weak handles");
        }
        Some(entry)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════

    fn entry(&self, v: ValueRef) -> Result<&Entry> {
        self.slots
            .get(v.index())
            .filter(|slot| slot.generation == v.generation())
            .and_then(|slot| slot.entry.as_ref())
            .ok_or_else(|| stale(v))
    }

    fn entry_mut(&mut self, v: ValueRef) -> Result<&mut Entry> {
        self.slots
            .get_mut(v.index())
            .filter(|slot| slot.generation == v.generation())
            .and_then(|slot| slot.entry.as_mut())
            .ok_or_else(|| stale(v))
    }

    /// Whether `v` still addresses a live value.
    pub fn is_live(&self, v: ValueRef) -> bool {
        self.entry(v).is_ok()
    }

    /// Current reference count of `v`.
    pub fn refcount(&self, v: ValueRef) -> Result<usize> {
        Ok(self.entry(v)?.refcount)
    }

    /// The type descriptor of `v`.
    pub fn type_of(&self, v: ValueRef) -> Result<TypeRef> {
        Ok(self.entry(v)?.ty.clone())
    }

    /// The type name of `v`.
    pub fn type_name(&self, v: ValueRef) -> Result<&str> {
        Ok(self.entry(v)?.ty.name())
    }

    /// Borrow the payload of `v`.
    pub fn payload(&self, v: ValueRef) -> Result<&Payload> {
        Ok(&self.entry(v)?.payload)
    }

    /// Mutably borrow the payload of `v`.
    ///
    /// Replacing child handles through this borrow bypasses reference
    /// counting; callers must retain and release as they go.
    pub fn payload_mut(&mut self, v: ValueRef) -> Result<&mut Payload> {
        Ok(&mut self.entry_mut(v)?.payload)
    }

    /// Integer content of `v`.
    pub fn as_int(&self, v: ValueRef) -> Option<i64> {
        match self.payload(v) {
            Ok(Payload::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// Float content of `v` (integers are not promoted).
    pub fn as_float(&self, v: ValueRef) -> Option<f64> {
        match self.payload(v) {
            Ok(Payload::Float(f)) => Some(*f),
            _ => None,
        }
    }

    /// Boolean content of `v`.
    pub fn as_bool(&self, v: ValueRef) -> Option<bool> {
        match self.payload(v) {
            Ok(Payload::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// String content of `v`.
    pub fn as_str(&self, v: ValueRef) -> Option<&str> {
        match self.payload(v) {
            Ok(Payload::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Whether `v` is the `None` singleton.
    pub fn is_none(&self, v: ValueRef) -> bool {
        matches!(self.payload(v), Ok(Payload::None))
    }

    pub(crate) fn live_handles(&self) -> Vec<ValueRef> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.entry.is_some())
            .map(|(index, slot)| ValueRef::new(index as u32, slot.generation))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Constructors
    // ═══════════════════════════════════════════════════════════════════

    fn singletons(&self) -> Result<Singletons> {
        self.singletons
            .ok_or_else(|| AmatakError::Lifecycle("object store has been torn down".to_string()))
    }

    /// A new reference to `None`.
    pub fn none(&mut self) -> Result<ValueRef> {
        let none = self.singletons()?.none;
        self.retain(none)?;
        Ok(none)
    }

    /// A new reference to `true` or `false`.
    pub fn boolean(&mut self, b: bool) -> Result<ValueRef> {
        let singletons = self.singletons()?;
        let v = if b {
            singletons.true_value
        } else {
            singletons.false_value
        };
        self.retain(v)?;
        Ok(v)
    }

    /// Allocate an integer.
    pub fn int(&mut self, n: i64) -> Result<ValueRef> {
        let ty = self.types.int.clone();
        self.allocate(&ty, Payload::Int(n))
    }

    /// Allocate a float.
    pub fn float(&mut self, x: f64) -> Result<ValueRef> {
        let ty = self.types.float.clone();
        self.allocate(&ty, Payload::Float(x))
    }

    /// Allocate a string.
    pub fn string(&mut self, s: impl Into<String>) -> Result<ValueRef> {
        let ty = self.types.str.clone();
        self.allocate(&ty, Payload::Str(s.into()))
    }

    /// Allocate a list that takes ownership of `items`.
    pub fn list(&mut self, items: Vec<ValueRef>) -> Result<ValueRef> {
        let ty = self.types.list.clone();
        self.allocate(&ty, Payload::List(items))
    }

    /// Allocate an empty dictionary.
    pub fn dict(&mut self) -> Result<ValueRef> {
        let ty = self.types.dict.clone();
        self.allocate(&ty, Payload::Dict(IndexMap::new()))
    }

    /// Allocate an instance of `ty` with an empty attribute dictionary.
    pub fn instance(&mut self, ty: &TypeRef) -> Result<ValueRef> {
        if !ty.has_dict() {
            return Err(AmatakError::Type(format!(
                "cannot create '{}' instances: type has no attribute dictionary",
                ty.name()
            )));
        }
        self.allocate(ty, Payload::Instance(IndexMap::new()))
    }

    /// Allocate an empty module namespace.
    pub fn module(&mut self, name: impl Into<String>) -> Result<ValueRef> {
        let ty = self.types.module.clone();
        self.allocate(&ty, Payload::Module(ModuleData::new(name)))
    }
}

impl Drop for ObjectStore {
    fn drop(&mut self) {
        LIVE_OBJECTS.fetch_sub(self.live, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .field("allocated_bytes", &self.allocated_bytes)
            .field("stats", &self.stats)
            .finish()
    }
}

fn stale(v: ValueRef) -> AmatakError {
    AmatakError::Runtime(format!("stale or invalid value handle {:?}", v))
}
