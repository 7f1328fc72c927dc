//! Handles into the object store

use std::fmt;

/// A strong handle to a stored value.
///
/// The handle is `Copy`; ownership is tracked explicitly by the store's
/// reference count, so every handle the caller owns must eventually be
/// passed to `release`. The generation detects handles that outlived the
/// value they pointed to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef {
    index: u32,
    generation: u32,
}

impl ValueRef {
    /// Build a handle from its raw parts.
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot index.
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when the value was allocated.
    pub fn generation(self) -> u32 {
        self.generation
    }

    pub(crate) fn raw_index(self) -> u32 {
        self.index
    }
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A weak handle to a value whose type supports weak references.
///
/// It does not keep the value alive. Once the value is destroyed the slot
/// generation moves on and `upgrade` returns `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakHandle {
    pub(crate) target: ValueRef,
}

impl WeakHandle {
    /// The handle this weak reference was taken from.
    pub fn target(&self) -> ValueRef {
        self.target
    }
}
