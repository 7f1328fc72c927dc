//! Module cache and search path
//!
//! The registry owns one reference to every cached module value. Loading a
//! module (resolving, compiling and executing it) is driven by the
//! interpreter; the registry only tracks what exists and in which state.

mod loader;

pub use loader::{
    candidate_paths, validate_module_name, FileSystemLoader, InMemoryLoader, ModuleLoader,
    ModuleSource,
};

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{AmatakError, Result};
use crate::store::ObjectStore;
use crate::value::ValueRef;

/// Loading state of a cached module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Its body is executing; importing it again yields the partial namespace
    Loading,
    /// Its body finished executing
    Loaded,
}

/// A cached module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// The module value (owned by the registry)
    pub value: ValueRef,
    /// Loading state
    pub state: ModuleState,
    /// File the module was loaded from; `None` for built-in namespaces
    pub origin: Option<PathBuf>,
}

/// Modules of one interpreter context, by dotted name.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, ModuleEntry>,
    search_path: Vec<PathBuf>,
}

impl ModuleRegistry {
    /// An empty registry with the given search path.
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self {
            modules: IndexMap::new(),
            search_path,
        }
    }

    /// The cached entry for `name`.
    pub fn get(&self, name: &str) -> Option<&ModuleEntry> {
        self.modules.get(name)
    }

    /// Whether `name` is cached.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of cached modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is cached.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Cached module names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Cache `value` (taking over the caller's reference) as `Loading`.
    pub fn insert_loading(&mut self, name: &str, value: ValueRef, origin: Option<PathBuf>) -> Result<()> {
        if self.modules.contains_key(name) {
            return Err(AmatakError::Runtime(format!(
                "module '{}' is already registered",
                name
            )));
        }
        self.modules.insert(
            name.to_string(),
            ModuleEntry {
                value,
                state: ModuleState::Loading,
                origin,
            },
        );
        Ok(())
    }

    /// Record that `name` finished executing.
    pub fn mark_loaded(&mut self, name: &str) -> Result<()> {
        let entry = self
            .modules
            .get_mut(name)
            .ok_or_else(|| AmatakError::Runtime(format!("module '{}' is not registered", name)))?;
        entry.state = ModuleState::Loaded;
        Ok(())
    }

    /// Drop `name` from the cache, handing its reference back to the caller.
    pub fn remove(&mut self, name: &str) -> Option<ModuleEntry> {
        self.modules.shift_remove(name)
    }

    /// Append a search path entry. Duplicates are kept; the first match wins.
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_path.push(path.as_ref().to_path_buf());
    }

    /// Search path in priority order.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Release every cached module, newest first. Returns how many were released.
    pub fn teardown(&mut self, store: &mut ObjectStore) -> usize {
        let count = self.modules.len();
        while let Some((name, entry)) = self.modules.pop() {
            debug!(module = %name, "releasing module");
            store.discard(entry.value);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreLimits;

    #[test]
    fn test_loading_then_loaded() {
        let mut store = ObjectStore::new(StoreLimits::default()).unwrap();
        let mut registry = ModuleRegistry::new(vec![]);
        let m = store.module("m").unwrap();
        registry.insert_loading("m", m, None).unwrap();
        assert_eq!(registry.get("m").unwrap().state, ModuleState::Loading);
        registry.mark_loaded("m").unwrap();
        assert_eq!(registry.get("m").unwrap().state, ModuleState::Loaded);
        assert_eq!(registry.teardown(&mut store), 1);
        assert!(!store.is_live(m));
    }

    #[test]
    fn test_search_path_keeps_duplicates() {
        let mut registry = ModuleRegistry::new(vec![PathBuf::from("/a")]);
        registry.add_search_path("/a");
        assert_eq!(registry.search_path().len(), 2);
    }
}
