//! Attribute dictionaries and the version-tagged lookup cache

use std::collections::HashMap;

use crate::error::{AmatakError, Result};
use crate::value::{Payload, ValueRef};

use super::ObjectStore;

/// Remembers where an attribute name sat in a type's instances.
///
/// Entries are keyed by type id, then name, and stamped with the type's
/// version tag. A hit is still verified against the instance's dictionary,
/// so a stale index only costs a slow lookup.
#[derive(Debug, Default)]
pub(crate) struct AttrCache {
    entries: HashMap<u64, HashMap<String, (u64, usize)>>,
}

impl AttrCache {
    fn lookup(&self, type_id: u64, name: &str, version: u64) -> Option<usize> {
        self.entries
            .get(&type_id)?
            .get(name)
            .filter(|(cached_version, _)| *cached_version == version)
            .map(|(_, index)| *index)
    }

    fn store(&mut self, type_id: u64, name: &str, version: u64, index: usize) {
        let names = self.entries.entry(type_id).or_default();
        match names.get_mut(name) {
            Some(slot) => *slot = (version, index),
            None => {
                names.insert(name.to_string(), (version, index));
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl ObjectStore {
    fn require_dict(&self, obj: ValueRef) -> Result<crate::types::TypeRef> {
        let ty = self.type_of(obj)?;
        if !ty.has_dict() {
            return Err(AmatakError::Type(format!(
                "'{}' object has no attribute dictionary",
                ty.name()
            )));
        }
        Ok(ty)
    }

    fn missing_attr(&self, obj: ValueRef, name: &str) -> AmatakError {
        match self.payload(obj) {
            Ok(Payload::Module(module)) => AmatakError::Value(format!(
                "module '{}' has no attribute '{}'",
                module.name, name
            )),
            _ => AmatakError::Value(format!(
                "'{}' object has no attribute '{}'",
                self.type_name(obj).unwrap_or_default(),
                name
            )),
        }
    }

    /// Look up attribute `name` on `obj`, returning a new reference.
    pub fn get_attr(&mut self, obj: ValueRef, name: &str) -> Result<ValueRef> {
        let ty = self.require_dict(obj)?;
        let version = ty.version();
        let cached = self.attr_cache.lookup(ty.id(), name, version);

        let attrs = self.payload(obj)?.attrs().ok_or_else(|| {
            AmatakError::Runtime(format!(
                "'{}' declares an attribute dictionary but its payload has none",
                ty.name()
            ))
        })?;
        let hit = cached
            .and_then(|index| attrs.get_index(index))
            .filter(|(key, _)| key.as_str() == name)
            .map(|(_, value)| *value);
        let (found, fill) = match hit {
            Some(value) => (Some(value), None),
            None => match attrs.get_full(name) {
                Some((index, _, value)) => (Some(*value), Some(index)),
                None => (None, None),
            },
        };

        if hit.is_some() {
            self.stats.attr_cache_hits += 1;
        } else {
            self.stats.attr_cache_misses += 1;
        }
        if let Some(index) = fill {
            self.attr_cache.store(ty.id(), name, version, index);
        }

        let value = found.ok_or_else(|| self.missing_attr(obj, name))?;
        self.retain(value)?;
        Ok(value)
    }

    /// Whether `obj` has attribute `name`.
    pub fn has_attr(&self, obj: ValueRef, name: &str) -> Result<bool> {
        Ok(self
            .payload(obj)?
            .attrs()
            .is_some_and(|attrs| attrs.contains_key(name)))
    }

    /// Set attribute `name` on `obj`; `value` is borrowed and retained.
    ///
    /// Adding a new name is a structural change and bumps the type's version.
    pub fn set_attr(&mut self, obj: ValueRef, name: &str, value: ValueRef) -> Result<()> {
        let ty = self.require_dict(obj)?;
        self.retain(value)?;
        let previous = match self.payload_mut(obj)?.attrs_mut() {
            Some(attrs) => attrs.insert(name.to_string(), value),
            None => {
                self.discard(value);
                return Err(AmatakError::Runtime(format!(
                    "'{}' declares an attribute dictionary but its payload has none",
                    ty.name()
                )));
            }
        };
        match previous {
            Some(old) => self.release(old),
            None => {
                ty.bump_version();
                Ok(())
            }
        }
    }

    /// Remove attribute `name` from `obj`.
    pub fn del_attr(&mut self, obj: ValueRef, name: &str) -> Result<()> {
        let ty = self.require_dict(obj)?;
        let removed = self
            .payload_mut(obj)?
            .attrs_mut()
            .and_then(|attrs| attrs.shift_remove(name));
        match removed {
            Some(old) => {
                ty.bump_version();
                self.release(old)
            }
            None => Err(self.missing_attr(obj, name)),
        }
    }

    /// Attribute names of `obj`, in insertion order.
    pub fn attr_names(&self, obj: ValueRef) -> Result<Vec<String>> {
        Ok(self
            .payload(obj)?
            .attrs()
            .map(|attrs| attrs.keys().cloned().collect())
            .unwrap_or_default())
    }
}
