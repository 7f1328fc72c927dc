//! Moving values between a store and the host

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{AmatakError, Result};
use crate::value::{DictKey, HostValue, Payload, ValueRef};

use super::ObjectStore;

impl ObjectStore {
    /// Copy `v` out of the store as a detached [`HostValue`].
    ///
    /// Shared substructure is copied once per occurrence. A value that
    /// contains itself cannot be exported and fails with a ValueError.
    pub fn export(&self, v: ValueRef) -> Result<HostValue> {
        let mut path = HashSet::new();
        self.export_inner(v, &mut path)
    }

    fn export_inner(&self, v: ValueRef, path: &mut HashSet<ValueRef>) -> Result<HostValue> {
        let payload = self.payload(v)?;
        if payload.is_container() && !path.insert(v) {
            return Err(AmatakError::Value(format!(
                "cannot export self-referencing '{}' value",
                self.type_name(v)?
            )));
        }
        let exported = match payload {
            Payload::None => HostValue::None,
            Payload::Bool(b) => HostValue::Bool(*b),
            Payload::Int(n) => HostValue::Int(*n),
            Payload::Float(x) => HostValue::Float(*x),
            Payload::Str(s) => HostValue::Str(s.clone()),
            Payload::List(items) => HostValue::List(
                items
                    .iter()
                    .map(|item| self.export_inner(*item, path))
                    .collect::<Result<_>>()?,
            ),
            Payload::Dict(entries) => HostValue::Dict(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key_to_host(key), self.export_inner(*value, path)?)))
                    .collect::<Result<_>>()?,
            ),
            Payload::Instance(attrs) | Payload::Module(crate::value::ModuleData { attrs, .. }) => {
                HostValue::Object {
                    type_name: self.type_name(v)?.to_string(),
                    attrs: self.export_attrs(attrs, path)?,
                }
            }
            Payload::Exception(exc) => {
                let mut attrs = IndexMap::with_capacity(exc.attrs.len() + 1);
                attrs.insert("message".to_string(), HostValue::Str(exc.message.clone()));
                attrs.extend(self.export_attrs(&exc.attrs, path)?);
                HostValue::Object {
                    type_name: self.type_name(v)?.to_string(),
                    attrs,
                }
            }
        };
        path.remove(&v);
        Ok(exported)
    }

    fn export_attrs(
        &self,
        attrs: &IndexMap<String, ValueRef>,
        path: &mut HashSet<ValueRef>,
    ) -> Result<IndexMap<String, HostValue>> {
        attrs
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.export_inner(*value, path)?)))
            .collect()
    }

    /// Build a new value in this store from a detached [`HostValue`].
    ///
    /// Objects become instances of the built-in `object` type. Dictionary
    /// keys must be hashable scalars. On failure nothing is left allocated.
    pub fn import_host(&mut self, value: &HostValue) -> Result<ValueRef> {
        match value {
            HostValue::None => self.none(),
            HostValue::Bool(b) => self.boolean(*b),
            HostValue::Int(n) => self.int(*n),
            HostValue::Float(x) => self.float(*x),
            HostValue::Str(s) => self.string(s.clone()),
            HostValue::List(items) => {
                let mut built = Vec::with_capacity(items.len());
                for item in items {
                    match self.import_host(item) {
                        Ok(v) => built.push(v),
                        Err(err) => {
                            self.discard_all(built);
                            return Err(err);
                        }
                    }
                }
                self.list(built)
            }
            HostValue::Dict(entries) => {
                let mut built = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    let result = host_to_key(key).and_then(|key| Ok((key, self.import_host(item)?)));
                    match result {
                        Ok((key, v)) => {
                            if let Some(old) = built.insert(key, v) {
                                self.discard(old);
                            }
                        }
                        Err(err) => {
                            self.discard_all(built.into_values().collect());
                            return Err(err);
                        }
                    }
                }
                let ty = self.types.dict.clone();
                self.allocate(&ty, Payload::Dict(built))
            }
            HostValue::Object { attrs, .. } => {
                let mut built = IndexMap::with_capacity(attrs.len());
                for (name, item) in attrs {
                    match self.import_host(item) {
                        Ok(v) => {
                            built.insert(name.clone(), v);
                        }
                        Err(err) => {
                            self.discard_all(built.into_values().collect());
                            return Err(err);
                        }
                    }
                }
                let ty = self.types.object.clone();
                self.allocate(&ty, Payload::Instance(built))
            }
        }
    }

    fn discard_all(&mut self, values: Vec<ValueRef>) {
        for v in values {
            self.discard(v);
        }
    }
}

fn key_to_host(key: &DictKey) -> HostValue {
    match key {
        DictKey::None => HostValue::None,
        DictKey::Bool(b) => HostValue::Bool(*b),
        DictKey::Int(n) => HostValue::Int(*n),
        DictKey::Str(s) => HostValue::Str(s.clone()),
    }
}

fn host_to_key(value: &HostValue) -> Result<DictKey> {
    match value {
        HostValue::None => Ok(DictKey::None),
        HostValue::Bool(b) => Ok(DictKey::Bool(*b)),
        HostValue::Int(n) => Ok(DictKey::Int(*n)),
        HostValue::Str(s) => Ok(DictKey::Str(s.clone())),
        other => Err(AmatakError::Type(format!("unhashable dictionary key: {}", other))),
    }
}
