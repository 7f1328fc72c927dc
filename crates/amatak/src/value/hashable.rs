//! Hashable mapping keys

use std::hash::{Hash, Hasher};

use super::Payload;

/// A dictionary key.
///
/// Only `None`, booleans, integers and strings can be used as keys. Keys are
/// stored by value, so they do not hold references into the store.
#[derive(Debug, Clone)]
pub enum DictKey {
    /// `None`
    None,
    /// `true` / `false`
    Bool(bool),
    /// Integer key
    Int(i64),
    /// String key
    Str(String),
}

impl DictKey {
    /// Build a key from a payload; `None` when the payload is unhashable.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::None => Some(DictKey::None),
            Payload::Bool(b) => Some(DictKey::Bool(*b)),
            Payload::Int(n) => Some(DictKey::Int(*n)),
            Payload::Str(s) => Some(DictKey::Str(s.clone())),
            _ => None,
        }
    }
}

impl Hash for DictKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            DictKey::None => {}
            DictKey::Bool(b) => b.hash(state),
            DictKey::Int(n) => n.hash(state),
            DictKey::Str(s) => s.hash(state),
        }
    }
}

impl PartialEq for DictKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DictKey::None, DictKey::None) => true,
            (DictKey::Bool(a), DictKey::Bool(b)) => a == b,
            (DictKey::Int(a), DictKey::Int(b)) => a == b,
            (DictKey::Str(a), DictKey::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for DictKey {}
