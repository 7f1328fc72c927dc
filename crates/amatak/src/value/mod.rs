//! Value representation for runtime values
//!
//! A runtime value is a [`ValueRef`] handle into an
//! [`ObjectStore`](crate::store::ObjectStore). The store slot behind the handle
//! holds the reference count, the value's type and its [`Payload`].

mod compound;
mod display;
mod hashable;
mod host;
mod refs;

pub(crate) use display::format_float;

pub use compound::{ExceptionData, ModuleData};
pub use hashable::DictKey;
pub use host::HostValue;
pub use refs::{ValueRef, WeakHandle};

use indexmap::IndexMap;

/// Attribute dictionary of instances, modules and exceptions.
pub type AttrDict = IndexMap<String, ValueRef>;

/// Type-specific data of a stored value.
///
/// Container payloads own one reference to each `ValueRef` they hold; the
/// store releases those when the payload is destroyed.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    // ═══════════════════════════════════════════════════════════════════
    // Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// The null value `None`
    None,

    /// Boolean: `true` or `false`
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Immutable string
    Str(String),

    // ═══════════════════════════════════════════════════════════════════
    // Containers
    // ═══════════════════════════════════════════════════════════════════
    /// Mutable sequence buffer
    List(Vec<ValueRef>),

    /// Mapping from hashable scalar keys to values
    Dict(IndexMap<DictKey, ValueRef>),

    /// Instance of a user-defined type: just an attribute dictionary
    Instance(AttrDict),

    /// Module namespace
    Module(ModuleData),

    /// Exception instance
    Exception(ExceptionData),
}

impl Payload {
    /// Short name of the payload kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::None => "none",
            Payload::Bool(_) => "bool",
            Payload::Int(_) => "int",
            Payload::Float(_) => "float",
            Payload::Str(_) => "str",
            Payload::List(_) => "list",
            Payload::Dict(_) => "dict",
            Payload::Instance(_) => "instance",
            Payload::Module(_) => "module",
            Payload::Exception(_) => "exception",
        }
    }

    /// Append every strongly held child reference to `out`.
    pub fn children(&self, out: &mut Vec<ValueRef>) {
        match self {
            Payload::List(items) => out.extend(items.iter().copied()),
            Payload::Dict(entries) => out.extend(entries.values().copied()),
            Payload::Instance(attrs) => out.extend(attrs.values().copied()),
            Payload::Module(module) => out.extend(module.attrs.values().copied()),
            Payload::Exception(exc) => out.extend(exc.attrs.values().copied()),
            Payload::None
            | Payload::Bool(_)
            | Payload::Int(_)
            | Payload::Float(_)
            | Payload::Str(_) => {}
        }
    }

    /// Whether this payload can hold references (and so take part in cycles).
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Payload::List(_)
                | Payload::Dict(_)
                | Payload::Instance(_)
                | Payload::Module(_)
                | Payload::Exception(_)
        )
    }

    /// The attribute dictionary, if this payload has one.
    pub fn attrs(&self) -> Option<&AttrDict> {
        match self {
            Payload::Instance(attrs) => Some(attrs),
            Payload::Module(module) => Some(&module.attrs),
            Payload::Exception(exc) => Some(&exc.attrs),
            _ => None,
        }
    }

    /// Mutable access to the attribute dictionary.
    pub fn attrs_mut(&mut self) -> Option<&mut AttrDict> {
        match self {
            Payload::Instance(attrs) => Some(attrs),
            Payload::Module(module) => Some(&mut module.attrs),
            Payload::Exception(exc) => Some(&mut exc.attrs),
            _ => None,
        }
    }

    /// Rough number of heap bytes owned by the payload itself.
    pub fn estimate_size(&self) -> usize {
        let handle = std::mem::size_of::<ValueRef>();
        match self {
            Payload::None | Payload::Bool(_) | Payload::Int(_) | Payload::Float(_) => 0,
            Payload::Str(s) => s.len(),
            Payload::List(items) => items.len() * handle,
            Payload::Dict(entries) => entries.len() * (handle + std::mem::size_of::<DictKey>()),
            Payload::Instance(attrs) => attrs_size(attrs),
            Payload::Module(module) => module.name.len() + attrs_size(&module.attrs),
            Payload::Exception(exc) => exc.message.len() + attrs_size(&exc.attrs),
        }
    }
}

fn attrs_size(attrs: &AttrDict) -> usize {
    attrs
        .keys()
        .map(|k| k.len() + std::mem::size_of::<ValueRef>())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_of_scalars_are_empty() {
        let mut out = Vec::new();
        Payload::Int(3).children(&mut out);
        Payload::Str("x".into()).children(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_children_of_containers() {
        let a = ValueRef::new(1, 0);
        let b = ValueRef::new(2, 0);
        let mut out = Vec::new();
        Payload::List(vec![a, b]).children(&mut out);
        assert_eq!(out, vec![a, b]);

        let mut attrs = AttrDict::new();
        attrs.insert("x".into(), a);
        assert!(Payload::Instance(attrs).is_container());
    }
}
