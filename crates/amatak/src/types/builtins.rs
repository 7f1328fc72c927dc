//! Built-in types and their protocol tables

use crate::error::{AmatakError, Result};
use crate::store::ObjectStore;
use crate::value::{DictKey, Payload, ValueRef};

use super::{
    MappingOp, MappingProtocol, NumberOp, NumberProtocol, SequenceOp, SequenceProtocol,
    TypeDescriptor, TypeRef,
};

/// The built-in types of one object store.
#[derive(Debug, Clone)]
pub struct BuiltinTypes {
    /// `NoneType`
    pub none: TypeRef,
    /// `bool`
    pub bool: TypeRef,
    /// `int`
    pub int: TypeRef,
    /// `float`
    pub float: TypeRef,
    /// `str`
    pub str: TypeRef,
    /// `list`
    pub list: TypeRef,
    /// `dict`
    pub dict: TypeRef,
    /// `object`: plain instances with an attribute dictionary
    pub object: TypeRef,
    /// `module`
    pub module: TypeRef,
}

impl BuiltinTypes {
    /// Build a fresh set of descriptors.
    pub fn new() -> Self {
        Self {
            none: TypeDescriptor::builder("NoneType").basic_size(16).build(),
            bool: TypeDescriptor::builder("bool").basic_size(16).build(),
            int: TypeDescriptor::builder("int")
                .basic_size(24)
                .number(IntNumber)
                .build(),
            float: TypeDescriptor::builder("float")
                .basic_size(24)
                .number(FloatNumber)
                .build(),
            str: TypeDescriptor::builder("str")
                .basic_size(40)
                .sequence(StrSequence)
                .build(),
            list: TypeDescriptor::builder("list")
                .basic_size(40)
                .sequence(ListSequence)
                .build(),
            dict: TypeDescriptor::builder("dict")
                .basic_size(48)
                .mapping(DictMapping)
                .build(),
            object: TypeDescriptor::builder("object")
                .basic_size(48)
                .with_dict()
                .weakrefable()
                .build(),
            module: TypeDescriptor::builder("module")
                .basic_size(56)
                .with_dict()
                .weakrefable()
                .build(),
        }
    }
}

impl Default for BuiltinTypes {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
    Other,
}

fn numeric(store: &ObjectStore, v: ValueRef) -> Result<Num> {
    Ok(match store.payload(v)? {
        Payload::Int(n) => Num::Int(*n),
        Payload::Float(f) => Num::Float(*f),
        _ => Num::Other,
    })
}

fn unsupported_operands(
    store: &ObjectStore,
    op: NumberOp,
    lhs: ValueRef,
    rhs: ValueRef,
) -> AmatakError {
    AmatakError::Type(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op.symbol(),
        store.type_name(lhs).unwrap_or_default(),
        store.type_name(rhs).unwrap_or_default()
    ))
}

fn overflow() -> AmatakError {
    AmatakError::Value("integer overflow".to_string())
}

fn payload_mismatch(expected: &str) -> AmatakError {
    AmatakError::Runtime(format!("{} protocol invoked on a non-{} payload", expected, expected))
}

/// Resolve a possibly negative index against `len`.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn index_arg(store: &ObjectStore, v: ValueRef, container: &str) -> Result<i64> {
    store.as_int(v).ok_or_else(|| {
        AmatakError::Type(format!(
            "{} indices must be integers, not '{}'",
            container,
            store.type_name(v).unwrap_or_default()
        ))
    })
}

fn repeat_count(store: &ObjectStore, v: ValueRef) -> Result<usize> {
    let n = store.as_int(v).ok_or_else(|| {
        AmatakError::Type(format!(
            "can't multiply sequence by non-int of type '{}'",
            store.type_name(v).unwrap_or_default()
        ))
    })?;
    usize::try_from(n.max(0)).map_err(|_| overflow())
}

/// Payload bytes of `len` units of `unit` bytes repeated `count` times,
/// checked against the store limits before anything is built.
fn repeat_size(
    store: &ObjectStore,
    ty: &TypeRef,
    len: usize,
    unit: usize,
    count: usize,
) -> Result<usize> {
    let total = len
        .checked_mul(count)
        .filter(|n| n.checked_mul(unit).is_some())
        .ok_or_else(|| {
            AmatakError::Allocation(format!("'{}' repetition is too large", ty.name()))
        })?;
    store.check_capacity(ty, total * unit)?;
    Ok(total)
}

fn reserve_failed(err: std::collections::TryReserveError) -> AmatakError {
    AmatakError::Allocation(format!("cannot allocate repeated sequence: {}", err))
}

// ═══════════════════════════════════════════════════════════════════════
// Numbers
// ═══════════════════════════════════════════════════════════════════════

struct IntNumber;

impl NumberProtocol for IntNumber {
    fn supports(&self, _op: NumberOp) -> bool {
        true
    }

    fn call(
        &self,
        store: &mut ObjectStore,
        op: NumberOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef> {
        let lhs = store.as_int(receiver).ok_or_else(|| payload_mismatch("int"))?;
        if op == NumberOp::Neg {
            let n = lhs.checked_neg().ok_or_else(overflow)?;
            return store.int(n);
        }
        let rhs = args[0];
        match numeric(store, rhs)? {
            Num::Int(r) => int_binary(store, op, lhs, r),
            Num::Float(r) => float_binary(store, op, lhs as f64, r),
            Num::Other => Err(unsupported_operands(store, op, receiver, rhs)),
        }
    }
}

fn int_binary(store: &mut ObjectStore, op: NumberOp, l: i64, r: i64) -> Result<ValueRef> {
    let n = match op {
        NumberOp::Add => l.checked_add(r).ok_or_else(overflow)?,
        NumberOp::Sub => l.checked_sub(r).ok_or_else(overflow)?,
        NumberOp::Mul => l.checked_mul(r).ok_or_else(overflow)?,
        NumberOp::Div => {
            if r == 0 {
                return Err(AmatakError::Value("integer division by zero".to_string()));
            }
            l.checked_div(r).ok_or_else(overflow)?
        }
        NumberOp::Rem => {
            if r == 0 {
                return Err(AmatakError::Value("integer modulo by zero".to_string()));
            }
            l.checked_rem(r).ok_or_else(overflow)?
        }
        NumberOp::Lt => return store.boolean(l < r),
        NumberOp::Le => return store.boolean(l <= r),
        NumberOp::Gt => return store.boolean(l > r),
        NumberOp::Ge => return store.boolean(l >= r),
        NumberOp::Neg => return Err(payload_mismatch("binary")),
    };
    store.int(n)
}

fn float_binary(store: &mut ObjectStore, op: NumberOp, l: f64, r: f64) -> Result<ValueRef> {
    let x = match op {
        NumberOp::Add => l + r,
        NumberOp::Sub => l - r,
        NumberOp::Mul => l * r,
        NumberOp::Div => {
            if r == 0.0 {
                return Err(AmatakError::Value("float division by zero".to_string()));
            }
            l / r
        }
        NumberOp::Rem => {
            if r == 0.0 {
                return Err(AmatakError::Value("float modulo by zero".to_string()));
            }
            l % r
        }
        NumberOp::Lt => return store.boolean(l < r),
        NumberOp::Le => return store.boolean(l <= r),
        NumberOp::Gt => return store.boolean(l > r),
        NumberOp::Ge => return store.boolean(l >= r),
        NumberOp::Neg => return Err(payload_mismatch("binary")),
    };
    store.float(x)
}

struct FloatNumber;

impl NumberProtocol for FloatNumber {
    fn supports(&self, _op: NumberOp) -> bool {
        true
    }

    fn call(
        &self,
        store: &mut ObjectStore,
        op: NumberOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef> {
        let lhs = match numeric(store, receiver)? {
            Num::Float(f) => f,
            _ => return Err(payload_mismatch("float")),
        };
        if op == NumberOp::Neg {
            return store.float(-lhs);
        }
        let rhs = args[0];
        match numeric(store, rhs)? {
            Num::Int(r) => float_binary(store, op, lhs, r as f64),
            Num::Float(r) => float_binary(store, op, lhs, r),
            Num::Other => Err(unsupported_operands(store, op, receiver, rhs)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Sequences
// ═══════════════════════════════════════════════════════════════════════

struct StrSequence;

impl StrSequence {
    fn text(store: &ObjectStore, v: ValueRef) -> Result<String> {
        store
            .as_str(v)
            .map(str::to_string)
            .ok_or_else(|| payload_mismatch("str"))
    }
}

impl SequenceProtocol for StrSequence {
    fn supports(&self, op: SequenceOp) -> bool {
        op != SequenceOp::SetItem
    }

    fn call(
        &self,
        store: &mut ObjectStore,
        op: SequenceOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef> {
        let text = Self::text(store, receiver)?;
        match op {
            SequenceOp::Length => {
                let len = i64::try_from(text.chars().count()).map_err(|_| overflow())?;
                store.int(len)
            }
            SequenceOp::GetItem => {
                let index = index_arg(store, args[0], "string")?;
                let len = text.chars().count();
                let ch = normalize_index(index, len)
                    .and_then(|i| text.chars().nth(i))
                    .ok_or_else(|| AmatakError::Value("string index out of range".to_string()))?;
                store.string(ch.to_string())
            }
            SequenceOp::Concat => {
                let other = store.as_str(args[0]).map(str::to_string).ok_or_else(|| {
                    AmatakError::Type(format!(
                        "can only concatenate str (not '{}') to str",
                        store.type_name(args[0]).unwrap_or_default()
                    ))
                })?;
                store.string(text + &other)
            }
            SequenceOp::Repeat => {
                let count = repeat_count(store, args[0])?;
                let ty = store.type_of(receiver)?;
                let bytes = repeat_size(store, &ty, text.len(), 1, count)?;
                let mut repeated = String::new();
                repeated.try_reserve_exact(bytes).map_err(reserve_failed)?;
                if !text.is_empty() {
                    for _ in 0..count {
                        repeated.push_str(&text);
                    }
                }
                store.string(repeated)
            }
            SequenceOp::Contains => {
                let needle = store.as_str(args[0]).map(str::to_string).ok_or_else(|| {
                    AmatakError::Type(format!(
                        "'in <string>' requires string as left operand, not '{}'",
                        store.type_name(args[0]).unwrap_or_default()
                    ))
                })?;
                store.boolean(text.contains(&needle))
            }
            SequenceOp::SetItem => Err(AmatakError::Type(
                "'str' object does not support item assignment".to_string(),
            )),
        }
    }
}

struct ListSequence;

impl ListSequence {
    fn items(store: &ObjectStore, v: ValueRef) -> Result<Vec<ValueRef>> {
        match store.payload(v)? {
            Payload::List(items) => Ok(items.clone()),
            _ => Err(payload_mismatch("list")),
        }
    }
}

impl SequenceProtocol for ListSequence {
    fn supports(&self, _op: SequenceOp) -> bool {
        true
    }

    fn call(
        &self,
        store: &mut ObjectStore,
        op: SequenceOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef> {
        let items = Self::items(store, receiver)?;
        match op {
            SequenceOp::Length => {
                let len = i64::try_from(items.len()).map_err(|_| overflow())?;
                store.int(len)
            }
            SequenceOp::GetItem => {
                let index = index_arg(store, args[0], "list")?;
                let item = normalize_index(index, items.len())
                    .map(|i| items[i])
                    .ok_or_else(|| AmatakError::Value("list index out of range".to_string()))?;
                store.retain(item)?;
                Ok(item)
            }
            SequenceOp::SetItem => {
                let index = index_arg(store, args[0], "list")?;
                let slot = normalize_index(index, items.len()).ok_or_else(|| {
                    AmatakError::Value("list assignment index out of range".to_string())
                })?;
                let value = args[1];
                store.retain(value)?;
                let old = match store.payload_mut(receiver)? {
                    Payload::List(items) => std::mem::replace(&mut items[slot], value),
                    _ => return Err(payload_mismatch("list")),
                };
                store.release(old)?;
                store.none()
            }
            SequenceOp::Concat => {
                let other = match store.payload(args[0])? {
                    Payload::List(other) => other.clone(),
                    _ => {
                        return Err(AmatakError::Type(format!(
                            "can only concatenate list (not '{}') to list",
                            store.type_name(args[0]).unwrap_or_default()
                        )))
                    }
                };
                let joined: Vec<ValueRef> = items.into_iter().chain(other).collect();
                for item in &joined {
                    store.retain(*item)?;
                }
                store.list(joined)
            }
            SequenceOp::Repeat => {
                let count = repeat_count(store, args[0])?;
                let ty = store.type_of(receiver)?;
                let unit = std::mem::size_of::<ValueRef>();
                let len = repeat_size(store, &ty, items.len(), unit, count)?;
                let mut repeated: Vec<ValueRef> = Vec::new();
                repeated.try_reserve_exact(len).map_err(reserve_failed)?;
                if !items.is_empty() {
                    for _ in 0..count {
                        repeated.extend_from_slice(&items);
                    }
                }
                for item in &repeated {
                    store.retain(*item)?;
                }
                store.list(repeated)
            }
            SequenceOp::Contains => {
                for item in items {
                    if store.equals(item, args[0])? {
                        return store.boolean(true);
                    }
                }
                store.boolean(false)
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Mappings
// ═══════════════════════════════════════════════════════════════════════

struct DictMapping;

impl DictMapping {
    fn key(store: &ObjectStore, v: ValueRef) -> Result<DictKey> {
        DictKey::from_payload(store.payload(v)?).ok_or_else(|| {
            AmatakError::Type(format!(
                "unhashable type: '{}'",
                store.type_name(v).unwrap_or_default()
            ))
        })
    }

    fn lookup(store: &ObjectStore, receiver: ValueRef, key: &DictKey) -> Result<Option<ValueRef>> {
        match store.payload(receiver)? {
            Payload::Dict(entries) => Ok(entries.get(key).copied()),
            _ => Err(payload_mismatch("dict")),
        }
    }
}

impl MappingProtocol for DictMapping {
    fn supports(&self, _op: MappingOp) -> bool {
        true
    }

    fn call(
        &self,
        store: &mut ObjectStore,
        op: MappingOp,
        receiver: ValueRef,
        args: &[ValueRef],
    ) -> Result<ValueRef> {
        match op {
            MappingOp::Length => {
                let len = match store.payload(receiver)? {
                    Payload::Dict(entries) => entries.len(),
                    _ => return Err(payload_mismatch("dict")),
                };
                store.int(i64::try_from(len).map_err(|_| overflow())?)
            }
            MappingOp::GetItem => {
                let key = Self::key(store, args[0])?;
                let value = Self::lookup(store, receiver, &key)?
                    .ok_or_else(|| AmatakError::Value(format!("key not found: {}", key)))?;
                store.retain(value)?;
                Ok(value)
            }
            MappingOp::SetItem => {
                let key = Self::key(store, args[0])?;
                let value = args[1];
                store.retain(value)?;
                let old = match store.payload_mut(receiver)? {
                    Payload::Dict(entries) => entries.insert(key, value),
                    _ => return Err(payload_mismatch("dict")),
                };
                if let Some(old) = old {
                    store.release(old)?;
                }
                store.none()
            }
            MappingOp::DelItem => {
                let key = Self::key(store, args[0])?;
                let removed = match store.payload_mut(receiver)? {
                    Payload::Dict(entries) => entries.shift_remove(&key),
                    _ => return Err(payload_mismatch("dict")),
                };
                let removed =
                    removed.ok_or_else(|| AmatakError::Value(format!("key not found: {}", key)))?;
                store.release(removed)?;
                store.none()
            }
            MappingOp::Contains => {
                let key = Self::key(store, args[0])?;
                let found = Self::lookup(store, receiver, &key)?.is_some();
                store.boolean(found)
            }
        }
    }
}
