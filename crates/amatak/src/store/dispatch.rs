//! Protocol dispatch and the abstract operations built on it

use crate::error::{AmatakError, Result};
use crate::types::{MappingOp, NumberOp, Operation, SequenceOp, TypeRef};
use crate::value::{Payload, ValueRef};

use super::ObjectStore;

/// Nesting limit for structural equality.
const MAX_COMPARE_DEPTH: usize = 128;

impl ObjectStore {
    /// Invoke `op` on `target` through its type's protocol table.
    ///
    /// Fails with a TypeError when the type has no table for the operation's
    /// protocol or the table declines the operation, and with a RuntimeError
    /// for stale handles or a wrong argument count. Every protocol operation
    /// in the runtime goes through here.
    pub fn dispatch(
        &mut self,
        target: ValueRef,
        op: impl Into<Operation>,
        args: &[ValueRef],
    ) -> Result<ValueRef> {
        let op = op.into();
        let ty = self.type_of(target)?;
        if args.len() != op.arity() {
            return Err(AmatakError::Runtime(format!(
                "{} takes {} argument(s), got {}",
                op,
                op.arity(),
                args.len()
            )));
        }
        for arg in args {
            self.entry(*arg)?;
        }
        match op {
            Operation::Number(n) => match ty.number() {
                Some(table) if table.supports(n) => table.call(self, n, target, args),
                _ => Err(unsupported(&ty, op)),
            },
            Operation::Sequence(s) => match ty.sequence() {
                Some(table) if table.supports(s) => table.call(self, s, target, args),
                _ => Err(unsupported(&ty, op)),
            },
            Operation::Mapping(m) => match ty.mapping() {
                Some(table) if table.supports(m) => table.call(self, m, target, args),
                _ => Err(unsupported(&ty, op)),
            },
        }
    }

    fn type_supports(&self, v: ValueRef, op: Operation) -> Result<bool> {
        let ty = self.type_of(v)?;
        Ok(match op {
            Operation::Number(n) => ty.number().is_some_and(|t| t.supports(n)),
            Operation::Sequence(s) => ty.sequence().is_some_and(|t| t.supports(s)),
            Operation::Mapping(m) => ty.mapping().is_some_and(|t| t.supports(m)),
        })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic
    // ═══════════════════════════════════════════════════════════════════

    /// `lhs + rhs`: number addition, falling back to sequence concatenation.
    pub fn add(&mut self, lhs: ValueRef, rhs: ValueRef) -> Result<ValueRef> {
        if !self.type_supports(lhs, NumberOp::Add.into())?
            && self.type_supports(lhs, SequenceOp::Concat.into())?
        {
            return self.dispatch(lhs, SequenceOp::Concat, &[rhs]);
        }
        self.dispatch(lhs, NumberOp::Add, &[rhs])
    }

    /// `lhs * rhs`: number multiplication, or sequence repetition from either side.
    pub fn multiply(&mut self, lhs: ValueRef, rhs: ValueRef) -> Result<ValueRef> {
        if self.type_supports(lhs, SequenceOp::Repeat.into())? {
            return self.dispatch(lhs, SequenceOp::Repeat, &[rhs]);
        }
        if self.as_int(lhs).is_some() && self.type_supports(rhs, SequenceOp::Repeat.into())? {
            return self.dispatch(rhs, SequenceOp::Repeat, &[lhs]);
        }
        self.dispatch(lhs, NumberOp::Mul, &[rhs])
    }

    /// Any other binary number operation, including ordering comparisons.
    pub fn binary(&mut self, op: NumberOp, lhs: ValueRef, rhs: ValueRef) -> Result<ValueRef> {
        match op {
            NumberOp::Add => self.add(lhs, rhs),
            NumberOp::Mul => self.multiply(lhs, rhs),
            _ => self.dispatch(lhs, op, &[rhs]),
        }
    }

    /// Ordering comparison (`<`, `<=`, `>`, `>=`) reduced to a Rust bool.
    pub fn compare(&mut self, op: NumberOp, lhs: ValueRef, rhs: ValueRef) -> Result<bool> {
        if !matches!(op, NumberOp::Lt | NumberOp::Le | NumberOp::Gt | NumberOp::Ge) {
            return Err(AmatakError::Runtime(format!(
                "'{}' is not a comparison",
                op.symbol()
            )));
        }
        let result = self.dispatch(lhs, op, &[rhs])?;
        let ordered = self.as_bool(result);
        self.release(result)?;
        ordered.ok_or_else(|| AmatakError::Runtime("comparison did not return a bool".to_string()))
    }

    /// `-v`
    pub fn negate(&mut self, v: ValueRef) -> Result<ValueRef> {
        self.dispatch(v, NumberOp::Neg, &[])
    }

    // ═══════════════════════════════════════════════════════════════════
    // Containers
    // ═══════════════════════════════════════════════════════════════════

    fn prefers_mapping(&self, container: ValueRef) -> Result<bool> {
        Ok(self.type_of(container)?.mapping().is_some())
    }

    /// `container[key]`
    pub fn get_item(&mut self, container: ValueRef, key: ValueRef) -> Result<ValueRef> {
        if self.prefers_mapping(container)? {
            self.dispatch(container, MappingOp::GetItem, &[key])
        } else {
            self.dispatch(container, SequenceOp::GetItem, &[key])
        }
    }

    /// `container[key] = value`
    pub fn set_item(&mut self, container: ValueRef, key: ValueRef, value: ValueRef) -> Result<()> {
        let result = if self.prefers_mapping(container)? {
            self.dispatch(container, MappingOp::SetItem, &[key, value])?
        } else {
            self.dispatch(container, SequenceOp::SetItem, &[key, value])?
        };
        self.release(result)
    }

    /// Remove `container[key]`.
    pub fn del_item(&mut self, container: ValueRef, key: ValueRef) -> Result<()> {
        let result = self.dispatch(container, MappingOp::DelItem, &[key])?;
        self.release(result)
    }

    /// Number of items in a sequence or mapping.
    pub fn length(&mut self, container: ValueRef) -> Result<usize> {
        let result = if self.prefers_mapping(container)? {
            self.dispatch(container, MappingOp::Length, &[])?
        } else {
            self.dispatch(container, SequenceOp::Length, &[])?
        };
        let len = self.as_int(result);
        self.release(result)?;
        len.and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| AmatakError::Runtime("length is not a non-negative int".to_string()))
    }

    /// Membership test (`item in container`).
    pub fn contains(&mut self, container: ValueRef, item: ValueRef) -> Result<bool> {
        let result = if self.prefers_mapping(container)? {
            self.dispatch(container, MappingOp::Contains, &[item])?
        } else {
            self.dispatch(container, SequenceOp::Contains, &[item])?
        };
        let found = self.as_bool(result);
        self.release(result)?;
        found.ok_or_else(|| AmatakError::Runtime("membership test did not return a bool".to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Equality and truth
    // ═══════════════════════════════════════════════════════════════════

    /// Structural equality; values of unrelated kinds compare by identity.
    pub fn equals(&self, a: ValueRef, b: ValueRef) -> Result<bool> {
        self.equals_at(a, b, 0)
    }

    fn equals_at(&self, a: ValueRef, b: ValueRef, depth: usize) -> Result<bool> {
        if a == b {
            self.entry(a)?;
            return Ok(true);
        }
        if depth > MAX_COMPARE_DEPTH {
            return Err(AmatakError::Runtime(
                "maximum comparison depth exceeded".to_string(),
            ));
        }
        match (self.payload(a)?, self.payload(b)?) {
            (Payload::None, Payload::None) => Ok(true),
            (Payload::Bool(x), Payload::Bool(y)) => Ok(x == y),
            (Payload::Int(x), Payload::Int(y)) => Ok(x == y),
            (Payload::Float(x), Payload::Float(y)) => Ok(x == y),
            (Payload::Int(x), Payload::Float(y)) | (Payload::Float(y), Payload::Int(x)) => {
                Ok((*x as f64) == *y)
            }
            (Payload::Str(x), Payload::Str(y)) => Ok(x == y),
            (Payload::List(xs), Payload::List(ys)) => {
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for (x, y) in xs.iter().zip(ys.iter()) {
                    if !self.equals_at(*x, *y, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Payload::Dict(xs), Payload::Dict(ys)) => {
                if xs.len() != ys.len() {
                    return Ok(false);
                }
                for (key, x) in xs {
                    match ys.get(key) {
                        Some(y) if self.equals_at(*x, *y, depth + 1)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Truthiness: `None`, `false`, zero and empty containers are false.
    pub fn is_truthy(&self, v: ValueRef) -> Result<bool> {
        Ok(match self.payload(v)? {
            Payload::None => false,
            Payload::Bool(b) => *b,
            Payload::Int(n) => *n != 0,
            Payload::Float(f) => *f != 0.0,
            Payload::Str(s) => !s.is_empty(),
            Payload::List(items) => !items.is_empty(),
            Payload::Dict(entries) => !entries.is_empty(),
            Payload::Instance(_) | Payload::Module(_) | Payload::Exception(_) => true,
        })
    }
}

fn unsupported(ty: &TypeRef, op: Operation) -> AmatakError {
    if ty.implements(op.protocol()) {
        AmatakError::Type(format!(
            "'{}' object does not support {}",
            ty.name(),
            op
        ))
    } else {
        AmatakError::Type(format!(
            "'{}' object does not support the {} protocol ({})",
            ty.name(),
            op.protocol(),
            op
        ))
    }
}
