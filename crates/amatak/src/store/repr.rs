//! Text rendering of stored values

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::Result;
use crate::value::{format_float, Payload, ValueRef};

use super::ObjectStore;

impl ObjectStore {
    /// Source-like rendering of `v`; strings are quoted.
    ///
    /// A container reached again while it is being rendered prints as `[...]`.
    pub fn repr(&self, v: ValueRef) -> Result<String> {
        let mut out = String::new();
        let mut active = HashSet::new();
        self.write_repr(v, &mut out, &mut active)?;
        Ok(out)
    }

    /// Like [`repr`](Self::repr), but strings render as their raw text.
    pub fn display_string(&self, v: ValueRef) -> Result<String> {
        match self.payload(v)? {
            Payload::Str(s) => Ok(s.clone()),
            _ => self.repr(v),
        }
    }

    fn write_repr(
        &self,
        v: ValueRef,
        out: &mut String,
        active: &mut HashSet<ValueRef>,
    ) -> Result<()> {
        let payload = self.payload(v)?;
        if payload.is_container() && !active.insert(v) {
            out.push_str("[...]");
            return Ok(());
        }
        match payload {
            Payload::None => out.push_str("None"),
            Payload::Bool(b) => {
                let _ = write!(out, "{}", b);
            }
            Payload::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Payload::Float(x) => out.push_str(&format_float(*x)),
            Payload::Str(s) => {
                let _ = write!(out, "{:?}", s);
            }
            Payload::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_repr(*item, out, active)?;
                }
                out.push(']');
            }
            Payload::Dict(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}: ", key);
                    self.write_repr(*value, out, active)?;
                }
                out.push('}');
            }
            Payload::Instance(_) => {
                let _ = write!(out, "<{} object>", self.type_name(v)?);
            }
            Payload::Module(module) => {
                let _ = write!(out, "<module '{}'>", module.name);
            }
            Payload::Exception(exc) => {
                let _ = write!(out, "{}({:?})", self.type_name(v)?, exc.message);
            }
        }
        active.remove(&v);
        Ok(())
    }
}
