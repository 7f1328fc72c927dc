//! Name lookup

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::{Evaluate, Frame};

impl Evaluate for syn::ExprPath {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        let name = simple_name(&self.path)?;
        if name == "None" {
            return rt.store.none();
        }
        lookup_name(rt, frame, &name)
    }
}

/// Read a binding from the frame's namespace.
///
/// # Errors
///
/// An unbound name is a RuntimeError.
pub fn lookup_name(rt: &mut Runtime, frame: &Frame, name: &str) -> Result<ValueRef> {
    if !rt.store.has_attr(frame.namespace, name)? {
        return Err(AmatakError::Runtime(format!(
            "name '{}' is not defined",
            name
        )));
    }
    rt.store.get_attr(frame.namespace, name)
}

/// The identifier of a single-segment path.
pub fn simple_name(path: &syn::Path) -> Result<String> {
    match path.get_ident() {
        Some(ident) => Ok(ident.to_string()),
        None => Err(AmatakError::Runtime(format!(
            "qualified paths are not supported: {}",
            path.segments
                .iter()
                .map(|seg| seg.ident.to_string())
                .collect::<Vec<_>>()
                .join("::")
        ))),
    }
}
