//! Field expression evaluation

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::{release_temps, Evaluate, Frame};

impl Evaluate for syn::ExprField {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        let name = member_name(&self.member)?;
        let base = self.base.eval(rt, frame)?;
        let result = rt.store.get_attr(base, &name);
        release_temps(rt, &[base], result)
    }
}

/// Attribute name of a field member; tuple-style members are rejected.
pub fn member_name(member: &syn::Member) -> Result<String> {
    match member {
        syn::Member::Named(ident) => Ok(ident.to_string()),
        syn::Member::Unnamed(index) => Err(AmatakError::Type(format!(
            "positional attribute .{} is not supported",
            index.index
        ))),
    }
}
