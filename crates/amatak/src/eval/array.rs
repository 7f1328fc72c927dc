//! List literal evaluation

use crate::error::Result;
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::{eval_all, Evaluate, Frame};

impl Evaluate for syn::ExprArray {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        let items = eval_all(&self.elems, rt, frame)?;
        // The list takes over the element references
        rt.store.list(items)
    }
}
