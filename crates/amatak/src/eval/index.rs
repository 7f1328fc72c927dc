//! Index expression evaluation

use crate::error::Result;
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::{eval_pair, release_temps, Evaluate, Frame};

impl Evaluate for syn::ExprIndex {
    /// `base[index]` through the mapping protocol when the base has one,
    /// otherwise the sequence protocol.
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        let (base, index) = eval_pair(&self.expr, &self.index, rt, frame)?;
        let result = rt.store.get_item(base, index);
        release_temps(rt, &[base, index], result)
    }
}
