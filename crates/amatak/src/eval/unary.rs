//! Unary operation evaluation

use crate::error::Result;
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::binary::eval_truth;
use super::{release_temps, unsupported, Evaluate, Frame};

impl Evaluate for syn::ExprUnary {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        match &self.op {
            syn::UnOp::Neg(_) => {
                let operand = self.expr.eval(rt, frame)?;
                let result = rt.store.negate(operand);
                release_temps(rt, &[operand], result)
            }
            syn::UnOp::Not(_) => {
                let truth = eval_truth(&self.expr, rt, frame)?;
                rt.store.boolean(!truth)
            }
            _ => Err(unsupported("unary operator", &self.expr)),
        }
    }
}
