//! If expression evaluation

use crate::error::Result;
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::binary::eval_truth;
use super::{eval_block, Evaluate, Frame};

impl Evaluate for syn::ExprIf {
    /// The condition is tested for truthiness. Without an `else`, a false
    /// condition yields `None`.
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        if eval_truth(&self.cond, rt, frame)? {
            eval_block(&self.then_branch, rt, frame)
        } else if let Some((_, else_branch)) = &self.else_branch {
            match else_branch.as_ref() {
                syn::Expr::Block(block) => eval_block(&block.block, rt, frame),
                syn::Expr::If(else_if) => else_if.eval(rt, frame),
                other => other.eval(rt, frame),
            }
        } else {
            rt.store.none()
        }
    }
}
