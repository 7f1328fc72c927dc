//! Loop expression evaluation

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::binary::eval_truth;
use super::{eval_block, Frame, Evaluate};

// ═══════════════════════════════════════════════════════════════════════
// while expression
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::ExprWhile {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        if self.label.is_some() {
            return Err(AmatakError::Runtime(
                "loop labels are not supported".to_string(),
            ));
        }

        loop {
            rt.check_interrupt()?;

            if !eval_truth(&self.cond, rt, frame)? {
                return rt.store.none();
            }

            let body = eval_block(&self.body, rt, frame)?;
            rt.store.discard(body);
        }
    }
}
