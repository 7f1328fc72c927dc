//! Assignment expression evaluation

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::field::member_name;
use super::path::simple_name;
use super::{eval_pair, release_temps, Evaluate, Frame};

impl Evaluate for syn::ExprAssign {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        let value = self.right.eval(rt, frame)?;
        let assigned = assign_to_expr(&self.left, value, rt, frame);
        release_temps(rt, &[value], assigned)?;
        rt.store.none()
    }
}

/// Store `value` (borrowed) into an assignment target.
///
/// Targets are names (bound in the frame's namespace), attributes and
/// subscripts.
///
/// # Errors
///
/// Returns a RuntimeError for any other target expression.
pub fn assign_to_expr(
    target: &syn::Expr,
    value: ValueRef,
    rt: &mut Runtime,
    frame: &mut Frame,
) -> Result<()> {
    match target {
        syn::Expr::Path(path) => {
            let name = simple_name(&path.path)?;
            rt.store.set_attr(frame.namespace, &name, value)
        }

        syn::Expr::Field(field) => {
            let name = member_name(&field.member)?;
            let base = field.base.eval(rt, frame)?;
            let result = rt.store.set_attr(base, &name, value);
            release_temps(rt, &[base], result)
        }

        syn::Expr::Index(index) => {
            let (base, key) = eval_pair(&index.expr, &index.index, rt, frame)?;
            let result = rt.store.set_item(base, key, value);
            release_temps(rt, &[base, key], result)
        }

        syn::Expr::Paren(paren) => assign_to_expr(&paren.expr, value, rt, frame),

        _ => Err(AmatakError::Runtime(
            "invalid assignment target".to_string(),
        )),
    }
}
