//! Binary operation evaluation

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::types::NumberOp;
use crate::value::ValueRef;

use super::assign::assign_to_expr;
use super::{eval_pair, release_temps, Evaluate, Frame};

impl Evaluate for syn::ExprBinary {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        // Short-circuit evaluation for && and ||
        match &self.op {
            syn::BinOp::And(_) => return eval_logical(self, true, rt, frame),
            syn::BinOp::Or(_) => return eval_logical(self, false, rt, frame),
            _ => {}
        }

        // Handle compound assignment operators by desugaring: x += y  →  x = x + y
        if let Some(op) = compound_op(&self.op) {
            return eval_compound_assignment(self, op, rt, frame);
        }

        let op = binary_op(&self.op)?;
        let (left, right) = eval_pair(&self.left, &self.right, rt, frame)?;
        let result = apply(op, left, right, rt);
        release_temps(rt, &[left, right], result)
    }
}

/// Operators after `&&`, `||` and compound assignment are set aside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Number(NumberOp),
    Eq,
    Ne,
}

fn binary_op(op: &syn::BinOp) -> Result<BinaryOp> {
    Ok(match op {
        syn::BinOp::Add(_) => BinaryOp::Number(NumberOp::Add),
        syn::BinOp::Sub(_) => BinaryOp::Number(NumberOp::Sub),
        syn::BinOp::Mul(_) => BinaryOp::Number(NumberOp::Mul),
        syn::BinOp::Div(_) => BinaryOp::Number(NumberOp::Div),
        syn::BinOp::Rem(_) => BinaryOp::Number(NumberOp::Rem),
        syn::BinOp::Lt(_) => BinaryOp::Number(NumberOp::Lt),
        syn::BinOp::Le(_) => BinaryOp::Number(NumberOp::Le),
        syn::BinOp::Gt(_) => BinaryOp::Number(NumberOp::Gt),
        syn::BinOp::Ge(_) => BinaryOp::Number(NumberOp::Ge),
        syn::BinOp::Eq(_) => BinaryOp::Eq,
        syn::BinOp::Ne(_) => BinaryOp::Ne,
        _ => {
            return Err(AmatakError::Runtime(
                "unsupported binary operator".to_string(),
            ))
        }
    })
}

/// Check if a binary operator is a compound assignment operator.
fn compound_op(op: &syn::BinOp) -> Option<NumberOp> {
    match op {
        syn::BinOp::AddAssign(_) => Some(NumberOp::Add),
        syn::BinOp::SubAssign(_) => Some(NumberOp::Sub),
        syn::BinOp::MulAssign(_) => Some(NumberOp::Mul),
        syn::BinOp::DivAssign(_) => Some(NumberOp::Div),
        syn::BinOp::RemAssign(_) => Some(NumberOp::Rem),
        _ => None,
    }
}

fn apply(op: BinaryOp, left: ValueRef, right: ValueRef, rt: &mut Runtime) -> Result<ValueRef> {
    match op {
        BinaryOp::Number(op) => rt.store.binary(op, left, right),
        BinaryOp::Eq => {
            let equal = rt.store.equals(left, right)?;
            rt.store.boolean(equal)
        }
        BinaryOp::Ne => {
            let equal = rt.store.equals(left, right)?;
            rt.store.boolean(!equal)
        }
    }
}

/// `&&` (`is_and`) and `||`, on truthiness, yielding a bool.
fn eval_logical(
    binary: &syn::ExprBinary,
    is_and: bool,
    rt: &mut Runtime,
    frame: &mut Frame,
) -> Result<ValueRef> {
    let left_truth = eval_truth(&binary.left, rt, frame)?;
    if left_truth != is_and {
        return rt.store.boolean(left_truth);
    }
    let right_truth = eval_truth(&binary.right, rt, frame)?;
    rt.store.boolean(right_truth)
}

/// Evaluate `expr` and reduce it to its truthiness.
pub(crate) fn eval_truth(expr: &syn::Expr, rt: &mut Runtime, frame: &mut Frame) -> Result<bool> {
    let value = expr.eval(rt, frame)?;
    let truth = rt.store.is_truthy(value);
    release_temps(rt, &[value], truth)
}

/// Evaluate a compound assignment expression by desugaring it.
///
/// Converts `x += y` to `x = x + y`; the target expression is evaluated
/// once to read and once to write.
fn eval_compound_assignment(
    binary: &syn::ExprBinary,
    op: NumberOp,
    rt: &mut Runtime,
    frame: &mut Frame,
) -> Result<ValueRef> {
    let (current, rhs) = eval_pair(&binary.left, &binary.right, rt, frame)?;
    let updated = rt.store.binary(op, current, rhs);
    let updated = release_temps(rt, &[current, rhs], updated)?;
    let assigned = assign_to_expr(&binary.left, updated, rt, frame);
    release_temps(rt, &[updated], assigned)?;
    rt.store.none()
}
