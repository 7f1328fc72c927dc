//! Statement evaluation

use tracing::trace;

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::local::eval_local;
use super::{Evaluate, Frame};

/// Evaluate a statement.
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn eval_stmt(stmt: &syn::Stmt, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
    match stmt {
        // Expression without semicolon: value is returned
        syn::Stmt::Expr(expr, None) => expr.eval(rt, frame),

        // Expression with semicolon: evaluate for side effects, return None
        syn::Stmt::Expr(expr, Some(_)) => {
            let value = expr.eval(rt, frame)?;
            rt.store.discard(value);
            rt.store.none()
        }

        syn::Stmt::Local(local) => {
            eval_local(local, rt, frame)?;
            rt.store.none()
        }

        syn::Stmt::Item(_) => Err(AmatakError::Runtime(
            "item definitions are not supported".to_string(),
        )),

        syn::Stmt::Macro(stmt_macro) => Err(AmatakError::Runtime(format!(
            "unsupported macro statement: {}",
            stmt_macro
                .mac
                .path
                .segments
                .last()
                .map(|s| s.ident.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ))),
    }
}

/// Evaluate a block in the current namespace.
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn eval_block(block: &syn::Block, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
    eval_stmts(&block.stmts, rt, frame)
}

/// Evaluate statements in order, returning the last statement's value.
///
/// # Errors
///
/// Returns errors from statement evaluation.
pub fn eval_stmts(stmts: &[syn::Stmt], rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
    let mut last_value = rt.store.none()?;

    for stmt in stmts {
        if let Err(err) = rt.check_interrupt() {
            rt.store.discard(last_value);
            return Err(err);
        }
        trace!(kind = stmt_kind_name(stmt), "executing statement");

        rt.store.discard(last_value);
        last_value = eval_stmt(stmt, rt, frame)?;
    }

    Ok(last_value)
}

fn stmt_kind_name(stmt: &syn::Stmt) -> &'static str {
    match stmt {
        syn::Stmt::Local(_) => "let",
        syn::Stmt::Item(_) => "item",
        syn::Stmt::Expr(_, None) => "expression",
        syn::Stmt::Expr(_, Some(_)) => "expression statement",
        syn::Stmt::Macro(_) => "macro",
    }
}
