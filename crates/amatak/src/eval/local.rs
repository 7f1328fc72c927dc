//! Local binding (let statement) evaluation

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;

use super::{Evaluate, Frame};

/// Evaluate a `let` binding into the frame's namespace.
///
/// Only plain identifier patterns (optionally `mut` or type-annotated) and
/// `_` are accepted. A binding without initializer is bound to `None`.
///
/// # Errors
///
/// Returns a RuntimeError for other patterns and for `let ... else`.
pub fn eval_local(local: &syn::Local, rt: &mut Runtime, frame: &mut Frame) -> Result<()> {
    let target = binding_name(&local.pat)?;

    let value = match &local.init {
        Some(init) if init.diverge.is_some() => {
            return Err(AmatakError::Runtime(
                "let-else bindings are not supported".to_string(),
            ));
        }
        Some(init) => init.expr.eval(rt, frame)?,
        None => rt.store.none()?,
    };

    let result = match &target {
        Some(name) => rt.store.set_attr(frame.namespace, name, value),
        None => Ok(()),
    };
    rt.store.discard(value);
    result
}

/// Name bound by `pat`; `None` for the wildcard.
fn binding_name(pat: &syn::Pat) -> Result<Option<String>> {
    match pat {
        syn::Pat::Ident(pat_ident) if pat_ident.subpat.is_none() => {
            Ok(Some(pat_ident.ident.to_string()))
        }
        syn::Pat::Type(pat_type) => binding_name(&pat_type.pat),
        syn::Pat::Wild(_) => Ok(None),
        _ => Err(AmatakError::Runtime(
            "only simple name bindings are supported in let".to_string(),
        )),
    }
}
