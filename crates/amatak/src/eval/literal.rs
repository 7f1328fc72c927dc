//! Literal evaluation

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::{Evaluate, Frame};

impl Evaluate for syn::ExprLit {
    fn eval(&self, rt: &mut Runtime, _frame: &mut Frame) -> Result<ValueRef> {
        eval_lit(&self.lit, rt)
    }
}

/// Evaluate a literal to a new value.
pub fn eval_lit(lit: &syn::Lit, rt: &mut Runtime) -> Result<ValueRef> {
    match lit {
        syn::Lit::Str(s) => rt.store.string(s.value()),

        syn::Lit::Char(c) => rt.store.string(c.value().to_string()),

        syn::Lit::Int(i) => {
            let n = eval_int_literal(i)?;
            rt.store.int(n)
        }

        syn::Lit::Float(f) => {
            let x = eval_float_literal(f)?;
            rt.store.float(x)
        }

        syn::Lit::Bool(b) => rt.store.boolean(b.value()),

        syn::Lit::ByteStr(_) => Err(unsupported_literal("byte string literal")),
        syn::Lit::CStr(_) => Err(unsupported_literal("C string literal")),
        syn::Lit::Byte(_) => Err(unsupported_literal("byte literal")),
        _ => Err(unsupported_literal("literal")),
    }
}

/// Integers are 64-bit; type suffixes are rejected.
fn eval_int_literal(lit: &syn::LitInt) -> Result<i64> {
    if !lit.suffix().is_empty() {
        return Err(unsupported_literal(&format!(
            "integer with suffix `{}`",
            lit.suffix()
        )));
    }
    lit.base10_parse::<i64>().map_err(|_| {
        AmatakError::Value(format!(
            "integer literal {} does not fit in 64 bits",
            lit.base10_digits()
        ))
    })
}

fn eval_float_literal(lit: &syn::LitFloat) -> Result<f64> {
    if !lit.suffix().is_empty() {
        return Err(unsupported_literal(&format!(
            "float with suffix `{}`",
            lit.suffix()
        )));
    }
    lit.base10_parse::<f64>()
        .map_err(|e| AmatakError::Value(format!("invalid float literal: {}", e)))
}

fn unsupported_literal(kind: &str) -> AmatakError {
    AmatakError::Runtime(format!("unsupported {}", kind))
}
