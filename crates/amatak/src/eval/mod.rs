//! Statement and expression execution
//!
//! A tree walker over the `syn` statements of a [`CompiledUnit`]. Every node
//! evaluates to an owned [`ValueRef`]; temporaries are released as soon as
//! they are consumed, including on error paths. Bindings live in the
//! namespace of the module being executed; blocks do not open new scopes.

pub mod array;
pub mod assign;
pub mod binary;
pub mod call;
pub mod field;
pub mod if_expr;
pub mod index;
pub mod literal;
pub mod local;
pub mod loops;
pub mod path;
pub mod stmt;
pub mod unary;

use crate::error::{AmatakError, Result};
use crate::frontend::CompiledUnit;
use crate::interpreter::Runtime;
use crate::value::ValueRef;

pub use stmt::{eval_block, eval_stmts};

/// Execution state of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Module whose attribute dictionary holds the bindings (borrowed)
    pub namespace: ValueRef,
    /// Current expression nesting depth
    pub depth: usize,
}

impl Frame {
    /// A frame executing in `namespace`.
    pub fn new(namespace: ValueRef) -> Self {
        Self {
            namespace,
            depth: 0,
        }
    }
}

/// Trait for evaluating AST nodes to values.
///
/// Each supported `syn` node type implements this trait. The returned
/// handle is owned by the caller.
pub trait Evaluate {
    /// Evaluate this AST node against the runtime.
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef>;
}

/// Execute `unit` with `namespace` as its module namespace.
///
/// Returns the value of the final expression statement, or `None` when the
/// unit is empty or ends with a `;`-terminated statement.
pub fn exec_unit(rt: &mut Runtime, unit: &CompiledUnit, namespace: ValueRef) -> Result<ValueRef> {
    let mut frame = Frame::new(namespace);
    eval_stmts(&unit.stmts, rt, &mut frame)
}

// ═══════════════════════════════════════════════════════════════════════
// Main Expression Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Evaluate for syn::Expr {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        rt.check_interrupt()?;
        if frame.depth >= rt.config().max_eval_depth {
            return Err(AmatakError::Runtime(format!(
                "maximum expression depth of {} exceeded",
                rt.config().max_eval_depth
            )));
        }
        frame.depth += 1;
        let result = eval_expr_kind(self, rt, frame);
        frame.depth -= 1;
        result
    }
}

fn eval_expr_kind(expr: &syn::Expr, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
    match expr {
        syn::Expr::Lit(e) => e.eval(rt, frame),
        syn::Expr::Path(e) => e.eval(rt, frame),
        syn::Expr::Unary(e) => e.eval(rt, frame),
        syn::Expr::Binary(e) => e.eval(rt, frame),
        syn::Expr::Array(e) => e.eval(rt, frame),
        syn::Expr::Index(e) => e.eval(rt, frame),
        syn::Expr::Field(e) => e.eval(rt, frame),
        syn::Expr::Assign(e) => e.eval(rt, frame),
        syn::Expr::Call(e) => e.eval(rt, frame),
        syn::Expr::If(e) => e.eval(rt, frame),
        syn::Expr::While(e) => e.eval(rt, frame),
        syn::Expr::Block(e) => eval_block(&e.block, rt, frame),

        // Parenthesized expressions - just unwrap
        syn::Expr::Paren(e) => e.expr.eval(rt, frame),

        // Group expressions (for precedence) - just unwrap
        syn::Expr::Group(e) => e.expr.eval(rt, frame),

        _ => Err(unsupported(expr_kind_name(expr), expr)),
    }
}

/// Get a human-readable name for an expression kind.
fn expr_kind_name(expr: &syn::Expr) -> &'static str {
    match expr {
        syn::Expr::Async(_) => "async block",
        syn::Expr::Await(_) => "await",
        syn::Expr::Break(_) => "break",
        syn::Expr::Cast(_) => "cast",
        syn::Expr::Closure(_) => "closure",
        syn::Expr::Const(_) => "const block",
        syn::Expr::Continue(_) => "continue",
        syn::Expr::ForLoop(_) => "for loop",
        syn::Expr::Infer(_) => "infer",
        syn::Expr::Let(_) => "let guard",
        syn::Expr::Loop(_) => "loop",
        syn::Expr::Macro(_) => "macro invocation",
        syn::Expr::Match(_) => "match",
        syn::Expr::MethodCall(_) => "method call",
        syn::Expr::Range(_) => "range",
        syn::Expr::Reference(_) => "reference",
        syn::Expr::Repeat(_) => "repeat",
        syn::Expr::Return(_) => "return",
        syn::Expr::Struct(_) => "struct literal",
        syn::Expr::Try(_) => "try",
        syn::Expr::TryBlock(_) => "try block",
        syn::Expr::Tuple(_) => "tuple",
        syn::Expr::Unsafe(_) => "unsafe block",
        syn::Expr::Yield(_) => "yield",
        _ => "expression",
    }
}

/// Get the span of an expression.
pub(crate) fn expr_span(expr: &syn::Expr) -> proc_macro2::Span {
    use quote::ToTokens;
    expr.to_token_stream()
        .into_iter()
        .next()
        .map(|t| t.span())
        .unwrap_or_else(proc_macro2::Span::call_site)
}

/// RuntimeError for a construct the executor does not run.
pub(crate) fn unsupported(what: &str, expr: &syn::Expr) -> AmatakError {
    let start = expr_span(expr).start();
    AmatakError::Runtime(format!(
        "unsupported {} at line {}, column {}",
        what,
        start.line,
        start.column + 1
    ))
}

/// Release `temps`, passing `result` through.
pub(crate) fn release_temps<T>(rt: &mut Runtime, temps: &[ValueRef], result: Result<T>) -> Result<T> {
    for v in temps {
        rt.store.discard(*v);
    }
    result
}

/// Evaluate two operands left to right; the first is released if the second fails.
pub(crate) fn eval_pair(
    left: &syn::Expr,
    right: &syn::Expr,
    rt: &mut Runtime,
    frame: &mut Frame,
) -> Result<(ValueRef, ValueRef)> {
    let l = left.eval(rt, frame)?;
    match right.eval(rt, frame) {
        Ok(r) => Ok((l, r)),
        Err(err) => {
            rt.store.discard(l);
            Err(err)
        }
    }
}

/// Evaluate expressions in order, releasing the finished ones if a later one fails.
pub(crate) fn eval_all<'a>(
    exprs: impl IntoIterator<Item = &'a syn::Expr>,
    rt: &mut Runtime,
    frame: &mut Frame,
) -> Result<Vec<ValueRef>> {
    let mut values = Vec::new();
    for expr in exprs {
        match expr.eval(rt, frame) {
            Ok(v) => values.push(v),
            Err(err) => return release_temps(rt, &values, Err(err)),
        }
    }
    Ok(values)
}
