//! Built-in function calls
//!
//! The language has no user-defined functions; a call expression names one
//! of a fixed set of built-ins:
//!
//! | call                       | result                                   |
//! |----------------------------|------------------------------------------|
//! | `import(name)`             | the module `name`, loaded on first use   |
//! | `len(x)`                   | length of a sequence or mapping          |
//! | `dict()`                   | a new empty dictionary                   |
//! | `object()`                 | a new instance with no attributes        |
//! | `str(x)`                   | text rendering of `x`                    |
//! | `raise(category, message)` | raises an exception of the named category|

use crate::error::{AmatakError, Result};
use crate::interpreter::Runtime;
use crate::value::ValueRef;

use super::path::simple_name;
use super::{eval_all, release_temps, unsupported, Evaluate, Frame};

impl Evaluate for syn::ExprCall {
    fn eval(&self, rt: &mut Runtime, frame: &mut Frame) -> Result<ValueRef> {
        let name = match self.func.as_ref() {
            syn::Expr::Path(path) => simple_name(&path.path)?,
            other => return Err(unsupported("call of a computed callee", other)),
        };
        let builtin = Builtin::from_name(&name).ok_or_else(|| {
            AmatakError::Runtime(format!("'{}' is not a built-in function", name))
        })?;
        if self.args.len() != builtin.arity() {
            return Err(AmatakError::Type(format!(
                "{}() takes {} argument(s) but {} were given",
                name,
                builtin.arity(),
                self.args.len()
            )));
        }
        let args = eval_all(&self.args, rt, frame)?;
        let result = call_builtin(builtin, &args, rt);
        release_temps(rt, &args, result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Import,
    Len,
    Dict,
    Object,
    Str,
    Raise,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "import" => Builtin::Import,
            "len" => Builtin::Len,
            "dict" => Builtin::Dict,
            "object" => Builtin::Object,
            "str" => Builtin::Str,
            "raise" => Builtin::Raise,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Builtin::Dict | Builtin::Object => 0,
            Builtin::Import | Builtin::Len | Builtin::Str => 1,
            Builtin::Raise => 2,
        }
    }
}

/// Run `builtin`; `args` are borrowed and already arity-checked.
fn call_builtin(builtin: Builtin, args: &[ValueRef], rt: &mut Runtime) -> Result<ValueRef> {
    match builtin {
        Builtin::Import => {
            let name = string_arg(rt, args[0], "import")?;
            rt.import_module(&name)
        }
        Builtin::Len => {
            let len = rt.store.length(args[0])?;
            let len = i64::try_from(len)
                .map_err(|_| AmatakError::Value("length does not fit in an int".to_string()))?;
            rt.store.int(len)
        }
        Builtin::Dict => rt.store.dict(),
        Builtin::Object => {
            let ty = rt.store.types().object.clone();
            rt.store.instance(&ty)
        }
        Builtin::Str => {
            let text = rt.store.display_string(args[0])?;
            rt.store.string(text)
        }
        Builtin::Raise => {
            let category_name = string_arg(rt, args[0], "raise")?;
            let message = rt.store.display_string(args[1])?;
            let category = rt
                .exceptions
                .lookup(&category_name)
                .ok_or(AmatakError::UnknownCategory(category_name))?;
            let exc = rt
                .exceptions
                .new_exception(&mut rt.store, category, message, None)?;
            Err(AmatakError::Thrown(exc))
        }
    }
}

fn string_arg(rt: &Runtime, v: ValueRef, function: &str) -> Result<String> {
    rt.store.as_str(v).map(str::to_string).ok_or_else(|| {
        AmatakError::Type(format!(
            "{}() expects a str argument, got '{}'",
            function,
            rt.store.type_name(v).unwrap_or_default()
        ))
    })
}
