//! Executor tests: literals, operators, bindings, containers and control flow

use amatak::*;
use pretty_assertions::assert_eq;

/// Run `source` in a fresh context and copy the result out.
fn eval(source: &str) -> HostValue {
    let mut interp = Interpreter::default();
    interp.initialize().unwrap();
    let v = interp
        .run(source)
        .unwrap_or_else(|err| panic!("{:?} failed: {}", source, err));
    let host = interp.to_host(v).unwrap();
    interp.release(v).unwrap();
    let report = interp.finalize().unwrap();
    assert_eq!(report.leaked_objects, 0, "{:?} leaked", source);
    host
}

/// Run `source` expecting an uncaught exception.
fn eval_err(source: &str) -> ExceptionInfo {
    let mut interp = Interpreter::default();
    interp.initialize().unwrap();
    let info = match interp.run(source) {
        Err(AmatakError::Uncaught(info)) => *info,
        Err(other) => panic!("{:?}: expected an uncaught exception, got {:?}", source, other),
        Ok(_) => panic!("{:?}: expected an exception", source),
    };
    interp.clear_exception().unwrap();
    let report = interp.finalize().unwrap();
    assert_eq!(report.leaked_objects, 0, "{:?} leaked", source);
    info
}

fn int(n: i64) -> HostValue {
    HostValue::Int(n)
}

fn string(s: &str) -> HostValue {
    HostValue::Str(s.to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// Literals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_literals() {
    assert_eq!(eval("42"), int(42));
    assert_eq!(eval("2.5"), HostValue::Float(2.5));
    assert_eq!(eval("\"hi\""), string("hi"));
    assert_eq!(eval("'c'"), string("c"));
    assert_eq!(eval("true"), HostValue::Bool(true));
    assert_eq!(eval("None"), HostValue::None);
    assert_eq!(eval("[]"), HostValue::List(vec![]));
}

#[test]
fn test_literal_errors() {
    assert_eq!(eval_err("1u8").category, "RuntimeError");
    assert_eq!(eval_err("b\"bytes\"").category, "RuntimeError");
    assert_eq!(eval_err("99999999999999999999").category, "ValueError");
}

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_integer_arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), int(7));
    assert_eq!(eval("(1 + 2) * 3"), int(9));
    assert_eq!(eval("10 - 4 - 3"), int(3));
    assert_eq!(eval("7 / 2"), int(3));
    assert_eq!(eval("7 % 3"), int(1));
    assert_eq!(eval("-(3)"), int(-3));
    assert_eq!(eval("-7 / 2"), int(-3));
}

#[test]
fn test_float_arithmetic() {
    assert_eq!(eval("1.5 + 1"), HostValue::Float(2.5));
    assert_eq!(eval("1 + 1.5"), HostValue::Float(2.5));
    assert_eq!(eval("7.0 / 2"), HostValue::Float(3.5));
    assert_eq!(eval("-0.5"), HostValue::Float(-0.5));
}

#[test]
fn test_arithmetic_errors() {
    assert_eq!(eval_err("1 / 0").category, "ValueError");
    assert_eq!(eval_err("1 % 0").category, "ValueError");
    assert_eq!(eval_err("9223372036854775807 + 1").category, "ValueError");
    assert_eq!(eval_err("1 + \"a\"").category, "TypeError");
    assert_eq!(eval_err("None + 1").category, "TypeError");
    assert_eq!(eval_err("-\"a\"").category, "TypeError");
}

#[test]
fn test_comparisons() {
    assert_eq!(eval("2 < 3"), HostValue::Bool(true));
    assert_eq!(eval("3 <= 2"), HostValue::Bool(false));
    assert_eq!(eval("2.5 > 2"), HostValue::Bool(true));
    assert_eq!(eval("1 == 1.0"), HostValue::Bool(true));
    assert_eq!(eval("[1, \"a\"] == [1, \"a\"]"), HostValue::Bool(true));
    assert_eq!(eval("\"a\" != \"b\""), HostValue::Bool(true));
    assert_eq!(eval("None == None"), HostValue::Bool(true));
}

// ═══════════════════════════════════════════════════════════════════════
// Logic
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_logical_operators() {
    assert_eq!(eval("true && false"), HostValue::Bool(false));
    assert_eq!(eval("false || 1"), HostValue::Bool(true));
    assert_eq!(eval("!true"), HostValue::Bool(false));
    assert_eq!(eval("![]"), HostValue::Bool(true));
    assert_eq!(eval("!\"text\""), HostValue::Bool(false));
}

#[test]
fn test_logical_operators_short_circuit() {
    assert_eq!(eval("false && undefined_name"), HostValue::Bool(false));
    assert_eq!(eval("true || undefined_name"), HostValue::Bool(true));
    assert_eq!(eval_err("true && undefined_name").category, "RuntimeError");
}

// ═══════════════════════════════════════════════════════════════════════
// Bindings
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_let_and_rebinding() {
    assert_eq!(eval("let x = 1; let x = x + 1; x"), int(2));
    assert_eq!(eval("let x = 1; x = 5; x"), int(5));
    assert_eq!(eval("let unset; unset"), HostValue::None);
}

#[test]
fn test_compound_assignment() {
    assert_eq!(eval("let x = 1; x += 2; x"), int(3));
    assert_eq!(eval("let x = 10; x -= 4; x *= 2; x /= 3; x"), int(4));
    assert_eq!(eval("let x = 10; x %= 4; x"), int(2));
    assert_eq!(eval("let s = \"a\"; s += \"b\"; s"), string("ab"));
}

#[test]
fn test_unbound_name_is_runtime_error() {
    let info = eval_err("missing + 1");
    assert_eq!(info.category, "RuntimeError");
    assert!(info.message.contains("missing"));
}

#[test]
fn test_block_shares_namespace() {
    assert_eq!(eval("{ let inner = 3; } inner"), int(3));
}

// ═══════════════════════════════════════════════════════════════════════
// Strings and lists
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_string_operations() {
    assert_eq!(eval("\"ab\" + \"cd\""), string("abcd"));
    assert_eq!(eval("\"ab\" * 3"), string("ababab"));
    assert_eq!(eval("2 * \"xy\""), string("xyxy"));
    assert_eq!(eval("\"héllo\"[1]"), string("é"));
    assert_eq!(eval("len(\"héllo\")"), int(5));
    assert_eq!(eval_err("let s = \"abc\"; s[0] = \"x\";").category, "TypeError");
}

#[test]
fn test_list_operations() {
    assert_eq!(eval("[1, 2] + [3]"), HostValue::List(vec![int(1), int(2), int(3)]));
    assert_eq!(eval("3 * [0]"), HostValue::List(vec![int(0), int(0), int(0)]));
    assert_eq!(eval("let l = [1, 2, 3]; l[-1]"), int(3));
    assert_eq!(eval("let l = [1]; l[0] = 5; l"), HostValue::List(vec![int(5)]));
    assert_eq!(eval("let l = [1]; l[0] *= 5; l[0]"), int(5));
    assert_eq!(eval("len([1, [2, 3]])"), int(2));
}

#[test]
fn test_list_errors() {
    assert_eq!(eval_err("[1][5]").category, "ValueError");
    assert_eq!(eval_err("[1][\"a\"]").category, "TypeError");
    assert_eq!(eval_err("let l = []; l[0] = 1;").category, "ValueError");
}

#[test]
fn test_shared_list_mutation_is_visible() {
    assert_eq!(
        eval("let a = [1]; let b = a; b[0] = 9; a[0]"),
        int(9)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Dictionaries and objects
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_dict_operations() {
    assert_eq!(eval("let d = dict(); d[\"a\"] = 1; d[\"a\"]"), int(1));
    assert_eq!(
        eval("let d = dict(); d[\"a\"] = 1; d[2] = true; d"),
        HostValue::Dict(vec![
            (string("a"), int(1)),
            (int(2), HostValue::Bool(true)),
        ])
    );
    assert_eq!(eval("let d = dict(); d[\"k\"] = 1; d[\"k\"] = 2; len(d)"), int(1));
}

#[test]
fn test_dict_errors() {
    assert_eq!(eval_err("dict()[\"k\"]").category, "ValueError");
    assert_eq!(eval_err("let d = dict(); d[[1]] = 1;").category, "TypeError");
    assert_eq!(eval_err("let d = dict(); d[1.5] = 1;").category, "TypeError");
}

#[test]
fn test_object_attributes() {
    assert_eq!(eval("let o = object(); o.x = 3; o.x + 1"), int(4));
    assert_eq!(eval("let o = object(); o.n = 1; o.n += 1; o.n"), int(2));
    assert_eq!(eval_err("object().missing").category, "ValueError");
    assert_eq!(eval_err("let n = 1; n.x = 2;").category, "TypeError");
}

// ═══════════════════════════════════════════════════════════════════════
// Control flow
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_if_expression() {
    assert_eq!(eval("if 1 > 2 { 1 } else { 2 }"), int(2));
    assert_eq!(eval("if false { 1 }"), HostValue::None);
    assert_eq!(eval("let x = if true { \"y\" } else { \"n\" }; x"), string("y"));
    assert_eq!(
        eval("let n = 5; if n < 0 { \"neg\" } else if n == 0 { \"zero\" } else { \"pos\" }"),
        string("pos")
    );
}

#[test]
fn test_while_loop() {
    assert_eq!(
        eval("let i = 0; let s = 0; while i < 5 { s += i; i += 1; } s"),
        int(10)
    );
    assert_eq!(eval("while false { 1; }"), HostValue::None);
}

#[test]
fn test_while_builds_list() {
    assert_eq!(
        eval("let out = []; let i = 0; while i < 3 { out = out + [i * i]; i += 1; } out"),
        HostValue::List(vec![int(0), int(1), int(4)])
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in calls
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_str_builtin() {
    assert_eq!(eval("str(1.0)"), string("1.0"));
    assert_eq!(eval("str(\"raw\")"), string("raw"));
    assert_eq!(eval("str([1, \"a\", None])"), string("[1, \"a\", None]"));
}

#[test]
fn test_builtin_errors() {
    assert_eq!(eval_err("len(1)").category, "TypeError");
    assert_eq!(eval_err("len()").category, "TypeError");
    assert_eq!(eval_err("nothing(1)").category, "RuntimeError");
}

// ═══════════════════════════════════════════════════════════════════════
// Unsupported syntax
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unsupported_constructs_are_runtime_errors() {
    for source in [
        "fn f() {}",
        "let t = (1, 2);",
        "for x in [1] { }",
        "loop { }",
        "x.method()",
        "println!(\"hi\")",
    ] {
        let info = eval_err(source);
        assert_eq!(info.category, "RuntimeError", "{}", source);
    }
}
