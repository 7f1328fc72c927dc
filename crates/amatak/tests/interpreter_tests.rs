//! Interpreter lifecycle and host embedding API

use std::thread;
use std::time::Duration;

use amatak::*;
use pretty_assertions::assert_eq;

fn ready() -> Interpreter {
    let mut interp = Interpreter::default();
    interp.initialize().unwrap();
    interp
}

fn uncaught(err: AmatakError) -> ExceptionInfo {
    match err {
        AmatakError::Uncaught(info) => *info,
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

fn main_module(interp: &Interpreter) -> ValueRef {
    interp.modules().unwrap().get(MAIN_MODULE).unwrap().value
}

// ═══════════════════════════════════════════════════════════════════════
// Lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_calls_before_initialize_fail() {
    let mut interp = Interpreter::default();
    assert_eq!(interp.state(), LifecycleState::Uninitialized);

    let err = interp.run("1").unwrap_err();
    assert!(matches!(err, AmatakError::Lifecycle(_)));
    assert!(interp.store().is_err());
    assert!(interp.finalize().is_err());
    assert!(interp.clear_exception().is_err());
    assert!(interp.take_exception().is_err());
}

#[test]
fn test_initialize_is_idempotent() {
    let mut interp = ready();
    let v = interp.run("let kept = 5;").unwrap();
    interp.release(v).unwrap();
    let live = interp.store().unwrap().live_count();

    interp.initialize().unwrap();
    assert_eq!(interp.state(), LifecycleState::Ready);
    assert_eq!(interp.store().unwrap().live_count(), live);

    let kept = interp.run("kept").unwrap();
    assert_eq!(interp.store().unwrap().as_int(kept), Some(5));
    interp.release(kept).unwrap();
}

#[test]
fn test_calls_after_finalize_fail() {
    let mut interp = ready();
    interp.finalize().unwrap();
    assert_eq!(interp.state(), LifecycleState::Finalized);

    for err in [
        interp.run("1").unwrap_err(),
        interp.import_module("m").unwrap_err(),
        interp.finalize().unwrap_err(),
        interp.clear_exception().unwrap_err(),
        interp.take_exception().unwrap_err(),
    ] {
        assert!(matches!(err, AmatakError::Lifecycle(_)), "{:?}", err);
        assert_eq!(err.category_name(), "RuntimeError");
    }
}

#[test]
fn test_reinitialize_after_finalize_starts_fresh() {
    let mut interp = ready();
    let v = interp.run("let old = 1;").unwrap();
    interp.release(v).unwrap();
    interp.finalize().unwrap();

    interp.initialize().unwrap();
    assert_eq!(interp.state(), LifecycleState::Ready);
    let _ = interp.run("old").unwrap_err();
    let info = interp.active_exception().unwrap();
    assert_eq!(info.category, "RuntimeError");
    interp.clear_exception().unwrap();
}

#[test]
fn test_finalize_report_counts_leaks() {
    let mut interp = ready();
    let held = interp.run("[1, 2]").unwrap();
    assert!(interp.store().unwrap().is_live(held));

    let report = interp.finalize().unwrap();
    assert_eq!(report.modules_released, 1);
    assert_eq!(report.cyclic_objects, 0);
    assert_eq!(report.leaked_objects, 3);
}

#[test]
fn test_finalize_reports_cycle() {
    let mut interp = ready();
    let v = interp.run("let l = [0]; l[0] = l;").unwrap();
    interp.release(v).unwrap();

    let report = interp.finalize().unwrap();
    assert!(report.cyclic_objects >= 1);
    assert_eq!(report.leaked_objects, 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Running source
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_run_empty_source_is_none() {
    let mut interp = ready();
    let v = interp.run("").unwrap();
    assert!(interp.store().unwrap().is_none(v));
    interp.release(v).unwrap();
}

#[test]
fn test_trailing_semicolon_is_none() {
    let mut interp = ready();
    let v = interp.run("1 + 2;").unwrap();
    assert!(interp.store().unwrap().is_none(v));
    interp.release(v).unwrap();
}

#[test]
fn test_run_balances_reference_counts() {
    let mut interp = ready();
    let baseline = interp.store().unwrap().live_count();

    let v = interp.run("1 + 2").unwrap();
    assert_eq!(interp.store().unwrap().as_int(v), Some(3));
    interp.release(v).unwrap();

    assert_eq!(interp.store().unwrap().live_count(), baseline);
}

#[test]
fn test_failed_run_balances_reference_counts() {
    let mut interp = ready();
    let baseline = interp.store().unwrap().live_count();

    let _ = interp.run("[1, 2, \"three\"] + 4").unwrap_err();
    interp.clear_exception().unwrap();

    assert_eq!(interp.store().unwrap().live_count(), baseline);
}

#[test]
fn test_bindings_persist_across_runs() {
    let mut interp = ready();
    let v = interp.run("let total = 10;").unwrap();
    interp.release(v).unwrap();
    let v = interp.run("total = total * 2;").unwrap();
    interp.release(v).unwrap();

    let total = interp.run("total").unwrap();
    assert_eq!(interp.store().unwrap().as_int(total), Some(20));
    interp.release(total).unwrap();
}

#[test]
fn test_compile_then_execute() {
    let mut interp = ready();
    let unit = interp.compile("let n = 2; n * 21").unwrap();
    assert!(!unit.is_empty());

    let first = interp.execute(&unit).unwrap();
    let second = interp.execute(&unit).unwrap();
    assert_eq!(interp.store().unwrap().as_int(first), Some(42));
    assert_eq!(interp.store().unwrap().as_int(second), Some(42));
    interp.release(first).unwrap();
    interp.release(second).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_division_by_zero_leaves_value_error_active() {
    let mut interp = ready();
    let info = uncaught(interp.run("1/0").unwrap_err());
    assert_eq!(info.category, "ValueError");

    assert_eq!(interp.state(), LifecycleState::Running);
    assert_eq!(interp.active_exception().unwrap(), info);
    interp.clear_exception().unwrap();
    assert_eq!(interp.state(), LifecycleState::Ready);
}

#[test]
fn test_syntax_error_has_location() {
    let mut interp = ready();
    let info = uncaught(interp.compile("syntax !! error").unwrap_err());

    assert_eq!(info.category, "SyntaxError");
    let location = info.location.unwrap();
    assert_eq!(location.file, "<string>");
    assert!(location.line >= 1);
    assert!(location.column >= 1);
    interp.clear_exception().unwrap();
}

#[test]
fn test_syntax_error_line_number() {
    let mut interp = ready();
    let info = uncaught(interp.run("let a = 1;\nlet b = ;\n").unwrap_err());
    assert_eq!(info.location.unwrap().line, 2);
    interp.clear_exception().unwrap();
}

#[test]
fn test_pending_exception_blocks_execution() {
    let mut interp = ready();
    let _ = interp.run("1/0").unwrap_err();

    let err = interp.run("1").unwrap_err();
    assert!(matches!(err, AmatakError::Lifecycle(_)));
    let err = interp.compile("1").unwrap_err();
    assert!(matches!(err, AmatakError::Lifecycle(_)));
    // the original exception is still the active one
    assert_eq!(interp.active_exception().unwrap().category, "ValueError");

    let exc = interp.take_exception().unwrap().unwrap();
    interp.release(exc).unwrap();
    let v = interp.run("1").unwrap();
    interp.release(v).unwrap();
}

#[test]
fn test_object_limit_raises_runtime_error() {
    let config = InterpreterConfig::default().with_max_objects(8);
    let mut interp = Interpreter::new(config);
    interp.initialize().unwrap();

    let info = uncaught(interp.run("[1, 2, 3, 4, 5, 6]").unwrap_err());
    assert_eq!(info.category, "RuntimeError");
    interp.clear_exception().unwrap();
    assert_eq!(interp.store().unwrap().live_count(), 4);
}

#[test]
fn test_expression_depth_limit() {
    let config = InterpreterConfig::default().with_max_eval_depth(4);
    let mut interp = Interpreter::new(config);
    interp.initialize().unwrap();

    let info = uncaught(interp.run("((((((1))))))").unwrap_err());
    assert_eq!(info.category, "RuntimeError");
    assert!(info.message.contains("depth"));
    interp.clear_exception().unwrap();

    let v = interp.run("(1)").unwrap();
    interp.release(v).unwrap();
}

#[test]
fn test_deeply_nested_source_is_syntax_error() {
    let mut interp = ready();
    let source = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));

    let info = uncaught(interp.run(&source).unwrap_err());
    assert_eq!(info.category, "SyntaxError");
    let location = info.location.unwrap();
    assert_eq!(location.file, STRING_SOURCE);
    assert_eq!(location.line, 1);
    interp.clear_exception().unwrap();

    let v = interp.run("[[[1]]]").unwrap();
    interp.release(v).unwrap();
}

#[test]
fn test_nesting_limit_from_config() {
    let config = InterpreterConfig::default().with_max_nesting_depth(3);
    let mut interp = Interpreter::new(config);
    interp.initialize().unwrap();

    let v = interp.run("[[[1]]]").unwrap();
    interp.release(v).unwrap();
    let info = uncaught(interp.run("[[[[1]]]]").unwrap_err());
    assert_eq!(info.category, "SyntaxError");
    interp.clear_exception().unwrap();
}

#[test]
fn test_huge_string_repetition_is_allocation_error() {
    let mut interp = ready();
    let info = uncaught(interp.run("\"ab\" * 9223372036854775807").unwrap_err());
    assert_eq!(info.category, "RuntimeError");
    interp.clear_exception().unwrap();

    let v = interp.run("\"ab\" * 3").unwrap();
    assert_eq!(interp.to_host(v).unwrap(), HostValue::Str("ababab".to_string()));
    interp.release(v).unwrap();
    let report = interp.finalize().unwrap();
    assert_eq!(report.leaked_objects, 0);
}

#[test]
fn test_huge_list_repetition_is_allocation_error() {
    let config = InterpreterConfig::default().with_max_objects(100);
    let mut interp = Interpreter::new(config);
    interp.initialize().unwrap();

    let info = uncaught(interp.run("[1] * 9223372036854775807").unwrap_err());
    assert_eq!(info.category, "RuntimeError");
    interp.clear_exception().unwrap();

    let report = interp.finalize().unwrap();
    assert_eq!(report.leaked_objects, 0);
}

#[test]
fn test_repetition_respects_memory_limit() {
    let config = InterpreterConfig::default().with_memory_limit(4096);
    let mut interp = Interpreter::new(config);
    interp.initialize().unwrap();

    for source in ["\"abcd\" * 100000", "[None] * 100000"] {
        let info = uncaught(interp.run(source).unwrap_err());
        assert_eq!(info.category, "RuntimeError", "{}", source);
        assert!(info.message.contains("memory limit"), "{}", info.message);
        interp.clear_exception().unwrap();
    }
    let v = interp.run("\"\" * 9223372036854775807").unwrap();
    assert_eq!(interp.to_host(v).unwrap(), HostValue::Str(String::new()));
    interp.release(v).unwrap();
}

#[test]
fn test_repeated_runs_keep_held_unit_locations() {
    let mut interp = ready();
    let held = interp.compile("let a = 1;\nloop { }").unwrap();

    for i in 0..2000 {
        let v = interp.run(&format!("let n = {};", i)).unwrap();
        interp.release(v).unwrap();
    }
    assert_eq!(live_compiled_units(), 1);

    let info = uncaught(interp.execute(&held).unwrap_err());
    assert!(info.message.contains("line 2"), "{}", info.message);
    interp.clear_exception().unwrap();

    drop(held);
    assert_eq!(live_compiled_units(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Host values
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_to_host_copies_out() {
    let mut interp = ready();
    let v = interp.run("let o = object(); o.name = \"amatak\"; [1, 2.5, o]").unwrap();

    let host = interp.to_host(v).unwrap();
    let mut attrs = indexmap::IndexMap::new();
    attrs.insert("name".to_string(), HostValue::from("amatak"));
    assert_eq!(
        host,
        HostValue::List(vec![
            HostValue::Int(1),
            HostValue::Float(2.5),
            HostValue::Object {
                type_name: "object".to_string(),
                attrs,
            },
        ])
    );
    interp.release(v).unwrap();
}

#[test]
fn test_from_host_binds_into_main() {
    let mut interp = ready();
    let data = interp
        .from_host(&HostValue::List(vec![HostValue::Int(1), HostValue::Int(2), HostValue::Int(3)]))
        .unwrap();
    let main = main_module(&interp);
    interp.store_mut().unwrap().set_attr(main, "data", data).unwrap();
    interp.release(data).unwrap();

    let n = interp.run("len(data) + data[2]").unwrap();
    assert_eq!(interp.store().unwrap().as_int(n), Some(6));
    interp.release(n).unwrap();
}

#[test]
fn test_values_move_between_contexts_by_copy() {
    let mut a = ready();
    let mut b = ready();

    let v = a.run("[\"shared\", 1]").unwrap();
    let host = a.to_host(v).unwrap();
    a.release(v).unwrap();

    let w = b.from_host(&host).unwrap();
    assert_eq!(b.store().unwrap().repr(w).unwrap(), "[\"shared\", 1]");
    b.release(w).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Threads
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_interrupt_stops_running_loop() {
    let mut interp = ready();
    let handle = interp.interrupt_handle();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let info = uncaught(interp.run("let i = 0; while true { i += 1; }").unwrap_err());
    stopper.join().unwrap();

    assert_eq!(info.category, "RuntimeError");
    assert!(info.message.contains("interrupted"));
    interp.clear_exception().unwrap();

    // the request was consumed
    let v = interp.run("i > 0").unwrap();
    assert_eq!(interp.store().unwrap().as_bool(v), Some(true));
    interp.release(v).unwrap();
}

#[test]
fn test_independent_contexts_on_separate_threads() {
    let workers: Vec<_> = (0..4)
        .map(|n: i64| {
            thread::spawn(move || {
                let mut interp = Interpreter::default();
                interp.initialize().unwrap();
                let source = format!("let acc = 0; let i = 0; while i < 100 {{ acc += {}; i += 1; }} acc", n);
                let v = interp.run(&source).unwrap();
                let result = interp.store().unwrap().as_int(v);
                interp.release(v).unwrap();
                let report = interp.finalize().unwrap();
                assert_eq!(report.leaked_objects, 0);
                result
            })
        })
        .collect();

    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert_eq!(results, vec![Some(0), Some(100), Some(200), Some(300)]);
}

#[test]
fn test_interpreter_moves_between_threads() {
    let mut interp = ready();
    let v = interp.run("let x = 7;").unwrap();
    interp.release(v).unwrap();

    let interp = thread::spawn(move || {
        let mut interp = interp;
        let v = interp.run("x * 6").unwrap();
        assert_eq!(interp.store().unwrap().as_int(v), Some(42));
        interp.release(v).unwrap();
        interp
    })
    .join()
    .unwrap();

    assert_eq!(interp.state(), LifecycleState::Ready);
}

// ═══════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_config_from_json() {
    let config = InterpreterConfig::from_json(
        r#"{ "search_path": ["/opt/amatak"], "max_objects": 1000 }"#,
    )
    .unwrap();
    assert_eq!(config.search_path, vec![std::path::PathBuf::from("/opt/amatak")]);
    assert_eq!(config.max_objects, Some(1000));
    assert_eq!(config.max_eval_depth, 256);
}

#[test]
fn test_config_from_json_rejects_bad_input() {
    let err = InterpreterConfig::from_json("{ \"max_objects\": \"many\" }").unwrap_err();
    assert_eq!(err.category_name(), "ValueError");
}
