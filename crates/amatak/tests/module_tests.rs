//! Module import: caching, search path order, circular and failed imports

use amatak::*;
use pretty_assertions::assert_eq;

fn interpreter(loader: InMemoryLoader, search_path: &[&str]) -> Interpreter {
    let config = InterpreterConfig::default().with_search_path(search_path.iter().copied());
    let mut interp = Interpreter::new(config).with_loader(loader);
    interp.initialize().unwrap();
    interp
}

fn attr_str(interp: &mut Interpreter, module: ValueRef, name: &str) -> String {
    let store = interp.store_mut().unwrap();
    let v = store.get_attr(module, name).unwrap();
    let text = store.display_string(v).unwrap();
    store.release(v).unwrap();
    text
}

fn uncaught(err: AmatakError) -> ExceptionInfo {
    match err {
        AmatakError::Uncaught(info) => *info,
        other => panic!("expected an uncaught exception, got {:?}", other),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Loading and caching
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_import_executes_module_body() {
    let loader = InMemoryLoader::new().with_file("/lib/greet.amatak", "let word = \"hi\";");
    let mut interp = interpreter(loader, &["/lib"]);

    let module = interp.import_module("greet").unwrap();
    assert_eq!(attr_str(&mut interp, module, "word"), "hi");
    assert_eq!(interp.store().unwrap().repr(module).unwrap(), "<module 'greet'>");

    let entry = interp.modules().unwrap().get("greet").unwrap();
    assert_eq!(entry.state, ModuleState::Loaded);
    assert_eq!(entry.origin.as_deref(), Some(std::path::Path::new("/lib/greet.amatak")));

    interp.release(module).unwrap();
}

#[test]
fn test_repeated_import_returns_same_module() {
    let loader = InMemoryLoader::new().with_file("/lib/once.amatak", "let n = 1;");
    let mut interp = interpreter(loader, &["/lib"]);

    let first = interp.import_module("once").unwrap();
    let second = interp.import_module("once").unwrap();
    assert_eq!(first, second);
    // registry plus the two host references
    assert_eq!(interp.store().unwrap().refcount(first).unwrap(), 3);

    interp.release(first).unwrap();
    interp.release(second).unwrap();
}

#[test]
fn test_script_import_shares_cache_with_host() {
    let loader = InMemoryLoader::new().with_file("/lib/shared.amatak", "let n = 41;");
    let mut interp = interpreter(loader, &["/lib"]);

    let host = interp.import_module("shared").unwrap();
    let v = interp.run("let m = import(\"shared\"); m.n + 1").unwrap();
    assert_eq!(interp.store().unwrap().as_int(v), Some(42));
    interp.release(v).unwrap();

    let main = interp.run("m").unwrap();
    assert_eq!(main, host);
    interp.release(main).unwrap();
    interp.release(host).unwrap();
}

#[test]
fn test_dotted_name_maps_to_directories() {
    let loader = InMemoryLoader::new().with_file("/lib/pkg/util.amatak", "let kind = \"util\";");
    let mut interp = interpreter(loader, &["/lib"]);

    let module = interp.import_module("pkg.util").unwrap();
    assert_eq!(attr_str(&mut interp, module, "kind"), "util");
    assert!(interp.modules().unwrap().contains("pkg.util"));
    interp.release(module).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Search path
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_earlier_search_path_entry_wins() {
    let loader = InMemoryLoader::new()
        .with_file("/a/m.amatak", "let which = \"a\";")
        .with_file("/b/m.amatak", "let which = \"b\";");
    let mut interp = interpreter(loader, &["/a", "/b"]);

    let module = interp.import_module("m").unwrap();
    assert_eq!(attr_str(&mut interp, module, "which"), "a");
    interp.release(module).unwrap();
}

#[test]
fn test_later_entry_used_when_earlier_lacks_module() {
    let loader = InMemoryLoader::new().with_file("/b/only_b.amatak", "let which = \"b\";");
    let mut interp = interpreter(loader, &["/a", "/b"]);

    let module = interp.import_module("only_b").unwrap();
    assert_eq!(attr_str(&mut interp, module, "which"), "b");
    interp.release(module).unwrap();
}

#[test]
fn test_search_path_added_after_initialize() {
    let loader = InMemoryLoader::new().with_file("/extra/late.amatak", "let ok = true;");
    let mut interp = interpreter(loader, &["/lib"]);
    assert!(interp.import_module("late").is_err());
    interp.clear_exception().unwrap();

    interp.add_search_path("/extra").unwrap();
    let module = interp.import_module("late").unwrap();
    interp.release(module).unwrap();
}

#[test]
fn test_search_path_added_before_initialize() {
    let loader = InMemoryLoader::new().with_file("/early/m.amatak", "");
    let config = InterpreterConfig::default().with_search_path(Vec::<&str>::new());
    let mut interp = Interpreter::new(config).with_loader(loader);
    interp.add_search_path("/early").unwrap();
    interp.initialize().unwrap();

    assert_eq!(
        interp.modules().unwrap().search_path(),
        &[std::path::PathBuf::from("/early")]
    );
    let module = interp.import_module("m").unwrap();
    interp.release(module).unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Failures
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_module_is_import_error() {
    let mut interp = interpreter(InMemoryLoader::new(), &["/lib"]);
    let info = uncaught(interp.import_module("absent").unwrap_err());
    assert_eq!(info.category, "ImportError");
    assert!(info.message.contains("absent"));
    interp.clear_exception().unwrap();
}

#[test]
fn test_invalid_module_name_is_import_error() {
    let mut interp = interpreter(InMemoryLoader::new(), &["/lib"]);
    for name in ["", "a..b", "1st", "has-dash"] {
        let info = uncaught(interp.import_module(name).unwrap_err());
        assert_eq!(info.category, "ImportError", "name {:?}", name);
        interp.clear_exception().unwrap();
    }
}

#[test]
fn test_failed_module_is_not_cached() {
    let mut loader = InMemoryLoader::new();
    loader.insert("/lib/bad.amatak", "let x = 1; let y = x / 0;");
    let mut interp = interpreter(loader, &["/lib"]);

    let info = uncaught(interp.import_module("bad").unwrap_err());
    assert_eq!(info.category, "ValueError");
    assert!(!interp.modules().unwrap().contains("bad"));
    interp.clear_exception().unwrap();

    // the retry runs the body again and fails the same way
    let info = uncaught(interp.import_module("bad").unwrap_err());
    assert_eq!(info.category, "ValueError");
    interp.clear_exception().unwrap();

    let report = interp.finalize().unwrap();
    assert_eq!(report.leaked_objects, 0);
}

#[test]
fn test_syntax_error_in_module_reports_file() {
    let loader = InMemoryLoader::new().with_file("/lib/broken.amatak", "let = ;");
    let mut interp = interpreter(loader, &["/lib"]);

    let info = uncaught(interp.import_module("broken").unwrap_err());
    assert_eq!(info.category, "SyntaxError");
    let location = info.location.unwrap();
    assert_eq!(location.file, "/lib/broken.amatak");
    assert_eq!(location.line, 1);
    assert!(!interp.modules().unwrap().contains("broken"));
    interp.clear_exception().unwrap();
}

#[test]
fn test_import_depth_limit() {
    let loader = InMemoryLoader::new()
        .with_file("/lib/m0.amatak", "let next = import(\"m1\");")
        .with_file("/lib/m1.amatak", "let next = import(\"m2\");")
        .with_file("/lib/m2.amatak", "let end = true;");
    let config = InterpreterConfig::default()
        .with_search_path(["/lib"])
        .with_max_import_depth(2);
    let mut interp = Interpreter::new(config).with_loader(loader);
    interp.initialize().unwrap();

    let info = uncaught(interp.import_module("m0").unwrap_err());
    assert_eq!(info.category, "ImportError");
    assert!(interp.modules().unwrap().names().all(|name| name == MAIN_MODULE));
    interp.clear_exception().unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Circular imports
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_circular_import_sees_partial_module() {
    let loader = InMemoryLoader::new()
        .with_file(
            "/lib/a.amatak",
            "let x = 1; let b = import(\"b\"); let y = 2;",
        )
        .with_file("/lib/b.amatak", "let a = import(\"a\"); let seen = a.x;");
    let mut interp = interpreter(loader, &["/lib"]);

    let a = interp.import_module("a").unwrap();
    let store = interp.store_mut().unwrap();
    let b = store.get_attr(a, "b").unwrap();
    let seen = store.get_attr(b, "seen").unwrap();
    assert_eq!(store.as_int(seen), Some(1));

    let back = store.get_attr(b, "a").unwrap();
    assert_eq!(back, a);

    for v in [back, seen, b, a] {
        store.release(v).unwrap();
    }
    let report = interp.finalize().unwrap();
    assert_eq!(report.modules_released, 3);
    assert!(report.cyclic_objects >= 2);
    assert_eq!(report.leaked_objects, 0);
}

#[test]
fn test_circular_import_cannot_see_later_bindings() {
    let loader = InMemoryLoader::new()
        .with_file("/lib/a.amatak", "let b = import(\"b\"); let late = 1;")
        .with_file("/lib/b.amatak", "let a = import(\"a\"); let got = a.late;");
    let mut interp = interpreter(loader, &["/lib"]);

    let info = uncaught(interp.import_module("a").unwrap_err());
    assert_eq!(info.category, "ValueError");
    assert!(!interp.modules().unwrap().contains("a"));
    assert!(!interp.modules().unwrap().contains("b"));
    interp.clear_exception().unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// File system loader
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_file_system_loader() {
    let dir = std::env::temp_dir().join(format!("amatak-modules-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("disk.amatak"), "let answer = 42;").unwrap();

    let config = InterpreterConfig::default().with_search_path([&dir]);
    let mut interp = Interpreter::new(config);
    interp.initialize().unwrap();

    let module = interp.import_module("disk").unwrap();
    let store = interp.store_mut().unwrap();
    let answer = store.get_attr(module, "answer").unwrap();
    assert_eq!(store.as_int(answer), Some(42));
    store.release(answer).unwrap();
    store.release(module).unwrap();

    interp.finalize().unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
}
