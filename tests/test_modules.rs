//! Module linking and code-behind collection against in-memory module
//! sources.

use std::collections::HashMap;
use std::rc::Rc;

use uiscript::module::collect::{collect_code_behind, CollectError};
use uiscript::module::{ModuleError, ModuleLinker};
use uiscript::parser::{parse_statements, print_stmts};
use uiscript::runner::{eval_expression, EvalContext, LogicalThread, Value};

fn resolver_over(
    sources: HashMap<&'static str, &'static str>,
) -> impl Fn(&str, &str) -> Option<String> {
    move |_from, name| sources.get(name).map(|s| s.to_string())
}

#[test]
fn links_imports_to_exported_functions() {
    let resolver = resolver_over(HashMap::from([(
        "lib",
        "export function helper() { return 1; } function hidden() { return 2; }",
    )]));
    let mut linker = ModuleLinker::new();
    let main = linker
        .parse_script_module(
            "main",
            "import { helper } from \"lib\";\nfunction use() { return helper(); }",
            &resolver,
            true,
        )
        .expect("clean link");

    let main = main.borrow();
    assert!(main.imports.contains_key("helper"));
    assert_eq!(main.imported_modules.len(), 1);
    let lib = main.imported_modules[0].borrow();
    assert_eq!(lib.exports.len(), 1);
    assert!(lib.exports.contains_key("helper"));
    // Non-exported functions are linked but not exported.
    assert!(lib.functions.contains_key("hidden"));
    assert!(!lib.exports.contains_key("hidden"));
    // Parent back-reference points at the importer.
    let parent = lib.parent.as_ref().and_then(|w| w.upgrade());
    assert!(parent.is_some());
}

#[test]
fn diamond_imports_share_one_linked_module() {
    let resolver = resolver_over(HashMap::from([
        ("b", "import { base } from \"d\"; export function left() { return base(); }"),
        ("c", "import { base } from \"d\"; export function right() { return base(); }"),
        ("d", "export function base() { return 7; }"),
    ]));
    let mut linker = ModuleLinker::new();
    let root = linker
        .parse_script_module(
            "root",
            "import { left } from \"b\"; import { right } from \"c\";",
            &resolver,
            true,
        )
        .expect("clean link");

    let root = root.borrow();
    let b = root.imported_modules[0].borrow();
    let c = root.imported_modules[1].borrow();
    assert!(Rc::ptr_eq(&b.imported_modules[0], &c.imported_modules[0]));
}

#[test]
fn circular_imports_resolve_both_directions() {
    let resolver = resolver_over(HashMap::from([
        ("a", "import { pong } from \"b\"; export function ping() { return pong(); }"),
        ("b", "import { ping } from \"a\"; export function pong() { return 0; }"),
    ]));
    let mut linker = ModuleLinker::new();
    let a_src = "import { pong } from \"b\"; export function ping() { return pong(); }";
    let a = linker
        .parse_script_module("a", a_src, &resolver, true)
        .expect("cycles are legal");
    let a = a.borrow();
    assert!(a.imports.contains_key("pong"));
    let b = a.imported_modules[0].borrow();
    assert!(b.imports.contains_key("ping"));
}

#[test]
fn relinking_a_module_reuses_the_memo() {
    let resolver = resolver_over(HashMap::new());
    let mut linker = ModuleLinker::new();
    let src = "export function one() { return 1; }";
    let first = linker
        .parse_script_module("m", src, &resolver, true)
        .expect("clean link");
    let second = linker
        .parse_script_module("m", src, &resolver, true)
        .expect("memo hit");
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn restrictive_mode_rejects_block_scoped_and_loose_statements() {
    let resolver = resolver_over(HashMap::new());
    let mut linker = ModuleLinker::new();
    let errors = linker
        .parse_script_module("m", "let x = 1;\ncount = 2;\nvar ok = 3;", &resolver, true)
        .expect_err("top-level let and expression statements are illegal");

    let module_errors = &errors.errors["m"];
    assert_eq!(module_errors.len(), 2);
    assert!(matches!(
        module_errors[0],
        ModuleError::InnerScopeStatement { line: 1, .. }
    ));
    assert!(matches!(
        module_errors[1],
        ModuleError::NotModuleStatement { line: 2, .. }
    ));
}

#[test]
fn missing_module_and_missing_symbol_are_reported() {
    let resolver = resolver_over(HashMap::from([(
        "lib",
        "export function helper() { return 1; }",
    )]));
    let mut linker = ModuleLinker::new();
    let errors = linker
        .parse_script_module(
            "main",
            "import { helper } from \"nope\"; import { absent } from \"lib\";",
            &resolver,
            true,
        )
        .expect_err("both imports are broken");

    let module_errors = &errors.errors["main"];
    assert!(module_errors.iter().any(|e| matches!(
        e,
        ModuleError::UnresolvedModule { name, .. } if name == "nope"
    )));
    assert!(module_errors.iter().any(|e| matches!(
        e,
        ModuleError::UnresolvedImport { symbol, .. } if symbol == "absent"
    )));
}

#[test]
fn collector_flattens_vars_and_the_whole_function_graph() {
    let resolver = resolver_over(HashMap::from([(
        "lib",
        "export function helper() { return 1; } function hidden() { return 2; }",
    )]));
    let collected = collect_code_behind(
        "root",
        "var count = 0;\nvar title = \"hi\";\nimport { helper } from \"lib\";\nfunction inc() { return count; }",
        &resolver,
    )
    .expect("clean collection");

    assert_eq!(collected.vars.len(), 2);
    assert_eq!(collected.vars["count"].source, "0");
    assert_eq!(collected.vars["title"].source, "\"hi\"");
    // Every function in the graph, exported or not, lands in one
    // namespace.
    assert!(collected.functions.contains_key("inc"));
    assert!(collected.functions.contains_key("helper"));
    assert!(collected.functions.contains_key("hidden"));
    assert!(collected.module_errors.is_empty());
    // Functions are rebuilt as arrow sources.
    assert!(collected.functions["inc"].source.starts_with('('));
}

#[test]
fn collector_terminates_on_circular_imports() {
    let resolver = resolver_over(HashMap::from([
        ("a", "import { pong } from \"b\"; export function ping() { return pong(); }"),
        ("b", "import { ping } from \"a\"; export function pong() { return 0; }"),
    ]));
    let collected = collect_code_behind(
        "root",
        "var n = 1;\nimport { ping } from \"a\";\nfunction go() { return ping(); }",
        &resolver,
    )
    .expect("cycles are legal");

    // Both halves of the cycle are walked exactly once.
    assert!(collected.functions.contains_key("ping"));
    assert!(collected.functions.contains_key("pong"));
    assert!(collected.functions.contains_key("go"));
    assert_eq!(collected.functions.len(), 3);
    assert!(collected.module_errors.is_empty());
}

#[test]
fn collected_function_trees_are_callable() {
    let resolver = resolver_over(HashMap::new());
    let collected = collect_code_behind(
        "root",
        "var count = 0; function doubled() { return count * 2; }",
        &resolver,
    )
    .expect("clean collection");

    let ctx = EvalContext::new();
    ctx.local_context
        .borrow_mut()
        .insert("count".to_string(), Value::Int(21));
    let mut thread = LogicalThread::new();
    let func = eval_expression(&ctx, &mut thread, &collected.functions["doubled"].tree)
        .expect("arrow evaluates to a function value");
    ctx.local_context
        .borrow_mut()
        .insert("doubled".to_string(), func);

    let stmts = parse_statements("return doubled();").expect("call site parses");
    let result =
        uiscript::runner::process_statement_queue(&stmts, &ctx, &mut thread).expect("call runs");
    assert_eq!(result, Value::Int(42));
}

#[test]
fn collector_rebuilt_sources_reparse() {
    let resolver = resolver_over(HashMap::new());
    let collected = collect_code_behind(
        "root",
        "function fmt(x, y) { return `${x}:${y}`; }",
        &resolver,
    )
    .expect("clean collection");
    let source = &collected.functions["fmt"].source;
    let stmts = parse_statements(&format!("let f = {};", source)).expect("arrow source reparses");
    assert_eq!(print_stmts(&stmts), format!("let f = {};", source));
}

#[test]
fn duplicate_root_var_is_a_hard_error() {
    let resolver = resolver_over(HashMap::new());
    let err = collect_code_behind("root", "var a = 1; var a = 2;", &resolver)
        .expect_err("duplicate var");
    assert!(matches!(err, CollectError::DuplicateVar { name } if name == "a"));
}

#[test]
fn function_name_collision_across_modules_is_a_hard_error() {
    let resolver = resolver_over(HashMap::from([(
        "lib",
        "export function helper() { return 1; }",
    )]));
    let err = collect_code_behind(
        "root",
        "import { helper } from \"lib\"; function helper() { return 2; }",
        &resolver,
    )
    .expect_err("simple-name clash");
    assert!(matches!(err, CollectError::DuplicateFunction { name, .. } if name == "helper"));
}

#[test]
fn unparseable_root_module_aborts_collection() {
    let resolver = resolver_over(HashMap::new());
    let err = collect_code_behind("root", "var = ;", &resolver).expect_err("root is broken");
    match err {
        CollectError::RootModule(errors) => assert!(!errors.is_empty()),
        other => panic!("expected RootModule, got {:?}", other),
    }
}

#[test]
fn broken_import_still_collects_sibling_declarations() {
    let resolver = resolver_over(HashMap::from([
        ("good", "export function fine() { return 1; }"),
        ("bad", "export function broken() { let x = 1; return x; } let loose = 2;"),
    ]));
    let collected = collect_code_behind(
        "root",
        "var v = 0; import { fine } from \"good\"; import { broken } from \"bad\";",
        &resolver,
    )
    .expect("root itself is clean");

    assert!(collected.functions.contains_key("fine"));
    assert!(collected.module_errors.contains_key("bad"));
}
