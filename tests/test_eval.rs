//! Synchronous evaluation semantics: arithmetic, scoping, control flow,
//! destructuring, built-in members and error propagation.

use uiscript::parser::parse_statements;
use uiscript::runner::{
    process_statement_queue, EvalContext, LogicalThread, RuntimeError, Value,
};

fn run(source: &str) -> Value {
    run_with(&EvalContext::new(), source).expect("script should run cleanly")
}

fn run_err(source: &str) -> RuntimeError {
    run_with(&EvalContext::new(), source).expect_err("script should fail")
}

fn run_with(ctx: &EvalContext, source: &str) -> Result<Value, RuntimeError> {
    let stmts = parse_statements(source).expect("source should parse");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, ctx, &mut thread)
}

#[test]
fn arithmetic_keeps_integers_integral() {
    assert_eq!(run("return 2 + 3 * 4;"), Value::Int(14));
    assert_eq!(run("return 6 / 3;"), Value::Int(2));
    assert_eq!(run("return 7 / 2;"), Value::Float(3.5));
    assert_eq!(run("return 2 + 0.5;"), Value::Float(2.5));
    assert_eq!(run("return 10 % 3;"), Value::Int(1));
    assert_eq!(run("return -(3);"), Value::Int(-3));
}

#[test]
fn string_concatenation_and_templates() {
    assert_eq!(run("return \"a\" + 1;"), Value::String("a1".to_string()));
    assert_eq!(
        run("let x = 5; return `n=${x}`;"),
        Value::String("n=5".to_string())
    );
    assert_eq!(
        run("let a = [1, 2]; return `got ${a}`;"),
        Value::String("got 1,2".to_string())
    );
}

#[test]
fn strict_and_loose_equality() {
    assert_eq!(run("return 1 == \"1\";"), Value::Bool(true));
    assert_eq!(run("return 1 === \"1\";"), Value::Bool(false));
    assert_eq!(run("return 1 === 1.0;"), Value::Bool(true));
    assert_eq!(run("return null == undefined;"), Value::Bool(true));
    assert_eq!(run("return null === undefined;"), Value::Bool(false));
}

#[test]
fn logical_operators_return_operand_values() {
    assert_eq!(run("return 0 || \"x\";"), Value::String("x".to_string()));
    assert_eq!(run("return 1 && 2;"), Value::Int(2));
    assert_eq!(run("return false ? 1 : 2;"), Value::Int(2));
}

fn switch_program(x: i64) -> String {
    format!(
        "let x = {}; let y = 0; \
         switch (x) {{ case 0: y++; case 1: y++; case 2: y++; default: y++; }} \
         return y;",
        x
    )
}

#[test]
fn switch_falls_through_from_the_matched_case() {
    assert_eq!(run(&switch_program(0)), Value::Int(4));
    assert_eq!(run(&switch_program(1)), Value::Int(3));
    assert_eq!(run(&switch_program(3)), Value::Int(1));
}

#[test]
fn break_stops_switch_fallthrough() {
    let result = run(
        "let y = 0; switch (1) { case 0: y++; case 1: y++; break; default: y++; } return y;",
    );
    assert_eq!(result, Value::Int(1));
}

#[test]
fn switch_cases_share_one_declaration_scope() {
    for source in [
        "switch (0) { case 0: let a = 1; default: let a = 2; }",
        "switch (0) { case 0: let a = 1; default: const a = 2; }",
        "switch (0) { case 0: const a = 1; default: const a = 2; }",
    ] {
        assert!(matches!(
            run_with(&EvalContext::new(), source),
            Err(RuntimeError::AlreadyDeclared { .. })
        ));
    }
}

#[test]
fn nested_array_destructuring_with_holes() {
    let result = run("let [a, , [, b, c]] = [3, -11, [-1, 6, 8]]; return `${a} ${b} ${c}`;");
    assert_eq!(result, Value::String("3 6 8".to_string()));
}

#[test]
fn object_destructuring_with_rename_and_nesting() {
    let result = run("let {a, q: [b, , c]} = {a: 1, q: [2, 3, 4]}; return `${a}${b}${c}`;");
    assert_eq!(result, Value::String("124".to_string()));
}

#[test]
fn missing_destructured_values_become_undefined() {
    let result = run("let f = ([a, b]) => `${a}|${b}`; return f([3]);");
    assert_eq!(result, Value::String("3|undefined".to_string()));
}

#[test]
fn defaults_and_rest_in_parameters() {
    assert_eq!(run("let f = (a, b = 10) => a + b; return f(1);"), Value::Int(11));
    assert_eq!(
        run("let f = (first, ...rest) => rest.length; return f(1, 2, 3);"),
        Value::Int(2)
    );
}

#[test]
fn closures_keep_their_captured_scope_alive() {
    let result = run(
        "let make = () => { let n = 0; return () => { n++; return n; }; };\n\
         let c = make();\n\
         c(); c();\n\
         return c();",
    );
    assert_eq!(result, Value::Int(3));
    // Each factory call gets its own captured slot.
    let result = run(
        "let make = () => { let n = 0; return () => { n++; return n; }; };\n\
         let a = make(); let b = make();\n\
         a(); a();\n\
         return b();",
    );
    assert_eq!(result, Value::Int(1));
}

#[test]
fn function_declarations_support_recursion() {
    let result = run(
        "function fib(n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }\n\
         return fib(10);",
    );
    assert_eq!(result, Value::Int(55));
}

#[test]
fn try_catch_finally_order() {
    let result = run(
        "let log = \"\";\n\
         try { throw \"boom\"; log = \"unreached\"; }\n\
         catch (e) { log = log + \"c:\" + e; }\n\
         finally { log = log + \"|f\"; }\n\
         return log;",
    );
    assert_eq!(result, Value::String("c:boom|f".to_string()));
}

#[test]
fn finally_runs_without_a_catch_and_the_throw_survives() {
    let ctx = EvalContext::new();
    ctx.local_context
        .borrow_mut()
        .insert("log".to_string(), Value::String(String::new()));
    let err = run_with(&ctx, "try { throw 42; } finally { log = \"ran\"; }")
        .expect_err("throw is rethrown after the finalizer");
    assert!(matches!(err, RuntimeError::Thrown(Value::Int(42))));
    assert_eq!(
        ctx.local_context.borrow()["log"],
        Value::String("ran".to_string())
    );
}

#[test]
fn catch_sees_engine_errors_as_values() {
    let result = run("try { missing(); } catch (e) { return typeof e; }");
    assert_eq!(result, Value::String("string".to_string()));
}

#[test]
fn uncaught_throw_escapes_the_driver() {
    assert!(matches!(run_err("throw 42;"), RuntimeError::Thrown(Value::Int(42))));
}

#[test]
fn loops_honor_break_and_continue() {
    let result = run(
        "let s = 0;\n\
         for (let i = 0; i < 10; i++) {\n\
             if (i % 2 === 0) { continue; }\n\
             if (i > 7) { break; }\n\
             s += i;\n\
         }\n\
         return s;",
    );
    assert_eq!(result, Value::Int(16));

    let result = run("let n = 0; while (true) { n++; if (n === 5) { break; } } return n;");
    assert_eq!(result, Value::Int(5));

    let result = run("let n = 10; do { n++; } while (false); return n;");
    assert_eq!(result, Value::Int(11));
}

#[test]
fn break_outside_a_loop_is_an_error() {
    assert!(matches!(
        run_err("break;"),
        RuntimeError::IllegalLoopControl { keyword: "break" }
    ));
    assert!(matches!(
        run_err("continue;"),
        RuntimeError::IllegalLoopControl { keyword: "continue" }
    ));
}

#[test]
fn continue_needs_a_loop_even_inside_a_switch() {
    assert!(matches!(
        run_err("switch (1) { case 1: continue; }"),
        RuntimeError::IllegalLoopControl { keyword: "continue" }
    ));
    // Inside a loop the switch stays transparent: continue skips the
    // rest of the iteration but does not end the loop.
    assert_eq!(
        run(
            "let s = 0; \
             for (let i = 0; i < 4; i++) { \
               switch (i % 2) { case 0: continue; } \
               s += i; \
             } \
             return s;"
        ),
        Value::Int(4)
    );
}

#[test]
fn for_of_walks_items_and_for_in_walks_keys() {
    assert_eq!(run("let s = 0; for (let v of [1, 2, 3]) { s += v; } return s;"), Value::Int(6));
    assert_eq!(
        run("let s = \"\"; for (let c of \"abc\") { s = c + s; } return s;"),
        Value::String("cba".to_string())
    );
    // Object keys enumerate in sorted order.
    assert_eq!(
        run("let ks = \"\"; for (let k in {b: 1, a: 2, c: 3}) { ks += k; } return ks;"),
        Value::String("abc".to_string())
    );
    // Array keys are integer indices.
    assert_eq!(
        run("let total = 0; for (let i in [10, 20, 30]) { total += i; } return total;"),
        Value::Int(3)
    );
}

#[test]
fn array_members_mutate_the_shared_array() {
    let result = run(
        "let a = [1, 2, 3];\n\
         a.push(4);\n\
         let b = a;\n\
         b.push(5);\n\
         return a.length;",
    );
    assert_eq!(result, Value::Int(5));
    assert_eq!(run("let a = [1, 2]; return a.pop() + a.length;"), Value::Int(3));
    assert_eq!(run("return [5, 6, 7].indexOf(6);"), Value::Int(1));
    assert_eq!(run("return [5, 6].includes(9);"), Value::Bool(false));
    assert_eq!(
        run("return [1, 2, 3, 4].slice(1, 3).join(\"-\");"),
        Value::String("2-3".to_string())
    );
}

#[test]
fn map_and_filter_call_back_into_script_functions() {
    let result = run(
        "let a = [1, 2, 3];\n\
         a.push(4);\n\
         let b = a.map((x) => x * 2).filter((x) => x > 2);\n\
         return b.join(\"-\");",
    );
    assert_eq!(result, Value::String("4-6-8".to_string()));
    // The callback also receives the element index.
    assert_eq!(
        run("return [\"a\", \"b\"].map((v, i) => `${i}${v}`).join(\"\");"),
        Value::String("0a1b".to_string())
    );
}

#[test]
fn string_members() {
    assert_eq!(run("return \" Hi \".trim().toLowerCase();"), Value::String("hi".to_string()));
    assert_eq!(run("return \"a,b,c\".split(\",\").length;"), Value::Int(3));
    assert_eq!(run("return \"hello\".substring(1, 3);"), Value::String("el".to_string()));
    assert_eq!(run("return \"hello\".includes(\"ell\");"), Value::Bool(true));
    assert_eq!(run("return \"abc\".length;"), Value::Int(3));
}

#[test]
fn member_writes_reach_nested_structures() {
    assert_eq!(run("let o = {a: {b: 1}}; o.a.b = 5; return o.a.b;"), Value::Int(5));
    assert_eq!(run("let o = {n: 1}; o.n += 4; return o.n;"), Value::Int(5));
    // Writing past the end grows the array; reading past it is
    // undefined.
    assert_eq!(run("let a = []; a[2] = 9; return a.length;"), Value::Int(3));
    assert_eq!(run("let a = [1]; return typeof a[5];"), Value::String("undefined".to_string()));
}

#[test]
fn spread_in_array_literals_and_calls() {
    assert_eq!(run("let a = [1, 2]; let b = [...a, 3]; return b.length;"), Value::Int(3));
    assert_eq!(
        run("let f = (x, y, z) => x + y + z; return f(...[1, 2, 3]);"),
        Value::Int(6)
    );
}

#[test]
fn const_cannot_be_reassigned() {
    assert!(matches!(
        run_err("const c = 1; c = 2;"),
        RuntimeError::ConstAssignment { .. }
    ));
}

#[test]
fn reading_an_unknown_name_is_an_error_but_typeof_is_not() {
    assert!(matches!(
        run_err("return zzz;"),
        RuntimeError::UnknownIdentifier { .. }
    ));
    assert_eq!(run("return typeof zzz;"), Value::String("undefined".to_string()));
}

#[test]
fn block_scoping_shadows_and_expires() {
    assert_eq!(
        run("let x = 1; { let x = 2; } return x;"),
        Value::Int(1)
    );
    assert!(matches!(
        run_err("{ let inner = 1; } return inner;"),
        RuntimeError::UnknownIdentifier { .. }
    ));
}

#[test]
fn host_bindings_are_read_and_written_through_the_context() {
    let ctx = EvalContext::new();
    ctx.local_context
        .borrow_mut()
        .insert("x".to_string(), Value::Int(10));
    ctx.app_context
        .borrow_mut()
        .insert("appName".to_string(), Value::String("demo".to_string()));

    let result = run_with(&ctx, "x = x + 1; return `${appName}:${x}`;").expect("runs");
    assert_eq!(result, Value::String("demo:11".to_string()));
    assert_eq!(ctx.local_context.borrow()["x"], Value::Int(11));

    // Assigning an unknown name creates it in the local context.
    run_with(&ctx, "brandNew = 5;").expect("runs");
    assert_eq!(ctx.local_context.borrow()["brandNew"], Value::Int(5));

    // A local declaration shadows the host binding without touching it.
    run_with(&ctx, "let x = 99;").expect("runs");
    assert_eq!(ctx.local_context.borrow()["x"], Value::Int(11));
}

#[test]
fn app_context_updates_stay_in_the_app_context() {
    let ctx = EvalContext::new();
    ctx.app_context
        .borrow_mut()
        .insert("counter".to_string(), Value::Int(0));
    run_with(&ctx, "counter = counter + 2;").expect("runs");
    assert_eq!(ctx.app_context.borrow()["counter"], Value::Int(2));
    assert!(!ctx.local_context.borrow().contains_key("counter"));
}

#[test]
fn top_level_declarations_survive_across_driver_calls() {
    let ctx = EvalContext::new();
    let mut thread = LogicalThread::new();
    let first = parse_statements("let tally = 1;").expect("parses");
    process_statement_queue(&first, &ctx, &mut thread).expect("runs");
    let second = parse_statements("tally += 2; return tally;").expect("parses");
    let result = process_statement_queue(&second, &ctx, &mut thread).expect("runs");
    assert_eq!(result, Value::Int(3));
    // The thread-scoped binding never leaked into the host contexts.
    assert!(!ctx.local_context.borrow().contains_key("tally"));
}

#[test]
fn queue_without_return_yields_undefined() {
    assert_eq!(run("let x = 1; x + 1;"), Value::Undefined);
    assert_eq!(run("return;"), Value::Undefined);
}

#[test]
fn return_stops_the_queue() {
    let ctx = EvalContext::new();
    ctx.local_context
        .borrow_mut()
        .insert("mark".to_string(), Value::Int(0));
    let result = run_with(&ctx, "return 1; mark = 99;").expect("runs");
    assert_eq!(result, Value::Int(1));
    assert_eq!(ctx.local_context.borrow()["mark"], Value::Int(0));
}

#[test]
fn typeof_reports_value_kinds() {
    assert_eq!(run("return typeof 1;"), Value::String("number".to_string()));
    assert_eq!(run("return typeof \"s\";"), Value::String("string".to_string()));
    assert_eq!(run("return typeof true;"), Value::String("boolean".to_string()));
    assert_eq!(run("return typeof {};"), Value::String("object".to_string()));
    assert_eq!(run("return typeof ((x) => x);"), Value::String("function".to_string()));
}

#[test]
fn bitwise_and_shift_operate_on_32_bit_integers() {
    assert_eq!(run("return 6 & 3;"), Value::Int(2));
    assert_eq!(run("return 6 | 3;"), Value::Int(7));
    assert_eq!(run("return 6 ^ 3;"), Value::Int(5));
    assert_eq!(run("return 1 << 4;"), Value::Int(16));
    assert_eq!(run("return -8 >> 1;"), Value::Int(-4));
    assert_eq!(run("return -1 >>> 28;"), Value::Int(15));
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    assert!(matches!(
        run_err("let x = 3; x();"),
        RuntimeError::NotCallable { .. }
    ));
}
