//! Statement-lifecycle and update-hook behavior.

use std::cell::RefCell;
use std::rc::Rc;

use uiscript::parser::ast::Stmt;
use uiscript::parser::parse_statements;
use uiscript::runner::{
    process_statement_queue, process_statement_queue_async, EvalContext, Hooks, LogicalThread,
    UpdateHookKind, Value,
};

fn label(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::VarDecl { .. } => "decl",
        Stmt::While { .. } => "while",
        Stmt::Block { .. } => "block",
        Stmt::Expression { .. } => "expr",
        Stmt::Empty { .. } => "empty",
        Stmt::If { .. } => "if",
        Stmt::For { .. } => "for",
        _ => "other",
    }
}

fn tracing_context() -> (EvalContext, Rc<RefCell<Vec<&'static str>>>, Rc<RefCell<Vec<&'static str>>>) {
    let started = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = EvalContext::new();
    ctx.hooks = Hooks {
        on_statement_started: Some(Rc::new({
            let started = Rc::clone(&started);
            move |stmt: &Stmt| started.borrow_mut().push(label(stmt))
        })),
        on_statement_completed: Some(Rc::new({
            let completed = Rc::clone(&completed);
            move |stmt: &Stmt| completed.borrow_mut().push(label(stmt))
        })),
        on_will_update: None,
        on_did_update: None,
    };
    (ctx, started, completed)
}

type UpdateEvents = Rc<RefCell<Vec<(&'static str, String, String)>>>;

fn update_context() -> (EvalContext, UpdateEvents) {
    let events: UpdateEvents = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = EvalContext::new();
    ctx.hooks.on_will_update = Some(Rc::new({
        let events = Rc::clone(&events);
        move |kind: UpdateHookKind, name: &str| {
            events
                .borrow_mut()
                .push(("will", kind.as_str().to_string(), name.to_string()))
        }
    }));
    ctx.hooks.on_did_update = Some(Rc::new({
        let events = Rc::clone(&events);
        move |kind: UpdateHookKind, name: &str| {
            events
                .borrow_mut()
                .push(("did", kind.as_str().to_string(), name.to_string()))
        }
    }));
    (ctx, events)
}

fn pair(kind: &str, name: &str) -> Vec<(&'static str, String, String)> {
    vec![
        ("will", kind.to_string(), name.to_string()),
        ("did", kind.to_string(), name.to_string()),
    ]
}

const ONE_ROUND_LOOP: &str = "let x = 0; while (x < 1) { x++ };";

#[test]
fn loop_head_restarts_are_reported_per_round() {
    let (ctx, started, completed) = tracing_context();
    let stmts = parse_statements(ONE_ROUND_LOOP).expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");

    // One iteration means two condition rounds, so the loop statement
    // starts twice; the trailing `;` is its own empty statement.
    assert_eq!(
        *started.borrow(),
        vec!["decl", "while", "block", "expr", "while", "empty"]
    );
    assert_eq!(started.borrow().len(), completed.borrow().len());
}

#[test]
fn async_driver_reports_the_same_lifecycle_trace() {
    let (ctx, started, _completed) = tracing_context();
    let stmts = parse_statements(ONE_ROUND_LOOP).expect("parses");
    let mut thread = LogicalThread::new();
    futures::executor::block_on(process_statement_queue_async(&stmts, &ctx, &mut thread))
        .expect("runs");
    assert_eq!(
        *started.borrow(),
        vec!["decl", "while", "block", "expr", "while", "empty"]
    );
}

#[test]
fn three_round_loop_starts_four_times() {
    let (ctx, started, _completed) = tracing_context();
    let stmts = parse_statements("let x = 0; while (x < 3) { x++ }").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    let whiles = started.borrow().iter().filter(|l| **l == "while").count();
    assert_eq!(whiles, 4);
}

#[test]
fn member_assignment_reports_the_root_binding() {
    let (ctx, events) = update_context();
    ctx.local_context.borrow_mut().insert(
        "x".to_string(),
        Value::new_object(std::collections::HashMap::from([(
            "a".to_string(),
            Value::new_array(vec![]),
        )])),
    );
    let stmts = parse_statements("x.a[3] = 12;").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert_eq!(*events.borrow(), pair("assignment", "x"));
}

#[test]
fn script_scoped_bindings_never_fire_update_hooks() {
    let (ctx, events) = update_context();
    let stmts = parse_statements("let x = 0; x++; x = 5; x += 1;").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert!(events.borrow().is_empty());
}

#[test]
fn increment_of_a_host_binding_fires_pre_post() {
    let (ctx, events) = update_context();
    ctx.local_context
        .borrow_mut()
        .insert("x".to_string(), Value::Int(1));
    let stmts = parse_statements("x++;").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert_eq!(*events.borrow(), pair("pre-post", "x"));
    assert_eq!(ctx.local_context.borrow()["x"], Value::Int(2));
}

#[test]
fn will_update_fires_before_the_mutation_lands() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = EvalContext::new();
    ctx.local_context
        .borrow_mut()
        .insert("x".to_string(), Value::Int(1));
    let local = Rc::clone(&ctx.local_context);
    ctx.hooks.on_will_update = Some(Rc::new({
        let seen = Rc::clone(&seen);
        let local = Rc::clone(&local);
        move |_kind: UpdateHookKind, name: &str| {
            seen.borrow_mut().push(local.borrow()[name].clone())
        }
    }));
    ctx.hooks.on_did_update = Some(Rc::new({
        let seen = Rc::clone(&seen);
        move |_kind: UpdateHookKind, name: &str| {
            seen.borrow_mut().push(local.borrow()[name].clone())
        }
    }));

    let stmts = parse_statements("x++;").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert_eq!(*seen.borrow(), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn member_calls_on_host_bindings_fire_function_call() {
    let (ctx, events) = update_context();
    ctx.local_context
        .borrow_mut()
        .insert("items".to_string(), Value::new_array(vec![Value::Int(1)]));
    let stmts = parse_statements("items.push(2);").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert_eq!(*events.borrow(), pair("function-call", "items"));
}

#[test]
fn member_calls_on_script_bindings_stay_silent() {
    let (ctx, events) = update_context();
    let stmts = parse_statements("let items = [1]; items.push(2);").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert!(events.borrow().is_empty());
}

#[test]
fn creating_a_binding_by_assignment_fires_once() {
    let (ctx, events) = update_context();
    let stmts = parse_statements("brandNew = 5;").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    assert_eq!(*events.borrow(), pair("assignment", "brandNew"));
    assert_eq!(ctx.local_context.borrow()["brandNew"], Value::Int(5));
}

#[test]
fn repeated_member_assignments_each_report_the_root() {
    let (ctx, events) = update_context();
    let stmts = parse_statements("x = []; x[0] = 1; x[1] = 2;").expect("parses");
    let mut thread = LogicalThread::new();
    process_statement_queue(&stmts, &ctx, &mut thread).expect("runs");
    let mut expected = pair("assignment", "x");
    expected.extend(pair("assignment", "x"));
    expected.extend(pair("assignment", "x"));
    assert_eq!(*events.borrow(), expected);
}
