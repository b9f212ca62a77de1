//! End-to-end parser checks on realistic programs: printing a parsed
//! tree and re-parsing the output must reach a fixed point, and broken
//! input must produce positioned diagnostics for every problem in the
//! file instead of stopping at the first one.

use uiscript::parser::{parse_statements, print_stmts};

const PROGRAM: &str = r#"
import { clamp } from "math";

function describe(point) {
    let [x, y = 0] = point;
    let tag = `at ${x}/${y}`;
    if (x > 100) {
        return tag + " (far)";
    }
    return tag;
}

export function walk(points) {
    let out = [];
    for (let i = 0; i < points.length; i++) {
        let p = points[i];
        switch (typeof p) {
        case "string":
            continue;
        default:
            out.push(describe(p));
        }
    }
    try {
        out.push(clamp(points.length, 0, 10));
    } catch (e) {
        throw `walk failed: ${e}`;
    } finally {
        out.push("done");
    }
    return out;
}

let totals = { count: 0, "last seen": undefined };
while (totals.count < 3) {
    totals.count += 1;
}
do {
    totals.count--;
} while (false);
for (let k in totals) {
    totals[k];
}
for (let v of [1, 2.5, 0x10]) {
    totals.count = v;
}
let pick = totals.count >= 1 ? "some" : "none";
let fold = (acc, n) => acc + n;
"#;

fn print_parsed(source: &str) -> String {
    let stmts = parse_statements(source).expect("program should parse");
    print_stmts(&stmts)
}

#[test]
fn printing_reaches_a_fixed_point() {
    let first = print_parsed(PROGRAM);
    let second = print_parsed(&first);
    assert_eq!(first, second);
}

#[test]
fn printed_output_keeps_every_top_level_statement() {
    let stmts = parse_statements(PROGRAM).expect("program should parse");
    let reparsed = parse_statements(&print_stmts(&stmts)).expect("printed output should parse");
    assert_eq!(stmts.len(), reparsed.len());
}

#[test]
fn reports_every_error_with_its_position() {
    // Three independent problems on three lines.
    let source = "let = 1;\nlet ok = 2;\n) ;\nlet also = +;\n";
    let errors = parse_statements(source).expect_err("source is broken");
    assert_eq!(errors.len(), 3);
    let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![1, 3, 4]);
    for error in &errors {
        assert!(error.code != 0);
        assert!(error.column >= 1);
    }
}

#[test]
fn recovers_and_parses_statements_after_an_error() {
    let source = "let = 1; let y = 3; y++;";
    let errors = parse_statements(source).expect_err("first statement is broken");
    assert_eq!(errors.len(), 1);
    // Statements after the bad one still parse on their own.
    assert!(parse_statements("let y = 3; y++;").is_ok());
}

#[test]
fn rejects_trailing_garbage_after_an_expression() {
    assert!(uiscript::parser::parse_expr("1 + 2").is_ok());
    assert!(uiscript::parser::parse_expr("1 + 2 2").is_err());
}
