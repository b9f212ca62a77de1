use super::ast::*;
use super::token::{Span, TokenKind};
use super::{parse_expr, parse_statements, print_stmts, Lexer};

fn parse(source: &str) -> Vec<Stmt> {
    parse_statements(source).expect("source should parse")
}

#[test]
fn lexes_numbers_and_strings() {
    let tokens = Lexer::new("42 0x2A 3.5 1e3 'hi' \"there\"")
        .tokenize()
        .unwrap();
    let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
    assert_eq!(kinds[0], &TokenKind::Integer(42));
    assert_eq!(kinds[1], &TokenKind::Integer(42));
    assert_eq!(kinds[2], &TokenKind::Float(3.5));
    assert_eq!(kinds[3], &TokenKind::Float(1000.0));
    assert_eq!(kinds[4], &TokenKind::String("hi".to_string()));
    assert_eq!(kinds[5], &TokenKind::String("there".to_string()));
    assert_eq!(kinds[6], &TokenKind::Eof);
}

#[test]
fn lexes_template_with_interpolation() {
    let tokens = Lexer::new("`a${x}b`").tokenize().unwrap();
    assert_eq!(
        tokens[0].kind,
        TokenKind::TemplateHead {
            cooked: "a".to_string(),
            tail: false
        }
    );
    assert_eq!(tokens[1].kind, TokenKind::Identifier("x".to_string()));
    assert_eq!(
        tokens[2].kind,
        TokenKind::TemplateMiddle {
            cooked: "b".to_string(),
            tail: true
        }
    );
}

#[test]
fn tracks_line_and_column() {
    let tokens = Lexer::new("a\n  b").tokenize().unwrap();
    assert_eq!(tokens[0].span.line, 1);
    assert_eq!(tokens[0].span.column, 1);
    assert_eq!(tokens[1].span.line, 2);
    assert_eq!(tokens[1].span.column, 3);
}

#[test]
fn parses_nested_array_pattern_with_holes() {
    let stmts = parse("let [a, , [, b, c]] = [3, -11, [-1, 6, 8]];");
    let declarations = match &stmts[0] {
        Stmt::VarDecl {
            kind: VarKind::Let,
            declarations,
            ..
        } => declarations,
        other => panic!("expected let declaration, got {:?}", other),
    };
    let elements = match &declarations[0].id {
        Pattern::Array { elements, .. } => elements,
        other => panic!("expected array pattern, got {:?}", other),
    };
    assert_eq!(elements.len(), 3);
    assert!(matches!(&elements[0], Some(Pattern::Identifier(id)) if id.name == "a"));
    assert!(elements[1].is_none());
    match &elements[2] {
        Some(Pattern::Array { elements, .. }) => {
            assert!(elements[0].is_none());
            assert!(matches!(&elements[1], Some(Pattern::Identifier(id)) if id.name == "b"));
            assert!(matches!(&elements[2], Some(Pattern::Identifier(id)) if id.name == "c"));
        }
        other => panic!("expected nested array pattern, got {:?}", other),
    }
}

#[test]
fn parses_object_pattern_with_rename() {
    let stmts = parse("let {a, q: [b, , c]} = v;");
    let pattern = match &stmts[0] {
        Stmt::VarDecl { declarations, .. } => &declarations[0].id,
        other => panic!("expected declaration, got {:?}", other),
    };
    let properties = match pattern {
        Pattern::Object { properties, .. } => properties,
        other => panic!("expected object pattern, got {:?}", other),
    };
    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].key, "a");
    assert!(properties[0].shorthand);
    assert_eq!(properties[1].key, "q");
    assert!(!properties[1].shorthand);
    assert!(matches!(properties[1].value, Pattern::Array { .. }));
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = parse_expr("1 + 2 * 3").unwrap();
    match expr {
        Expr::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        )),
        other => panic!("expected addition at the root, got {:?}", other),
    }
}

#[test]
fn parses_arrow_shorthand_and_destructuring_params() {
    let expr = parse_expr("x => x + 1").unwrap();
    match &expr {
        Expr::Arrow { func, .. } => {
            assert_eq!(func.params.len(), 1);
            assert!(matches!(func.body, ArrowBody::Expression(_)));
        }
        other => panic!("expected arrow, got {:?}", other),
    }

    let expr = parse_expr("([a, b]) => { return a; }").unwrap();
    match &expr {
        Expr::Arrow { func, .. } => {
            assert!(matches!(func.params[0], Pattern::Array { .. }));
            assert!(matches!(func.body, ArrowBody::Block(_)));
        }
        other => panic!("expected arrow, got {:?}", other),
    }
}

#[test]
fn arrow_statement_is_recognized() {
    let stmts = parse("() => { count++; };");
    assert_eq!(stmts.len(), 1);
    assert!(matches!(stmts[0], Stmt::ArrowExpression { .. }));
}

#[test]
fn collects_multiple_errors() {
    let errors = parse_statements("let = 1; ) ; let y = 3;").unwrap_err();
    assert_eq!(errors.len(), 2, "expected two errors: {:?}", errors);
}

#[test]
fn error_carries_position() {
    let errors = parse_statements("let\nlet x = 1;").unwrap_err();
    assert_eq!(errors[0].line, 2);
}

#[test]
fn parses_for_of_and_for_in() {
    let stmts = parse("for (let item of list) { item; } for (const k in obj) { k; }");
    assert!(matches!(
        &stmts[0],
        Stmt::ForOf {
            left: ForTarget::Declaration {
                kind: VarKind::Let,
                ..
            },
            ..
        }
    ));
    assert!(matches!(
        &stmts[1],
        Stmt::ForIn {
            left: ForTarget::Declaration {
                kind: VarKind::Const,
                ..
            },
            ..
        }
    ));
}

#[test]
fn parses_switch_with_default() {
    let stmts = parse("switch (x) { case 1: a; break; default: b; }");
    let cases = match &stmts[0] {
        Stmt::Switch { cases, .. } => cases,
        other => panic!("expected switch, got {:?}", other),
    };
    assert_eq!(cases.len(), 2);
    assert!(cases[0].test.is_some());
    assert!(cases[1].test.is_none());
    assert_eq!(cases[0].consequent.len(), 2);
}

#[test]
fn parses_import_and_export_function() {
    let stmts = parse("import { helper, other } from \"utils\";\nexport function f() { return 1; }");
    match &stmts[0] {
        Stmt::Import {
            specifiers, module, ..
        } => {
            assert_eq!(module, "utils");
            assert_eq!(specifiers.len(), 2);
            assert_eq!(specifiers[0].imported, "helper");
        }
        other => panic!("expected import, got {:?}", other),
    }
    match &stmts[1] {
        Stmt::FunctionDecl(decl) => {
            assert_eq!(decl.name.name, "f");
            assert!(decl.exported);
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn parses_compound_assignment_and_typeof() {
    let expr = parse_expr("x += typeof y").unwrap();
    match expr {
        Expr::Assignment {
            op: AssignOp::AddAssign,
            value,
            ..
        } => assert!(matches!(
            *value,
            Expr::Unary {
                op: UnaryOp::TypeOf,
                ..
            }
        )),
        other => panic!("expected compound assignment, got {:?}", other),
    }
}

#[test]
fn template_literal_shape() {
    let expr = parse_expr("`a${x}b${y}c`").unwrap();
    match expr {
        Expr::TemplateLiteral {
            quasis,
            expressions,
            ..
        } => {
            assert_eq!(quasis, vec!["a", "b", "c"]);
            assert_eq!(expressions.len(), 2);
        }
        other => panic!("expected template literal, got {:?}", other),
    }
}

#[test]
fn keywords_are_legal_property_names() {
    let expr = parse_expr("x.default.from").unwrap();
    assert!(matches!(expr, Expr::Member { .. }));
}

#[test]
fn print_is_a_fixed_point() {
    let source = "let x = (1 + 2) * f(a, ...rest); if (x > 3) { y.q[0] = `n=${x}`; } \
                  for (let i = 0; i < 3; i++) { i; } switch (x) { case 1: break; default: x--; }";
    let first = print_stmts(&parse(source));
    let second = print_stmts(&parse(&first));
    assert_eq!(first, second);
}

#[test]
fn top_level_classification() {
    use super::static_semantics::{classify_top_level, TopLevelKind};
    let stmts = parse("var a = 1; let b = 2; function f() {} if (a) { a; }");
    assert!(matches!(
        classify_top_level(&stmts[0]),
        TopLevelKind::Legal
    ));
    assert!(matches!(
        classify_top_level(&stmts[1]),
        TopLevelKind::InnerScopeOnly
    ));
    assert!(matches!(
        classify_top_level(&stmts[2]),
        TopLevelKind::Legal
    ));
    assert!(matches!(
        classify_top_level(&stmts[3]),
        TopLevelKind::NotModuleStatement
    ));
}

#[test]
fn declarator_initializer_stays_out_of_the_pattern() {
    let stmts = parse("let [a = 1, b] = src, n = 5;");
    let declarations = match &stmts[0] {
        Stmt::VarDecl { declarations, .. } => declarations,
        other => panic!("expected declaration, got {:?}", other),
    };
    let elements = match &declarations[0].id {
        Pattern::Array { elements, .. } => elements,
        other => panic!("expected array pattern, got {:?}", other),
    };
    assert!(matches!(&elements[0], Some(Pattern::Default { .. })));
    assert!(matches!(
        &declarations[0].init,
        Some(Expr::Identifier { name, .. }) if name == "src"
    ));
    assert!(matches!(declarations[1].id, Pattern::Identifier(_)));
    assert!(matches!(
        &declarations[1].init,
        Some(Expr::Literal { value: Literal::Int(5), .. })
    ));
}

#[test]
fn trailing_array_holes_survive_printing() {
    let first = print_stmts(&parse("let a = [1, , ];"));
    let reparsed = parse(&first);
    let declarations = match &reparsed[0] {
        Stmt::VarDecl { declarations, .. } => declarations,
        other => panic!("expected declaration, got {:?}", other),
    };
    match &declarations[0].init {
        Some(Expr::ArrayLiteral { elements, .. }) => {
            assert_eq!(elements.len(), 2);
            assert!(elements[1].is_none());
        }
        other => panic!("expected array literal, got {:?}", other),
    }
    assert_eq!(first, print_stmts(&reparsed));
}

#[test]
fn prints_a_template_with_no_quasis() {
    let template = Expr::TemplateLiteral {
        id: next_node_id(),
        span: Span::default(),
        quasis: Vec::new(),
        expressions: Vec::new(),
    };
    assert_eq!(super::printer::print_expr(&template), "``");
}
