//! Canonical source reconstruction from syntax trees.
//!
//! Output is not a byte-for-byte copy of the original text; it is a
//! canonical rendering that re-parses to a structurally equivalent tree.
//! Compound sub-expressions are parenthesized so no precedence knowledge
//! is needed — parentheses are transparent to the parser.

use super::ast::*;

pub fn print_stmts(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Block { body, .. } => format!("{{ {} }}", join_stmts(body)),
        Stmt::Empty { .. } => ";".to_string(),
        Stmt::Expression { expression, .. } => format!("{};", print_expr(expression)),
        Stmt::ArrowExpression { func, .. } => format!("{};", print_arrow(func)),
        Stmt::VarDecl {
            kind, declarations, ..
        } => {
            let decls = declarations
                .iter()
                .map(|d| match &d.init {
                    Some(init) => format!("{} = {}", print_pattern(&d.id), print_expr(init)),
                    None => print_pattern(&d.id),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} {};", kind.as_str(), decls)
        }
        Stmt::FunctionDecl(decl) => {
            let params = decl
                .params
                .iter()
                .map(print_pattern)
                .collect::<Vec<_>>()
                .join(", ");
            let export = if decl.exported { "export " } else { "" };
            format!(
                "{}function {}({}) {{ {} }}",
                export,
                decl.name.name,
                params,
                join_stmts(&decl.body)
            )
        }
        Stmt::If {
            test,
            consequent,
            alternate,
            ..
        } => {
            let mut out = format!("if ({}) {}", print_expr(test), print_stmt(consequent));
            if let Some(alternate) = alternate {
                out.push_str(&format!(" else {}", print_stmt(alternate)));
            }
            out
        }
        Stmt::Return { argument, .. } => match argument {
            Some(argument) => format!("return {};", print_expr(argument)),
            None => "return;".to_string(),
        },
        Stmt::Break { .. } => "break;".to_string(),
        Stmt::Continue { .. } => "continue;".to_string(),
        Stmt::While { test, body, .. } => {
            format!("while ({}) {}", print_expr(test), print_stmt(body))
        }
        Stmt::DoWhile { test, body, .. } => {
            format!("do {} while ({});", print_stmt(body), print_expr(test))
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            let init = match init {
                Some(ForInit::VarDecl { kind, declarations }) => {
                    let decls = declarations
                        .iter()
                        .map(|d| match &d.init {
                            Some(init) => {
                                format!("{} = {}", print_pattern(&d.id), print_expr(init))
                            }
                            None => print_pattern(&d.id),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{} {}", kind.as_str(), decls)
                }
                Some(ForInit::Expression(expr)) => print_expr(expr),
                None => String::new(),
            };
            let test = test.as_ref().map(print_expr).unwrap_or_default();
            let update = update.as_ref().map(print_expr).unwrap_or_default();
            format!("for ({}; {}; {}) {}", init, test, update, print_stmt(body))
        }
        Stmt::ForIn {
            left, right, body, ..
        } => format!(
            "for ({} in {}) {}",
            print_for_target(left),
            print_expr(right),
            print_stmt(body)
        ),
        Stmt::ForOf {
            left, right, body, ..
        } => format!(
            "for ({} of {}) {}",
            print_for_target(left),
            print_expr(right),
            print_stmt(body)
        ),
        Stmt::Throw { argument, .. } => format!("throw {};", print_expr(argument)),
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            let mut out = format!("try {{ {} }}", join_stmts(block));
            if let Some(handler) = handler {
                match &handler.param {
                    Some(param) => out.push_str(&format!(
                        " catch ({}) {{ {} }}",
                        print_pattern(param),
                        join_stmts(&handler.body)
                    )),
                    None => out.push_str(&format!(" catch {{ {} }}", join_stmts(&handler.body))),
                }
            }
            if let Some(finalizer) = finalizer {
                out.push_str(&format!(" finally {{ {} }}", join_stmts(finalizer)));
            }
            out
        }
        Stmt::Switch {
            discriminant,
            cases,
            ..
        } => {
            let cases = cases
                .iter()
                .map(|case| match &case.test {
                    Some(test) => {
                        format!("case {}: {}", print_expr(test), join_stmts(&case.consequent))
                    }
                    None => format!("default: {}", join_stmts(&case.consequent)),
                })
                .collect::<Vec<_>>()
                .join(" ");
            format!("switch ({}) {{ {} }}", print_expr(discriminant), cases)
        }
        Stmt::Import {
            specifiers, module, ..
        } => {
            let names = specifiers
                .iter()
                .map(|s| s.local.clone())
                .collect::<Vec<_>>()
                .join(", ");
            format!("import {{ {} }} from {:?};", names, module)
        }
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal { value, .. } => print_literal(value),
        Expr::Identifier { name, .. } => name.clone(),
        Expr::TemplateLiteral {
            quasis,
            expressions,
            ..
        } => {
            let mut out = String::from("`");
            if let Some(head) = quasis.first() {
                out.push_str(&escape_template(head));
            }
            for (expr, quasi) in expressions.iter().zip(quasis.iter().skip(1)) {
                out.push_str("${");
                out.push_str(&print_expr(expr));
                out.push('}');
                out.push_str(&escape_template(quasi));
            }
            out.push('`');
            out
        }
        Expr::ArrayLiteral { elements, .. } => {
            let inner = elements
                .iter()
                .map(|e| e.as_ref().map(print_expr).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", ");
            // A trailing hole needs its own comma to survive a re-parse.
            let trailing = if matches!(elements.last(), Some(None)) {
                ","
            } else {
                ""
            };
            format!("[{}{}]", inner, trailing)
        }
        Expr::ObjectLiteral { properties, .. } => {
            let inner = properties
                .iter()
                .map(|p| match p {
                    ObjectProperty::KeyValue { key, value } => {
                        let key = match key {
                            PropertyKey::Identifier(name) => name.clone(),
                            PropertyKey::String(name) => format!("{:?}", name),
                            PropertyKey::Computed(expr) => format!("[{}]", print_expr(expr)),
                        };
                        format!("{}: {}", key, print_expr(value))
                    }
                    ObjectProperty::Shorthand(ident) => ident.name.clone(),
                    ObjectProperty::Spread(expr) => format!("...{}", print_expr(expr)),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", inner)
        }
        Expr::Unary { op, argument, .. } => {
            let op = match op {
                UnaryOp::Minus => "-",
                UnaryOp::Plus => "+",
                UnaryOp::Not => "!",
                UnaryOp::BitNot => "~",
                UnaryOp::TypeOf => "typeof ",
            };
            format!("{}{}", op, wrap(argument))
        }
        Expr::Binary {
            op, left, right, ..
        } => format!("{} {} {}", wrap(left), binary_op_str(*op), wrap(right)),
        Expr::Sequence { expressions, .. } => {
            let inner = expressions
                .iter()
                .map(print_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", inner)
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => format!(
            "{} ? {} : {}",
            wrap(test),
            wrap(consequent),
            wrap(alternate)
        ),
        Expr::Call {
            callee, arguments, ..
        } => {
            let args = arguments
                .iter()
                .map(print_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", wrap(callee), args)
        }
        Expr::Member {
            object, property, ..
        } => match property {
            MemberProperty::Static(name) => format!("{}.{}", wrap(object), name),
            MemberProperty::Computed(expr) => format!("{}[{}]", wrap(object), print_expr(expr)),
        },
        Expr::Assignment {
            op, target, value, ..
        } => format!(
            "{} {} {}",
            print_expr(target),
            assign_op_str(*op),
            wrap(value)
        ),
        Expr::Update {
            op,
            argument,
            prefix,
            ..
        } => {
            let op = match op {
                UpdateOp::Increment => "++",
                UpdateOp::Decrement => "--",
            };
            if *prefix {
                format!("{}{}", op, print_expr(argument))
            } else {
                format!("{}{}", print_expr(argument), op)
            }
        }
        Expr::Arrow { func, .. } => print_arrow(func),
        Expr::Spread { argument, .. } => format!("...{}", print_expr(argument)),
        Expr::NoArgs { .. } => String::new(),
        Expr::ReactiveVarDecl { name, init, .. } => {
            format!("var {} = {}", name, print_expr(init))
        }
    }
}

/// Render an arrow function as `(args) => body` source text. This is the
/// uniform value form the declaration collector stores for functions.
pub fn arrow_source(func: &ArrowFn) -> String {
    print_arrow(func)
}

fn print_arrow(func: &ArrowFn) -> String {
    let params = func
        .params
        .iter()
        .map(print_pattern)
        .collect::<Vec<_>>()
        .join(", ");
    match &func.body {
        ArrowBody::Expression(expr) => format!("({}) => {}", params, wrap(expr)),
        ArrowBody::Block(body) => format!("({}) => {{ {} }}", params, join_stmts(body)),
    }
}

pub fn print_pattern(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Identifier(ident) => ident.name.clone(),
        Pattern::Array { elements, .. } => {
            let inner = elements
                .iter()
                .map(|e| e.as_ref().map(print_pattern).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", ");
            let trailing = if matches!(elements.last(), Some(None)) {
                ","
            } else {
                ""
            };
            format!("[{}{}]", inner, trailing)
        }
        Pattern::Object { properties, .. } => {
            let inner = properties
                .iter()
                .map(|p| {
                    if p.shorthand {
                        print_pattern(&p.value)
                    } else {
                        format!("{}: {}", p.key, print_pattern(&p.value))
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{}}}", inner)
        }
        Pattern::Rest { argument, .. } => format!("...{}", print_pattern(argument)),
        Pattern::Default {
            target, fallback, ..
        } => format!("{} = {}", print_pattern(target), print_expr(fallback)),
    }
}

fn print_for_target(target: &ForTarget) -> String {
    match target {
        ForTarget::Declaration { kind, pattern } => {
            format!("{} {}", kind.as_str(), print_pattern(pattern))
        }
        ForTarget::Pattern(pattern) => print_pattern(pattern),
    }
}

fn print_literal(value: &Literal) -> String {
    match value {
        Literal::Null => "null".to_string(),
        Literal::Undefined => "undefined".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Int(n) => n.to_string(),
        Literal::Float(n) => {
            // Keep a decimal point so the literal re-parses as a float.
            if n.fract() == 0.0 && n.is_finite() {
                format!("{:.1}", n)
            } else {
                n.to_string()
            }
        }
        Literal::String(s) => format!("{:?}", s),
    }
}

/// Parenthesize compound sub-expressions; parentheses are transparent to
/// the parser, so structure is preserved without precedence bookkeeping.
fn wrap(expr: &Expr) -> String {
    match expr {
        Expr::Literal { .. }
        | Expr::Identifier { .. }
        | Expr::TemplateLiteral { .. }
        | Expr::ArrayLiteral { .. }
        | Expr::ObjectLiteral { .. }
        | Expr::Call { .. }
        | Expr::Member { .. }
        | Expr::Sequence { .. } => print_expr(expr),
        _ => format!("({})", print_expr(expr)),
    }
}

fn join_stmts(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join(" ")
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Subtract => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        BinaryOp::Remainder => "%",
        BinaryOp::LooselyEqual => "==",
        BinaryOp::LooselyUnequal => "!=",
        BinaryOp::StrictlyEqual => "===",
        BinaryOp::StrictlyUnequal => "!==",
        BinaryOp::LessThan => "<",
        BinaryOp::LessThanEqual => "<=",
        BinaryOp::GreaterThan => ">",
        BinaryOp::GreaterThanEqual => ">=",
        BinaryOp::ShiftLeft => "<<",
        BinaryOp::ShiftRight => ">>",
        BinaryOp::ShiftRightUnsigned => ">>>",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::In => "in",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

fn assign_op_str(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::AddAssign => "+=",
        AssignOp::SubtractAssign => "-=",
        AssignOp::MultiplyAssign => "*=",
        AssignOp::DivideAssign => "/=",
        AssignOp::RemainderAssign => "%=",
        AssignOp::ShiftLeftAssign => "<<=",
        AssignOp::ShiftRightAssign => ">>=",
        AssignOp::ShiftRightUnsignedAssign => ">>>=",
        AssignOp::BitAndAssign => "&=",
        AssignOp::BitOrAssign => "|=",
        AssignOp::BitXorAssign => "^=",
    }
}

fn escape_template(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}
