//! Recursive-descent parser for the scripting dialect.
//!
//! The parser collects diagnostics instead of stopping at the first
//! error: when a statement fails to parse it records the error and
//! re-synchronizes at the next `;` or `}` before continuing, so a single
//! pass reports as many problems as possible.

use std::rc::Rc;

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Span, Token, TokenKind};
use super::ParserError;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParserError>,
    /// Suppresses the `in` operator while parsing a `for (… in …)` head.
    no_in: bool,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let mut errors = Vec::new();
        let tokens = match Lexer::new(source).tokenize() {
            Ok(tokens) => tokens,
            Err(err) => {
                errors.push(err);
                vec![Token::new(TokenKind::Eof, Span::default())]
            }
        };
        Parser {
            tokens,
            pos: 0,
            errors,
            no_in: false,
        }
    }

    /// Diagnostics collected so far.
    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ParserError> {
        std::mem::take(&mut self.errors)
    }

    /// Parse a statement sequence up to end of input, collecting errors.
    pub fn parse_statements(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        statements
    }

    /// Parse exactly one expression spanning the whole input.
    pub fn parse_single_expression(&mut self) -> Option<Expr> {
        match self.parse_expression() {
            Ok(expr) => {
                if !self.is_eof() {
                    let err = self.unexpected(1, "expected end of input");
                    self.errors.push(err);
                    return None;
                }
                Some(expr)
            }
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    /// Skip to the next statement boundary after an error.
    fn synchronize(&mut self) {
        while !self.is_eof() {
            match self.current_kind() {
                TokenKind::Semicolon | TokenKind::RightBrace => {
                    self.advance();
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    pub fn parse_statement(&mut self) -> Result<Stmt, ParserError> {
        let span = self.current_span();
        match self.current_kind().clone() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty { span })
            }
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::Let => self.parse_var_statement(VarKind::Let),
            TokenKind::Const => self.parse_var_statement(VarKind::Const),
            TokenKind::Var => self.parse_var_statement(VarKind::Var),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon();
                Ok(Stmt::Break { span })
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon();
                Ok(Stmt::Continue { span })
            }
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Throw => {
                self.advance();
                let argument = self.parse_expression()?;
                self.consume_semicolon();
                Ok(Stmt::Throw { span, argument })
            }
            TokenKind::Try => self.parse_try(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Function => self.parse_function_decl(false),
            TokenKind::Export => {
                self.advance();
                if !matches!(self.current_kind(), TokenKind::Function) {
                    return Err(self.unexpected(2, "'export' must be followed by a function"));
                }
                self.parse_function_decl(true)
            }
            TokenKind::Import => self.parse_import(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace)?;
        let body = self.parse_statement_list_until_brace()?;
        let end = self.current_span();
        self.expect(&TokenKind::RightBrace)?;
        Ok(Stmt::Block {
            span: start.merge(end),
            body,
        })
    }

    fn parse_statement_list_until_brace(&mut self) -> Result<Vec<Stmt>, ParserError> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_var_statement(&mut self, kind: VarKind) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        let declarations = self.parse_declarator_list()?;
        self.consume_semicolon();
        Ok(Stmt::VarDecl {
            span: start.merge(self.prev_span()),
            kind,
            declarations,
        })
    }

    fn parse_declarator_list(&mut self) -> Result<Vec<VarDeclarator>, ParserError> {
        let mut declarations = Vec::new();
        loop {
            let start = self.current_span();
            let id = self.parse_binding_target()?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VarDeclarator {
                span: start.merge(self.prev_span()),
                id,
                init,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(declarations)
    }

    fn parse_if(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            span: start.merge(self.prev_span()),
            test,
            consequent,
            alternate,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        let argument = if matches!(
            self.current_kind(),
            TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon();
        Ok(Stmt::Return {
            span: start.merge(self.prev_span()),
            argument,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While {
            span: start.merge(self.prev_span()),
            test,
            body,
        })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.consume_semicolon();
        Ok(Stmt::DoWhile {
            span: start.merge(self.prev_span()),
            test,
            body,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LeftParen)?;

        // Declaration-headed forms.
        if self.current_kind().is_declaration_kind() {
            let kind = match self.current_kind() {
                TokenKind::Let => VarKind::Let,
                TokenKind::Const => VarKind::Const,
                _ => VarKind::Var,
            };
            self.advance();
            let pattern = self.parse_binding_target()?;
            match self.current_kind() {
                TokenKind::In => {
                    self.advance();
                    let right = self.parse_expression()?;
                    self.expect(&TokenKind::RightParen)?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(Stmt::ForIn {
                        span: start.merge(self.prev_span()),
                        left: ForTarget::Declaration { kind, pattern },
                        right,
                        body,
                    });
                }
                TokenKind::Of => {
                    self.advance();
                    let right = self.parse_expression()?;
                    self.expect(&TokenKind::RightParen)?;
                    let body = Box::new(self.parse_statement()?);
                    return Ok(Stmt::ForOf {
                        span: start.merge(self.prev_span()),
                        left: ForTarget::Declaration { kind, pattern },
                        right,
                        body,
                    });
                }
                _ => {
                    // Classic for with a declaration init; finish the
                    // first declarator, then any further ones.
                    let decl_start = pattern.span();
                    let init_expr = if self.eat(&TokenKind::Assign) {
                        Some(self.parse_assignment()?)
                    } else {
                        None
                    };
                    let mut declarations = vec![VarDeclarator {
                        span: decl_start.merge(self.prev_span()),
                        id: pattern,
                        init: init_expr,
                    }];
                    if self.eat(&TokenKind::Comma) {
                        declarations.extend(self.parse_declarator_list()?);
                    }
                    self.expect(&TokenKind::Semicolon)?;
                    return self.parse_for_tail(
                        start,
                        Some(ForInit::VarDecl { kind, declarations }),
                    );
                }
            }
        }

        // Empty init.
        if self.eat(&TokenKind::Semicolon) {
            return self.parse_for_tail(start, None);
        }

        // Expression init, possibly a for-in/for-of target.
        self.no_in = true;
        let init = self.parse_expression();
        self.no_in = false;
        let init = init?;
        match self.current_kind() {
            TokenKind::In | TokenKind::Of => {
                let is_in = matches!(self.current_kind(), TokenKind::In);
                self.advance();
                let pattern = expr_to_pattern(&init)
                    .ok_or_else(|| self.unexpected(3, "invalid loop target"))?;
                let right = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                let body = Box::new(self.parse_statement()?);
                let span = start.merge(self.prev_span());
                let left = ForTarget::Pattern(pattern);
                if is_in {
                    Ok(Stmt::ForIn {
                        span,
                        left,
                        right,
                        body,
                    })
                } else {
                    Ok(Stmt::ForOf {
                        span,
                        left,
                        right,
                        body,
                    })
                }
            }
            _ => {
                self.expect(&TokenKind::Semicolon)?;
                self.parse_for_tail(start, Some(ForInit::Expression(init)))
            }
        }
    }

    fn parse_for_tail(&mut self, start: Span, init: Option<ForInit>) -> Result<Stmt, ParserError> {
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            span: start.merge(self.prev_span()),
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        let block = self.parse_braced_statements()?;
        let handler = if self.check(&TokenKind::Catch) {
            let catch_start = self.current_span();
            self.advance();
            let param = if self.eat(&TokenKind::LeftParen) {
                let pattern = self.parse_binding_pattern()?;
                self.expect(&TokenKind::RightParen)?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_braced_statements()?;
            Some(CatchClause {
                span: catch_start.merge(self.prev_span()),
                param,
                body,
            })
        } else {
            None
        };
        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_braced_statements()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected(4, "'try' requires 'catch' or 'finally'"));
        }
        Ok(Stmt::Try {
            span: start.merge(self.prev_span()),
            block,
            handler,
            finalizer,
        })
    }

    fn parse_braced_statements(&mut self) -> Result<Vec<Stmt>, ParserError> {
        self.expect(&TokenKind::LeftBrace)?;
        let body = self.parse_statement_list_until_brace()?;
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            let case_start = self.current_span();
            let test = if self.eat(&TokenKind::Case) {
                let test = self.parse_expression()?;
                Some(test)
            } else if self.eat(&TokenKind::Default) {
                None
            } else {
                return Err(self.unexpected(5, "expected 'case' or 'default'"));
            };
            self.expect(&TokenKind::Colon)?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current_kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                span: case_start.merge(self.prev_span()),
                test,
                consequent,
            });
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(Stmt::Switch {
            span: start.merge(self.prev_span()),
            discriminant,
            cases,
        })
    }

    fn parse_function_decl(&mut self, exported: bool) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameter_list()?;
        let body = self.parse_braced_statements()?;
        Ok(Stmt::FunctionDecl(FunctionDecl {
            span: start.merge(self.prev_span()),
            name,
            params,
            body,
            exported,
        }))
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Pattern>, ParserError> {
        let mut params = Vec::new();
        while !self.check(&TokenKind::RightParen) && !self.is_eof() {
            params.push(self.parse_binding_pattern()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(params)
    }

    fn parse_import(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LeftBrace)?;
        let mut specifiers = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            let name = self.expect_identifier()?;
            specifiers.push(ImportSpecifier {
                imported: name.name.clone(),
                local: name.name,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        self.expect(&TokenKind::From)?;
        let module = match self.current_kind().clone() {
            TokenKind::String(value) => {
                self.advance();
                value
            }
            _ => return Err(self.unexpected(6, "expected module name string")),
        };
        self.consume_semicolon();
        Ok(Stmt::Import {
            span: start.merge(self.prev_span()),
            specifiers,
            module,
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParserError> {
        let start = self.current_span();
        let expression = self.parse_expression()?;
        self.consume_semicolon();
        let span = start.merge(self.prev_span());
        if let Expr::Arrow { func, .. } = &expression {
            return Ok(Stmt::ArrowExpression {
                span,
                func: Rc::clone(func),
            });
        }
        Ok(Stmt::Expression { span, expression })
    }

    // ---------------------------------------------------------------
    // Patterns
    // ---------------------------------------------------------------

    /// A bare binding target, with no trailing `= fallback`. Declarator
    /// lists and for-heads call this so the `=` stays available for the
    /// initializer.
    fn parse_binding_target(&mut self) -> Result<Pattern, ParserError> {
        Ok(match self.current_kind().clone() {
            TokenKind::Identifier(_) => Pattern::Identifier(self.expect_identifier()?),
            TokenKind::LeftBracket => self.parse_array_pattern()?,
            TokenKind::LeftBrace => self.parse_object_pattern()?,
            TokenKind::Ellipsis => {
                let start = self.current_span();
                self.advance();
                let argument = Box::new(self.parse_binding_target()?);
                Pattern::Rest {
                    span: start.merge(self.prev_span()),
                    argument,
                }
            }
            _ => return Err(self.unexpected(7, "expected binding pattern")),
        })
    }

    fn parse_binding_pattern(&mut self) -> Result<Pattern, ParserError> {
        let base = self.parse_binding_target()?;
        if matches!(base, Pattern::Rest { .. }) {
            return Ok(base);
        }
        if self.eat(&TokenKind::Assign) {
            let fallback = Box::new(self.parse_assignment()?);
            let span = base.span().merge(self.prev_span());
            return Ok(Pattern::Default {
                span,
                target: Box::new(base),
                fallback,
            });
        }
        Ok(base)
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ParserError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) && !self.is_eof() {
            if self.check(&TokenKind::Comma) {
                // Elision.
                elements.push(None);
                self.advance();
                continue;
            }
            elements.push(Some(self.parse_binding_pattern()?));
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightBracket)?;
        Ok(Pattern::Array {
            span: start.merge(self.prev_span()),
            elements,
        })
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, ParserError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace)?;
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            let prop_start = self.current_span();
            let key = match self.current_kind().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    name
                }
                TokenKind::String(name) => {
                    self.advance();
                    name
                }
                _ => return Err(self.unexpected(8, "expected property name in pattern")),
            };
            let (value, shorthand) = if self.eat(&TokenKind::Colon) {
                (self.parse_binding_pattern()?, false)
            } else if self.eat(&TokenKind::Assign) {
                // Shorthand with default: `{a = 1}`.
                let fallback = Box::new(self.parse_assignment()?);
                let ident = Pattern::Identifier(Ident {
                    name: key.clone(),
                    span: prop_start,
                });
                (
                    Pattern::Default {
                        span: prop_start.merge(self.prev_span()),
                        target: Box::new(ident),
                        fallback,
                    },
                    true,
                )
            } else {
                (
                    Pattern::Identifier(Ident {
                        name: key.clone(),
                        span: prop_start,
                    }),
                    true,
                )
            };
            properties.push(ObjectPatternProperty {
                span: prop_start.merge(self.prev_span()),
                key,
                value,
                shorthand,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(Pattern::Object {
            span: start.merge(self.prev_span()),
            properties,
        })
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    /// Full expression including comma sequences.
    pub fn parse_expression(&mut self) -> Result<Expr, ParserError> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let start = first.span();
        let mut expressions = vec![first];
        while self.eat(&TokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence {
            id: next_node_id(),
            span: start.merge(self.prev_span()),
            expressions,
        })
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParserError> {
        // Arrow shorthand: `x => …`
        if let TokenKind::Identifier(_) = self.current_kind() {
            if matches!(self.peek_kind(), TokenKind::Arrow) {
                return self.parse_arrow_shorthand();
            }
        }
        // Parenthesized arrow parameters: `(a, [b]) => …`
        if self.check(&TokenKind::LeftParen) && self.is_arrow_ahead() {
            return self.parse_arrow_parenthesized();
        }

        let left = self.parse_conditional()?;

        if self.current_kind().is_assignment_op() {
            let op = assignment_op(self.current_kind());
            if !is_valid_assignment_target(&left) {
                return Err(self.unexpected(9, "invalid assignment target"));
            }
            self.advance();
            let value = Box::new(self.parse_assignment()?);
            let span = left.span().merge(self.prev_span());
            return Ok(Expr::Assignment {
                id: next_node_id(),
                span,
                op,
                target: Box::new(left),
                value,
            });
        }
        Ok(left)
    }

    fn parse_arrow_shorthand(&mut self) -> Result<Expr, ParserError> {
        let start = self.current_span();
        let param = Pattern::Identifier(self.expect_identifier()?);
        self.expect(&TokenKind::Arrow)?;
        self.finish_arrow(start, vec![param])
    }

    fn parse_arrow_parenthesized(&mut self) -> Result<Expr, ParserError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RightParen) && !self.is_eof() {
            params.push(self.parse_binding_pattern()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::Arrow)?;
        self.finish_arrow(start, params)
    }

    fn finish_arrow(&mut self, start: Span, params: Vec<Pattern>) -> Result<Expr, ParserError> {
        let body = if self.check(&TokenKind::LeftBrace) {
            ArrowBody::Block(self.parse_braced_statements()?)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };
        let span = start.merge(self.prev_span());
        let id = next_node_id();
        Ok(Expr::Arrow {
            id,
            span,
            func: Rc::new(ArrowFn {
                id,
                span,
                params,
                body,
            }),
        })
    }

    /// Look ahead from a `(` for a matching `)` followed by `=>`.
    fn is_arrow_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut index = self.pos;
        while let Some(token) = self.tokens.get(index) {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(index + 1).map(|t| &t.kind),
                            Some(TokenKind::Arrow)
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            index += 1;
        }
        false
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParserError> {
        let test = self.parse_binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = Box::new(self.parse_assignment()?);
        self.expect(&TokenKind::Colon)?;
        let alternate = Box::new(self.parse_assignment()?);
        let span = test.span().merge(self.prev_span());
        Ok(Expr::Conditional {
            id: next_node_id(),
            span,
            test: Box::new(test),
            consequent,
            alternate,
        })
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParserError> {
        let mut left = self.parse_unary()?;
        while let Some((op, precedence)) = binary_precedence(self.current_kind(), self.no_in) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            let span = left.span().merge(right.span());
            left = Expr::Binary {
                id: next_node_id(),
                span,
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        let span = self.current_span();
        let op = match self.current_kind() {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::BitNot => Some(UnaryOp::BitNot),
            TokenKind::TypeOf => Some(UnaryOp::TypeOf),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let argument = Box::new(self.parse_unary()?);
            return Ok(Expr::Unary {
                id: next_node_id(),
                span: span.merge(self.prev_span()),
                op,
                argument,
            });
        }
        if matches!(
            self.current_kind(),
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            let op = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let argument = self.parse_unary()?;
            if !is_valid_assignment_target(&argument) {
                return Err(self.unexpected(10, "invalid update target"));
            }
            return Ok(Expr::Update {
                id: next_node_id(),
                span: span.merge(self.prev_span()),
                op,
                argument: Box::new(argument),
                prefix: true,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParserError> {
        let expr = self.parse_call_member()?;
        if matches!(
            self.current_kind(),
            TokenKind::PlusPlus | TokenKind::MinusMinus
        ) {
            let op = if self.check(&TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            if !is_valid_assignment_target(&expr) {
                return Err(self.unexpected(10, "invalid update target"));
            }
            self.advance();
            let span = expr.span().merge(self.prev_span());
            return Ok(Expr::Update {
                id: next_node_id(),
                span,
                op,
                argument: Box::new(expr),
                prefix: false,
            });
        }
        Ok(expr)
    }

    fn parse_call_member(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_property_name()?;
                    let span = expr.span().merge(self.prev_span());
                    expr = Expr::Member {
                        id: next_node_id(),
                        span,
                        object: Box::new(expr),
                        property: MemberProperty::Static(name),
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    let span = expr.span().merge(self.prev_span());
                    expr = Expr::Member {
                        id: next_node_id(),
                        span,
                        object: Box::new(expr),
                        property: MemberProperty::Computed(Box::new(property)),
                    };
                }
                TokenKind::LeftParen => {
                    self.advance();
                    let mut arguments = Vec::new();
                    while !self.check(&TokenKind::RightParen) && !self.is_eof() {
                        if self.check(&TokenKind::Ellipsis) {
                            let spread_start = self.current_span();
                            self.advance();
                            let argument = Box::new(self.parse_assignment()?);
                            arguments.push(Expr::Spread {
                                id: next_node_id(),
                                span: spread_start.merge(self.prev_span()),
                                argument,
                            });
                        } else {
                            arguments.push(self.parse_assignment()?);
                        }
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RightParen)?;
                    let span = expr.span().merge(self.prev_span());
                    expr = Expr::Call {
                        id: next_node_id(),
                        span,
                        callee: Box::new(expr),
                        arguments,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        let span = self.current_span();
        match self.current_kind().clone() {
            TokenKind::Integer(value) => {
                self.advance();
                Ok(self.literal(span, Literal::Int(value)))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(self.literal(span, Literal::Float(value)))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(self.literal(span, Literal::String(value)))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.literal(span, Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.literal(span, Literal::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(self.literal(span, Literal::Null))
            }
            TokenKind::Undefined => {
                self.advance();
                Ok(self.literal(span, Literal::Undefined))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier {
                    id: next_node_id(),
                    span,
                    name,
                })
            }
            TokenKind::TemplateHead { cooked, tail } => {
                self.advance();
                self.parse_template(span, cooked, tail)
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            _ => Err(self.unexpected(11, "expected expression")),
        }
    }

    fn parse_template(
        &mut self,
        start: Span,
        head: String,
        head_is_tail: bool,
    ) -> Result<Expr, ParserError> {
        let mut quasis = vec![head];
        let mut expressions = Vec::new();
        let mut done = head_is_tail;
        while !done {
            expressions.push(self.parse_expression()?);
            match self.current_kind().clone() {
                TokenKind::TemplateMiddle { cooked, tail } => {
                    self.advance();
                    quasis.push(cooked);
                    done = tail;
                }
                _ => return Err(self.unexpected(12, "unterminated template interpolation")),
            }
        }
        Ok(Expr::TemplateLiteral {
            id: next_node_id(),
            span: start.merge(self.prev_span()),
            quasis,
            expressions,
        })
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParserError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) && !self.is_eof() {
            if self.check(&TokenKind::Comma) {
                elements.push(None);
                self.advance();
                continue;
            }
            if self.check(&TokenKind::Ellipsis) {
                let spread_start = self.current_span();
                self.advance();
                let argument = Box::new(self.parse_assignment()?);
                elements.push(Some(Expr::Spread {
                    id: next_node_id(),
                    span: spread_start.merge(self.prev_span()),
                    argument,
                }));
            } else {
                elements.push(Some(self.parse_assignment()?));
            }
            if !self.check(&TokenKind::RightBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::RightBracket)?;
        Ok(Expr::ArrayLiteral {
            id: next_node_id(),
            span: start.merge(self.prev_span()),
            elements,
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParserError> {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace)?;
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            if self.check(&TokenKind::Ellipsis) {
                self.advance();
                properties.push(ObjectProperty::Spread(self.parse_assignment()?));
            } else {
                let key_span = self.current_span();
                let key = match self.current_kind().clone() {
                    TokenKind::Identifier(name) => {
                        self.advance();
                        if !self.check(&TokenKind::Colon) {
                            properties.push(ObjectProperty::Shorthand(Ident {
                                name,
                                span: key_span,
                            }));
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                            continue;
                        }
                        PropertyKey::Identifier(name)
                    }
                    TokenKind::String(name) => {
                        self.advance();
                        PropertyKey::String(name)
                    }
                    TokenKind::Integer(value) => {
                        self.advance();
                        PropertyKey::String(value.to_string())
                    }
                    TokenKind::LeftBracket => {
                        self.advance();
                        let key = self.parse_assignment()?;
                        self.expect(&TokenKind::RightBracket)?;
                        PropertyKey::Computed(Box::new(key))
                    }
                    _ => return Err(self.unexpected(13, "expected property name")),
                };
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_assignment()?;
                properties.push(ObjectProperty::KeyValue { key, value });
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(Expr::ObjectLiteral {
            id: next_node_id(),
            span: start.merge(self.prev_span()),
            properties,
        })
    }

    fn literal(&mut self, span: Span, value: Literal) -> Expr {
        Expr::Literal {
            id: next_node_id(),
            span,
            value,
        }
    }

    // ---------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos + 1)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.current().is_eof()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParserError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(14, &format!("expected {}", kind)))
        }
    }

    fn consume_semicolon(&mut self) {
        self.eat(&TokenKind::Semicolon);
    }

    fn expect_identifier(&mut self) -> Result<Ident, ParserError> {
        match self.current_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.current_span();
                self.advance();
                Ok(Ident { name, span })
            }
            _ => Err(self.unexpected(15, "expected identifier")),
        }
    }

    /// Property names after `.` may be keywords (`x.default` is legal).
    fn expect_property_name(&mut self) -> Result<String, ParserError> {
        let name = match self.current_kind() {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Default => "default".to_string(),
            TokenKind::From => "from".to_string(),
            TokenKind::Of => "of".to_string(),
            TokenKind::In => "in".to_string(),
            _ => return Err(self.unexpected(16, "expected property name")),
        };
        self.advance();
        Ok(name)
    }

    fn unexpected(&self, code: u32, message: &str) -> ParserError {
        let span = self.current_span();
        ParserError {
            code,
            message: format!("{}, found {}", message, self.current_kind()),
            line: span.line,
            column: span.column,
        }
    }
}

fn assignment_op(kind: &TokenKind) -> AssignOp {
    match kind {
        TokenKind::Assign => AssignOp::Assign,
        TokenKind::PlusAssign => AssignOp::AddAssign,
        TokenKind::MinusAssign => AssignOp::SubtractAssign,
        TokenKind::StarAssign => AssignOp::MultiplyAssign,
        TokenKind::SlashAssign => AssignOp::DivideAssign,
        TokenKind::PercentAssign => AssignOp::RemainderAssign,
        TokenKind::ShlAssign => AssignOp::ShiftLeftAssign,
        TokenKind::ShrAssign => AssignOp::ShiftRightAssign,
        TokenKind::UshrAssign => AssignOp::ShiftRightUnsignedAssign,
        TokenKind::AmpAssign => AssignOp::BitAndAssign,
        TokenKind::PipeAssign => AssignOp::BitOrAssign,
        TokenKind::CaretAssign => AssignOp::BitXorAssign,
        // Guarded by `is_assignment_op` at the call site.
        _ => AssignOp::Assign,
    }
}

fn binary_precedence(kind: &TokenKind, no_in: bool) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::OrOr => (BinaryOp::Or, 1),
        TokenKind::AndAnd => (BinaryOp::And, 2),
        TokenKind::BitOr => (BinaryOp::BitOr, 3),
        TokenKind::BitXor => (BinaryOp::BitXor, 4),
        TokenKind::BitAnd => (BinaryOp::BitAnd, 5),
        TokenKind::Eq => (BinaryOp::LooselyEqual, 6),
        TokenKind::NotEq => (BinaryOp::LooselyUnequal, 6),
        TokenKind::StrictEq => (BinaryOp::StrictlyEqual, 6),
        TokenKind::StrictNotEq => (BinaryOp::StrictlyUnequal, 6),
        TokenKind::Lt => (BinaryOp::LessThan, 7),
        TokenKind::LtEq => (BinaryOp::LessThanEqual, 7),
        TokenKind::Gt => (BinaryOp::GreaterThan, 7),
        TokenKind::GtEq => (BinaryOp::GreaterThanEqual, 7),
        TokenKind::In if !no_in => (BinaryOp::In, 7),
        TokenKind::Shl => (BinaryOp::ShiftLeft, 8),
        TokenKind::Shr => (BinaryOp::ShiftRight, 8),
        TokenKind::Ushr => (BinaryOp::ShiftRightUnsigned, 8),
        TokenKind::Plus => (BinaryOp::Add, 9),
        TokenKind::Minus => (BinaryOp::Subtract, 9),
        TokenKind::Star => (BinaryOp::Multiply, 10),
        TokenKind::Slash => (BinaryOp::Divide, 10),
        TokenKind::Percent => (BinaryOp::Remainder, 10),
        _ => return None,
    })
}

fn is_valid_assignment_target(expr: &Expr) -> bool {
    matches!(expr, Expr::Identifier { .. } | Expr::Member { .. })
}

/// Reinterpret an expression as a binding pattern for `for (x in y)`
/// style targets.
fn expr_to_pattern(expr: &Expr) -> Option<Pattern> {
    match expr {
        Expr::Identifier { name, span, .. } => Some(Pattern::Identifier(Ident {
            name: name.clone(),
            span: *span,
        })),
        _ => None,
    }
}
