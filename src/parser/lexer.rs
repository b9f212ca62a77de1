//! Hand-written tokenizer for the scripting dialect.
//!
//! Template literals are tokenized as parts: a `TemplateHead` up to the
//! first `${`, the tokens of each interpolated expression, and a
//! `TemplateMiddle` after each closing `}`. The lexer keeps a stack of
//! brace depths so a `}` that closes an interpolation resumes template
//! scanning instead of being emitted as a punctuator.

use std::collections::HashMap;

use lazy_static::lazy_static;

use super::token::{Span, Token, TokenKind};
use super::ParserError;

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("break", TokenKind::Break);
        m.insert("case", TokenKind::Case);
        m.insert("catch", TokenKind::Catch);
        m.insert("const", TokenKind::Const);
        m.insert("continue", TokenKind::Continue);
        m.insert("default", TokenKind::Default);
        m.insert("do", TokenKind::Do);
        m.insert("else", TokenKind::Else);
        m.insert("export", TokenKind::Export);
        m.insert("false", TokenKind::False);
        m.insert("finally", TokenKind::Finally);
        m.insert("for", TokenKind::For);
        m.insert("from", TokenKind::From);
        m.insert("function", TokenKind::Function);
        m.insert("if", TokenKind::If);
        m.insert("import", TokenKind::Import);
        m.insert("in", TokenKind::In);
        m.insert("let", TokenKind::Let);
        m.insert("null", TokenKind::Null);
        m.insert("of", TokenKind::Of);
        m.insert("return", TokenKind::Return);
        m.insert("switch", TokenKind::Switch);
        m.insert("throw", TokenKind::Throw);
        m.insert("true", TokenKind::True);
        m.insert("try", TokenKind::Try);
        m.insert("typeof", TokenKind::TypeOf);
        m.insert("undefined", TokenKind::Undefined);
        m.insert("var", TokenKind::Var);
        m.insert("while", TokenKind::While);
        m
    };
}

/// Tokenizer over a source string.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    token_start: usize,
    token_line: usize,
    token_column: usize,
    /// Saved brace depth per open template interpolation.
    template_stack: Vec<usize>,
    /// Depth of `{` seen since the innermost `${`.
    brace_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_line: 1,
            token_column: 1,
            template_stack: Vec::new(),
            brace_depth: 0,
        }
    }

    /// Tokenize the entire source.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParserError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, ParserError> {
        self.skip_whitespace_and_comments();

        self.token_start = self.pos;
        self.token_line = self.line;
        self.token_column = self.column;

        if self.is_eof() {
            if !self.template_stack.is_empty() {
                return Err(self.error(101, "unterminated template literal"));
            }
            return Ok(self.make_token(TokenKind::Eof));
        }

        let ch = self.current();

        if ch.is_ascii_digit() {
            return self.scan_number();
        }
        if ch == '"' || ch == '\'' {
            return self.scan_string(ch);
        }
        if ch == '`' {
            self.advance();
            return self.scan_template_part(true);
        }
        if is_id_start(ch) {
            return Ok(self.scan_identifier());
        }

        self.scan_punctuator()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_eof() && self.current().is_ascii_whitespace() {
                self.advance();
            }
            if self.current() == '/' && self.peek() == '/' {
                while !self.is_eof() && self.current() != '\n' {
                    self.advance();
                }
                continue;
            }
            if self.current() == '/' && self.peek() == '*' {
                self.advance();
                self.advance();
                while !self.is_eof() {
                    if self.current() == '*' && self.peek() == '/' {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn scan_number(&mut self) -> Result<Token, ParserError> {
        let start = self.pos;

        if self.current() == '0' && matches!(self.peek(), 'x' | 'X') {
            self.advance();
            self.advance();
            let digits_start = self.pos;
            while !self.is_eof() && self.current().is_ascii_hexdigit() {
                self.advance();
            }
            let hex = &self.source[digits_start..self.pos];
            let value = i64::from_str_radix(hex, 16)
                .map_err(|_| self.error(102, "invalid hexadecimal literal"))?;
            return Ok(self.make_token(TokenKind::Integer(value)));
        }

        while !self.is_eof() && self.current().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.current() == '.' && self.peek().is_ascii_digit() {
            is_float = true;
            self.advance();
            while !self.is_eof() && self.current().is_ascii_digit() {
                self.advance();
            }
        }
        if matches!(self.current(), 'e' | 'E') {
            let mut lookahead = self.pos + 1;
            if matches!(self.bytes.get(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if self
                .bytes
                .get(lookahead)
                .map_or(false, |b| b.is_ascii_digit())
            {
                is_float = true;
                self.advance();
                if matches!(self.current(), '+' | '-') {
                    self.advance();
                }
                while !self.is_eof() && self.current().is_ascii_digit() {
                    self.advance();
                }
            }
        }

        let text = &self.source[start..self.pos];
        if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| self.error(103, "invalid number literal"))?;
            Ok(self.make_token(TokenKind::Float(value)))
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(self.make_token(TokenKind::Integer(value))),
                // Integers beyond i64 degrade to floats.
                Err(_) => {
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| self.error(103, "invalid number literal"))?;
                    Ok(self.make_token(TokenKind::Float(value)))
                }
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, ParserError> {
        self.advance();
        let mut value = String::new();
        loop {
            if self.is_eof() || self.current() == '\n' {
                return Err(self.error(104, "unterminated string literal"));
            }
            let ch = self.current();
            if ch == quote {
                self.advance();
                break;
            }
            if ch == '\\' {
                self.advance();
                value.push(self.scan_escape()?);
                continue;
            }
            value.push(ch);
            self.advance();
        }
        Ok(self.make_token(TokenKind::String(value)))
    }

    fn scan_escape(&mut self) -> Result<char, ParserError> {
        if self.is_eof() {
            return Err(self.error(105, "unterminated escape sequence"));
        }
        let ch = self.current();
        self.advance();
        Ok(match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'u' => {
                if self.current() != '{' {
                    return Err(self.error(106, "expected '{' in unicode escape"));
                }
                self.advance();
                let start = self.pos;
                while !self.is_eof() && self.current() != '}' {
                    self.advance();
                }
                let code = u32::from_str_radix(&self.source[start..self.pos], 16)
                    .map_err(|_| self.error(106, "invalid unicode escape"))?;
                if self.is_eof() {
                    return Err(self.error(106, "unterminated unicode escape"));
                }
                self.advance();
                char::from_u32(code).ok_or_else(|| self.error(106, "invalid unicode escape"))?
            }
            other => other,
        })
    }

    /// Scan a template literal part. `head` is true when entered right
    /// after a backtick, false when resuming after an interpolation.
    fn scan_template_part(&mut self, head: bool) -> Result<Token, ParserError> {
        let mut cooked = String::new();
        loop {
            if self.is_eof() {
                return Err(self.error(101, "unterminated template literal"));
            }
            let ch = self.current();
            if ch == '`' {
                self.advance();
                let kind = if head {
                    TokenKind::TemplateHead { cooked, tail: true }
                } else {
                    TokenKind::TemplateMiddle { cooked, tail: true }
                };
                return Ok(self.make_token(kind));
            }
            if ch == '$' && self.peek() == '{' {
                self.advance();
                self.advance();
                self.template_stack.push(self.brace_depth);
                self.brace_depth = 0;
                let kind = if head {
                    TokenKind::TemplateHead {
                        cooked,
                        tail: false,
                    }
                } else {
                    TokenKind::TemplateMiddle {
                        cooked,
                        tail: false,
                    }
                };
                return Ok(self.make_token(kind));
            }
            if ch == '\\' {
                self.advance();
                cooked.push(self.scan_escape()?);
                continue;
            }
            cooked.push(ch);
            self.advance();
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while !self.is_eof() && is_id_continue(self.current()) {
            self.advance();
        }
        let text = &self.source[start..self.pos];
        match KEYWORDS.get(text) {
            Some(kind) => self.make_token(kind.clone()),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    fn scan_punctuator(&mut self) -> Result<Token, ParserError> {
        let ch = self.current();
        self.advance();
        let kind = match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => {
                if !self.template_stack.is_empty() {
                    self.brace_depth += 1;
                }
                TokenKind::LeftBrace
            }
            '}' => {
                if !self.template_stack.is_empty() && self.brace_depth == 0 {
                    // Closes a template interpolation; resume the literal.
                    self.brace_depth = self.template_stack.pop().unwrap_or(0);
                    return self.scan_template_part(false);
                }
                if !self.template_stack.is_empty() {
                    self.brace_depth -= 1;
                }
                TokenKind::RightBrace
            }
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '?' => TokenKind::Question,
            '~' => TokenKind::BitNot,
            '.' => {
                if self.current() == '.' && self.peek() == '.' {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Dot
                }
            }
            '+' => {
                if self.eat('+') {
                    TokenKind::PlusPlus
                } else if self.eat('=') {
                    TokenKind::PlusAssign
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    TokenKind::MinusMinus
                } else if self.eat('=') {
                    TokenKind::MinusAssign
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    TokenKind::SlashAssign
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::StrictEq
                    } else {
                        TokenKind::Eq
                    }
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        TokenKind::StrictNotEq
                    } else {
                        TokenKind::NotEq
                    }
                } else {
                    TokenKind::Not
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LtEq
                } else if self.eat('<') {
                    if self.eat('=') {
                        TokenKind::ShlAssign
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GtEq
                } else if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            TokenKind::UshrAssign
                        } else {
                            TokenKind::Ushr
                        }
                    } else if self.eat('=') {
                        TokenKind::ShrAssign
                    } else {
                        TokenKind::Shr
                    }
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    TokenKind::AndAnd
                } else if self.eat('=') {
                    TokenKind::AmpAssign
                } else {
                    TokenKind::BitAnd
                }
            }
            '|' => {
                if self.eat('|') {
                    TokenKind::OrOr
                } else if self.eat('=') {
                    TokenKind::PipeAssign
                } else {
                    TokenKind::BitOr
                }
            }
            '^' => {
                if self.eat('=') {
                    TokenKind::CaretAssign
                } else {
                    TokenKind::BitXor
                }
            }
            other => {
                return Err(self.error(107, &format!("unexpected character '{}'", other)));
            }
        };
        Ok(self.make_token(kind))
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.token_start,
                self.pos,
                self.token_line,
                self.token_column,
            ),
        )
    }

    fn error(&self, code: u32, message: &str) -> ParserError {
        ParserError {
            code,
            message: message.to_string(),
            line: self.token_line,
            column: self.token_column,
        }
    }

    fn current(&self) -> char {
        self.source[self.pos..].chars().next().unwrap_or('\0')
    }

    fn peek(&self) -> char {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.is_eof() {
            return;
        }
        if self.current() == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        // Skip over the full UTF-8 sequence of the current char.
        let mut next = self.pos + 1;
        while next < self.bytes.len() && (self.bytes[next] & 0xc0) == 0x80 {
            next += 1;
        }
        self.pos = next;
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.current() == ch {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

fn is_id_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_id_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}
