use std::fmt::Debug;

use crate::token::{ParseError, Position, Span};
use anyhow::{Result, anyhow};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    LBracket,          // [
    RBracket,          // ]
    Dot,               // .
    Colon,             // :
    Comma,             // ,
    Question,          // ?
    NullishCoalescing, // ??
    Nil,               // nil, null
    Eq,                // ==
    Ne,                // !=
    Gt,                // >
    Lt,                // <
    Ge,                // >=
    Le,                // <=
    And,               // &&
    Or,                // ||
    Not,               // !
    Add,               // +
    Sub,               // -
    Mul,               // *
    Div,               // /
    Mod,               // %
    Str(String),       // "abc", 'abc'
    Int(i64),          // 1
    Float(f64),        // 1.1
    Bool(bool),        // true, false
    Id(String),        // identifier
}

const ASCII_WHITESPACE: u8 = 1 << 0;
const ASCII_DIGIT: u8 = 1 << 1;
const ASCII_IDENT_START: u8 = 1 << 2;
const ASCII_IDENT_CONT: u8 = 1 << 3;

const fn build_ascii_class() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let c = i as u8;
        if matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C) {
            table[i] |= ASCII_WHITESPACE;
        }
        if c >= b'0' && c <= b'9' {
            table[i] |= ASCII_DIGIT | ASCII_IDENT_CONT;
        }
        if (c >= b'a' && c <= b'z') || (c >= b'A' && c <= b'Z') || c == b'_' {
            table[i] |= ASCII_IDENT_START | ASCII_IDENT_CONT;
        }
        i += 1;
    }
    table
}

const ASCII_CLASS: [u8; 256] = build_ascii_class();

#[inline]
fn ascii_flags(c: char) -> u8 {
    if c.is_ascii() { ASCII_CLASS[c as usize] } else { 0 }
}

#[inline]
fn is_space_char(c: char) -> bool {
    if c.is_ascii() {
        ascii_flags(c) & ASCII_WHITESPACE != 0
    } else {
        c.is_whitespace()
    }
}

#[inline]
fn is_ident_start(c: char) -> bool {
    if c.is_ascii() {
        ascii_flags(c) & ASCII_IDENT_START != 0
    } else {
        c.is_alphabetic()
    }
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    if c.is_ascii() {
        ascii_flags(c) & ASCII_IDENT_CONT != 0
    } else {
        c.is_alphanumeric()
    }
}

/// Tokenizer for the expression found between a pair of template markers.
pub struct Tokenizer<'a> {
    chars: Vec<char>,
    idx: usize,
    len: usize,
    pub tokens: Vec<Token>,
    pub token_spans: Option<Vec<Span>>,
    line: u32,
    column: u32,
    input: &'a str,
}

impl<'a> Tokenizer<'a> {
    pub fn tokenize(s: &str) -> Result<Vec<Token>> {
        let mut t = Tokenizer::new(s, false);
        t.parse()?;
        Ok(t.tokens)
    }

    /// Tokenize and return tokens with spans aligned by index
    pub fn tokenize_with_spans(s: &str) -> std::result::Result<(Vec<Token>, Vec<Span>), ParseError> {
        let mut t = Tokenizer::new(s, true);
        match t.parse() {
            Ok(()) => Ok((t.tokens, t.token_spans.unwrap_or_default())),
            Err(err) => Err(t.positioned_error(&err.to_string())),
        }
    }

    fn new(input: &'a str, with_spans: bool) -> Self {
        let chars: Vec<char> = input.chars().collect();
        Self {
            len: chars.len(),
            chars,
            idx: 0,
            tokens: Vec::with_capacity(input.len() / 4),
            token_spans: with_spans.then(|| Vec::with_capacity(input.len() / 4)),
            line: 1,
            column: 1,
            input,
        }
    }

    pub fn positioned_error(&self, msg: &str) -> ParseError {
        ParseError::at(msg.to_string(), self.current_position())
    }

    pub fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.idx)
    }

    fn eof(&self) -> bool {
        self.idx >= self.len
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.idx + 1).copied()
    }

    fn err<T: AsRef<str>>(&self, msg: T) -> String {
        let l_idx = self.idx.saturating_sub(5);
        let r_idx = (self.idx + 5).min(self.len);
        let near: String = self.chars[l_idx..r_idx].iter().collect();
        let ctx = match self.chars.get(self.idx) {
            Some(c) => format!("'{}' at index {}, near '{}'", c, self.idx, near),
            None => format!("at end, near '{}'", near),
        };
        format!("{} ({}) in `{}`", msg.as_ref(), ctx, self.input)
    }

    fn advance_char(&mut self) {
        if !self.eof() && self.chars[self.idx] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.idx += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.idx < self.len && is_space_char(self.chars[self.idx]) {
            self.advance_char();
        }
    }

    fn parse_str(&mut self) -> Result<()> {
        let mut content = String::new();
        let start_pos = self.current_position();
        let quote = self.chars[self.idx];
        self.advance_char();

        while !self.eof() {
            let c = self.chars[self.idx];
            if c == quote {
                self.advance_char();
                let end_pos = self.current_position();
                self.push_with_span(Token::Str(content), start_pos, end_pos);
                return Ok(());
            }
            if c == '\\' {
                self.advance_char();
                if self.eof() {
                    return Err(anyhow!(self.err("Incomplete escape sequence at end of string")));
                }
                let escaped = self.chars[self.idx];
                match escaped {
                    'n' => content.push('\n'),
                    'r' => content.push('\r'),
                    't' => content.push('\t'),
                    '\\' => content.push('\\'),
                    '\'' => content.push('\''),
                    '"' => content.push('"'),
                    '0' => content.push('\0'),
                    _ => {
                        content.push('\\');
                        content.push(escaped);
                    }
                }
                self.advance_char();
                continue;
            }
            content.push(c);
            self.advance_char();
        }

        Err(anyhow!(self.err("String not closed")))
    }

    fn parse_num(&mut self) -> Result<()> {
        let mut num = String::new();
        let start_pos = self.current_position();
        let mut seen_dot = false;
        let mut has_exp = false;

        while !self.eof() {
            let c = self.chars[self.idx];
            if c.is_ascii_digit() {
                num.push(c);
                self.advance_char();
            } else if c == '.' && !seen_dot && !has_exp {
                // `a.0.b` style access keeps the dot as an operator
                if !self.peek_next().is_some_and(|n| n.is_ascii_digit()) {
                    break;
                }
                num.push(c);
                self.advance_char();
                seen_dot = true;
            } else if (c == 'e' || c == 'E') && !has_exp {
                num.push(c);
                self.advance_char();
                has_exp = true;
                if !self.eof() && matches!(self.chars[self.idx], '+' | '-') {
                    num.push(self.chars[self.idx]);
                    self.advance_char();
                }
            } else {
                break;
            }
        }

        if num.ends_with(['e', 'E', '+', '-']) {
            return Err(anyhow!(self.err("Invalid number, incomplete exponent")));
        }

        let token = if seen_dot || has_exp {
            match num.parse() {
                Ok(f) => Token::Float(f),
                Err(_) => return Err(anyhow!("{}: {}", self.err("Invalid float"), num)),
            }
        } else {
            match num.parse() {
                Ok(i) => Token::Int(i),
                Err(_) => return Err(anyhow!("{}: {}", self.err("Invalid int"), num)),
            }
        };
        let end_pos = self.current_position();
        self.push_with_span(token, start_pos, end_pos);
        Ok(())
    }

    fn parse_id(&mut self) -> Result<()> {
        let start_pos = self.current_position();
        if !is_ident_start(self.chars[self.idx]) {
            return Err(anyhow!(self.err("Invalid identifier start or unknown character")));
        }
        let mut id = String::new();
        while !self.eof() && is_ident_continue(self.chars[self.idx]) {
            id.push(self.chars[self.idx]);
            self.advance_char();
        }
        let token = match id.as_str() {
            "true" => Token::Bool(true),
            "false" => Token::Bool(false),
            "nil" | "null" => Token::Nil,
            _ => Token::Id(id),
        };
        let end_pos = self.current_position();
        self.push_with_span(token, start_pos, end_pos);
        Ok(())
    }

    /// Consume `width` chars and emit `token` spanning them
    fn punct(&mut self, token: Token, width: usize) {
        let start = self.current_position();
        for _ in 0..width {
            self.advance_char();
        }
        let end = self.current_position();
        self.push_with_span(token, start, end);
    }

    fn parse_punctuations(&mut self) -> Result<()> {
        let c = self.chars[self.idx];
        let next = self.peek_next();
        match (c, next) {
            ('(', _) => self.punct(Token::LParen, 1),
            (')', _) => self.punct(Token::RParen, 1),
            ('{', _) => self.punct(Token::LBrace, 1),
            ('}', _) => self.punct(Token::RBrace, 1),
            ('[', _) => self.punct(Token::LBracket, 1),
            (']', _) => self.punct(Token::RBracket, 1),
            ('.', _) => self.punct(Token::Dot, 1),
            (':', _) => self.punct(Token::Colon, 1),
            (',', _) => self.punct(Token::Comma, 1),
            ('?', Some('?')) => self.punct(Token::NullishCoalescing, 2),
            ('?', _) => self.punct(Token::Question, 1),
            ('&', Some('&')) => self.punct(Token::And, 2),
            ('|', Some('|')) => self.punct(Token::Or, 2),
            ('+', _) => self.punct(Token::Add, 1),
            ('-', _) => self.punct(Token::Sub, 1),
            ('*', _) => self.punct(Token::Mul, 1),
            ('/', _) => self.punct(Token::Div, 1),
            ('%', _) => self.punct(Token::Mod, 1),
            ('=', Some('=')) => self.punct(Token::Eq, 2),
            ('!', Some('=')) => self.punct(Token::Ne, 2),
            ('!', _) => self.punct(Token::Not, 1),
            ('>', Some('=')) => self.punct(Token::Ge, 2),
            ('>', _) => self.punct(Token::Gt, 1),
            ('<', Some('=')) => self.punct(Token::Le, 2),
            ('<', _) => self.punct(Token::Lt, 1),
            ('&', _) => return Err(anyhow!(self.err("Expect '&&'"))),
            ('|', _) => return Err(anyhow!(self.err("Expect '||'"))),
            ('=', _) => return Err(anyhow!(self.err("Assignment is not allowed, expect '=='"))),
            _ => return Err(anyhow!(self.err("Unknown punctuation"))),
        }
        Ok(())
    }

    fn parse(&mut self) -> Result<()> {
        while !self.eof() {
            self.skip_whitespace();
            if self.eof() {
                break;
            }
            let c = self.chars[self.idx];
            match c {
                '"' | '\'' => self.parse_str()?,
                '0'..='9' => self.parse_num()?,
                _ if is_punctuation(c) => self.parse_punctuations()?,
                _ => self.parse_id()?,
            }
        }
        Ok(())
    }

    fn push_with_span(&mut self, token: Token, start: Position, end: Position) {
        self.tokens.push(token);
        if let Some(spans) = &mut self.token_spans {
            spans.push(Span::new(start, end));
        }
    }
}

fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '(' | ')'
            | '{'
            | '}'
            | '['
            | ']'
            | '.'
            | '?'
            | ':'
            | ','
            | '&'
            | '|'
            | '+'
            | '-'
            | '*'
            | '/'
            | '%'
            | '='
            | '!'
            | '>'
            | '<'
    )
}
