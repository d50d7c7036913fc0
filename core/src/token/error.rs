use std::fmt;

/// 1-based line/column plus the offset it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Position of byte `offset` in `text`
    pub fn locate(text: &str, offset: usize) -> Self {
        let mut end = offset.min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let before = &text[..end];
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() as u32 + 1;
        Self::new(line, column, offset)
    }
}

/// Source range of a token; `start == end` for a point
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (s, e) = (&self.start, &self.end);
        match (s.line == e.line, s.column == e.column) {
            (true, true) => write!(f, "{}:{}", s.line, s.column),
            (true, false) => write!(f, "{}:{}-{}", s.line, s.column, e.column),
            _ => write!(f, "{}:{}-{}:{}", s.line, s.column, e.line, e.column),
        }
    }
}

/// Error raised while scanning a template or parsing one of its expressions
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    pub fn new(message: String) -> Self {
        Self { message, span: None }
    }

    pub fn spanned(message: String, span: Span) -> Self {
        Self {
            message,
            span: Some(span),
        }
    }

    pub fn at(message: String, position: Position) -> Self {
        Self::spanned(message, Span::new(position.clone(), position))
    }

    /// Error located at byte `offset` of `text`
    pub fn at_offset(message: impl Into<String>, text: &str, offset: usize) -> Self {
        Self::at(message.into(), Position::locate(text, offset))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} at {}", self.message, span),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ParseError {}
