use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::{
    ast::Parser,
    expr::{Expr, Scope},
    token::{ParseError, Tokenizer},
    val::Val,
};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const REFERENCE_MARKER: &str = "<-";

/// Whether a string is a template source. Escaped markers (`\{{`) still count: the
/// string is rendered so the escape is removed.
#[inline]
pub fn is_template(s: &str) -> bool {
    s.contains(OPEN)
}

/// One piece of a scanned template
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Lit(String),
    Expr {
        /// Expression text between the markers, trimmed
        source: String,
        expr: Arc<Expr>,
    },
}

/// A scanned and parsed template string
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
    reference: bool,
}

impl Template {
    /// Scan `source` into literal text and expressions.
    ///
    /// - `\{{` is a literal `{{`
    /// - `}}` inside a quoted string does not close the expression
    /// - `{{ expr <-}}` is the reference form, only valid as the whole template
    pub fn parse(source: &str) -> Result<Template, ParseError> {
        let mut parts = Vec::new();
        let mut lit = String::new();
        let mut reference = false;
        let mut rest = 0;

        while let Some(found) = source[rest..].find(OPEN) {
            let open = rest + found;
            if open > 0 && source.as_bytes()[open - 1] == b'\\' {
                lit.push_str(&source[rest..open - 1]);
                lit.push_str(OPEN);
                rest = open + OPEN.len();
                continue;
            }
            lit.push_str(&source[rest..open]);

            let body_start = open + OPEN.len();
            let Some(close) = find_close(&source[body_start..]) else {
                return Err(ParseError::at_offset("unterminated template expression", source, open));
            };
            let body = &source[body_start..body_start + close];
            rest = body_start + close + CLOSE.len();

            let mut text = body.trim();
            if let Some(stripped) = text.strip_suffix(REFERENCE_MARKER) {
                text = stripped.trim_end();
                reference = true;
            }
            if text.is_empty() {
                return Err(ParseError::at_offset("empty template expression", source, open));
            }

            let expr_offset = body_start + (body.len() - body.trim_start().len());
            let expr = parse_expr(source, text, expr_offset)?;

            if !lit.is_empty() {
                parts.push(Part::Lit(std::mem::take(&mut lit)));
            }
            parts.push(Part::Expr {
                source: text.to_string(),
                expr,
            });
        }
        lit.push_str(&source[rest..]);
        if !lit.is_empty() {
            parts.push(Part::Lit(lit));
        }

        if reference && !matches!(parts.as_slice(), [Part::Expr { .. }]) {
            return Err(ParseError::new(format!(
                "the reference marker `{REFERENCE_MARKER}` needs a template made of a single expression: {source}"
            )));
        }

        Ok(Template { parts, reference })
    }

    /// Parse through a process-wide cache keyed by the template source
    pub fn cached(source: &str) -> Result<Arc<Template>, ParseError> {
        use dashmap::mapref::entry::Entry;
        static TEMPLATE_CACHE: Lazy<DashMap<String, Arc<Template>>> = Lazy::new(DashMap::new);
        if let Some(found) = TEMPLATE_CACHE.get(source) {
            return Ok(found.value().clone());
        }
        let template = Arc::new(Template::parse(source)?);
        Ok(match TEMPLATE_CACHE.entry(source.to_string()) {
            Entry::Vacant(v) => {
                v.insert(template.clone());
                template
            }
            Entry::Occupied(o) => o.get().clone(),
        })
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `{{ expr <-}}`
    #[inline]
    pub fn is_reference(&self) -> bool {
        self.reference
    }

    /// The expression of a template made of exactly one `{{ }}` and nothing else
    pub fn single_expr(&self) -> Option<&Expr> {
        match self.parts.as_slice() {
            [Part::Expr { expr, .. }] => Some(expr),
            _ => None,
        }
    }

    /// A standalone expression yields its value untouched; anything mixed with text
    /// renders every expression to text and concatenates.
    pub fn execute(&self, scope: &mut dyn Scope) -> anyhow::Result<Val> {
        if let Some(expr) = self.single_expr() {
            return expr.eval(scope);
        }
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Lit(text) => out.push_str(text),
                Part::Expr { expr, .. } => out.push_str(&expr.eval(scope)?.render_text()),
            }
        }
        Ok(Val::from(out))
    }
}

/// Byte offset of the `}}` closing an expression body, skipping quoted strings
fn find_close(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                } else if bytes[i..].starts_with(CLOSE.as_bytes()) {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

fn parse_expr(source: &str, text: &str, offset: usize) -> Result<Arc<Expr>, ParseError> {
    if let Ok(expr) = Expr::parse_cached_arc(text) {
        return Ok(expr);
    }
    // Slow path only to locate the failure inside the whole template.
    let err = match Tokenizer::tokenize_with_spans(text) {
        Ok((tokens, spans)) => match Parser::new_with_spans(&tokens, &spans).parse_with_enhanced_errors() {
            Ok(expr) => return Ok(Arc::new(expr)),
            Err(err) => err,
        },
        Err(err) => err,
    };
    let local = err
        .span
        .as_ref()
        .map(|span| char_to_byte(text, span.start.offset))
        .unwrap_or(0);
    Err(ParseError::at_offset(err.message, source, offset + local))
}

fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices().nth(char_idx).map(|(b, _)| b).unwrap_or(text.len())
}
