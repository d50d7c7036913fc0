use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::{
    expr::Expr,
    op::{BinOp, UnaryOp},
    token::{ParseError, Span, Token},
    val::Val,
};

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    len: usize,
    token_spans: Option<&'a [Span]>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let len = tokens.len();
        Self {
            tokens,
            pos: 0,
            len,
            token_spans: None,
        }
    }

    /// Create a parser with token spans for precise error reporting
    pub fn new_with_spans(tokens: &'a [Token], spans: &'a [Span]) -> Self {
        let len = tokens.len();
        Self {
            tokens,
            pos: 0,
            len,
            token_spans: Some(spans),
        }
    }

    pub fn parse(&mut self) -> Result<Expr> {
        if self.eof() {
            return Ok(Expr::Val(Val::Nil));
        }

        let exp = self.parse_expr()?;

        if !self.eof() {
            return Err(anyhow!(self.err("Unexpected tokens at end")));
        }

        Ok(exp.fold_constants())
    }

    /// Parse and report failures with the span of the offending token
    pub fn parse_with_enhanced_errors(&mut self) -> std::result::Result<Expr, ParseError> {
        match self.parse() {
            Ok(expr) => Ok(expr),
            Err(err) => {
                let message = err.to_string();
                match self.token_spans {
                    Some(spans) if self.pos < spans.len() => Err(ParseError::spanned(message, spans[self.pos].clone())),
                    Some(spans) => match spans.last() {
                        Some(last) => Err(ParseError::at(message, last.end.clone())),
                        None => Err(ParseError::new(message)),
                    },
                    None => Err(ParseError::new(message)),
                }
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_conditional()
    }

    /// - `cond ? then : else` (ternary conditional)
    ///   Right-associative; precedence lower than nullish coalescing/or/and.
    fn parse_conditional(&mut self) -> Result<Expr> {
        let mut expr = self.parse_nullish_coalescing()?;
        if self.peek() == Some(&Token::Question) {
            self.pos += 1;

            let then_expr = self.parse_expr()?;

            if self.peek() != Some(&Token::Colon) {
                return Err(anyhow!(self.err("Expected ':' in ternary expression")));
            }
            self.pos += 1;

            let else_expr = self.parse_expr()?;

            expr = Expr::Conditional(Box::new(expr), Box::new(then_expr), Box::new(else_expr));
        }
        Ok(expr)
    }

    /// - `expr ?? expr` (nullish coalescing)
    fn parse_nullish_coalescing(&mut self) -> Result<Expr> {
        let mut expr = self.parse_or()?;
        while self.peek() == Some(&Token::NullishCoalescing) {
            self.pos += 1;
            let right = self.parse_or()?;
            expr = Expr::NullishCoalescing(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    /// - `expr || expr`
    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    /// `expr && expr`
    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_cmp()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_cmp()?;
            expr = Expr::And(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    /// - `expr == expr`
    /// - `expr != expr`
    ///   ...
    fn parse_cmp(&mut self) -> Result<Expr> {
        let mut expr = self.parse_add_sub()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                Token::Gt => BinOp::Gt,
                Token::Lt => BinOp::Lt,
                Token::Ge => BinOp::Ge,
                Token::Le => BinOp::Le,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_add_sub()?;
            expr = Expr::Bin(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    /// - `expr + expr`
    /// - `expr - expr`
    fn parse_add_sub(&mut self) -> Result<Expr> {
        let mut expr = self.parse_mul_div()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Add => BinOp::Add,
                Token::Sub => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_mul_div()?;
            expr = Expr::Bin(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    /// - `expr * expr`
    /// - `expr / expr`
    /// - `expr % expr`
    fn parse_mul_div(&mut self) -> Result<Expr> {
        let mut expr = self.parse_unary()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Mul => BinOp::Mul,
                Token::Div => BinOp::Div,
                Token::Mod => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            expr = Expr::Bin(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    /// - `!expr`
    /// - `-expr`
    /// - `expr`
    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            None => return Err(anyhow!(self.err("Expected expression"))),
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Sub) => UnaryOp::Neg,
            Some(_) => return self.parse_postfix(),
        };
        self.pos += 1;
        let expr = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(expr)))
    }

    /// - `primary`
    /// - `primary.field`
    /// - `primary[expr]`
    /// - `callee(args)` / `callee(name: expr, ...)`
    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    self.pos += 1;
                    expr = self.parse_call_args(expr)?;
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    if self.eof() {
                        return Err(anyhow!(self.err("Expected field name after '.'")));
                    }
                    let field = self.parse_field_name()?;
                    expr = Expr::Access(Box::new(expr), Box::new(field));
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    if !self.is_valid_expr_start() {
                        let msg = format!("Invalid index/key after '[', {:?}", self.peek().unwrap_or(&Token::Nil));
                        return Err(anyhow!(self.err(&msg)));
                    }
                    let index_expr = self.parse_expr()?;
                    self.expect(Token::RBracket, "to close index")?;
                    expr = Expr::Access(Box::new(expr), Box::new(index_expr));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Arguments after the opening '('. Named arguments (`id: expr`) may not be mixed with
    /// positional ones.
    fn parse_call_args(&mut self, callee: Expr) -> Result<Expr> {
        let mut pos_args: Vec<Box<Expr>> = Vec::new();
        let mut named_args: Vec<(String, Box<Expr>)> = Vec::new();

        while !self.eof() && self.tokens[self.pos] != Token::RParen {
            if let Token::Id(name) = &self.tokens[self.pos]
                && self.tokens.get(self.pos + 1) == Some(&Token::Colon)
            {
                if !pos_args.is_empty() {
                    return Err(anyhow!(self.err("Named arguments cannot follow positional arguments")));
                }
                let key = name.clone();
                self.pos += 2;
                named_args.push((key, Box::new(self.parse_expr()?)));
            } else {
                if !named_args.is_empty() {
                    return Err(anyhow!(self.err("Positional arguments cannot follow named arguments")));
                }
                pos_args.push(Box::new(self.parse_expr()?));
            }

            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RParen) => {}
                _ => return Err(anyhow!(self.err("Expected ',' or ')' in function call"))),
            }
        }

        self.expect(Token::RParen, "to close function call")?;

        if named_args.is_empty() {
            Ok(Expr::Call(Box::new(callee), pos_args))
        } else {
            Ok(Expr::CallNamed(Box::new(callee), named_args))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek() else {
            return Err(anyhow!(self.err("Unexpected end of input")));
        };

        let expr = match token {
            Token::Nil => Expr::Val(Val::Nil),
            Token::Bool(b) => Expr::Val(Val::Bool(*b)),
            Token::Int(i) => Expr::Val(Val::Int(*i)),
            Token::Float(f) => Expr::Val(Val::Float(*f)),
            Token::Str(s) => Expr::Val(Val::Str(Arc::from(s.as_str()))),
            Token::Id(id) => Expr::Var(id.clone()),
            Token::LBracket => return self.parse_list(),
            Token::LBrace => return self.parse_map(),
            Token::LParen => return self.parse_paren(),
            other => {
                let msg = format!("Unexpected token: {:?}", other);
                return Err(anyhow!(self.err(&msg)));
            }
        };
        self.pos += 1;
        Ok(expr)
    }

    fn parse_paren(&mut self) -> Result<Expr> {
        self.expect(Token::LParen, "")?;
        let expr = self.parse_expr()?;
        self.expect(Token::RParen, "to close parenthesis")?;
        Ok(Expr::Paren(Box::new(expr)))
    }

    /// Parse list literal: `[expr, expr, ...]`
    fn parse_list(&mut self) -> Result<Expr> {
        self.expect(Token::LBracket, "")?;
        let mut elements = Vec::new();

        while self.peek() != Some(&Token::RBracket) {
            if !self.is_valid_expr_start() {
                let msg = format!("Invalid list element: {:?}", self.peek().unwrap_or(&Token::Nil));
                return Err(anyhow!(self.err(&msg)));
            }
            elements.push(Box::new(self.parse_expr()?));

            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RBracket) => {}
                other => {
                    let msg = format!("Expecting ',' or ']', found {:?}", other.unwrap_or(&Token::Nil));
                    return Err(anyhow!(self.err(&msg)));
                }
            }
        }
        self.pos += 1;

        Ok(Expr::List(elements))
    }

    /// Parse map literal: `{key: value, key: value, ...}`. Bare identifiers used as keys
    /// are taken literally, as in YAML flow mappings.
    fn parse_map(&mut self) -> Result<Expr> {
        self.expect(Token::LBrace, "")?;
        let mut pairs = Vec::new();

        while self.peek() != Some(&Token::RBrace) {
            if !self.is_valid_expr_start() {
                let msg = format!("Invalid map key start: {:?}", self.peek().unwrap_or(&Token::Nil));
                return Err(anyhow!(self.err(&msg)));
            }

            let key = match (self.peek(), self.tokens.get(self.pos + 1)) {
                (Some(Token::Id(id)), Some(Token::Colon)) => {
                    let key = Expr::Val(Val::Str(Arc::from(id.as_str())));
                    self.pos += 1;
                    key
                }
                _ => self.parse_expr()?,
            };

            self.expect(Token::Colon, "after map key")?;

            if !self.is_valid_expr_start() {
                let msg = format!("Invalid map value after ':', {:?}", self.peek().unwrap_or(&Token::Nil));
                return Err(anyhow!(self.err(&msg)));
            }
            let value = self.parse_expr()?;
            pairs.push((Box::new(key), Box::new(value)));

            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::RBrace) => {}
                other => {
                    let msg = format!("Expecting ',' or '}}', found {:?}", other.unwrap_or(&Token::Nil));
                    return Err(anyhow!(self.err(&msg)));
                }
            }
        }
        self.pos += 1;

        Ok(Expr::Map(pairs))
    }

    /// Parse field name for .field access; identifiers become string keys
    fn parse_field_name(&mut self) -> Result<Expr> {
        let expr = match &self.tokens[self.pos] {
            Token::Id(id) => Expr::Val(Val::Str(Arc::from(id.as_str()))),
            Token::Str(s) => Expr::Val(Val::Str(Arc::from(s.as_str()))),
            Token::Int(i) => Expr::Val(Val::Int(*i)),
            // `true`/`false`/`nil` lex as literals but are valid field names after a dot
            Token::Bool(b) => Expr::Val(Val::Str(Arc::from(if *b { "true" } else { "false" }))),
            Token::Nil => Expr::Val(Val::Str(Arc::from("nil"))),
            other => {
                let msg = format!("Invalid field name: {:?}", other);
                return Err(anyhow!(self.err(&msg)));
            }
        };
        self.pos += 1;
        Ok(expr)
    }

    /// Check if the current token can start a valid expression
    fn is_valid_expr_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Nil
                    | Token::Bool(_)
                    | Token::Int(_)
                    | Token::Float(_)
                    | Token::Str(_)
                    | Token::Id(_)
                    | Token::LBracket
                    | Token::LBrace
                    | Token::LParen
                    | Token::Not
                    | Token::Sub
            )
        )
    }

    fn expect(&mut self, token: Token, context: &str) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            return Ok(());
        }
        let found = self.peek().unwrap_or(&Token::Nil);
        let msg = if context.is_empty() {
            format!("Expecting {:?}, found {:?}", token, found)
        } else {
            format!("Expecting {:?} {}, found {:?}", token, context, found)
        };
        Err(anyhow!(self.err(&msg)))
    }

    #[inline]
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn eof(&self) -> bool {
        self.pos >= self.len
    }

    fn err(&self, msg: &str) -> String {
        match self.tokens.get(self.pos) {
            Some(c) => format!("Syntax error: {} ('{:?}' at token {})", msg, c, self.pos),
            None => format!("Syntax error: {} (at end)", msg),
        }
    }
}

impl Expr {
    /// Constant folding: compute pure constant sub-expressions ahead of time.
    /// Sub-expressions whose evaluation fails (like `1 / 0`) stay unfolded so the error
    /// surfaces when the template is rendered.
    pub(crate) fn fold_constants(self) -> Expr {
        match self {
            Expr::Bin(l, op, r) => {
                let left = l.fold_constants();
                let right = r.fold_constants();
                if let (Expr::Val(lv), Expr::Val(rv)) = (&left, &right)
                    && let Ok(v) = op.eval_vals(lv, rv)
                {
                    return Expr::Val(v);
                }
                Expr::Bin(Box::new(left), op, Box::new(right))
            }
            Expr::Unary(op, e) => {
                let inner = e.fold_constants();
                if let Expr::Val(v) = &inner
                    && let Ok(folded) = op.eval_val(v)
                {
                    return Expr::Val(folded);
                }
                Expr::Unary(op, Box::new(inner))
            }
            Expr::And(l, r) => fold_logic(l.fold_constants(), r.fold_constants(), false),
            Expr::Or(l, r) => fold_logic(l.fold_constants(), r.fold_constants(), true),
            Expr::Paren(e) => Expr::Paren(Box::new(e.fold_constants())),
            Expr::Conditional(c, t, e) => Expr::Conditional(
                Box::new(c.fold_constants()),
                Box::new(t.fold_constants()),
                Box::new(e.fold_constants()),
            ),
            Expr::NullishCoalescing(l, r) => {
                Expr::NullishCoalescing(Box::new(l.fold_constants()), Box::new(r.fold_constants()))
            }
            Expr::Access(e, field) => Expr::Access(Box::new(e.fold_constants()), Box::new(field.fold_constants())),
            Expr::Call(callee, args) => Expr::Call(
                callee,
                args.into_iter().map(|a| Box::new(a.fold_constants())).collect(),
            ),
            Expr::CallNamed(callee, args) => Expr::CallNamed(
                callee,
                args.into_iter()
                    .map(|(n, a)| (n, Box::new(a.fold_constants())))
                    .collect(),
            ),
            Expr::List(items) => Expr::List(items.into_iter().map(|e| Box::new(e.fold_constants())).collect()),
            Expr::Map(pairs) => Expr::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (Box::new(k.fold_constants()), Box::new(v.fold_constants())))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Fold `&&`/`||` when both sides are boolean literals
fn fold_logic(left: Expr, right: Expr, is_or: bool) -> Expr {
    if let (Expr::Val(Val::Bool(l)), Expr::Val(Val::Bool(r))) = (&left, &right) {
        return Expr::Val(Val::Bool(if is_or { *l || *r } else { *l && *r }));
    }
    if is_or {
        Expr::Or(Box::new(left), Box::new(right))
    } else {
        Expr::And(Box::new(left), Box::new(right))
    }
}
