use std::{fmt::Display, sync::Arc};

use anyhow::{Result, anyhow};
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::{
    ast::Parser,
    op::{BinOp, UnaryOp},
    token::Tokenizer,
    val::{Mapping, Type, Val},
};

/// Grammar (abridged):
/// exp     ::= cond
/// cond    ::= nullish ['?' exp ':' exp]
/// nullish ::= or {'??' or}
/// or      ::= and {'||' and}
/// and     ::= cmp {'&&' cmp}
/// cmp     ::= addsub {('<' | '>' | '<=' | '>=' | '!=' | '==') addsub}
/// addsub  ::= muldiv {('+' | '-') muldiv}
/// muldiv  ::= unary {('*' | '/' | '%') unary}
/// unary   ::= {'!' | '-'} postfix
/// postfix ::= primary { call | dot | index }
/// call    ::= '(' [arg {',' arg}] ')'
/// arg     ::= exp | id ':' exp
/// primary ::= nil | false | true | int | float | string | list | map | var | paren
/// field   ::= id | int | string
/// list    ::= '[' [exp {',' exp}] ']'
/// map     ::= '{' [exp ':' exp {',' exp ':' exp}] '}'
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Val(Val),
    Var(String),
    Paren(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Bin(Box<Expr>, BinOp, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    NullishCoalescing(Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    /// `expr.field` or `expr[index]`
    Access(Box<Expr>, Box<Expr>),
    /// Positional call `f(a, b)`
    Call(Box<Expr>, Vec<Box<Expr>>),
    /// Named call `f(a: 1, b: 2)`; the arguments reach the function as one mapping
    CallNamed(Box<Expr>, Vec<(String, Box<Expr>)>),
    List(Vec<Box<Expr>>),
    Map(Vec<(Box<Expr>, Box<Expr>)>),
}

/// Identifier resolution for [`Expr::eval`].
///
/// The template engine implements this on top of an [`crate::env::Env`] and adds chained
/// resolution; tests can plug in anything that maps names to values.
pub trait Scope {
    fn resolve(&mut self, name: &str) -> Result<Val>;
}

impl Expr {
    pub fn eval(&self, scope: &mut dyn Scope) -> Result<Val> {
        match self {
            Expr::Val(val) => Ok(val.clone()),
            Expr::Var(name) => scope.resolve(name),
            Expr::Paren(expr) => expr.eval(scope),
            Expr::Unary(op, expr) => op.eval_val(&expr.eval(scope)?),
            Expr::Bin(l, op, r) => {
                let lval = l.eval(scope)?;
                let rval = r.eval(scope)?;
                op.eval_vals(&lval, &rval)
            }
            Expr::And(l, r) => {
                if truthy(&l.eval(scope)?) {
                    Ok(Val::Bool(truthy(&r.eval(scope)?)))
                } else {
                    Ok(Val::Bool(false))
                }
            }
            Expr::Or(l, r) => {
                if truthy(&l.eval(scope)?) {
                    Ok(Val::Bool(true))
                } else {
                    Ok(Val::Bool(truthy(&r.eval(scope)?)))
                }
            }
            Expr::NullishCoalescing(l, r) => {
                let lv = l.eval(scope)?;
                if lv.deref().is_nil() { r.eval(scope) } else { Ok(lv) }
            }
            Expr::Conditional(c, t, e) => {
                if truthy(&c.eval(scope)?) {
                    t.eval(scope)
                } else {
                    e.eval(scope)
                }
            }
            Expr::Access(expr, field) => {
                let val = expr.eval(scope)?;
                let field_val = field.eval(scope)?;
                access(&val, &field_val)
            }
            Expr::Call(callee, args) => {
                let func = callee.eval(scope)?;
                let mut argv = Vec::with_capacity(args.len());
                for a in args {
                    argv.push(a.eval(scope)?);
                }
                let arg = match argv.len() {
                    0 => Val::Nil,
                    1 => argv.pop().unwrap_or_default(),
                    _ => Val::seq(argv),
                };
                call(callee, &func, arg)
            }
            Expr::CallNamed(callee, named) => {
                let func = callee.eval(scope)?;
                let mut arg = Mapping::with_capacity(Type::Str, Type::Any, named.len());
                for (name, e) in named {
                    if arg.insert(name.as_str(), e.eval(scope)?).is_some() {
                        return Err(anyhow!("Duplicate named argument '{name}' in call to {callee}"));
                    }
                }
                call(callee, &func, Val::Map(arg))
            }
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for e in items {
                    out.push(e.eval(scope)?);
                }
                Ok(Val::seq(out))
            }
            Expr::Map(pairs) => {
                let mut map = Mapping::with_capacity(Type::Any, Type::Any, pairs.len());
                for (k, v) in pairs {
                    let key = k.eval(scope)?;
                    if !matches!(key, Val::Nil | Val::Bool(_) | Val::Int(_) | Val::Float(_) | Val::Str(_)) {
                        return Err(anyhow!("Map key must be a scalar, got {}", key.type_name()));
                    }
                    let value = v.eval(scope)?;
                    map.insert(key, value);
                }
                Ok(Val::Map(map))
            }
        }
    }

    /// Cached parsing: parse an expression once per process and share the AST
    pub fn parse_cached_arc(expression: &str) -> Result<Arc<Expr>> {
        use dashmap::mapref::entry::Entry;
        static PARSE_CACHE: Lazy<DashMap<String, Arc<Expr>>> = Lazy::new(DashMap::new);
        if let Some(found) = PARSE_CACHE.get(expression) {
            return Ok(found.value().clone());
        }
        let expr_arc = Arc::new(into_expr(expression)?);
        Ok(match PARSE_CACHE.entry(expression.to_string()) {
            Entry::Vacant(v) => {
                v.insert(expr_arc.clone());
                expr_arc
            }
            Entry::Occupied(o) => o.get().clone(),
        })
    }
}

/// `false` and absent values are falsy, everything else is truthy
fn truthy(val: &Val) -> bool {
    !matches!(val.deref(), Val::Bool(false) | Val::Nil)
}

fn call(callee: &Expr, func: &Val, arg: Val) -> Result<Val> {
    match func.deref() {
        Val::Func(f) => f.call(arg).map_err(|e| e.context(format!("failed to call {}", f.name()))),
        other => Err(anyhow!("{callee} is not a function (got {})", other.type_name())),
    }
}

/// Member access. Missing keys and fields give `Nil` so that `a.b ?? c` works;
/// indexing into a scalar is an error.
fn access(val: &Val, field: &Val) -> Result<Val> {
    match (val.deref(), field.deref()) {
        (Val::Map(map), key) => Ok(map.get(key).cloned().unwrap_or_default()),
        (Val::Record(rec), Val::Str(name)) => Ok(rec.get(name).cloned().unwrap_or_default()),
        (Val::Seq(seq), Val::Int(i)) => Ok(seq.get(*i).cloned().unwrap_or_default()),
        (Val::Str(s), Val::Int(i)) => {
            let len = s.chars().count() as i64;
            let idx = if *i < 0 { len + i } else { *i };
            Ok(usize::try_from(idx)
                .ok()
                .and_then(|idx| s.chars().nth(idx))
                .map(|c| Val::from(c.to_string()))
                .unwrap_or_default())
        }
        (Val::Nil, _) => Ok(Val::Nil),
        (v, f) => Err(anyhow!("Cannot index {} with {}", v.type_name(), f.type_name())),
    }
}

fn into_expr<S: AsRef<str>>(s: S) -> Result<Expr> {
    let tokens = Tokenizer::tokenize(s.as_ref())?;
    Parser::new(&tokens).parse()
}

impl TryFrom<&str> for Expr {
    type Error = anyhow::Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        into_expr(value)
    }
}

impl TryFrom<String> for Expr {
    type Error = anyhow::Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        into_expr(value)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Val(Val::Str(s)) => write!(f, "{:?}", s.as_ref()),
            Expr::Val(val) => write!(f, "{val}"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Paren(expr) => write!(f, "({expr})"),
            Expr::Unary(op, expr) => write!(f, "{op}{expr}"),
            Expr::Bin(left, op, right) => write!(f, "{left} {op} {right}"),
            Expr::And(left, right) => write!(f, "{left} && {right}"),
            Expr::Or(left, right) => write!(f, "{left} || {right}"),
            Expr::NullishCoalescing(left, right) => write!(f, "{left} ?? {right}"),
            Expr::Conditional(c, t, e) => write!(f, "{c} ? {t} : {e}"),
            Expr::Access(expr, field) => match field.as_ref() {
                Expr::Val(Val::Str(name)) => write!(f, "{expr}.{name}"),
                other => write!(f, "{expr}[{other}]"),
            },
            Expr::Call(callee, args) => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{callee}({})", args.join(", "))
            }
            Expr::CallNamed(callee, args) => {
                let args: Vec<String> = args.iter().map(|(n, a)| format!("{n}: {a}")).collect();
                write!(f, "{callee}({})", args.join(", "))
            }
            Expr::List(items) => {
                let items: Vec<String> = items.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Expr::Map(pairs) => {
                let pairs: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}
