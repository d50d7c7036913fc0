//! echo, join and call: the functions deferred-call documents are usually built from.
//!
//! Each accepts either a mapping of named parameters (the document form) or positional
//! arguments (the inline `{{ f(a, b) }}` form, which arrives as a sequence).

use anyhow::{Result, anyhow};
use scena_core::val::{Callable, Mapping, Val};

fn param<'a>(map: &'a Mapping, name: &str) -> &'a Val {
    static NIL: Val = Val::Nil;
    map.get_str(name).unwrap_or(&NIL)
}

/// Returns `message` from a mapping argument, any other argument unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Callable for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn call(&self, arg: Val) -> Result<Val> {
        match arg {
            Val::Map(m) if m.get_str("message").is_some() => Ok(param(&m, "message").clone()),
            other => Ok(other),
        }
    }
}

/// Concatenates `prefix`, `text` and `suffix`; missing parts are empty
#[derive(Debug, Clone, Copy, Default)]
pub struct Join;

impl Callable for Join {
    fn name(&self) -> &str {
        "join"
    }

    fn call(&self, arg: Val) -> Result<Val> {
        let mut out = String::new();
        match arg.deref() {
            Val::Map(m) => {
                for part in ["prefix", "text", "suffix"] {
                    out.push_str(&param(m, part).render_text());
                }
            }
            Val::Seq(s) => {
                for item in &s.items {
                    out.push_str(&item.render_text());
                }
            }
            Val::Nil => {}
            Val::Str(_) | Val::Int(_) | Val::Float(_) | Val::Bool(_) => out.push_str(&arg.render_text()),
            other => return Err(anyhow!("join() expects a mapping or a list, got {}", other.type_name())),
        }
        Ok(Val::from(out))
    }
}

/// Invokes the function in `f` with `arg`
#[derive(Debug, Clone, Copy, Default)]
pub struct Call;

impl Callable for Call {
    fn name(&self) -> &str {
        "call"
    }

    fn call(&self, arg: Val) -> Result<Val> {
        let (f, arg) = match arg.deref() {
            Val::Map(m) => (param(m, "f").clone(), param(m, "arg").clone()),
            Val::Seq(s) if s.len() == 2 => (s.items[0].clone(), s.items[1].clone()),
            Val::Func(f) => (Val::Func(f.clone()), Val::Nil),
            other => {
                return Err(anyhow!(
                    "call() expects {{f, arg}} or (f, arg), got {}",
                    other.type_name()
                ));
            }
        };
        match f.deref() {
            Val::Func(f) => f.call(arg),
            other => Err(anyhow!("call() `f` must be a function, got {}", other.type_name())),
        }
    }
}
