use anyhow::{Result, anyhow};
use tracing::trace;

use super::{
    error::{CyclicReference, NotCallable},
    scanner::{Template, is_template},
};
use crate::{env::Env, expr::Scope, val::Val};

/// Longest chain of variables bound to templates that one lookup may follow
pub const MAX_CHAIN_DEPTH: usize = 64;

/// How a template source is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal substitution
    #[default]
    Render,
    /// Return the Function Object a `{{ expr <-}}` source denotes, without invoking it
    Reference,
}

/// Expression evaluation service consumed by the walker.
///
/// `Reference` mode fails with [`NotCallable`] when a reference-form source denotes
/// anything but a function; for every other source it behaves like `Render`.
pub trait Evaluate: Send + Sync {
    fn evaluate(&self, source: &str, env: &Env, mode: Mode) -> Result<Val>;
}

/// The built-in `{{ }}` template engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }
}

impl Evaluate for Engine {
    fn evaluate(&self, source: &str, env: &Env, mode: Mode) -> Result<Val> {
        let template = Template::cached(source)?;
        trace!(template = source, ?mode, "evaluating template");
        let mut scope = EnvScope { env, chain: Vec::new() };
        let value = template.execute(&mut scope)?;

        if mode == Mode::Reference && template.is_reference() {
            return match value.deref() {
                Val::Func(f) => Ok(Val::Func(f.clone())),
                other => Err(NotCallable {
                    source: source.to_string(),
                    found: other.type_name(),
                }
                .into()),
            };
        }
        Ok(value)
    }
}

/// Identifier resolution against an [`Env`] with chained resolution: a name bound to a
/// template string is rendered in the same environment before use.
struct EnvScope<'a> {
    env: &'a Env,
    /// Names currently being resolved, outermost first
    chain: Vec<String>,
}

impl Scope for EnvScope<'_> {
    fn resolve(&mut self, name: &str) -> Result<Val> {
        let val = self
            .env
            .lookup(name)
            .ok_or_else(|| anyhow!("Undefined variable: {name}"))?;
        let source = match val {
            Val::Str(s) if is_template(s) => s.clone(),
            other => return Ok(other.clone()),
        };

        if let Some(start) = self.chain.iter().position(|n| n == name) {
            let mut chain = self.chain[start..].to_vec();
            chain.push(name.to_string());
            return Err(CyclicReference {
                chain,
                depth_exceeded: false,
            }
            .into());
        }
        if self.chain.len() >= MAX_CHAIN_DEPTH {
            let mut chain = self.chain.clone();
            chain.push(name.to_string());
            return Err(CyclicReference {
                chain,
                depth_exceeded: true,
            }
            .into());
        }

        let template = Template::cached(&source)?;
        trace!(variable = name, depth = self.chain.len(), "resolving chained variable");
        self.chain.push(name.to_string());
        let out = template.execute(self);
        self.chain.pop();
        out
    }
}
