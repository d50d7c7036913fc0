pub mod call;
pub mod os;
pub mod string;

#[cfg(test)]
mod call_test;

use once_cell::sync::Lazy;
use scena_core::{Env, Func};
use tracing::debug;

static GLOBALS: Lazy<Vec<Func>> = Lazy::new(|| {
    vec![
        Func::new(call::Echo),
        Func::new(call::Join),
        Func::new(call::Call),
        string::len(),
        string::upper(),
        string::lower(),
    ]
});

/// Bind the built-in functions as globals
/// - echo({message}) / echo(x): the message, or the argument itself
/// - join({prefix, text, suffix}) / join(a, b, ...): concatenated text
/// - call({f, arg}) / call(f, arg): `f(arg)`
/// - len(x), upper(s), lower(s)
///
/// Existing bindings with the same names are replaced.
pub fn register_stdlib_globals(env: &mut Env) {
    for func in GLOBALS.iter() {
        env.define(func.name(), func.clone());
    }
    debug!(count = GLOBALS.len(), "registered stdlib globals");
}

/// Bind `env` to the process environment, e.g. `{{ env.HOME }}`
pub fn register_process_env(env: &mut Env) {
    let vars = os::process_env();
    debug!(count = vars.len(), "registered process environment");
    env.define("env", vars);
}
