pub mod ast;
pub mod env;
pub mod expr;
mod op;
pub mod template;
pub mod token;
pub mod typ;
pub mod util;
pub mod val;

// Document walker and deferred calls
pub mod walk;

pub use env::Env;
pub use template::{Engine, Evaluate, Mode};
pub use typ::coerce;
pub use val::{Callable, Func, Type, Val};
pub use walk::{ErrorKind, EvalError, Walker, evaluate};
