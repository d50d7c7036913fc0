mod deferred;
mod error;
mod walker;

#[cfg(test)]
mod walk_test;

pub use error::{ErrorKind, EvalError, Path, PathSegment};
pub use walker::{Walker, evaluate};
