//! `{{ }}` templates: scanning, caching and the default [`Evaluate`] implementation.

mod engine;
mod error;
mod scanner;


pub use engine::{Engine, Evaluate, MAX_CHAIN_DEPTH, Mode};
pub use error::{CyclicReference, NotCallable};
pub use scanner::{Part, Template, is_template};
