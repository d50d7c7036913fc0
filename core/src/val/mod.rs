pub mod de;
mod func;
mod values;

#[cfg(test)]
mod val_test;

pub use func::{Callable, Func, NativeFn};
pub use values::*;
