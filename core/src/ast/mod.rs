mod parser;

#[cfg(test)]
mod ast_test;

pub use parser::*;
