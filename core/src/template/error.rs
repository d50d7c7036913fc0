use std::fmt;

/// A reference-form key (`{{name <-}}`) that does not denote a Function Object
#[derive(Debug, Clone, PartialEq)]
pub struct NotCallable {
    pub source: String,
    pub found: &'static str,
}

impl fmt::Display for NotCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` does not refer to a function (got {})", self.source, self.found)
    }
}

impl std::error::Error for NotCallable {}

/// Variable resolution re-entered a name already being resolved, or went too deep
#[derive(Debug, Clone, PartialEq)]
pub struct CyclicReference {
    /// Names in resolution order; for a cycle the last name repeats an earlier one
    pub chain: Vec<String>,
    pub depth_exceeded: bool,
}

impl fmt::Display for CyclicReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.depth_exceeded {
            write!(
                f,
                "cyclic variable reference: chain exceeds {} hops: {}",
                super::MAX_CHAIN_DEPTH,
                self.chain.join(" -> ")
            )
        } else {
            write!(f, "cyclic variable reference: {}", self.chain.join(" -> "))
        }
    }
}

impl std::error::Error for CyclicReference {}
