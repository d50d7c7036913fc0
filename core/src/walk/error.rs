use std::{fmt, sync::Arc};

use crate::val::Val;

/// One step from the document root to a node
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Mapping entry, by its (evaluated when possible) key
    Key(Val),
    /// Sequence element
    Index(usize),
    /// Record field
    Field(Arc<str>),
}

/// Location of a node, rendered like `$.a.b[2]`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path(pub Vec<PathSegment>);

impl Path {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// `self` followed by `tail`
    pub fn join(&self, tail: &[PathSegment]) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + tail.len());
        segments.extend_from_slice(&self.0);
        segments.extend_from_slice(tail);
        Path(segments)
    }
}

fn is_plain_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain_name(name) {
        write!(f, ".{name}")
    } else {
        write!(f, ".{name:?}")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Field(name) => write_name(f, name)?,
                PathSegment::Key(Val::Str(name)) => write_name(f, name)?,
                // Non-string keys print bare, so the int key 1 (`.1`) stays distinct
                // from the string key "1" (`."1"`).
                PathSegment::Key(other) => write!(f, ".{other}")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The expression engine failed: syntax, unknown identifier, bad operands
    Expression,
    /// A deferred-call key did not resolve to a Function Object
    UnresolvableReference,
    /// A Function Object returned an error
    Invocation,
    /// A resolved value does not fit the type of its position
    Coercion,
    /// Two keys of one mapping evaluated to the same value
    DuplicateKey,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Expression => "expression error",
            ErrorKind::UnresolvableReference => "unresolvable reference",
            ErrorKind::Invocation => "invocation error",
            ErrorKind::Coercion => "coercion error",
            ErrorKind::DuplicateKey => "duplicate key",
        };
        f.write_str(s)
    }
}

/// Failure of a whole evaluation call, located at the first failing node
#[derive(Debug)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub path: Path,
    pub message: String,
    pub source: Option<anyhow::Error>,
}

impl EvalError {
    pub fn new(kind: ErrorKind, path: Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a lower-level error, keeping its full context chain in the message
    pub fn wrap(kind: ErrorKind, path: Path, source: anyhow::Error) -> Self {
        Self {
            kind,
            path,
            message: format!("{source:#}"),
            source: Some(source),
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Typed access to the underlying error, e.g. a cyclic reference
    pub fn downcast_source<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.source.as_ref().and_then(|e| e.downcast_ref::<E>())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind, self.path, self.message)
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}
