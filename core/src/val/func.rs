use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use super::Val;

/// A Function Object: something a document can invoke with a single argument tree.
///
/// Implementations must be synchronous from the evaluator's point of view. They may
/// close over external resources (clients, files), which is why the trait requires
/// `Send + Sync`: one environment can be shared by evaluations running on different
/// threads.
pub trait Callable: Send + Sync {
    /// Name used in diagnostics and when the function is rendered as a value
    fn name(&self) -> &str;

    /// Invoke with the fully resolved argument tree
    fn call(&self, arg: Val) -> Result<Val>;
}

/// Shared handle to a [`Callable`]
#[derive(Clone)]
pub struct Func(Arc<dyn Callable>);

impl Func {
    pub fn new<C: Callable + 'static>(callable: C) -> Self {
        Func(Arc::new(callable))
    }

    /// Wrap a plain closure
    pub fn native<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Val) -> Result<Val> + Send + Sync + 'static,
    {
        Func::new(NativeFn::new(name, f))
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    pub fn call(&self, arg: Val) -> Result<Val> {
        self.0.call(arg)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Func) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// Print only the name; closures can capture arbitrary state.
impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({})", self.name())
    }
}

impl PartialEq for Func {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// Adapter turning any `Fn(Val) -> Result<Val>` into a [`Callable`]
pub struct NativeFn<F> {
    name: String,
    f: F,
}

impl<F> NativeFn<F>
where
    F: Fn(Val) -> Result<Val> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> Callable for NativeFn<F>
where
    F: Fn(Val) -> Result<Val> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, arg: Val) -> Result<Val> {
        (self.f)(arg)
    }
}
