use anyhow::Context;
use tracing::debug;

use super::{
    error::{ErrorKind, EvalError, PathSegment},
    walker::Cursor,
};
use crate::val::{Func, Type, Val};

impl Cursor<'_> {
    /// Resolve a deferred call node `{ key: arg }` whose key denoted `func`.
    ///
    /// The argument tree is walked first, so nested calls inside it run before this
    /// one. The result replaces the whole mapping and is coerced to the position type.
    pub(super) fn deferred_call(&mut self, func: Func, key: &Val, arg: &Val, ty: &Type) -> Result<Val, EvalError> {
        let arg = self.within(PathSegment::Key(key.clone()), |c| c.node(arg, &Type::Any))?;

        debug!(function = func.name(), path = %self.path(), "invoking deferred call");
        let result = func
            .call(arg)
            .with_context(|| format!("{} failed", func.name()))
            .map_err(|e| self.fail(ErrorKind::Invocation, e))?;

        self.coerce_here(result, ty)
    }
}
