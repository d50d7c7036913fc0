//! Value-tree walker.
//!
//! Walks a document of any shape and returns an equivalent document where every
//! template leaf and template key has been resolved against an [`Env`]. Mappings with a
//! single template key that denotes a function are handed to the deferred-call
//! resolver (see `deferred.rs`).

use std::sync::Arc;

use tracing::{debug, trace};

use super::error::{ErrorKind, EvalError, Path, PathSegment};
use crate::{
    env::Env,
    template::{Engine, Evaluate, Mode, NotCallable, is_template},
    typ::{CoerceError, coerce},
    val::{Indirection, Mapping, Record, Sequence, Type, Val},
};

/// Resolve every template in `doc` with the built-in template engine
pub fn evaluate(doc: &Val, env: &Env) -> Result<Val, EvalError> {
    Walker::new(&Engine::new(), env).walk(doc)
}

/// Evaluates documents against one environment with any [`Evaluate`] implementation.
///
/// The walker only reads `env`; one environment can back many walks, on many threads.
#[derive(Clone, Copy)]
pub struct Walker<'a> {
    engine: &'a dyn Evaluate,
    env: &'a Env,
}

impl<'a> Walker<'a> {
    pub fn new(engine: &'a dyn Evaluate, env: &'a Env) -> Self {
        Self { engine, env }
    }

    /// Walk an open-typed document
    pub fn walk(&self, doc: &Val) -> Result<Val, EvalError> {
        self.walk_as(doc, &Type::Any)
    }

    /// Walk a document that fills a position of type `ty`
    pub fn walk_as(&self, doc: &Val, ty: &Type) -> Result<Val, EvalError> {
        debug!(bindings = self.env.len(), kind = doc.type_name(), "evaluating document");
        Cursor {
            walker: *self,
            path: Vec::new(),
        }
        .node(doc, ty)
    }
}

/// One walk in progress: the walker plus the path from the root to the current node
pub(super) struct Cursor<'a> {
    walker: Walker<'a>,
    path: Vec<PathSegment>,
}

impl Cursor<'_> {
    pub(super) fn node(&mut self, val: &Val, ty: &Type) -> Result<Val, EvalError> {
        match val {
            Val::Str(s) if is_template(s) => self.template(s, ty),
            Val::Seq(seq) => self.sequence(seq, ty),
            Val::Map(map) => self.mapping(map, ty),
            Val::Record(rec) => self.record(rec),
            Val::Ref(ind) => self.indirection(ind),
            // Non-template scalars are never coerced.
            Val::Nil | Val::Bool(_) | Val::Int(_) | Val::Float(_) | Val::Str(_) | Val::Func(_) => Ok(val.clone()),
        }
    }

    /// Run `f` with `segment` appended to the path
    pub(super) fn within<T>(
        &mut self,
        segment: PathSegment,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        self.path.push(segment);
        let out = f(self);
        self.path.pop();
        out
    }

    pub(super) fn path(&self) -> Path {
        Path(self.path.clone())
    }

    pub(super) fn fail(&self, kind: ErrorKind, err: anyhow::Error) -> EvalError {
        EvalError::wrap(kind, self.path(), err)
    }

    pub(super) fn coerce_here(&self, value: Val, ty: &Type) -> Result<Val, EvalError> {
        coerce(value, ty).map_err(|err| self.coercion_failed(err))
    }

    fn coercion_failed(&self, err: CoerceError) -> EvalError {
        let kind = if err.collision {
            ErrorKind::DuplicateKey
        } else {
            ErrorKind::Coercion
        };
        let path = self.path().join(&err.at);
        EvalError::wrap(kind, path, anyhow::Error::new(err))
    }

    pub(super) fn evaluate(&self, source: &str, mode: Mode) -> anyhow::Result<Val> {
        self.walker.engine.evaluate(source, self.walker.env, mode)
    }

    fn template(&mut self, source: &str, ty: &Type) -> Result<Val, EvalError> {
        let value = self
            .evaluate(source, Mode::Render)
            .map_err(|e| self.fail(ErrorKind::Expression, e))?;
        self.coerce_here(value, ty)
    }

    fn sequence(&mut self, seq: &Sequence, ty: &Type) -> Result<Val, EvalError> {
        let elem = match (&seq.elem, ty) {
            (Type::Any, Type::Seq(t)) => t.as_ref(),
            (declared, _) => declared,
        };
        let mut items = Vec::with_capacity(seq.len());
        for (i, item) in seq.items.iter().enumerate() {
            items.push(self.within(PathSegment::Index(i), |c| c.node(item, elem))?);
        }
        Ok(Val::Seq(Sequence::with_items(seq.elem.clone(), items)))
    }

    fn mapping(&mut self, map: &Mapping, ty: &Type) -> Result<Val, EvalError> {
        let (key_ty, value_ty) = match (&map.key, &map.value, ty) {
            (Type::Any, Type::Any, Type::Map(k, v)) => (k.as_ref(), v.as_ref()),
            (k, v, _) => (k, v),
        };

        // A lone template key may name a function: the whole mapping is then a call.
        let mut first_key = None;
        if let Some((key, arg)) = map.single()
            && let Val::Str(source) = key
            && is_template(source)
        {
            let resolved = self
                .within(PathSegment::Key(key.clone()), |c| c.reference_key(source))?;
            if let Val::Func(func) = resolved.deref() {
                return self.deferred_call(func.clone(), key, arg, ty);
            }
            first_key = Some(resolved);
        }

        let mut out = Mapping::with_capacity(map.key.clone(), map.value.clone(), map.len());
        for (k, v) in map.iter() {
            let key = match first_key.take() {
                Some(resolved) => self.within(PathSegment::Key(k.clone()), |c| c.coerce_here(resolved, key_ty))?,
                None => self.within(PathSegment::Key(k.clone()), |c| c.key(k, key_ty))?,
            };
            if out.contains_key(&key) {
                let path = self.path().join(&[PathSegment::Key(key.clone())]);
                return Err(EvalError::new(
                    ErrorKind::DuplicateKey,
                    path,
                    format!("key `{key}` appears more than once after evaluation"),
                ));
            }
            let value = self.within(PathSegment::Key(key.clone()), |c| c.node(v, value_ty))?;
            out.insert(key, value);
        }
        Ok(Val::Map(out))
    }

    fn key(&mut self, key: &Val, ty: &Type) -> Result<Val, EvalError> {
        match key {
            Val::Str(s) if is_template(s) => self.template(s, ty),
            other => Ok(other.clone()),
        }
    }

    fn reference_key(&mut self, source: &str) -> Result<Val, EvalError> {
        self.evaluate(source, Mode::Reference).map_err(|e| {
            let kind = if e.downcast_ref::<NotCallable>().is_some() {
                ErrorKind::UnresolvableReference
            } else {
                ErrorKind::Expression
            };
            self.fail(kind, e)
        })
    }

    fn record(&mut self, rec: &Record) -> Result<Val, EvalError> {
        let mut out = rec.clone();
        for field in out.fields.iter_mut() {
            if !field.settable {
                trace!(record = %rec.name, field = %field.name, "skipping unsettable field");
                continue;
            }
            let value = self.within(PathSegment::Field(field.name.clone()), |c| c.node(&field.value, &field.ty))?;
            field.value = value;
        }
        Ok(Val::Record(out))
    }

    fn indirection(&mut self, ind: &Indirection) -> Result<Val, EvalError> {
        let Some(cell) = &ind.cell else {
            return Ok(Val::Ref(ind.clone()));
        };
        let value = self.node(cell, &ind.target)?;
        if value == **cell {
            Ok(Val::Ref(ind.clone()))
        } else {
            Ok(Val::Ref(Indirection {
                target: ind.target.clone(),
                cell: Some(Arc::new(value)),
            }))
        }
    }
}
