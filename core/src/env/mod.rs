//! Variable environment: the name to value bindings one evaluation sees.

use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::{
    util::fast_map::{FastHashMap, fast_hash_map_new, fast_hash_map_with_capacity},
    val::{Func, Mapping, Val},
};


/// Ordered name → value bindings.
///
/// Bound values may be plain values, Function Objects or unevaluated template strings;
/// the latter are resolved lazily by the template engine when looked up. An `Env` is
/// never written to during an evaluation, so one instance can be shared by concurrent
/// evaluations.
#[derive(Debug, Clone, Default)]
pub struct Env {
    entries: Vec<(Arc<str>, Val)>,
    index: FastHashMap<Arc<str>, usize>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: fast_hash_map_new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: fast_hash_map_with_capacity(capacity),
        }
    }

    /// Bind `name`, replacing an earlier binding in place
    pub fn define(&mut self, name: impl AsRef<str>, value: impl Into<Val>) -> Option<Val> {
        let name = name.as_ref();
        let value = value.into();
        if let Some(&idx) = self.index.get(name) {
            return Some(std::mem::replace(&mut self.entries[idx].1, value));
        }
        let key: Arc<str> = Arc::from(name);
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    /// Builder form of [`Env::define`]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<Val>) -> Self {
        self.define(name, value);
        self
    }

    /// Bind a native closure under `name`
    pub fn define_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(Val) -> Result<Val> + Send + Sync + 'static,
    {
        self.define(name, Func::native(name, f));
    }

    /// Raw binding; template strings are returned unevaluated
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<&Val> {
        self.index.get(name).map(|&idx| &self.entries[idx].1)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Bindings in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Val)> {
        self.entries.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_ref())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge every binding of `other`; later bindings win
    pub fn extend_from(&mut self, other: &Env) {
        for (name, value) in other.iter() {
            self.define(name, value.clone());
        }
    }

    /// Build from a loaded document. The top level has to be a mapping with string keys,
    /// which is what a YAML/JSON/TOML vars file looks like.
    pub fn from_document(doc: &Val) -> Result<Self> {
        match doc.deref() {
            Val::Map(map) => Self::from_mapping(map),
            Val::Nil => Ok(Self::new()),
            other => Err(anyhow!("variables must be a mapping, got {}", other.type_name())),
        }
    }

    pub fn from_mapping(map: &Mapping) -> Result<Self> {
        let mut env = Self::with_capacity(map.len());
        for (key, value) in map.iter() {
            let Some(name) = key.as_str() else {
                return Err(anyhow!("variable names must be strings, got {} key {key}", key.type_name()));
            };
            env.define(name, value.clone());
        }
        Ok(env)
    }
}

impl<K, V> FromIterator<(K, V)> for Env
where
    K: AsRef<str>,
    V: Into<Val>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut env = Env::new();
        env.extend(iter);
        env
    }
}

impl<K, V> Extend<(K, V)> for Env
where
    K: AsRef<str>,
    V: Into<Val>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.define(k, v);
        }
    }
}

impl From<&Env> for Val {
    /// Snapshot as a string-keyed mapping, used when rendering `--vars` back out
    fn from(env: &Env) -> Self {
        let mut map = Mapping::with_capacity(crate::val::Type::Str, crate::val::Type::Any, env.len());
        for (name, value) in env.iter() {
            map.insert(name, value.clone());
        }
        Val::Map(map)
    }
}
