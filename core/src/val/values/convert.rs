use std::{collections::HashMap, sync::Arc};

use anyhow::Result;

use super::{Indirection, Mapping, Record, Sequence, Type, Val};
use crate::val::Func;

impl From<String> for Val {
    #[inline]
    fn from(s: String) -> Self {
        Val::Str(Arc::<str>::from(s))
    }
}

impl From<&str> for Val {
    #[inline]
    fn from(s: &str) -> Self {
        Val::Str(Arc::from(s))
    }
}

impl From<Arc<str>> for Val {
    #[inline]
    fn from(s: Arc<str>) -> Self {
        Val::Str(s)
    }
}

impl From<i64> for Val {
    #[inline]
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<i32> for Val {
    #[inline]
    fn from(i: i32) -> Self {
        Val::Int(i as i64)
    }
}

impl From<f64> for Val {
    #[inline]
    fn from(f: f64) -> Self {
        Val::Float(f)
    }
}

impl From<bool> for Val {
    #[inline]
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<Sequence> for Val {
    fn from(s: Sequence) -> Self {
        Val::Seq(s)
    }
}

impl From<Mapping> for Val {
    fn from(m: Mapping) -> Self {
        Val::Map(m)
    }
}

impl From<Record> for Val {
    fn from(r: Record) -> Self {
        Val::Record(r)
    }
}

impl From<Indirection> for Val {
    fn from(r: Indirection) -> Self {
        Val::Ref(r)
    }
}

impl From<Func> for Val {
    fn from(f: Func) -> Self {
        Val::Func(f)
    }
}

/// Builds an open mapping; entries follow the iteration order of the source map,
/// so sort first if the order matters.
impl<V, S, H> From<HashMap<S, V, H>> for Val
where
    V: Into<Val>,
    S: AsRef<str>,
    H: core::hash::BuildHasher,
{
    fn from(m: HashMap<S, V, H>) -> Self {
        let mut inner = Mapping::with_capacity(Type::Any, Type::Any, m.len());
        for (k, v) in m.into_iter() {
            inner.insert(k.as_ref(), v.into());
        }
        Val::Map(inner)
    }
}

impl<T> From<Vec<T>> for Val
where
    T: Into<Val>,
{
    fn from(v: Vec<T>) -> Self {
        Val::seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for Val
where
    T: Into<Val>,
{
    fn from(o: Option<T>) -> Self {
        match o {
            Some(v) => v.into(),
            None => Val::Nil,
        }
    }
}

impl From<()> for Val {
    fn from(_: ()) -> Self {
        Val::Nil
    }
}

impl From<serde_json::Value> for Val {
    fn from(val: serde_json::Value) -> Self {
        match val {
            serde_json::Value::String(s) => Val::Str(Arc::<str>::from(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Val::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Val::Float(f)
                } else {
                    Val::Nil
                }
            }
            serde_json::Value::Bool(b) => Val::Bool(b),
            serde_json::Value::Array(a) => Val::seq(a.into_iter().map(Val::from).collect()),
            serde_json::Value::Object(o) => {
                let mut m = Mapping::with_capacity(Type::Any, Type::Any, o.len());
                for (k, v) in o {
                    m.insert(k, Val::from(v));
                }
                Val::Map(m)
            }
            serde_json::Value::Null => Val::Nil,
        }
    }
}

impl From<serde_yaml::Value> for Val {
    fn from(val: serde_yaml::Value) -> Self {
        match val {
            serde_yaml::Value::String(s) => Val::Str(Arc::<str>::from(s)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Val::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Val::Float(f)
                } else {
                    Val::Nil
                }
            }
            serde_yaml::Value::Bool(b) => Val::Bool(b),
            serde_yaml::Value::Sequence(a) => Val::seq(a.into_iter().map(Val::from).collect()),
            // YAML keys are arbitrary nodes; keep them as values instead of dropping
            // the non-string ones.
            serde_yaml::Value::Mapping(o) => {
                let mut m = Mapping::with_capacity(Type::Any, Type::Any, o.len());
                for (k, v) in o {
                    m.insert(Val::from(k), Val::from(v));
                }
                Val::Map(m)
            }
            serde_yaml::Value::Null => Val::Nil,
            serde_yaml::Value::Tagged(tagged) => Val::from(tagged.value),
        }
    }
}

impl Val {
    /// Convert any serializable host value into an open-typed document
    pub fn try_from<T>(val: T) -> Result<Self>
    where
        T: serde::Serialize,
    {
        Ok(serde_json::to_value(val)?.into())
    }
}
