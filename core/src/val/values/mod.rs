use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::Func;

mod convert;
mod ops;
mod types;

pub use types::Type;

/// A document node.
///
/// Containers carry the static type of their element positions so the walker knows
/// what each resolved template has to be coerced into. Documents loaded from YAML/JSON
/// are fully open-typed (`Type::Any` everywhere).
#[derive(Debug, Default, Clone)]
pub enum Val {
    /// Absent value
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// String type, wrapped in Arc<str> for cheap cloning
    Str(Arc<str>),
    Seq(Sequence),
    Map(Mapping),
    Record(Record),
    Ref(Indirection),
    Func(Func),
}

/// Ordered elements sharing one declared element type
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub elem: Type,
    pub items: Vec<Val>,
}

impl Sequence {
    pub fn new(elem: Type) -> Self {
        Self { elem, items: Vec::new() }
    }

    pub fn with_items(elem: Type, items: Vec<Val>) -> Self {
        Self { elem, items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index with negative values counting from the end
    pub fn get(&self, idx: i64) -> Option<&Val> {
        let idx = if idx < 0 { self.items.len() as i64 + idx } else { idx };
        usize::try_from(idx).ok().and_then(|i| self.items.get(i))
    }
}

/// Insertion-ordered key/value pairs with unique keys.
///
/// Keys are arbitrary scalars (YAML allows `1: one`), so lookup is a linear scan;
/// scenario documents are small enough that this beats hashing `Val`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub key: Type,
    pub value: Type,
    entries: Vec<(Val, Val)>,
}

impl Mapping {
    pub fn new(key: Type, value: Type) -> Self {
        Self {
            key,
            value,
            entries: Vec::new(),
        }
    }

    /// An open-typed mapping, the shape every untyped document loads as
    pub fn open() -> Self {
        Self::new(Type::Any, Type::Any)
    }

    pub fn with_capacity(key: Type, value: Type, capacity: usize) -> Self {
        Self {
            key,
            value,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace, keeping the original position of an existing key.
    /// Returns the previous value when the key was already present.
    pub fn insert(&mut self, key: impl Into<Val>, value: impl Into<Val>) -> Option<Val> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Builder form of [`Mapping::insert`]
    pub fn entry(mut self, key: impl Into<Val>, value: impl Into<Val>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &Val) -> Option<&Val> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&Val> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Val::Str(s) if s.as_ref() == key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &Val) -> bool {
        self.get(key).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Val, &Val)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Val> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// The sole entry of a single-entry mapping
    pub fn single(&self) -> Option<(&Val, &Val)> {
        match self.entries.as_slice() {
            [(k, v)] => Some((k, v)),
            _ => None,
        }
    }
}

impl IntoIterator for Mapping {
    type Item = (Val, Val);
    type IntoIter = std::vec::IntoIter<(Val, Val)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One named field of a [`Record`].
///
/// `settable == false` marks a field the evaluator must not rewrite: its content is
/// copied through verbatim even when it holds a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Arc<str>,
    pub ty: Type,
    pub settable: bool,
    pub value: Val,
}

/// Fixed set of named fields in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: Arc<str>,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            fields: Vec::new(),
        }
    }

    /// Append an externally settable field
    pub fn field(self, name: impl AsRef<str>, ty: Type, value: impl Into<Val>) -> Self {
        self.push_field(name, ty, true, value.into())
    }

    /// Append a field the evaluator copies through untouched
    pub fn fixed_field(self, name: impl AsRef<str>, ty: Type, value: impl Into<Val>) -> Self {
        self.push_field(name, ty, false, value.into())
    }

    fn push_field(mut self, name: impl AsRef<str>, ty: Type, settable: bool, value: Val) -> Self {
        self.fields.push(Field {
            name: Arc::from(name.as_ref()),
            ty,
            settable,
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Val> {
        self.fields
            .iter()
            .find(|f| f.name.as_ref() == name)
            .map(|f| &f.value)
    }
}

/// Reference to another node. `cell == None` is the absent reference.
///
/// Cloning an indirection shares the cell, so `Indirection::same_cell` tells whether two
/// trees still point at the same storage.
#[derive(Debug, Clone)]
pub struct Indirection {
    pub target: Type,
    pub cell: Option<Arc<Val>>,
}

impl Indirection {
    pub fn to(target: Type, value: impl Into<Val>) -> Self {
        Self {
            target,
            cell: Some(Arc::new(value.into())),
        }
    }

    pub fn absent(target: Type) -> Self {
        Self { target, cell: None }
    }

    #[inline]
    pub fn get(&self) -> Option<&Val> {
        self.cell.as_deref()
    }

    pub fn same_cell(&self, other: &Indirection) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

// References compare by pointee, not by storage.
impl PartialEq for Indirection {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.get() == other.get()
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Float(a), Val::Float(b)) => a == b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Seq(a), Val::Seq(b)) => a == b,
            (Val::Map(a), Val::Map(b)) => a == b,
            (Val::Record(a), Val::Record(b)) => a == b,
            (Val::Ref(a), Val::Ref(b)) => a == b,
            (Val::Func(a), Val::Func(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Val {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a.partial_cmp(b),
            (Val::Float(a), Val::Float(b)) => a.partial_cmp(b),
            (Val::Int(a), Val::Float(b)) => (*a as f64).partial_cmp(b),
            (Val::Float(a), Val::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Val::Str(a), Val::Str(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Val {
    /// Human readable kind, used in coercion and operator errors
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Nil => "nil",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::Str(_) => "string",
            Val::Seq(_) => "sequence",
            Val::Map(_) => "mapping",
            Val::Record(_) => "record",
            Val::Ref(_) => "reference",
            Val::Func(_) => "function",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Open-typed sequence
    pub fn seq(items: Vec<Val>) -> Val {
        Val::Seq(Sequence::with_items(Type::Any, items))
    }

    /// Follow references until a non-reference node; absent references yield `Nil`
    pub fn deref(&self) -> &Val {
        static NIL: Val = Val::Nil;
        let mut cur = self;
        while let Val::Ref(r) = cur {
            cur = match r.get() {
                Some(v) => v,
                None => return &NIL,
            };
        }
        cur
    }

    /// Text used when a value is spliced into a larger string: `Nil` renders empty,
    /// containers render as JSON.
    pub fn render_text(&self) -> String {
        match self.deref() {
            Val::Nil => String::new(),
            Val::Str(s) => s.to_string(),
            Val::Int(i) => {
                let mut buf = itoa::Buffer::new();
                buf.format(*i).to_string()
            }
            Val::Float(f) => render_float(*f),
            Val::Bool(b) => b.to_string(),
            Val::Func(func) => format!("<function {}>", func.name()),
            other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
        }
    }

    pub(crate) fn concat_strings(a: &str, b: &str) -> Val {
        let mut s = String::with_capacity(a.len() + b.len());
        s.push_str(a);
        s.push_str(b);
        Val::Str(Arc::from(s))
    }
}

/// Integral floats keep a trailing `.0` so they stay distinguishable from ints
pub(crate) fn render_float(f: f64) -> String {
    if f.is_finite() {
        let mut buf = ryu::Buffer::new();
        buf.format_finite(f).to_string()
    } else {
        f.to_string()
    }
}

impl core::fmt::Display for Val {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Val::Nil => write!(f, "nil"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Int(i) => write!(f, "{i}"),
            Val::Float(fl) => write!(f, "{}", render_float(*fl)),
            Val::Str(s) => write!(f, "{}", s.as_ref()),
            Val::Func(func) => write!(f, "<function {}>", func.name()),
            Val::Ref(r) => match r.get() {
                Some(v) => write!(f, "&{}", v),
                None => write!(f, "&nil"),
            },
            // Avoid serialization errors by using debug fallback
            other => match serde_json::to_string(other) {
                Ok(s) => write!(f, "{}", s),
                Err(_) => write!(f, "{:?}", other),
            },
        }
    }
}

impl Serialize for Val {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Val::Nil => serializer.serialize_none(),
            Val::Bool(b) => serializer.serialize_bool(*b),
            Val::Int(i) => serializer.serialize_i64(*i),
            Val::Float(f) => serializer.serialize_f64(*f),
            Val::Str(s) => serializer.serialize_str(s),
            Val::Seq(seq) => {
                let mut out = serializer.serialize_seq(Some(seq.len()))?;
                for item in &seq.items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Val::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Val::Record(rec) => {
                let mut out = serializer.serialize_map(Some(rec.fields.len()))?;
                for field in &rec.fields {
                    out.serialize_entry(field.name.as_ref(), &field.value)?;
                }
                out.end()
            }
            Val::Ref(r) => match r.get() {
                Some(v) => v.serialize(serializer),
                None => serializer.serialize_none(),
            },
            Val::Func(func) => serializer.serialize_str(&format!("<function {}>", func.name())),
        }
    }
}
