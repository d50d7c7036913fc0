use std::fmt;
use std::sync::Arc;

/// Static type of a document position.
///
/// `Any` marks an open slot: the position accepts every value and resolved templates
/// are normalized by the open-slot rules instead of a declared conversion.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Type {
    #[default]
    Any,
    Bool,
    Int,
    Float,
    Str,
    /// Seq<T>
    Seq(Box<Type>),
    /// Map<K, V>
    Map(Box<Type>, Box<Type>),
    /// Record type identified by name
    Record(Arc<str>),
    /// Ref<T>
    Ref(Box<Type>),
    Func,
}

impl Type {
    pub fn seq(elem: Type) -> Type {
        Type::Seq(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn reference(target: Type) -> Type {
        Type::Ref(Box::new(target))
    }

    pub fn record(name: impl AsRef<str>) -> Type {
        Type::Record(Arc::from(name.as_ref()))
    }

    /// Positions that may legitimately hold an absent value
    #[inline]
    pub fn accepts_nil(&self) -> bool {
        matches!(
            self,
            Type::Any | Type::Seq(_) | Type::Map(_, _) | Type::Ref(_) | Type::Record(_) | Type::Func
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Str => write!(f, "string"),
            Type::Seq(elem) => write!(f, "Seq<{}>", elem),
            Type::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            Type::Record(name) => write!(f, "record {}", name),
            Type::Ref(inner) => write!(f, "Ref<{}>", inner),
            Type::Func => write!(f, "function"),
        }
    }
}
