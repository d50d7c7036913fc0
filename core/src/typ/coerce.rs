use std::{fmt, sync::Arc};

use crate::{
    val::{Indirection, Mapping, Sequence, Type, Val},
    walk::PathSegment,
};

/// A value that does not fit the type of its position.
///
/// `at` is relative to the coerced value: converting `["1", "x"]` to `Seq<int>` fails
/// at `[1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceError {
    pub found: &'static str,
    pub value: String,
    pub target: Type,
    pub at: Vec<PathSegment>,
    /// Two keys of a mapping became equal after conversion
    pub collision: bool,
}

impl CoerceError {
    fn new(value: &Val, target: &Type) -> Self {
        let mut rendered = value.to_string();
        if rendered.len() > 48 {
            let cut = (0..=45).rev().find(|&i| rendered.is_char_boundary(i)).unwrap_or(0);
            rendered.truncate(cut);
            rendered.push_str("...");
        }
        Self {
            found: value.type_name(),
            value: rendered,
            target: target.clone(),
            at: Vec::new(),
            collision: false,
        }
    }

    fn within(mut self, segment: PathSegment) -> Self {
        self.at.insert(0, segment);
        self
    }
}

impl fmt::Display for CoerceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.collision {
            write!(f, "key `{}` collides with another key after conversion to {}", self.value, self.target)
        } else {
            write!(f, "cannot convert {} `{}` to {}", self.found, self.value, self.target)
        }
    }
}

impl std::error::Error for CoerceError {}

/// Convert a resolved value into the type of the position it fills.
///
/// Rules are tried in order:
/// 1. the declared type, when the position has one;
/// 2. in an open slot, an integral float becomes an int (`{{1}}` stays `1`, not `1.0`);
/// 3. everything else passes through an open slot unchanged.
pub fn coerce(value: Val, target: &Type) -> Result<Val, CoerceError> {
    match target {
        Type::Any => Ok(open_slot(value)),
        _ => declared(value, target),
    }
}

fn open_slot(value: Val) -> Val {
    match value {
        Val::Float(f) if is_integral(f) => Val::Int(f as i64),
        other => other,
    }
}

/// Finite, no fractional part and inside the i64 range
fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

fn declared(value: Val, target: &Type) -> Result<Val, CoerceError> {
    // References are transparent everywhere except in reference positions.
    if let Val::Ref(r) = &value
        && !matches!(target, Type::Ref(_) | Type::Any)
    {
        let inner = r.get().cloned().unwrap_or_default();
        return declared(inner, target);
    }
    if value.is_nil() {
        return match target {
            Type::Ref(inner) => Ok(Val::Ref(Indirection::absent((**inner).clone()))),
            t if t.accepts_nil() => Ok(Val::Nil),
            t => Err(CoerceError::new(&value, t)),
        };
    }

    match (target, value) {
        (Type::Any, v) => Ok(open_slot(v)),
        (Type::Str, v @ Val::Str(_)) => Ok(v),
        (Type::Str, v @ (Val::Int(_) | Val::Float(_) | Val::Bool(_))) => Ok(Val::from(v.render_text())),

        (Type::Int, v @ Val::Int(_)) => Ok(v),
        (Type::Int, Val::Float(f)) if is_integral(f) => Ok(Val::Int(f as i64)),
        (Type::Int, Val::Str(s)) => match s.trim().parse::<i64>() {
            Ok(i) => Ok(Val::Int(i)),
            Err(_) => Err(CoerceError::new(&Val::Str(s), target)),
        },

        (Type::Float, v @ Val::Float(_)) => Ok(v),
        (Type::Float, Val::Int(i)) => Ok(Val::Float(i as f64)),
        (Type::Float, Val::Str(s)) => match s.trim().parse::<f64>() {
            Ok(f) => Ok(Val::Float(f)),
            Err(_) => Err(CoerceError::new(&Val::Str(s), target)),
        },

        (Type::Bool, v @ Val::Bool(_)) => Ok(v),
        (Type::Bool, Val::Str(s)) if s.as_ref() == "true" => Ok(Val::Bool(true)),
        (Type::Bool, Val::Str(s)) if s.as_ref() == "false" => Ok(Val::Bool(false)),

        (Type::Seq(elem), Val::Seq(seq)) => {
            let mut items = Vec::with_capacity(seq.len());
            for (i, item) in seq.items.into_iter().enumerate() {
                items.push(coerce(item, elem).map_err(|e| e.within(PathSegment::Index(i)))?);
            }
            Ok(Val::Seq(Sequence::with_items((**elem).clone(), items)))
        }

        (Type::Map(key_ty, value_ty), Val::Map(map)) => {
            let mut out = Mapping::with_capacity((**key_ty).clone(), (**value_ty).clone(), map.len());
            for (k, v) in map {
                let segment = PathSegment::Key(k.clone());
                let key = coerce(k, key_ty).map_err(|e| e.within(segment.clone()))?;
                let value = coerce(v, value_ty).map_err(|e| e.within(segment.clone()))?;
                if out.contains_key(&key) {
                    let mut err = CoerceError::new(&key, key_ty);
                    err.collision = true;
                    return Err(err.within(segment));
                }
                out.insert(key, value);
            }
            Ok(Val::Map(out))
        }

        (Type::Record(name), Val::Record(rec)) if rec.name == *name => Ok(Val::Record(rec)),

        (Type::Ref(inner), Val::Ref(r)) => match &r.cell {
            None => Ok(Val::Ref(Indirection::absent((**inner).clone()))),
            Some(cell) => {
                let pointee = coerce(cell.as_ref().clone(), inner)?;
                if pointee == **cell {
                    Ok(Val::Ref(Indirection {
                        target: (**inner).clone(),
                        cell: Some(Arc::clone(cell)),
                    }))
                } else {
                    Ok(Val::Ref(Indirection::to((**inner).clone(), pointee)))
                }
            }
        },
        (Type::Ref(inner), v) => {
            let pointee = coerce(v, inner)?;
            Ok(Val::Ref(Indirection::to((**inner).clone(), pointee)))
        }

        (Type::Func, v @ Val::Func(_)) => Ok(v),

        (t, v) => Err(CoerceError::new(&v, t)),
    }
}
