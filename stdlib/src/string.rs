use anyhow::{Result, anyhow};
use scena_core::val::{Func, Val};

/// Length of a string (in chars), list or mapping; `nil` has length 0
pub fn len() -> Func {
    Func::native("len", |arg: Val| -> Result<Val> {
        let n = match arg.deref() {
            Val::Str(s) => s.chars().count(),
            Val::Seq(s) => s.len(),
            Val::Map(m) => m.len(),
            Val::Nil => 0,
            other => return Err(anyhow!("len() argument must be a string, list or map, got {}", other.type_name())),
        };
        Ok(Val::Int(n as i64))
    })
}

pub fn upper() -> Func {
    Func::native("upper", |arg: Val| match arg.deref() {
        Val::Str(s) => Ok(Val::from(s.to_uppercase())),
        other => Err(anyhow!("upper() argument must be a string, got {}", other.type_name())),
    })
}

pub fn lower() -> Func {
    Func::native("lower", |arg: Val| match arg.deref() {
        Val::Str(s) => Ok(Val::from(s.to_lowercase())),
        other => Err(anyhow!("lower() argument must be a string, got {}", other.type_name())),
    })
}
