use std::ops::{Add, Div, Mul, Rem, Sub};

use anyhow::{Result, anyhow};

use crate::op::{BinOp, err_op};

use super::{Mapping, Sequence, Val};

impl Add for &Val {
    type Output = Result<Val>;

    /// - Str + number renders the number, so `"id-" + 1` is `"id-1"`.
    /// - Seq + Seq concatenates; the element type of the left side wins.
    /// - Map + Map merges, right side overriding while keeping left key order.
    #[inline]
    fn add(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a
                .checked_add(*b)
                .map(Val::Int)
                .ok_or_else(|| anyhow!("Integer overflow: {a} + {b}")),
            (Val::Float(a), Val::Float(b)) => Ok(Val::Float(a + b)),
            (Val::Float(a), Val::Int(b)) => Ok(Val::Float(a + *b as f64)),
            (Val::Int(a), Val::Float(b)) => Ok(Val::Float(*a as f64 + b)),
            (Val::Str(a), Val::Str(b)) => {
                if a.is_empty() {
                    return Ok(Val::Str(b.clone()));
                }
                if b.is_empty() {
                    return Ok(Val::Str(a.clone()));
                }
                Ok(Val::concat_strings(a.as_ref(), b.as_ref()))
            }
            (Val::Str(a), b @ (Val::Int(_) | Val::Float(_) | Val::Bool(_))) => {
                Ok(Val::concat_strings(a.as_ref(), &b.render_text()))
            }
            (a @ (Val::Int(_) | Val::Float(_) | Val::Bool(_)), Val::Str(b)) => {
                Ok(Val::concat_strings(&a.render_text(), b.as_ref()))
            }
            (Val::Seq(l), Val::Seq(r)) => {
                let mut items = Vec::with_capacity(l.len() + r.len());
                items.extend(l.items.iter().cloned());
                items.extend(r.items.iter().cloned());
                Ok(Val::Seq(Sequence::with_items(l.elem.clone(), items)))
            }
            (Val::Map(l), Val::Map(r)) => {
                let mut merged = Mapping::with_capacity(l.key.clone(), l.value.clone(), l.len() + r.len());
                for (k, v) in l.iter().chain(r.iter()) {
                    merged.insert(k.clone(), v.clone());
                }
                Ok(Val::Map(merged))
            }
            _ => err_op(self, BinOp::Add, other),
        }
    }
}

impl Sub for &Val {
    type Output = Result<Val>;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a
                .checked_sub(*b)
                .map(Val::Int)
                .ok_or_else(|| anyhow!("Integer overflow: {a} - {b}")),
            (Val::Float(a), Val::Float(b)) => Ok((a - b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a - *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 - b).into()),
            _ => err_op(self, BinOp::Sub, other),
        }
    }
}

impl Mul for &Val {
    type Output = Result<Val>;

    #[inline]
    fn mul(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(a), Val::Int(b)) => a
                .checked_mul(*b)
                .map(Val::Int)
                .ok_or_else(|| anyhow!("Integer overflow: {a} * {b}")),
            (Val::Float(a), Val::Float(b)) => Ok((a * b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a * *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 * b).into()),
            _ => err_op(self, BinOp::Mul, other),
        }
    }
}

impl Div for &Val {
    type Output = Result<Val>;

    /// Int / Int stays an int when the division is exact, otherwise it becomes a float.
    #[inline]
    fn div(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(_), Val::Int(0)) => Err(anyhow!("Division by zero: {self} / 0")),
            (Val::Int(a), Val::Int(b)) => match (a.checked_rem(*b), a.checked_div(*b)) {
                (Some(0), Some(q)) => Ok(Val::Int(q)),
                _ => Ok(Val::Float(*a as f64 / *b as f64)),
            },
            (Val::Float(a), Val::Float(b)) => Ok((a / b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a / *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 / b).into()),
            _ => err_op(self, BinOp::Div, other),
        }
    }
}

impl Rem for &Val {
    type Output = Result<Val>;

    #[inline]
    fn rem(self, other: Self) -> Self::Output {
        match (self, other) {
            (Val::Int(_), Val::Int(0)) => Err(anyhow!("Division by zero: {self} % 0")),
            (Val::Int(a), Val::Int(b)) => Ok(a.wrapping_rem(*b).into()),
            (Val::Float(a), Val::Float(b)) => Ok((a % b).into()),
            (Val::Float(a), Val::Int(b)) => Ok((a % *b as f64).into()),
            (Val::Int(a), Val::Float(b)) => Ok((*a as f64 % b).into()),
            _ => err_op(self, BinOp::Mod, other),
        }
    }
}
