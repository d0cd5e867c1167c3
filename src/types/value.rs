//! Scalar values held by rows
//!
//! The monitoring tables carry a deliberately small set of native types:
//! booleans, signed and unsigned 64-bit integers, doubles and text. A value is
//! immutable once constructed; text payloads sit behind an `Arc` so rows
//! produced by joins share them instead of copying.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// The fixed type enumeration for scalar values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Uint,
    Double,
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "boolean"),
            ValueType::Int => write!(f, "integer"),
            ValueType::Uint => write!(f, "unsigned"),
            ValueType::Double => write!(f, "double"),
            ValueType::Text => write!(f, "text"),
        }
    }
}

/// Comparison operators defined on values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// The SQL spelling of the operator, used in error messages.
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// Parses an operator from its statement spelling. `!=` is accepted as an
    /// alternate spelling of `<>`.
    pub fn parse(symbol: &str) -> Option<CmpOp> {
        match symbol {
            "=" => Some(CmpOp::Eq),
            "<>" | "!=" => Some(CmpOp::Ne),
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Ge),
            _ => None,
        }
    }

    fn matches(&self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

/// A tagged scalar value.
///
/// SQL NULL is a typed variant: it remembers the column's declared type so a
/// null cell never changes the shape of the row holding it.
#[derive(Clone, Serialize, Deserialize)]
pub enum Value {
    Null(ValueType),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    Text(Arc<str>),
}

impl Value {
    /// Creates a text value.
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(s.as_ref()))
    }

    /// The value's type tag.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null(t) => *t,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Uint(_) => ValueType::Uint,
            Value::Double(_) => ValueType::Double,
            Value::Text(_) => ValueType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Parses a raw statement word into a value of the target type. Returns
    /// `None` on a malformed numeral instead of erroring; the caller knows
    /// which column the text was destined for and reports accordingly.
    pub fn parse(text: &str, target: ValueType) -> Option<Value> {
        match target {
            ValueType::Bool => match text {
                "0" => Some(Value::Bool(false)),
                "1" => Some(Value::Bool(true)),
                _ if text.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
                _ if text.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
                _ => None,
            },
            ValueType::Int => text.parse::<i64>().ok().map(Value::Int),
            ValueType::Uint => text.parse::<u64>().ok().map(Value::Uint),
            ValueType::Double => text.parse::<f64>().ok().map(Value::Double),
            ValueType::Text => Some(Value::text(text)),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Applies a comparison operator. Ordering is defined between same-type
    /// operands, with one documented exception: signed and unsigned integers
    /// compare against each other (a negative signed operand is less than any
    /// unsigned one). Any other cross-type pair is an undefined operation.
    /// A null operand on either side makes the comparison false.
    pub fn compare(&self, op: CmpOp, other: &Value) -> Result<Value> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Bool(false));
        }
        let undefined = || Error::UndefinedOperation {
            op: op.symbol(),
            left: self.value_type(),
            right: other.value_type(),
        };
        let ord = match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => {
                // Booleans support equality only.
                if !matches!(op, CmpOp::Eq | CmpOp::Ne) {
                    return Err(undefined());
                }
                a.cmp(b)
            }
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
            (Value::Int(a), Value::Uint(b)) => cmp_int_uint(*a, *b),
            (Value::Uint(a), Value::Int(b)) => cmp_int_uint(*b, *a).reverse(),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_ref().cmp(b.as_ref()),
            _ => return Err(undefined()),
        };
        Ok(Value::Bool(op.matches(ord)))
    }

    /// Adds another value of the same numeric type, for running sums.
    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        let undefined = || Error::UndefinedOperation {
            op: "+",
            left: self.value_type(),
            right: other.value_type(),
        };
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| Error::Internal("integer sum overflow".into())),
            (Value::Uint(a), Value::Uint(b)) => a
                .checked_add(*b)
                .map(Value::Uint)
                .ok_or_else(|| Error::Internal("unsigned sum overflow".into())),
            (Value::Double(a), Value::Double(b)) => Ok(Value::Double(a + b)),
            _ => Err(undefined()),
        }
    }

    /// A total order over all values, used for ORDER BY. Same-type pairs
    /// (and the signed/unsigned pair) order by value; otherwise the type
    /// rank decides, with nulls first.
    pub(crate) fn total_order(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null(_) => 0,
                Value::Bool(_) => 1,
                Value::Int(_) | Value::Uint(_) => 2,
                Value::Double(_) => 3,
                Value::Text(_) => 4,
            }
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Uint(a), Value::Uint(b)) => a.cmp(b),
            (Value::Int(a), Value::Uint(b)) => cmp_int_uint(*a, *b),
            (Value::Uint(a), Value::Int(b)) => cmp_int_uint(*b, *a).reverse(),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_ref().cmp(b.as_ref()),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// The numeric magnitude as a double, for averaging.
    pub fn to_double(&self) -> Result<f64> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Uint(u) => Ok(*u as f64),
            Value::Double(d) => Ok(*d),
            _ => Err(Error::TypeMismatch {
                expected: ValueType::Double,
                found: self.value_type(),
            }),
        }
    }
}

fn cmp_int_uint(a: i64, b: u64) -> Ordering {
    if a < 0 {
        Ordering::Less
    } else {
        (a as u64).cmp(&b)
    }
}

/// Structural equality, used for join keys, group buckets and index lookups.
/// Doubles compare by bit pattern so the impl can be `Eq` and agree with
/// `Hash`; SQL comparison semantics live in [`Value::compare`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null(a), Value::Null(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (_, _) => false,
        }
    }
}

impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null(t) => t.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Uint(u) => u.hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

/// Renders the value the way result cells are shipped to clients: raw text,
/// no quoting, `NULL` for nulls.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Double(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(t) => write!(f, "Null({})", t),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Uint(u) => write!(f, "Uint({})", u),
            Value::Double(d) => write!(f, "Double({})", d),
            Value::Text(s) => write!(f, "Text({})", s),
        }
    }
}
