//! Values carried on dataflow edges.

use std::fmt;

use arrayvec::ArrayVec;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::num::*;

/// Maximum number of end-of-transfer levels of a queue.
pub const MAX_QUEUE_LVL: usize = 4;

/// End-of-transfer flags of a queue element. Bit 0 is the innermost level.
pub type Eot = ArrayVec<bool, MAX_QUEUE_LVL>;

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
    #[error("index {index} is out of bounds for {typ}")]
    IndexOutOfBounds { index: usize, typ: String },
    #[error("queue level {0} is not in 1..={MAX_QUEUE_LVL}")]
    QueueLevel(usize),
    #[error(transparent)]
    Fixp(#[from] FixpError),
}

/// Value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTyp {
    /// Single bit.
    Bool,

    /// Fixed-point number.
    Num(FixpType),

    /// Heterogeneous tuple.
    Tuple(Vec<ValueTyp>),

    /// Homogeneous array with the given length.
    Array(Box<ValueTyp>, usize),

    /// Queue element: data with the given number of end-of-transfer levels.
    Queue(Box<ValueTyp>, usize),
}

impl ValueTyp {
    /// Array type.
    pub fn array(elt: ValueTyp, len: usize) -> Self { Self::Array(Box::new(elt), len) }

    /// Queue type.
    pub fn queue(elt: ValueTyp, lvl: usize) -> Result<Self, ValueError> {
        if lvl == 0 || lvl > MAX_QUEUE_LVL {
            return Err(ValueError::QueueLevel(lvl));
        }
        Ok(Self::Queue(Box::new(elt), lvl))
    }

    /// Returns the bit width.
    pub fn width(&self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Num(typ) => typ.width() as usize,
            Self::Tuple(typs) => typs.iter().map(Self::width).sum(),
            Self::Array(typ, len) => typ.width() * len,
            Self::Queue(typ, lvl) => typ.width() + lvl,
        }
    }

    /// Returns the fixed-point type of a numeric type.
    pub fn num(&self) -> Result<FixpType, ValueError> {
        match self {
            Self::Num(typ) => Ok(*typ),
            _ => Err(ValueError::Mismatch { expected: "a number".to_string(), found: self.to_string() }),
        }
    }

    /// Returns the type of the `index`-th field.
    ///
    /// For queues, field 0 is the data and field `1 + l` is the end-of-transfer bit of level `l`.
    pub fn field(&self, index: usize) -> Result<ValueTyp, ValueError> {
        let out_of_bounds = || ValueError::IndexOutOfBounds { index, typ: self.to_string() };
        match self {
            Self::Tuple(typs) => typs.get(index).cloned().ok_or_else(out_of_bounds),
            Self::Array(typ, len) if index < *len => Ok((**typ).clone()),
            Self::Queue(typ, _) if index == 0 => Ok((**typ).clone()),
            Self::Queue(_, lvl) if index <= *lvl => Ok(Self::Bool),
            Self::Array(..) | Self::Queue(..) => Err(out_of_bounds()),
            _ => Err(ValueError::Mismatch { expected: "an aggregate".to_string(), found: self.to_string() }),
        }
    }
}

impl fmt::Display for ValueTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "Bool"),
            Self::Num(typ) => write!(f, "{}", typ),
            Self::Tuple(typs) => write!(f, "({})", typs.iter().join(", ")),
            Self::Array(typ, len) => write!(f, "Array[{}, {}]", typ, len),
            Self::Queue(typ, lvl) => write!(f, "Queue[{}, {}]", typ, lvl),
        }
    }
}

impl From<FixpType> for ValueTyp {
    fn from(typ: FixpType) -> Self { Self::Num(typ) }
}

/// Value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Single bit.
    Bool(bool),

    /// Fixed-point number.
    Num(Fixp),

    /// Tuple.
    Tuple(Vec<Value>),

    /// Array.
    Array(Vec<Value>),

    /// Queue element.
    Queue(Box<Value>, Eot),
}

impl Value {
    /// Zero of the given type: `false`, `0`, and all-zero aggregates with cleared end-of-transfer bits.
    pub fn zero(typ: &ValueTyp) -> Self {
        match typ {
            ValueTyp::Bool => Self::Bool(false),
            ValueTyp::Num(typ) => Self::Num(Fixp::zero(*typ)),
            ValueTyp::Tuple(typs) => Self::Tuple(typs.iter().map(Self::zero).collect()),
            ValueTyp::Array(typ, len) => Self::Array(vec![Self::zero(typ); *len]),
            ValueTyp::Queue(typ, lvl) => Self::Queue(Box::new(Self::zero(typ)), (0..*lvl).map(|_| false).collect()),
        }
    }

    /// Numeric value from a float literal.
    pub fn from_f64(typ: FixpType, value: f64) -> Result<Self, ValueError> {
        Ok(Self::Num(Fixp::from_f64(typ, value)?))
    }

    /// Queue element.
    pub fn queue(data: Value, eot: &[bool]) -> Result<Self, ValueError> {
        if eot.is_empty() || eot.len() > MAX_QUEUE_LVL {
            return Err(ValueError::QueueLevel(eot.len()));
        }
        Ok(Self::Queue(Box::new(data), eot.iter().copied().collect()))
    }

    /// Checks whether the value conforms to the type.
    pub fn conforms(&self, typ: &ValueTyp) -> bool {
        match (self, typ) {
            (Self::Bool(_), ValueTyp::Bool) => true,
            (Self::Num(value), ValueTyp::Num(typ)) => value.typ() == *typ,
            (Self::Tuple(values), ValueTyp::Tuple(typs)) => {
                values.len() == typs.len() && values.iter().zip(typs).all(|(value, typ)| value.conforms(typ))
            }
            (Self::Array(values), ValueTyp::Array(typ, len)) => {
                values.len() == *len && values.iter().all(|value| value.conforms(typ))
            }
            (Self::Queue(value, eot), ValueTyp::Queue(typ, lvl)) => eot.len() == *lvl && value.conforms(typ),
            _ => false,
        }
    }

    /// Checks that the value conforms to the type.
    pub fn check(&self, typ: &ValueTyp) -> Result<(), ValueError> {
        if self.conforms(typ) {
            Ok(())
        } else {
            Err(ValueError::Mismatch { expected: typ.to_string(), found: self.to_string() })
        }
    }

    fn mismatch(&self, expected: &str) -> ValueError {
        ValueError::Mismatch { expected: expected.to_string(), found: self.to_string() }
    }

    /// Returns the bit.
    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.mismatch("Bool")),
        }
    }

    /// Returns the number.
    pub fn as_num(&self) -> Result<Fixp, ValueError> {
        match self {
            Self::Num(n) => Ok(*n),
            _ => Err(self.mismatch("a number")),
        }
    }

    /// Returns the elements of a tuple or an array.
    pub fn as_slice(&self) -> Result<&[Value], ValueError> {
        match self {
            Self::Tuple(values) | Self::Array(values) => Ok(values),
            _ => Err(self.mismatch("a tuple or an array")),
        }
    }

    /// Returns data and end-of-transfer bits of a queue element.
    pub fn as_queue(&self) -> Result<(&Value, &Eot), ValueError> {
        match self {
            Self::Queue(data, eot) => Ok((data, eot)),
            _ => Err(self.mismatch("a queue element")),
        }
    }

    /// Moves out exactly `N` elements of a tuple or an array.
    pub fn into_fields<const N: usize>(self) -> Result<[Value; N], ValueError> {
        let values = match self {
            Self::Tuple(values) | Self::Array(values) => values,
            _ => return Err(self.mismatch(&format!("an aggregate of {} elements", N))),
        };
        <[Value; N]>::try_from(values).map_err(|values| ValueError::Mismatch {
            expected: format!("{} elements", N),
            found: format!("{} elements", values.len()),
        })
    }

    /// Returns the `index`-th field. See [`ValueTyp::field`].
    pub fn field(&self, index: usize) -> Result<Value, ValueError> {
        let out_of_bounds = || ValueError::IndexOutOfBounds { index, typ: self.to_string() };
        match self {
            Self::Tuple(values) | Self::Array(values) => values.get(index).cloned().ok_or_else(out_of_bounds),
            Self::Queue(data, _) if index == 0 => Ok((**data).clone()),
            Self::Queue(_, eot) => eot.get(index - 1).map(|b| Self::Bool(*b)).ok_or_else(out_of_bounds),
            _ => Err(self.mismatch("an aggregate")),
        }
    }

    /// Converts a number into a float.
    pub fn to_f64(&self) -> Result<f64, ValueError> { Ok(self.as_num()?.to_f64()) }

    /// Numbers of the value in depth-first order. Bits and end-of-transfer flags are skipped.
    pub fn nums(&self) -> Vec<Fixp> {
        match self {
            Self::Bool(_) => vec![],
            Self::Num(n) => vec![*n],
            Self::Tuple(values) | Self::Array(values) => values.iter().flat_map(Self::nums).collect(),
            Self::Queue(data, _) => data.nums(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Num(n) => write!(f, "{}", n.to_f64()),
            Self::Tuple(values) => write!(f, "({})", values.iter().join(", ")),
            Self::Array(values) => write!(f, "[{}]", values.iter().join(", ")),
            Self::Queue(data, eot) => {
                write!(f, "{}@{}", data, eot.iter().map(|b| if *b { '1' } else { '0' }).collect::<String>())
            }
        }
    }
}

impl From<Fixp> for Value {
    fn from(value: Fixp) -> Self { Self::Num(value) }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self { Self::Bool(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_fields() {
        let typ = ValueTyp::queue(ValueTyp::Num(FixpType::int(8)), 2).unwrap();
        assert_eq!(typ.width(), 10);
        assert_eq!(typ.field(0).unwrap(), ValueTyp::Num(FixpType::int(8)));
        assert_eq!(typ.field(2).unwrap(), ValueTyp::Bool);
        assert!(typ.field(3).is_err());

        let value = Value::queue(Value::zero(&ValueTyp::Num(FixpType::int(8))), &[false, true]).unwrap();
        assert!(value.conforms(&typ));
        assert_eq!(value.field(2).unwrap(), Value::Bool(true));
        assert_eq!(value.to_string(), "0@01");
    }

    #[test]
    fn queue_level_is_bounded() {
        assert!(matches!(ValueTyp::queue(ValueTyp::Bool, 5), Err(ValueError::QueueLevel(5))));
        assert!(Value::queue(Value::Bool(true), &[]).is_err());
    }

    #[test]
    fn display() {
        let typ = ValueTyp::Tuple(vec![ValueTyp::Num(FixpType::fixp(5, 19)), ValueTyp::array(ValueTyp::Bool, 3)]);
        assert_eq!(typ.to_string(), "(Fixp[5, 19], Array[Bool, 3])");
        assert_eq!(Value::zero(&typ).to_string(), "(0, [false, false, false])");
    }

    #[test]
    fn into_fields_checks_length() {
        let value = Value::Tuple(vec![Value::Bool(true), Value::Bool(false)]);
        let [a, b] = value.clone().into_fields::<2>().unwrap();
        assert_eq!((a, b), (Value::Bool(true), Value::Bool(false)));
        assert!(value.into_fields::<3>().is_err());
    }
}
