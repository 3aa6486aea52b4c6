//! Conversion between Rust types and dataflow values.
//!
//! FSM states and combinational closures work on typed Rust values; the graph stores [`Value`]s.
//! Implement [`Signal`] (usually with `#[derive(Signal)]`) to move between the two.

use crate::num::*;
use crate::value::*;

/// Rust types that can be carried as a [`Value`].
pub trait Signal: Sized {
    /// Converts into a value.
    fn into_value(self) -> Value;

    /// Converts from a value.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl Signal for Value {
    fn into_value(self) -> Value { self }

    fn from_value(value: Value) -> Result<Self, ValueError> { Ok(value) }
}

impl Signal for bool {
    fn into_value(self) -> Value { Value::Bool(self) }

    fn from_value(value: Value) -> Result<Self, ValueError> { value.as_bool() }
}

impl Signal for Fixp {
    fn into_value(self) -> Value { Value::Num(self) }

    fn from_value(value: Value) -> Result<Self, ValueError> { value.as_num() }
}

/// Counters are carried as `Uint[64]`.
impl Signal for usize {
    fn into_value(self) -> Value {
        let typ = FixpType::uint(64);
        Value::Num(Fixp::from_int(typ, self as i128).unwrap_or(Fixp::max(typ)))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        let num = value.as_num()?;
        usize::try_from(num.to_int())
            .map_err(|_| ValueError::Mismatch { expected: "a counter".to_string(), found: num.to_string() })
    }
}

impl<T: Signal> Signal for Vec<T> {
    fn into_value(self) -> Value { Value::Array(self.into_iter().map(Signal::into_value).collect()) }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Array(values) | Value::Tuple(values) => values.into_iter().map(T::from_value).collect(),
            _ => Err(ValueError::Mismatch { expected: "an array".to_string(), found: value.to_string() }),
        }
    }
}

/// `None` is the empty tuple, `Some(x)` the one-element tuple.
impl<T: Signal> Signal for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => Value::Tuple(vec![value.into_value()]),
            None => Value::Tuple(vec![]),
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Tuple(values) if values.is_empty() => Ok(None),
            Value::Tuple(values) if values.len() == 1 => {
                let [value] = Value::Tuple(values).into_fields::<1>()?;
                Ok(Some(T::from_value(value)?))
            }
            _ => Err(ValueError::Mismatch { expected: "an optional value".to_string(), found: value.to_string() }),
        }
    }
}

macro_rules! impl_signal_tuple {
    ($n:literal; $($t:ident $v:ident),+) => {
        impl<$($t: Signal),+> Signal for ($($t,)+) {
            fn into_value(self) -> Value {
                let ($($v,)+) = self;
                Value::Tuple(vec![$($v.into_value()),+])
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                let [$($v),+] = value.into_fields::<$n>()?;
                Ok(($($t::from_value($v)?,)+))
            }
        }
    };
}

impl_signal_tuple!(1; A a);
impl_signal_tuple!(2; A a, B b);
impl_signal_tuple!(3; A a, B b, C c);
impl_signal_tuple!(4; A a, B b, C c, D d);
impl_signal_tuple!(5; A a, B b, C c, D d, E e);
