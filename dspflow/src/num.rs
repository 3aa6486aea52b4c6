//! Fixed-point numbers.
//!
//! A [`Fixp`] is an immutable two's-complement (or unsigned) number with `int_bits` integer bits and
//! `frac_bits` fractional bits. Arithmetic (`add`, `sub`, `mul`, `neg`) is exact: the result type is
//! wide enough to hold every possible result. Precision and range are only reduced by an explicit
//! [`Fixp::quantize`] step that applies exactly one [`Quantization`] policy and exactly one
//! [`Overflow`] policy.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use paste::paste;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use thiserror::Error;

/// Maximum width of a fixed-point number, sign included.
pub const MAX_WIDTH: u32 = 127;

const_assert!(MAX_WIDTH < i128::BITS);

#[allow(missing_docs)]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FixpError {
    #[error("value {value} is out of range [{min}, {max}] of {typ}")]
    OutOfRange { value: f64, typ: FixpType, min: f64, max: f64 },
    #[error("raw value {raw} does not fit into {typ}")]
    RawOutOfRange { raw: i128, typ: FixpType },
    #[error("value {0} is not finite")]
    NotFinite(f64),
    #[error("invalid fixed-point type: {0}")]
    InvalidType(String),
    #[error("result width {width} exceeds maximum width {MAX_WIDTH}")]
    WidthOverflow { width: u32 },
    #[error("parameter {kind} has to be chosen from {choices}, got '{tag}'")]
    InvalidPolicy { kind: &'static str, choices: &'static str, tag: String },
}

/// Fixed-point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FixpTypeRepr")]
pub struct FixpType {
    signed: bool,
    int_bits: u32,
    frac_bits: u32,
}

#[derive(Deserialize)]
struct FixpTypeRepr {
    #[serde(default = "default_signed")]
    signed: bool,
    int_bits: u32,
    #[serde(default)]
    frac_bits: u32,
}

fn default_signed() -> bool { true }

impl TryFrom<FixpTypeRepr> for FixpType {
    type Error = FixpError;

    fn try_from(repr: FixpTypeRepr) -> Result<Self, Self::Error> {
        FixpType::try_new(repr.signed, repr.int_bits, repr.frac_bits)
    }
}

impl FixpType {
    /// Signed fixed-point type with `int_bits` integer bits (sign included) and `frac_bits` fractional bits.
    ///
    /// # Panics
    ///
    /// Panics if the total width is zero or exceeds [`MAX_WIDTH`]. Use [`FixpType::try_new`] for
    /// user-provided widths.
    pub const fn fixp(int_bits: u32, frac_bits: u32) -> Self {
        assert!(int_bits + frac_bits >= 1 && int_bits + frac_bits <= MAX_WIDTH, "invalid fixed-point width");
        Self { signed: true, int_bits, frac_bits }
    }

    /// Unsigned fixed-point type.
    pub const fn ufixp(int_bits: u32, frac_bits: u32) -> Self {
        assert!(int_bits + frac_bits >= 1 && int_bits + frac_bits <= MAX_WIDTH, "invalid fixed-point width");
        Self { signed: false, int_bits, frac_bits }
    }

    /// Signed integer type.
    pub const fn int(width: u32) -> Self { Self::fixp(width, 0) }

    /// Unsigned integer type.
    pub const fn uint(width: u32) -> Self { Self::ufixp(width, 0) }

    /// Creates a fixed-point type, checking its width.
    pub fn try_new(signed: bool, int_bits: u32, frac_bits: u32) -> Result<Self, FixpError> {
        let width = int_bits.checked_add(frac_bits).ok_or(FixpError::WidthOverflow { width: u32::MAX })?;
        if width == 0 {
            return Err(FixpError::InvalidType("zero-width type".to_string()));
        }
        if width > MAX_WIDTH {
            return Err(FixpError::WidthOverflow { width });
        }
        Ok(Self { signed, int_bits, frac_bits })
    }

    /// Is the type signed?
    pub const fn signed(self) -> bool { self.signed }

    /// Integer bits, sign bit included.
    pub const fn int_bits(self) -> u32 { self.int_bits }

    /// Fractional bits.
    pub const fn frac_bits(self) -> u32 { self.frac_bits }

    /// Total width.
    pub const fn width(self) -> u32 { self.int_bits + self.frac_bits }

    /// Integer types have no fractional bits.
    pub const fn is_integer(self) -> bool { self.frac_bits == 0 }

    /// Smallest raw value.
    pub const fn min_raw(self) -> i128 {
        if self.signed {
            -(1 << (self.width() - 1))
        } else {
            0
        }
    }

    /// Largest raw value.
    pub const fn max_raw(self) -> i128 {
        if self.signed {
            (1 << (self.width() - 1)) - 1
        } else {
            ((1u128 << self.width()) - 1) as i128
        }
    }

    /// Value of one raw unit (the ULP).
    pub fn quantum(self) -> f64 { 2f64.powi(-(self.frac_bits as i32)) }

    /// Smallest representable value.
    pub fn fmin(self) -> f64 { self.min_raw() as f64 * self.quantum() }

    /// Largest representable value.
    pub fn fmax(self) -> f64 { self.max_raw() as f64 * self.quantum() }

    /// Checks whether the raw value is representable.
    pub const fn contains_raw(self, raw: i128) -> bool { raw >= self.min_raw() && raw <= self.max_raw() }

    /// Integer bits needed to hold this type inside a type with the given signedness.
    const fn int_bits_as(self, signed: bool) -> u32 {
        if signed && !self.signed {
            self.int_bits + 1
        } else {
            self.int_bits
        }
    }

    /// Result type of an exact addition.
    pub fn add_typ(self, rhs: Self) -> Result<Self, FixpError> {
        let signed = self.signed || rhs.signed;
        let int_bits = self.int_bits_as(signed).max(rhs.int_bits_as(signed)) + 1;
        Self::try_new(signed, int_bits, self.frac_bits.max(rhs.frac_bits))
    }

    /// Result type of an exact subtraction. Differences are always signed.
    pub fn sub_typ(self, rhs: Self) -> Result<Self, FixpError> {
        let int_bits = self.int_bits_as(true).max(rhs.int_bits_as(true)) + 1;
        Self::try_new(true, int_bits, self.frac_bits.max(rhs.frac_bits))
    }

    /// Result type of an exact multiplication.
    pub fn mul_typ(self, rhs: Self) -> Result<Self, FixpError> {
        Self::try_new(self.signed || rhs.signed, self.int_bits + rhs.int_bits, self.frac_bits + rhs.frac_bits)
    }

    /// Result type of an exact negation.
    pub fn neg_typ(self) -> Result<Self, FixpError> { Self::try_new(true, self.int_bits_as(true) + 1, self.frac_bits) }

    /// Result type of rounding to `frac_bits` fractional bits. Rounding may carry into a new integer bit.
    pub fn round_typ(self, frac_bits: u32) -> Result<Self, FixpError> {
        if frac_bits >= self.frac_bits {
            Self::try_new(self.signed, self.int_bits, frac_bits)
        } else {
            Self::try_new(self.signed, self.int_bits + 1, frac_bits)
        }
    }
}

impl fmt::Display for FixpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.signed, self.is_integer()) {
            (true, true) => write!(f, "Int[{}]", self.width()),
            (false, true) => write!(f, "Uint[{}]", self.width()),
            (true, false) => write!(f, "Fixp[{}, {}]", self.int_bits, self.frac_bits),
            (false, false) => write!(f, "Ufixp[{}, {}]", self.int_bits, self.frac_bits),
        }
    }
}

macro_rules! policy {
    (
        $(#[$meta:meta])* $name:ident, $kind:literal,
        $($(#[$vmeta:meta])* $variant:ident = $tag:literal / $text:literal),+
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            const CHOICES: &'static str = concat!($(stringify!($name), "::", stringify!($variant), "|"),+);
        }

        impl TryFrom<u8> for $name {
            type Error = FixpError;

            fn try_from(tag: u8) -> Result<Self, Self::Error> {
                match tag {
                    $($tag => Ok(Self::$variant),)+
                    _ => Err(FixpError::InvalidPolicy { kind: $kind, choices: Self::CHOICES, tag: tag.to_string() }),
                }
            }
        }

        impl FromStr for $name {
            type Err = FixpError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(FixpError::InvalidPolicy { kind: $kind, choices: Self::CHOICES, tag: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }
    };
}

policy! {
    /// Rule for discarding fractional precision.
    Quantization, "quantization",
    /// Drops the excess low-order bits (floor toward negative infinity).
    #[default]
    Truncate = 0 / "truncate",
    /// Round to nearest, ties round half up (toward positive infinity).
    Round = 1 / "round"
}

policy! {
    /// Rule for handling out-of-range results.
    Overflow, "overflow",
    /// Two's-complement wrap modulo `2^width`.
    #[default]
    WrapAround = 0 / "wrap_around",
    /// Clamp to the target range.
    Saturate = 1 / "saturate"
}

policy! {
    /// Operation of an add/sub block.
    Operation, "operation",
    /// Addition.
    #[default]
    Add = 0 / "add",
    /// Subtraction, the first operand is the minuend.
    Sub = 1 / "sub"
}

/// Fixed-point number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixp {
    typ: FixpType,
    raw: i128,
}

/// Number of bits needed to represent `raw` as a signed number.
fn signed_bits(raw: i128) -> u32 {
    if raw < 0 {
        i128::BITS - (!raw).leading_zeros() + 1
    } else {
        i128::BITS - raw.leading_zeros() + 1
    }
}

impl Fixp {
    /// Creates a number from its raw (scaled integer) representation.
    pub fn from_raw(typ: FixpType, raw: i128) -> Result<Self, FixpError> {
        if typ.contains_raw(raw) {
            Ok(Self { typ, raw })
        } else {
            Err(FixpError::RawOutOfRange { raw, typ })
        }
    }

    /// Creates a number from a literal, rounding to the nearest representable value (ties away from zero).
    ///
    /// Out-of-range literals are rejected, never wrapped.
    pub fn from_f64(typ: FixpType, value: f64) -> Result<Self, FixpError> {
        if !value.is_finite() {
            return Err(FixpError::NotFinite(value));
        }
        let out_of_range = || FixpError::OutOfRange { value, typ, min: typ.fmin(), max: typ.fmax() };
        let scaled = (value / typ.quantum()).round();
        // Both bounds are powers of two, so they convert exactly and the cast below cannot saturate.
        if !(scaled >= i128::MIN as f64 && scaled < i128::MAX as f64) {
            return Err(out_of_range());
        }
        let raw = scaled as i128;
        if !typ.contains_raw(raw) {
            return Err(out_of_range());
        }
        Ok(Self { typ, raw })
    }

    /// Creates a number from an integer value.
    pub fn from_int(typ: FixpType, value: i128) -> Result<Self, FixpError> {
        let out_of_range = || FixpError::RawOutOfRange { raw: value, typ };
        if signed_bits(value) + typ.frac_bits > MAX_WIDTH + 1 {
            return Err(out_of_range());
        }
        Self::from_raw(typ, value << typ.frac_bits).map_err(|_| out_of_range())
    }

    /// Zero.
    pub const fn zero(typ: FixpType) -> Self { Self { typ, raw: 0 } }

    /// Largest value of the type.
    pub const fn max(typ: FixpType) -> Self { Self { typ, raw: typ.max_raw() } }

    /// Smallest value of the type.
    pub const fn min(typ: FixpType) -> Self { Self { typ, raw: typ.min_raw() } }

    /// Type.
    pub const fn typ(&self) -> FixpType { self.typ }

    /// Raw representation.
    pub const fn raw(&self) -> i128 { self.raw }

    /// Is the value negative?
    pub const fn is_neg(&self) -> bool { self.raw < 0 }

    /// Converts into a float.
    pub fn to_f64(&self) -> f64 { self.raw as f64 * self.typ.quantum() }

    /// Integer part, rounded toward negative infinity.
    pub const fn to_int(&self) -> i128 { self.raw >> self.typ.frac_bits }

    /// Compares values regardless of their types.
    pub fn eq_value(&self, other: &Self) -> bool {
        let (hi, lo) = if self.typ.frac_bits >= other.typ.frac_bits { (self, other) } else { (other, self) };
        let shift = hi.typ.frac_bits - lo.typ.frac_bits;
        (hi.raw as u128) & ((1u128 << shift) - 1) == 0 && hi.raw >> shift == lo.raw
    }

    /// Raw value aligned to `frac_bits` fractional bits. The caller guarantees that it fits.
    fn aligned(&self, frac_bits: u32) -> i128 { self.raw << (frac_bits - self.typ.frac_bits) }

    /// Exact addition.
    pub fn checked_add(self, rhs: Self) -> Result<Self, FixpError> {
        let typ = self.typ.add_typ(rhs.typ)?;
        Ok(Self { typ, raw: self.aligned(typ.frac_bits) + rhs.aligned(typ.frac_bits) })
    }

    /// Exact subtraction.
    pub fn checked_sub(self, rhs: Self) -> Result<Self, FixpError> {
        let typ = self.typ.sub_typ(rhs.typ)?;
        Ok(Self { typ, raw: self.aligned(typ.frac_bits) - rhs.aligned(typ.frac_bits) })
    }

    /// Exact multiplication.
    pub fn checked_mul(self, rhs: Self) -> Result<Self, FixpError> {
        let typ = self.typ.mul_typ(rhs.typ)?;
        Ok(Self { typ, raw: self.raw * rhs.raw })
    }

    /// Exact negation.
    pub fn checked_neg(self) -> Result<Self, FixpError> {
        let typ = self.typ.neg_typ()?;
        Ok(Self { typ, raw: -self.raw })
    }

    /// Rounds to `frac_bits` fractional bits (round half up), keeping one extra integer bit for the carry.
    pub fn round(self, frac_bits: u32) -> Result<Self, FixpError> {
        let typ = self.typ.round_typ(frac_bits)?;
        Ok(Self { typ, raw: self.rescale(frac_bits, Quantization::Round).unwrap_or(0) })
    }

    /// Truncates to the target type: floor of the fractional excess, two's-complement wrap of the integer part.
    pub fn truncate(self, target: FixpType) -> Self {
        self.quantize(target, Quantization::Truncate, Overflow::WrapAround)
    }

    /// Saturates to the target type: floor of the fractional excess, clamp of the integer part.
    pub fn saturate(self, target: FixpType) -> Self {
        self.quantize(target, Quantization::Truncate, Overflow::Saturate)
    }

    /// Converts to the target type applying exactly one quantization policy and one overflow policy.
    pub fn quantize(self, target: FixpType, quantization: Quantization, overflow: Overflow) -> Self {
        match (self.rescale(target.frac_bits, quantization), overflow) {
            (Some(raw), Overflow::WrapAround) => Self { typ: target, raw: wrap(raw, target) },
            (Some(raw), Overflow::Saturate) => Self { typ: target, raw: raw.clamp(target.min_raw(), target.max_raw()) },
            // The aligned value does not even fit in 128 bits.
            (None, Overflow::WrapAround) => {
                let shift = target.frac_bits - self.typ.frac_bits;
                Self { typ: target, raw: wrap(self.raw.wrapping_shl(shift), target) }
            }
            (None, Overflow::Saturate) => {
                if self.is_neg() {
                    Self::min(target)
                } else {
                    Self::max(target)
                }
            }
        }
    }

    /// Rescales the raw value to `frac_bits` fractional bits. Returns `None` if it would not fit in `i128`.
    fn rescale(&self, frac_bits: u32, quantization: Quantization) -> Option<i128> {
        if frac_bits >= self.typ.frac_bits {
            let shift = frac_bits - self.typ.frac_bits;
            if signed_bits(self.raw) + shift > i128::BITS {
                return None;
            }
            return Some(self.raw << shift);
        }

        let shift = self.typ.frac_bits - frac_bits;
        let floor = self.raw >> shift;
        Some(match quantization {
            Quantization::Truncate => floor,
            Quantization::Round => floor + ((self.raw >> (shift - 1)) & 1),
        })
    }
}

/// Two's-complement wrap of `raw` into `typ`.
fn wrap(raw: i128, typ: FixpType) -> i128 {
    let width = typ.width();
    let mask = (1u128 << width) - 1;
    let low = raw as u128 & mask;
    if typ.signed && (low >> (width - 1)) & 1 == 1 {
        (low | !mask) as i128
    } else {
        low as i128
    }
}

impl fmt::Display for Fixp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.to_f64(), self.typ) }
}

macro_rules! impl_fixp_op {
    ($trait:ident, $method:ident) => {
        paste! {
            impl $trait for Fixp {
                type Output = Fixp;

                /// # Panics
                ///
                /// Panics if the exact result is wider than [`MAX_WIDTH`].
                fn $method(self, rhs: Fixp) -> Fixp {
                    match self.[<checked_ $method>](rhs) {
                        Ok(result) => result,
                        Err(e) => panic!("fixed-point {}: {}", stringify!($method), e),
                    }
                }
            }
        }
    };
}

impl_fixp_op!(Add, add);
impl_fixp_op!(Sub, sub);
impl_fixp_op!(Mul, mul);

impl Neg for Fixp {
    type Output = Fixp;

    fn neg(self) -> Fixp {
        match self.checked_neg() {
            Ok(result) => result,
            Err(e) => panic!("fixed-point neg: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q15: FixpType = FixpType::fixp(1, 15);

    #[test]
    fn ranges() {
        assert_eq!(Q15.min_raw(), -32768);
        assert_eq!(Q15.max_raw(), 32767);
        assert_eq!(Q15.fmin(), -1.0);
        assert_eq!(FixpType::uint(8).max_raw(), 255);
        assert_eq!(FixpType::ufixp(127, 0).max_raw(), i128::MAX);
        assert_eq!(FixpType::fixp(5, 27).to_string(), "Fixp[5, 27]");
        assert_eq!(FixpType::int(16).to_string(), "Int[16]");
    }

    #[test]
    fn literal_out_of_range_is_rejected() {
        assert!(matches!(Fixp::from_f64(Q15, 1.0), Err(FixpError::OutOfRange { .. })));
        assert!(matches!(Fixp::from_f64(Q15, f64::NAN), Err(FixpError::NotFinite(_))));
        assert_eq!(Fixp::from_f64(Q15, -1.0).unwrap().raw(), -32768);
        assert!(Fixp::from_int(FixpType::int(4), 8).is_err());
        assert_eq!(Fixp::from_int(FixpType::fixp(4, 3), -8).unwrap().raw(), -64);
    }

    #[test]
    fn wide_literals_check_the_exact_bound() {
        let i64_t = FixpType::int(64);
        let top = 2f64.powi(63);
        assert!(matches!(Fixp::from_f64(i64_t, top), Err(FixpError::OutOfRange { .. })));
        assert_eq!(Fixp::from_f64(i64_t, -top).unwrap().raw(), i128::from(i64::MIN));
        assert!(Fixp::from_f64(FixpType::uint(64), 2f64.powi(64)).is_err());
        assert!(Fixp::from_f64(FixpType::ufixp(127, 0), 2f64.powi(127)).is_err());
        assert!(Fixp::from_f64(FixpType::ufixp(127, 0), 2f64.powi(126)).is_ok());
    }

    #[test]
    fn exact_arithmetic_types() {
        let a = Fixp::from_f64(FixpType::fixp(2, 3), 1.5).unwrap();
        let b = Fixp::from_f64(FixpType::ufixp(3, 1), 6.5).unwrap();
        let sum = a + b;
        assert_eq!(sum.typ(), FixpType::fixp(5, 3));
        assert_eq!(sum.to_f64(), 8.0);
        let diff = a - b;
        assert_eq!(diff.typ(), FixpType::fixp(5, 3));
        assert_eq!(diff.to_f64(), -5.0);
        let prod = a * b;
        assert_eq!(prod.typ(), FixpType::fixp(5, 4));
        assert_eq!(prod.to_f64(), 9.75);
        assert_eq!((-a).to_f64(), -1.5);
    }

    #[test]
    fn rounding_is_half_up() {
        let t = FixpType::fixp(4, 2);
        let half = Fixp::from_f64(t, 0.5).unwrap();
        assert_eq!(half.round(0).unwrap().to_f64(), 1.0);
        let neg_half = Fixp::from_f64(t, -0.5).unwrap();
        assert_eq!(neg_half.round(0).unwrap().to_f64(), 0.0);
        let neg = Fixp::from_f64(t, -1.75).unwrap();
        assert_eq!(neg.round(0).unwrap().to_f64(), -2.0);
        assert_eq!(neg.truncate(FixpType::int(4)).to_f64(), -2.0);
        assert_eq!(neg.round(0).unwrap().typ(), FixpType::fixp(5, 0));
    }

    #[test]
    fn wrap_and_saturate_at_the_boundary() {
        let wide = FixpType::fixp(3, 15);
        let max = Fixp::max(Q15);
        let at_max = Fixp::from_raw(wide, max.raw()).unwrap();
        assert_eq!(at_max.saturate(Q15), max);
        let above = Fixp::from_raw(wide, max.raw() + 1).unwrap();
        assert_eq!(above.saturate(Q15), max);
        assert_eq!(above.truncate(Q15), Fixp::min(Q15));
    }

    #[test]
    fn huge_left_shift_saturates() {
        let x = Fixp::from_int(FixpType::int(100), -(1 << 90)).unwrap();
        let target = FixpType::fixp(2, 60);
        assert_eq!(x.saturate(target), Fixp::min(target));
        assert_eq!(x.truncate(target).raw(), 0);
    }

    #[test]
    fn policies_from_tags() {
        assert_eq!(Overflow::try_from(1).unwrap(), Overflow::Saturate);
        assert_eq!("round".parse::<Quantization>().unwrap(), Quantization::Round);
        let err = Quantization::try_from(2).unwrap_err();
        assert!(err.to_string().contains("Quantization::Truncate|Quantization::Round"));
        assert!("add_sub".parse::<Operation>().is_err());
    }

    #[test]
    fn value_equality_across_types() {
        let a = Fixp::from_f64(FixpType::fixp(4, 2), 1.25).unwrap();
        let b = Fixp::from_f64(FixpType::fixp(8, 10), 1.25).unwrap();
        assert!(a.eq_value(&b));
        assert!(!a.eq_value(&Fixp::zero(FixpType::int(3))));
    }
}
