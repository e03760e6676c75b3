//! Numeric values with a long or double representation.

use super::stringify::{detect_number, NumberType};
use crate::core::error::{DattyError, DattyResult};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Representation kind of a [`PackableNumber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Long,
    Double,
}

/// A number that is either a signed 64-bit integer or a double.
///
/// Arithmetic keeps the kind when both operands agree and promotes to
/// `Double` when they differ. Long arithmetic wraps on overflow.
#[derive(Debug, Clone, Copy)]
pub enum PackableNumber {
    Long(i64),
    Double(f64),
}

impl PackableNumber {
    pub fn kind(&self) -> NumberKind {
        match self {
            Self::Long(_) => NumberKind::Long,
            Self::Double(_) => NumberKind::Double,
        }
    }

    /// Integer value; doubles truncate toward zero and saturate.
    pub fn as_long(&self) -> i64 {
        match *self {
            Self::Long(v) => v,
            Self::Double(v) => v as i64,
        }
    }

    /// Double value; longs above 2^53 may lose precision.
    pub fn as_double(&self) -> f64 {
        match *self {
            Self::Long(v) => v as f64,
            Self::Double(v) => v,
        }
    }

    /// Textual form. Doubles always carry a fractional part or exponent.
    pub fn as_string(&self) -> String {
        match *self {
            Self::Long(v) => v.to_string(),
            Self::Double(v) => format!("{:?}", v),
        }
    }

    pub fn add(&self, other: &PackableNumber) -> PackableNumber {
        match (*self, *other) {
            (Self::Long(a), Self::Long(b)) => Self::Long(a.wrapping_add(b)),
            (a, b) => Self::Double(a.as_double() + b.as_double()),
        }
    }

    pub fn subtract(&self, other: &PackableNumber) -> PackableNumber {
        match (*self, *other) {
            (Self::Long(a), Self::Long(b)) => Self::Long(a.wrapping_sub(b)),
            (a, b) => Self::Double(a.as_double() - b.as_double()),
        }
    }

    /// Parse a numeric literal.
    ///
    /// Literals that are not numeric at all fail with a parse error; numeric
    /// literals that do not fit their type fail with a number-format error.
    pub fn parse(literal: &str) -> DattyResult<Self> {
        match detect_number(literal) {
            NumberType::Long => literal
                .parse::<i64>()
                .map(Self::Long)
                .map_err(|_| DattyError::number_format(literal)),
            NumberType::Double => literal
                .parse::<f64>()
                .map(Self::Double)
                .map_err(|_| DattyError::number_format(literal)),
            NumberType::NaN => Err(DattyError::parse(format!(
                "not a numeric literal: {:?}",
                literal
            ))),
        }
    }

    /// Bits used for equality and hashing; all NaNs collapse to one value.
    fn double_bits(v: f64) -> u64 {
        if v.is_nan() {
            f64::NAN.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl PartialEq for PackableNumber {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => Self::double_bits(a) == Self::double_bits(b),
            _ => false,
        }
    }
}

impl Eq for PackableNumber {}

impl Hash for PackableNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match *self {
            Self::Long(v) => v.hash(state),
            Self::Double(v) => Self::double_bits(v).hash(state),
        }
    }
}

impl FromStr for PackableNumber {
    type Err = DattyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for PackableNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<i64> for PackableNumber {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<i32> for PackableNumber {
    fn from(v: i32) -> Self {
        Self::Long(v as i64)
    }
}

impl From<f64> for PackableNumber {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}
