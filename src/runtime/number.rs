//! Number algebra
//!
//! A number is a finite double or one of three sentinels. IEEE NaN and
//! infinities never appear inside [`Number::Value`]; [`Number::new`] folds
//! them into the dedicated variants, and every operator result goes
//! through it.
//!
//! Two rules differ from IEEE-754:
//! - `NaN == NaN` is true
//! - `finite / 0` dispatches on the dividend's sign only, so the sign of a
//!   zero divisor is ignored

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Numeric value with explicit NaN and infinity states
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Finite double. Build through [`Number::new`] or `From`; a non-finite
    /// payload here trips a debug assertion in the operators.
    Value(f64),
    NaN,
    Infinity,
    NegInfinity,
}

impl Number {
    /// Wrap a double, mapping NaN and infinities to their variants
    #[inline]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Number::NaN
        } else if value == f64::INFINITY {
            Number::Infinity
        } else if value == f64::NEG_INFINITY {
            Number::NegInfinity
        } else {
            Number::Value(value)
        }
    }

    /// Value as an IEEE double
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            Number::Value(v) => v,
            Number::NaN => f64::NAN,
            Number::Infinity => f64::INFINITY,
            Number::NegInfinity => f64::NEG_INFINITY,
        }
    }

    #[inline]
    pub fn is_nan(self) -> bool {
        matches!(self, Number::NaN)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        matches!(self, Number::Value(_))
    }

    /// False for NaN and zero
    pub fn to_boolean(self) -> bool {
        match self {
            Number::Value(v) => v != 0.0,
            Number::NaN => false,
            Number::Infinity | Number::NegInfinity => true,
        }
    }

    fn compare(self, other: Number) -> Option<Ordering> {
        self.debug_check();
        other.debug_check();
        match (self, other) {
            (Number::NaN, _) | (_, Number::NaN) => None,
            (Number::Infinity, Number::Infinity) => Some(Ordering::Equal),
            (Number::NegInfinity, Number::NegInfinity) => Some(Ordering::Equal),
            (Number::Infinity, _) | (_, Number::NegInfinity) => Some(Ordering::Greater),
            (Number::NegInfinity, _) | (_, Number::Infinity) => Some(Ordering::Less),
            (Number::Value(a), Number::Value(b)) => a.partial_cmp(&b),
        }
    }

    #[inline]
    pub fn gt(self, other: Number) -> bool {
        matches!(self.compare(other), Some(Ordering::Greater))
    }

    #[inline]
    pub fn ge(self, other: Number) -> bool {
        matches!(
            self.compare(other),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    #[inline]
    pub fn lt(self, other: Number) -> bool {
        matches!(self.compare(other), Some(Ordering::Less))
    }

    #[inline]
    pub fn le(self, other: Number) -> bool {
        matches!(self.compare(other), Some(Ordering::Less | Ordering::Equal))
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::Value(0.0)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Value(a), Number::Value(b)) => a == b,
            (Number::NaN, Number::NaN)
            | (Number::Infinity, Number::Infinity)
            | (Number::NegInfinity, Number::NegInfinity) => true,
            _ => false,
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::new(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Value(value as f64)
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Number::Value(value as f64)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Value(v) => write!(f, "{v:.6}"),
            Number::NaN => f.write_str("NaN"),
            Number::Infinity => f.write_str("Infinity"),
            Number::NegInfinity => f.write_str("-Infinity"),
        }
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Value(v) => Number::Value(-v),
            Number::NaN => Number::NaN,
            Number::Infinity => Number::NegInfinity,
            Number::NegInfinity => Number::Infinity,
        }
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, rhs: Number) -> Number {
        self.debug_check();
        rhs.debug_check();
        match (self, rhs) {
            (Number::NaN, _) | (_, Number::NaN) => Number::NaN,
            (Number::Infinity, Number::NegInfinity) | (Number::NegInfinity, Number::Infinity) => {
                Number::NaN
            }
            (Number::Infinity, _) | (_, Number::Infinity) => Number::Infinity,
            (Number::NegInfinity, _) | (_, Number::NegInfinity) => Number::NegInfinity,
            (Number::Value(a), Number::Value(b)) => Number::new(a + b),
        }
    }
}

impl Sub for Number {
    type Output = Number;

    #[inline]
    fn sub(self, rhs: Number) -> Number {
        self + (-rhs)
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, rhs: Number) -> Number {
        self.debug_check();
        rhs.debug_check();
        match (self, rhs) {
            (Number::NaN, _) | (_, Number::NaN) => Number::NaN,
            (Number::Value(a), Number::Value(b)) => Number::new(a * b),
            // at least one side is infinite from here on
            (Number::Value(v), _) | (_, Number::Value(v)) if v == 0.0 => Number::NaN,
            _ => {
                if self.is_negative() == rhs.is_negative() {
                    Number::Infinity
                } else {
                    Number::NegInfinity
                }
            }
        }
    }
}

impl Div for Number {
    type Output = Number;

    fn div(self, rhs: Number) -> Number {
        self.debug_check();
        rhs.debug_check();
        match (self, rhs) {
            (Number::NaN, _) | (_, Number::NaN) => Number::NaN,
            (Number::Infinity | Number::NegInfinity, Number::Infinity | Number::NegInfinity) => {
                Number::NaN
            }
            (Number::Infinity, Number::Value(b)) => {
                if b >= 0.0 {
                    Number::Infinity
                } else {
                    Number::NegInfinity
                }
            }
            (Number::NegInfinity, Number::Value(b)) => {
                if b >= 0.0 {
                    Number::NegInfinity
                } else {
                    Number::Infinity
                }
            }
            (Number::Value(_), Number::Infinity | Number::NegInfinity) => Number::Value(0.0),
            (Number::Value(a), Number::Value(b)) if b == 0.0 => {
                if a > 0.0 {
                    Number::Infinity
                } else if a < 0.0 {
                    Number::NegInfinity
                } else {
                    Number::NaN
                }
            }
            (Number::Value(a), Number::Value(b)) => Number::new(a / b),
        }
    }
}

impl Number {
    #[inline]
    fn debug_check(self) {
        debug_assert!(
            !matches!(self, Number::Value(v) if !v.is_finite()),
            "non-finite {self:?}: build numbers with Number::new"
        );
    }

    /// Sign used for infinite products; NaN never reaches here
    #[inline]
    fn is_negative(self) -> bool {
        match self {
            Number::Value(v) => v < 0.0,
            Number::NegInfinity => true,
            Number::Infinity | Number::NaN => false,
        }
    }
}
