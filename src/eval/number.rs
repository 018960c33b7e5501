//! # Numeric Values and Operators
//!
//! Expression results are either exact integers or floats. Integer `+ - *`
//! are checked; mixing an integer with a float promotes to float; `/` always
//! produces a float. Integer literals too large for `i64` evaluate as floats.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::EvaluationError;

// ============================================================================
// NUMBERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(value) => Some(value),
            Number::Float(_) => None,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(value) => value == 0,
            Number::Float(value) => value == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{value}"),
            // Debug keeps the trailing `.0` on whole floats.
            Number::Float(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

// ============================================================================
// BINARY OPERATORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Maps operator token text to an operator.
    pub fn from_symbol(text: &str) -> Result<Self, EvaluationError> {
        match text {
            "+" => Ok(BinaryOp::Add),
            "-" => Ok(BinaryOp::Sub),
            "*" => Ok(BinaryOp::Mul),
            "/" => Ok(BinaryOp::Div),
            other => Err(EvaluationError::UnknownOperator {
                operator: other.to_string(),
            }),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn apply(self, lhs: Number, rhs: Number) -> Result<Number, EvaluationError> {
        if self == BinaryOp::Div {
            if rhs.is_zero() {
                return Err(EvaluationError::DivisionByZero);
            }
            return Ok(Number::Float(lhs.as_f64() / rhs.as_f64()));
        }
        match (lhs, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                let result = match self {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::Div => unreachable!("division handled above"),
                };
                result.map(Number::Int).ok_or_else(|| EvaluationError::Overflow {
                    operation: format!("{a} {} {b}", self.symbol()),
                })
            }
            _ => {
                let (a, b) = (lhs.as_f64(), rhs.as_f64());
                Ok(Number::Float(match self {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                }))
            }
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_is_checked() {
        assert_eq!(BinaryOp::Sub.apply(1.into(), 3.into()), Ok(Number::Int(-2)));
        assert!(matches!(
            BinaryOp::Mul.apply(i64::MAX.into(), 2.into()),
            Err(EvaluationError::Overflow { .. })
        ));
    }

    #[test]
    fn division_is_true_division() {
        assert_eq!(BinaryOp::Div.apply(7.into(), 2.into()), Ok(Number::Float(3.5)));
        assert_eq!(
            BinaryOp::Div.apply(1.into(), Number::Float(0.0)),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn mixed_operands_promote_to_float() {
        assert_eq!(
            BinaryOp::Add.apply(1.into(), Number::Float(0.5)),
            Ok(Number::Float(1.5))
        );
        assert_eq!(Number::Float(2.0).to_string(), "2.0");
    }
}
