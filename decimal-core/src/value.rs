//! The closed tagged union the evaluator's value stack is built from:
//! `Value ∈ {Real(Decimal), Complex(Decimal, Decimal)}`, dispatching
//! arithmetic on the tag instead of duck-typing on operand shape.

use crate::complex::ComplexDecimal;
use crate::decimal::Decimal;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum Value {
    Real(Decimal),
    Complex(ComplexDecimal),
}

impl Value {
    pub fn acc(&self) -> u32 {
        match self {
            Value::Real(d) => d.acc(),
            Value::Complex(c) => c.acc(),
        }
    }

    pub fn is_real(&self) -> bool {
        match self {
            Value::Real(_) => true,
            Value::Complex(c) => c.is_real(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Real(d) => d.is_zero(),
            Value::Complex(c) => c.is_zero(),
        }
    }

    /// Drops an imaginary part that normalized to zero so real-only
    /// identities (`(1+i)^8 == 16`) compare as real values.
    pub fn simplify(self) -> Value {
        match self {
            Value::Complex(c) if c.is_real() => Value::Real(c.re().clone()),
            other => other,
        }
    }

    pub fn as_complex(&self) -> ComplexDecimal {
        match self {
            Value::Real(d) => ComplexDecimal::from_real(d.clone()),
            Value::Complex(c) => c.clone(),
        }
    }

    pub fn re(&self) -> Decimal {
        match self {
            Value::Real(d) => d.clone(),
            Value::Complex(c) => c.re().clone(),
        }
    }

    pub fn im(&self) -> Decimal {
        match self {
            Value::Real(d) => Decimal::zero(d.acc()),
            Value::Complex(c) => c.im().clone(),
        }
    }

    pub fn conj(&self) -> Value {
        match self {
            Value::Real(d) => Value::Real(d.clone()),
            Value::Complex(c) => Value::Complex(c.conj()),
        }
    }

    pub fn neg(&self) -> Value {
        match self {
            Value::Real(d) => Value::Real(d.neg()),
            Value::Complex(c) => Value::Complex(c.neg()),
        }
    }

    pub fn add(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => Value::Real(a.add(b)),
            _ => Value::Complex(self.as_complex().add(&other.as_complex())).simplify(),
        }
    }

    pub fn sub(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => Value::Real(a.sub(b)),
            _ => Value::Complex(self.as_complex().sub(&other.as_complex())).simplify(),
        }
    }

    pub fn mul(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => Value::Real(a.mul(b)),
            _ => Value::Complex(self.as_complex().mul(&other.as_complex())).simplify(),
        }
    }

    pub fn checked_div(&self, other: &Value, acc: u32) -> Result<Value> {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => Ok(Value::Real(a.checked_div(b, acc)?)),
            _ => Ok(Value::Complex(self.as_complex().checked_div(&other.as_complex(), acc)?).simplify()),
        }
    }

    /// `mod(a,b) = a - b*floor(a/b)`, real operands only.
    pub fn checked_rem(&self, other: &Value, acc: u32) -> Result<Value> {
        match (self, other) {
            (Value::Real(a), Value::Real(b)) => Ok(Value::Real(a.checked_rem(b, acc)?)),
            _ => Err(Error::Undefined("mod is only defined for real operands".into())),
        }
    }

    pub fn floor(&self) -> Result<Value> {
        match self {
            Value::Real(d) => Ok(Value::Real(d.floor())),
            Value::Complex(_) => Err(Error::Undefined("floor is only defined for real operands".into())),
        }
    }

    pub fn ceil(&self) -> Result<Value> {
        match self {
            Value::Real(d) => Ok(Value::Real(d.ceil())),
            Value::Complex(_) => Err(Error::Undefined("ceil is only defined for real operands".into())),
        }
    }

    pub fn sgn(&self) -> Result<Value> {
        match self {
            Value::Real(d) => Ok(Value::Real(d.sgn())),
            Value::Complex(_) => Err(Error::Undefined("sgn is only defined for real operands".into())),
        }
    }

    /// `abs`: `sqrt(a^2+b^2)`, short-circuited for pure-real/pure-imaginary.
    pub fn abs(&self, acc: u32) -> Result<Decimal> {
        match self {
            Value::Real(d) => Ok(d.abs()),
            Value::Complex(c) => {
                if c.re().is_zero() {
                    return Ok(c.im().abs());
                }
                if c.im().is_zero() {
                    return Ok(c.re().abs());
                }
                let sum_sq = c.re().mul(c.re()).add(&c.im().mul(c.im()));
                crate::transcendental::sqrt_real(&sum_sq, acc)
            }
        }
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Real(d)
    }
}

impl From<ComplexDecimal> for Value {
    fn from(c: ComplexDecimal) -> Self {
        Value::Complex(c).simplify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_drops_zero_imaginary() {
        let v = Value::Complex(ComplexDecimal::new(Decimal::from_i64(3, 30), Decimal::zero(30))).simplify();
        assert!(matches!(v, Value::Real(_)));
    }

    #[test]
    fn abs_of_pure_imaginary_short_circuits() {
        let v = Value::Complex(ComplexDecimal::new(Decimal::zero(30), Decimal::from_i64(-5, 30)));
        let abs = v.abs(30).unwrap();
        assert_eq!(abs.to_normal_string(30), "5");
    }

    #[test]
    fn conj_conj_is_identity() {
        let v = Value::Complex(ComplexDecimal::new(Decimal::from_i64(3, 30), Decimal::from_i64(4, 30)));
        let v2 = v.conj().conj();
        assert!(v.re().eq(&v2.re()) && v.im().eq(&v2.im()));
    }
}
