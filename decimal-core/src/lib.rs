//! decimal-core - arbitrary-precision decimal and complex arithmetic
//!
//! This crate provides the data model and numeric kernel shared by the
//! expression evaluator:
//! - `Decimal`: an arbitrary-precision signed decimal, `(mantissa, power, acc)`
//! - `ComplexDecimal`: a pair of `Decimal`s sharing a declared precision
//! - `Value`: the tagged union `Real`/`Complex` operations dispatch on
//! - `Error`: the closed error taxonomy every fallible operation returns
//! - `GlobalConfig`: process-wide defaults and precomputed constants
//! - the `transcendental` module: `exp`, `ln`, trig/hyperbolic families,
//!   `pow`, `fact`/`gamma`, `arg`/`toPolar`

mod complex;
mod config;
mod decimal;
mod error;
mod transcendental;
mod value;

pub use complex::ComplexDecimal;
pub use config::{emit_warning, take_warnings, ConfigOverrides, Constants, GlobalConfig, LanczosTable, PrintMode, Warning};
pub use decimal::{digit_count, Decimal, MAX_EXPONENT, MIN_EXPONENT};
pub use error::{Error, Result};
pub use value::Value;

pub use transcendental::{
    acos, acosh, arg, asin, asinh, atan, atanh, cbrt, cos, cosh, exp, fact_real, gamma_real, lg,
    ln, log, nroot_real, pow, pow_int_decimal, sin, sinh, sqrt, tan, tanh, to_polar,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{ComplexDecimal, Decimal, Error, GlobalConfig, Result, Value};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_value_roundtrips_through_string() {
        let d = Decimal::from_str("42.5", 30).unwrap();
        let v = Value::Real(d);
        assert_eq!(v.re().to_normal_string(30), "42.5");
        assert!(v.im().is_zero());
    }

    #[test]
    fn complex_value_simplifies_when_imaginary_vanishes() {
        let z = ComplexDecimal::from_str("5+0i", 30).unwrap();
        let v = Value::from(z);
        assert!(matches!(v, Value::Real(_)));
    }

    #[test]
    fn division_by_zero_is_a_typed_error() {
        let cfg = GlobalConfig::default();
        let a = Value::Real(Decimal::from_i64(1, cfg.default_acc));
        let z = Value::Real(Decimal::zero(cfg.default_acc));
        let err = a.checked_div(&z, cfg.default_acc).unwrap_err();
        assert_eq!(err.code(), "DIV_BY_ZERO");
    }

    #[test]
    fn exp_of_zero_is_one() {
        let cfg = GlobalConfig::default();
        let result = exp(&Value::Real(Decimal::zero(20)), &cfg, 20).unwrap();
        assert_eq!(result.re().to_normal_string(20), "1");
    }
}
