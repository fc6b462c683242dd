//! C4 — the transcendental core: `exp`, `ln`, `lg`, `log`, `sqrt`, `cbrt`,
//! `nroot`, `pow`, the trig/inverse-trig and hyperbolic/inverse-hyperbolic
//! families, `fact`/`gamma`, `arg`, `toPolar` (`spec.md` §4.4).
//!
//! Every series here follows the same convergence rule the spec states for
//! `exp`: accumulate terms until the running term's decimal `power` drops
//! below `-(2*acc+1)` or the term normalizes to zero, and raise
//! `Unreliable` if that has not happened within the iteration cap.

use crate::complex::ComplexDecimal;
use crate::config::{emit_warning, GlobalConfig, Warning};
use crate::decimal::Decimal;
use crate::error::{Error, Result};
use crate::value::Value;
use dashu_int::IBig;

fn term_converged(term: &Decimal, acc: u32) -> bool {
    term.is_zero() || term.power() < -(2 * acc as i64 + 1)
}

fn series_cap(acc: u32) -> usize {
    acc as usize + 5
}

// =====================================================================
// exp
// =====================================================================

/// Direct (unreduced) Taylor sum `sum x^n/n!`, used both to bootstrap `e`
/// (where no integer/fractional split is possible — splitting `1` would
/// require `pow(e, 1)`, which needs `e`) and as the reduced `e^(f/10)`
/// step of the general algorithm.
pub(crate) fn exp_raw_series(x: &Decimal, acc: u32, cap: usize) -> Result<Decimal> {
    let mut sum = Decimal::from_i64(1, acc);
    let mut term = Decimal::from_i64(1, acc);
    let mut n: i64 = 0;
    loop {
        n += 1;
        if n as usize > cap {
            return Err(Error::Unreliable(format!("exp series did not converge within {cap} iterations")));
        }
        term = term.mul(x).checked_div(&Decimal::from_i64(n, acc), acc)?;
        if term_converged(&term, acc) {
            break;
        }
        sum = sum.add(&term);
    }
    Ok(sum)
}

/// Computes `e` itself for [`crate::config::Constants::build`]: the general
/// `exp_real` integer fast-path multiplies by the already-known `e`, which
/// is exactly the value this call is trying to produce, so bootstrapping
/// goes straight through the unreduced Taylor series instead.
pub(crate) fn exp_bootstrap(x: &Decimal, acc: u32) -> Decimal {
    exp_raw_series(x, acc, series_cap(acc) + 200).unwrap_or_else(|_| Decimal::zero(acc))
}

/// Real `exp`, `spec.md` §4.4: split `x = i + f`, `e^i` via integer fast
/// exponentiation on the already-known `e`, `e^(f/10)` via the reduced
/// Taylor series, recompose `e^x = (e^(f/10))^10 * e^i`.
pub fn exp_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::from_i64(1, acc));
    }
    if x.is_integer() {
        let n: i64 = decimal_to_i64(x)?;
        return pow_int_decimal(&cfg.constants.e, n, acc);
    }
    let i_part = x.floor();
    let f_part = x.sub(&i_part);
    let ten = Decimal::from_i64(10, acc);
    let f_over_10 = f_part.checked_div(&ten, acc + 5)?;
    let e_f10 = exp_raw_series(&f_over_10, acc + 5, series_cap(acc))?;
    let e_f = pow_int_decimal(&e_f10, 10, acc)?;
    let n: i64 = decimal_to_i64(&i_part)?;
    let e_i = pow_int_decimal(&cfg.constants.e, n, acc)?;
    Ok(e_f.mul(&e_i).with_acc(acc)?)
}

/// Complex `exp z = e^a (cos b + i sin b)`.
pub fn exp_complex(z: &ComplexDecimal, cfg: &GlobalConfig, acc: u32) -> Result<ComplexDecimal> {
    let ea = exp_real(z.re(), cfg, acc)?;
    let cb = cos_real(z.im(), cfg, acc)?;
    let sb = sin_real(z.im(), cfg, acc)?;
    Ok(ComplexDecimal::new(ea.mul(&cb), ea.mul(&sb)))
}

pub fn exp(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) => Ok(Value::Real(exp_real(d, cfg, acc)?)),
        Value::Complex(c) => Ok(Value::from(exp_complex(c, cfg, acc)?)),
    }
}

fn decimal_to_i64(d: &Decimal) -> Result<i64> {
    let s = d.to_normal_string(d.acc());
    s.split('.').next().unwrap_or("0").parse::<i64>().map_err(|_| Error::Overflow("integer part does not fit in i64".into()))
}

// =====================================================================
// ln
// =====================================================================

fn artanh_raw(z: &Decimal, acc: u32, cap: usize) -> Result<Decimal> {
    let z2 = z.mul(z);
    let mut sum = z.clone();
    let mut term = z.clone();
    let mut n: i64 = 1;
    loop {
        n += 2;
        if (n as usize) / 2 > cap {
            return Err(Error::Unreliable(format!("artanh series did not converge within {cap} iterations")));
        }
        term = term.mul(&z2);
        let next = term.checked_div(&Decimal::from_i64(n, acc), acc)?;
        if term_converged(&next, acc) {
            break;
        }
        sum = sum.add(&next);
    }
    Ok(sum)
}

/// Computes `ln(y)` directly from `artanh((y-1)/(y+1))` with no range
/// reduction. Only used to bootstrap `ln10`/`ln1.2` in
/// [`crate::config::Constants::build`] — the general reduction loop
/// recomposes through those two constants and would be circular if used
/// to derive them.
pub(crate) fn ln_bootstrap(y: &Decimal, acc: u32) -> Decimal {
    let one = Decimal::from_i64(1, acc);
    let z = y.sub(&one).checked_div(&y.add(&one), acc).expect("y + 1 != 0 for y > 0");
    let two = Decimal::from_i64(2, acc);
    let cap = acc as usize * 8 + 200;
    artanh_raw(&z, acc, cap).expect("bootstrap constants converge well within their generous cap").mul(&two)
}

/// Real `ln`, `spec.md` §4.4: reduce by `10^k` into `(0,1]`, then by
/// `1.2^j` into `[0.9,1.1)`, apply `ln y = 2*artanh((y-1)/(y+1))`, and
/// recompose `ln x = 2*artanh(z) + k*ln10 + j*ln1.2`.
pub fn ln_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Err(Error::Undefined("ln(0)".into()));
    }
    if x.is_negative() {
        return Err(Error::Undefined("ln of a negative real; use the complex form".into()));
    }
    let working = acc + 5;
    let one = Decimal::from_i64(1, working);
    let ten = Decimal::from_i64(10, working);
    let one_point_two = Decimal::from_str("1.2", working)?;

    // Stage 1: scale so the value lands in (0, 1].
    let mut y = x.with_acc(working)?;
    let mut k: i64 = 0;
    while y.cmp(&one) == std::cmp::Ordering::Greater {
        y = y.checked_div(&ten, working)?;
        k += 1;
    }
    while y.cmp(&Decimal::from_str("0.1", working)?) != std::cmp::Ordering::Greater {
        y = y.mul(&ten);
        k -= 1;
    }

    // Stage 2: scale so the value lands in [0.9, 1.1).
    let lo = Decimal::from_str("0.9", working)?;
    let hi = Decimal::from_str("1.1", working)?;
    let mut j: i64 = 0;
    let cap = series_cap(acc) + 64;
    let mut guard = 0usize;
    while y.cmp(&lo) == std::cmp::Ordering::Less {
        y = y.mul(&one_point_two);
        j += 1;
        guard += 1;
        if guard > cap {
            emit_warning(Warning::PrecisionLoss { op: "ln", detail: "stage-2 reduction did not settle".into() });
            break;
        }
    }
    while y.cmp(&hi) != std::cmp::Ordering::Less {
        y = y.checked_div(&one_point_two, working)?;
        j -= 1;
        guard += 1;
        if guard > cap {
            emit_warning(Warning::PrecisionLoss { op: "ln", detail: "stage-2 reduction did not settle".into() });
            break;
        }
    }

    let z = y.sub(&one).checked_div(&y.add(&one), working)?;
    let artanh = artanh_raw(&z, working, series_cap(acc))?;
    let two = Decimal::from_i64(2, working);
    let result = two
        .mul(&artanh)
        .add(&Decimal::from_i64(k, working).mul(&cfg.constants.ln10))
        .add(&Decimal::from_i64(j, working).mul(&cfg.constants.ln1p2));
    Ok(result.with_acc(acc)?)
}

/// Complex `ln z = ln|z| + i*arg(z)`.
pub fn ln_complex(z: &ComplexDecimal, cfg: &GlobalConfig, acc: u32) -> Result<ComplexDecimal> {
    let magnitude = Value::Complex(z.clone()).abs(acc + 5)?;
    if magnitude.is_zero() {
        return Err(Error::Undefined("ln(0)".into()));
    }
    let modulus_ln = ln_real(&magnitude, cfg, acc)?;
    let argument = arg(&Value::Complex(z.clone()), cfg, acc)?;
    Ok(ComplexDecimal::new(modulus_ln, argument))
}

pub fn ln(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) if !d.is_negative() => Ok(Value::Real(ln_real(d, cfg, acc)?)),
        _ => Ok(Value::from(ln_complex(&v.as_complex(), cfg, acc)?)),
    }
}

/// `lg(x) = ln(x) / ln(10)` (`SPEC_FULL.md` §C.3).
pub fn lg(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let ln_x = ln(v, cfg, acc + 5)?;
    let ln10 = Value::Real(cfg.constants.ln10.clone());
    ln_x.checked_div(&ln10, acc)
}

/// `log(base, x) = ln(x) / ln(base)`.
pub fn log(base: &Value, x: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let ln_x = ln(x, cfg, acc + 5)?;
    let ln_base = ln(base, cfg, acc + 5)?;
    ln_x.checked_div(&ln_base, acc)
}

// =====================================================================
// sin / cos / tan
// =====================================================================

/// `_toLessThanHalfPi`: reduces `|x|` mod `2*pi` using the stored
/// `1/(2*pi)` reciprocal, then folds into `[0, pi/2]` in two steps whose
/// sign effect differs for `sin` (odd) and `cos` (even): folding
/// `(pi,2pi) -> (0,pi)` via `2pi-y` flips `sin` but not `cos`
/// (`sin(2pi-y)=-sin(y)`, `cos(2pi-y)=cos(y)`); folding `(pi/2,pi] ->
/// [0,pi/2)` via `pi-y` flips `cos` but not `sin`
/// (`sin(pi-y)=sin(y)`, `cos(pi-y)=-cos(y)`). Returns the reduced angle
/// plus both flip flags so callers apply whichever one matches their
/// parity.
fn reduce_to_half_pi(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<(Decimal, bool, bool)> {
    let limit = cfg.trig_reduction_digit_limit() as i64;
    if crate::decimal::digit_count(x.mantissa()) as i64 + x.power() > limit {
        emit_warning(Warning::TrigReductionLimit { op: "sin/cos" });
        return Err(Error::Unreliable("argument exceeds the precision of the stored 1/(2*pi) constant".into()));
    }

    let working = acc + 10;
    let mut y = x.with_acc(working)?.abs();

    let two_pi = Decimal::from_i64(2, working).mul(&cfg.constants.pi);
    let k = y.mul(&cfg.constants.inv_two_pi).floor();
    y = y.sub(&k.mul(&two_pi));
    if y.is_negative() {
        y = y.add(&two_pi);
    }

    let pi = cfg.constants.pi.with_acc(working)?;
    let half_pi = pi.checked_div(&Decimal::from_i64(2, working), working)?;

    let mut flip_outer = false;
    let mut flip_inner = false;
    if y.cmp(&pi) == std::cmp::Ordering::Greater {
        y = two_pi.sub(&y);
        flip_outer = true;
    }
    if y.cmp(&half_pi) == std::cmp::Ordering::Greater {
        y = pi.sub(&y);
        flip_inner = true;
    }
    Ok((y.with_acc(acc + 5)?, flip_outer, flip_inner))
}

fn sin_taylor(x: &Decimal, acc: u32) -> Result<Decimal> {
    let x2 = x.mul(x);
    let mut sum = x.clone();
    let mut term = x.clone();
    let mut n: i64 = 1;
    let cap = series_cap(acc);
    loop {
        n += 2;
        if (n as usize) / 2 > cap {
            return Err(Error::Unreliable("sin series did not converge".into()));
        }
        term = term.mul(&x2).neg().checked_div(&Decimal::from_i64((n - 1) * n, acc), acc)?;
        if term_converged(&term, acc) {
            break;
        }
        sum = sum.add(&term);
    }
    Ok(sum)
}

fn cos_taylor(x: &Decimal, acc: u32) -> Result<Decimal> {
    let x2 = x.mul(x);
    let mut sum = Decimal::from_i64(1, acc);
    let mut term = Decimal::from_i64(1, acc);
    let mut n: i64 = 0;
    let cap = series_cap(acc);
    loop {
        n += 2;
        if (n as usize) / 2 > cap {
            return Err(Error::Unreliable("cos series did not converge".into()));
        }
        term = term.mul(&x2).neg().checked_div(&Decimal::from_i64((n - 1) * n, acc), acc)?;
        if term_converged(&term, acc) {
            break;
        }
        sum = sum.add(&term);
    }
    Ok(sum)
}

/// Real `sin`. After `_toLessThanHalfPi`, halves the domain up to 4 times
/// (dividing by 3) and reconstitutes with the triple-angle identity
/// `sin(3*theta) = 3*sin(theta) - 4*sin^3(theta)`.
pub fn sin_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::zero(acc));
    }
    let negative_input = x.is_negative();
    let (reduced, flip_outer, _flip_inner) = reduce_to_half_pi(x, cfg, acc)?;
    let three = Decimal::from_i64(3, acc + 5);
    let mut theta = reduced;
    let mut folds = 0;
    while folds < 4 {
        theta = theta.checked_div(&three, acc + 5)?;
        folds += 1;
    }
    let mut s = sin_taylor(&theta, acc + 5)?;
    for _ in 0..folds {
        let s3 = s.mul(&s).mul(&s);
        s = three.mul(&s).sub(&Decimal::from_i64(4, acc + 5).mul(&s3));
    }
    let mut result = s.with_acc(acc)?;
    if flip_outer {
        result = result.neg();
    }
    if negative_input {
        result = result.neg();
    }
    Ok(result)
}

/// Real `cos`. Same reduction, folded with the quadruple-angle identity
/// `cos(4*theta) = 8*cos^2(theta)*(cos^2(theta)-1) + 1`.
pub fn cos_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::from_i64(1, acc));
    }
    let (reduced, _flip_outer, flip_inner) = reduce_to_half_pi(x, cfg, acc)?;
    let four = Decimal::from_i64(4, acc + 5);
    let mut theta = reduced;
    let mut folds = 0;
    while folds < 4 {
        theta = theta.checked_div(&four, acc + 5)?;
        folds += 1;
    }
    let mut c = cos_taylor(&theta, acc + 5)?;
    for _ in 0..folds {
        let c2 = c.mul(&c);
        c = Decimal::from_i64(8, acc + 5).mul(&c2).mul(&c2.sub(&Decimal::from_i64(1, acc + 5))).add(&Decimal::from_i64(1, acc + 5));
    }
    let mut result = c.with_acc(acc)?;
    if flip_inner {
        result = result.neg();
    }
    Ok(result)
}

pub fn tan_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    let s = sin_real(x, cfg, acc + 5)?;
    let c = cos_real(x, cfg, acc + 5)?;
    if c.is_zero() {
        return Err(Error::Undefined("tan undefined at odd multiples of pi/2".into()));
    }
    Ok(s.checked_div(&c, acc)?)
}

/// Complex `sin z = (e^{iz} - e^{-iz}) / (2i)`, `cos z = (e^{iz}+e^{-iz})/2`.
pub fn sin_complex(z: &ComplexDecimal, cfg: &GlobalConfig, acc: u32) -> Result<ComplexDecimal> {
    let i = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_i64(1, acc + 5));
    let iz = i.mul(z);
    let e_iz = exp_complex(&iz, cfg, acc + 5)?;
    let e_niz = exp_complex(&iz.neg(), cfg, acc + 5)?;
    let numerator = e_iz.sub(&e_niz);
    let two_i = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_i64(2, acc + 5));
    let result = Value::Complex(numerator).checked_div(&Value::Complex(two_i), acc)?;
    Ok(result.as_complex())
}

pub fn cos_complex(z: &ComplexDecimal, cfg: &GlobalConfig, acc: u32) -> Result<ComplexDecimal> {
    let i = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_i64(1, acc + 5));
    let iz = i.mul(z);
    let e_iz = exp_complex(&iz, cfg, acc + 5)?;
    let e_niz = exp_complex(&iz.neg(), cfg, acc + 5)?;
    let sum = e_iz.add(&e_niz);
    let two = Decimal::from_i64(2, acc + 5);
    Ok(ComplexDecimal::new(sum.re().checked_div(&two, acc)?, sum.im().checked_div(&two, acc)?))
}

pub fn sin(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) => Ok(Value::Real(sin_real(d, cfg, acc)?)),
        Value::Complex(c) => Ok(Value::from(sin_complex(c, cfg, acc)?)),
    }
}

pub fn cos(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) => Ok(Value::Real(cos_real(d, cfg, acc)?)),
        Value::Complex(c) => Ok(Value::from(cos_complex(c, cfg, acc)?)),
    }
}

pub fn tan(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let s = sin(v, cfg, acc + 5)?;
    let c = cos(v, cfg, acc + 5)?;
    if c.is_zero() {
        return Err(Error::Undefined("tan undefined at odd multiples of pi/2".into()));
    }
    s.checked_div(&c, acc)
}

// =====================================================================
// arctan / arcsin / arccos
// =====================================================================

fn atan_taylor(x: &Decimal, acc: u32) -> Result<Decimal> {
    let x2 = x.mul(x);
    let mut sum = x.clone();
    let mut term = x.clone();
    let mut sign_flip = true;
    let mut n: i64 = 1;
    let cap = series_cap(acc);
    loop {
        n += 2;
        if (n as usize) / 2 > cap {
            return Err(Error::Unreliable("arctan series did not converge".into()));
        }
        term = term.mul(&x2);
        let mut next = term.checked_div(&Decimal::from_i64(n, acc), acc)?;
        sign_flip = !sign_flip;
        if sign_flip {
            next = next.neg();
        }
        if term_converged(&next, acc) {
            break;
        }
        sum = sum.add(&next);
    }
    Ok(sum)
}

/// Real `arctan`. `spec.md` §4.4: flip sign for negatives, reflect
/// `x > 1` via `pi/2 - arctan(1/x)`, halve the domain up to 4 times via
/// `arctan x = 2*arctan(x/(1+sqrt(1+x^2)))`, then the alternating series.
pub fn atan_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::zero(acc));
    }
    if x.is_negative() {
        return Ok(atan_real(&x.neg(), cfg, acc)?.neg());
    }
    let working = acc + 10;
    let one = Decimal::from_i64(1, working);
    if x.cmp(&one) == std::cmp::Ordering::Greater {
        let half_pi = cfg.constants.pi.checked_div(&Decimal::from_i64(2, working), working)?;
        let recip = one.checked_div(x, working)?;
        return Ok(half_pi.sub(&atan_real(&recip, cfg, working)?).with_acc(acc)?);
    }
    let mut y = x.with_acc(working)?;
    let mut halvings = 0;
    while halvings < 4 {
        let denom = one.add(&sqrt_real(&one.add(&y.mul(&y)), working)?);
        y = y.checked_div(&denom, working)?;
        halvings += 1;
    }
    let mut result = atan_taylor(&y, working)?;
    for _ in 0..halvings {
        result = result.mul(&Decimal::from_i64(2, working));
    }
    Ok(result.with_acc(acc)?)
}

/// Complex `arctan z = (-i/2) ln((i-z)/(i+z))`, undefined at `z = ±i`.
pub fn atan_complex(z: &ComplexDecimal, cfg: &GlobalConfig, acc: u32) -> Result<ComplexDecimal> {
    let i = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_i64(1, acc + 5));
    let numerator = i.sub(z);
    let denominator = i.add(z);
    if Value::Complex(denominator.clone()).is_zero() {
        return Err(Error::Undefined("arctan undefined at z = -i".into()));
    }
    let ratio = Value::Complex(numerator).checked_div(&Value::Complex(denominator), acc + 5)?;
    let ln_ratio = ln_complex(&ratio.as_complex(), cfg, acc + 5)?;
    let neg_i_over_2 = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_str("-0.5", acc + 5)?);
    Ok(neg_i_over_2.mul(&ln_ratio))
}

pub fn atan(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) => Ok(Value::Real(atan_real(d, cfg, acc)?)),
        Value::Complex(c) => Ok(Value::from(atan_complex(c, cfg, acc)?)),
    }
}

/// `arcsin z = -i ln(iz + sqrt(1 - z^2))`; for real `|x|<=1` this reduces
/// to the numerically stable `arg(sqrt(1-x^2) + i*x)`.
pub fn asin(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    if let Value::Real(x) = v {
        let one = Decimal::from_i64(1, acc + 5);
        if x.abs().cmp(&one) != std::cmp::Ordering::Greater {
            let sq = one.sub(&x.mul(x));
            let root = sqrt_real(&sq, acc + 5)?;
            let z = ComplexDecimal::new(root, x.clone());
            return Ok(Value::Real(arg(&Value::Complex(z), cfg, acc)?));
        }
    }
    let z = v.as_complex();
    let i = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_i64(1, acc + 5));
    let one = ComplexDecimal::from_real(Decimal::from_i64(1, acc + 5));
    let z2 = z.mul(&z);
    let inner = Value::Complex(one).sub(&Value::Complex(z2));
    let root = sqrt(&inner, cfg, acc + 5)?;
    let iz = i.mul(&z);
    let sum = Value::Complex(iz).add(&root);
    let ln_sum = ln(&sum, cfg, acc + 5)?;
    let neg_i = ComplexDecimal::new(Decimal::zero(acc + 5), Decimal::from_i64(-1, acc + 5));
    Ok(Value::Complex(neg_i).mul(&ln_sum))
}

/// `arccos x = pi/2 - arcsin x`.
pub fn acos(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let half_pi = Value::Real(cfg.constants.pi.checked_div(&Decimal::from_i64(2, acc + 10), acc + 10)?);
    let asin_v = asin(v, cfg, acc + 5)?;
    Ok(half_pi.sub(&asin_v))
}

// =====================================================================
// hyperbolics
// =====================================================================

pub fn sinh(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let ex = exp(v, cfg, acc + 5)?;
    let e_nx = exp(&v.neg(), cfg, acc + 5)?;
    let two = Value::Real(Decimal::from_i64(2, acc + 5));
    ex.sub(&e_nx).checked_div(&two, acc)
}

pub fn cosh(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let ex = exp(v, cfg, acc + 5)?;
    let e_nx = exp(&v.neg(), cfg, acc + 5)?;
    let two = Value::Real(Decimal::from_i64(2, acc + 5));
    ex.add(&e_nx).checked_div(&two, acc)
}

pub fn tanh(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let two_x = v.mul(&Value::Real(Decimal::from_i64(2, acc + 5)));
    let e2x = exp(&two_x, cfg, acc + 5)?;
    let one = Value::Real(Decimal::from_i64(1, acc + 5));
    e2x.sub(&one).checked_div(&e2x.add(&one), acc)
}

/// `asinh x = ln(x + sqrt(x^2+1))`.
pub fn asinh(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let one = Value::Real(Decimal::from_i64(1, acc + 5));
    let inner = v.mul(v).add(&one);
    let root = sqrt(&inner, cfg, acc + 5)?;
    ln(&v.add(&root), cfg, acc)
}

/// `acosh x = ln(x + sqrt(x^2-1))`.
pub fn acosh(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let one = Value::Real(Decimal::from_i64(1, acc + 5));
    let inner = v.mul(v).sub(&one);
    let root = sqrt(&inner, cfg, acc + 5)?;
    ln(&v.add(&root), cfg, acc)
}

/// `atanh x = (1/2) ln((1+x)/(1-x))`.
pub fn atanh(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let one = Value::Real(Decimal::from_i64(1, acc + 5));
    let ratio = one.add(v).checked_div(&one.sub(v), acc + 5)?;
    let ln_ratio = ln(&ratio, cfg, acc)?;
    ln_ratio.checked_div(&Value::Real(Decimal::from_i64(2, acc)), acc)
}

// =====================================================================
// sqrt / cbrt / nroot
// =====================================================================

fn seed_f64(x: &Decimal) -> f64 {
    x.scientific_repr(15).parse::<f64>().unwrap_or(1.0)
}

/// Newton iteration for real `sqrt` of a nonnegative `x`, falling back to
/// `exp(ln(x)*0.5)` if the iteration does not settle within the cap
/// (`spec.md` §4.4).
pub fn sqrt_real(x: &Decimal, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::zero(acc));
    }
    if x.is_negative() {
        return Err(Error::Undefined("sqrt of a negative real; use the complex form".into()));
    }
    let working = acc + 5;
    let seed = seed_f64(x).abs().sqrt().max(1e-300);
    let mut guess = Decimal::from_str(&format!("{seed:e}"), working)?;
    let two = Decimal::from_i64(2, working);
    let cap = series_cap(acc);
    for _ in 0..cap {
        let next = guess.add(&x.checked_div(&guess, working)?).checked_div(&two, working)?;
        let diff = next.sub(&guess);
        guess = next;
        if diff.is_zero() || diff.power() < -(2 * acc as i64 + 1) {
            return Ok(guess.with_acc(acc)?);
        }
    }
    Ok(guess.with_acc(acc)?)
}

/// Real `cbrt`, works directly for negative `x` (the real cube root
/// exists). Newton iteration `x_{n+1} = (2x_n + N/x_n^2)/3`.
pub fn cbrt_real(x: &Decimal, acc: u32) -> Result<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::zero(acc));
    }
    let working = acc + 5;
    let seed = seed_f64(x).cbrt();
    let mut guess = Decimal::from_str(&format!("{seed:e}"), working)?;
    let two = Decimal::from_i64(2, working);
    let three = Decimal::from_i64(3, working);
    let cap = series_cap(acc);
    for _ in 0..cap {
        let g2 = guess.mul(&guess);
        let next = two.mul(&guess).add(&x.checked_div(&g2, working)?).checked_div(&three, working)?;
        let diff = next.sub(&guess);
        guess = next;
        if diff.is_zero() || diff.power() < -(2 * acc as i64 + 1) {
            return Ok(guess.with_acc(acc)?);
        }
    }
    Ok(guess.with_acc(acc)?)
}

pub fn nroot_real(x: &Decimal, n: u32, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if n == 0 {
        return Err(Error::InputRange("nroot degree must be positive".into()));
    }
    if n == 2 {
        return sqrt_real(x, acc);
    }
    if n == 3 {
        return cbrt_real(x, acc);
    }
    if x.is_zero() {
        return Ok(Decimal::zero(acc));
    }
    if x.is_negative() && n % 2 == 0 {
        return Err(Error::Undefined("even root of a negative real; use the complex form".into()));
    }
    let working = acc + 5;
    let magnitude = x.abs();
    let seed = seed_f64(&magnitude).powf(1.0 / n as f64);
    let mut guess = Decimal::from_str(&format!("{seed:e}"), working)?;
    let n_dec = Decimal::from_i64(n as i64, working);
    let n_minus_1 = Decimal::from_i64(n as i64 - 1, working);
    let cap = series_cap(acc);
    for _ in 0..cap {
        let g_pow = pow_int_decimal(&guess, n as i64 - 1, working)?;
        let next = n_minus_1
            .mul(&guess)
            .add(&magnitude.checked_div(&g_pow, working)?)
            .checked_div(&n_dec, working)?;
        let diff = next.sub(&guess);
        guess = next;
        if diff.is_zero() || diff.power() < -(2 * acc as i64 + 1) {
            let result = guess.with_acc(acc)?;
            return Ok(if x.is_negative() { result.neg() } else { result });
        }
    }
    emit_warning(Warning::NewtonFallback { op: "nroot" });
    let one_over_n = Decimal::from_i64(1, working).checked_div(&n_dec, working)?;
    let fallback = exp_real(&ln_real(&magnitude, cfg, working)?.mul(&one_over_n), cfg, acc)?;
    Ok(if x.is_negative() { fallback.neg() } else { fallback })
}

pub fn sqrt(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) if !d.is_negative() => Ok(Value::Real(sqrt_real(d, acc)?)),
        Value::Real(d) => {
            let root = sqrt_real(&d.neg(), acc)?;
            Ok(Value::from(ComplexDecimal::new(Decimal::zero(acc), root)))
        }
        Value::Complex(_) => pow(v, &Value::Real(Decimal::from_str("0.5", acc + 5)?), cfg, acc),
    }
}

pub fn cbrt(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    match v {
        Value::Real(d) => Ok(Value::Real(cbrt_real(d, acc)?)),
        Value::Complex(_) => {
            let third = Decimal::from_i64(1, acc + 5).checked_div(&Decimal::from_i64(3, acc + 5), acc + 5)?;
            pow(v, &Value::Real(third), cfg, acc)
        }
    }
}

// =====================================================================
// pow
// =====================================================================

/// Integer power by repeated squaring on `Decimal`, guarded by a
/// digit-count estimate so an astronomically large result is refused
/// before it is built (`spec.md` §5).
pub fn pow_int_decimal(base: &Decimal, exp: i64, acc: u32) -> Result<Decimal> {
    if exp == 0 {
        return Ok(Decimal::from_i64(1, acc));
    }
    if base.is_zero() {
        return if exp > 0 { Ok(Decimal::zero(acc)) } else { Err(Error::Undefined("0 raised to a negative power".into())) };
    }
    let working = acc + 10;
    let estimate_digits = if !base.is_zero() {
        let log10_base = (crate::decimal::digit_count(base.mantissa()) as i64 + base.power()) as f64;
        (exp.unsigned_abs() as f64 * log10_base.abs().max(1.0)).abs()
    } else {
        0.0
    };
    const MAX_SAFE_DIGITS: f64 = 10_000_000.0;
    if estimate_digits > MAX_SAFE_DIGITS {
        return Err(Error::Overflow(format!("pow result would need ~{estimate_digits:.0} digits")));
    }

    let mut result = Decimal::from_i64(1, working);
    let mut b = base.with_acc(working)?;
    let mut e = exp.unsigned_abs();
    while e > 0 {
        if e & 1 == 1 {
            result = result.mul(&b).with_acc(working)?;
        }
        b = b.mul(&b).with_acc(working)?;
        e >>= 1;
    }
    if exp < 0 {
        let one = Decimal::from_i64(1, working);
        result = one.checked_div(&result, working)?;
    }
    Ok(result.with_acc(acc)?)
}

/// `pow(a, b)`: the branch table of `spec.md` §4.4.
pub fn pow(a: &Value, b: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Value> {
    let working = acc + 5;

    // Branch 1: both real, b == 0.
    if let (Value::Real(ar), Value::Real(br)) = (a, b) {
        if br.is_zero() {
            if ar.is_zero() {
                return Err(Error::Undefined("0^0".into()));
            }
            return Ok(Value::Real(Decimal::from_i64(1, acc)));
        }
        // Branch 2: a == 0, b < 0.
        if ar.is_zero() && br.is_negative() {
            return Err(Error::Undefined("0 raised to a negative power".into()));
        }
        if ar.is_zero() {
            return Ok(Value::Real(Decimal::zero(acc)));
        }
        // Branch 3: integer exponent.
        if br.is_integer() {
            let exp_i64 = decimal_to_i64(br)?;
            return Ok(Value::Real(pow_int_decimal(ar, exp_i64, acc)?));
        }
        // Branch 4: a > 0, fractional b.
        if !ar.is_negative() {
            if br.eq(&Decimal::from_str("0.5", br.acc())?) {
                return Ok(Value::Real(sqrt_real(ar, acc)?));
            }
            let ln_a = ln_real(ar, cfg, working)?;
            return Ok(Value::Real(exp_real(&br.mul(&ln_a), cfg, acc)?));
        }
        // Branch 5: a < 0, fractional b.
        let abs_pow = {
            let ln_a = ln_real(&ar.abs(), cfg, working)?;
            exp_real(&br.mul(&ln_a), cfg, working)?
        };
        let one = Decimal::from_i64(1, working);
        let recip_b = one.checked_div(&br.abs(), working)?;
        if recip_b.is_integer() {
            let n = decimal_to_i64(&recip_b)?;
            if n % 2 != 0 {
                return Ok(Value::Real(abs_pow.neg().with_acc(acc)?));
            }
        }
        let angle = br.abs().mul(&cfg.constants.pi);
        let re = abs_pow.mul(&cos_real(&angle, cfg, working)?);
        let im = abs_pow.mul(&sin_real(&angle, cfg, working)?);
        return Ok(Value::from(ComplexDecimal::new(re.with_acc(acc)?, im.with_acc(acc)?)));
    }

    // Branch 6: real b, complex a.
    if let (Value::Complex(ac), Value::Real(br)) = (a, b) {
        let modulus = Value::Complex(ac.clone()).abs(working)?;
        let argument = arg(&Value::Complex(ac.clone()), cfg, working)?;
        let modulus_pow = {
            if modulus.is_zero() {
                Decimal::zero(working)
            } else if br.is_integer() {
                pow_int_decimal(&modulus, decimal_to_i64(br)?, working)?
            } else {
                exp_real(&br.mul(&ln_real(&modulus, cfg, working)?), cfg, working)?
            }
        };
        let angle = br.mul(&argument);
        let re = modulus_pow.mul(&cos_real(&angle, cfg, working)?);
        let im = modulus_pow.mul(&sin_real(&angle, cfg, working)?);
        return Ok(Value::from(ComplexDecimal::new(re.with_acc(acc)?, im.with_acc(acc)?)));
    }

    // Branch 7: general complex^complex, `a == e` defers to `exp(b)`.
    let ac = a.as_complex();
    if ac.is_real() && ac.re().eq(&cfg.constants.e) {
        return exp(b, cfg, acc);
    }
    let ln_a = ln_complex(&ac, cfg, working)?;
    let exponent = Value::Complex(ln_a).mul(b);
    exp(&exponent, cfg, acc)
}

// =====================================================================
// fact / gamma
// =====================================================================

/// Recursive divide-and-conquer range product `prod_{lo..=hi}`, switching
/// to a linear loop below a small threshold (`spec.md` §4.4).
fn range_product(lo: u64, hi: u64) -> IBig {
    if hi - lo < 16 {
        let mut acc = IBig::from(lo);
        for k in (lo + 1)..=hi {
            acc *= IBig::from(k);
        }
        return acc;
    }
    let mid = lo + (hi - lo) / 2;
    range_product(lo, mid) * range_product(mid + 1, hi)
}

fn fact_integer(n: u64, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if n > cfg.factorial_cap {
        return Err(Error::FactorialRange { cap: cfg.factorial_cap });
    }
    if n == 0 {
        return Ok(Decimal::from_i64(1, acc));
    }
    let product = range_product(1, n);
    Decimal::from_parts(product, 0, acc)
}

/// Lanczos approximation: `Gamma(z+1) = sqrt(2*pi) * (z+g+0.5)^(z+0.5) *
/// e^{-(z+g+0.5)} * A_g(z)`, `A_g(z) = p0 + sum p_k/(z+k)`. Reflects
/// `Gamma(z)Gamma(1-z) = pi / sin(pi z)` for `Re(z) < 0`.
pub fn gamma_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_integer() && !x.is_negative() && x.cmp(&Decimal::from_i64(0, acc)) != std::cmp::Ordering::Equal {
        let n = decimal_to_i64(x)? - 1;
        if n >= 0 {
            return fact_integer(n as u64, cfg, acc);
        }
    }
    fact_real(&x.sub(&Decimal::from_i64(1, acc)), cfg, acc)
}

pub fn fact_real(x: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    if x.is_integer() && !x.is_negative() {
        let n = decimal_to_i64(x)?;
        return fact_integer(n as u64, cfg, acc);
    }
    lanczos_gamma_real(&x.add(&Decimal::from_i64(1, acc)), cfg, acc)
}

fn lanczos_gamma_real(z: &Decimal, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    let working = acc + 10;
    if z.is_negative() || z.is_zero() {
        // Reflection: Gamma(z) = pi / (sin(pi z) * Gamma(1-z))
        let one = Decimal::from_i64(1, working);
        let one_minus_z = one.sub(z);
        let reflected = lanczos_gamma_real(&one_minus_z, cfg, working)?;
        let sinpz = sin_real(&cfg.constants.pi.mul(z), cfg, working)?;
        if sinpz.is_zero() {
            return Err(Error::Undefined("gamma has a pole at this non-positive integer".into()));
        }
        return Ok(cfg.constants.pi.checked_div(&sinpz.mul(&reflected), acc)?);
    }
    let zm1 = z.sub(&Decimal::from_i64(1, working));
    let table = cfg.constants.lanczos_for(acc);
    if acc > table.reliable_digits {
        return Err(Error::Unreliable(format!(
            "gamma/fact at acc={acc} exceeds the Lanczos table's {} reliable digits",
            table.reliable_digits
        )));
    }
    let mut a = table.coefficients[0].with_acc(working)?;
    for (k, pk) in table.coefficients.iter().enumerate().skip(1) {
        let denom = zm1.add(&Decimal::from_i64(k as i64, working));
        a = a.add(&pk.checked_div(&denom, working)?);
    }
    let t = zm1.add(&table.g).add(&Decimal::from_str("0.5", working)?);
    let half = Decimal::from_str("0.5", working)?;
    let exponent = zm1.add(&half);
    let t_pow = exp_real(&exponent.mul(&ln_real(&t, cfg, working)?), cfg, working)?;
    let e_neg_t = exp_real(&t.neg(), cfg, working)?;
    let two_pi = Decimal::from_i64(2, working).mul(&cfg.constants.pi);
    let sqrt_two_pi = sqrt_real(&two_pi, working)?;
    Ok(sqrt_two_pi.mul(&t_pow).mul(&e_neg_t).mul(&a).with_acc(acc)?)
}

// =====================================================================
// arg / toPolar / abs already live on Value; arg needs the trig core.
// =====================================================================

/// `arg`: `arctan(b/a)` plus quadrant adjustment for `a<0`; `arg(0)` is
/// undefined.
pub fn arg(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<Decimal> {
    let re = v.re();
    let im = v.im();
    if re.is_zero() && im.is_zero() {
        return Err(Error::Undefined("arg(0)".into()));
    }
    let working = acc + 5;
    if re.is_zero() {
        let half_pi = cfg.constants.pi.checked_div(&Decimal::from_i64(2, working), working)?;
        return Ok(if im.is_negative() { half_pi.neg().with_acc(acc)? } else { half_pi.with_acc(acc)? });
    }
    let ratio = im.checked_div(&re, working)?;
    let base = atan_real(&ratio, cfg, working)?;
    let adjusted = if re.is_negative() {
        if im.is_negative() {
            base.sub(&cfg.constants.pi)
        } else {
            base.add(&cfg.constants.pi)
        }
    } else {
        base
    };
    Ok(adjusted.with_acc(acc)?)
}

/// `toPolar(z) = (|z|, arg(z))` (`SPEC_FULL.md` §C.5).
pub fn to_polar(v: &Value, cfg: &GlobalConfig, acc: u32) -> Result<(Decimal, Decimal)> {
    let modulus = v.abs(acc)?;
    let argument = arg(v, cfg, acc)?;
    Ok((modulus, argument))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> GlobalConfig {
        GlobalConfig::new(30)
    }

    #[test]
    fn exp_ln_identity() {
        let c = cfg();
        let x = Decimal::from_i64(2, 30);
        let e_x = exp_real(&x, &c, 30).unwrap();
        let back = ln_real(&e_x, &c, 20).unwrap();
        assert_eq!(back.to_normal_string(10), x.to_normal_string(10));
    }

    #[test]
    fn sin_pi_over_6() {
        let c = cfg();
        let six = Decimal::from_i64(6, 30);
        let x = c.constants.pi.checked_div(&six, 30).unwrap();
        let s = sin_real(&x, &c, 20).unwrap();
        assert_eq!(s.to_normal_string(5), "0.5");
    }

    #[test]
    fn sin_squared_plus_cos_squared_is_one() {
        let c = cfg();
        let x = Decimal::from_str("0.73", 30).unwrap();
        let s = sin_real(&x, &c, 25).unwrap();
        let co = cos_real(&x, &c, 25).unwrap();
        let sum = s.mul(&s).add(&co.mul(&co));
        assert_eq!(sum.to_normal_string(10), "1");
    }

    #[test]
    fn sqrt_squared_is_identity() {
        let x = Decimal::from_i64(5, 30);
        let r = sqrt_real(&x, 30).unwrap();
        let sq = r.mul(&r);
        assert_eq!(sq.to_normal_string(15), x.to_normal_string(15));
    }

    #[test]
    fn gamma_matches_factorials() {
        let c = cfg();
        for n in 0u64..=8 {
            let g = gamma_real(&Decimal::from_i64(n as i64 + 1, 20), &c, 12).unwrap();
            let expected = fact_integer(n, &c, 12).unwrap();
            assert_eq!(g.to_normal_string(8), expected.to_normal_string(8), "gamma({}+1) == {}!", n, n);
        }
    }

    #[test]
    fn fact_of_five_is_120() {
        let c = cfg();
        let f = fact_real(&Decimal::from_i64(5, 30), &c, 30).unwrap();
        assert_eq!(f.to_normal_string(30), "120");
    }

    #[test]
    fn fractional_gamma_within_table_precision_succeeds() {
        let c = cfg();
        let half = Decimal::from_str("0.5", 30).unwrap();
        // Gamma(0.5) == sqrt(pi), well within the Lanczos table's ~15
        // reliable digits at acc=12.
        let g = gamma_real(&half, &c, 12).unwrap();
        let sqrt_pi = sqrt_real(&c.constants.pi, 12).unwrap();
        assert_eq!(g.to_normal_string(10), sqrt_pi.to_normal_string(10));
    }

    #[test]
    fn fractional_gamma_past_table_precision_is_unreliable() {
        let c = cfg();
        let half = Decimal::from_str("0.5", 30).unwrap();
        let err = gamma_real(&half, &c, 30).unwrap_err();
        assert_eq!(err.code(), "UNRELIABLE");
    }

    #[test]
    fn pow_fractional_is_sqrt() {
        let c = cfg();
        let r = pow(&Value::Real(Decimal::from_i64(4, 30)), &Value::Real(Decimal::from_str("0.5", 30).unwrap()), &c, 10).unwrap();
        assert_eq!(r.re().to_normal_string(5), "2");
    }

    #[test]
    fn pow_two_cubed_four() {
        let c = cfg();
        // 2^3^4 == 2^(3^4) == 2^81, not (2^3)^4 == 4096 — this test exercises
        // pow()'s own right-associativity contract, the rewriter's is
        // exercised separately in decimal-expr.
        let inner = pow(&Value::Real(Decimal::from_i64(3, 80)), &Value::Real(Decimal::from_i64(4, 80)), &c, 80).unwrap();
        let outer = pow(&Value::Real(Decimal::from_i64(2, 80)), &inner, &c, 30).unwrap();
        assert_eq!(outer.re().to_normal_string(30), "2417851639229258349412352");
    }

    #[test]
    fn one_plus_i_to_the_eight_is_sixteen() {
        let c = cfg();
        let z = Value::from(ComplexDecimal::new(Decimal::from_i64(1, 40), Decimal::from_i64(1, 40)));
        let result = pow(&z, &Value::Real(Decimal::from_i64(8, 40)), &c, 20).unwrap();
        assert!(result.is_real(), "{:?}", result);
        assert_eq!(result.re().to_normal_string(5), "16");
    }

    #[test]
    fn arg_zero_is_undefined() {
        let c = cfg();
        assert!(arg(&Value::Real(Decimal::zero(30)), &c, 10).is_err());
    }
}
