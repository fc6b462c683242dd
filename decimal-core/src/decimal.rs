//! The arbitrary-precision signed decimal.
//!
//! A nonzero value is the triple `(mantissa, power, acc)` with
//! `value = mantissa * 10^power`, `mantissa` trailing-zero free, and
//! `|mantissa|` bounded to `acc` significant digits. Zero is the canonical
//! `(0, 0, acc)`. `Decimal` is immutable: every operation below returns a
//! fresh value, never mutates `self`.

use crate::config::{emit_warning, Warning};
use crate::error::{Error, Result};
use dashu_int::IBig;
use std::cmp::Ordering;
use std::str::FromStr;

/// Values below this threshold (relative to `power + acc`) silently
/// collapse to zero.
pub const MIN_EXPONENT: i64 = -2_000_000;
/// Values whose `power` exceeds this raise `Overflow`.
pub const MAX_EXPONENT: i64 = 2_000_000;
/// `power` itself is kept within these bounds even before the
/// underflow/overflow checks fire, guarding the mantissa-scaling helpers
/// below from degenerate shift amounts.
pub const MIN_POWER: i64 = MIN_EXPONENT - 64;
pub const MAX_POWER: i64 = MAX_EXPONENT + 64;

#[derive(Debug, Clone)]
pub struct Decimal {
    mantissa: IBig,
    power: i64,
    acc: u32,
}

/// `10^n` as an exact integer, built by string construction so the result
/// never depends on guessing dashu's `pow` signature — `n` is always small
/// relative to `acc` (a handful of guard digits at most) so this is cheap.
pub(crate) fn pow10(n: u32) -> IBig {
    if n == 0 {
        IBig::from(1)
    } else {
        let mut s = String::with_capacity(n as usize + 1);
        s.push('1');
        for _ in 0..n {
            s.push('0');
        }
        IBig::from_str(&s).expect("decimal digit string always parses")
    }
}

/// Number of decimal digits in `|n|` (`0` has digit count `1`).
pub fn digit_count(n: &IBig) -> usize {
    let s = n.to_string();
    let s = s.strip_prefix('-').unwrap_or(&s);
    s.len()
}

impl Decimal {
    pub fn mantissa(&self) -> &IBig {
        &self.mantissa
    }

    pub fn power(&self) -> i64 {
        self.power
    }

    pub fn acc(&self) -> u32 {
        self.acc
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == IBig::from(0)
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < IBig::from(0)
    }

    pub fn is_integer(&self) -> bool {
        self.is_zero() || self.power >= 0
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    pub fn zero(acc: u32) -> Self {
        Decimal { mantissa: IBig::from(0), power: 0, acc }
    }

    pub fn from_i64(n: i64, acc: u32) -> Self {
        Self::round_and_normalize(IBig::from(n), 0, acc).unwrap_or_else(|_| Decimal::zero(acc))
    }

    /// Builds directly from `(mantissa, power)`, normalizing and rounding
    /// to `acc` digits.
    pub fn from_parts(mantissa: IBig, power: i64, acc: u32) -> Result<Self> {
        Self::round_and_normalize(mantissa, power, acc)
    }

    /// Re-rounds an existing value to a new `acc`.
    pub fn with_acc(&self, acc: u32) -> Result<Self> {
        Self::round_and_normalize(self.mantissa.clone(), self.power, acc)
    }

    /// Parses the literal grammar
    /// `sign? (int ('.' int?)? | '.' int) (('e'|'E') sign? int)?`,
    /// with whitespace and `_` stripped anywhere.
    pub fn from_str(input: &str, acc: u32) -> Result<Self> {
        if input.len() > 4096 {
            return Err(Error::InputTooLong { len: input.len(), max: 4096 });
        }
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        if cleaned.is_empty() {
            return Err(Error::InputFormat("empty numeric literal".into()));
        }

        let mut chars = cleaned.char_indices().peekable();
        let mut sign = 1i8;
        if let Some(&(_, c)) = chars.peek() {
            if c == '+' || c == '-' {
                if c == '-' {
                    sign = -1;
                }
                chars.next();
            }
        }

        let body_start = chars.peek().map(|&(i, _)| i).unwrap_or(cleaned.len());
        let mut exp_start: Option<usize> = None;
        let mut point_pos: Option<usize> = None;
        let mut last = cleaned.len();
        for (i, c) in cleaned[body_start..].char_indices() {
            let i = body_start + i;
            match c {
                '0'..='9' => {}
                '.' if point_pos.is_none() && exp_start.is_none() => point_pos = Some(i),
                'e' | 'E' if exp_start.is_none() => {
                    exp_start = Some(i);
                    last = i;
                    break;
                }
                _ => return Err(Error::InputFormat(format!("unexpected character '{c}' in '{input}'"))),
            }
        }
        if exp_start.is_none() {
            last = cleaned.len();
        }
        let mantissa_part = &cleaned[body_start..last];

        let (int_part, frac_part): (&str, &str) = match point_pos {
            Some(p) => (&cleaned[body_start..p], &cleaned[p + 1..last]),
            None => (mantissa_part, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::InputFormat(format!("no digits in '{input}'")));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InputFormat(format!("non-digit in '{input}'")));
        }

        let exponent: i64 = if let Some(e_idx) = exp_start {
            let rest = &cleaned[e_idx + 1..];
            rest.parse::<i64>().map_err(|_| Error::InputFormat(format!("bad exponent in '{input}'")))?
        } else {
            0
        };

        let digits: String = format!("{int_part}{frac_part}");
        let digits_trimmed = digits.trim_start_matches('0');
        if digits_trimmed.is_empty() {
            return Ok(Decimal::zero(acc));
        }
        let leading_zeros = digits.len() - digits_trimmed.len();
        let mantissa_abs = IBig::from_str(digits_trimmed).map_err(|_| Error::InputFormat(format!("bad digits in '{input}'")))?;
        let mantissa = if sign < 0 { -mantissa_abs } else { mantissa_abs };

        // value = digits * 10^(-frac_len) * 10^exponent, adjusted for the
        // leading zeros trimmed out of the significant digit run.
        let power = exponent - frac_part.len() as i64;
        let _ = leading_zeros; // already absorbed by trimming digits_trimmed
        Self::round_and_normalize(mantissa, power, acc)
    }

    // ---------------------------------------------------------------
    // Rounding / normalization
    // ---------------------------------------------------------------

    /// `round_and_normalize(mantissa, power, acc)`: banker's rounding to
    /// `acc` significant digits followed by trailing-zero trimming, then
    /// the underflow/overflow checks.
    pub fn round_and_normalize(mantissa: IBig, mut power: i64, acc: u32) -> Result<Self> {
        let mut mantissa = mantissa;
        if mantissa == IBig::from(0) {
            return Ok(Decimal { mantissa, power: 0, acc });
        }

        let l = digit_count(&mantissa);
        if l > acc as usize {
            let d = (l - acc as usize) as u32;
            let divisor = pow10(d);
            let sign = if mantissa < IBig::from(0) { -1i8 } else { 1 };
            let abs_mantissa = if sign < 0 { -mantissa.clone() } else { mantissa.clone() };
            let q = &abs_mantissa / &divisor;
            let r = &abs_mantissa % &divisor;
            let h = &divisor / IBig::from(2);
            let mut q = q;
            if r > h {
                q += IBig::from(1);
            } else if r == h && (&q % IBig::from(2)) != IBig::from(0) {
                q += IBig::from(1);
            }
            mantissa = if sign < 0 { -q } else { q };
            power += d as i64;
        }

        // Trim trailing zeros.
        let ten = IBig::from(10);
        while mantissa != IBig::from(0) && (&mantissa % &ten) == IBig::from(0) {
            mantissa = &mantissa / &ten;
            power += 1;
        }

        if mantissa == IBig::from(0) {
            return Ok(Decimal { mantissa, power: 0, acc });
        }

        if power < MIN_POWER || power + acc as i64 < MIN_EXPONENT {
            emit_warning(Warning::Underflow { op: "round_and_normalize" });
            return Ok(Decimal::zero(acc));
        }
        if power > MAX_POWER || power > MAX_EXPONENT {
            return Err(Error::Overflow(format!("power {power} exceeds {MAX_EXPONENT}")));
        }

        Ok(Decimal { mantissa, power, acc })
    }

    // ---------------------------------------------------------------
    // Alignment helper shared by +, -, comparisons
    // ---------------------------------------------------------------

    fn align(&self, other: &Decimal) -> (IBig, IBig, i64) {
        let common_power = self.power.min(other.power);
        let scale_self = (self.power - common_power) as u32;
        let scale_other = (other.power - common_power) as u32;
        let a = &self.mantissa * pow10(scale_self);
        let b = &other.mantissa * pow10(scale_other);
        (a, b, common_power)
    }

    // ---------------------------------------------------------------
    // Arithmetic
    // ---------------------------------------------------------------

    pub fn add(&self, other: &Decimal) -> Decimal {
        let acc = self.acc.max(other.acc);
        if self.is_zero() {
            return other.with_acc(acc).unwrap_or_else(|_| other.clone());
        }
        if other.is_zero() {
            return self.with_acc(acc).unwrap_or_else(|_| self.clone());
        }
        // If the magnitude gap is far larger than the shared precision the
        // smaller operand cannot affect the rounded result; absorb it
        // rather than scaling by an astronomically large power of ten.
        let gap = (self.power - other.power).unsigned_abs();
        if gap as i64 > acc as i64 + 5 {
            let (bigger, smaller) = if self.power > other.power { (self, other) } else { (other, self) };
            let digit_gap = digit_count(&bigger.mantissa) as i64 + (bigger.power - smaller.power) - digit_count(&smaller.mantissa) as i64;
            if digit_gap > acc as i64 + 5 {
                return bigger.with_acc(acc).unwrap_or_else(|_| bigger.clone());
            }
        }
        let (a, b, power) = self.align(other);
        Self::round_and_normalize(a + b, power, acc).unwrap_or_else(|_| Decimal::zero(acc))
    }

    pub fn sub(&self, other: &Decimal) -> Decimal {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Decimal {
        Decimal { mantissa: -self.mantissa.clone(), power: self.power, acc: self.acc }
    }

    pub fn mul(&self, other: &Decimal) -> Decimal {
        let acc = self.acc.max(other.acc);
        let m = &self.mantissa * &other.mantissa;
        let p = self.power + other.power;
        Self::round_and_normalize(m, p, acc).unwrap_or_else(|_| Decimal::zero(acc))
    }

    /// `÷`: pre-scales the numerator so `acc` digits survive integer
    /// division.
    pub fn checked_div(&self, other: &Decimal, acc: u32) -> Result<Decimal> {
        if other.is_zero() {
            return Err(Error::DivByZero);
        }
        if self.is_zero() {
            return Ok(Decimal::zero(acc));
        }
        let da = digit_count(&self.mantissa) as i64;
        let db = digit_count(&other.mantissa) as i64;
        let s = (acc as i64 + db - da + 4).max(0) as u32;
        let scaled_num = &self.mantissa * pow10(s);
        let q = &scaled_num / &other.mantissa;
        let p = self.power - other.power - s as i64;
        Self::round_and_normalize(q, p, acc)
    }

    /// `mod(a, b) = a - b*floor(a/b)`; shares the sign of `b`.
    pub fn checked_rem(&self, other: &Decimal, acc: u32) -> Result<Decimal> {
        let q = self.checked_div(other, acc + 10)?;
        let fl = q.floor();
        Ok(self.sub(&other.mul(&fl)).with_acc(acc)?)
    }

    pub fn floor(&self) -> Decimal {
        if self.is_zero() || self.power >= 0 {
            return self.clone();
        }
        let frac_digits = (-self.power) as u32;
        let divisor = pow10(frac_digits);
        let q = &self.mantissa / &divisor;
        let r = &self.mantissa % &divisor;
        let q = if r != IBig::from(0) && self.mantissa < IBig::from(0) { q - IBig::from(1) } else { q };
        Self::round_and_normalize(q, 0, self.acc).unwrap_or_else(|_| Decimal::zero(self.acc))
    }

    pub fn ceil(&self) -> Decimal {
        self.neg().floor().neg()
    }

    pub fn abs(&self) -> Decimal {
        if self.is_negative() {
            self.neg()
        } else {
            self.clone()
        }
    }

    pub fn sgn(&self) -> Decimal {
        if self.is_zero() {
            Decimal::zero(self.acc)
        } else if self.is_negative() {
            Decimal::from_i64(-1, self.acc)
        } else {
            Decimal::from_i64(1, self.acc)
        }
    }

    pub fn cmp(&self, other: &Decimal) -> Ordering {
        if self.is_zero() && other.is_zero() {
            return Ordering::Equal;
        }
        let (a, b, _) = self.align(other);
        a.cmp(&b)
    }

    pub fn eq(&self, other: &Decimal) -> bool {
        self.cmp(other) == Ordering::Equal
    }

    // ---------------------------------------------------------------
    // Stringification
    // ---------------------------------------------------------------

    const TO_STRING_AUTO_SWITCH: i64 = 21;

    pub fn to_normal_string(&self, acc: u32) -> String {
        let rounded = self.with_acc(acc).unwrap_or_else(|_| self.clone());
        if rounded.is_zero() {
            return "0".to_string();
        }
        let neg = rounded.is_negative();
        let digits = {
            let s = rounded.mantissa.to_string();
            s.trim_start_matches('-').to_string()
        };
        let power = rounded.power;
        let mut out = String::new();
        if power >= 0 {
            out.push_str(&digits);
            out.push_str(&"0".repeat(power as usize));
        } else {
            let frac_len = (-power) as usize;
            if frac_len >= digits.len() {
                out.push_str("0.");
                out.push_str(&"0".repeat(frac_len - digits.len()));
                out.push_str(&digits);
            } else {
                let split = digits.len() - frac_len;
                out.push_str(&digits[..split]);
                out.push('.');
                out.push_str(&digits[split..]);
            }
        }
        if neg {
            format!("-{out}")
        } else {
            out
        }
    }

    /// Unchecked scientific formatting, used internally where the result is
    /// never handed back to a caller as "the" output (e.g. `f64` seeding).
    pub(crate) fn scientific_repr(&self, acc: u32) -> String {
        let rounded = self.with_acc(acc).unwrap_or_else(|_| self.clone());
        if rounded.is_zero() {
            return "0E+0".to_string();
        }
        let neg = rounded.is_negative();
        let digits = {
            let s = rounded.mantissa.to_string();
            s.trim_start_matches('-').to_string()
        };
        let exp = rounded.power + digits.len() as i64 - 1;
        let mut mantissa_str = String::new();
        mantissa_str.push(digits.as_bytes()[0] as char);
        if digits.len() > 1 {
            mantissa_str.push('.');
            mantissa_str.push_str(&digits[1..]);
        }
        let sign = if exp >= 0 { "+" } else { "-" };
        let out = format!("{mantissa_str}E{sign}{}", exp.abs());
        if neg {
            format!("-{out}")
        } else {
            out
        }
    }

    /// `D.DDDDE±N` stringification, rejecting outputs longer than
    /// `max_output_len` with `Error::Overflow` rather than truncating.
    pub fn to_scientific_string(&self, acc: u32, max_output_len: usize) -> Result<String> {
        let out = self.scientific_repr(acc);
        if out.len() > max_output_len {
            return Err(Error::Overflow(format!("scientific output length {} exceeds max_output_len {max_output_len}", out.len())));
        }
        Ok(out)
    }

    /// `normal` when `|digit_count + power|` stays within
    /// `TO_STRING_AUTO_SWITCH`, otherwise `scientific` (subject to the same
    /// `max_output_len` bound).
    pub fn to_auto_string(&self, acc: u32, max_output_len: usize) -> Result<String> {
        if self.is_zero() {
            return Ok("0".to_string());
        }
        let metric = (digit_count(&self.mantissa) as i64 + self.power).abs();
        if metric <= Self::TO_STRING_AUTO_SWITCH {
            Ok(self.to_normal_string(acc))
        } else {
            self.to_scientific_string(acc, max_output_len)
        }
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        Decimal::eq(self, other)
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(Decimal::cmp(self, other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zero_free_invariant() {
        let d = Decimal::from_parts(IBig::from(1200), -2, 30).unwrap();
        assert_eq!(d.mantissa().to_string(), "12");
        assert_eq!(d.power(), 0);
    }

    #[test]
    fn parse_roundtrip() {
        let d = Decimal::from_str("123.456", 10).unwrap();
        assert_eq!(d.to_normal_string(10), "123.456");
    }

    #[test]
    fn parse_scientific() {
        let d = Decimal::from_str("1.5e2", 10).unwrap();
        assert_eq!(d.to_normal_string(10), "150");
    }

    #[test]
    fn banker_rounding_ties_to_even() {
        // 0.125 rounded to 2 digits: last kept digit 2 (even) stays -> 0.12
        let d = Decimal::from_str("0.125", 30).unwrap();
        let rounded = d.with_acc(2).unwrap();
        assert_eq!(rounded.to_normal_string(2), "0.12");

        // 0.135 rounded to 2 digits: last kept digit 3 (odd) advances -> 0.14
        let d2 = Decimal::from_str("0.135", 30).unwrap();
        let rounded2 = d2.with_acc(2).unwrap();
        assert_eq!(rounded2.to_normal_string(2), "0.14");
    }

    #[test]
    fn add_sub_identity() {
        let a = Decimal::from_str("0.1", 30).unwrap();
        let b = Decimal::from_str("0.2", 30).unwrap();
        let sum = a.add(&b);
        assert_eq!(sum.to_normal_string(30), "0.3");
    }

    #[test]
    fn div_by_zero_errors() {
        let a = Decimal::from_i64(1, 30);
        let z = Decimal::zero(30);
        assert!(a.checked_div(&z, 30).is_err());
    }

    #[test]
    fn floor_ceil_negative() {
        let x = Decimal::from_str("-1.5", 30).unwrap();
        assert_eq!(x.floor().to_normal_string(30), "-2");
        assert_eq!(x.ceil().to_normal_string(30), "-1");
    }

    #[test]
    fn floor_plus_ceil_neg_is_zero() {
        let x = Decimal::from_str("2.5", 30).unwrap();
        let lhs = x.floor().add(&x.neg().ceil());
        assert!(lhs.is_zero());
    }

    #[test]
    fn commutativity() {
        let a = Decimal::from_str("3.7", 30).unwrap();
        let b = Decimal::from_str("-1.2", 30).unwrap();
        assert_eq!(a.add(&b).to_normal_string(30), b.add(&a).to_normal_string(30));
        assert_eq!(a.mul(&b).to_normal_string(30), b.mul(&a).to_normal_string(30));
    }

    #[test]
    fn auto_string_picks_scientific_for_large_magnitude() {
        let d = Decimal::from_str("1e50", 10).unwrap();
        assert!(d.to_auto_string(10, 8192).unwrap().contains('E'));
        let small = Decimal::from_str("42", 10).unwrap();
        assert!(!small.to_auto_string(10, 8192).unwrap().contains('E'));
    }

    #[test]
    fn scientific_string_rejects_output_over_max_len() {
        let d = Decimal::from_str("1.23456789e50", 30).unwrap();
        assert!(d.to_scientific_string(30, 5).is_err());
        assert!(d.to_scientific_string(30, 8192).is_ok());
    }
}
