//! C2 — `ComplexDecimal`, a pair of `Decimal`s sharing a declared
//! precision (`spec.md` §3/§4.2).

use crate::decimal::Decimal;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ComplexDecimal {
    re: Decimal,
    im: Decimal,
}

impl ComplexDecimal {
    pub fn new(re: Decimal, im: Decimal) -> Self {
        ComplexDecimal { re, im }
    }

    pub fn from_real(re: Decimal) -> Self {
        let acc = re.acc();
        ComplexDecimal { im: Decimal::zero(acc), re }
    }

    pub fn re(&self) -> &Decimal {
        &self.re
    }

    pub fn im(&self) -> &Decimal {
        &self.im
    }

    pub fn acc(&self) -> u32 {
        self.re.acc().min(self.im.acc())
    }

    pub fn is_real(&self) -> bool {
        self.im.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.re.is_zero() && self.im.is_zero()
    }

    pub fn conj(&self) -> ComplexDecimal {
        ComplexDecimal { re: self.re.clone(), im: self.im.neg() }
    }

    pub fn add(&self, other: &ComplexDecimal) -> ComplexDecimal {
        ComplexDecimal { re: self.re.add(&other.re), im: self.im.add(&other.im) }
    }

    pub fn sub(&self, other: &ComplexDecimal) -> ComplexDecimal {
        ComplexDecimal { re: self.re.sub(&other.re), im: self.im.sub(&other.im) }
    }

    pub fn neg(&self) -> ComplexDecimal {
        ComplexDecimal { re: self.re.neg(), im: self.im.neg() }
    }

    /// `(a+bi)(c+di) = (ac-bd) + (ad+bc)i`.
    pub fn mul(&self, other: &ComplexDecimal) -> ComplexDecimal {
        let re = self.re.mul(&other.re).sub(&self.im.mul(&other.im));
        let im = self.re.mul(&other.im).add(&self.im.mul(&other.re));
        ComplexDecimal { re, im }
    }

    /// `z/w = z * conj(w) / |w|^2`, reduced to two real divisions.
    pub fn checked_div(&self, other: &ComplexDecimal, acc: u32) -> Result<ComplexDecimal> {
        if other.is_zero() {
            return Err(Error::DivByZero);
        }
        let denom = other.re.mul(&other.re).add(&other.im.mul(&other.im));
        let num = self.mul(&other.conj());
        Ok(ComplexDecimal {
            re: num.re.checked_div(&denom, acc)?,
            im: num.im.checked_div(&denom, acc)?,
        })
    }

    /// Parses the algebraic grammar from `spec.md` §4.2/§6: at most one
    /// real term and one imaginary term, `i`/`j`/`J`/`I` (case-insensitive)
    /// for the unit, optional `*`, unit in either position, implicit `+-1`
    /// coefficient, and no stray characters outside the matched terms.
    pub fn from_str(input: &str, acc: u32) -> Result<Self> {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        if cleaned.is_empty() {
            return Err(Error::InputFormat("empty complex literal".into()));
        }

        let terms = split_signed_terms(&cleaned)
            .ok_or_else(|| Error::InputFormat(format!("malformed complex literal '{input}'")))?;
        if terms.is_empty() || terms.len() > 2 {
            return Err(Error::InputFormat(format!("malformed complex literal '{input}'")));
        }

        let mut re: Option<Decimal> = None;
        let mut im: Option<Decimal> = None;
        for term in &terms {
            if let Some(coeff) = imaginary_coefficient(term) {
                if im.is_some() {
                    return Err(Error::InputFormat(format!("duplicate imaginary term in '{input}'")));
                }
                im = Some(Decimal::from_str(&coeff, acc)?);
            } else {
                if re.is_some() {
                    return Err(Error::InputFormat(format!("duplicate real term in '{input}'")));
                }
                re = Some(Decimal::from_str(term, acc)?);
            }
        }

        Ok(ComplexDecimal { re: re.unwrap_or_else(|| Decimal::zero(acc)), im: im.unwrap_or_else(|| Decimal::zero(acc)) })
    }

    pub fn to_algebraic_string(&self, acc: u32, max_output_len: usize) -> Result<String> {
        if self.im.is_zero() {
            return self.re.to_auto_string(acc, max_output_len);
        }
        if self.re.is_zero() {
            return imaginary_part_string(&self.im, acc, max_output_len);
        }
        let im_str = imaginary_part_string(&self.im.abs(), acc, max_output_len)?;
        let sign = if self.im.is_negative() { '-' } else { '+' };
        let re_str = self.re.to_auto_string(acc, max_output_len)?;
        Ok(format!("{re_str}{sign}{im_str}"))
    }

    pub fn to_polar_string(&self, acc: u32, max_output_len: usize, abs: &Decimal, arg: &Decimal) -> Result<String> {
        if arg.is_zero() {
            return abs.to_auto_string(acc, max_output_len);
        }
        let arg_str = arg.to_auto_string(acc, max_output_len)?;
        let needs_parens = arg.is_negative() || arg_str.contains('E');
        let arg_str = if needs_parens { format!("({arg_str})") } else { arg_str };
        let abs_str = abs.to_auto_string(acc, max_output_len)?;
        Ok(format!("{abs_str}[toPolar]{arg_str}"))
    }
}

fn imaginary_part_string(magnitude: &Decimal, acc: u32, max_output_len: usize) -> Result<String> {
    if magnitude.eq(&Decimal::from_i64(1, magnitude.acc())) {
        Ok("[i]".to_string())
    } else {
        Ok(format!("{}[i]", magnitude.to_auto_string(acc, max_output_len)?))
    }
}

/// Splits a sanitized literal into its leading-sign-inclusive terms, e.g.
/// `"3+4i"` -> `["3", "+4i"]`, `"-i"` -> `["-i"]`. Returns `None` if the
/// input contains characters outside `[0-9.eE+\-ijJI*]` or terms do not
/// reconstruct the original string (guards against stray characters).
fn split_signed_terms(s: &str) -> Option<Vec<String>> {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-' | 'i' | 'j' | 'I' | 'J' | '*');
    if !s.chars().all(allowed) {
        return None;
    }
    let bytes: Vec<char> = s.chars().collect();
    let mut terms = Vec::new();
    let mut i = 0;
    let mut start = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if (c == '+' || c == '-') && i > start {
            // Not a term boundary if it's part of an exponent, e.g. "1e-5".
            let prev = bytes[i - 1];
            if prev == 'e' || prev == 'E' {
                i += 1;
                continue;
            }
            terms.push(bytes[start..i].iter().collect());
            start = i;
        }
        i += 1;
    }
    terms.push(bytes[start..].iter().collect());
    let rebuilt: String = terms.concat();
    if rebuilt != s {
        return None;
    }
    Some(terms)
}

/// If `term` names an imaginary quantity, returns the decimal-literal
/// string for its coefficient (empty sign means `+1`, bare `"-"` means
/// `-1`). Returns `None` for a purely real term.
fn imaginary_coefficient(term: &str) -> Option<String> {
    let (sign, rest) = match term.chars().next() {
        Some('+') => ("+", &term[1..]),
        Some('-') => ("-", &term[1..]),
        _ => ("", term),
    };
    let is_unit = |c: char| matches!(c, 'i' | 'j' | 'I' | 'J');
    if rest.is_empty() {
        return None;
    }
    if rest.len() == 1 && is_unit(rest.chars().next().unwrap()) {
        return Some(format!("{sign}1"));
    }
    let last = rest.chars().last().unwrap();
    if is_unit(last) {
        let mut coeff = &rest[..rest.len() - 1];
        coeff = coeff.strip_suffix('*').unwrap_or(coeff);
        if coeff.is_empty() {
            return Some(format!("{sign}1"));
        }
        return Some(format!("{sign}{coeff}"));
    }
    let first = rest.chars().next().unwrap();
    if is_unit(first) {
        let mut coeff = &rest[1..];
        coeff = coeff.strip_prefix('*').unwrap_or(coeff);
        if coeff.is_empty() {
            return Some(format!("{sign}1"));
        }
        return Some(format!("{sign}{coeff}"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_term_orders() {
        let a = ComplexDecimal::from_str("3+4i", 30).unwrap();
        assert_eq!(a.re().to_normal_string(30), "3");
        assert_eq!(a.im().to_normal_string(30), "4");

        let b = ComplexDecimal::from_str("3+i4", 30).unwrap();
        assert_eq!(b.im().to_normal_string(30), "4");

        let c = ComplexDecimal::from_str("3+4*i", 30).unwrap();
        assert_eq!(c.im().to_normal_string(30), "4");
    }

    #[test]
    fn implicit_unit_coefficient() {
        let a = ComplexDecimal::from_str("i", 30).unwrap();
        assert_eq!(a.im().to_normal_string(30), "1");
        let b = ComplexDecimal::from_str("-i", 30).unwrap();
        assert_eq!(b.im().to_normal_string(30), "-1");
    }

    #[test]
    fn rejects_stray_characters() {
        assert!(ComplexDecimal::from_str("3+4i+", 30).is_err());
        assert!(ComplexDecimal::from_str("3+4i+5", 30).is_err());
    }

    #[test]
    fn conj_twice_is_identity() {
        let z = ComplexDecimal::from_str("3-4i", 30).unwrap();
        let z2 = z.conj().conj();
        assert!(z.re().eq(z2.re()) && z.im().eq(z2.im()));
    }

    #[test]
    fn multiply_matches_algebraic_identity() {
        let a = ComplexDecimal::new(Decimal::from_i64(1, 30), Decimal::from_i64(2, 30));
        let b = ComplexDecimal::new(Decimal::from_i64(3, 30), Decimal::from_i64(-1, 30));
        let prod = a.mul(&b);
        // (1+2i)(3-i) = 3 - i + 6i - 2i^2 = 3 +5i +2 = 5+5i
        assert_eq!(prod.re().to_normal_string(30), "5");
        assert_eq!(prod.im().to_normal_string(30), "5");
    }
}
