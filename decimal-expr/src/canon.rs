//! Canonical pretty-printer: renders the pass1/pass2-rewritten token
//! stream back into a surface string that re-tokenizes to the same
//! stream (`spec.md` §8's idempotence property: `calc(output_of_calc
//! (expr))` is a numeric identity).
//!
//! Private sentinels never leak into the printed form: `Neg` prints as
//! `-`, `Abs` prints as the ordinary `abs` function name (already known
//! to the tokenizer), and implicit multiplication (`&`) prints as the
//! `[cdot]` separator named in `spec.md` §6, which [`crate::token::tokenize`]
//! expands back to `*` before lexing.

use crate::token::{Constant, Kind, Token};

pub fn to_canonical_string(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        match &tok.kind {
            Kind::Literal(s) => out.push_str(s),
            Kind::Constant(Constant::Pi) => out.push_str("[pi]"),
            Kind::Constant(Constant::E) => out.push_str("[e]"),
            Kind::Constant(Constant::I) => out.push_str("[i]"),
            Kind::Constant(Constant::X) => out.push_str("[x]"),
            Kind::Function(name) => out.push_str(name),
            Kind::Plus => out.push('+'),
            Kind::Minus => out.push('-'),
            Kind::Star => out.push('*'),
            Kind::Slash => out.push('/'),
            Kind::Caret => out.push('^'),
            Kind::Amp => out.push_str("[cdot]"),
            Kind::Bang => out.push('!'),
            Kind::Neg => out.push('-'),
            Kind::Abs => out.push_str("abs"),
            Kind::LParen => out.push('('),
            Kind::RParen => out.push(')'),
            Kind::Comma => out.push(','),
            Kind::Pipe => out.push('|'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{pass1, pass2};
    use crate::token::tokenize;

    fn canonical(expr: &str) -> String {
        let tokens = pass2(pass1(tokenize(expr).unwrap()).unwrap()).unwrap();
        to_canonical_string(&tokens)
    }

    #[test]
    fn round_trips_through_tokenizer() {
        let printed = canonical("1/2[pi]");
        let retokenized = tokenize(&printed);
        assert!(retokenized.is_ok(), "printed form '{printed}' must re-tokenize");
    }

    #[test]
    fn bare_input_canonicalizes_to_bracketed_form() {
        let printed = canonical("1/2pi");
        assert!(printed.contains("[pi]"), "canonical form should use the bracketed sentinel, got '{printed}'");
        assert!(tokenize(&printed).is_ok());
    }

    #[test]
    fn abs_bars_print_as_abs_function() {
        let printed = canonical("|-3+4|");
        assert!(printed.starts_with("abs("));
    }

    #[test]
    fn bare_prefix_gets_explicit_parens() {
        let printed = canonical("sin2[pi]");
        assert!(printed.contains("sin("));
    }
}
