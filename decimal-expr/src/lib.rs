//! decimal-expr - infix expression tokenizer, rewriter, and evaluator
//! built on top of `decimal-core`'s arbitrary-precision arithmetic.
//!
//! [`calc`] runs the full three-pass pipeline (`spec.md` §4.5/§4.6):
//! tokenize, rewrite (implicit multiplication, unary minus, abs bars,
//! bracket insertion), then evaluate via Shunting-yard. [`syntax_check`]
//! runs the same rewrite but evaluates in a mode that never touches real
//! arithmetic, only structure and arity.

mod bindings;
mod canon;
mod eval;
mod rewrite;
mod token;

pub use bindings::{Bindings, MAX_HOP_DEPTH};
pub use canon::to_canonical_string;
pub use eval::{evaluate, EvalState, Mode};
pub use rewrite::{pass1, pass2};
pub use token::{tokenize, Assoc, Constant, Kind, Position, Token, TokenClass};

use decimal_core::{Error, GlobalConfig, Result, Value, Warning};

/// The outcome of a full `calc` run: the computed value, the canonical
/// surface form of the rewritten expression (`spec.md` §8's idempotence
/// property), and any warnings raised along the way.
#[derive(Debug, Clone)]
pub struct CalcOutcome {
    pub value: Value,
    pub canonical: String,
    pub warnings: Vec<Warning>,
}

fn rewritten(expr: &str, cfg: &GlobalConfig) -> Result<Vec<Token>> {
    if expr.len() > cfg.max_input_len {
        return Err(Error::InputTooLong { len: expr.len(), max: cfg.max_input_len });
    }
    let raw = tokenize(expr)?;
    if let Some(tok) = raw.iter().find(|t| t.is_private) {
        return Err(Error::syntax(tok.source_pos, "private rewriter token cannot appear in user input"));
    }
    pass2(pass1(raw)?)
}

/// Tokenizes, rewrites, and evaluates `expr`, returning the resulting
/// [`Value`] along with the rewritten expression's canonical printed form
/// and any warnings emitted during evaluation.
pub fn calc(expr: &str, cfg: &GlobalConfig, acc: u32, bindings: &Bindings) -> Result<CalcOutcome> {
    let tokens = rewritten(expr, cfg)?;
    let canonical = to_canonical_string(&tokens);

    decimal_core::take_warnings();
    let state = EvalState { cfg, bindings, mode: Mode::Calc, acc, x_binding: None, depth: 0 };
    let value = evaluate(&tokens, &state)?;
    let warnings = decimal_core::take_warnings();

    Ok(CalcOutcome { value, canonical, warnings })
}

/// Rewrites `expr` and validates its structure and function arities
/// without performing any real arithmetic (`spec.md` §4.6's `syntaxCheck`
/// mode), returning the canonical printed form on success.
pub fn syntax_check(expr: &str, cfg: &GlobalConfig) -> Result<String> {
    let tokens = rewritten(expr, cfg)?;
    let canonical = to_canonical_string(&tokens);
    let bindings = Bindings::none();
    let state = EvalState { cfg, bindings: &bindings, mode: Mode::SyntaxCheck, acc: cfg.default_acc, x_binding: None, depth: 0 };
    evaluate(&tokens, &state)?;
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_evaluates_a_full_expression() {
        let cfg = GlobalConfig::new(30);
        let out = calc("2*(3+4)", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(out.value.re().to_normal_string(30), "14");
    }

    #[test]
    fn calc_reports_canonical_form() {
        let cfg = GlobalConfig::new(30);
        let out = calc("2[pi]", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(out.canonical, "2[cdot][pi]");
    }

    #[test]
    fn syntax_check_never_raises_on_reserved_private_tokens() {
        let cfg = GlobalConfig::new(30);
        let canonical = syntax_check("-3+|4|", &cfg).unwrap();
        assert!(canonical.contains("abs("));
    }

    #[test]
    fn input_too_long_is_rejected_before_tokenizing() {
        let cfg = GlobalConfig::new(30);
        let huge = "1+".repeat(cfg.max_input_len);
        let err = calc(&huge, &cfg, 30, &Bindings::none()).unwrap_err();
        assert_eq!(err.code(), "INPUT_TOO_LONG");
    }

    #[test]
    fn warnings_from_a_calc_call_are_isolated() {
        let cfg = GlobalConfig::new(30);
        let out = calc("1+1", &cfg, 30, &Bindings::none()).unwrap();
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn end_to_end_scenario_ln_of_e_to_the_ten() {
        let cfg = GlobalConfig::new(30);
        let out = calc("ln(e^10)", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(out.value.re().to_normal_string(10), "10");
    }

    #[test]
    fn end_to_end_scenario_sin_of_pi_over_six() {
        let cfg = GlobalConfig::new(30);
        let out = calc("sin(pi/6)", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(out.value.re().with_acc(8).unwrap().to_normal_string(8), "0.5");
    }

    #[test]
    fn end_to_end_scenario_arctan_one_times_four_is_pi() {
        let cfg = GlobalConfig::new(30);
        let out = calc("arctan(1)*4", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(out.value.re().with_acc(10).unwrap().to_normal_string(10), cfg.constants.pi.with_acc(10).unwrap().to_normal_string(10));
    }

    #[test]
    fn end_to_end_bare_identifiers_match_bracketed_canonical_semantics() {
        let cfg = GlobalConfig::new(30);
        let bare = calc("1/2pi", &cfg, 30, &Bindings::none()).unwrap();
        let bracketed = calc("1/2[pi]", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(bare.value.re().to_normal_string(20), bracketed.value.re().to_normal_string(20));
    }

    #[test]
    fn end_to_end_abs_of_complex_literal_with_bare_imaginary_unit() {
        let cfg = GlobalConfig::new(30);
        let out = calc("|-3+4i|", &cfg, 30, &Bindings::none()).unwrap();
        assert_eq!(out.value.re().to_normal_string(10), "5");
    }
}
