//! C6 pass 3 — Shunting-yard evaluation (`spec.md` §4.6).
//!
//! Dijkstra's stack-based infix-to-RPN conversion fused with evaluation,
//! adapted per the spec: unary prefix operators and right-associative `^`
//! only pop a stacked operator of strictly higher priority (never an
//! equal-priority sibling — that's what preserves `2^3^4 == 2^(3^4)`); a
//! `,` pops down to the enclosing `(` without consuming it, so by the time
//! the matching `)` arrives each argument has reduced to exactly one
//! value and a binary function's two arguments sit on the value stack in
//! order.
//!
//! Two modes (`spec.md` §4.6): `Calc` materializes literals and invokes
//! real arithmetic; `SyntaxCheck` pushes zero for every literal and, for
//! every operator, consumes its arity's worth of operands and pushes zero
//! back without touching `decimal_core` — this validates structure and
//! arity without risking a domain error (`ln(0)`, `1/0`, etc.) on a syntax
//! probe.

use crate::bindings::{Bindings, MAX_HOP_DEPTH};
use crate::token::{Assoc, Constant, Kind, Token};
use decimal_core::{
    acos, acosh, arg, asin, asinh, atan, atanh, cbrt, cos, cosh, exp, fact_real, gamma_real, lg,
    ln, log, nroot_real, pow, sin, sinh, sqrt, tan, tanh, ComplexDecimal, Decimal, Error,
    GlobalConfig, Result, Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Calc,
    SyntaxCheck,
}

/// Everything one `evaluate` call needs: the shared config/precision, the
/// `f`/`g` bodies, which value (if any) `[x]` resolves to in the current
/// body, and how many `f`/`g` hops deep we are (`spec.md` §4.6's mutual
/// recursion, capped per [`MAX_HOP_DEPTH`]).
pub struct EvalState<'a> {
    pub cfg: &'a GlobalConfig,
    pub bindings: &'a Bindings<'a>,
    pub mode: Mode,
    pub acc: u32,
    pub x_binding: Option<Value>,
    pub depth: u32,
}

fn as_real(v: &Value) -> Result<Decimal> {
    match v {
        Value::Real(d) => Ok(d.clone()),
        Value::Complex(c) if c.is_real() => Ok(c.re().clone()),
        _ => Err(Error::Undefined("expected a real argument".into())),
    }
}

fn as_u32(d: &Decimal) -> Result<u32> {
    if !d.is_integer() || d.is_negative() {
        return Err(Error::InputRange("expected a nonnegative integer degree".into()));
    }
    let s = d.to_normal_string(d.acc());
    s.parse::<u32>().map_err(|_| Error::InputRange(format!("'{s}' does not fit a 32-bit degree")))
}

fn materialize_constant(c: Constant, state: &EvalState) -> Result<Value> {
    match c {
        Constant::Pi => Ok(Value::Real(state.cfg.constants.pi.with_acc(state.acc)?)),
        Constant::E => Ok(Value::Real(state.cfg.constants.e.with_acc(state.acc)?)),
        Constant::I => Ok(Value::from(ComplexDecimal::new(Decimal::zero(state.acc), Decimal::from_i64(1, state.acc)))),
        Constant::X => state.x_binding.clone().ok_or_else(|| Error::syntax(0, "'x' used outside an f/g function body")),
    }
}

fn pop_n(values: &mut Vec<Value>, n: usize, pos: usize) -> Result<Vec<Value>> {
    if values.len() < n {
        return Err(Error::syntax(pos, "operator is missing an operand"));
    }
    let start = values.len() - n;
    Ok(values.split_off(start))
}

/// Re-enters the pipeline on a stored `f`/`g` body with `[x]` bound to
/// the popped argument (`spec.md` §4.6), one hop deeper.
fn eval_body(body: &str, x: Value, state: &EvalState) -> Result<Value> {
    let tokens = crate::token::tokenize(body)?;
    let tokens = crate::rewrite::pass1(tokens)?;
    let tokens = crate::rewrite::pass2(tokens)?;
    let inner = EvalState {
        cfg: state.cfg,
        bindings: state.bindings,
        mode: state.mode,
        acc: state.acc,
        x_binding: Some(x),
        depth: state.depth + 1,
    };
    evaluate(&tokens, &inner)
}

fn apply_function(name: &str, op: &Token, values: &mut Vec<Value>, state: &EvalState) -> Result<()> {
    let acc = state.acc;
    let cfg = state.cfg;

    if name == "f" || name == "g" {
        let mut args = pop_n(values, 1, op.source_pos)?;
        let x = args.remove(0);
        let body = state.bindings.body_for(name).ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        if state.depth + 1 > MAX_HOP_DEPTH {
            return Err(Error::Unreliable(format!("'{name}' recursion exceeded {MAX_HOP_DEPTH} hops")));
        }
        values.push(eval_body(body, x, state)?);
        return Ok(());
    }

    let arity = op.arity as usize;
    let args = pop_n(values, arity, op.source_pos)?;
    let result = match name {
        "sin" => sin(&args[0], cfg, acc)?,
        "cos" => cos(&args[0], cfg, acc)?,
        "tan" => tan(&args[0], cfg, acc)?,
        "asin" => asin(&args[0], cfg, acc)?,
        "acos" => acos(&args[0], cfg, acc)?,
        "atan" => atan(&args[0], cfg, acc)?,
        "sinh" => sinh(&args[0], cfg, acc)?,
        "cosh" => cosh(&args[0], cfg, acc)?,
        "tanh" => tanh(&args[0], cfg, acc)?,
        "asinh" => asinh(&args[0], cfg, acc)?,
        "acosh" => acosh(&args[0], cfg, acc)?,
        "atanh" => atanh(&args[0], cfg, acc)?,
        "exp" => exp(&args[0], cfg, acc)?,
        "ln" => ln(&args[0], cfg, acc)?,
        "lg" => lg(&args[0], cfg, acc)?,
        "log" => log(&args[0], &args[1], cfg, acc)?,
        "sqrt" => sqrt(&args[0], cfg, acc)?,
        "cbrt" => cbrt(&args[0], cfg, acc)?,
        "nroot" => {
            let n = as_u32(&as_real(&args[1])?)?;
            Value::Real(nroot_real(&as_real(&args[0])?, n, cfg, acc)?)
        }
        "pow" => pow(&args[0], &args[1], cfg, acc)?,
        "fact" => Value::Real(fact_real(&as_real(&args[0])?, cfg, acc)?),
        "gamma" => Value::Real(gamma_real(&as_real(&args[0])?, cfg, acc)?),
        "abs" => Value::Real(args[0].abs(acc)?),
        "arg" => Value::Real(arg(&args[0], cfg, acc)?),
        "conj" => args[0].conj(),
        "re" => Value::Real(args[0].re()),
        "im" => Value::Real(args[0].im()),
        "sgn" => args[0].sgn()?,
        "floor" => args[0].floor()?,
        "ceil" => args[0].ceil()?,
        "mod" => args[0].checked_rem(&args[1], acc)?,
        other => return Err(Error::UnknownFunction(other.to_string())),
    };
    values.push(result);
    Ok(())
}

/// Applies one popped operator to the value stack. In [`Mode::SyntaxCheck`]
/// no `decimal_core` arithmetic runs at all: the operator's arity worth of
/// operands is consumed and a zero pushed back, so a malformed operand
/// count is still caught structurally.
fn apply(op: &Token, values: &mut Vec<Value>, state: &EvalState) -> Result<()> {
    if state.mode == Mode::SyntaxCheck {
        let arity = (op.arity as usize).max(1);
        let _ = pop_n(values, arity, op.source_pos)?;
        values.push(Value::Real(Decimal::zero(state.acc)));
        return Ok(());
    }

    let acc = state.acc;
    let cfg = state.cfg;
    match &op.kind {
        Kind::Plus => {
            let a = pop_n(values, 2, op.source_pos)?;
            values.push(a[0].add(&a[1]));
        }
        Kind::Minus => {
            let a = pop_n(values, 2, op.source_pos)?;
            values.push(a[0].sub(&a[1]));
        }
        Kind::Star | Kind::Amp => {
            let a = pop_n(values, 2, op.source_pos)?;
            values.push(a[0].mul(&a[1]));
        }
        Kind::Slash => {
            let a = pop_n(values, 2, op.source_pos)?;
            values.push(a[0].checked_div(&a[1], acc)?);
        }
        Kind::Caret => {
            let a = pop_n(values, 2, op.source_pos)?;
            values.push(pow(&a[0], &a[1], cfg, acc)?);
        }
        Kind::Neg => {
            let a = pop_n(values, 1, op.source_pos)?;
            values.push(a[0].neg());
        }
        Kind::Abs => {
            let a = pop_n(values, 1, op.source_pos)?;
            values.push(Value::Real(a[0].abs(acc)?));
        }
        Kind::Bang => {
            let a = pop_n(values, 1, op.source_pos)?;
            values.push(Value::Real(fact_real(&as_real(&a[0])?, cfg, acc)?));
        }
        Kind::Function(name) => apply_function(name, op, values, state)?,
        other => return Err(Error::syntax(op.source_pos, format!("unexpected token in operator position: {other:?}"))),
    }
    Ok(())
}

/// True when the operator on top of `ops` should be popped and applied
/// before `current` is pushed: it binds strictly tighter, or they share
/// priority and `current` is left-associative (so same-precedence chains
/// evaluate left to right; right-associative chains — `^`, prefix
/// functions, `Neg` — stay stacked and so apply right to left, `spec.md`
/// §4.6 pass 3).
fn should_pop(ops: &[Token], current: &Token) -> bool {
    match ops.last() {
        None => false,
        Some(top) => {
            if top.kind == Kind::LParen {
                return false;
            }
            top.priority < current.priority || (top.priority == current.priority && current.assoc == Assoc::Left)
        }
    }
}

fn pop_until_lparen(ops: &mut Vec<Token>, values: &mut Vec<Value>, state: &EvalState) -> Result<()> {
    loop {
        match ops.last() {
            Some(top) if top.kind == Kind::LParen => return Ok(()),
            Some(_) => {
                let o = ops.pop().unwrap();
                apply(&o, values, state)?;
            }
            None => return Err(Error::syntax(0, "missing '(' to match ')' or ','")),
        }
    }
}

/// Runs pass 3 over an already pass1/pass2-rewritten token stream.
pub fn evaluate(tokens: &[Token], state: &EvalState) -> Result<Value> {
    let mut values: Vec<Value> = Vec::new();
    let mut ops: Vec<Token> = Vec::new();

    for tok in tokens {
        match &tok.kind {
            Kind::Literal(s) => {
                let d = match state.mode {
                    Mode::Calc => Decimal::from_str(s, state.acc)?,
                    Mode::SyntaxCheck => Decimal::zero(state.acc),
                };
                values.push(Value::Real(d));
            }
            Kind::Constant(c) => values.push(materialize_constant(*c, state)?),
            Kind::LParen => ops.push(tok.clone()),
            Kind::RParen => {
                pop_until_lparen(&mut ops, &mut values, state)?;
                ops.pop();
                if let Some(top) = ops.last() {
                    if matches!(top.kind, Kind::Function(_) | Kind::Neg | Kind::Abs) {
                        let f = ops.pop().unwrap();
                        apply(&f, &mut values, state)?;
                    }
                }
            }
            Kind::Comma => pop_until_lparen(&mut ops, &mut values, state)?,
            Kind::Function(_) | Kind::Neg | Kind::Abs => ops.push(tok.clone()),
            Kind::Bang | Kind::Plus | Kind::Minus | Kind::Star | Kind::Slash | Kind::Caret | Kind::Amp => {
                while should_pop(&ops, tok) {
                    let o = ops.pop().unwrap();
                    apply(&o, &mut values, state)?;
                }
                ops.push(tok.clone());
            }
            Kind::Pipe => return Err(Error::syntax(tok.source_pos, "internal: unresolved '|' reached the evaluator")),
        }
    }

    while let Some(op) = ops.pop() {
        if op.kind == Kind::LParen {
            return Err(Error::syntax(op.source_pos, "unbalanced '('"));
        }
        apply(&op, &mut values, state)?;
    }

    if values.len() != 1 {
        return Err(Error::syntax(0, "expression did not reduce to a single value"));
    }
    Ok(values.pop().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::{pass1, pass2};
    use crate::token::tokenize;

    fn run(expr: &str, acc: u32, cfg: &GlobalConfig, bindings: &Bindings) -> Result<Value> {
        let tokens = pass2(pass1(tokenize(expr)?)?)?;
        let state = EvalState { cfg, bindings, mode: Mode::Calc, acc, x_binding: None, depth: 0 };
        evaluate(&tokens, &state)
    }

    #[test]
    fn adds_two_numbers() {
        let cfg = GlobalConfig::new(30);
        let v = run("1+2", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().to_normal_string(30), "3");
    }

    #[test]
    fn precedence_times_before_plus() {
        let cfg = GlobalConfig::new(30);
        let v = run("2+3*4", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().to_normal_string(30), "14");
    }

    #[test]
    fn right_assoc_power_tower() {
        let cfg = GlobalConfig::new(40);
        let v = run("2^3^4", 40, &cfg, &Bindings::none()).unwrap();
        // 2^(3^4) == 2^81, not (2^3)^4 == 4096.
        let expected = decimal_core::pow_int_decimal(&Decimal::from_i64(2, 40), 81, 40).unwrap();
        assert_eq!(v.re().to_normal_string(30), expected.to_normal_string(30));
    }

    #[test]
    fn implicit_mult_binds_tighter_than_division() {
        let cfg = GlobalConfig::new(30);
        // 1/2pi == 1/(2*pi), not (1/2)*pi.
        let v = run("1/2pi", 30, &cfg, &Bindings::none()).unwrap();
        let expected = Decimal::from_i64(1, 30).checked_div(&Decimal::from_i64(2, 30).mul(&cfg.constants.pi), 30).unwrap();
        assert_eq!(v.re().to_normal_string(20), expected.to_normal_string(20));
    }

    #[test]
    fn abs_bars_fold_and_evaluate() {
        let cfg = GlobalConfig::new(30);
        let v = run("|-3+4i|", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().to_normal_string(10), "5");
    }

    #[test]
    fn end_to_end_ln_of_e_to_the_ten() {
        let cfg = GlobalConfig::new(30);
        let v = run("ln(e^10)", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().to_normal_string(10), "10");
    }

    #[test]
    fn end_to_end_sin_of_pi_over_six() {
        let cfg = GlobalConfig::new(30);
        let v = run("sin(pi/6)", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().with_acc(8).unwrap().to_normal_string(8), Decimal::from_str("0.5", 8).unwrap().to_normal_string(8));
    }

    #[test]
    fn end_to_end_arctan_one_times_four() {
        let cfg = GlobalConfig::new(30);
        let v = run("arctan(1)*4", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().with_acc(10).unwrap().to_normal_string(10), cfg.constants.pi.with_acc(10).unwrap().to_normal_string(10));
    }

    #[test]
    fn syntax_check_does_not_raise_on_division_by_zero() {
        let cfg = GlobalConfig::new(30);
        let tokens = pass2(pass1(tokenize("1/0").unwrap()).unwrap()).unwrap();
        let state = EvalState { cfg: &cfg, bindings: &Bindings::none(), mode: Mode::SyntaxCheck, acc: 30, x_binding: None, depth: 0 };
        let v = evaluate(&tokens, &state).unwrap();
        assert!(v.is_zero());
    }

    #[test]
    fn user_function_f_calls_into_body() {
        let cfg = GlobalConfig::new(30);
        let bindings = Bindings { f: Some("[x]^2+1"), g: None };
        let v = run("f(3)", 30, &cfg, &bindings).unwrap();
        assert_eq!(v.re().to_normal_string(10), "10");
    }

    #[test]
    fn unbound_user_function_is_unknown() {
        let cfg = GlobalConfig::new(30);
        let err = run("f(3)", 30, &cfg, &Bindings::none()).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_FUNCTION");
    }

    #[test]
    fn mutual_recursion_between_f_and_g_is_capped() {
        let cfg = GlobalConfig::new(20);
        let bindings = Bindings { f: Some("g([x])"), g: Some("f([x])") };
        let err = run("f(1)", 20, &cfg, &bindings).unwrap_err();
        assert_eq!(err.code(), "UNRELIABLE");
    }

    #[test]
    fn gamma_matches_factorial_via_function_call() {
        let cfg = GlobalConfig::new(30);
        let v = run("gamma(5)", 30, &cfg, &Bindings::none()).unwrap();
        assert_eq!(v.re().to_normal_string(10), "24");
    }
}
