//! C6 passes 1 and 2 — the infix-to-evaluable rewriter (`spec.md` §4.6).
//!
//! Pass 1 turns the raw token stream into one with every implicit
//! operation made explicit: unary `+`/`-` become the private `Neg`
//! token or are dropped, `|…|` folds to the private `Abs` prefix with
//! real parens, implicit multiplication (`&`) is inserted at every
//! adjacency the grammar allows, unbalanced parens are auto-closed (or
//! opened, for a leading overclose), and any implicit-multiplication run
//! that would otherwise bind looser than the explicit `*`/`/` to its
//! left is wrapped in real parens (`1/2pi` means `1/(2·pi)`).
//!
//! Pass 2 gives every *bare* (paren-less) prefix-function or unary-minus
//! application an explicit closing paren around its reach — the next
//! term, extended through any immediately-following `^` or implicit
//! multiplication, so `sin 2x` means `sin(2x)` and `sin x + 1` means
//! `sin(x) + 1`.
//!
//! The source-language redesign note in `spec.md` §9 calls for replacing
//! the original's in-band sentinel characters (`#`, `:`, `@`, `[`, `]`,
//! `~`) with structured tokens; `^`'s right-associativity is handled
//! identically and more simply by the Shunting-yard's own pop rule
//! (`spec.md` §4.6 pass 3), so pass 2 here only inserts brackets for
//! prefix functions and the private `Neg`, not for `^` itself — see
//! `DESIGN.md`.

use crate::token::{Assoc, Kind, Position, Token, TokenClass};
use decimal_core::Error;

/// True for tokens that can legally end an operand ("closing" context):
/// a value, a closing paren, or a postfix application.
fn is_closing(kind: &Kind) -> bool {
    matches!(kind, Kind::Literal(_) | Kind::Constant(_) | Kind::RParen | Kind::Bang)
}

/// True for tokens that can legally begin a new operand ("opening"
/// context): a value, a prefix function, an opening paren, or the
/// private `Abs`/`Neg` prefixes.
fn is_opening(kind: &Kind) -> bool {
    matches!(kind, Kind::Literal(_) | Kind::Constant(_) | Kind::LParen | Kind::Function(_) | Kind::Abs | Kind::Neg)
}

fn is_binary_infix(kind: &Kind) -> bool {
    matches!(kind, Kind::Plus | Kind::Minus | Kind::Star | Kind::Slash | Kind::Caret)
}

/// A context in which a leading `+`/`-` is unary rather than binary:
/// start of input, right after `(`, `,`, `|`, another prefix, or right
/// after a binary infix operator.
fn sign_is_unary(prev: Option<&Kind>) -> bool {
    match prev {
        None => true,
        Some(k) => matches!(k, Kind::LParen | Kind::Comma | Kind::Pipe | Kind::Neg | Kind::Abs | Kind::Function(_)) || is_binary_infix(k),
    }
}

/// Pass 1 (`spec.md` §4.6): unary normalization, abs-bar folding, implicit
/// multiplication, paren auto-balancing, and the `*`/`/`-precedence wrap.
pub fn pass1(tokens: Vec<Token>) -> decimal_core::Result<Vec<Token>> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + 4);
    let mut depth: i64 = 0;
    let mut leading_opens = 0usize;
    // Each open `|` records the paren depth at which it opened.
    let mut abs_stack: Vec<i64> = Vec::new();

    let mut i = 0usize;
    while i < tokens.len() {
        let tok = &tokens[i];
        match &tok.kind {
            Kind::Plus | Kind::Minus => {
                let prev_kind = out.last().map(|t| &t.kind);
                if sign_is_unary(prev_kind) {
                    if matches!(tok.kind, Kind::Minus) {
                        maybe_insert_implicit_mul(&mut out, &Kind::Neg);
                        out.push(Token::private(Kind::Neg, 2, tok.source_pos));
                    }
                    // A unary `+` contributes nothing; just drop it.
                } else {
                    out.push(tok.clone());
                }
                i += 1;
            }
            Kind::Pipe => {
                let top_matches = abs_stack.last().map(|&d| d == depth).unwrap_or(false);
                let prev_kind = out.last().map(|t| &t.kind);
                let can_close = top_matches && prev_kind.map(is_closing).unwrap_or(false);
                if can_close {
                    out.push(Token::new_rparen(tok.source_pos));
                    abs_stack.pop();
                    depth -= 1;
                } else {
                    maybe_insert_implicit_mul(&mut out, &Kind::Abs);
                    out.push(Token::private(Kind::Abs, 2, tok.source_pos));
                    out.push(Token::new_lparen(tok.source_pos));
                    abs_stack.push(depth);
                    depth += 1;
                }
                i += 1;
            }
            Kind::LParen => {
                maybe_insert_implicit_mul(&mut out, &Kind::LParen);
                out.push(tok.clone());
                depth += 1;
                i += 1;
            }
            Kind::RParen => {
                depth -= 1;
                if depth < 0 {
                    leading_opens += 1;
                    depth = 0;
                }
                out.push(tok.clone());
                i += 1;
            }
            other => {
                if is_opening(other) {
                    maybe_insert_implicit_mul(&mut out, other);
                }
                out.push(tok.clone());
                i += 1;
            }
        }
    }

    for d in abs_stack {
        let _ = d;
        out.push(Token::new_rparen(out.last().map(|t| t.source_pos).unwrap_or(0)));
        depth -= 1;
    }
    while depth < 0 {
        leading_opens += 1;
        depth += 1;
    }
    if leading_opens > 0 {
        let mut prefixed = Vec::with_capacity(out.len() + leading_opens);
        for _ in 0..leading_opens {
            prefixed.push(Token::new_lparen(0));
        }
        prefixed.extend(out);
        out = prefixed;
    }
    while depth > 0 {
        out.push(Token::new_rparen(out.last().map(|t| t.source_pos).unwrap_or(0)));
        depth -= 1;
    }

    Ok(wrap_precedence_runs(out))
}

/// Inserts `&` (implicit multiplication) if the previous emitted token
/// closes an operand and `next` opens one.
fn maybe_insert_implicit_mul(out: &mut Vec<Token>, next: &Kind) {
    if let Some(prev) = out.last() {
        if is_closing(&prev.kind) && is_opening(next) {
            let pos = prev.source_pos;
            out.push(Token::new(Kind::Amp, TokenClass::Func, 5, 2, Position::Infix, Assoc::Left, pos));
        }
    }
}

/// The inclusive end index of the atom starting at `start`: a value
/// (optionally chained with postfix `!`), a parenthesized group
/// (likewise), or a prefix application (`Function`/`Neg`/`Abs`), which
/// consumes exactly its own following atom.
fn atom_end(tokens: &[Token], start: usize) -> usize {
    match &tokens[start].kind {
        Kind::Literal(_) | Kind::Constant(_) => consume_postfix(tokens, start),
        Kind::LParen => {
            let close = match_paren(tokens, start);
            consume_postfix(tokens, close)
        }
        Kind::Function(_) | Kind::Neg | Kind::Abs => {
            if start + 1 < tokens.len() {
                atom_end(tokens, start + 1)
            } else {
                start
            }
        }
        _ => start,
    }
}

fn consume_postfix(tokens: &[Token], mut end: usize) -> usize {
    while end + 1 < tokens.len() && tokens[end + 1].kind == Kind::Bang {
        end += 1;
    }
    end
}

fn match_paren(tokens: &[Token], open_idx: usize) -> usize {
    let mut depth = 1i64;
    let mut j = open_idx + 1;
    while j < tokens.len() {
        match tokens[j].kind {
            Kind::LParen => depth += 1,
            Kind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return j;
                }
            }
            _ => {}
        }
        j += 1;
    }
    tokens.len().saturating_sub(1)
}

/// The end of "the next term" for a bare prefix application: an atom,
/// extended through an immediately-following `^` (right operand,
/// recursively) or `&` implicit-multiplication chain.
fn term_end(tokens: &[Token], start: usize) -> usize {
    let mut end = atom_end(tokens, start);
    loop {
        match tokens.get(end + 1).map(|t| &t.kind) {
            Some(Kind::Caret) => {
                let rhs_start = end + 2;
                if rhs_start >= tokens.len() {
                    break;
                }
                end = term_end(tokens, rhs_start);
            }
            Some(Kind::Amp) => {
                let rhs_start = end + 2;
                if rhs_start >= tokens.len() {
                    break;
                }
                end = atom_end(tokens, rhs_start);
            }
            _ => break,
        }
    }
    end
}

/// Wraps each top-level implicit-multiplication run that is immediately
/// preceded by an explicit `*`/`/` in real parens — recursing into
/// parenthesized groups first, since they are processed independently
/// (`spec.md` §4.6's "1/2pi means 1/(2·pi)" example).
fn wrap_precedence_runs(tokens: Vec<Token>) -> Vec<Token> {
    let mut flattened = Vec::with_capacity(tokens.len());
    let mut i = 0usize;
    while i < tokens.len() {
        if tokens[i].kind == Kind::LParen {
            let close = match_paren(&tokens, i);
            let inner = wrap_precedence_runs(tokens[i + 1..close].to_vec());
            flattened.push(tokens[i].clone());
            flattened.extend(inner);
            if close < tokens.len() {
                flattened.push(tokens[close].clone());
            }
            i = close + 1;
        } else {
            flattened.push(tokens[i].clone());
            i += 1;
        }
    }

    let mut out = Vec::with_capacity(flattened.len() + 4);
    let mut i = 0usize;
    while i < flattened.len() {
        let kind = flattened[i].kind.clone();
        if is_opening(&kind) && kind != Kind::LParen {
            let start = i;
            let end = atom_end(&flattened, start);
            let preceded_by_mul_div = matches!(out.last().map(|t: &Token| &t.kind), Some(Kind::Star) | Some(Kind::Slash));
            let run_continues = flattened.get(end + 1).map(|t| t.kind == Kind::Amp).unwrap_or(false);
            if preceded_by_mul_div && run_continues {
                out.push(Token::new_lparen(flattened[start].source_pos));
                out.extend(flattened[start..=end].iter().cloned());
                let mut j = end + 1;
                while flattened.get(j).map(|t| t.kind == Kind::Amp).unwrap_or(false) {
                    out.push(flattened[j].clone());
                    let atom_start = j + 1;
                    let atom_stop = atom_end(&flattened, atom_start);
                    out.extend(flattened[atom_start..=atom_stop].iter().cloned());
                    j = atom_stop + 1;
                }
                out.push(Token::new_rparen(flattened[j - 1].source_pos));
                i = j;
                continue;
            }
            out.extend(flattened[start..=end].iter().cloned());
            i = end + 1;
        } else {
            out.push(flattened[i].clone());
            i += 1;
        }
    }
    out
}

/// Pass 2 (`spec.md` §4.6): gives every bare prefix function/`Neg` an
/// explicit closing paren around [`term_end`]'s reach.
pub fn pass2(tokens: Vec<Token>) -> decimal_core::Result<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len() + 8);
    let mut i = 0usize;
    while i < tokens.len() {
        let tok = tokens[i].clone();
        let is_prefix_needing_wrap = matches!(tok.kind, Kind::Function(_) | Kind::Neg);
        let already_parenthesized = tokens.get(i + 1).map(|t| t.kind == Kind::LParen).unwrap_or(false);
        if is_prefix_needing_wrap && !already_parenthesized {
            out.push(tok);
            let arg_start = i + 1;
            if arg_start >= tokens.len() {
                return Err(Error::syntax(tokens[i].source_pos, "prefix operator missing an operand"));
            }
            let end = term_end(&tokens, arg_start);
            out.push(Token::new_lparen(tokens[arg_start].source_pos));
            out.extend(tokens[arg_start..=end].iter().cloned());
            out.push(Token::new_rparen(tokens[end].source_pos));
            i = end + 1;
        } else {
            out.push(tok);
            i += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn kinds(tokens: &[Token]) -> Vec<Kind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn implicit_mult_between_number_and_constant() {
        let tokens = pass1(tokenize("2[pi]").unwrap()).unwrap();
        assert!(kinds(&tokens).contains(&Kind::Amp));
    }

    #[test]
    fn bare_identifiers_rewrite_the_same_as_bracketed_ones() {
        let bare = pass1(tokenize("2pi").unwrap()).unwrap();
        let bracketed = pass1(tokenize("2[pi]").unwrap()).unwrap();
        assert_eq!(kinds(&bare), kinds(&bracketed));
    }

    #[test]
    fn one_over_two_pi_wraps_the_implicit_run() {
        let tokens = pass1(tokenize("1/2pi").unwrap()).unwrap();
        // 1 / ( 2 & pi )
        let k = kinds(&tokens);
        assert_eq!(k[0], Kind::Literal("1".into()));
        assert_eq!(k[1], Kind::Slash);
        assert_eq!(k[2], Kind::LParen);
        assert_eq!(k[3], Kind::Literal("2".into()));
        assert_eq!(k[4], Kind::Amp);
        assert!(matches!(k[5], Kind::Constant(_)));
        assert_eq!(k[6], Kind::RParen);
    }

    #[test]
    fn leading_minus_becomes_private_neg() {
        let tokens = pass1(tokenize("-3+4").unwrap()).unwrap();
        assert_eq!(tokens[0].kind, Kind::Neg);
        assert!(tokens[0].is_private);
    }

    #[test]
    fn abs_bars_fold_to_private_abs_and_parens() {
        let tokens = pass1(tokenize("|-3+4|").unwrap()).unwrap();
        assert_eq!(tokens[0].kind, Kind::Abs);
        assert_eq!(tokens[1].kind, Kind::LParen);
        assert_eq!(tokens.last().unwrap().kind, Kind::RParen);
    }

    #[test]
    fn unbalanced_closing_paren_gets_a_leading_open() {
        let tokens = pass1(tokenize("1+2)").unwrap()).unwrap();
        assert_eq!(tokens[0].kind, Kind::LParen);
    }

    #[test]
    fn unclosed_paren_is_closed_at_end() {
        let tokens = pass1(tokenize("(1+2").unwrap()).unwrap();
        assert_eq!(tokens.last().unwrap().kind, Kind::RParen);
    }

    #[test]
    fn bare_function_wraps_next_term_only() {
        let tokens = pass2(pass1(tokenize("sin(x)+1").unwrap()).unwrap()).unwrap();
        // already parenthesized: pass2 should not add a second wrap
        assert_eq!(kinds(&tokens).iter().filter(|k| **k == Kind::LParen).count(), 1);
    }

    #[test]
    fn bare_function_extends_through_implicit_mult() {
        let tokens = pass2(pass1(tokenize("sin2[pi]").unwrap()).unwrap()).unwrap();
        // sin ( 2 & pi )
        let k = kinds(&tokens);
        assert!(matches!(k[0], Kind::Function(_)));
        assert_eq!(k[1], Kind::LParen);
        assert_eq!(*k.last().unwrap(), Kind::RParen);
    }
}
