//! Error taxonomy for the decimal/complex engine.
//!
//! Every operation either returns a valid value or a typed error; there are
//! no sentinel values (no NaN, no silent infinities, no negative zero).
//! Errors are never recovered from internally — the first failing
//! sub-computation aborts the enclosing operation and its `Err` propagates
//! with `?` up to the expression evaluator, which is the only component
//! that catches (it wraps positions into `Syntax` and rejects private
//! tokens leaking from user input).
//!
//! `Underflow` never reaches the caller as an `Err` — the data model
//! collapses an underflowing value to zero and reports the event only
//! through the warning channel (see [`crate::config::Warning`]).

use thiserror::Error;

/// The closed error taxonomy from the spec's external-interface section.
/// `Display` always starts with the component that raised it, matching the
/// "component prefix + English description" house style.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("decimal: input out of range: {0}")]
    InputRange(String),

    #[error("decimal: malformed input: {0}")]
    InputFormat(String),

    #[error("decimal: input too long ({len} > {max})")]
    InputTooLong { len: usize, max: usize },

    #[error("decimal: overflow: {0}")]
    Overflow(String),

    #[error("decimal: division by zero")]
    DivByZero,

    #[error("decimal: undefined: {0}")]
    Undefined(String),

    #[error("decimal: series failed to converge: {0}")]
    Unreliable(String),

    #[error("decimal: factorial argument out of range (n > {cap})")]
    FactorialRange { cap: u64 },

    #[error("expr: unknown function: {0}")]
    UnknownFunction(String),

    #[error("expr: syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
}

impl Error {
    /// Machine-readable code, for callers that want to match on the
    /// taxonomy without destructuring the `Display` string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InputRange(_) => "INPUT_RANGE",
            Error::InputFormat(_) => "INPUT_FORMAT",
            Error::InputTooLong { .. } => "INPUT_TOO_LONG",
            Error::Overflow(_) => "OVERFLOW",
            Error::DivByZero => "DIV_BY_ZERO",
            Error::Undefined(_) => "UNDEFINED",
            Error::Unreliable(_) => "UNRELIABLE",
            Error::FactorialRange { .. } => "FACTORIAL_RANGE",
            Error::UnknownFunction(_) => "UNKNOWN_FUNCTION",
            Error::Syntax { .. } => "SYNTAX",
        }
    }

    /// True for the errors the rewriter is allowed to re-wrap as `Syntax`
    /// (everything raised while still inside rewriting, before evaluation
    /// has touched the value stack).
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }

    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Error::Syntax { position, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_variant() {
        assert_eq!(Error::DivByZero.code(), "DIV_BY_ZERO");
        assert_eq!(Error::syntax(3, "bad token").code(), "SYNTAX");
    }

    #[test]
    fn display_carries_component_prefix() {
        let msg = format!("{}", Error::Undefined("ln 0".into()));
        assert!(msg.starts_with("decimal:"));
    }

    #[test]
    fn syntax_reports_one_based_position() {
        let err = Error::syntax(1, "unexpected token");
        let msg = format!("{}", err);
        assert!(msg.contains("position 1"));
    }
}
