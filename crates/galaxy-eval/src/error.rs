//! Runtime error types for the galaxy evaluator.

use crate::codec::CodecError;
use crate::transport::TransportError;
use galaxy_types::{Combinator, Term, VarId};
use thiserror::Error;

/// Longest term excerpt carried by an error message.
const EXCERPT_CHARS: usize = 120;

/// Evaluation error. Every variant is fatal for the current evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// An operand reduced to the wrong kind of term, including applying
    /// something that is not a function.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("undefined variable {0}")]
    UndefinedVariable(VarId),

    #[error("variable {0} is already defined")]
    Redefinition(VarId),

    /// Division by zero, `i64` overflow, or an out-of-range `pwr2`.
    #[error("arithmetic trap: {0}")]
    ArithmeticTrap(String),

    /// A hand-built partial application holding more arguments than its
    /// combinator accepts.
    #[error("{op} holds {found} captured arguments but takes {arity}")]
    Overapplied {
        op: Combinator,
        arity: usize,
        found: usize,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
}

impl EvalError {
    pub(crate) fn mismatch(expected: &'static str, found: &Term) -> Self {
        Self::TypeMismatch {
            expected,
            found: describe(found),
        }
    }
}

/// `kind text`, with the canonical text cut short for large terms.
pub(crate) fn describe(term: &Term) -> String {
    let text = excerpt(&term.to_string());
    if text == term.kind_name() {
        text
    } else {
        format!("{} {}", term.kind_name(), text)
    }
}

pub(crate) fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
