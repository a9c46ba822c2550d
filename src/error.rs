//! Errors reported by parsing and by the reference evaluator.

use thiserror::Error;

use crate::dsl::CompareOp;
use crate::registry::ValueType;

/// Why a filter expression was rejected. Offsets are byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Characters that matched no token rule.
    #[error("{offset}: Invalid character sequence '{text}'")]
    Lexical { offset: usize, text: String },

    /// Grammar violation.
    #[error("{offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A member path segment that is not whitelisted for its base type.
    #[error("{offset}: Unrecognized member '{member}' of '{owner}'")]
    Resolution {
        offset: usize,
        member: String,
        owner: String,
    },

    /// A literal whose contents cannot be represented.
    #[error("{offset}: {message}")]
    Literal { offset: usize, message: String },

    /// A literal that cannot be coerced, or a non-boolean filter.
    #[error("{offset}: {message}")]
    Type { offset: usize, message: String },
}

impl ParseError {
    /// Byte offset into the filter source where the problem starts. Not a
    /// character index: text before it may hold multi-byte characters.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Lexical { offset, .. }
            | ParseError::Syntax { offset, .. }
            | ParseError::Resolution { offset, .. }
            | ParseError::Literal { offset, .. }
            | ParseError::Type { offset, .. } => *offset,
        }
    }
}

/// Failure while evaluating a predicate against an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("cannot read member '{member}' of a null value")]
    NullReference { member: String },

    #[error("cannot read member '{member}' of a {found} value")]
    NotAnObject { member: String, found: ValueType },

    #[error("operator '{op}' cannot compare {left} with {right}")]
    TypeMismatch {
        op: CompareOp,
        left: ValueType,
        right: ValueType,
    },

    #[error("operator '{op}' is not defined for {operand}")]
    Unordered { op: CompareOp, operand: ValueType },

    #[error("expected a boolean, found {found}")]
    NotBoolean { found: ValueType },
}
