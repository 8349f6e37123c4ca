//! Engine error types
//!
//! Every failure that crosses the public surface is an [`EngineError`]. The
//! interpreter keeps its own `Unwind` type internally and converts at the
//! generator boundary.

use thiserror::Error;

use crate::interpreter::ExcVal;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The frame oracle could not produce the function's source text
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The rewriting engine or the interpreter met syntax it does not model
    #[error("unsupported construct `{construct}` at line {line}")]
    UnsupportedConstruct { line: usize, construct: String },

    /// The interpreter could not read a line
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Wrong use of the iterator protocol
    #[error("{0}")]
    ProgrammerMisuse(String),

    /// An exception escaped the generator body
    #[error("{exc} (line {line:?})")]
    UserException { exc: ExcVal, line: Option<usize> },

    /// A serialized image does not match the source it carries
    #[error("image fingerprint mismatch: expected {expected}, found {found}")]
    ImageMismatch { expected: String, found: String },

    /// A single resumption ran past the configured step budget
    #[error("RuntimeError: step limit of {0} exceeded")]
    StepLimit(u64),
}

impl EngineError {
    pub fn unsupported(line: usize, construct: impl Into<String>) -> Self {
        EngineError::UnsupportedConstruct {
            line,
            construct: construct.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        EngineError::Parse {
            line,
            message: message.into(),
        }
    }

    /// The exception carried by a `UserException`, if any
    pub fn exception(&self) -> Option<&ExcVal> {
        match self {
            EngineError::UserException { exc, .. } => Some(exc),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
