//! Control flow types

use super::values::{ExcVal, Val};
use crate::errors::EngineError;

/* ===================== Control Flow ===================== */

/// Outcome of executing a statement or block
///
/// `Suspend` only appears in state blocks: a `return` whose value is not a
/// `Termination` hands a value to the caller without unwinding `finally`
/// clauses, because the frame is not finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Val),
    Suspend { value: Val, line: usize },
}

/// Abnormal exit: a catchable exception or an engine failure
#[derive(Debug, Clone, PartialEq)]
pub enum Unwind {
    Raise { exc: ExcVal, line: Option<usize> },
    Fatal(EngineError),
}

impl Unwind {
    pub fn raise(kind: &str, message: impl Into<String>) -> Self {
        Unwind::Raise {
            exc: ExcVal::message(kind, message),
            line: None,
        }
    }

    pub fn exc(exc: ExcVal) -> Self {
        Unwind::Raise { exc, line: None }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::raise("TypeError", message)
    }

    /// Stamp the line if no inner statement already did
    pub fn located(self, at: usize) -> Self {
        match self {
            Unwind::Raise { exc, line: None } => Unwind::Raise {
                exc,
                line: Some(at),
            },
            other => other,
        }
    }

    /// Forget the line; used when an exception crosses a call boundary
    pub fn unlocated(self) -> Self {
        match self {
            Unwind::Raise { exc, .. } => Unwind::Raise { exc, line: None },
            other => other,
        }
    }
}

impl From<EngineError> for Unwind {
    fn from(err: EngineError) -> Self {
        Unwind::Fatal(err)
    }
}

pub type ExecResult = Result<Flow, Unwind>;
pub type EvalResult = Result<Val, Unwind>;
