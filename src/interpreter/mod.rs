//! Interpreter for the normalized line language
//!
//! State blocks and ordinary function bodies are parsed into [`Node`] trees
//! and executed by a [`Machine`] over an explicit environment. A machine
//! with a scratch attached runs in generator mode: `return` of a
//! non-`Termination` value suspends the frame instead of finishing it.

pub mod format;
pub mod machine;
pub mod operators;
pub mod parser;
pub mod types;

mod builtins;
mod expressions;

#[cfg(test)]
mod tests;

pub use machine::{bind_arguments, Limits, Machine};
pub use parser::{parse_block, parse_expression, parse_signature, DefSignature};
pub use types::{Env, ExcVal, Expr, Flow, Node, Scratch, SlotKey, Unwind, Val};

use crate::errors::{EngineError, EngineResult};

/// Run `lines` as a plain block and return the final environment
///
/// Uncaught exceptions surface as [`EngineError::UserException`].
pub fn exec_lines(lines: &[String], env: Env) -> EngineResult<Env> {
    let nodes = parse_block(lines)?;
    let mut machine = Machine::new(env);
    match machine.run(&nodes) {
        Ok(_) => Ok(machine.into_parts().0),
        Err(Unwind::Raise { exc, line }) => Err(EngineError::UserException { exc, line }),
        Err(Unwind::Fatal(err)) => Err(err),
    }
}

/// Evaluate one expression against `env`
pub fn eval_text(text: &str, env: Env) -> EngineResult<Val> {
    let expr = parse_expression(text)?;
    let mut machine = Machine::new(env);
    match machine.eval(&expr) {
        Ok(value) => Ok(value),
        Err(Unwind::Raise { exc, line }) => Err(EngineError::UserException { exc, line }),
        Err(Unwind::Fatal(err)) => Err(err),
    }
}
