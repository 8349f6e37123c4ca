//! Copyable, serializable generators
//!
//! A [`Generator`] pairs a shared [`NormalizedProgram`] with the [`Cursor`]
//! of one paused execution. Each resumption synthesizes a state block from
//! the cursor, runs it once in the interpreter and records where it stopped.
//! Because the whole execution state is plain data, `Clone` is an
//! independent deep copy and serde round-trips it through a
//! [`GeneratorImage`].

pub mod async_gen;
pub mod image;
pub mod oracle;
mod orchestrator;


use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EngineError, EngineResult};
use crate::interpreter::{bind_arguments, parse_signature, Env, ExcVal, Machine, Unwind, Val};
use crate::rewrite::{normalize, NormalizedProgram};
use crate::state::Cursor;

pub use async_gen::AsyncGenerator;
pub use image::GeneratorImage;
pub use oracle::{FrameOracle, Snapshot};

/// How the caller resumes a generator
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    Next,
    Send(Val),
    Throw(ExcVal),
}

/// Outcome of one resumption
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorState {
    Yielded(Val),
    /// The body finished; carries its return payload (`None` if it had none)
    Complete(Val),
}

impl GeneratorState {
    pub fn yielded(self) -> Option<Val> {
        match self {
            GeneratorState::Yielded(value) => Some(value),
            GeneratorState::Complete(_) => None,
        }
    }
}

/// Failure of interpreter code run outside a state block
pub(crate) fn engine_error(unwind: Unwind) -> EngineError {
    match unwind {
        Unwind::Raise { exc, line } => EngineError::UserException { exc, line },
        Unwind::Fatal(err) => err,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "GeneratorImage", try_from = "GeneratorImage")]
pub struct Generator {
    program: Arc<NormalizedProgram>,
    cursor: Cursor,
    closed: bool,
    /// Return payload once the body has finished
    returned: Option<Val>,
}

impl Generator {
    /// Call the suspendable function defined by `source` with arguments
    ///
    /// Parameter defaults are evaluated in an empty environment.
    pub fn new(source: &str, args: Vec<Val>, kwargs: Vec<(String, Val)>) -> EngineResult<Self> {
        let program = normalize(source)?;
        let signature = parse_signature(&program.signature.header).map_err(|err| match err {
            EngineError::Parse { message, .. } => EngineError::parse(program.signature.line, message),
            other => other,
        })?;

        let mut machine = Machine::new(Env::new());
        let params = machine.eval_params(&signature.params).map_err(engine_error)?;
        let locals = bind_arguments(&signature.name, &params, args, kwargs).map_err(engine_error)?;
        Ok(Self::from_program(program, locals))
    }

    /// A generator over `source` whose frame starts with `locals` bound
    pub fn from_locals(source: &str, locals: Env) -> EngineResult<Self> {
        Ok(Self::from_program(normalize(source)?, locals))
    }

    pub(crate) fn from_program(program: NormalizedProgram, locals: Env) -> Self {
        debug!(
            name = %program.signature.name,
            lines = program.len(),
            loops = program.loop_spans.len(),
            "created generator"
        );
        Self::with_cursor(Arc::new(program), Cursor::start(locals))
    }

    pub(crate) fn with_cursor(program: Arc<NormalizedProgram>, cursor: Cursor) -> Self {
        Self {
            program,
            cursor,
            closed: false,
            returned: None,
        }
    }

    /* ===================== Protocol ===================== */

    /// Resume once
    ///
    /// Errors close the generator, except misuse of the protocol itself.
    pub fn resume(&mut self, resume: Resume) -> EngineResult<GeneratorState> {
        self.resume_nested(resume, 0)
    }

    pub fn next_value(&mut self) -> EngineResult<GeneratorState> {
        self.resume(Resume::Next)
    }

    /// `send(None)` is the same as `next_value()`
    pub fn send(&mut self, value: Val) -> EngineResult<GeneratorState> {
        self.resume(Resume::Send(value))
    }

    pub fn throw(&mut self, exc: ExcVal) -> EngineResult<GeneratorState> {
        self.resume(Resume::Throw(exc))
    }

    /// Throw an arbitrary value; only exceptions and exception classes qualify
    pub fn throw_value(&mut self, value: Val) -> EngineResult<GeneratorState> {
        let exc = match value {
            Val::Exception(exc) => exc,
            Val::Builtin(name) if crate::interpreter::types::values::is_exception_class(&name) => {
                ExcVal::new(name, Vec::new())
            }
            other => {
                return Err(EngineError::ProgrammerMisuse(format!(
                    "exceptions must derive from BaseException, not {}",
                    other.type_name()
                )))
            }
        };
        self.throw(exc)
    }

    /// Idempotent
    pub fn close(&mut self) -> EngineResult<()> {
        self.close_nested(0)
    }

    /// An independent generator that continues from the same point
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /* ===================== Introspection ===================== */

    pub fn name(&self) -> &str {
        &self.program.signature.name
    }

    pub fn is_async(&self) -> bool {
        self.program.signature.is_async
    }

    pub fn program(&self) -> &NormalizedProgram {
        &self.program
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn locals(&self) -> &Env {
        &self.cursor.locals
    }

    /// Resumed at least once, or already finished
    pub fn has_started(&self) -> bool {
        self.cursor.suspended || self.closed
    }

    pub fn is_suspended(&self) -> bool {
        self.cursor.suspended && !self.closed
    }

    pub fn is_running(&self) -> bool {
        self.cursor.running
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Source line of the suspension the generator is paused at
    pub fn current_line(&self) -> Option<usize> {
        if self.closed {
            return None;
        }
        self.cursor
            .suspension_index()
            .and_then(|index| self.program.logical_line(index))
    }

    /// Iterator a `yield from` is currently drawing from
    pub fn yieldfrom(&self) -> Option<&Val> {
        if self.closed {
            return None;
        }
        self.cursor.yieldfrom(&self.program)
    }

    pub fn return_value(&self) -> Option<&Val> {
        self.returned.as_ref()
    }

    fn finish(&mut self, payload: Option<Val>) {
        self.closed = true;
        self.returned = payload;
        self.cursor.suspended = false;
        self.cursor.running = false;
        self.cursor.scratch = Default::default();
    }
}

impl Iterator for Generator {
    type Item = EngineResult<Val>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_value() {
            Ok(GeneratorState::Yielded(value)) => Some(Ok(value)),
            Ok(GeneratorState::Complete(_)) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
