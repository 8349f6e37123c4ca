//! Resumption orchestrator
//!
//! One resumption: synthesize the state block for the cursor, prepare the
//! scratch for the resume kind, run the block once and turn its exit into a
//! [`GeneratorState`].

use tracing::{debug, trace, warn};

use super::{Generator, GeneratorState, Resume};
use crate::config;
use crate::errors::{EngineError, EngineResult};
use crate::interpreter::{parse_block, ExcVal, Flow, Machine, SlotKey, Unwind, Val};
use crate::state::{synthesize, StateBlock};

/// Lines run by one resumption, with the normalized index of each
struct Prepared {
    lines: Vec<String>,
    cursor_map: Vec<usize>,
}

impl Generator {
    pub(crate) fn resume_nested(&mut self, resume: Resume, depth: usize) -> EngineResult<GeneratorState> {
        if self.closed {
            return Ok(GeneratorState::Complete(Val::None));
        }
        if self.cursor.running {
            return Err(EngineError::ProgrammerMisuse("generator already executing".to_string()));
        }
        if let Resume::Send(value) = &resume {
            if !self.has_started() && *value != Val::None {
                warn!(name = %self.name(), "send to a just-started generator");
                return Err(EngineError::ProgrammerMisuse(
                    "can't send non-None value to a just-started generator".to_string(),
                ));
            }
        }

        let resume = match resume {
            Resume::Throw(exc) => match self.throw_into_delegate(exc, depth)? {
                Delegated::Handled(state) => return Ok(state),
                Delegated::Continue(resume) => resume,
            },
            other => other,
        };
        self.run_once(resume, depth)
    }

    /// Throw `GeneratorExit` in and require the body to finish
    pub(crate) fn close_nested(&mut self, depth: usize) -> EngineResult<()> {
        if self.closed {
            return Ok(());
        }
        if !self.has_started() {
            self.finish(None);
            return Ok(());
        }

        let exit = ExcVal::new("GeneratorExit", Vec::new());
        match self.resume_nested(Resume::Throw(exit), depth) {
            Ok(GeneratorState::Complete(_)) => Ok(()),
            Ok(GeneratorState::Yielded(_)) => {
                warn!(name = %self.name(), "generator ignored GeneratorExit");
                Err(EngineError::ProgrammerMisuse("generator ignored GeneratorExit".to_string()))
            }
            Err(EngineError::UserException { exc, .. }) if exc.is_a("GeneratorExit") || exc.is_a("StopIteration") => {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// A throw while paused in `yield from` goes to the inner generator first
    fn throw_into_delegate(&mut self, exc: ExcVal, depth: usize) -> EngineResult<Delegated> {
        let Some(key) = self.delegate_slot() else {
            return Ok(Delegated::Continue(Resume::Throw(exc)));
        };
        if !matches!(self.cursor.scratch.get(key), Some(Val::Generator(inner)) if inner.has_started()) {
            return Ok(Delegated::Continue(Resume::Throw(exc)));
        }
        let Some(Val::Generator(mut inner)) = self.cursor.scratch.remove(key) else {
            return Ok(Delegated::Continue(Resume::Throw(exc)));
        };

        let outcome = if exc.is_a("GeneratorExit") {
            inner.close_nested(depth + 1).map(|_| None)
        } else {
            inner.resume_nested(Resume::Throw(exc.clone()), depth + 1).map(Some)
        };
        self.cursor.scratch.set(key, Val::Generator(inner));

        match outcome {
            Ok(Some(GeneratorState::Yielded(value))) => Ok(Delegated::Handled(GeneratorState::Yielded(value))),
            // the delegation finished; the outer body carries on after it
            Ok(Some(GeneratorState::Complete(_))) => Ok(Delegated::Continue(Resume::Next)),
            Ok(None) => Ok(Delegated::Continue(Resume::Throw(exc))),
            Err(EngineError::UserException { exc, .. }) => Ok(Delegated::Continue(Resume::Throw(exc))),
            Err(err) => {
                self.finish(None);
                Err(err)
            }
        }
    }

    /// Slot of the delegating loop the cursor is paused in
    pub(super) fn delegate_slot(&self) -> Option<SlotKey> {
        let &(start, _) = self.cursor.active_loops.last()?;
        let header = self.program.text_of(start);
        let slot = header.strip_prefix("for .yielded in ")?.strip_suffix(':')?;
        SlotKey::parse(slot)
    }

    /* ===================== One Resumption ===================== */

    fn run_once(&mut self, resume: Resume, depth: usize) -> EngineResult<GeneratorState> {
        let block = synthesize(&self.program, &self.cursor)?;
        let prepared = self.prepare(block, matches!(resume, Resume::Throw(_)));

        if config::current().trace_state_blocks {
            trace!(name = %self.name(), block = %prepared.lines.join("\n"), "state block");
        }

        let nodes = parse_block(&prepared.lines).map_err(|err| {
            let err = self.relocate(err, &prepared.cursor_map);
            self.finish(None);
            err
        })?;

        let mut scratch = std::mem::take(&mut self.cursor.scratch);
        match resume {
            Resume::Next => {
                scratch.remove(SlotKey::Send);
            }
            Resume::Send(value) => scratch.set_send(value),
            Resume::Throw(exc) => scratch.set_send(Val::Exception(exc)),
        }
        let locals = std::mem::take(&mut self.cursor.locals);

        self.cursor.running = true;
        let mut machine = Machine::for_generator(locals, &mut scratch, depth);
        let result = machine.run(&nodes);
        let (locals, handled) = machine.into_parts();
        self.cursor.running = false;

        match result {
            Ok(Flow::Suspend { value, line }) => {
                let index = prepared.cursor_map.get(line).copied().unwrap_or(self.program.len());
                scratch.set_handled(handled);
                self.cursor.locals = locals;
                self.cursor.scratch = scratch;
                self.cursor.advance_past(&self.program, index);
                debug!(
                    name = %self.name(),
                    line = ?self.program.logical_line(index),
                    "generator suspended"
                );
                Ok(GeneratorState::Yielded(value))
            }
            Ok(Flow::Return(Val::Termination(payload))) => {
                self.cursor.locals = locals;
                let payload = *payload;
                debug!(name = %self.name(), "generator finished");
                self.finish(Some(payload.clone()));
                Ok(GeneratorState::Complete(payload))
            }
            Ok(Flow::Return(value)) => {
                self.cursor.locals = locals;
                self.finish(Some(value.clone()));
                Ok(GeneratorState::Complete(value))
            }
            Ok(Flow::Normal) | Ok(Flow::Break) | Ok(Flow::Continue) => {
                self.cursor.locals = locals;
                self.finish(None);
                Ok(GeneratorState::Complete(Val::None))
            }
            Err(Unwind::Raise { exc, line }) => {
                self.cursor.locals = locals;
                self.finish(None);
                let line = line
                    .and_then(|line| prepared.cursor_map.get(line).copied())
                    .and_then(|index| self.program.logical_line(index));
                // a StopIteration leaking out of the body must not look like exhaustion
                let exc = if exc.is_a("StopIteration") {
                    ExcVal::message("RuntimeError", "generator raised StopIteration")
                } else {
                    exc
                };
                debug!(name = %self.name(), exc = %exc, "generator raised");
                Err(EngineError::UserException { exc, line })
            }
            Err(Unwind::Fatal(err)) => {
                self.cursor.locals = locals;
                self.finish(None);
                Err(self.relocate(err, &prepared.cursor_map))
            }
        }
    }

    /// Insert the throw and append the terminating return
    fn prepare(&self, block: StateBlock, throw: bool) -> Prepared {
        let StateBlock {
            mut body,
            mut cursor_map,
            entry,
        } = block;

        if throw {
            let origin = self
                .cursor
                .suspension_index()
                .or_else(|| cursor_map.get(entry.index).copied())
                .unwrap_or(0);
            body.insert(entry.index, format!("{}raise .send", " ".repeat(entry.indent)));
            cursor_map.insert(entry.index, origin);
        }

        let width = self.program.indent_width;
        body.push(format!("{}return Termination()", " ".repeat(width)));
        cursor_map.push(self.program.len().saturating_sub(1));

        Prepared {
            lines: body,
            cursor_map,
        }
    }

    /// Map a state-block line number in `err` back to the source line
    fn relocate(&self, err: EngineError, cursor_map: &[usize]) -> EngineError {
        let source_line = |line: usize| {
            cursor_map
                .get(line)
                .and_then(|&index| self.program.logical_line(index))
                .unwrap_or(line)
        };
        match err {
            EngineError::Parse { line, message } => EngineError::Parse {
                line: source_line(line),
                message,
            },
            EngineError::UnsupportedConstruct { line, construct } => EngineError::UnsupportedConstruct {
                line: source_line(line),
                construct,
            },
            other => other,
        }
    }
}

enum Delegated {
    Handled(GeneratorState),
    Continue(Resume),
}
