//! Resumption state
//!
//! A [`Cursor`] is where a paused generator stands; a [`StateBlock`] is the
//! straight-line program synthesized from the normalized program and the
//! cursor that continues from there.

pub mod synth;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::interpreter::{Env, Scratch, SlotKey, Val};
use crate::rewrite::{LoopSpan, NormalizedProgram};

pub use synth::synthesize;

/// Mutable resumption position of one generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Next normalized line to run
    pub line_index: usize,
    /// Loops with an iteration in progress, outermost first
    pub active_loops: Vec<LoopSpan>,
    pub locals: Env,
    pub scratch: Scratch,
    pub suspended: bool,
    pub running: bool,
}

impl Cursor {
    pub fn start(locals: Env) -> Self {
        Self {
            line_index: 0,
            active_loops: Vec::new(),
            locals,
            scratch: Scratch::default(),
            suspended: false,
            running: false,
        }
    }

    /// Move past the suspension at normalized line `index`
    pub fn advance_past(&mut self, program: &NormalizedProgram, index: usize) {
        self.line_index = index + 1;
        self.active_loops = program.enclosing_loops(index);
        self.suspended = true;
    }

    /// Index of the line the generator is paused on
    pub fn suspension_index(&self) -> Option<usize> {
        (self.suspended && self.line_index > 0).then(|| self.line_index - 1)
    }

    /// Inner iterator of the delegating loop the cursor is paused in
    pub fn yieldfrom(&self, program: &NormalizedProgram) -> Option<&Val> {
        let &(start, _) = self.active_loops.last()?;
        let header = program.text_of(start);
        let slot = header.strip_prefix("for .yielded in ")?.strip_suffix(':')?;
        self.scratch.get(SlotKey::parse(slot)?)
    }
}

/// Where a state block resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Index into `body` of the first resumed line (`body.len()` if none)
    pub index: usize,
    pub indent: usize,
}

/// One-shot program continuing a paused generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBlock {
    pub body: Vec<String>,
    /// Normalized line index of every body line
    pub cursor_map: Vec<usize>,
    pub entry: Entry,
}

impl StateBlock {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
