//! Frame oracle
//!
//! The view of a paused frame needed to rebuild a generator from scratch:
//! its source, the line it is paused at, its locals and the iterators its
//! loops were drawing from.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Generator;
use crate::errors::{EngineError, EngineResult};
use crate::interpreter::{Env, Scratch, SlotKey, Val};
use crate::rewrite::normalize;
use crate::state::Cursor;

pub trait FrameOracle {
    /// Text of the suspendable function
    fn source_of(&self) -> EngineResult<String>;

    /// Source line of the suspension, `None` if the frame has not started
    fn current_line_of(&self) -> Option<usize>;

    fn locals_of(&self) -> Env;

    /// Inner iterator of an active `yield from`
    fn delegated_of(&self) -> Option<Val>;

    /// Tracked loop iterators by loop indent
    fn tracked_of(&self) -> BTreeMap<usize, Val>;

    /// Normalized index of the suspension, when a line holds several
    fn suspension_of(&self) -> Option<usize> {
        None
    }

    /// Full scratch record, when the oracle has one
    fn scratch_of(&self) -> Option<Scratch> {
        None
    }

    fn finished(&self) -> bool {
        false
    }
}

/// A captured frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub source: String,
    pub line: Option<usize>,
    pub locals: Env,
    pub delegated: Option<Val>,
    pub tracked: BTreeMap<usize, Val>,
}

impl Snapshot {
    /// Capture what `oracle` reports
    pub fn of(oracle: &impl FrameOracle) -> EngineResult<Self> {
        Ok(Self {
            source: oracle.source_of()?,
            line: oracle.current_line_of(),
            locals: oracle.locals_of(),
            delegated: oracle.delegated_of(),
            tracked: oracle.tracked_of(),
        })
    }
}

impl FrameOracle for Snapshot {
    fn source_of(&self) -> EngineResult<String> {
        if self.source.trim().is_empty() {
            return Err(EngineError::SourceUnavailable("snapshot carries no source".to_string()));
        }
        Ok(self.source.clone())
    }

    fn current_line_of(&self) -> Option<usize> {
        self.line
    }

    fn locals_of(&self) -> Env {
        self.locals.clone()
    }

    fn delegated_of(&self) -> Option<Val> {
        self.delegated.clone()
    }

    fn tracked_of(&self) -> BTreeMap<usize, Val> {
        self.tracked.clone()
    }
}

impl FrameOracle for Generator {
    fn source_of(&self) -> EngineResult<String> {
        Ok(self.program.source.clone())
    }

    fn current_line_of(&self) -> Option<usize> {
        self.current_line()
    }

    fn locals_of(&self) -> Env {
        self.cursor.locals.clone()
    }

    fn delegated_of(&self) -> Option<Val> {
        self.yieldfrom().cloned()
    }

    fn tracked_of(&self) -> BTreeMap<usize, Val> {
        self.cursor.scratch.tracked()
    }

    fn suspension_of(&self) -> Option<usize> {
        self.cursor.suspension_index()
    }

    fn scratch_of(&self) -> Option<Scratch> {
        Some(self.cursor.scratch.clone())
    }

    fn finished(&self) -> bool {
        self.closed
    }
}

impl Generator {
    /// Rebuild a generator paused where `oracle`'s frame is paused
    pub fn from_oracle(oracle: &impl FrameOracle) -> EngineResult<Self> {
        let program = Arc::new(normalize(&oracle.source_of()?)?);
        let mut cursor = Cursor::start(oracle.locals_of());

        if oracle.finished() {
            let mut generator = Self::with_cursor(program, cursor);
            generator.finish(None);
            return Ok(generator);
        }

        let Some(line) = oracle.current_line_of() else {
            return Ok(Self::with_cursor(program, cursor));
        };
        let index = match oracle.suspension_of() {
            Some(index) if program.is_suspension(index) => index,
            _ => *program
                .suspensions_on(line)
                .first()
                .ok_or_else(|| EngineError::parse(line, "no suspension point on this line"))?,
        };
        cursor.advance_past(&program, index);

        cursor.scratch = match oracle.scratch_of() {
            Some(scratch) => scratch,
            None => {
                let mut scratch = Scratch::default();
                for (indent, iterator) in oracle.tracked_of() {
                    scratch.set(SlotKey::Tracked(indent), iterator);
                }
                scratch
            }
        };
        if let Some(inner) = oracle.delegated_of() {
            let mut probe = Self::with_cursor(program.clone(), cursor.clone());
            if let Some(key) = probe.delegate_slot() {
                probe.cursor.scratch.set(key, inner);
                cursor = probe.cursor;
            }
        }
        Ok(Self::with_cursor(program, cursor))
    }
}
