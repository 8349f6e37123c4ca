//! Source rewriting
//!
//! Turns the text of a suspendable function into a [`NormalizedProgram`]: a
//! flat list of canonical lines where every suspension is a `return` at
//! statement level, every `for` reads from a tracked scratch slot, and loop
//! spans are recorded for the state synthesizer.

pub mod adjust;
pub mod normalizer;
pub mod scanner;
pub mod unpack;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{EngineError, EngineResult};

pub use normalizer::{normalize, normalize_with_width};

/// Inclusive `(start, end)` line indices of one loop
pub type LoopSpan = (usize, usize);

/// A line planned relative to the statement being rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    /// Extra nesting levels below the statement's indent
    pub depth: usize,
    pub text: String,
    /// Header of a loop the normalizer must open a span for
    pub opens_loop: bool,
}

impl PlannedLine {
    pub fn at(depth: usize, text: impl Into<String>) -> Self {
        Self {
            depth,
            text: text.into(),
            opens_loop: false,
        }
    }
}

/// The outer function's definition line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    /// Canonical header text, e.g. `def g(a, b=1):`
    pub header: String,
    pub decorators: Vec<String>,
    pub is_async: bool,
    /// Source line of the header
    pub line: usize,
}

impl Signature {
    pub fn from_header(header: &scanner::DefHeader) -> EngineResult<Self> {
        let chunks =
            scanner::chunks(&header.header).map_err(|m| EngineError::parse(header.line, m))?;
        let is_async = chunks.first().map_or(false, |c| c.is_name("async"));
        let name = chunks
            .iter()
            .skip_while(|c| !c.is_name("def"))
            .nth(1)
            .and_then(|c| c.identifier())
            .ok_or_else(|| EngineError::parse(header.line, "definition without a name"))?;

        Ok(Self {
            name: name.to_string(),
            header: header.header.clone(),
            decorators: header.decorators.clone(),
            is_async,
            line: header.line,
        })
    }
}

/// Immutable product of normalization
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProgram {
    pub signature: Signature,
    pub lines: Vec<String>,
    pub loop_spans: Vec<LoopSpan>,
    /// Source line of every normalized line
    pub line_map: Vec<usize>,
    /// The text this program was built from
    pub source: String,
    pub indent_width: usize,
}

impl NormalizedProgram {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn indent_of(&self, index: usize) -> usize {
        self.lines
            .get(index)
            .map_or(0, |line| line.len() - line.trim_start_matches(' ').len())
    }

    /// Line text without indentation
    pub fn text_of(&self, index: usize) -> &str {
        self.lines.get(index).map_or("", |line| line.trim_start_matches(' '))
    }

    pub fn logical_line(&self, index: usize) -> Option<usize> {
        self.line_map.get(index).copied()
    }

    /// Whether the line hands a value to the caller
    pub fn is_suspension(&self, index: usize) -> bool {
        let text = self.text_of(index);
        (text == "return" || text.starts_with("return ")) && !text.starts_with("return Termination(")
    }

    /// Normalized indices of the suspensions written on a source line
    pub fn suspensions_on(&self, line: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.line_map[i] == line && self.is_suspension(i))
            .collect()
    }

    /// Loops containing `index` in their body, outermost first
    pub fn enclosing_loops(&self, index: usize) -> Vec<LoopSpan> {
        let mut loops: Vec<LoopSpan> = self
            .loop_spans
            .iter()
            .copied()
            .filter(|&(start, end)| start < index && index <= end)
            .collect();
        loops.sort_by_key(|&(start, _)| start);
        loops
    }

    /// SHA-256 over the normalized lines
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.lines.join("\n").as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
