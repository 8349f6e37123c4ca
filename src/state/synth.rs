//! State synthesizer
//!
//! Builds the straight-line block that continues a paused generator. The
//! walk starts at the cursor and copies lines until indentation drops below
//! the current level, then leaves the enclosing block according to its
//! header:
//!
//! - an active loop: the rest of the iteration runs, then the loop is
//!   re-entered from its header (which reads the tracked iterator)
//! - `if`/`elif`/`else`/`case`: later alternatives are skipped
//! - `try` body: the copied lines are wrapped in a fresh `try:` so the
//!   handlers still apply
//! - `except` or try-`else`: sibling handlers are skipped, `finally` is kept
//! - anything else: the copied lines are flattened into the enclosing level
//!
//! A rest-of-iteration containing `break`/`continue` is wrapped in a
//! single-pass loop guarded by a sentinel so both keep their meaning.

use tracing::debug;

use super::{Cursor, Entry, StateBlock};
use crate::errors::{EngineError, EngineResult};
use crate::rewrite::{LoopSpan, NormalizedProgram};

#[derive(Debug, Clone, PartialEq, Eq)]
struct OutLine {
    indent: usize,
    text: String,
    origin: usize,
    /// Copied from the program rather than synthesized
    resumable: bool,
}

impl OutLine {
    fn synthetic(indent: usize, text: impl Into<String>, origin: usize) -> Self {
        Self {
            indent,
            text: text.into(),
            origin,
            resumable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Loop,
    Branch,
    Case,
    TryBody,
    Handler,
    Other,
}

fn first_word(text: &str) -> &str {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .next()
        .unwrap_or("")
}

/// Synthesize the block that resumes `cursor`
pub fn synthesize(program: &NormalizedProgram, cursor: &Cursor) -> EngineResult<StateBlock> {
    let mut walker = FlowWalker::new(program, cursor);
    walker.walk()?;
    let block = walker.into_block();
    debug!(
        start = cursor.line_index,
        active_loops = cursor.active_loops.len(),
        lines = block.body.len(),
        "synthesized state block"
    );
    Ok(block)
}

struct FlowWalker<'p> {
    program: &'p NormalizedProgram,
    active: &'p [LoopSpan],
    width: usize,
    start: usize,
    level: usize,
    out: Vec<OutLine>,
}

impl<'p> FlowWalker<'p> {
    fn new(program: &'p NormalizedProgram, cursor: &'p Cursor) -> Self {
        let width = program.indent_width;
        let start = cursor.line_index.min(program.len());
        let level = if start == 0 {
            width
        } else {
            program.indent_of(start - 1).max(width)
        };
        Self {
            program,
            active: &cursor.active_loops,
            width,
            start,
            level,
            out: Vec::new(),
        }
    }

    fn indent(&self, index: usize) -> usize {
        self.program.indent_of(index)
    }

    fn text(&self, index: usize) -> &'p str {
        self.program.text_of(index)
    }

    fn walk(&mut self) -> EngineResult<()> {
        let n = self.program.len();
        let mut j = self.start;
        loop {
            let indent = if j < n { self.indent(j) } else { self.width };
            if indent < self.level {
                j = self.leave(j)?;
                continue;
            }
            if j >= n {
                return Ok(());
            }
            self.out.push(OutLine {
                indent,
                text: self.text(j).to_string(),
                origin: j,
                resumable: true,
            });
            j += 1;
        }
    }

    /// Leave the block at the current level; returns where the walk resumes
    fn leave(&mut self, j: usize) -> EngineResult<usize> {
        let header = (0..j)
            .rev()
            .find(|&k| self.indent(k) < self.level)
            .ok_or_else(|| {
                let line = self.program.logical_line(j.min(self.program.len().saturating_sub(1)));
                EngineError::parse(line.unwrap_or(0), "resumption point outside any block")
            })?;
        let header_indent = self.indent(header);

        let next = match self.header_kind(header) {
            HeaderKind::Loop if self.active.iter().any(|&(s, _)| s == header) => {
                return Ok(self.loop_adjust(header));
            }
            HeaderKind::Branch => {
                self.shift_to(header_indent);
                self.skip_alternatives(j, header_indent, &["elif", "else"])
            }
            HeaderKind::Case => {
                self.shift_to(header_indent);
                self.skip_alternatives(j, header_indent, &["case"])
            }
            HeaderKind::TryBody => {
                self.wrap_try(header, header_indent);
                j
            }
            HeaderKind::Handler => {
                let k = self.skip_alternatives(j, header_indent, &["except", "else"]);
                if k < self.program.len() && self.indent(k) == header_indent && self.text(k) == "finally:" {
                    self.wrap_try(header, header_indent);
                } else {
                    self.shift_to(header_indent);
                }
                k
            }
            HeaderKind::Loop | HeaderKind::Other => {
                self.shift_to(header_indent);
                j
            }
        };
        self.level = header_indent;
        Ok(next)
    }

    fn header_kind(&self, header: usize) -> HeaderKind {
        match first_word(self.text(header)) {
            "for" | "while" => HeaderKind::Loop,
            "if" | "elif" => HeaderKind::Branch,
            "case" => HeaderKind::Case,
            "try" => HeaderKind::TryBody,
            "except" => HeaderKind::Handler,
            "else" => match self.chain_head(header) {
                Some("if") => HeaderKind::Branch,
                Some("try") => HeaderKind::Handler,
                _ => HeaderKind::Other,
            },
            _ => HeaderKind::Other,
        }
    }

    /// Keyword of the statement an `else`/`elif`/`except` clause belongs to
    fn chain_head(&self, clause: usize) -> Option<&'p str> {
        let indent = self.indent(clause);
        for k in (0..clause).rev() {
            let at = self.indent(k);
            if at > indent {
                continue;
            }
            if at < indent {
                return None;
            }
            let word = first_word(self.text(k));
            if !matches!(word, "elif" | "else" | "except" | "finally") {
                return Some(word);
            }
        }
        None
    }

    /// Skip clauses at `indent` that start with one of `keywords`
    fn skip_alternatives(&self, mut k: usize, indent: usize, keywords: &[&str]) -> usize {
        let n = self.program.len();
        while k < n && self.indent(k) == indent && keywords.contains(&first_word(self.text(k))) {
            k += 1;
            while k < n && self.indent(k) > indent {
                k += 1;
            }
        }
        k
    }

    /// Re-indent the copied lines so their top level sits at `indent`
    fn shift_to(&mut self, indent: usize) {
        let level = self.level;
        for line in &mut self.out {
            line.indent = line.indent + indent - level.min(line.indent);
        }
        self.level = indent;
    }

    fn wrap_try(&mut self, header: usize, indent: usize) {
        let body = indent + self.width;
        self.shift_to(body);
        if self.out.is_empty() {
            self.out.push(OutLine {
                indent: body,
                text: "pass".to_string(),
                origin: header,
                resumable: true,
            });
        }
        self.out.insert(0, OutLine::synthetic(indent, "try:", header));
        self.level = indent;
    }

    /// Finish the current iteration, then re-enter the loop at `start`
    fn loop_adjust(&mut self, start: usize) -> usize {
        let h = self.indent(start);
        let n = self.program.len();
        let end = self
            .active
            .iter()
            .find(|&&(s, _)| s == start)
            .map_or(start, |&(_, e)| e);

        self.shift_to(h + self.width);
        let tail = std::mem::take(&mut self.out);
        let (tail, jumps) = self.retarget(tail, h);

        let mut out = Vec::with_capacity(tail.len() + end - start + 4);
        let reentry = if jumps {
            out.push(OutLine::synthetic(h, format!(".continue{} = True", h), start));
            out.push(OutLine::synthetic(h, "for .once in (None,):", start));
            out.extend(tail);
            out.push(OutLine::synthetic(h, format!("if .continue{}:", h), start));
            h + self.width
        } else {
            let width = self.width;
            out.extend(tail.into_iter().map(|mut line| {
                line.indent -= width;
                line
            }));
            h
        };

        // the loop's `else:` clause travels with its header
        let mut after = end + 1;
        if after < n && self.indent(after) == h && self.text(after) == "else:" {
            after += 1;
            while after < n && self.indent(after) > h {
                after += 1;
            }
        }
        for idx in start..after {
            out.push(OutLine {
                indent: self.indent(idx) - h + reentry,
                text: self.text(idx).to_string(),
                origin: idx,
                resumable: true,
            });
        }

        self.out = out;
        self.level = h;
        after
    }

    /// Point `break`/`continue` of the loop at indent `h` at the single-pass wrapper
    fn retarget(&self, tail: Vec<OutLine>, h: usize) -> (Vec<OutLine>, bool) {
        let mut nested: Vec<usize> = Vec::new();
        let mut found = false;
        let mut out = Vec::with_capacity(tail.len());

        for line in tail {
            while nested.last().map_or(false, |&at| line.indent <= at) {
                nested.pop();
            }
            if nested.is_empty() && (line.text == "break" || line.text == "continue") {
                found = true;
                if line.text == "break" {
                    out.push(OutLine::synthetic(line.indent, format!(".continue{} = False", h), line.origin));
                }
                out.push(OutLine {
                    text: "break".to_string(),
                    ..line
                });
                continue;
            }
            let word = first_word(&line.text);
            if matches!(word, "for" | "while" | "def") || line.text.starts_with("async def") {
                nested.push(line.indent);
            }
            out.push(line);
        }
        (out, found)
    }

    fn into_block(self) -> StateBlock {
        let index = self
            .out
            .iter()
            .position(|line| line.resumable)
            .unwrap_or(self.out.len());
        let indent = self.out.get(index).map_or(self.width, |line| line.indent);

        StateBlock {
            body: self
                .out
                .iter()
                .map(|line| format!("{}{}", " ".repeat(line.indent), line.text))
                .collect(),
            cursor_map: self.out.iter().map(|line| line.origin).collect(),
            entry: Entry { index, indent },
        }
    }
}
