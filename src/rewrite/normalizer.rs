//! Source normalizer
//!
//! Drives the scanner over a function body and emits the normalized line
//! list. Each logical line is split into statements at `;` and at block
//! header colons, then rewritten statement by statement:
//!
//! - `yield E` becomes `return E`; `return E` becomes `return Termination(E)`
//! - `for T in E:` reads from a tracked slot: `.<n> = iter(E)` then `for T in .<n>:`
//! - `yield from E` becomes a loop over a tracked slot that re-suspends each item
//! - suspensions inside expressions go through the unpacker, and the result
//!   through the block adjuster
//! - nested definitions are captured verbatim
//!
//! Loop spans are opened at loop headers and closed once a later line falls
//! back to the header's indent.

use tracing::debug;

use super::adjust::{self, ShiftScope};
use super::scanner::{self, Chunk, DefHeader, Scanner, TokKind};
use super::unpack::{suspends, Unpacker};
use super::{LoopSpan, NormalizedProgram, PlannedLine, Signature};
use crate::config;
use crate::errors::{EngineError, EngineResult};

/// Normalize with the configured indent width
pub fn normalize(source: &str) -> EngineResult<NormalizedProgram> {
    normalize_with_width(source, config::current().indent_width)
}

pub fn normalize_with_width(source: &str, width: usize) -> EngineResult<NormalizedProgram> {
    let width = width.max(1);
    let mut scanner = Scanner::new(source);
    let header = scanner.skip_source_definition()?;
    let signature = Signature::from_header(&header)?;

    let mut normalizer = Normalizer::new(width);
    normalizer.body(&mut scanner, &header)?;
    let (lines, line_map, loop_spans) = normalizer.finish()?;

    debug!(
        name = %signature.name,
        lines = lines.len(),
        loops = loop_spans.len(),
        "normalized generator source"
    );

    Ok(NormalizedProgram {
        signature,
        lines,
        loop_spans,
        line_map,
        source: source.to_string(),
        indent_width: width,
    })
}

/// Split one logical line into `(level, statement)` pairs
fn split_statements(chunks: &[Chunk], level: usize, out: &mut Vec<(usize, Vec<Chunk>)>) {
    if chunks.is_empty() {
        return;
    }
    if scanner::starts_block(chunks) {
        if let Some(colon) = scanner::header_colon(chunks) {
            out.push((level, chunks[..=colon].to_vec()));
            split_statements(&chunks[colon + 1..], level + 1, out);
            return;
        }
    }
    match chunks.iter().position(|c| c.is_kind(TokKind::Semi)) {
        Some(at) => {
            if at > 0 {
                out.push((level, chunks[..at].to_vec()));
            }
            split_statements(&chunks[at + 1..], level, out);
        }
        None => out.push((level, chunks.to_vec())),
    }
}

/// Chunks between a header keyword and its colon
fn header_body(chunks: &[Chunk], skip: usize) -> &[Chunk] {
    let end = if chunks.last().map_or(false, |c| c.is_kind(TokKind::Colon)) {
        chunks.len() - 1
    } else {
        chunks.len()
    };
    &chunks[skip.min(end)..end]
}

/// Statement chunks before a top-level `lambda`
fn before_lambda(chunks: &[Chunk]) -> &[Chunk] {
    match chunks.iter().position(|c| c.is_name("lambda")) {
        Some(at) => &chunks[..at],
        None => chunks,
    }
}

/// Drop a variable annotation; `None` when nothing is left to execute
fn strip_annotation(chunks: &[Chunk]) -> Option<Vec<Chunk>> {
    if scanner::starts_block(chunks) {
        return Some(chunks.to_vec());
    }
    let scope = before_lambda(chunks);
    let Some(colon) = scope.iter().position(|c| c.is_kind(TokKind::Colon)) else {
        return Some(chunks.to_vec());
    };
    let eq = chunks[colon..].iter().position(|c| c.is_op("="))?;
    let mut out = chunks[..colon].to_vec();
    out.extend_from_slice(&chunks[colon + eq..]);
    Some(out)
}

/// Rewrite suspending parameter defaults inside a definition header
fn unpack_defaults(unpacker: &mut Unpacker, chunks: &[Chunk]) -> EngineResult<String> {
    let mut out = String::new();
    let mut done = false;
    for chunk in chunks {
        if chunk.space() && !out.is_empty() {
            out.push(' ');
        }
        match chunk {
            Chunk::Group { open, items, .. } if !done && open.text == "(" => {
                done = true;
                let params = scanner::split_top(items, |c| c.is_kind(TokKind::Comma));
                let last = params.iter().rposition(|p| suspends(p)).unwrap_or(0);
                let mut parts = Vec::with_capacity(params.len());
                for (i, param) in params.iter().enumerate() {
                    if param.is_empty() {
                        continue;
                    }
                    match param.iter().position(|c| c.is_op("=")) {
                        Some(eq) => {
                            let default = unpacker.single(&param[eq + 1..], i < last)?;
                            parts.push(format!("{}={}", scanner::render(&param[..eq]), default));
                        }
                        None => parts.push(scanner::render(param)),
                    }
                }
                out.push('(');
                out.push_str(&parts.join(", "));
                out.push(')');
            }
            other => out.push_str(&scanner::render(std::slice::from_ref(other))),
        }
    }
    Ok(out)
}

/// Condition of a `while` whose helpers must run again before each re-test
#[derive(Debug, Clone)]
struct Replay {
    condition: Vec<Chunk>,
    line: usize,
}

/// An open loop awaiting its end line
#[derive(Debug)]
struct Jump {
    indent: usize,
    span: usize,
    replay: Option<Replay>,
}

/// A nested definition whose body is copied verbatim
#[derive(Debug)]
struct Capture {
    level: usize,
    extra: usize,
    name: String,
    /// Decorators pushed on `.decorator` to apply once the body ends
    apply: usize,
    indent: usize,
    line: usize,
}

struct Normalizer {
    width: usize,
    columns: Vec<usize>,
    lines: Vec<String>,
    line_map: Vec<usize>,
    spans: Vec<LoopSpan>,
    jumps: Vec<Jump>,
    shifts: Vec<ShiftScope>,
    decorators: Vec<(Vec<Chunk>, usize)>,
    capture: Option<Capture>,
}

impl Normalizer {
    fn new(width: usize) -> Self {
        Self {
            width,
            columns: Vec::new(),
            lines: Vec::new(),
            line_map: Vec::new(),
            spans: Vec::new(),
            jumps: Vec::new(),
            shifts: Vec::new(),
            decorators: Vec::new(),
            capture: None,
        }
    }

    fn body(&mut self, scanner: &mut Scanner, header: &DefHeader) -> EngineResult<()> {
        let mut statements = Vec::new();
        split_statements(&header.inline_body, 1, &mut statements);
        for (level, chunks) in statements {
            self.statement(level, chunks, header.line)?;
        }

        while let Some(logical) = scanner.next_logical_line()? {
            if logical.column <= header.column {
                break;
            }
            let level = self.level_of(logical.column, logical.line)?;
            let chunks =
                scanner::chunks(&logical.text).map_err(|m| EngineError::parse(logical.line, m))?;
            let mut statements = Vec::new();
            split_statements(&chunks, level, &mut statements);
            for (level, chunks) in statements {
                self.statement(level, chunks, logical.line)?;
            }
        }
        Ok(())
    }

    fn finish(mut self) -> EngineResult<(Vec<String>, Vec<usize>, Vec<LoopSpan>)> {
        self.end_capture()?;
        self.flush_decorators(self.width)?;
        self.close_loops(0)?;
        Ok((self.lines, self.line_map, self.spans))
    }

    fn level_of(&mut self, column: usize, line: usize) -> EngineResult<usize> {
        match self.columns.last() {
            None => self.columns.push(column),
            Some(&top) if column > top => self.columns.push(column),
            Some(_) => {
                while self.columns.last().map_or(false, |&top| column < top) {
                    self.columns.pop();
                }
                if self.columns.last() != Some(&column) {
                    return Err(EngineError::parse(
                        line,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
        }
        Ok(self.columns.len())
    }

    fn shift_for(&mut self, level: usize, keyword: Option<&str>) -> usize {
        while let Some(scope) = self.shifts.last() {
            if scope.covers(level, keyword) {
                break;
            }
            self.shifts.pop();
        }
        self.shifts.iter().map(|s| s.extra).sum()
    }

    fn unpacker(&self, indent: usize, line: usize) -> Unpacker {
        Unpacker::new(indent, self.width, line)
    }

    /* ===================== Emission ===================== */

    fn push_line(&mut self, indent: usize, text: String, line: usize) -> EngineResult<()> {
        self.close_loops(indent)?;
        self.lines.push(format!("{}{}", " ".repeat(indent), text));
        self.line_map.push(line);
        Ok(())
    }

    fn open_loop(
        &mut self,
        indent: usize,
        text: String,
        line: usize,
        replay: Option<Replay>,
    ) -> EngineResult<()> {
        self.push_line(indent, text, line)?;
        let start = self.lines.len() - 1;
        self.spans.push((start, start));
        self.jumps.push(Jump {
            indent,
            span: self.spans.len() - 1,
            replay,
        });
        Ok(())
    }

    /// End every open loop whose header sits at or right of `indent`
    fn close_loops(&mut self, indent: usize) -> EngineResult<()> {
        while self.jumps.last().map_or(false, |j| j.indent >= indent) {
            let Some(jump) = self.jumps.pop() else {
                break;
            };
            if let Some(replay) = &jump.replay {
                self.replay(replay, jump.indent + self.width)?;
                self.close_loops(jump.indent + 1)?;
            }
            self.spans[jump.span].1 = self.lines.len() - 1;
        }
        Ok(())
    }

    /// Re-run the helpers of a suspending `while` condition
    fn replay(&mut self, replay: &Replay, indent: usize) -> EngineResult<()> {
        let mut unpacker = self.unpacker(indent, replay.line);
        unpacker.expression(&replay.condition)?;
        self.emit_plan(indent, adjust::simple(unpacker.finish(None)), replay.line)
    }

    fn emit_plan(&mut self, indent: usize, plan: Vec<PlannedLine>, line: usize) -> EngineResult<()> {
        for planned in plan {
            let at = indent + planned.depth * self.width;
            if planned.opens_loop {
                self.open_loop(at, planned.text, line, None)?;
            } else {
                self.push_line(at, planned.text, line)?;
            }
        }
        Ok(())
    }

    fn verbatim(&mut self, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        match strip_annotation(chunks) {
            Some(chunks) => self.push_line(indent, scanner::render(&chunks), line),
            None => Ok(()),
        }
    }

    /* ===================== Statements ===================== */

    fn statement(&mut self, level: usize, chunks: Vec<Chunk>, line: usize) -> EngineResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        if let Some(capture) = &self.capture {
            if level > capture.level {
                let indent = (level + capture.extra) * self.width;
                return self.verbatim(indent, &chunks, line);
            }
            self.end_capture()?;
        }

        if chunks[0].is_op("@") {
            self.decorators.push((chunks[1..].to_vec(), line));
            return Ok(());
        }

        let keyword = scanner::leading_keyword(&chunks).map(str::to_string);
        let keyword = keyword.as_deref();
        let extra = self.shift_for(level, keyword);
        let indent = (level + extra) * self.width;

        let followed_by = |word: &str| chunks.get(1).map_or(false, |c| c.is_name(word));
        if matches!(keyword, Some("def" | "class")) || (keyword == Some("async") && followed_by("def")) {
            return self.definition(level, extra, indent, &chunks, line);
        }
        self.flush_decorators(indent)?;

        match keyword {
            Some("if") => self.conditional(indent, &chunks, line),
            Some("elif") => self.elif(level, indent, &chunks, line),
            Some("while") => self.while_loop(indent, &chunks, line),
            Some("for") => self.for_loop(indent, &chunks[1..], line),
            Some("async") if followed_by("for") => self.for_loop(indent, &chunks[2..], line),
            Some("except") => self.except(level, indent, &chunks, line),
            Some("return") => self.terminate(indent, &chunks[1..], line),
            Some("yield") => {
                let mut unpacker = self.unpacker(indent, line);
                unpacker.suspend(&chunks[1..])?;
                self.emit_plan(indent, adjust::simple(unpacker.finish(None)), line)
            }
            Some("nonlocal" | "global") => Ok(()),
            Some("continue") => self.continue_loop(indent, line),
            Some("raise" | "del" | "assert") => self.keyword_statement(indent, &chunks, line),
            Some("match" | "case") if !scanner::starts_block(&chunks) => {
                self.simple(indent, &chunks, line)
            }
            Some(
                word @ ("else" | "try" | "finally" | "pass" | "break" | "import" | "from" | "with"
                | "async" | "match" | "case"),
            ) => {
                if suspends(&chunks) {
                    return Err(EngineError::unsupported(line, format!("yield inside `{}`", word)));
                }
                self.verbatim(indent, &chunks, line)
            }
            _ => self.simple(indent, &chunks, line),
        }
    }

    fn conditional(&mut self, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        let cond = header_body(chunks, 1);
        if !suspends(cond) {
            return self.verbatim(indent, chunks, line);
        }
        let mut unpacker = self.unpacker(indent, line);
        let cond = unpacker.expression(cond)?;
        let plan = adjust::simple(unpacker.finish(Some(format!("if {}:", cond))));
        self.emit_plan(indent, plan, line)
    }

    fn elif(&mut self, level: usize, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        let cond = header_body(chunks, 1);
        if !suspends(cond) {
            return self.verbatim(indent, chunks, line);
        }
        let mut unpacker = self.unpacker(indent + self.width, line);
        let cond = unpacker.expression(cond)?;
        let plan = adjust::elif_adjust(unpacker.finish(Some(format!("if {}:", cond))));
        self.emit_plan(indent, plan, line)?;
        self.shifts.push(ShiftScope::elif(level));
        Ok(())
    }

    fn while_loop(&mut self, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        let cond = header_body(chunks, 1);
        if !suspends(cond) {
            return self.open_loop(indent, scanner::render(chunks), line, None);
        }
        let mut unpacker = self.unpacker(indent, line);
        let rewritten = unpacker.expression(cond)?;
        let (helpers, header) =
            adjust::while_adjust(unpacker.finish(Some(format!("while {}:", rewritten))));
        self.emit_plan(indent, helpers, line)?;
        let replay = Replay {
            condition: cond.to_vec(),
            line,
        };
        self.open_loop(indent, header, line, Some(replay))
    }

    /// `rest` starts after the `for` keyword
    fn for_loop(&mut self, indent: usize, rest: &[Chunk], line: usize) -> EngineResult<()> {
        let body = header_body(rest, 0);
        let at = body
            .iter()
            .position(|c| c.is_name("in"))
            .ok_or_else(|| EngineError::parse(line, "`for` without `in`"))?;
        let (target, iterable) = (&body[..at], &body[at + 1..]);
        if suspends(target) {
            return Err(EngineError::unsupported(line, "yield inside a loop target"));
        }

        let mut unpacker = self.unpacker(indent, line);
        let iterable = unpacker.expression(iterable)?;
        let plan = adjust::simple(unpacker.finish(Some(format!(".{} = iter({})", indent, iterable))));
        self.emit_plan(indent, plan, line)?;
        let header = format!("for {} in .{}:", scanner::render(target), indent);
        self.open_loop(indent, header, line, None)
    }

    fn except(&mut self, level: usize, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        let clause = header_body(chunks, 1);
        if !suspends(clause) {
            return self.verbatim(indent, chunks, line);
        }
        let (filter, binding) = match clause.iter().position(|c| c.is_name("as")) {
            Some(at) => (&clause[..at], Some(scanner::render(&clause[at + 1..]))),
            None => (clause, None),
        };

        let mut unpacker = self.unpacker(indent + self.width, line);
        let filter = unpacker.expression(filter)?;
        let header = match binding {
            Some(name) => format!("except {} as {}:", filter, name),
            None => format!("except {}:", filter),
        };
        let plan = adjust::except_adjust(unpacker.finish_stacked(header));
        self.emit_plan(indent, plan, line)?;
        self.shifts.push(ShiftScope::except(level));
        Ok(())
    }

    fn terminate(&mut self, indent: usize, rest: &[Chunk], line: usize) -> EngineResult<()> {
        if rest.is_empty() {
            return self.push_line(indent, "return Termination()".to_string(), line);
        }
        let mut unpacker = self.unpacker(indent, line);
        let mut value = unpacker.expression(rest)?;
        if rest.iter().any(|c| c.is_kind(TokKind::Comma)) {
            value = format!("({})", value);
        }
        let plan = adjust::simple(unpacker.finish(Some(format!("return Termination({})", value))));
        self.emit_plan(indent, plan, line)
    }

    fn continue_loop(&mut self, indent: usize, line: usize) -> EngineResult<()> {
        self.close_loops(indent)?;
        let replay = self.jumps.last().and_then(|j| j.replay.clone());
        if let Some(replay) = replay {
            self.replay(&replay, indent)?;
        }
        self.push_line(indent, "continue".to_string(), line)
    }

    /// `raise`, `del` and `assert` with suspending operands
    fn keyword_statement(&mut self, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        let rest = &chunks[1..];
        if !suspends(rest) {
            return self.verbatim(indent, chunks, line);
        }
        let keyword = scanner::leading_keyword(chunks).unwrap_or_default().to_string();
        let mut unpacker = self.unpacker(indent, line);
        let text = if keyword == "raise" {
            let parts = scanner::split_top(rest, |c| c.is_name("from"));
            let last = parts.iter().rposition(|p| suspends(p)).unwrap_or(0);
            let mut rendered = Vec::with_capacity(parts.len());
            for (i, part) in parts.iter().enumerate() {
                rendered.push(unpacker.single(part, i < last)?);
            }
            format!("raise {}", rendered.join(" from "))
        } else {
            format!("{} {}", keyword, unpacker.expression(rest)?)
        };
        self.emit_plan(indent, adjust::simple(unpacker.finish(Some(text))), line)
    }

    /// Expression statements and assignments
    fn simple(&mut self, indent: usize, chunks: &[Chunk], line: usize) -> EngineResult<()> {
        let Some(chunks) = strip_annotation(chunks) else {
            return Ok(());
        };
        if !suspends(&chunks) {
            return self.push_line(indent, scanner::render(&chunks), line);
        }

        let mut unpacker = self.unpacker(indent, line);
        let scope = before_lambda(&chunks);
        let assigns: Vec<usize> = scope
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_op("="))
            .map(|(i, _)| i)
            .collect();
        let augmented = scope.iter().position(|c| {
            c.token().map_or(false, |t| {
                t.kind == TokKind::Op && scanner::AUGMENTED_OPERATORS.contains(&t.text.as_str())
            })
        });

        let text = if let Some(&last) = assigns.last() {
            // the value runs before the targets
            let value = unpacker.expression(&chunks[last + 1..])?;
            let mut targets = Vec::with_capacity(assigns.len());
            let mut start = 0;
            for at in assigns {
                targets.push(unpacker.expression(&chunks[start..at])?);
                start = at + 1;
            }
            format!("{} = {}", targets.join(" = "), value)
        } else if let Some(at) = augmented {
            let op = chunks[at].token().map(|t| t.text.clone()).unwrap_or_default();
            let target = unpacker.expression(&chunks[..at])?;
            let value = unpacker.expression(&chunks[at + 1..])?;
            format!("{} {} {}", target, op, value)
        } else {
            unpacker.expression(&chunks)?
        };
        self.emit_plan(indent, adjust::simple(unpacker.finish(Some(text))), line)
    }

    /* ===================== Definitions ===================== */

    fn definition(
        &mut self,
        level: usize,
        extra: usize,
        indent: usize,
        chunks: &[Chunk],
        line: usize,
    ) -> EngineResult<()> {
        let name = chunks
            .iter()
            .skip_while(|c| !c.is_name("def") && !c.is_name("class"))
            .nth(1)
            .and_then(Chunk::identifier)
            .ok_or_else(|| EngineError::parse(line, "definition without a name"))?
            .to_string();

        let decorators = std::mem::take(&mut self.decorators);
        let mut apply = 0;
        if decorators.iter().any(|(d, _)| suspends(d)) {
            for (decorator, at) in &decorators {
                let mut unpacker = self.unpacker(indent, *at);
                let value = unpacker.expression(decorator)?;
                self.emit_plan(indent, adjust::decorator_push(unpacker.finish(Some(value))), *at)?;
            }
            apply = decorators.len();
        } else {
            for (decorator, at) in &decorators {
                self.push_line(indent, format!("@{}", scanner::render(decorator)), *at)?;
            }
        }

        if suspends(header_body(chunks, 0)) {
            let mut unpacker = self.unpacker(indent, line);
            let header = unpack_defaults(&mut unpacker, chunks)?;
            self.emit_plan(indent, adjust::simple(unpacker.finish(Some(header))), line)?;
        } else {
            self.push_line(indent, scanner::render(chunks), line)?;
        }

        self.capture = Some(Capture {
            level,
            extra,
            name,
            apply,
            indent,
            line,
        });
        Ok(())
    }

    fn end_capture(&mut self) -> EngineResult<()> {
        if let Some(capture) = self.capture.take() {
            for planned in adjust::decorator_apply(&capture.name, capture.apply) {
                self.push_line(capture.indent, planned.text, capture.line)?;
            }
        }
        Ok(())
    }

    /// Decorators not followed by a definition stay as written
    fn flush_decorators(&mut self, indent: usize) -> EngineResult<()> {
        for (decorator, at) in std::mem::take(&mut self.decorators) {
            self.push_line(indent, format!("@{}", scanner::render(&decorator)), at)?;
        }
        Ok(())
    }
}
