//! Expression unpacker
//!
//! Lifts every suspension out of an expression. Suspensions become helper
//! lines ending in a statement-level `return`; the sent value, and any value
//! computed ahead of time to keep left-to-right evaluation order, is pushed
//! onto `.args` and a placeholder takes its spot in the expression. When the
//! expression is finished the placeholders are replaced by pops: helper lines
//! consume their own pushes from the top of the stack, the statement's final
//! remainder consumes from the bottom in push order.

use super::scanner::{self, Chunk, TokKind, Token};
use super::PlannedLine;
use crate::errors::{EngineError, EngineResult};

/// Placeholder for one value waiting on `.args`
pub const HOLE: char = '\u{E000}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpacked {
    pub helpers: Vec<PlannedLine>,
    /// The rewritten statement, placeholders resolved in push order
    pub remainder: Option<String>,
}

/// Bracket context an element sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    Paren,
    Bracket,
    Brace,
}

impl Context {
    fn of(open: &Token) -> Self {
        match open.text.as_str() {
            "[" => Context::Bracket,
            "{" => Context::Brace,
            _ => Context::Paren,
        }
    }
}

/// Whether any suspension occurs in the chunks
pub fn suspends(chunks: &[Chunk]) -> bool {
    chunks.iter().any(|c| c.mentions("yield"))
}

/// Whether evaluating the chunks could have side effects
fn impure(chunks: &[Chunk]) -> bool {
    chunks.iter().enumerate().any(|(i, chunk)| match chunk {
        Chunk::Group { open, items, .. } => {
            (open.text == "(" && i > 0 && chunks[i - 1].ends_operand()) || impure(items)
        }
        Chunk::Tok(tok) => tok.text == ":=" || tok.text == "await",
    })
}

/// Split at commas, keeping lambda parameter lists and greedy `yield` operands whole
fn split_elements(chunks: &[Chunk]) -> Vec<&[Chunk]> {
    let mut elements = Vec::new();
    let mut start = 0;
    let mut lambdas = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_name("lambda") {
            lambdas += 1;
        } else if chunk.is_kind(TokKind::Colon) && lambdas > 0 {
            lambdas -= 1;
        } else if chunk.is_kind(TokKind::Comma) && lambdas == 0 {
            let current = &chunks[start..i];
            let greedy = current.first().map_or(false, |c| c.is_name("yield"));
            if greedy && !chunks.get(i + 1).map_or(false, |c| c.is_name("yield")) {
                continue;
            }
            elements.push(current);
            start = i + 1;
        }
    }
    if start < chunks.len() {
        elements.push(&chunks[start..]);
    }
    elements
}

/// The part of an element before a top-level `lambda`
fn lambda_free(chunks: &[Chunk]) -> &[Chunk] {
    match chunks.iter().skip(1).position(|c| c.is_name("lambda")) {
        Some(at) => &chunks[..at + 1],
        None => chunks,
    }
}

fn ternary(scope: &[Chunk]) -> Option<(usize, usize)> {
    let at_if = scope.iter().skip(1).position(|c| c.is_name("if"))? + 1;
    let at_else = scope[at_if..].iter().position(|c| c.is_name("else"))? + at_if;
    Some((at_if, at_else))
}

/// Operands of a binary chain with the operator text preceding each
fn split_operands(chunks: &[Chunk]) -> Vec<(Option<String>, &[Chunk])> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut operator: Option<String> = None;
    let mut i = 0;
    while i < chunks.len() {
        let chunk = &chunks[i];
        let keyword = chunk.is_name("in")
            || chunk.is_name("is")
            || (chunk.is_name("not") && chunks.get(i + 1).map_or(false, |c| c.is_name("in")));
        if i > start && chunks[i - 1].ends_operand() && (chunk.is_binary_operator() || keyword) {
            let mut text = chunk.token().map(|t| t.text.clone()).unwrap_or_default();
            let mut next = i + 1;
            if chunk.is_name("not") || (chunk.is_name("is") && chunks.get(next).map_or(false, |c| c.is_name("not"))) {
                if let Some(tok) = chunks.get(next).and_then(Chunk::token) {
                    text = format!("{} {}", text, tok.text);
                }
                next += 1;
            }
            pieces.push((operator.take(), &chunks[start..i]));
            operator = Some(text);
            start = next;
            i = next;
            continue;
        }
        i += 1;
    }
    pieces.push((operator, &chunks[start..]));
    pieces
}

/// Replace placeholders with pops from the top of the stack
fn fill_stack(text: &str) -> String {
    let total = text.chars().filter(|c| *c == HOLE).count();
    let mut seen = 0;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c != HOLE {
            out.push(c);
            continue;
        }
        let from_top = total - seen;
        seen += 1;
        if from_top == 1 {
            out.push_str(".args.pop()");
        } else {
            out.push_str(&format!(".args.pop(-{})", from_top));
        }
    }
    out
}

/// Replace placeholders with pops from the bottom of the stack
fn fill_queue(text: &str) -> String {
    text.replace(HOLE, ".args.pop(0)")
}

pub struct Unpacker {
    indent: usize,
    width: usize,
    depth: usize,
    line: usize,
    helpers: Vec<PlannedLine>,
}

impl Unpacker {
    /// `indent` is where the helper lines will be emitted
    pub fn new(indent: usize, width: usize, line: usize) -> Self {
        Self {
            indent,
            width,
            depth: 0,
            line,
            helpers: Vec::new(),
        }
    }

    /// Unpack an expression list; the result may contain placeholders
    pub fn expression(&mut self, chunks: &[Chunk]) -> EngineResult<String> {
        self.list(chunks, Context::Top)
    }

    /// Unpack a single expression; with `hoist` its value is computed now
    /// if it has side effects
    pub fn single(&mut self, chunks: &[Chunk], hoist: bool) -> EngineResult<String> {
        self.element(chunks, Context::Paren, hoist)
    }

    /// A statement-level `yield ...`
    pub fn suspend(&mut self, rest: &[Chunk]) -> EngineResult<()> {
        if rest.first().map_or(false, |c| c.is_name("from")) {
            self.delegate(&rest[1..])?;
            return Ok(());
        }
        let value = if rest.is_empty() {
            "None".to_string()
        } else {
            self.list(rest, Context::Top)?
        };
        self.emit(format!("return {}", value));
        Ok(())
    }

    pub fn finish(self, remainder: Option<String>) -> Unpacked {
        Unpacked {
            helpers: self.helpers,
            remainder: remainder.map(|r| fill_queue(&r)),
        }
    }

    /// Like `finish`, but the remainder takes the most recent pushes
    pub fn finish_stacked(self, remainder: String) -> Unpacked {
        Unpacked {
            helpers: self.helpers,
            remainder: Some(fill_stack(&remainder)),
        }
    }

    fn absolute(&self) -> usize {
        self.indent + self.depth * self.width
    }

    fn emit(&mut self, text: String) {
        self.helpers.push(PlannedLine::at(self.depth, fill_stack(&text)));
    }

    fn emit_loop(&mut self, text: String) {
        self.helpers.push(PlannedLine {
            depth: self.depth,
            text,
            opens_loop: true,
        });
    }

    fn lift(&mut self, value: String) -> String {
        self.emit(format!(".args += [{}]", value));
        HOLE.to_string()
    }

    /// Expand `yield from E`; returns the tracked slot indent
    fn delegate(&mut self, source: &[Chunk]) -> EngineResult<usize> {
        if source.is_empty() {
            return Err(EngineError::parse(self.line, "`yield from` without an operand"));
        }
        let iterable = self.list(source, Context::Top)?;
        let indent = self.absolute();
        self.emit(format!(".{} = iter({})", indent, iterable));
        self.emit_loop(format!("for .yielded in .{}:", indent));
        self.depth += 1;
        self.emit("return .yielded".to_string());
        self.depth -= 1;
        Ok(indent)
    }

    fn list(&mut self, chunks: &[Chunk], ctx: Context) -> EngineResult<String> {
        if !suspends(chunks) {
            return Ok(scanner::render(chunks));
        }
        let elements = split_elements(chunks);
        let last = elements.iter().rposition(|e| suspends(e)).unwrap_or(0);

        let mut parts = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            parts.push(self.element(element, ctx, i < last)?);
        }
        let mut out = parts.join(", ");
        if chunks.last().map_or(false, |c| c.is_kind(TokKind::Comma)) {
            out.push(',');
        }
        Ok(out)
    }

    fn element(&mut self, chunks: &[Chunk], ctx: Context, hoist: bool) -> EngineResult<String> {
        let Some(first) = chunks.first() else {
            return Ok(String::new());
        };

        if first.is_op("*") || first.is_op("**") {
            let prefix = first.token().map(|t| t.text.clone()).unwrap_or_default();
            let inner = self.element(&chunks[1..], ctx, hoist)?;
            return Ok(format!("{}{}", prefix, inner));
        }
        if chunks.len() > 2 && chunks[1].is_op("=") {
            if let Some(name) = first.identifier() {
                let name = name.to_string();
                let inner = self.element(&chunks[2..], Context::Paren, hoist)?;
                return Ok(format!("{}={}", name, inner));
            }
        }

        if !suspends(chunks) {
            let text = scanner::render(chunks);
            return Ok(if hoist && impure(chunks) { self.lift(text) } else { text });
        }

        if first.is_name("yield") {
            return self.yield_value(&chunks[1..]);
        }
        if first.is_name("lambda") {
            return self.lambda(chunks);
        }
        if chunks.iter().any(|c| c.is_name("for")) {
            return Err(EngineError::unsupported(self.line, "yield inside a comprehension"));
        }

        let scope = lambda_free(chunks);
        if matches!(ctx, Context::Bracket | Context::Brace) && scope.iter().any(|c| c.is_kind(TokKind::Colon)) {
            return self.colon_parts(chunks, ctx, hoist);
        }
        if let Some((at_if, at_else)) = ternary(scope) {
            return self.ternary(chunks, at_if, at_else);
        }
        if chunks.len() > 2 && chunks[1].is_op(":=") {
            if let Some(name) = first.identifier() {
                let name = name.to_string();
                let value = self.element(&chunks[2..], Context::Paren, false)?;
                return Ok(self.lift(format!("({} := {})", name, value)));
            }
        }
        for op in ["or", "and"] {
            if scope.iter().any(|c| c.is_name(op)) {
                return self.boolean(chunks, op, scope.len());
            }
        }
        self.chain(chunks)
    }

    /// Dict items and slices
    fn colon_parts(&mut self, chunks: &[Chunk], ctx: Context, hoist: bool) -> EngineResult<String> {
        let (parts, sep) = if ctx == Context::Brace {
            let at = chunks.iter().position(|c| c.is_kind(TokKind::Colon)).unwrap_or(chunks.len());
            let parts: Vec<&[Chunk]> = if at < chunks.len() {
                vec![&chunks[..at], &chunks[at + 1..]]
            } else {
                vec![chunks]
            };
            (parts, ": ")
        } else {
            (scanner::split_top(chunks, |c| c.is_kind(TokKind::Colon)), ":")
        };

        let last = parts.iter().rposition(|p| suspends(p)).unwrap_or(0);
        let mut out = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            out.push(self.element(part, Context::Paren, hoist || i < last)?);
        }
        Ok(out.join(sep))
    }

    fn yield_value(&mut self, rest: &[Chunk]) -> EngineResult<String> {
        if rest.first().map_or(false, |c| c.is_name("from")) {
            let indent = self.delegate(&rest[1..])?;
            return Ok(self.lift(format!("returned(.{})", indent)));
        }
        let value = if rest.is_empty() {
            "None".to_string()
        } else {
            self.list(rest, Context::Top)?
        };
        self.emit(format!("return {}", value));
        Ok(self.lift(".send".to_string()))
    }

    fn ternary(&mut self, chunks: &[Chunk], at_if: usize, at_else: usize) -> EngineResult<String> {
        let cond = self.element(&chunks[at_if + 1..at_else], Context::Paren, false)?;
        self.emit(format!("if {}:", cond));

        self.depth += 1;
        let then = self.element(&chunks[..at_if], Context::Paren, false)?;
        self.lift(then);
        self.depth -= 1;

        self.emit("else:".to_string());

        self.depth += 1;
        let orelse = self.element(&chunks[at_else + 1..], Context::Paren, false)?;
        self.lift(orelse);
        self.depth -= 1;

        Ok(HOLE.to_string())
    }

    /// `A and B` / `A or B`; operands past the first only run when reached
    fn boolean(&mut self, chunks: &[Chunk], op: &str, scope_len: usize) -> EngineResult<String> {
        // a trailing lambda stays inside the last operand
        let mut operands: Vec<&[Chunk]> = Vec::new();
        let mut start = 0;
        for (i, chunk) in chunks[..scope_len].iter().enumerate() {
            if chunk.is_name(op) {
                operands.push(&chunks[start..i]);
                start = i + 1;
            }
        }
        operands.push(&chunks[start..]);

        if !operands.iter().skip(1).any(|o| suspends(o)) {
            let mut parts = Vec::with_capacity(operands.len());
            for (i, operand) in operands.iter().enumerate() {
                parts.push(if i == 0 {
                    self.element(operand, Context::Paren, false)?
                } else {
                    scanner::render(operand)
                });
            }
            return Ok(parts.join(&format!(" {} ", op)));
        }

        let first = self.element(operands[0], Context::Paren, false)?;
        self.lift(first);
        let test = if op == "and" { "if .args[-1]:" } else { "if not .args[-1]:" };
        for operand in &operands[1..] {
            self.emit(test.to_string());
            self.depth += 1;
            self.emit(".args.pop()".to_string());
            let value = self.element(operand, Context::Paren, false)?;
            self.lift(value);
            self.depth -= 1;
        }
        Ok(HOLE.to_string())
    }

    fn lambda(&mut self, chunks: &[Chunk]) -> EngineResult<String> {
        let colon = chunks
            .iter()
            .position(|c| c.is_kind(TokKind::Colon))
            .ok_or_else(|| EngineError::parse(self.line, "lambda without `:`"))?;
        let body = &chunks[colon + 1..];
        if suspends(body) {
            return Err(EngineError::unsupported(self.line, "yield inside a lambda body"));
        }

        let mut params = Vec::new();
        for param in split_elements(&chunks[1..colon]) {
            match param.iter().position(|c| c.is_op("=")) {
                Some(eq) if suspends(&param[eq + 1..]) => {
                    let default = self.element(&param[eq + 1..], Context::Paren, false)?;
                    params.push(format!("{}={}", scanner::render(&param[..eq]), default));
                }
                _ => params.push(scanner::render(param)),
            }
        }
        if params.is_empty() {
            Ok(format!("lambda: {}", scanner::render(body)))
        } else {
            Ok(format!("lambda {}: {}", params.join(", "), scanner::render(body)))
        }
    }

    /// Operands joined by binary operators
    fn chain(&mut self, chunks: &[Chunk]) -> EngineResult<String> {
        let pieces = split_operands(chunks);
        let last = pieces.iter().rposition(|(_, p)| suspends(p)).unwrap_or(0);

        let mut out = String::new();
        for (i, (operator, operand)) in pieces.iter().enumerate() {
            if let Some(operator) = operator {
                out.push(' ');
                out.push_str(operator);
                out.push(' ');
            }
            let text = if suspends(operand) {
                self.operand(operand)?
            } else {
                let text = scanner::render(operand);
                if i < last && impure(operand) {
                    self.lift(text)
                } else {
                    text
                }
            };
            out.push_str(&text);
        }
        Ok(out)
    }

    /// One operand: prefix operators, an atom and its trailers
    fn operand(&mut self, chunks: &[Chunk]) -> EngineResult<String> {
        let target = chunks
            .iter()
            .rposition(|c| c.mentions("yield"))
            .unwrap_or(0);
        let primary_start = chunks.first().map_or(false, |c| c.ends_operand());

        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == target
                && i > 0
                && primary_start
                && chunks[i - 1].is_group('(')
                && impure(&chunks[..i])
            {
                // the call before a suspending trailer runs first
                out = self.lift(out);
            }
            if chunk.space() && !out.is_empty() {
                out.push(' ');
            }
            match chunk {
                Chunk::Tok(tok) if tok.is_fstring() && chunk.mentions("yield") => {
                    let text = self.fstring(tok)?;
                    out.push_str(&text);
                }
                Chunk::Tok(tok) => out.push_str(&tok.text),
                Chunk::Group { open, items, close } => {
                    let inner = if suspends(items) {
                        self.list(items, Context::of(open))?
                    } else {
                        scanner::render(items)
                    };
                    out.push_str(&open.text);
                    out.push_str(&inner);
                    out.push_str(&close.text);
                }
            }
        }
        Ok(out)
    }

    /// Rewrite the interpolations of an f-string literal in place
    fn fstring(&mut self, tok: &Token) -> EngineResult<String> {
        let chars: Vec<char> = tok.text.chars().collect();
        let quote_at = chars
            .iter()
            .position(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| EngineError::parse(self.line, "malformed string literal"))?;
        let quote = chars[quote_at];
        let triple = chars.get(quote_at + 1) == Some(&quote) && chars.get(quote_at + 2) == Some(&quote);
        let quote_len = if triple { 3 } else { 1 };
        let body_start = quote_at + quote_len;
        let body_end = chars.len().saturating_sub(quote_len).max(body_start);

        let mut out: String = chars[..body_start].iter().collect();
        let mut i = body_start;
        while i < body_end {
            let c = chars[i];
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(next) = chars.get(i + 1) {
                        out.push(*next);
                    }
                    i += 2;
                }
                '{' if chars.get(i + 1) == Some(&'{') => {
                    out.push_str("{{");
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    out.push_str("}}");
                    i += 2;
                }
                '{' => {
                    let end = interpolation_end(&chars, i + 1, body_end)
                        .ok_or_else(|| EngineError::parse(self.line, "unterminated f-string interpolation"))?;
                    let inner: String = chars[i + 1..end].iter().collect();
                    let split = interpolation_tail(&inner);
                    let (expr, tail) = inner.split_at(split);
                    let rewritten = if expr.contains("yield") {
                        let chunks = scanner::chunks(expr).map_err(|m| EngineError::parse(self.line, m))?;
                        self.list(&chunks, Context::Top)?
                    } else {
                        expr.to_string()
                    };
                    out.push('{');
                    out.push_str(&rewritten);
                    out.push_str(tail);
                    out.push('}');
                    i = end + 1;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }
        out.extend(chars[body_end..].iter());
        Ok(out)
    }
}

/// Index of the `}` closing an interpolation that starts at `start`
fn interpolation_end(chars: &[char], start: usize, limit: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    while i < limit {
        let c = chars[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth == 0 => return Some(i),
                '}' => depth -= 1,
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Byte offset of a top-level `!conversion` or `:spec` in an interpolation
fn interpolation_tail(inner: &str) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (at, c) in inner.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                '!' if depth == 0 && !inner[at + 1..].starts_with('=') => return at,
                ':' if depth == 0 && !inner[at + 1..].starts_with('=') && prev != '!' => return at,
                _ => {}
            },
        }
        prev = c;
    }
    inner.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpack(text: &str) -> (Vec<String>, String) {
        let chunks = scanner::chunks(text).unwrap();
        let mut unpacker = Unpacker::new(4, 4, 1);
        let rest = unpacker.expression(&chunks).unwrap();
        let unpacked = unpacker.finish(Some(rest));
        let helpers = unpacked
            .helpers
            .iter()
            .map(|h| format!("{}{}", "    ".repeat(h.depth), h.text))
            .collect();
        (helpers, unpacked.remainder.unwrap())
    }

    #[test]
    fn test_plain_expression_is_untouched() {
        let (helpers, rest) = unpack("f(a, b[1]) + 2");
        assert!(helpers.is_empty());
        assert_eq!(rest, "f(a, b[1]) + 2");
    }

    #[test]
    fn test_nested_yield_is_lifted() {
        let (helpers, rest) = unpack("1 + (yield 2)");
        assert_eq!(helpers, vec!["return 2", ".args += [.send]"]);
        assert_eq!(rest, "1 + (.args.pop(0))");
    }

    #[test]
    fn test_earlier_calls_run_before_the_suspension() {
        let (helpers, rest) = unpack("f(g(), (yield x))");
        assert_eq!(
            helpers,
            vec![".args += [g()]", "return x", ".args += [.send]"]
        );
        assert_eq!(rest, "f(.args.pop(0), (.args.pop(0)))");
    }

    #[test]
    fn test_ternary_pushes_the_chosen_arm() {
        let (helpers, rest) = unpack("(yield 1) if c else 0");
        assert_eq!(
            helpers,
            vec![
                "if c:",
                "    return 1",
                "    .args += [.send]",
                "    .args += [(.args.pop())]",
                "else:",
                "    .args += [0]",
            ]
        );
        assert_eq!(rest, ".args.pop(0)");
    }

    #[test]
    fn test_short_circuit_guards_the_right_operand() {
        let (helpers, rest) = unpack("a and (yield b)");
        assert_eq!(
            helpers,
            vec![
                ".args += [a]",
                "if .args[-1]:",
                "    .args.pop()",
                "    return b",
                "    .args += [.send]",
                "    .args += [(.args.pop())]",
            ]
        );
        assert_eq!(rest, ".args.pop(0)");
    }

    #[test]
    fn test_walrus_binds_the_sent_value() {
        let (helpers, rest) = unpack("(n := (yield 5))");
        assert_eq!(
            helpers,
            vec!["return 5", ".args += [.send]", ".args += [(n := (.args.pop()))]"]
        );
        assert_eq!(rest, "(.args.pop(0))");
    }

    #[test]
    fn test_fstring_interpolation_is_rewritten_in_place() {
        let (helpers, rest) = unpack("f'got {(yield 1)!r} done'");
        assert_eq!(helpers, vec!["return 1", ".args += [.send]"]);
        assert_eq!(rest, "f'got {(.args.pop(0))!r} done'");
    }

    #[test]
    fn test_delegation_in_expression_position() {
        let (helpers, rest) = unpack("(yield from inner)");
        assert_eq!(
            helpers,
            vec![
                ".4 = iter(inner)",
                "for .yielded in .4:",
                "    return .yielded",
                ".args += [returned(.4)]",
            ]
        );
        assert_eq!(rest, "(.args.pop(0))");
    }

    #[test]
    fn test_yield_in_comprehension_is_unsupported() {
        let chunks = scanner::chunks("[(yield x) for x in y]").unwrap();
        let mut unpacker = Unpacker::new(4, 4, 3);
        let err = unpacker.expression(&chunks).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedConstruct { line: 3, .. }));
    }

    #[test]
    fn test_fill_stack_counts_from_the_top() {
        let text = format!("f({}, {}, {})", HOLE, HOLE, HOLE);
        assert_eq!(
            fill_stack(&text),
            "f(.args.pop(-3), .args.pop(-2), .args.pop())"
        );
    }
}
