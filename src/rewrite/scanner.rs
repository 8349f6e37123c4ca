//! Token scanner
//!
//! Walks function source one character at a time, joining physical lines into
//! logical lines: bracket depth and backslash continuations join lines,
//! comments are dropped, and whitespace outside string literals collapses to
//! single spaces. Logical lines are then tokenized and grouped by brackets for
//! the unpacker and normalizer.

use crate::errors::{EngineError, EngineResult};

/// Keywords that open a compound statement header
pub const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "try", "except", "finally", "with", "def", "class",
    "async", "match", "case",
];

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Longest first so greedy matching picks `**=` over `**` over `*`
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "**", "//", "==", "!=", "<=", ">=", "<<", ">>", "->", ":=", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&", "|", "^",
    "~", "<", ">", "=", ".", "!",
];

/// Binary operators that separate operands inside one expression
const BINARY_OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "<<", ">>", "+", "-", "*", "/", "%", "@", "&", "|", "^",
    "<", ">",
];

pub const AUGMENTED_OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

pub fn inverse_bracket(c: char) -> Option<char> {
    match c {
        '(' => Some(')'),
        ')' => Some('('),
        '[' => Some(']'),
        ']' => Some('['),
        '{' => Some('}'),
        '}' => Some('{'),
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_string_prefix(prefix: &[char]) -> bool {
    !prefix.is_empty()
        && prefix.len() <= 2
        && prefix.iter().all(|c| "rRbBuUfF".contains(*c))
}

/* ===================== Character Scanner ===================== */

/// Bracket depth, tracked per bracket kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Depth {
    pub paren: usize,
    pub bracket: usize,
    pub brace: usize,
}

impl Depth {
    pub fn total(&self) -> usize {
        self.paren + self.bracket + self.brace
    }

    /// Track one character; false on a closer with no opener
    pub fn update(&mut self, c: char) -> bool {
        let slot = match c {
            '(' | ')' => &mut self.paren,
            '[' | ']' => &mut self.bracket,
            '{' | '}' => &mut self.brace,
            _ => return true,
        };
        if matches!(c, '(' | '[' | '{') {
            *slot += 1;
            true
        } else if *slot == 0 {
            false
        } else {
            *slot -= 1;
            true
        }
    }
}

/// One logical line: indentation column, canonical text, first physical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub column: usize,
    pub text: String,
    pub line: usize,
}

/// The outer function's definition, as found by `skip_source_definition`
#[derive(Debug, Clone, PartialEq)]
pub struct DefHeader {
    pub decorators: Vec<String>,
    pub header: String,
    pub column: usize,
    pub line: usize,
    /// Statements that follow the header colon on the same line
    pub inline_body: Vec<Chunk>,
}

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: Depth,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            depth: Depth::default(),
        }
    }

    /// Current physical line (1-based)
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    pub fn update_depth(&mut self, c: char) -> EngineResult<()> {
        if self.depth.update(c) {
            Ok(())
        } else {
            Err(EngineError::parse(self.line, format!("unmatched `{}`", c)))
        }
    }

    /// Consume `\` + newline; true if one was there
    pub fn skip_line_continuation(&mut self) -> bool {
        if self.peek() != Some('\\') {
            return false;
        }
        let newline_at = match (self.peek_at(1), self.peek_at(2)) {
            (Some('\n'), _) => 1,
            (Some('\r'), Some('\n')) => 2,
            _ => return false,
        };
        for _ in 0..=newline_at {
            self.bump();
        }
        true
    }

    /// Consume a run of insignificant whitespace; true if any was consumed.
    /// Newlines only count as whitespace inside brackets.
    pub fn singly_space(&mut self) -> bool {
        let mut consumed = false;
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\x0c') => {
                    self.bump();
                }
                Some('\n') if self.depth.total() > 0 => {
                    self.bump();
                }
                Some('\\') if self.skip_line_continuation() => {}
                _ => return consumed,
            }
            consumed = true;
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    /// Collect a string literal starting at its opening quote, verbatim
    pub fn collect_string(&mut self) -> EngineResult<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(EngineError::parse(self.line, "expected a string literal")),
        };
        if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
            return self.collect_multiline_string(quote);
        }

        let start = self.line;
        let mut out = String::new();
        self.bump();
        out.push(quote);
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(EngineError::parse(start, "unterminated string literal"))
                }
                Some('\\') => {
                    out.push('\\');
                    match self.bump() {
                        Some(c) => out.push(c),
                        None => {
                            return Err(EngineError::parse(start, "unterminated string literal"))
                        }
                    }
                }
                Some(c) => {
                    out.push(c);
                    if c == quote {
                        return Ok(out);
                    }
                }
            }
        }
    }

    /// Collect a triple-quoted literal; newlines inside are kept
    pub fn collect_multiline_string(&mut self, quote: char) -> EngineResult<String> {
        let start = self.line;
        let mut out = String::new();
        for _ in 0..3 {
            self.bump();
            out.push(quote);
        }
        loop {
            match self.bump() {
                None => {
                    return Err(EngineError::parse(
                        start,
                        "unterminated triple-quoted string literal",
                    ))
                }
                Some('\\') => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c);
                    }
                }
                Some(c) if c == quote
                    && self.peek() == Some(quote)
                    && self.peek_at(1) == Some(quote) =>
                {
                    self.bump();
                    self.bump();
                    for _ in 0..3 {
                        out.push(quote);
                    }
                    return Ok(out);
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Read the next non-blank logical line
    pub fn next_logical_line(&mut self) -> EngineResult<Option<LogicalLine>> {
        loop {
            if self.at_end() {
                return Ok(None);
            }

            let line = self.line;
            let mut column = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => column += 1,
                    '\t' => column = (column / 8 + 1) * 8,
                    '\x0c' | '\r' => {}
                    _ => break,
                }
                self.bump();
            }

            match self.peek() {
                None => return Ok(None),
                Some('\n') => {
                    self.bump();
                    continue;
                }
                Some('#') => {
                    self.skip_comment();
                    continue;
                }
                _ => {}
            }

            let text = self.collect_logical_text()?;
            if text.is_empty() {
                continue;
            }
            return Ok(Some(LogicalLine { column, text, line }));
        }
    }

    fn collect_logical_text(&mut self) -> EngineResult<String> {
        let start = self.line;
        let mut text = String::new();
        let mut pending_space = false;

        loop {
            if self.singly_space() {
                pending_space = true;
            }
            let Some(c) = self.peek() else {
                break;
            };
            match c {
                '\n' => {
                    self.bump();
                    break;
                }
                '#' => {
                    self.skip_comment();
                    continue;
                }
                _ => {}
            }

            if pending_space && !text.is_empty() {
                text.push(' ');
            }
            pending_space = false;

            match c {
                '"' | '\'' => {
                    let literal = self.collect_string()?;
                    text.push_str(&literal);
                }
                '(' | '[' | '{' | ')' | ']' | '}' => {
                    self.update_depth(c)?;
                    self.bump();
                    text.push(c);
                }
                '.' if self.peek_at(1).map_or(false, |d| d.is_ascii_digit())
                    && !text
                        .chars()
                        .last()
                        .map_or(false, |p| is_ident_char(p) || matches!(p, ')' | ']' | '}')) =>
                {
                    // `.5` is spelled `0.5` so a leading dot always means a scratch slot
                    self.bump();
                    text.push_str("0.");
                }
                _ => {
                    self.bump();
                    text.push(c);
                }
            }
        }

        if self.depth.total() > 0 {
            return Err(EngineError::parse(start, "unclosed bracket"));
        }
        Ok(text)
    }

    /// Advance past decorators and the header of the outer function
    pub fn skip_source_definition(&mut self) -> EngineResult<DefHeader> {
        let mut decorators = Vec::new();
        loop {
            let Some(logical) = self.next_logical_line()? else {
                return Err(EngineError::SourceUnavailable(
                    "no function definition found".to_string(),
                ));
            };
            if let Some(decorator) = logical.text.strip_prefix('@') {
                decorators.push(decorator.trim().to_string());
                continue;
            }

            let chunks = chunks(&logical.text).map_err(|m| EngineError::parse(logical.line, m))?;
            let is_def = chunks.first().map_or(false, |c| c.is_name("def"))
                || (chunks.first().map_or(false, |c| c.is_name("async"))
                    && chunks.get(1).map_or(false, |c| c.is_name("def")));
            if !is_def {
                let word = logical.text.split_whitespace().next().unwrap_or("").to_string();
                return Err(EngineError::unsupported(logical.line, word));
            }
            let colon = header_colon(&chunks)
                .ok_or_else(|| EngineError::parse(logical.line, "missing `:` after definition"))?;

            return Ok(DefHeader {
                decorators,
                header: render(&chunks[..=colon]),
                column: logical.column,
                line: logical.line,
                inline_body: chunks[colon + 1..].to_vec(),
            });
        }
    }
}

/* ===================== Tokens ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokKind {
    Name,
    Number,
    Str,
    Op,
    Open,
    Close,
    Comma,
    Colon,
    Semi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokKind,
    pub text: String,
    /// Whitespace preceded the token in the canonical text
    pub space: bool,
}

impl Token {
    pub fn is_fstring(&self) -> bool {
        self.kind == TokKind::Str
            && self
                .text
                .chars()
                .take_while(|c| *c != '"' && *c != '\'')
                .any(|c| c == 'f' || c == 'F')
    }
}

fn scan_string(chars: &[char], start: usize) -> Result<usize, String> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = start + if triple { 3 } else { 1 };
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            if !triple {
                return Ok(i + 1);
            }
            if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                return Ok(i + 3);
            }
        }
        i += 1;
    }
    Err("unterminated string literal".to_string())
}

fn scan_number(chars: &[char], start: usize) -> usize {
    let hex = chars[start] == '0' && matches!(chars.get(start + 1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            i += 1;
            continue;
        }
        if (c == '+' || c == '-') && !hex && matches!(chars[i - 1], 'e' | 'E') {
            i += 1;
            continue;
        }
        break;
    }
    i
}

/// Split canonical text into tokens
pub fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut space = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            space = true;
            i += 1;
            continue;
        }

        let start = i;
        let kind = if c == '"' || c == '\'' {
            i = scan_string(&chars, i)?;
            TokKind::Str
        } else if is_ident_start(c) {
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            if i < chars.len() && (chars[i] == '"' || chars[i] == '\'') && is_string_prefix(&chars[start..i]) {
                i = scan_string(&chars, i)?;
                TokKind::Str
            } else {
                TokKind::Name
            }
        } else if c.is_ascii_digit() {
            i = scan_number(&chars, i);
            TokKind::Number
        } else if matches!(c, '(' | '[' | '{') {
            i += 1;
            TokKind::Open
        } else if matches!(c, ')' | ']' | '}') {
            i += 1;
            TokKind::Close
        } else if c == ',' {
            i += 1;
            TokKind::Comma
        } else if c == ';' {
            i += 1;
            TokKind::Semi
        } else if c == ':' && chars.get(i + 1) != Some(&'=') {
            i += 1;
            TokKind::Colon
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let op = OPERATORS
                .iter()
                .find(|op| rest.starts_with(*op))
                .ok_or_else(|| format!("unexpected character `{}`", c))?;
            i += op.chars().count();
            TokKind::Op
        };

        tokens.push(Token {
            kind,
            text: chars[start..i].iter().collect(),
            space,
        });
        space = false;
    }

    Ok(tokens)
}

/* ===================== Bracket Groups ===================== */

/// A token, or a bracketed group of chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Tok(Token),
    Group {
        open: Token,
        items: Vec<Chunk>,
        close: Token,
    },
}

impl Chunk {
    pub fn token(&self) -> Option<&Token> {
        match self {
            Chunk::Tok(tok) => Some(tok),
            Chunk::Group { .. } => None,
        }
    }

    pub fn is_name(&self, word: &str) -> bool {
        self.token()
            .map_or(false, |t| t.kind == TokKind::Name && t.text == word)
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.token().map_or(false, |t| t.kind == TokKind::Op && t.text == op)
    }

    pub fn is_kind(&self, kind: TokKind) -> bool {
        self.token().map_or(false, |t| t.kind == kind)
    }

    /// A plain identifier (not a keyword)
    pub fn identifier(&self) -> Option<&str> {
        self.token()
            .filter(|t| t.kind == TokKind::Name && !is_keyword(&t.text))
            .map(|t| t.text.as_str())
    }

    pub fn is_group(&self, open: char) -> bool {
        matches!(self, Chunk::Group { open: o, .. } if o.text.starts_with(open))
    }

    pub fn space(&self) -> bool {
        match self {
            Chunk::Tok(tok) => tok.space,
            Chunk::Group { open, .. } => open.space,
        }
    }

    pub fn is_binary_operator(&self) -> bool {
        self.token()
            .map_or(false, |t| t.kind == TokKind::Op && BINARY_OPERATORS.contains(&t.text.as_str()))
    }

    /// Whether this chunk can end an operand (so a following `-` is binary)
    pub fn ends_operand(&self) -> bool {
        match self {
            Chunk::Group { .. } => true,
            Chunk::Tok(tok) => match tok.kind {
                TokKind::Number | TokKind::Str => true,
                TokKind::Name => !is_keyword(&tok.text) || matches!(tok.text.as_str(), "True" | "False" | "None"),
                _ => false,
            },
        }
    }

    /// Whether `word` occurs anywhere inside, including f-string interpolations
    pub fn mentions(&self, word: &str) -> bool {
        match self {
            Chunk::Tok(tok) if tok.kind == TokKind::Name => tok.text == word,
            Chunk::Tok(tok) if tok.is_fstring() => mentions_word(&tok.text, word),
            Chunk::Tok(_) => false,
            Chunk::Group { items, .. } => items.iter().any(|c| c.mentions(word)),
        }
    }
}

fn mentions_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(at, _)| {
        let before = text[..at].chars().last();
        let after = text[at + word.len()..].chars().next();
        !before.map_or(false, is_ident_char) && !after.map_or(false, is_ident_char)
    })
}

/// Nest tokens by brackets
pub fn group(tokens: Vec<Token>) -> Result<Vec<Chunk>, String> {
    let mut frames: Vec<(Token, Vec<Chunk>)> = Vec::new();
    let mut current: Vec<Chunk> = Vec::new();

    for tok in tokens {
        match tok.kind {
            TokKind::Open => frames.push((tok, std::mem::take(&mut current))),
            TokKind::Close => {
                let (open, outer) = frames
                    .pop()
                    .ok_or_else(|| format!("unmatched `{}`", tok.text))?;
                let expected = open.text.chars().next().and_then(inverse_bracket);
                if expected != tok.text.chars().next() {
                    return Err(format!("`{}` closed by `{}`", open.text, tok.text));
                }
                let items = std::mem::replace(&mut current, outer);
                current.push(Chunk::Group {
                    open,
                    items,
                    close: tok,
                });
            }
            _ => current.push(Chunk::Tok(tok)),
        }
    }

    if let Some((open, _)) = frames.last() {
        return Err(format!("unclosed `{}`", open.text));
    }
    Ok(current)
}

pub fn chunks(text: &str) -> Result<Vec<Chunk>, String> {
    group(tokenize(text)?)
}

/// Canonical text of a chunk run, honouring the recorded spacing
pub fn render(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    render_into(chunks, &mut out, true);
    out
}

fn render_into(chunks: &[Chunk], out: &mut String, leading: bool) {
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.space() && !(leading && i == 0) && !out.is_empty() {
            out.push(' ');
        }
        match chunk {
            Chunk::Tok(tok) => out.push_str(&tok.text),
            Chunk::Group { open, items, close } => {
                out.push_str(&open.text);
                render_into(items, out, false);
                if close.space {
                    out.push(' ');
                }
                out.push_str(&close.text);
            }
        }
    }
}

/// First word of a statement, if it is a name
pub fn leading_keyword(chunks: &[Chunk]) -> Option<&str> {
    chunks
        .first()
        .and_then(Chunk::token)
        .filter(|t| t.kind == TokKind::Name)
        .map(|t| t.text.as_str())
}

/// Whether the statement opens a block (`match`/`case` only as soft keywords)
pub fn starts_block(chunks: &[Chunk]) -> bool {
    let Some(word) = leading_keyword(chunks) else {
        return false;
    };
    if !BLOCK_KEYWORDS.contains(&word) {
        return false;
    }
    if matches!(word, "match" | "case") {
        let follows_as_name = chunks.get(1).map_or(true, |next| {
            next.is_kind(TokKind::Op) || next.is_kind(TokKind::Comma) || next.is_group('(') || next.is_group('[')
        });
        return !follows_as_name && header_colon(chunks).is_some();
    }
    true
}

/// Index of the colon that ends a block header, skipping lambda colons
pub fn header_colon(chunks: &[Chunk]) -> Option<usize> {
    let mut lambdas = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.is_name("lambda") {
            lambdas += 1;
        } else if chunk.is_kind(TokKind::Colon) {
            if lambdas == 0 {
                return Some(i);
            }
            lambdas -= 1;
        }
    }
    None
}

/// Split top-level chunks at `sep` tokens
pub fn split_top<'a>(chunks: &'a [Chunk], is_sep: impl Fn(&Chunk) -> bool) -> Vec<&'a [Chunk]> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        if is_sep(chunk) {
            parts.push(&chunks[start..i]);
            start = i + 1;
        }
    }
    parts.push(&chunks[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logical_lines(source: &str) -> Vec<(usize, String)> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        while let Some(line) = scanner.next_logical_line().unwrap() {
            out.push((line.column, line.text));
        }
        out
    }

    #[test]
    fn test_comments_and_spacing_are_canonicalized() {
        let lines = logical_lines("x  =   1   # set x\n\n    y = (1,\n         2)  \n");
        assert_eq!(lines, vec![(0, "x = 1".to_string()), (4, "y = (1, 2)".to_string())]);
    }

    #[test]
    fn test_line_continuation_is_elided() {
        let lines = logical_lines("total = a + \\\n    b\n");
        assert_eq!(lines, vec![(0, "total = a + b".to_string())]);
    }

    #[test]
    fn test_strings_are_kept_verbatim() {
        let lines = logical_lines("s = 'a  # not a comment'\nt = \"\"\"two\n  lines\"\"\"\n");
        assert_eq!(lines[0].1, "s = 'a  # not a comment'");
        assert_eq!(lines[1].1, "t = \"\"\"two\n  lines\"\"\"");
    }

    #[test]
    fn test_leading_dot_float_gets_a_zero() {
        let lines = logical_lines("x = .5 + a.b\n");
        assert_eq!(lines[0].1, "x = 0.5 + a.b");
    }

    #[test]
    fn test_skip_source_definition() {
        let mut scanner = Scanner::new("@wrap\ndef g(a, b=(1, 2)): yield a\n");
        let header = scanner.skip_source_definition().unwrap();

        assert_eq!(header.decorators, vec!["wrap".to_string()]);
        assert_eq!(header.header, "def g(a, b=(1, 2)):");
        assert_eq!(header.line, 2);
        assert_eq!(render(&header.inline_body), "yield a");
    }

    #[test]
    fn test_source_without_definition_is_rejected() {
        let mut scanner = Scanner::new("x = 1\n");
        assert!(matches!(
            scanner.skip_source_definition(),
            Err(EngineError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn test_tokenize_operators_and_prefixed_strings() {
        let tokens = tokenize("x **= f'{a}' if b else rb\"c\"").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TokKind::Name, "x"),
                (TokKind::Op, "**="),
                (TokKind::Str, "f'{a}'"),
                (TokKind::Name, "if"),
                (TokKind::Name, "b"),
                (TokKind::Name, "else"),
                (TokKind::Str, "rb\"c\""),
            ]
        );
        assert!(tokens[2].is_fstring());
        assert!(!tokens[6].is_fstring());
    }

    #[test]
    fn test_group_and_render_preserve_text() {
        let text = "f(a, [b[0], {c: d}]) + (yield x)";
        let chunks = chunks(text).unwrap();
        assert_eq!(render(&chunks), text);
        assert!(chunks.iter().any(|c| c.mentions("yield")));
    }

    #[test]
    fn test_header_colon_skips_lambda() {
        let chunks = chunks("if (lambda: 1)() and lambda x: x: pass").unwrap();
        let colon = header_colon(&chunks).unwrap();
        assert_eq!(render(&chunks[colon + 1..]), "pass");
    }

    #[test]
    fn test_match_is_a_soft_keyword() {
        assert!(!starts_block(&chunks("match = 3").unwrap()));
        assert!(starts_block(&chunks("match command:").unwrap()));
        assert!(starts_block(&chunks("else:").unwrap()));
    }
}
