//! Runtime value types
//!
//! Values have value semantics: assignment clones. Iterators and nested
//! generators therefore only advance through the place they are stored in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ast::{Expr, Node};
use crate::generator::Generator;

/// Local bindings of a frame
pub type Env = BTreeMap<String, Val>;

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Val>),
    Tuple(Vec<Val>),
    /// Insertion-ordered; keys compare with host equality
    Dict(Vec<(Val, Val)>),
    Range(RangeVal),
    Iter(Box<IterState>),
    Function(Box<FunctionVal>),
    /// A builtin function, type, or exception class, by name
    Builtin(String),
    Exception(ExcVal),
    Generator(Box<Generator>),
    /// End-of-sequence sentinel carrying the return payload
    Termination(Box<Val>),
}

impl Val {
    pub fn str(s: impl Into<String>) -> Self {
        Val::Str(s.into())
    }

    /// Host truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::None => false,
            Val::Bool(b) => *b,
            Val::Int(n) => *n != 0,
            Val::Float(f) => *f != 0.0,
            Val::Str(s) => !s.is_empty(),
            Val::List(items) | Val::Tuple(items) => !items.is_empty(),
            Val::Dict(items) => !items.is_empty(),
            Val::Range(range) => range.len() > 0,
            Val::Termination(_) => false,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::None => "NoneType",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::Str(_) => "str",
            Val::List(_) => "list",
            Val::Tuple(_) => "tuple",
            Val::Dict(_) => "dict",
            Val::Range(_) => "range",
            Val::Iter(_) => "iterator",
            Val::Function(_) => "function",
            Val::Builtin(_) => "builtin_function_or_method",
            Val::Exception(_) => "exception",
            Val::Generator(_) => "generator",
            Val::Termination(_) => "Termination",
        }
    }

    pub fn is_termination(&self) -> bool {
        matches!(self, Val::Termination(_))
    }
}

impl From<i64> for Val {
    fn from(n: i64) -> Self {
        Val::Int(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::interpreter::format::to_str(self))
    }
}

/// Largest sequence or string a single operation may build
pub const MAX_SEQUENCE_LEN: usize = 1 << 26;

/* ===================== Ranges and Iterators ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeVal {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeVal {
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let span = if step > 0 { stop - start } else { start - stop };
        if span <= 0 || step == 0 {
            return 0;
        }
        let step = step.abs();
        usize::try_from((span + step - 1) / step).unwrap_or(usize::MAX)
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        i64::try_from(self.start as i128 + self.step as i128 * index as i128).ok()
    }

    pub fn contains(&self, n: i64) -> bool {
        let inside = if self.step > 0 {
            self.start <= n && n < self.stop
        } else {
            self.stop < n && n <= self.start
        };
        inside && (n as i128 - self.start as i128) % self.step as i128 == 0
    }
}

/// A partially consumed iterator over a builtin sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum IterState {
    Seq { items: Vec<Val>, pos: usize },
    Range { next: i64, stop: i64, step: i64 },
}

impl IterState {
    pub fn over(items: Vec<Val>) -> Self {
        IterState::Seq { items, pos: 0 }
    }

    pub fn next_item(&mut self) -> Option<Val> {
        match self {
            IterState::Seq { items, pos } => {
                let item = items.get(*pos).cloned();
                if item.is_some() {
                    *pos += 1;
                }
                item
            }
            IterState::Range { next, stop, step } => {
                let more = if *step > 0 { *next < *stop } else { *next > *stop };
                if !more {
                    return None;
                }
                let current = *next;
                *next = next.checked_add(*step).unwrap_or(*stop);
                Some(Val::Int(current))
            }
        }
    }

    /// Items not yet produced
    pub fn remaining(&self) -> Vec<Val> {
        match self {
            IterState::Seq { items, pos } => items[(*pos).min(items.len())..].to_vec(),
            IterState::Range { next, stop, step } => {
                let mut copy = IterState::Range {
                    next: *next,
                    stop: *stop,
                    step: *step,
                };
                std::iter::from_fn(|| copy.next_item()).collect()
            }
        }
    }
}

/* ===================== Functions ===================== */

/// A parameter with its default already evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub default: Option<Val>,
    pub kind: super::ast::ParamKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    /// Lambda body
    Expr(Expr),
    Block(Vec<Node>),
    Generator { source: String, is_async: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionVal {
    pub name: String,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    /// Bindings visible where the function was defined, copied at definition
    pub captured: Env,
}

/* ===================== Exceptions ===================== */

/// Builtin exception classes and their parents
const EXCEPTION_TREE: &[(&str, &str)] = &[
    ("BaseException", ""),
    ("Exception", "BaseException"),
    ("GeneratorExit", "BaseException"),
    ("KeyboardInterrupt", "BaseException"),
    ("StopIteration", "Exception"),
    ("StopAsyncIteration", "Exception"),
    ("ArithmeticError", "Exception"),
    ("ZeroDivisionError", "ArithmeticError"),
    ("OverflowError", "ArithmeticError"),
    ("MemoryError", "Exception"),
    ("LookupError", "Exception"),
    ("IndexError", "LookupError"),
    ("KeyError", "LookupError"),
    ("ValueError", "Exception"),
    ("TypeError", "Exception"),
    ("NameError", "Exception"),
    ("UnboundLocalError", "NameError"),
    ("AttributeError", "Exception"),
    ("RuntimeError", "Exception"),
    ("NotImplementedError", "RuntimeError"),
    ("RecursionError", "RuntimeError"),
    ("AssertionError", "Exception"),
    ("SyntaxError", "Exception"),
];

pub fn is_exception_class(name: &str) -> bool {
    EXCEPTION_TREE.iter().any(|(kind, _)| *kind == name)
}

fn exception_parent(kind: &str) -> Option<&'static str> {
    EXCEPTION_TREE
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, parent)| *parent)
        .filter(|parent| !parent.is_empty())
}

/// An exception instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcVal {
    pub kind: String,
    pub args: Vec<Val>,
}

impl ExcVal {
    pub fn new(kind: impl Into<String>, args: Vec<Val>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    pub fn message(kind: &str, message: impl Into<String>) -> Self {
        Self::new(kind, vec![Val::Str(message.into())])
    }

    /// Whether this exception is an instance of `class` (or a subclass)
    pub fn is_a(&self, class: &str) -> bool {
        let mut current = Some(self.kind.as_str());
        while let Some(kind) = current {
            if kind == class {
                return true;
            }
            current = exception_parent(kind);
        }
        false
    }

    /// `str(exc)`
    pub fn text(&self) -> String {
        match self.args.as_slice() {
            [] => String::new(),
            [single] => crate::interpreter::format::to_str(single),
            many => crate::interpreter::format::repr(&Val::Tuple(many.to_vec())),
        }
    }
}

impl fmt::Display for ExcVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.text();
        if text.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, text)
        }
    }
}
