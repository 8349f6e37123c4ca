//! AST types for normalized lines
//!
//! One [`Node`] per logical line; compound statements own their nested
//! blocks. Line numbers index into the text the tree was built from.

use serde::{Deserialize, Serialize};

use super::scratch::SlotKey;
use super::values::Val;

/* ===================== Operators ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::MatMul => "@",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "@" => BinOp::MatMul,
            "/" => BinOp::Div,
            "//" => BinOp::FloorDiv,
            "%" => BinOp::Mod,
            "**" => BinOp::Pow,
            "<<" => BinOp::LShift,
            ">>" => BinOp::RShift,
            "|" => BinOp::BitOr,
            "^" => BinOp::BitXor,
            "&" => BinOp::BitAnd,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Lit { v: Val },
    Name { name: String },
    Scratch { key: SlotKey },
    FString { parts: Vec<FPart> },
    List { items: Vec<Expr> },
    Tuple { items: Vec<Expr> },
    Dict { items: Vec<DictItem> },
    Starred { value: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Compare { first: Box<Expr>, rest: Vec<(CmpOp, Expr)> },
    Bool { op: BoolOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Ternary { cond: Box<Expr>, then: Box<Expr>, orelse: Box<Expr> },
    Walrus { name: String, value: Box<Expr> },
    Lambda { params: Vec<ParamSpec>, body: Box<Expr> },
    Call { func: Box<Expr>, args: Vec<Arg> },
    /// `recv.name(args)`; kept apart from `Call` so mutating methods can
    /// write back into the place `recv` names
    Method { recv: Box<Expr>, name: String, args: Vec<Arg> },
    Attr { recv: Box<Expr>, name: String },
    Subscript { target: Box<Expr>, index: Box<Expr> },
    Slice { lo: Option<Box<Expr>>, hi: Option<Box<Expr>>, step: Option<Box<Expr>> },
    Comprehension {
        kind: CompKind,
        elt: Box<Expr>,
        value: Option<Box<Expr>>,
        clauses: Vec<CompClause>,
    },
    Await { value: Box<Expr> },
}

impl Expr {
    /// Names and scratch slots that can be written back to
    pub fn is_place(&self) -> bool {
        match self {
            Expr::Name { .. } | Expr::Scratch { .. } => true,
            Expr::Subscript { target, .. } => target.is_place(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DictItem {
    Pair(Expr, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    Pos(Expr),
    Star(Expr),
    Kw(String, Expr),
    DoubleStar(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompKind {
    List,
    Dict,
    Gen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompClause {
    pub target: Target,
    pub iter: Expr,
    pub conds: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FPart {
    Lit(String),
    Expr {
        expr: Expr,
        conversion: Option<char>,
        spec: Option<String>,
    },
}

/* ===================== Targets ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Target {
    Name { name: String },
    Scratch { key: SlotKey },
    Subscript { target: Box<Expr>, index: Box<Expr> },
    Unpack { items: Vec<Target> },
    Starred { target: Box<Target> },
}

impl Target {
    /// Plain names bound by this target (used to scope comprehension variables)
    pub fn names(&self, out: &mut Vec<String>) {
        match self {
            Target::Name { name } => out.push(name.clone()),
            Target::Unpack { items } => items.iter().for_each(|t| t.names(out)),
            Target::Starred { target } => target.names(out),
            Target::Scratch { .. } | Target::Subscript { .. } => {}
        }
    }
}

/* ===================== Definitions ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Positional,
    KeywordOnly,
    VarArgs,
    VarKw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Expr>,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefBody {
    Block(Vec<Node>),
    /// The body suspends; calls build a generator from this source
    Generator { source: String, is_async: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefSpec {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub decorators: Vec<Expr>,
    pub body: DefBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    pub filter: Option<Expr>,
    pub name: Option<String>,
    pub body: Vec<Node>,
}

/* ===================== Statements ===================== */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Expr { value: Expr },
    Assign { targets: Vec<Target>, value: Expr },
    AugAssign { target: Target, op: BinOp, value: Expr },
    Pass,
    Break,
    Continue,
    Return { value: Option<Expr> },
    Raise { exc: Option<Expr>, cause: Option<Expr> },
    Del { targets: Vec<Target> },
    Assert { test: Expr, msg: Option<Expr> },
    If { cond: Expr, body: Vec<Node>, orelse: Vec<Node> },
    While { cond: Expr, body: Vec<Node>, orelse: Vec<Node> },
    For { target: Target, iter: Expr, body: Vec<Node>, orelse: Vec<Node> },
    Try {
        body: Vec<Node>,
        handlers: Vec<Handler>,
        orelse: Vec<Node>,
        finalbody: Vec<Node>,
    },
    Def { def: Box<DefSpec> },
}

/// A statement and the index of the line it was read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub line: usize,
    pub stmt: Stmt,
}
