//! Type definitions for the line interpreter

pub mod ast;
pub mod control;
pub mod scratch;
pub mod values;

pub use ast::{
    Arg, BinOp, BoolOp, CmpOp, CompClause, CompKind, DefBody, DefSpec, DictItem, Expr, FPart,
    Handler, Node, ParamKind, ParamSpec, Stmt, Target, UnaryOp,
};
pub use control::{EvalResult, ExecResult, Flow, Unwind};
pub use scratch::{Scratch, SlotKey};
pub use values::{Env, ExcVal, FunctionBody, FunctionVal, IterState, Param, RangeVal, Val, MAX_SEQUENCE_LEN};
