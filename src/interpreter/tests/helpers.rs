//! Test helpers for interpreter tests

use crate::errors::EngineError;
use crate::interpreter::{eval_text, exec_lines, Env, Val};

/// Split a test source into block lines
pub fn block(source: &str) -> Vec<String> {
    source.lines().map(str::to_string).collect()
}

/// Run a block from an empty environment
pub fn run(source: &str) -> Env {
    exec_lines(&block(source), Env::new()).expect("block failed")
}

/// Run a block and read one binding
pub fn run_and_get(source: &str, name: &str) -> Val {
    run(source).remove(name).unwrap_or_else(|| panic!("`{}` is not bound", name))
}

/// Run a block that must raise; returns the exception kind and line
pub fn run_err(source: &str) -> (String, Option<usize>) {
    match exec_lines(&block(source), Env::new()) {
        Err(EngineError::UserException { exc, line }) => (exc.kind, line),
        other => panic!("expected an exception, got {:?}", other),
    }
}

pub fn eval(text: &str) -> Val {
    eval_text(text, Env::new()).expect("expression failed")
}

pub fn eval_in(text: &str, env: Env) -> Val {
    eval_text(text, env).expect("expression failed")
}

pub fn list(items: Vec<Val>) -> Val {
    Val::List(items)
}

pub fn ints(items: &[i64]) -> Val {
    Val::List(items.iter().copied().map(Val::Int).collect())
}
