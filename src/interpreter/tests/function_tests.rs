//! Function definition and call tests

use super::helpers::{ints, run, run_and_get, run_err};
use crate::interpreter::types::{Param, ParamKind, Unwind};
use crate::interpreter::{bind_arguments, Val};

fn param(name: &str, default: Option<Val>, kind: ParamKind) -> Param {
    Param {
        name: name.to_string(),
        default,
        kind,
    }
}

#[test]
fn test_defaults_keywords_and_varargs() {
    let env = run(
        "def f(a, b=2, *rest, key=None, **extra):
    return [a, b, list(rest), key, extra]
one = f(1)
two = f(1, 5, 6, 7, key='k', other=0)",
    );
    assert_eq!(
        env["one"],
        Val::List(vec![Val::Int(1), Val::Int(2), Val::List(vec![]), Val::None, Val::Dict(vec![])])
    );
    assert_eq!(
        env["two"],
        Val::List(vec![
            Val::Int(1),
            Val::Int(5),
            ints(&[6, 7]),
            Val::str("k"),
            Val::Dict(vec![(Val::str("other"), Val::Int(0))]),
        ])
    );
}

#[test]
fn test_star_arguments_at_call_site() {
    let out = run_and_get(
        "def add(a, b, c):
    return a + b + c
out = add(*[1, 2], **{'c': 3})",
        "out",
    );
    assert_eq!(out, Val::Int(6));
}

#[test]
fn test_recursion() {
    let out = run_and_get(
        "def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)
out = fib(12)",
        "out",
    );
    assert_eq!(out, Val::Int(144));
}

#[test]
fn test_runaway_recursion_raises() {
    let (kind, _) = run_err("def down(n):\n    return down(n + 1)\ndown(0)");
    assert_eq!(kind, "RecursionError");
}

#[test]
fn test_decorators_apply_bottom_up() {
    let out = run_and_get(
        "def twice(f):
    return lambda x: f(f(x))
def inc(f):
    return lambda x: f(x) + 1
@twice
@inc
def base(x):
    return x * 2
out = base(1)",
        "out",
    );
    // twice(inc(base)): ((1 * 2) + 1) * 2 + 1
    assert_eq!(out, Val::Int(7));
}

#[test]
fn test_function_without_return_gives_none() {
    let out = run_and_get("def f():\n    x = 1\nout = f()", "out");
    assert_eq!(out, Val::None);
}

#[test]
fn test_exception_inside_call_is_located_at_caller() {
    let (kind, line) = run_err("def f():\n    return 1 / 0\nx = 1\ny = f()");
    assert_eq!(kind, "ZeroDivisionError");
    assert_eq!(line, Some(3));
}

#[test]
fn test_bind_arguments_errors() {
    let params = vec![
        param("a", None, ParamKind::Positional),
        param("b", Some(Val::Int(1)), ParamKind::Positional),
    ];

    let env = bind_arguments("f", &params, vec![Val::Int(0)], vec![]).unwrap();
    assert_eq!(env["b"], Val::Int(1));

    let raised = |result: Result<_, Unwind>| match result {
        Err(Unwind::Raise { exc, .. }) => exc.kind,
        other => panic!("expected TypeError, got {:?}", other),
    };
    assert_eq!(raised(bind_arguments("f", &params, vec![], vec![])), "TypeError");
    assert_eq!(
        raised(bind_arguments("f", &params, vec![Val::Int(0); 3], vec![])),
        "TypeError"
    );
    assert_eq!(
        raised(bind_arguments(
            "f",
            &params,
            vec![Val::Int(0)],
            vec![("a".to_string(), Val::Int(1))]
        )),
        "TypeError"
    );
    assert_eq!(
        raised(bind_arguments(
            "f",
            &params,
            vec![Val::Int(0)],
            vec![("zzz".to_string(), Val::Int(1))]
        )),
        "TypeError"
    );
}
