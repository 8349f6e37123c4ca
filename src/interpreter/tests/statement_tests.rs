//! Statement execution tests

use super::helpers::{block, ints, run, run_and_get, run_err};
use crate::errors::EngineError;
use crate::interpreter::{exec_lines, Env, Val};

/* ===================== Assignment ===================== */

#[test]
fn test_chained_and_unpacking_assignment() {
    let env = run("a = b = 1\nx, (y, z) = 1, [2, 3]\nfirst, *rest = 'abc'");
    assert_eq!(env["a"], Val::Int(1));
    assert_eq!(env["b"], Val::Int(1));
    assert_eq!(env["z"], Val::Int(3));
    assert_eq!(env["first"], Val::str("a"));
    assert_eq!(env["rest"], Val::List(vec![Val::str("b"), Val::str("c")]));
}

#[test]
fn test_unpack_count_mismatch() {
    let (kind, line) = run_err("x = 1\na, b = [1, 2, 3]");
    assert_eq!(kind, "ValueError");
    assert_eq!(line, Some(1));
}

#[test]
fn test_item_and_slice_assignment() {
    let env = run(
        "grid = [[0, 0], [0, 0]]
grid[1][0] = 5
nums = [1, 2, 3, 4]
nums[1:3] = [9]
d = {}
d['k'] = [1]
d['k'] += [2]",
    );
    assert_eq!(
        env["grid"],
        Val::List(vec![ints(&[0, 0]), ints(&[5, 0])])
    );
    assert_eq!(env["nums"], ints(&[1, 9, 4]));
    assert_eq!(env["d"], Val::Dict(vec![(Val::str("k"), ints(&[1, 2]))]));
}

#[test]
fn test_mutating_methods_write_back() {
    let env = run(
        "items = [3, 1, 2]
items.append(0)
items.sort()
nested = {'xs': []}
nested['xs'].append(1)",
    );
    assert_eq!(env["items"], ints(&[0, 1, 2, 3]));
    assert_eq!(env["nested"], Val::Dict(vec![(Val::str("xs"), ints(&[1]))]));
}

#[test]
fn test_del_statement() {
    let env = run("a = 1\nb = [1, 2, 3]\ndel a, b[0]");
    assert!(!env.contains_key("a"));
    assert_eq!(env["b"], ints(&[2, 3]));
}

/* ===================== Control Flow ===================== */

#[test]
fn test_if_elif_else() {
    let source = "if n < 0:
    sign = -1
elif n == 0:
    sign = 0
else:
    sign = 1";
    for (n, expected) in [(-5, -1), (0, 0), (7, 1)] {
        let mut env = Env::new();
        env.insert("n".to_string(), Val::Int(n));
        let env = exec_lines(&block(source), env).unwrap();
        assert_eq!(env["sign"], Val::Int(expected));
    }
}

#[test]
fn test_while_with_break_and_else() {
    let env = run(
        "i = 0
hit = False
while i < 10:
    i += 1
    if i == 4:
        break
else:
    hit = True",
    );
    assert_eq!(env["i"], Val::Int(4));
    assert_eq!(env["hit"], Val::Bool(false));

    let env = run("i = 0\nwhile i < 3:\n    i += 1\nelse:\n    done = True");
    assert_eq!(env["done"], Val::Bool(true));
}

#[test]
fn test_for_with_continue() {
    let total = run_and_get(
        "total = 0
for i in range(10):
    if i % 2:
        continue
    total += i",
        "total",
    );
    assert_eq!(total, Val::Int(20));
}

#[test]
fn test_for_over_dict_and_enumerate() {
    let env = run(
        "keys = []
for k in {'a': 1, 'b': 2}:
    keys.append(k)
pairs = []
for i, c in enumerate('xy', 1):
    pairs.append(f'{i}{c}')",
    );
    assert_eq!(env["keys"], Val::List(vec![Val::str("a"), Val::str("b")]));
    assert_eq!(env["pairs"], Val::List(vec![Val::str("1x"), Val::str("2y")]));
}

#[test]
fn test_step_limit_stops_runaway_loop() {
    let err = exec_lines(&block("while True:\n    pass"), Env::new()).unwrap_err();
    assert!(matches!(err, EngineError::StepLimit(_)));
}

/* ===================== Exceptions ===================== */

#[test]
fn test_try_except_else_finally() {
    let env = run(
        "log = []
try:
    log.append('body')
    x = 1 / 0
except ZeroDivisionError as e:
    log.append(str(e))
else:
    log.append('else')
finally:
    log.append('finally')",
    );
    assert_eq!(
        env["log"],
        Val::List(vec![Val::str("body"), Val::str("division by zero"), Val::str("finally")])
    );
    assert!(!env.contains_key("e"));
}

#[test]
fn test_handler_matching_follows_hierarchy() {
    let env = run(
        "caught = None
try:
    {}['missing']
except (TypeError, LookupError) as e:
    caught = 'lookup'",
    );
    assert_eq!(env["caught"], Val::str("lookup"));
}

#[test]
fn test_unmatched_exception_propagates_through_finally() {
    let (kind, line) = run_err(
        "try:
    raise ValueError('bad')
except KeyError:
    pass
finally:
    cleaned = True",
    );
    assert_eq!(kind, "ValueError");
    assert_eq!(line, Some(1));
}

#[test]
fn test_bare_raise_reraises_active_exception() {
    let (kind, _) = run_err("try:\n    int('x')\nexcept ValueError:\n    raise");
    assert_eq!(kind, "ValueError");

    let (kind, _) = run_err("raise");
    assert_eq!(kind, "RuntimeError");
}

#[test]
fn test_raise_from_and_class_raise() {
    let (kind, _) = run_err("raise KeyError from None");
    assert_eq!(kind, "KeyError");
    let (kind, _) = run_err("raise 5");
    assert_eq!(kind, "TypeError");
}

#[test]
fn test_finally_return_overrides_exception() {
    let out = run_and_get(
        "def f():
    try:
        raise ValueError()
    finally:
        return 'finally'
out = f()",
        "out",
    );
    assert_eq!(out, Val::str("finally"));
}

#[test]
fn test_assert_statement() {
    let (kind, line) = run_err("x = 2\nassert x == 3, 'x must be 3'");
    assert_eq!(kind, "AssertionError");
    assert_eq!(line, Some(1));
    run("assert True");
}

#[test]
fn test_exception_attributes() {
    let env = run(
        "try:
    raise ValueError('a', 2)
except ValueError as e:
    args = e.args
    text = str(e)",
    );
    assert_eq!(env["args"], Val::Tuple(vec![Val::str("a"), Val::Int(2)]));
    assert_eq!(env["text"], Val::str("('a', 2)"));
}

#[test]
fn test_list_augmented_add_sees_mutation_by_its_operand() {
    let env = run("xs = [1, 2]\nxs += [xs.pop()]\nn = 10\nn += (n := 1)");
    assert_eq!(env["xs"], ints(&[1, 2]));
    // a rebinding operand does not change the left value of a number
    assert_eq!(env["n"], Val::Int(11));
}
