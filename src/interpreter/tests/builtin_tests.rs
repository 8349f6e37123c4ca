//! Builtin function and method tests

use super::helpers::{eval, ints, list, run, run_and_get};
use crate::interpreter::{eval_text, Env, Val};

fn raised(text: &str) -> String {
    match eval_text(text, Env::new()) {
        Err(err) => err.exception().map(|e| e.kind.clone()).unwrap_or_default(),
        Ok(value) => panic!("expected an exception, got {:?}", value),
    }
}

#[test]
fn test_conversions() {
    assert_eq!(eval("int('ff', 16)"), Val::Int(255));
    assert_eq!(eval("int(-3.9)"), Val::Int(-3));
    assert_eq!(eval("float('1.5')"), Val::Float(1.5));
    assert_eq!(eval("str(1.0)"), Val::str("1.0"));
    assert_eq!(eval("bool([])"), Val::Bool(false));
    assert_eq!(eval("list('ab')"), Val::List(vec![Val::str("a"), Val::str("b")]));
    assert_eq!(eval("tuple(range(2))"), Val::Tuple(vec![Val::Int(0), Val::Int(1)]));
    assert_eq!(
        eval("dict([('a', 1)], b=2)"),
        Val::Dict(vec![(Val::str("a"), Val::Int(1)), (Val::str("b"), Val::Int(2))])
    );
    assert_eq!(raised("int('nope')"), "ValueError");
}

#[test]
fn test_aggregates() {
    assert_eq!(eval("len({'a': 1})"), Val::Int(1));
    assert_eq!(eval("sum([1, 2, 3], 10)"), Val::Int(16));
    assert_eq!(eval("min(3, 1, 2)"), Val::Int(1));
    assert_eq!(eval("max(['a', 'ccc', 'bb'], key=len)"), Val::str("ccc"));
    assert_eq!(eval("max([], default=0)"), Val::Int(0));
    assert_eq!(eval("any([0, '', 3])"), Val::Bool(true));
    assert_eq!(eval("all([])"), Val::Bool(true));
    assert_eq!(raised("min([])"), "ValueError");
    assert_eq!(raised("len(5)"), "TypeError");
}

#[test]
fn test_sorted_is_stable_with_key_and_reverse() {
    assert_eq!(eval("sorted([3, 1, 2], reverse=True)"), ints(&[3, 2, 1]));
    assert_eq!(
        eval("sorted(['bb', 'a', 'cc', 'd'], key=len)"),
        list(vec![Val::str("a"), Val::str("d"), Val::str("bb"), Val::str("cc")])
    );
    assert_eq!(
        eval("sorted(['bb', 'a', 'cc', 'd'], key=len, reverse=True)"),
        list(vec![Val::str("bb"), Val::str("cc"), Val::str("a"), Val::str("d")])
    );
    assert_eq!(raised("sorted([1, 'a'])"), "TypeError");
}

#[test]
fn test_iteration_helpers() {
    assert_eq!(eval("list(zip([1, 2, 3], 'ab'))").to_string(), "[(1, 'a'), (2, 'b')]");
    assert_eq!(eval("list(map(lambda x: x * 10, [1, 2]))"), ints(&[10, 20]));
    assert_eq!(eval("list(filter(None, [0, 1, 2]))"), ints(&[1, 2]));
    assert_eq!(eval("list(reversed(range(3)))"), ints(&[2, 1, 0]));
    assert_eq!(eval("next(iter([]), 'empty')"), Val::str("empty"));
    assert_eq!(raised("next(iter([]))"), "StopIteration");
}

#[test]
fn test_next_advances_a_stored_iterator() {
    let env = run("it = iter([1, 2, 3])\na = next(it)\nb = next(it)\nrest = list(it)");
    assert_eq!(env["a"], Val::Int(1));
    assert_eq!(env["b"], Val::Int(2));
    assert_eq!(env["rest"], ints(&[3]));
}

#[test]
fn test_numeric_helpers() {
    assert_eq!(eval("abs(-4)"), Val::Int(4));
    assert_eq!(eval("round(2.5)"), Val::Int(2));
    assert_eq!(eval("round(2.675, 1)"), Val::Float(2.7));
    assert_eq!(eval("divmod(-7, 2)"), Val::Tuple(vec![Val::Int(-4), Val::Int(1)]));
    assert_eq!(eval("chr(ord('a') + 1)"), Val::str("b"));
    assert_eq!(eval("format(5, '03d')"), Val::str("005"));
}

#[test]
fn test_isinstance_and_callable() {
    assert_eq!(eval("isinstance(True, int)"), Val::Bool(true));
    assert_eq!(eval("isinstance('x', (int, float))"), Val::Bool(false));
    assert_eq!(eval("isinstance(KeyError(), LookupError)"), Val::Bool(true));
    assert_eq!(eval("callable(len)"), Val::Bool(true));
    assert_eq!(eval("callable(3)"), Val::Bool(false));
}

#[test]
fn test_list_methods() {
    let env = run(
        "xs = [1, 2, 3]
xs.insert(0, 0)
last = xs.pop()
xs.extend(range(2))
xs.remove(0)
where = xs.index(2)
xs.reverse()",
    );
    assert_eq!(env["last"], Val::Int(3));
    assert_eq!(env["where"], Val::Int(1));
    assert_eq!(env["xs"], ints(&[1, 0, 2, 1]));
}

#[test]
fn test_dict_methods() {
    let env = run(
        "d = {'a': 1}
d.update({'b': 2}, c=3)
got = d.get('z', 'missing')
popped = d.pop('a')
d.setdefault('e', [])
d['e'].append(5)
keys = list(d.keys())
items = d.items()",
    );
    assert_eq!(env["got"], Val::str("missing"));
    assert_eq!(env["popped"], Val::Int(1));
    assert_eq!(
        env["keys"],
        list(vec![Val::str("b"), Val::str("c"), Val::str("e")])
    );
    assert_eq!(env["items"].to_string(), "[('b', 2), ('c', 3), ('e', [5])]");
}

#[test]
fn test_string_methods() {
    assert_eq!(eval("', '.join(['a', 'b'])"), Val::str("a, b"));
    assert_eq!(eval("'a-b-c'.split('-', 1)"), list(vec![Val::str("a"), Val::str("b-c")]));
    assert_eq!(eval("'Hi {}!'.format('you')"), Val::str("Hi you!"));
    assert_eq!(eval("'xxhixx'.strip('x').upper()"), Val::str("HI"));
    assert_eq!(eval("'abc'.startswith(('z', 'a'))"), Val::Bool(true));
    assert_eq!(eval("'banana'.count('an')"), Val::Int(2));
    assert_eq!(raised("'abc'.nothing()"), "AttributeError");
}

#[test]
fn test_termination_and_exception_constructors() {
    assert_eq!(
        eval("Termination(3)"),
        Val::Termination(Box::new(Val::Int(3)))
    );
    let message = run_and_get("e = ValueError('bad')\nmessage = str(e)", "message");
    assert_eq!(message, Val::str("bad"));
}

#[test]
fn test_float_to_int_conversions_raise_when_out_of_range() {
    assert_eq!(raised("int(1e300)"), "OverflowError");
    assert_eq!(raised("int(-1e19)"), "OverflowError");
    assert_eq!(raised("round(1e300)"), "OverflowError");
    assert_eq!(raised("int(float('inf'))"), "OverflowError");
    assert_eq!(raised("int(float('nan'))"), "ValueError");
    assert_eq!(raised("round(float('nan'))"), "ValueError");
    assert_eq!(eval("int(-9.2e18)"), Val::Int(-9_200_000_000_000_000_000));
    assert_eq!(eval("round(2.5)"), Val::Int(2));
}

#[test]
fn test_oversized_results_raise_instead_of_allocating() {
    assert_eq!(raised("len(range(-9223372036854775807 - 1, 9223372036854775807))"), "OverflowError");
    assert_eq!(eval("len(range(0, 9223372036854775807, 4611686018427387904))"), Val::Int(2));
    assert_eq!(eval("9223372036854775806 in range(0, 9223372036854775807, 2)"), Val::Bool(true));
    assert_eq!(raised("list(range(9223372036854775807))"), "MemoryError");
    assert_eq!(raised("range(9223372036854775807)[1:]"), "MemoryError");
    assert_eq!(raised("f'{3:>99999999999}'"), "ValueError");
    assert_eq!(raised("'7'.zfill(9223372036854775807)"), "MemoryError");
    assert_eq!(eval("'-7'.zfill(4)"), Val::str("-007"));
}
