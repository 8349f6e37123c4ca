//! End-to-end behaviour of copyable generators through the public API
//!
//! Every step goes through a JSON round trip first, so each scenario also
//! checks that a serialized generator resumes exactly where it stopped.

use cadence_core::{AsyncGenerator, EngineError, Generator, GeneratorState, Val};

fn start(source: &str, args: Vec<Val>) -> Generator {
    Generator::new(source, args, Vec::new()).expect("generator creation failed")
}

fn reload(generator: &Generator) -> Generator {
    let json = serde_json::to_string(generator).expect("serialization failed");
    serde_json::from_str(&json).expect("deserialization failed")
}

fn advance(generator: &mut Generator) -> Val {
    *generator = reload(generator);
    match generator.next_value().expect("resumption failed") {
        GeneratorState::Yielded(value) => value,
        other => panic!("expected a value, got {:?}", other),
    }
}

fn send(generator: &mut Generator, value: Val) -> Val {
    *generator = reload(generator);
    match generator.send(value).expect("send failed") {
        GeneratorState::Yielded(value) => value,
        other => panic!("expected a value, got {:?}", other),
    }
}

fn rest(generator: Generator) -> Vec<Val> {
    generator.collect::<Result<Vec<_>, _>>().expect("iteration failed")
}

fn ints(values: &[i64]) -> Vec<Val> {
    values.iter().copied().map(Val::Int).collect()
}

fn pair(a: i64, b: i64) -> Val {
    Val::Tuple(vec![Val::Int(a), Val::Int(b)])
}

fn row(i: i64) -> Val {
    Val::Tuple(vec![Val::str("row"), Val::Int(i)])
}

/* ===================== Scenarios ===================== */

#[test]
fn test_one_line_body_copy() {
    let mut g = start("def g(): yield 1; yield 2; yield 3", Vec::new());
    assert_eq!(advance(&mut g), Val::Int(1));

    let mut h = g.copy();
    assert_eq!(advance(&mut g), Val::Int(2));
    assert_eq!(advance(&mut h), Val::Int(2));
    assert_eq!(advance(&mut g), Val::Int(3));
    assert_eq!(advance(&mut h), Val::Int(3));
}

#[test]
fn test_copy_before_taken_branch() {
    let source = "def g(a):
    yield 10
    if a:
        yield 20
    yield 30
";
    let mut g = start(source, vec![Val::Bool(true)]);
    assert_eq!(advance(&mut g), Val::Int(10));

    let mut h = g.copy();
    assert_eq!(advance(&mut g), Val::Int(20));
    assert_eq!(advance(&mut h), Val::Int(20));
    assert_eq!(advance(&mut g), Val::Int(30));
    assert_eq!(advance(&mut h), Val::Int(30));
}

#[test]
fn test_copy_inside_else_branch() {
    let source = "def g(a):
    yield 10
    if a:
        yield 20
    else:
        yield 40
    yield 30
";
    let mut g = start(source, vec![Val::Int(0)]);
    assert_eq!(advance(&mut g), Val::Int(10));
    assert_eq!(advance(&mut g), Val::Int(40));

    let mut h = g.copy();
    assert_eq!(advance(&mut h), Val::Int(30));
    assert_eq!(rest(g), ints(&[30]));
}

#[test]
fn test_copy_inside_infinite_while() {
    let source = "def g(a):
    a = a + 2
    yield a
    while True:
        a += 1
        yield a
        a += 2
";
    let mut g = start(source, vec![Val::Int(10)]);
    assert_eq!(advance(&mut g), Val::Int(12));
    assert_eq!(advance(&mut g), Val::Int(13));

    let mut h = g.copy();
    assert_eq!(advance(&mut h), Val::Int(16));
    assert_eq!(advance(&mut g), Val::Int(16));
    assert_eq!(advance(&mut g), Val::Int(19));
}

#[test]
fn test_send_feeds_the_yield_expression() {
    let mut g = start("def g():\n    x = yield 3\n    yield x + 1\n", Vec::new());
    assert_eq!(advance(&mut g), Val::Int(3));
    assert_eq!(send(&mut g, Val::Int(7)), Val::Int(8));
}

#[test]
fn test_yield_from_list() {
    let source = "def g(): yield from [1,2,3]";
    assert_eq!(rest(start(source, Vec::new())), ints(&[1, 2, 3]));

    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::Int(1));
    assert_eq!(rest(g.copy()), ints(&[2, 3]));
}

/* ===================== Boundaries ===================== */

#[test]
fn test_yield_in_if_and_elif_conditions() {
    let source = "def g():
    if (yield 'ask'):
        yield 'first'
    elif (yield 'again'):
        yield 'second'
    yield 'end'
";
    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::str("ask"));
    assert_eq!(send(&mut g, Val::Bool(false)), Val::str("again"));
    assert_eq!(send(&mut g, Val::Bool(true)), Val::str("second"));
    assert_eq!(advance(&mut g), Val::str("end"));
}

#[test]
fn test_yield_in_while_condition() {
    let source = "def g():
    count = 0
    while (yield count) != 'stop':
        count += 1
    yield 'done'
";
    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::Int(0));
    assert_eq!(send(&mut g, Val::str("go")), Val::Int(1));

    let mut h = g.copy();
    assert_eq!(send(&mut g, Val::str("stop")), Val::str("done"));
    assert_eq!(send(&mut h, Val::str("go")), Val::Int(2));
}

#[test]
fn test_yield_in_except_filter() {
    let source = "def g():
    try:
        raise KeyError('k')
    except (yield 'filter'):
        yield 'handled'
";
    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::str("filter"));
    let mut h = g.copy();

    assert_eq!(send(&mut g, Val::Builtin("KeyError".to_string())), Val::str("handled"));

    let err = h.send(Val::Builtin("ValueError".to_string())).unwrap_err();
    assert_eq!(err.exception().map(|e| e.kind.as_str()), Some("KeyError"));
}

#[test]
fn test_yield_in_triple_quoted_fstring() {
    let source = "def g(name):
    text = f\"\"\"hello {(yield name)} and {name}\"\"\"
    yield text
";
    let mut g = start(source, vec![Val::str("ada")]);
    assert_eq!(advance(&mut g), Val::str("ada"));
    assert_eq!(send(&mut g, Val::str("bob")), Val::str("hello bob and ada"));
}

#[test]
fn test_walrus_over_a_yield_keeps_the_argument_stack_in_order() {
    let source = "def g():
    xs = [(n := (yield 1)), n, (yield 2)]
    yield xs
";
    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::Int(1));
    assert_eq!(send(&mut g, Val::Int(7)), Val::Int(2));
    assert_eq!(send(&mut g, Val::Int(8)), Val::List(ints(&[7, 7, 8])));
}

#[test]
fn test_yields_inside_ternary_arms_and_condition() {
    let source = "def g():
    for i in range(2):
        v = (yield 'a') if i % 2 else (yield 'b')
        w = 'x' if (yield 'c') else 'y'
        yield v, w
";
    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::str("b"));
    assert_eq!(send(&mut g, Val::str("s1")), Val::str("c"));
    assert_eq!(send(&mut g, Val::None), Val::Tuple(vec![Val::str("s1"), Val::str("y")]));

    let h = g.copy();
    assert_eq!(advance(&mut g), Val::str("a"));
    assert_eq!(send(&mut g, Val::str("s2")), Val::str("c"));
    assert_eq!(send(&mut g, Val::Bool(true)), Val::Tuple(vec![Val::str("s2"), Val::str("x")]));
    assert_eq!(g.next_value().unwrap(), GeneratorState::Complete(Val::None));
    assert_eq!(rest(h), vec![Val::str("a"), Val::str("c"), Val::Tuple(vec![Val::None, Val::str("y")])]);
}

#[test]
fn test_nested_loops_paused_on_inner_line() {
    let source = "def g():
    for i in range(3):
        for j in range(3):
            if j == 1:
                continue
            if i == 1:
                break
            yield i, j
        yield 'row', i
";
    let expected = vec![pair(0, 0), pair(0, 2), row(0), row(1), pair(2, 0), pair(2, 2), row(2)];
    assert_eq!(rest(start(source, Vec::new())), expected);

    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), pair(0, 0));
    let h = g.copy();
    assert_eq!(rest(h), expected[1..].to_vec());
    assert_eq!(rest(g), expected[1..].to_vec());
}

#[test]
fn test_paused_in_try_whose_handler_never_ran() {
    let source = "def g():
    try:
        yield 1
    except ValueError:
        yield 'handler'
    yield 2
";
    let mut g = start(source, Vec::new());
    assert_eq!(advance(&mut g), Val::Int(1));
    assert_eq!(rest(g.copy()), ints(&[2]));

    let state = g.throw(cadence_core::ExcVal::message("ValueError", "boom")).unwrap();
    assert_eq!(state, GeneratorState::Yielded(Val::str("handler")));
}

#[test]
fn test_body_that_never_yields() {
    let mut g = start("def g():\n    if False:\n        yield 1\n    return 'nothing'\n", Vec::new());
    assert_eq!(g.next_value().unwrap(), GeneratorState::Complete(Val::str("nothing")));
    assert!(g.is_closed());
}

/* ===================== Invariants ===================== */

#[test]
fn test_close_twice_and_throw_after_close() {
    let mut g = start("def g(): yield 1; yield 2", Vec::new());
    advance(&mut g);
    g.close().unwrap();
    g.close().unwrap();
    assert_eq!(
        g.throw(cadence_core::ExcVal::message("ValueError", "x")).unwrap(),
        GeneratorState::Complete(Val::None)
    );
}

#[test]
fn test_image_rejects_modified_source() {
    let mut g = start("def g(): yield 1; yield 2", Vec::new());
    advance(&mut g);

    let json = serde_json::to_string(&g).unwrap().replace("yield 2", "yield 3");
    let err = serde_json::from_str::<Generator>(&json).unwrap_err();
    assert!(err.to_string().contains("fingerprint"));
}

#[test]
fn test_misuse_is_not_a_user_exception() {
    let mut g = start("def g(): yield 1", Vec::new());
    assert!(matches!(g.send(Val::Int(1)), Err(EngineError::ProgrammerMisuse(_))));
}

#[test]
fn test_async_generator_surface() {
    let source = "async def ticks(n):
    for i in range(n):
        await i
        yield i
";
    let mut ticks = AsyncGenerator::new(source, vec![Val::Int(2)], Vec::new()).unwrap();
    let values: Vec<Option<Val>> = (0..3).map(|_| tokio_test::block_on(ticks.anext()).unwrap()).collect();
    assert_eq!(values, vec![Some(Val::Int(0)), Some(Val::Int(1)), None]);
}
