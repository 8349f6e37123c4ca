use super::*;
use crate::errors::EngineError;

fn program(source: &str) -> NormalizedProgram {
    normalize_with_width(source, 4).unwrap()
}

fn lines(source: &str) -> Vec<String> {
    program(source).lines
}

#[test]
fn test_one_line_body_is_split_at_semicolons() {
    let program = program("def g(): yield 1; yield 2; yield 3");

    assert_eq!(program.signature.name, "g");
    assert_eq!(program.lines, vec!["    return 1", "    return 2", "    return 3"]);
    assert_eq!(program.line_map, vec![1, 1, 1]);
    assert!(program.loop_spans.is_empty());
}

#[test]
fn test_for_loop_reads_from_tracked_slot() {
    let program = program(
        "def g(n):
    total = 0
    for i in range(n):
        total += i
        yield total
    return total
",
    );

    assert_eq!(
        program.lines,
        vec![
            "    total = 0",
            "    .4 = iter(range(n))",
            "    for i in .4:",
            "        total += i",
            "        return total",
            "    return Termination(total)",
        ]
    );
    assert_eq!(program.loop_spans, vec![(2, 4)]);
    assert_eq!(program.line_map, vec![2, 3, 3, 4, 5, 6]);
    assert!(program.is_suspension(4));
    assert!(!program.is_suspension(5));
}

#[test]
fn test_suspending_while_condition_is_replayed() {
    assert_eq!(
        lines(
            "def g():
    while (yield 0):
        if x:
            continue
        y = 1
"
        ),
        vec![
            "    return 0",
            "    .args += [.send]",
            "    while (.args.pop(0)):",
            "        if x:",
            "            return 0",
            "            .args += [.send]",
            "            continue",
            "        y = 1",
            "        return 0",
            "        .args += [.send]",
        ]
    );
}

#[test]
fn test_suspending_elif_is_nested_under_else() {
    assert_eq!(
        lines(
            "def g(a):
    if a:
        yield 1
    elif (yield 2):
        yield 3
    else:
        yield 4
    yield 5
"
        ),
        vec![
            "    if a:",
            "        return 1",
            "    else:",
            "        return 2",
            "        .args += [.send]",
            "        if (.args.pop(0)):",
            "            return 3",
            "        else:",
            "            return 4",
            "    return 5",
        ]
    );
}

#[test]
fn test_yield_from_statement_becomes_a_loop() {
    let program = program("def g():\n    yield from [1, 2]\n");

    assert_eq!(
        program.lines,
        vec!["    .4 = iter([1, 2])", "    for .yielded in .4:", "        return .yielded"]
    );
    assert_eq!(program.loop_spans, vec![(1, 2)]);
}

#[test]
fn test_suspending_except_filter() {
    assert_eq!(
        lines(
            "def g():
    try:
        yield 1
    except (yield 2) as e:
        yield 3
    finally:
        yield 4
"
        ),
        vec![
            "    try:",
            "        return 1",
            "    except BaseException:",
            "        return 2",
            "        .args += [.send]",
            "        try:",
            "            raise",
            "        except (.args.pop()) as e:",
            "            return 3",
            "    finally:",
            "        return 4",
        ]
    );
}

#[test]
fn test_suspending_decorator_is_applied_after_the_body() {
    assert_eq!(
        lines(
            "def g():
    @(yield 1)
    def f():
        return 2
    yield f
"
        ),
        vec![
            "    return 1",
            "    .args += [.send]",
            "    .decorator += [(.args.pop(0))]",
            "    def f():",
            "        return 2",
            "    f = .decorator.pop()(f)",
            "    return f",
        ]
    );
}

#[test]
fn test_plain_decorator_is_kept() {
    assert_eq!(
        lines("def g():\n    @wrap\n    def f(x=1): return x\n    yield f\n"),
        vec!["    @wrap", "    def f(x=1):", "        return x", "    return f"]
    );
}

#[test]
fn test_assignment_from_yield() {
    assert_eq!(
        lines("def g():\n    x = yield\n    a, b = yield 1, yield 2\n"),
        vec![
            "    return None",
            "    .args += [.send]",
            "    x = .args.pop(0)",
            "    return 1",
            "    .args += [.send]",
            "    return 2",
            "    .args += [.send]",
            "    a, b = .args.pop(0), .args.pop(0)",
        ]
    );
}

#[test]
fn test_lambda_default_is_unpacked() {
    assert_eq!(
        lines("def g():\n    h = lambda x=(yield 1): x\n"),
        vec![
            "    return 1",
            "    .args += [.send]",
            "    h = lambda x=(.args.pop(0)): x",
        ]
    );
}

#[test]
fn test_triple_quoted_fstring_interpolation() {
    assert_eq!(
        lines("def g():\n    s = f\"\"\"a {(yield 1)} b\"\"\"\n"),
        vec![
            "    return 1",
            "    .args += [.send]",
            "    s = f\"\"\"a {(.args.pop(0))} b\"\"\"",
        ]
    );
}

#[test]
fn test_comments_continuations_and_annotations() {
    let program = program(
        "def g(a):  # header
    # a comment
    x: int = a + \\
        1
    y: str
    nonlocal z
    yield x  # trailing
",
    );

    assert_eq!(program.lines, vec!["    x = a + 1", "    return x"]);
    assert_eq!(program.line_map, vec![3, 7]);
}

#[test]
fn test_nested_loops_are_strictly_nested() {
    let program = program(
        "def g():
    for i in range(3):
        for j in range(3):
            if j == 1:
                break
            yield i, j
        yield i
",
    );

    assert_eq!(program.loop_spans.len(), 2);
    let (outer, inner) = (program.loop_spans[0], program.loop_spans[1]);
    assert!(outer.0 < inner.0 && inner.1 <= outer.1);
    assert_eq!(program.text_of(outer.0), "for i in .4:");
    assert_eq!(program.text_of(inner.0), "for j in .8:");
    assert_eq!(program.enclosing_loops(inner.0 + 1), vec![outer, inner]);
}

#[test]
fn test_normalization_is_deterministic() {
    let source = "def g(a):\n    yield a\n    x = (yield a + 1) * 2\n";
    let first = program(source);
    let second = program(source);

    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.fingerprint().len(), 64);
}

#[test]
fn test_yield_inside_comprehension_is_rejected() {
    let err = normalize_with_width("def g():\n    x = [(yield i) for i in y]\n", 4).unwrap_err();
    assert_eq!(
        err,
        EngineError::UnsupportedConstruct {
            line: 2,
            construct: "yield inside a comprehension".to_string()
        }
    );
}

#[test]
fn test_source_must_define_a_function() {
    assert!(matches!(
        normalize_with_width("class C:\n    pass\n", 4),
        Err(EngineError::UnsupportedConstruct { line: 1, .. })
    ));
    assert!(matches!(
        normalize_with_width("# nothing here\n", 4),
        Err(EngineError::SourceUnavailable(_))
    ));
}

#[test]
fn test_suspensions_on_a_source_line() {
    let program = program("def g(): yield 1; yield 2\n");
    assert_eq!(program.suspensions_on(1), vec![0, 1]);
    assert!(program.suspensions_on(2).is_empty());
}
