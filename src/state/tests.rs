use super::*;
use crate::interpreter::types::IterState;
use crate::rewrite::Signature;

fn program(lines: &[&str], loop_spans: Vec<LoopSpan>) -> NormalizedProgram {
    NormalizedProgram {
        signature: Signature {
            name: "g".to_string(),
            header: "def g():".to_string(),
            decorators: Vec::new(),
            is_async: false,
            line: 1,
        },
        lines: lines.iter().map(|l| l.to_string()).collect(),
        loop_spans,
        line_map: (0..lines.len()).map(|i| i + 2).collect(),
        source: String::new(),
        indent_width: 4,
    }
}

fn resumed_after(program: &NormalizedProgram, index: usize) -> Cursor {
    let mut cursor = Cursor::start(Env::new());
    cursor.advance_past(program, index);
    cursor
}

const SUMMING_LOOP: &[&str] = &[
    "    total = 0",
    "    .4 = iter(range(n))",
    "    for i in .4:",
    "        total += i",
    "        return total",
    "    return Termination(total)",
];

#[test]
fn test_fresh_cursor_copies_the_whole_program() {
    let program = program(SUMMING_LOOP, vec![(2, 4)]);
    let block = synthesize(&program, &Cursor::start(Env::new())).unwrap();

    assert_eq!(block.body, program.lines);
    assert_eq!(block.cursor_map, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(block.entry, Entry { index: 0, indent: 4 });
}

#[test]
fn test_resuming_at_loop_end_reenters_the_loop() {
    let program = program(SUMMING_LOOP, vec![(2, 4)]);
    let cursor = resumed_after(&program, 4);
    assert_eq!(cursor.active_loops, vec![(2, 4)]);
    assert_eq!(cursor.suspension_index(), Some(4));

    let block = synthesize(&program, &cursor).unwrap();
    assert_eq!(
        block.body,
        vec![
            "    for i in .4:",
            "        total += i",
            "        return total",
            "    return Termination(total)",
        ]
    );
    assert_eq!(block.cursor_map, vec![2, 3, 4, 5]);
}

#[test]
fn test_break_in_rest_of_iteration_uses_single_pass_wrapper() {
    let program = program(
        &[
            "    .4 = iter(range(3))",
            "    for i in .4:",
            "        return i",
            "        if i == 1:",
            "            break",
            "    return 'done'",
        ],
        vec![(1, 4)],
    );
    let block = synthesize(&program, &resumed_after(&program, 2)).unwrap();

    assert_eq!(
        block.body,
        vec![
            "    .continue4 = True",
            "    for .once in (None,):",
            "        if i == 1:",
            "            .continue4 = False",
            "            break",
            "    if .continue4:",
            "        for i in .4:",
            "            return i",
            "            if i == 1:",
            "                break",
            "    return 'done'",
        ]
    );
    assert_eq!(block.cursor_map, vec![1, 1, 3, 4, 4, 1, 1, 2, 3, 4, 5]);
    assert_eq!(block.entry, Entry { index: 2, indent: 8 });
}

#[test]
fn test_try_body_is_rewrapped() {
    let program = program(
        &[
            "    try:",
            "        return 1",
            "        x = 2",
            "    except ValueError:",
            "        x = 3",
            "    return x",
        ],
        Vec::new(),
    );
    let block = synthesize(&program, &resumed_after(&program, 1)).unwrap();

    assert_eq!(
        block.body,
        vec![
            "    try:",
            "        x = 2",
            "    except ValueError:",
            "        x = 3",
            "    return x",
        ]
    );
    assert_eq!(block.cursor_map, vec![0, 2, 3, 4, 5]);
    assert_eq!(block.entry, Entry { index: 1, indent: 8 });
}

#[test]
fn test_later_branches_are_skipped() {
    let program = program(
        &[
            "    if a:",
            "        return 1",
            "        b = 1",
            "    else:",
            "        b = 2",
            "    return b",
        ],
        Vec::new(),
    );
    let block = synthesize(&program, &resumed_after(&program, 1)).unwrap();

    assert_eq!(block.body, vec!["    b = 1", "    return b"]);
    assert_eq!(block.cursor_map, vec![2, 5]);
}

#[test]
fn test_resuming_past_the_last_line_gives_an_empty_block() {
    let program = program(&["    return 1"], Vec::new());
    let block = synthesize(&program, &resumed_after(&program, 0)).unwrap();

    assert!(block.is_empty());
    assert_eq!(block.entry.index, 0);
}

#[test]
fn test_yieldfrom_reads_the_delegating_slot() {
    let program = program(
        &["    .4 = iter(inner)", "    for .yielded in .4:", "        return .yielded"],
        vec![(1, 2)],
    );
    let mut cursor = resumed_after(&program, 2);
    let inner = Val::Iter(Box::new(IterState::over(vec![Val::Int(1)])));
    cursor.scratch.set(SlotKey::Tracked(4), inner.clone());

    assert_eq!(cursor.yieldfrom(&program), Some(&inner));
    assert_eq!(Cursor::start(Env::new()).yieldfrom(&program), None);
}

#[test]
fn test_cursor_round_trips_through_json() {
    let program = program(SUMMING_LOOP, vec![(2, 4)]);
    let mut cursor = resumed_after(&program, 4);
    cursor.locals.insert("total".to_string(), Val::Int(3));

    let json = serde_json::to_string(&cursor).unwrap();
    let back: Cursor = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cursor);
}
