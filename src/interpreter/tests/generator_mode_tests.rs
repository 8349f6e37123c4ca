//! Generator-mode execution: scratch slots, suspension and tracked loops

use maplit::btreemap;

use super::helpers::{block, ints};
use crate::interpreter::parse_block;
use crate::interpreter::types::{ExecResult, IterState};
use crate::interpreter::{Env, Flow, Machine, Scratch, SlotKey, Unwind, Val};

fn run_state(source: &str, env: Env, scratch: &mut Scratch) -> (ExecResult, Env) {
    let nodes = parse_block(&block(source)).expect("parse failed");
    let mut machine = Machine::for_generator(env, scratch, 0);
    let result = machine.run(&nodes);
    (result, machine.into_parts().0)
}

fn suspended(result: ExecResult) -> Val {
    match result {
        Ok(Flow::Suspend { value, .. }) => value,
        other => panic!("expected a suspension, got {:?}", other),
    }
}

#[test]
fn test_return_suspends_unless_terminating() {
    let mut scratch = Scratch::default();
    let (result, _) = run_state("    return 1", Env::new(), &mut scratch);
    assert_eq!(suspended(result), Val::Int(1));

    let (result, _) = run_state("    return Termination(2)", Env::new(), &mut scratch);
    assert_eq!(result, Ok(Flow::Return(Val::Termination(Box::new(Val::Int(2))))));
}

#[test]
fn test_send_value_flows_through_argument_stack() {
    let mut scratch = Scratch::default();
    scratch.set(SlotKey::Send, Val::Int(5));
    let (result, env) = run_state(
        "    .args += [.send]
    x = .args.pop(0)
    return x * 2",
        Env::new(),
        &mut scratch,
    );
    assert_eq!(suspended(result), Val::Int(10));
    assert_eq!(env["x"], Val::Int(5));
    assert_eq!(scratch.get(SlotKey::Args), Some(&Val::List(vec![])));
    assert_eq!(scratch.get(SlotKey::Send), None);
}

#[test]
fn test_tracked_loop_advances_slot_in_place() {
    let mut scratch = Scratch::default();
    scratch.set(SlotKey::Tracked(4), Val::Iter(Box::new(IterState::over(vec![Val::Int(1), Val::Int(2), Val::Int(3)]))));
    let source = "    for i in .4:
        return i
    return Termination(None)";

    let (result, _) = run_state(source, Env::new(), &mut scratch);
    assert_eq!(suspended(result), Val::Int(1));
    match scratch.get(SlotKey::Tracked(4)) {
        Some(Val::Iter(state)) => assert_eq!(state.remaining(), vec![Val::Int(2), Val::Int(3)]),
        other => panic!("slot lost its iterator: {:?}", other),
    }

    let (result, _) = run_state(source, Env::new(), &mut scratch);
    assert_eq!(suspended(result), Val::Int(2));
}

#[test]
fn test_tracked_slot_holding_a_sequence_is_converted() {
    let mut scratch = Scratch::default();
    scratch.set(SlotKey::Tracked(4), ints(&[7, 8]));
    let (result, _) = run_state("    for i in .4:\n        return i", Env::new(), &mut scratch);
    assert_eq!(suspended(result), Val::Int(7));
    assert!(matches!(scratch.get(SlotKey::Tracked(4)), Some(Val::Iter(_))));
}

#[test]
fn test_suspension_skips_finally() {
    let mut scratch = Scratch::default();
    let (result, env) = run_state(
        "    try:
        return 1
    finally:
        cleaned = True",
        Env::new(),
        &mut scratch,
    );
    assert_eq!(suspended(result), Val::Int(1));
    assert!(!env.contains_key("cleaned"));
}

#[test]
fn test_handler_entry_clears_argument_stack() {
    let mut scratch = Scratch::default();
    scratch.set(SlotKey::Args, ints(&[1, 2]));
    let (result, _) = run_state(
        "    try:
        raise KeyError('k')
    except KeyError:
        return len(.args)",
        Env::new(),
        &mut scratch,
    );
    assert_eq!(suspended(result), Val::Int(0));
}

#[test]
fn test_suspension_inside_handler_records_the_exception() {
    let mut scratch = Scratch::default();
    let nodes = parse_block(&block(
        "    try:
        raise ValueError('v')
    except ValueError:
        return 'handling'",
    ))
    .unwrap();
    let mut machine = Machine::for_generator(Env::new(), &mut scratch, 0);
    let result = machine.run(&nodes);
    let (_, handled) = machine.into_parts();

    assert_eq!(suspended(result), Val::str("handling"));
    assert_eq!(handled.map(|e| e.kind), Some("ValueError".to_string()));
}

#[test]
fn test_handled_exception_is_reraised_after_resumption() {
    let mut scratch = Scratch::default();
    scratch.set_handled(Some(crate::interpreter::ExcVal::message("KeyError", "k")));
    let (result, _) = run_state("    raise", Env::new(), &mut scratch);
    match result {
        Err(Unwind::Raise { exc, .. }) => assert_eq!(exc.kind, "KeyError"),
        other => panic!("expected KeyError, got {:?}", other),
    }
}

#[test]
fn test_decorator_slot_applies_after_definition() {
    let mut scratch = Scratch::default();
    let env = btreemap! {
        "wrap".to_string() => Val::Builtin("list".to_string()),
    };
    let (result, env) = run_state(
        "    .decorator += [wrap]
    def f():
        return 1
    f = .decorator.pop()('ab')
    return f",
        env,
        &mut scratch,
    );
    assert_eq!(suspended(result), Val::List(vec![Val::str("a"), Val::str("b")]));
    assert!(env.contains_key("f"));
    assert_eq!(scratch.get(SlotKey::Decorator), Some(&Val::List(vec![])));
}

#[test]
fn test_scratch_slot_outside_generator_is_an_error() {
    let nodes = parse_block(&block("x = .args")).unwrap();
    let mut machine = Machine::new(Env::new());
    assert!(matches!(machine.run(&nodes), Err(Unwind::Raise { .. })));
}

#[test]
fn test_walrus_pop_pushes_back_without_duplicates() {
    let mut scratch = Scratch::default();
    scratch.set(SlotKey::Args, ints(&[7]));
    let (result, env) = run_state(
        "    .args += [(n := (.args.pop()))]
    .args += [(.args.pop())]
    return .args",
        Env::new(),
        &mut scratch,
    );
    assert_eq!(suspended(result), ints(&[7]));
    assert_eq!(env["n"], Val::Int(7));
}
