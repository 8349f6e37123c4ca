//! Operators on runtime values
//!
//! Arithmetic follows host semantics for `int`/`float`/`bool` mixing, floor
//! division and modulo sign rules. Integers are 64-bit; overflow raises
//! `OverflowError` instead of promoting.

use std::cmp::Ordering;

use super::format::{format_value, repr, to_str};
use super::types::{BinOp, CmpOp, EvalResult, IterState, RangeVal, Unwind, UnaryOp, Val, MAX_SEQUENCE_LEN};

/* ===================== Numbers ===================== */

enum Num {
    Int(i64),
    Float(f64),
}

fn num(value: &Val) -> Option<Num> {
    match value {
        Val::Int(n) => Some(Num::Int(*n)),
        Val::Bool(b) => Some(Num::Int(*b as i64)),
        Val::Float(f) => Some(Num::Float(*f)),
        _ => None,
    }
}

fn as_float(n: &Num) -> f64 {
    match n {
        Num::Int(i) => *i as f64,
        Num::Float(f) => *f,
    }
}

fn overflow() -> Unwind {
    Unwind::raise("OverflowError", "integer overflow")
}

fn zero_division(what: &str) -> Unwind {
    Unwind::raise("ZeroDivisionError", what)
}

fn unsupported(op: BinOp, lhs: &Val, rhs: &Val) -> Unwind {
    Unwind::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

fn int_op(op: BinOp, a: i64, b: i64) -> EvalResult {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(zero_division("division by zero"));
            }
            return Ok(Val::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(zero_division("integer division or modulo by zero"));
            }
            floor_div(a, b)
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(zero_division("integer modulo by zero"));
            }
            floor_mod(a, b)
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(zero_division("0.0 cannot be raised to a negative power"));
                }
                return Ok(Val::Float((a as f64).powf(b as f64)));
            }
            u32::try_from(b).ok().and_then(|e| a.checked_pow(e))
        }
        BinOp::LShift => {
            if b < 0 {
                return Err(Unwind::raise("ValueError", "negative shift count"));
            }
            u32::try_from(b)
                .ok()
                .and_then(|s| a.checked_shl(s))
                .filter(|r| *r >> b.min(63) == a)
        }
        BinOp::RShift => {
            if b < 0 {
                return Err(Unwind::raise("ValueError", "negative shift count"));
            }
            Some(a >> b.min(63))
        }
        BinOp::BitAnd => Some(a & b),
        BinOp::BitOr => Some(a | b),
        BinOp::BitXor => Some(a ^ b),
        BinOp::MatMul => None,
    };
    match (op, result) {
        (BinOp::MatMul, _) => Err(unsupported(op, &Val::Int(a), &Val::Int(b))),
        (_, Some(n)) => Ok(Val::Int(n)),
        (_, None) => Err(overflow()),
    }
}

fn float_op(op: BinOp, a: f64, b: f64, lhs: &Val, rhs: &Val) -> EvalResult {
    Ok(Val::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero_division("float division by zero"));
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero_division("float modulo"));
            }
            float_mod(a, b)
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(zero_division("0.0 cannot be raised to a negative power"));
            }
            a.powf(b)
        }
        _ => return Err(unsupported(op, lhs, rhs)),
    }))
}

/// Length of `unit` repeated `times` times, refusing results past the size cap
pub(crate) fn repeated_len(unit: usize, times: i64) -> Result<usize, Unwind> {
    let times = usize::try_from(times.max(0))
        .map_err(|_| Unwind::raise("OverflowError", "cannot fit 'int' into an index-sized integer"))?;
    let total = unit.checked_mul(times).ok_or_else(|| Unwind::raise("OverflowError", "repeated sequence is too long"))?;
    if total > MAX_SEQUENCE_LEN {
        return Err(Unwind::raise("MemoryError", format!("cannot build a sequence of {} items", total)));
    }
    Ok(total)
}

fn repeat(items: &[Val], times: i64) -> Result<Vec<Val>, Unwind> {
    let total = repeated_len(items.len(), times)?;
    Ok(items.iter().cycle().take(total).cloned().collect())
}

/* ===================== Binary and Unary ===================== */

/// `lhs <op> rhs`
pub fn binary(op: BinOp, lhs: &Val, rhs: &Val) -> EvalResult {
    if let (Some(a), Some(b)) = (num(lhs), num(rhs)) {
        return match (a, b) {
            (Num::Int(a), Num::Int(b)) => int_op(op, a, b),
            (a, b) => float_op(op, as_float(&a), as_float(&b), lhs, rhs),
        };
    }

    match (op, lhs, rhs) {
        (BinOp::Add, Val::Str(a), Val::Str(b)) => Ok(Val::Str(format!("{}{}", a, b))),
        (BinOp::Add, Val::List(a), Val::List(b)) => Ok(Val::List([a.as_slice(), b.as_slice()].concat())),
        (BinOp::Add, Val::Tuple(a), Val::Tuple(b)) => Ok(Val::Tuple([a.as_slice(), b.as_slice()].concat())),
        (BinOp::Mul, Val::Str(s), other) | (BinOp::Mul, other, Val::Str(s)) => match num(other) {
            Some(Num::Int(n)) => {
                repeated_len(s.len(), n)?;
                Ok(Val::Str(s.repeat(n.max(0) as usize)))
            }
            _ => Err(Unwind::type_error(format!(
                "can't multiply sequence by non-int of type '{}'",
                other.type_name()
            ))),
        },
        (BinOp::Mul, Val::List(items), other) | (BinOp::Mul, other, Val::List(items)) => match num(other) {
            Some(Num::Int(n)) => Ok(Val::List(repeat(items, n)?)),
            _ => Err(unsupported(op, lhs, rhs)),
        },
        (BinOp::Mul, Val::Tuple(items), other) | (BinOp::Mul, other, Val::Tuple(items)) => match num(other) {
            Some(Num::Int(n)) => Ok(Val::Tuple(repeat(items, n)?)),
            _ => Err(unsupported(op, lhs, rhs)),
        },
        (BinOp::Mod, Val::Str(template), args) => percent_format(template, args),
        (BinOp::BitOr, Val::Dict(a), Val::Dict(b)) => {
            let mut merged = Val::Dict(a.clone());
            for (k, v) in b {
                set_item(&mut merged, k.clone(), v.clone())?;
            }
            Ok(merged)
        }
        _ => Err(unsupported(op, lhs, rhs)),
    }
}

pub fn unary(op: UnaryOp, operand: &Val) -> EvalResult {
    match (op, num(operand)) {
        (UnaryOp::Not, _) => Ok(Val::Bool(!operand.is_truthy())),
        (UnaryOp::Neg, Some(Num::Int(n))) => n.checked_neg().map(Val::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Some(Num::Float(f))) => Ok(Val::Float(-f)),
        (UnaryOp::Pos, Some(Num::Int(n))) => Ok(Val::Int(n)),
        (UnaryOp::Pos, Some(Num::Float(f))) => Ok(Val::Float(f)),
        (UnaryOp::Invert, Some(Num::Int(n))) => Ok(Val::Int(!n)),
        _ => {
            let symbol = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                _ => "~",
            };
            Err(Unwind::type_error(format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                operand.type_name()
            )))
        }
    }
}

/// `"%s and %5.2f" % args`
fn percent_format(template: &str, args: &Val) -> EvalResult {
    let values: Vec<Val> = match args {
        Val::Tuple(items) => items.clone(),
        other => vec![other.clone()],
    };
    let mut values = values.into_iter();
    let mut out = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut flags = String::new();
        let code = loop {
            match chars.next() {
                Some(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | ' ') => flags.push(c),
                Some(c) => break c,
                None => return Err(Unwind::raise("ValueError", "incomplete format")),
            }
        };
        if code == '%' && flags.is_empty() {
            out.push('%');
            continue;
        }
        let value = values
            .next()
            .ok_or_else(|| Unwind::type_error("not enough arguments for format string"))?;
        let (value, kind) = match code {
            's' => (Val::Str(to_str(&value)), 's'),
            'r' => (Val::Str(repr(&value)), 's'),
            'd' | 'i' => match num(&value) {
                Some(Num::Int(n)) => (Val::Int(n), 'd'),
                Some(Num::Float(f)) => (Val::Int(f.trunc() as i64), 'd'),
                None => {
                    return Err(Unwind::type_error(format!(
                        "%d format: a real number is required, not {}",
                        value.type_name()
                    )))
                }
            },
            'f' => match num(&value) {
                Some(n) => (Val::Float(as_float(&n)), 'f'),
                None => return Err(Unwind::type_error("must be real number")),
            },
            other => {
                return Err(Unwind::raise(
                    "ValueError",
                    format!("unsupported format character '{}'", other),
                ))
            }
        };
        // `%-5s` pads on the right; strings are otherwise right-aligned
        let left = flags.contains('-');
        let flags = flags.replace('-', "");
        let align = if left {
            "<"
        } else if kind == 's' {
            ">"
        } else {
            ""
        };
        let spec = format!("{}{}{}", align, flags, kind);
        let text = format_value(&value, &spec).map_err(|m| Unwind::raise("ValueError", m))?;
        out.push_str(&text);
    }
    if values.next().is_some() {
        return Err(Unwind::type_error("not all arguments converted during string formatting"));
    }
    Ok(Val::Str(out))
}

/* ===================== Comparison ===================== */

/// Host `==`: numbers compare across `bool`/`int`/`float`
pub fn equals(a: &Val, b: &Val) -> bool {
    if let (Some(x), Some(y)) = (num(a), num(b)) {
        return match (x, y) {
            (Num::Int(x), Num::Int(y)) => x == y,
            (x, y) => as_float(&x) == as_float(&y),
        };
    }
    match (a, b) {
        (Val::List(x), Val::List(y)) | (Val::Tuple(x), Val::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| equals(p, q))
        }
        (Val::Dict(x), Val::Dict(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| lookup(y, k).map_or(false, |other| equals(v, other)))
        }
        _ => a == b,
    }
}

/// Host `is`; values are copied, so identity is approximated by equality of
/// the same type
fn identical(a: &Val, b: &Val) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b) && a == b
}

pub fn ordering(a: &Val, b: &Val, symbol: &str) -> Result<Ordering, Unwind> {
    if let (Some(x), Some(y)) = (num(a), num(b)) {
        return match (x, y) {
            (Num::Int(x), Num::Int(y)) => Ok(x.cmp(&y)),
            (x, y) => Ok(as_float(&x).partial_cmp(&as_float(&y)).unwrap_or(Ordering::Equal)),
        };
    }
    match (a, b) {
        (Val::Str(x), Val::Str(y)) => Ok(x.cmp(y)),
        (Val::List(x), Val::List(y)) | (Val::Tuple(x), Val::Tuple(y)) => {
            for (p, q) in x.iter().zip(y) {
                if !equals(p, q) {
                    return ordering(p, q, symbol);
                }
            }
            Ok(x.len().cmp(&y.len()))
        }
        _ => Err(Unwind::type_error(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            symbol,
            a.type_name(),
            b.type_name()
        ))),
    }
}

pub fn compare(op: CmpOp, a: &Val, b: &Val) -> Result<bool, Unwind> {
    Ok(match op {
        CmpOp::Eq => equals(a, b),
        CmpOp::NotEq => !equals(a, b),
        CmpOp::Lt => ordering(a, b, "<")? == Ordering::Less,
        CmpOp::LtE => ordering(a, b, "<=")? != Ordering::Greater,
        CmpOp::Gt => ordering(a, b, ">")? == Ordering::Greater,
        CmpOp::GtE => ordering(a, b, ">=")? != Ordering::Less,
        CmpOp::In => contains(b, a)?,
        CmpOp::NotIn => !contains(b, a)?,
        CmpOp::Is => identical(a, b),
        CmpOp::IsNot => !identical(a, b),
    })
}

/// `item in container`
pub fn contains(container: &Val, item: &Val) -> Result<bool, Unwind> {
    match container {
        Val::List(items) | Val::Tuple(items) => Ok(items.iter().any(|v| equals(v, item))),
        Val::Dict(pairs) => Ok(lookup(pairs, item).is_some()),
        Val::Str(s) => match item {
            Val::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(Unwind::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Val::Range(range) => Ok(match num(item) {
            Some(Num::Int(n)) => range.step != 0 && range.contains(n),
            _ => false,
        }),
        Val::Iter(state) => Ok(state.remaining().iter().any(|v| equals(v, item))),
        other => Err(Unwind::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/* ===================== Containers ===================== */

pub fn lookup<'a>(pairs: &'a [(Val, Val)], key: &Val) -> Option<&'a Val> {
    pairs.iter().find(|(k, _)| equals(k, key)).map(|(_, v)| v)
}

pub fn check_hashable(key: &Val) -> Result<(), Unwind> {
    match key {
        Val::List(_) | Val::Dict(_) => Err(Unwind::type_error(format!("unhashable type: '{}'", key.type_name()))),
        Val::Tuple(items) => items.iter().try_for_each(check_hashable),
        _ => Ok(()),
    }
}

fn int_index(index: &Val, what: &str) -> Result<i64, Unwind> {
    match num(index) {
        Some(Num::Int(n)) => Ok(n),
        _ => Err(Unwind::type_error(format!(
            "{} indices must be integers, not {}",
            what,
            index.type_name()
        ))),
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let at = if index < 0 { index + len } else { index };
    (0..len).contains(&at).then_some(at as usize)
}

/// `container[index]` for non-slice indices
pub fn get_item(container: &Val, index: &Val) -> EvalResult {
    match container {
        Val::List(items) | Val::Tuple(items) => {
            let what = container.type_name();
            let at = int_index(index, what)?;
            normalize_index(at, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| Unwind::raise("IndexError", format!("{} index out of range", what)))
        }
        Val::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let at = int_index(index, "string")?;
            normalize_index(at, chars.len())
                .map(|i| Val::Str(chars[i].to_string()))
                .ok_or_else(|| Unwind::raise("IndexError", "string index out of range"))
        }
        Val::Range(range) => {
            let at = int_index(index, "range")?;
            normalize_index(at, range.len())
                .and_then(|i| range.get(i))
                .map(Val::Int)
                .ok_or_else(|| Unwind::raise("IndexError", "range object index out of range"))
        }
        Val::Dict(pairs) => {
            check_hashable(index)?;
            lookup(pairs, index)
                .cloned()
                .ok_or_else(|| Unwind::exc(super::types::ExcVal::new("KeyError", vec![index.clone()])))
        }
        other => Err(Unwind::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Positions selected by `[lo:hi:step]` on a sequence of `len` items
pub fn slice_positions(len: usize, lo: Option<i64>, hi: Option<i64>, step: Option<i64>) -> Result<Vec<usize>, Unwind> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Unwind::raise("ValueError", "slice step cannot be zero"));
    }
    let len = len as i64;
    let clamp = |bound: i64, low: i64, high: i64| {
        let at = if bound < 0 { bound + len } else { bound };
        at.clamp(low, high)
    };

    let mut out = Vec::new();
    if step > 0 {
        let start = lo.map_or(0, |b| clamp(b, 0, len));
        let stop = hi.map_or(len, |b| clamp(b, 0, len));
        let mut i = start;
        while i < stop {
            out.push(i as usize);
            i += step;
        }
    } else {
        let start = lo.map_or(len - 1, |b| clamp(b, -1, len - 1));
        let stop = hi.map_or(-1, |b| clamp(b, -1, len - 1));
        let mut i = start;
        while i > stop {
            out.push(i as usize);
            i += step;
        }
    }
    Ok(out)
}

pub fn get_slice(container: &Val, lo: Option<i64>, hi: Option<i64>, step: Option<i64>) -> EvalResult {
    match container {
        Val::List(items) => Ok(Val::List(
            slice_positions(items.len(), lo, hi, step)?.into_iter().map(|i| items[i].clone()).collect(),
        )),
        Val::Tuple(items) => Ok(Val::Tuple(
            slice_positions(items.len(), lo, hi, step)?.into_iter().map(|i| items[i].clone()).collect(),
        )),
        Val::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Val::Str(
                slice_positions(chars.len(), lo, hi, step)?.into_iter().map(|i| chars[i]).collect(),
            ))
        }
        Val::Range(range) => {
            let items = range_items(range)?;
            Ok(Val::List(
                slice_positions(items.len(), lo, hi, step)?.into_iter().map(|i| items[i].clone()).collect(),
            ))
        }
        other => Err(Unwind::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `container[index] = value`
pub fn set_item(container: &mut Val, index: Val, value: Val) -> Result<(), Unwind> {
    match container {
        Val::List(items) => {
            let at = int_index(&index, "list")?;
            let i = normalize_index(at, items.len())
                .ok_or_else(|| Unwind::raise("IndexError", "list assignment index out of range"))?;
            items[i] = value;
            Ok(())
        }
        Val::Dict(pairs) => {
            check_hashable(&index)?;
            match pairs.iter_mut().find(|(k, _)| equals(k, &index)) {
                Some((_, slot)) => *slot = value,
                None => pairs.push((index, value)),
            }
            Ok(())
        }
        other => Err(Unwind::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// `container[lo:hi] = items` (contiguous slices only)
pub fn set_slice(container: &mut Val, lo: Option<i64>, hi: Option<i64>, items: Vec<Val>) -> Result<(), Unwind> {
    let Val::List(list) = container else {
        return Err(Unwind::type_error(format!(
            "'{}' object does not support slice assignment",
            container.type_name()
        )));
    };
    let positions = slice_positions(list.len(), lo, hi, None)?;
    let start = match positions.first() {
        Some(&first) => first,
        None => lo.map_or(0, |b| {
            let len = list.len() as i64;
            (if b < 0 { b + len } else { b }).clamp(0, len) as usize
        }),
    };
    list.splice(start..start + positions.len(), items);
    Ok(())
}

/// `del container[index]`
pub fn del_item(container: &mut Val, index: &Val) -> Result<(), Unwind> {
    match container {
        Val::List(items) => {
            let at = int_index(index, "list")?;
            let i = normalize_index(at, items.len())
                .ok_or_else(|| Unwind::raise("IndexError", "list assignment index out of range"))?;
            items.remove(i);
            Ok(())
        }
        Val::Dict(pairs) => match pairs.iter().position(|(k, _)| equals(k, index)) {
            Some(i) => {
                pairs.remove(i);
                Ok(())
            }
            None => Err(Unwind::exc(super::types::ExcVal::new("KeyError", vec![index.clone()]))),
        },
        other => Err(Unwind::type_error(format!(
            "'{}' object doesn't support item deletion",
            other.type_name()
        ))),
    }
}

pub fn del_slice(container: &mut Val, lo: Option<i64>, hi: Option<i64>, step: Option<i64>) -> Result<(), Unwind> {
    let Val::List(list) = container else {
        return Err(Unwind::type_error(format!(
            "'{}' object doesn't support item deletion",
            container.type_name()
        )));
    };
    let mut positions = slice_positions(list.len(), lo, hi, step)?;
    positions.sort_unstable();
    for i in positions.into_iter().rev() {
        list.remove(i);
    }
    Ok(())
}

/// Every value of a range, refusing ranges past the size cap
pub fn range_items(range: &RangeVal) -> Result<Vec<Val>, Unwind> {
    let len = range.len();
    if len > MAX_SEQUENCE_LEN {
        return Err(Unwind::raise("MemoryError", format!("cannot build a sequence of {} items", len)));
    }
    Ok((0..len).filter_map(|i| range.get(i)).map(Val::Int).collect())
}

/// Items of a finite builtin iterable, without running user code
pub fn items_of(value: &Val) -> Option<Vec<Val>> {
    match value {
        Val::List(items) | Val::Tuple(items) => Some(items.clone()),
        Val::Str(s) => Some(s.chars().map(|c| Val::Str(c.to_string())).collect()),
        Val::Dict(pairs) => Some(pairs.iter().map(|(k, _)| k.clone()).collect()),
        Val::Range(range) => range_items(range).ok(),
        Val::Iter(state) => Some(state.remaining()),
        _ => None,
    }
}

/// `iter(value)` for builtin iterables
pub fn iterator_of(value: Val) -> EvalResult {
    match value {
        Val::Iter(_) | Val::Generator(_) => Ok(value),
        Val::Range(range) => Ok(Val::Iter(Box::new(IterState::Range {
            next: range.start,
            stop: range.stop,
            step: range.step,
        }))),
        other => match items_of(&other) {
            Some(items) => Ok(Val::Iter(Box::new(IterState::over(items)))),
            None => Err(Unwind::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raised(result: EvalResult) -> String {
        match result {
            Err(Unwind::Raise { exc, .. }) => exc.kind,
            other => panic!("expected an exception, got {:?}", other),
        }
    }

    #[test]
    fn test_floor_division_and_modulo_follow_divisor_sign() {
        assert_eq!(binary(BinOp::FloorDiv, &Val::Int(-7), &Val::Int(2)).unwrap(), Val::Int(-4));
        assert_eq!(binary(BinOp::Mod, &Val::Int(-7), &Val::Int(2)).unwrap(), Val::Int(1));
        assert_eq!(binary(BinOp::Mod, &Val::Int(7), &Val::Int(-2)).unwrap(), Val::Int(-1));
        assert_eq!(binary(BinOp::Div, &Val::Int(7), &Val::Int(2)).unwrap(), Val::Float(3.5));
        assert_eq!(raised(binary(BinOp::Div, &Val::Int(1), &Val::Int(0))), "ZeroDivisionError");
    }

    #[test]
    fn test_mixed_numeric_and_sequence_operators() {
        assert_eq!(binary(BinOp::Add, &Val::Bool(true), &Val::Float(0.5)).unwrap(), Val::Float(1.5));
        assert_eq!(binary(BinOp::Pow, &Val::Int(2), &Val::Int(-1)).unwrap(), Val::Float(0.5));
        assert_eq!(
            binary(BinOp::Mul, &Val::List(vec![Val::Int(0)]), &Val::Int(3)).unwrap(),
            Val::List(vec![Val::Int(0); 3])
        );
        assert_eq!(binary(BinOp::Add, &Val::str("a"), &Val::str("b")).unwrap(), Val::str("ab"));
        assert_eq!(raised(binary(BinOp::Add, &Val::Int(1), &Val::str("b"))), "TypeError");
        assert_eq!(raised(binary(BinOp::Mul, &Val::Int(i64::MAX), &Val::Int(2))), "OverflowError");
        assert_eq!(raised(binary(BinOp::Mul, &Val::str("abc"), &Val::Int(i64::MAX))), "OverflowError");
        assert_eq!(raised(binary(BinOp::Mul, &Val::str("ab"), &Val::Int(1 << 40))), "MemoryError");
        assert_eq!(raised(binary(BinOp::Mul, &Val::Int(1 << 40), &Val::List(vec![Val::None]))), "MemoryError");
        assert_eq!(binary(BinOp::Mul, &Val::Tuple(vec![Val::None]), &Val::Int(-3)).unwrap(), Val::Tuple(Vec::new()));
        assert_eq!(binary(BinOp::Mul, &Val::List(Vec::new()), &Val::Int(i64::MAX)).unwrap(), Val::List(Vec::new()));
        assert_eq!(
            binary(BinOp::Mod, &Val::str("%s=%d"), &Val::Tuple(vec![Val::str("x"), Val::Int(3)])).unwrap(),
            Val::str("x=3")
        );
    }

    #[test]
    fn test_equality_crosses_numeric_types() {
        assert!(equals(&Val::Int(1), &Val::Float(1.0)));
        assert!(equals(&Val::Bool(true), &Val::Int(1)));
        assert!(equals(
            &Val::Tuple(vec![Val::Int(1), Val::Float(2.0)]),
            &Val::Tuple(vec![Val::Float(1.0), Val::Int(2)])
        ));
        assert!(!compare(CmpOp::Is, &Val::Int(1), &Val::Bool(true)).unwrap());
        assert!(compare(CmpOp::Lt, &Val::List(vec![Val::Int(1)]), &Val::List(vec![Val::Int(1), Val::Int(0)])).unwrap());
        assert!(compare(CmpOp::Lt, &Val::Int(1), &Val::str("a")).is_err());
    }

    #[test]
    fn test_slices() {
        let items = Val::List((0..6).map(Val::Int).collect());
        assert_eq!(
            get_slice(&items, Some(1), Some(-1), Some(2)).unwrap(),
            Val::List(vec![Val::Int(1), Val::Int(3)])
        );
        assert_eq!(
            get_slice(&items, None, None, Some(-2)).unwrap(),
            Val::List(vec![Val::Int(5), Val::Int(3), Val::Int(1)])
        );
        assert_eq!(get_slice(&Val::str("hello"), Some(-3), None, None).unwrap(), Val::str("llo"));

        let mut list = items.clone();
        set_slice(&mut list, Some(1), Some(5), vec![Val::Int(9)]).unwrap();
        assert_eq!(list, Val::List(vec![Val::Int(0), Val::Int(9), Val::Int(5)]));
    }

    #[test]
    fn test_dict_items() {
        let mut dict = Val::Dict(Vec::new());
        set_item(&mut dict, Val::str("a"), Val::Int(1)).unwrap();
        set_item(&mut dict, Val::str("a"), Val::Int(2)).unwrap();
        assert_eq!(get_item(&dict, &Val::str("a")).unwrap(), Val::Int(2));
        assert_eq!(raised(get_item(&dict, &Val::str("b"))), "KeyError");
        assert!(set_item(&mut dict, Val::List(vec![]), Val::None).is_err());
    }
}
