//! Builtin functions and methods of builtin types

use std::cmp::Ordering;

use super::expressions::stop_iteration;
use super::format::{format_value, repr, to_str};
use super::machine::{from_nested, to_exception, Machine};
use super::operators::{self, check_hashable, equals, get_item, iterator_of, lookup, ordering, set_item};
use super::types::values::is_exception_class;
use super::types::{EvalResult, ExcVal, IterState, RangeVal, Unwind, Val};
use crate::generator::{GeneratorState, Resume};

const BUILTINS: &[&str] = &[
    "range", "len", "iter", "next", "list", "tuple", "dict", "str", "repr", "int", "float", "bool", "abs",
    "min", "max", "sum", "sorted", "reversed", "enumerate", "zip", "isinstance", "print", "returned",
    "Termination", "any", "all", "map", "filter", "round", "divmod", "chr", "ord", "format", "callable",
    "object",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name) || is_exception_class(name)
}

fn arity(name: &str, args: &[Val], min: usize, max: usize) -> Result<(), Unwind> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("exactly {}", min)
        } else if args.len() < min {
            format!("at least {}", min)
        } else {
            format!("at most {}", max)
        };
        return Err(Unwind::type_error(format!(
            "{}() takes {} argument(s) ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn no_keywords(name: &str, kwargs: &[(String, Val)]) -> Result<(), Unwind> {
    match kwargs.first() {
        Some((key, _)) => Err(Unwind::type_error(format!(
            "{}() got an unexpected keyword argument '{}'",
            name, key
        ))),
        None => Ok(()),
    }
}

fn keyword(kwargs: &mut Vec<(String, Val)>, name: &str) -> Option<Val> {
    let at = kwargs.iter().position(|(k, _)| k == name)?;
    Some(kwargs.remove(at).1)
}

fn expect_int(value: &Val, what: &str) -> Result<i64, Unwind> {
    match value {
        Val::Int(n) => Ok(*n),
        Val::Bool(b) => Ok(*b as i64),
        other => Err(Unwind::type_error(format!(
            "'{}' object cannot be interpreted as an integer ({})",
            other.type_name(),
            what
        ))),
    }
}

fn expect_str<'v>(value: &'v Val, what: &str) -> Result<&'v str, Unwind> {
    match value {
        Val::Str(s) => Ok(s),
        other => Err(Unwind::type_error(format!(
            "{} must be str, not {}",
            what,
            other.type_name()
        ))),
    }
}

fn parse_int(text: &str, base: u32) -> Result<i64, Unwind> {
    let clean: String = text.trim().chars().filter(|&c| c != '_').collect();
    let (negative, digits) = match clean.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, clean.strip_prefix('+').unwrap_or(&clean)),
    };
    let digits = match base {
        16 => digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")).unwrap_or(digits),
        8 => digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")).unwrap_or(digits),
        2 => digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")).unwrap_or(digits),
        _ => digits,
    };
    i64::from_str_radix(digits, base)
        .map(|n| if negative { -n } else { n })
        .map_err(|_| {
            Unwind::raise(
                "ValueError",
                format!("invalid literal for int() with base {}: {}", base, repr(&Val::str(text))),
            )
        })
}

fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (value - value.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - value.signum()
    } else {
        rounded
    }
}

/// Integral part of a float as an `int`, raising where it does not fit
fn float_to_int(value: f64) -> EvalResult {
    if value.is_nan() {
        return Err(Unwind::raise("ValueError", "cannot convert float NaN to integer"));
    }
    if value.is_infinite() {
        return Err(Unwind::raise("OverflowError", "cannot convert float infinity to integer"));
    }
    let whole = value.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return Err(Unwind::raise("OverflowError", "int too large to convert to a 64-bit integer"));
    }
    Ok(Val::Int(whole as i64))
}

fn type_matches(value: &Val, class: &str) -> bool {
    match class {
        "object" => true,
        "int" => matches!(value, Val::Int(_) | Val::Bool(_)),
        "bool" => matches!(value, Val::Bool(_)),
        "float" => matches!(value, Val::Float(_)),
        "str" => matches!(value, Val::Str(_)),
        "list" => matches!(value, Val::List(_)),
        "tuple" => matches!(value, Val::Tuple(_)),
        "dict" => matches!(value, Val::Dict(_)),
        "range" => matches!(value, Val::Range(_)),
        class if is_exception_class(class) => matches!(value, Val::Exception(exc) if exc.is_a(class)),
        _ => false,
    }
}

impl<'s> Machine<'s> {
    pub(crate) fn call_builtin(&mut self, name: &str, mut args: Vec<Val>, mut kwargs: Vec<(String, Val)>) -> EvalResult {
        if is_exception_class(name) {
            no_keywords(name, &kwargs)?;
            return Ok(Val::Exception(ExcVal::new(name, args)));
        }

        match name {
            "range" => {
                no_keywords(name, &kwargs)?;
                arity(name, &args, 1, 3)?;
                let ints = args
                    .iter()
                    .map(|v| expect_int(v, "range"))
                    .collect::<Result<Vec<_>, _>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => return Err(Unwind::type_error("range expected 1 to 3 arguments")),
                };
                if step == 0 {
                    return Err(Unwind::raise("ValueError", "range() arg 3 must not be zero"));
                }
                Ok(Val::Range(RangeVal { start, stop, step }))
            }
            "len" => {
                arity(name, &args, 1, 1)?;
                let len = match &args[0] {
                    Val::List(items) | Val::Tuple(items) => items.len(),
                    Val::Str(s) => s.chars().count(),
                    Val::Dict(pairs) => pairs.len(),
                    Val::Range(range) => range.len(),
                    other => {
                        return Err(Unwind::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )))
                    }
                };
                i64::try_from(len)
                    .map(Val::Int)
                    .map_err(|_| Unwind::raise("OverflowError", "Python int too large to convert to C ssize_t"))
            }
            "iter" => {
                arity(name, &args, 1, 1)?;
                iterator_of(args.remove(0))
            }
            "next" => {
                arity(name, &args, 1, 2)?;
                let mut it = args.remove(0);
                let default = args.pop();
                self.next_value(&mut it, default)
            }
            "list" | "tuple" => {
                arity(name, &args, 0, 1)?;
                let items = match args.pop() {
                    Some(source) => self.iterate(source)?,
                    None => Vec::new(),
                };
                Ok(if name == "list" { Val::List(items) } else { Val::Tuple(items) })
            }
            "dict" => {
                arity(name, &args, 0, 1)?;
                let mut dict = Val::Dict(Vec::new());
                if let Some(source) = args.pop() {
                    let pairs = match source {
                        Val::Dict(pairs) => pairs,
                        other => self
                            .iterate(other)?
                            .into_iter()
                            .map(|pair| match pair {
                                Val::Tuple(kv) | Val::List(kv) if kv.len() == 2 => {
                                    let mut kv = kv.into_iter();
                                    Ok((kv.next().unwrap_or(Val::None), kv.next().unwrap_or(Val::None)))
                                }
                                _ => Err(Unwind::type_error(
                                    "cannot convert dictionary update sequence element to a pair",
                                )),
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                    };
                    for (key, value) in pairs {
                        set_item(&mut dict, key, value)?;
                    }
                }
                for (key, value) in kwargs {
                    set_item(&mut dict, Val::Str(key), value)?;
                }
                Ok(dict)
            }
            "str" => {
                arity(name, &args, 0, 1)?;
                Ok(Val::Str(args.first().map(to_str).unwrap_or_default()))
            }
            "repr" => {
                arity(name, &args, 1, 1)?;
                Ok(Val::Str(repr(&args[0])))
            }
            "int" => {
                arity(name, &args, 0, 2)?;
                let base = match args.get(1).cloned().or_else(|| keyword(&mut kwargs, "base")) {
                    Some(base) => expect_int(&base, "base")?,
                    None => 10,
                };
                if !(2..=36).contains(&base) {
                    return Err(Unwind::raise("ValueError", "int() base must be >= 2 and <= 36"));
                }
                let base = base as u32;
                match args.first() {
                    None => Ok(Val::Int(0)),
                    Some(Val::Int(n)) => Ok(Val::Int(*n)),
                    Some(Val::Bool(b)) => Ok(Val::Int(*b as i64)),
                    Some(Val::Float(f)) => float_to_int(*f),
                    Some(Val::Str(s)) => parse_int(s, base).map(Val::Int),
                    Some(other) => Err(Unwind::type_error(format!(
                        "int() argument must be a string or a number, not '{}'",
                        other.type_name()
                    ))),
                }
            }
            "float" => {
                arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Val::Float(0.0)),
                    Some(Val::Int(n)) => Ok(Val::Float(*n as f64)),
                    Some(Val::Bool(b)) => Ok(Val::Float(*b as i64 as f64)),
                    Some(Val::Float(f)) => Ok(Val::Float(*f)),
                    Some(Val::Str(s)) => {
                        let text = s.trim().to_ascii_lowercase();
                        let parsed = match text.as_str() {
                            "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                            "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                            "nan" => Some(f64::NAN),
                            _ => text.parse::<f64>().ok(),
                        };
                        parsed.map(Val::Float).ok_or_else(|| {
                            Unwind::raise(
                                "ValueError",
                                format!("could not convert string to float: {}", repr(&args[0])),
                            )
                        })
                    }
                    Some(other) => Err(Unwind::type_error(format!(
                        "float() argument must be a string or a number, not '{}'",
                        other.type_name()
                    ))),
                }
            }
            "bool" => {
                arity(name, &args, 0, 1)?;
                Ok(Val::Bool(args.first().map_or(false, Val::is_truthy)))
            }
            "abs" => {
                arity(name, &args, 1, 1)?;
                match &args[0] {
                    Val::Int(n) => n.checked_abs().map(Val::Int).ok_or_else(|| Unwind::raise("OverflowError", "integer overflow")),
                    Val::Bool(b) => Ok(Val::Int(*b as i64)),
                    Val::Float(f) => Ok(Val::Float(f.abs())),
                    other => Err(Unwind::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                }
            }
            "min" | "max" => {
                let key = keyword(&mut kwargs, "key").filter(|k| *k != Val::None);
                let default = keyword(&mut kwargs, "default");
                no_keywords(name, &kwargs)?;
                let items = match args.len() {
                    0 => return Err(Unwind::type_error(format!("{} expected at least 1 argument, got 0", name))),
                    1 => self.iterate(args.remove(0))?,
                    _ => args,
                };
                self.extreme(name, items, key, default)
            }
            "sum" => {
                arity(name, &args, 1, 2)?;
                let mut total = match args.get(1).cloned().or(keyword(&mut kwargs, "start")) {
                    Some(start) => start,
                    None => Val::Int(0),
                };
                for item in self.iterate(args.remove(0))? {
                    total = operators::binary(super::types::BinOp::Add, &total, &item)?;
                }
                Ok(total)
            }
            "sorted" => {
                arity(name, &args, 1, 1)?;
                let key = keyword(&mut kwargs, "key").filter(|k| *k != Val::None);
                let reverse = keyword(&mut kwargs, "reverse").map_or(false, |r| r.is_truthy());
                no_keywords(name, &kwargs)?;
                let items = self.iterate(args.remove(0))?;
                Ok(Val::List(self.sort_values(items, key, reverse)?))
            }
            "reversed" => {
                arity(name, &args, 1, 1)?;
                let mut items = match &args[0] {
                    Val::List(_) | Val::Tuple(_) | Val::Str(_) | Val::Range(_) => self.iterate(args.remove(0))?,
                    other => {
                        return Err(Unwind::type_error(format!(
                            "'{}' object is not reversible",
                            other.type_name()
                        )))
                    }
                };
                items.reverse();
                Ok(Val::Iter(Box::new(IterState::over(items))))
            }
            "enumerate" => {
                arity(name, &args, 1, 2)?;
                let start = match args.get(1).cloned().or(keyword(&mut kwargs, "start")) {
                    Some(start) => expect_int(&start, "start")?,
                    None => 0,
                };
                let items = self.iterate(args.remove(0))?;
                let pairs = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Val::Tuple(vec![Val::Int(start + i as i64), item]))
                    .collect();
                Ok(Val::Iter(Box::new(IterState::over(pairs))))
            }
            "zip" => {
                no_keywords(name, &kwargs)?;
                let columns = args
                    .into_iter()
                    .map(|source| self.iterate(source))
                    .collect::<Result<Vec<_>, _>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let rows = (0..len)
                    .map(|i| Val::Tuple(columns.iter().map(|column| column[i].clone()).collect()))
                    .collect();
                Ok(Val::Iter(Box::new(IterState::over(rows))))
            }
            "isinstance" => {
                arity(name, &args, 2, 2)?;
                let classes = match &args[1] {
                    Val::Tuple(items) => items.clone(),
                    single => vec![single.clone()],
                };
                let mut result = false;
                for class in classes {
                    match class {
                        Val::Builtin(class) => result |= type_matches(&args[0], &class),
                        other => {
                            return Err(Unwind::type_error(format!(
                                "isinstance() arg 2 must be a type or tuple of types, not {}",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(Val::Bool(result))
            }
            "print" => {
                let sep = keyword(&mut kwargs, "sep").map_or(" ".to_string(), |s| to_str(&s));
                let end = keyword(&mut kwargs, "end").map_or("\n".to_string(), |e| to_str(&e));
                let line: Vec<String> = args.iter().map(to_str).collect();
                print!("{}{}", line.join(&sep), end);
                Ok(Val::None)
            }
            "returned" => {
                arity(name, &args, 1, 1)?;
                Ok(match &args[0] {
                    Val::Generator(g) => g.return_value().cloned().unwrap_or(Val::None),
                    _ => Val::None,
                })
            }
            "Termination" => {
                arity(name, &args, 0, 1)?;
                Ok(Val::Termination(Box::new(args.pop().unwrap_or(Val::None))))
            }
            "any" | "all" => {
                arity(name, &args, 1, 1)?;
                let items = self.iterate(args.remove(0))?;
                Ok(Val::Bool(if name == "any" {
                    items.iter().any(Val::is_truthy)
                } else {
                    items.iter().all(Val::is_truthy)
                }))
            }
            "map" => {
                if args.len() < 2 {
                    return Err(Unwind::type_error("map() must have at least two arguments."));
                }
                let func = args.remove(0);
                let columns = args
                    .into_iter()
                    .map(|source| self.iterate(source))
                    .collect::<Result<Vec<_>, _>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut out = Vec::with_capacity(len);
                for i in 0..len {
                    let row = columns.iter().map(|column| column[i].clone()).collect();
                    out.push(self.call_value(func.clone(), row, Vec::new())?);
                }
                Ok(Val::Iter(Box::new(IterState::over(out))))
            }
            "filter" => {
                arity(name, &args, 2, 2)?;
                let source = args.pop().unwrap_or(Val::None);
                let func = args.pop().unwrap_or(Val::None);
                let mut out = Vec::new();
                for item in self.iterate(source)? {
                    let keep = match &func {
                        Val::None => item.is_truthy(),
                        func => self.call_value(func.clone(), vec![item.clone()], Vec::new())?.is_truthy(),
                    };
                    if keep {
                        out.push(item);
                    }
                }
                Ok(Val::Iter(Box::new(IterState::over(out))))
            }
            "round" => {
                arity(name, &args, 1, 2)?;
                let digits = args.get(1).filter(|d| **d != Val::None).map(|d| expect_int(d, "ndigits")).transpose()?;
                match (&args[0], digits) {
                    (Val::Int(n), _) => Ok(Val::Int(*n)),
                    (Val::Bool(b), _) => Ok(Val::Int(*b as i64)),
                    (Val::Float(f), None) => float_to_int(round_half_even(*f)),
                    (Val::Float(f), Some(d)) => {
                        let factor = 10f64.powi(d as i32);
                        Ok(Val::Float(round_half_even(f * factor) / factor))
                    }
                    (other, _) => Err(Unwind::type_error(format!(
                        "type {} doesn't define __round__ method",
                        other.type_name()
                    ))),
                }
            }
            "divmod" => {
                arity(name, &args, 2, 2)?;
                let quotient = operators::binary(super::types::BinOp::FloorDiv, &args[0], &args[1])?;
                let remainder = operators::binary(super::types::BinOp::Mod, &args[0], &args[1])?;
                Ok(Val::Tuple(vec![quotient, remainder]))
            }
            "chr" => {
                arity(name, &args, 1, 1)?;
                let code = expect_int(&args[0], "chr")?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| Val::Str(c.to_string()))
                    .ok_or_else(|| Unwind::raise("ValueError", "chr() arg not in range(0x110000)"))
            }
            "ord" => {
                arity(name, &args, 1, 1)?;
                let text = expect_str(&args[0], "ord() argument")?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Val::Int(c as i64)),
                    _ => Err(Unwind::type_error(format!(
                        "ord() expected a character, but string of length {} found",
                        text.chars().count()
                    ))),
                }
            }
            "format" => {
                arity(name, &args, 1, 2)?;
                let spec = match args.get(1) {
                    Some(spec) => expect_str(spec, "format spec")?.to_string(),
                    None => String::new(),
                };
                format_value(&args[0], &spec)
                    .map(Val::Str)
                    .map_err(|m| Unwind::raise("ValueError", m))
            }
            "callable" => {
                arity(name, &args, 1, 1)?;
                Ok(Val::Bool(matches!(args[0], Val::Function(_) | Val::Builtin(_))))
            }
            "object" => Err(Unwind::type_error("object() is not supported")),
            other => Err(Unwind::raise(
                "NameError",
                format!("name '{}' is not defined", other),
            )),
        }
    }

    fn extreme(&mut self, name: &str, items: Vec<Val>, key: Option<Val>, default: Option<Val>) -> EvalResult {
        let mut best: Option<(Val, Val)> = None;
        for item in items {
            let rank = match &key {
                Some(key) => self.call_value(key.clone(), vec![item.clone()], Vec::new())?,
                None => item.clone(),
            };
            let better = match &best {
                None => true,
                Some((best_rank, _)) => {
                    let order = ordering(&rank, best_rank, if name == "max" { ">" } else { "<" })?;
                    if name == "max" {
                        order == Ordering::Greater
                    } else {
                        order == Ordering::Less
                    }
                }
            };
            if better {
                best = Some((rank, item));
            }
        }
        match (best, default) {
            (Some((_, item)), _) => Ok(item),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(Unwind::raise(
                "ValueError",
                format!("{}() arg is an empty sequence", name),
            )),
        }
    }

    /// Stable sort; `reverse` keeps equal items in their original order
    fn sort_values(&mut self, items: Vec<Val>, key: Option<Val>, reverse: bool) -> Result<Vec<Val>, Unwind> {
        let keys = match key {
            Some(key) => items
                .iter()
                .map(|item| self.call_value(key.clone(), vec![item.clone()], Vec::new()))
                .collect::<Result<Vec<_>, _>>()?,
            None => items.clone(),
        };
        let mut order: Vec<usize> = (0..items.len()).collect();
        let mut failure = None;
        order.sort_by(|&a, &b| {
            let (x, y) = if reverse { (&keys[b], &keys[a]) } else { (&keys[a], &keys[b]) };
            match ordering(x, y, "<") {
                Ok(order) => order,
                Err(err) => {
                    failure.get_or_insert(err);
                    Ordering::Equal
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(order.into_iter().map(|i| items[i].clone()).collect())
    }

    /* ===================== Methods ===================== */

    pub(crate) fn call_method(
        &mut self,
        receiver: &mut Val,
        name: &str,
        mut args: Vec<Val>,
        kwargs: Vec<(String, Val)>,
    ) -> EvalResult {
        match receiver {
            Val::List(_) => self.list_method(receiver, name, args, kwargs),
            Val::Dict(_) => dict_method(receiver, name, args, kwargs),
            Val::Str(s) => {
                let s = s.clone();
                if name == "format" {
                    return str_format(&s, &args, &kwargs);
                }
                no_keywords(name, &kwargs)?;
                if name == "join" {
                    arity(name, &args, 1, 1)?;
                    let parts = self
                        .iterate(args.remove(0))?
                        .into_iter()
                        .map(|part| match part {
                            Val::Str(text) => Ok(text),
                            other => Err(Unwind::type_error(format!(
                                "sequence item: expected str instance, {} found",
                                other.type_name()
                            ))),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    return Ok(Val::Str(parts.join(&s)));
                }
                str_method(&s, name, &args)
            }
            Val::Tuple(items) => match name {
                "count" => {
                    arity(name, &args, 1, 1)?;
                    Ok(Val::Int(items.iter().filter(|v| equals(v, &args[0])).count() as i64))
                }
                "index" => {
                    arity(name, &args, 1, 1)?;
                    items
                        .iter()
                        .position(|v| equals(v, &args[0]))
                        .map(|i| Val::Int(i as i64))
                        .ok_or_else(|| Unwind::raise("ValueError", "tuple.index(x): x not in tuple"))
                }
                _ => Err(no_attribute(receiver, name)),
            },
            Val::Generator(_) => {
                let value = args.pop();
                no_keywords(name, &kwargs)?;
                self.generator_method(receiver, name, value)
            }
            Val::Iter(_) if name == "__next__" => self.next_value(receiver, None),
            _ => Err(no_attribute(receiver, name)),
        }
    }

    fn list_method(&mut self, receiver: &mut Val, name: &str, mut args: Vec<Val>, mut kwargs: Vec<(String, Val)>) -> EvalResult {
        if name == "sort" {
            let key = keyword(&mut kwargs, "key").filter(|k| *k != Val::None);
            let reverse = keyword(&mut kwargs, "reverse").map_or(false, |r| r.is_truthy());
            no_keywords(name, &kwargs)?;
            let Val::List(items) = receiver else {
                return Err(no_attribute(receiver, name));
            };
            let sorted = self.sort_values(std::mem::take(items), key, reverse)?;
            *items = sorted;
            return Ok(Val::None);
        }
        no_keywords(name, &kwargs)?;
        if name == "extend" {
            arity(name, &args, 1, 1)?;
            let extra = self.iterate(args.remove(0))?;
            if let Val::List(items) = receiver {
                items.extend(extra);
            }
            return Ok(Val::None);
        }

        let Val::List(items) = receiver else {
            return Err(no_attribute(receiver, name));
        };
        match name {
            "append" => {
                arity(name, &args, 1, 1)?;
                items.push(args.remove(0));
                Ok(Val::None)
            }
            "insert" => {
                arity(name, &args, 2, 2)?;
                let len = items.len() as i64;
                let at = expect_int(&args[0], "index")?;
                let at = if at < 0 { (at + len).max(0) } else { at.min(len) };
                items.insert(at as usize, args.remove(1));
                Ok(Val::None)
            }
            "pop" => {
                arity(name, &args, 0, 1)?;
                if items.is_empty() {
                    return Err(Unwind::raise("IndexError", "pop from empty list"));
                }
                let len = items.len() as i64;
                let at = match args.first() {
                    Some(index) => expect_int(index, "index")?,
                    None => len - 1,
                };
                let at = if at < 0 { at + len } else { at };
                if !(0..len).contains(&at) {
                    return Err(Unwind::raise("IndexError", "pop index out of range"));
                }
                Ok(items.remove(at as usize))
            }
            "remove" => {
                arity(name, &args, 1, 1)?;
                match items.iter().position(|v| equals(v, &args[0])) {
                    Some(at) => {
                        items.remove(at);
                        Ok(Val::None)
                    }
                    None => Err(Unwind::raise("ValueError", "list.remove(x): x not in list")),
                }
            }
            "index" => {
                arity(name, &args, 1, 1)?;
                items
                    .iter()
                    .position(|v| equals(v, &args[0]))
                    .map(|i| Val::Int(i as i64))
                    .ok_or_else(|| Unwind::raise("ValueError", format!("{} is not in list", repr(&args[0]))))
            }
            "count" => {
                arity(name, &args, 1, 1)?;
                Ok(Val::Int(items.iter().filter(|v| equals(v, &args[0])).count() as i64))
            }
            "clear" => {
                items.clear();
                Ok(Val::None)
            }
            "copy" => Ok(Val::List(items.clone())),
            "reverse" => {
                items.reverse();
                Ok(Val::None)
            }
            _ => Err(no_attribute(&Val::List(Vec::new()), name)),
        }
    }

    fn generator_method(&mut self, receiver: &mut Val, name: &str, value: Option<Val>) -> EvalResult {
        let depth = self.depth + 1;
        let Val::Generator(g) = receiver else {
            return Err(no_attribute(receiver, name));
        };
        let resume = match name {
            "send" => {
                let value = value.unwrap_or(Val::None);
                if !g.has_started() && value != Val::None {
                    return Err(Unwind::type_error(
                        "can't send non-None value to a just-started generator",
                    ));
                }
                Resume::Send(value)
            }
            "throw" => Resume::Throw(to_exception(value.unwrap_or(Val::None))?),
            "close" => {
                g.close_nested(depth).map_err(from_nested)?;
                return Ok(Val::None);
            }
            "__next__" => Resume::Next,
            _ => return Err(no_attribute(&Val::Generator(g.clone()), name)),
        };
        match g.resume_nested(resume, depth).map_err(from_nested)? {
            GeneratorState::Yielded(value) => Ok(value),
            GeneratorState::Complete(_) => Err(stop_iteration(receiver)),
        }
    }
}

fn no_attribute(receiver: &Val, name: &str) -> Unwind {
    Unwind::raise(
        "AttributeError",
        format!("'{}' object has no attribute '{}'", receiver.type_name(), name),
    )
}

fn dict_method(receiver: &mut Val, name: &str, mut args: Vec<Val>, kwargs: Vec<(String, Val)>) -> EvalResult {
    if name == "update" {
        arity(name, &args, 0, 1)?;
        let mut pairs = match args.pop() {
            Some(Val::Dict(pairs)) => pairs,
            Some(other) => {
                return Err(Unwind::type_error(format!(
                    "'{}' object is not a mapping",
                    other.type_name()
                )))
            }
            None => Vec::new(),
        };
        pairs.extend(kwargs.into_iter().map(|(k, v)| (Val::Str(k), v)));
        for (key, value) in pairs {
            set_item(receiver, key, value)?;
        }
        return Ok(Val::None);
    }
    no_keywords(name, &kwargs)?;
    if name == "setdefault" {
        arity(name, &args, 1, 2)?;
        let default = args.get(1).cloned().unwrap_or(Val::None);
        return match get_item(receiver, &args[0]) {
            Ok(existing) => Ok(existing),
            Err(Unwind::Raise { exc, .. }) if exc.kind == "KeyError" => {
                set_item(receiver, args.remove(0), default.clone())?;
                Ok(default)
            }
            Err(err) => Err(err),
        };
    }

    let Val::Dict(pairs) = receiver else {
        return Err(no_attribute(receiver, name));
    };
    match name {
        "get" => {
            arity(name, &args, 1, 2)?;
            check_hashable(&args[0])?;
            Ok(lookup(pairs, &args[0]).cloned().or_else(|| args.get(1).cloned()).unwrap_or(Val::None))
        }
        "keys" => Ok(Val::List(pairs.iter().map(|(k, _)| k.clone()).collect())),
        "values" => Ok(Val::List(pairs.iter().map(|(_, v)| v.clone()).collect())),
        "items" => Ok(Val::List(
            pairs.iter().map(|(k, v)| Val::Tuple(vec![k.clone(), v.clone()])).collect(),
        )),
        "pop" => {
            arity(name, &args, 1, 2)?;
            match pairs.iter().position(|(k, _)| equals(k, &args[0])) {
                Some(at) => Ok(pairs.remove(at).1),
                None => match args.get(1) {
                    Some(default) => Ok(default.clone()),
                    None => Err(Unwind::exc(ExcVal::new("KeyError", vec![args[0].clone()]))),
                },
            }
        }
        "popitem" => match pairs.pop() {
            Some((k, v)) => Ok(Val::Tuple(vec![k, v])),
            None => Err(Unwind::raise("KeyError", "popitem(): dictionary is empty")),
        },
        "clear" => {
            pairs.clear();
            Ok(Val::None)
        }
        "copy" => Ok(Val::Dict(pairs.clone())),
        _ => Err(no_attribute(&Val::Dict(Vec::new()), name)),
    }
}

fn str_arg<'a>(args: &'a [Val], i: usize, name: &str) -> Result<Option<&'a str>, Unwind> {
    match args.get(i) {
        None | Some(Val::None) => Ok(None),
        Some(value) => expect_str(value, &format!("{}() argument", name)).map(Some),
    }
}

fn strip_set(chars: Option<&str>) -> Vec<char> {
    chars.map_or_else(|| vec![' ', '\t', '\n', '\r', '\x0b', '\x0c'], |c| c.chars().collect())
}

fn str_method(s: &str, name: &str, args: &[Val]) -> EvalResult {
    let arg_str = |i: usize| str_arg(args, i, name);

    match name {
        "upper" => Ok(Val::Str(s.to_uppercase())),
        "lower" => Ok(Val::Str(s.to_lowercase())),
        "strip" | "lstrip" | "rstrip" => {
            arity(name, args, 0, 1)?;
            let set = strip_set(arg_str(0)?);
            let trimmed = match name {
                "strip" => s.trim_matches(|c| set.contains(&c)),
                "lstrip" => s.trim_start_matches(|c| set.contains(&c)),
                _ => s.trim_end_matches(|c| set.contains(&c)),
            };
            Ok(Val::Str(trimmed.to_string()))
        }
        "split" => {
            arity(name, args, 0, 2)?;
            let limit = match args.get(1) {
                Some(n) => expect_int(n, "maxsplit")?,
                None => -1,
            };
            let parts: Vec<String> = match arg_str(0)? {
                Some("") => return Err(Unwind::raise("ValueError", "empty separator")),
                Some(sep) if limit >= 0 => s.splitn(limit as usize + 1, sep).map(str::to_string).collect(),
                Some(sep) => s.split(sep).map(str::to_string).collect(),
                None => {
                    let words: Vec<&str> = s.split_whitespace().collect();
                    if limit >= 0 && words.len() > limit as usize {
                        let mut out: Vec<String> = words[..limit as usize].iter().map(|w| w.to_string()).collect();
                        let mut rest = s.trim_start();
                        for word in &words[..limit as usize] {
                            rest = rest[word.len()..].trim_start();
                        }
                        out.push(rest.to_string());
                        out
                    } else {
                        words.into_iter().map(str::to_string).collect()
                    }
                }
            };
            Ok(Val::List(parts.into_iter().map(Val::Str).collect()))
        }
        "replace" => {
            arity(name, args, 2, 2)?;
            let (from, to) = (arg_str(0)?.unwrap_or(""), arg_str(1)?.unwrap_or(""));
            Ok(Val::Str(s.replace(from, to)))
        }
        "startswith" | "endswith" => {
            arity(name, args, 1, 1)?;
            let candidates = match &args[0] {
                Val::Tuple(items) => items.clone(),
                single => vec![single.clone()],
            };
            let mut hit = false;
            for candidate in &candidates {
                let candidate = expect_str(candidate, &format!("{} arg", name))?;
                hit |= if name == "startswith" {
                    s.starts_with(candidate)
                } else {
                    s.ends_with(candidate)
                };
            }
            Ok(Val::Bool(hit))
        }
        "find" | "index" => {
            arity(name, args, 1, 1)?;
            let needle = arg_str(0)?.unwrap_or("");
            match s.find(needle) {
                Some(byte) => Ok(Val::Int(s[..byte].chars().count() as i64)),
                None if name == "find" => Ok(Val::Int(-1)),
                None => Err(Unwind::raise("ValueError", "substring not found")),
            }
        }
        "count" => {
            arity(name, args, 1, 1)?;
            let needle = arg_str(0)?.unwrap_or("");
            let count = if needle.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(needle).count()
            };
            Ok(Val::Int(count as i64))
        }
        "isdigit" => Ok(Val::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
        "isalpha" => Ok(Val::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic))),
        "isspace" => Ok(Val::Bool(!s.is_empty() && s.chars().all(char::is_whitespace))),
        "capitalize" => {
            let mut chars = s.chars();
            Ok(Val::Str(match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }))
        }
        "zfill" => {
            arity(name, args, 1, 1)?;
            let width = expect_int(&args[0], "width")?.max(0) as usize;
            let len = s.chars().count();
            if len >= width {
                return Ok(Val::Str(s.to_string()));
            }
            let (sign, digits) = match s.strip_prefix(['-', '+']) {
                Some(rest) => (&s[..1], rest),
                None => ("", s),
            };
            let zeros = "0".repeat(operators::repeated_len(1, (width - len) as i64)?);
            Ok(Val::Str(format!("{}{}{}", sign, zeros, digits)))
        }
        _ => Err(no_attribute(&Val::Str(String::new()), name)),
    }
}

/// `"{} {name!r:>5}".format(...)`
fn str_format(template: &str, args: &[Val], kwargs: &[(String, Val)]) -> EvalResult {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::new();
    let mut auto = 0usize;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                out.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                out.push('}');
                i += 2;
            }
            '{' => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .map(|p| i + p)
                    .ok_or_else(|| Unwind::raise("ValueError", "Single '{' encountered in format string"))?;
                let field: String = chars[i + 1..end].iter().collect();
                let (field, spec) = match field.split_once(':') {
                    Some((field, spec)) => (field.to_string(), spec.to_string()),
                    None => (field, String::new()),
                };
                let (field, conversion) = match field.split_once('!') {
                    Some((field, conversion)) => (field.to_string(), conversion.chars().next()),
                    None => (field, None),
                };

                let value = if field.is_empty() {
                    auto += 1;
                    args.get(auto - 1)
                } else if let Ok(index) = field.parse::<usize>() {
                    args.get(index)
                } else {
                    kwargs.iter().find(|(k, _)| *k == field).map(|(_, v)| v)
                };
                let value = value.ok_or_else(|| {
                    if field.chars().all(|c| c.is_ascii_digit()) {
                        Unwind::raise("IndexError", "Replacement index out of range for positional args tuple")
                    } else {
                        Unwind::exc(ExcVal::new("KeyError", vec![Val::Str(field.clone())]))
                    }
                })?;
                let value = match conversion {
                    Some('r') | Some('a') => Val::Str(repr(value)),
                    Some('s') => Val::Str(to_str(value)),
                    _ => value.clone(),
                };
                let text = format_value(&value, &spec).map_err(|m| Unwind::raise("ValueError", m))?;
                out.push_str(&text);
                i = end + 1;
            }
            '}' => return Err(Unwind::raise("ValueError", "Single '}' encountered in format string")),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(Val::Str(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_str_format_fields() {
        let args = vec![Val::Int(1), Val::str("b")];
        let kwargs = vec![("name".to_string(), Val::str("x"))];
        assert_eq!(
            str_format("{} {!r} {name:>3} {{}}", &args, &kwargs).unwrap(),
            Val::str("1 'b'   x {}")
        );
        assert!(str_format("{5}", &args, &kwargs).is_err());
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(str_method("  a b  ", "strip", &[]).unwrap(), Val::str("a b"));
        assert_eq!(
            str_method("a,b,,c", "split", &[Val::str(",")]).unwrap(),
            Val::List(vec![Val::str("a"), Val::str("b"), Val::str(""), Val::str("c")])
        );
        assert_eq!(
            str_method(" one  two three ", "split", &[Val::None, Val::Int(1)]).unwrap(),
            Val::List(vec![Val::str("one"), Val::str("two three ")])
        );
        assert_eq!(str_method("-42", "zfill", &[Val::Int(5)]).unwrap(), Val::str("-0042"));
        assert_eq!(str_method("héllo", "find", &[Val::str("l")]).unwrap(), Val::Int(2));
    }

    #[test]
    fn test_round_is_half_even() {
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
        assert_eq!(round_half_even(-2.5), -2.0);
    }

    #[test]
    fn test_int_parsing() {
        assert_eq!(parse_int(" -1_000 ", 10).unwrap(), -1000);
        assert_eq!(parse_int("0xff", 16).unwrap(), 255);
        assert!(parse_int("12a", 10).is_err());
    }
}
