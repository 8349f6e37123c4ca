//! Expression evaluation

use super::builtins;
use super::format::{format_value, repr, to_str};
use super::machine::{name_error, Machine};
use super::operators::{self, get_item, get_slice, iterator_of, set_item};
use super::types::{
    Arg, BoolOp, CompClause, CompKind, DictItem, EvalResult, Expr, FPart, FunctionBody, FunctionVal,
    IterState, SlotKey, Unwind, Val,
};

/// Method names that change their receiver; the receiver is written back
const MUTATING_METHODS: &[&str] = &[
    "append", "extend", "insert", "pop", "remove", "clear", "sort", "reverse", "popitem", "setdefault",
    "update", "send", "throw", "close", "__next__",
];

impl<'s> Machine<'s> {
    pub fn eval(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Lit { v } => Ok(v.clone()),
            Expr::Name { name } => self.lookup(name),
            Expr::Scratch { key } => self.read_slot(*key),
            Expr::FString { parts } => self.fstring(parts),
            Expr::List { items } => Ok(Val::List(self.eval_items(items)?)),
            Expr::Tuple { items } => Ok(Val::Tuple(self.eval_items(items)?)),
            Expr::Dict { items } => {
                let mut dict = Val::Dict(Vec::new());
                for item in items {
                    match item {
                        DictItem::Pair(key, value) => {
                            let key = self.eval(key)?;
                            let value = self.eval(value)?;
                            set_item(&mut dict, key, value)?;
                        }
                        DictItem::Spread(mapping) => match self.eval(mapping)? {
                            Val::Dict(pairs) => {
                                for (key, value) in pairs {
                                    set_item(&mut dict, key, value)?;
                                }
                            }
                            other => {
                                return Err(Unwind::type_error(format!(
                                    "'{}' object is not a mapping",
                                    other.type_name()
                                )))
                            }
                        },
                    }
                }
                Ok(dict)
            }
            Expr::Starred { .. } => Err(Unwind::raise("SyntaxError", "can't use starred expression here")),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                operators::unary(*op, &value)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                operators::binary(*op, &lhs, &rhs)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !operators::compare(*op, &left, &right)? {
                        return Ok(Val::Bool(false));
                    }
                    left = right;
                }
                Ok(Val::Bool(true))
            }
            Expr::Bool { op, lhs, rhs } => {
                let left = self.eval(lhs)?;
                match (op, left.is_truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(rhs),
                }
            }
            Expr::Ternary { cond, then, orelse } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Walrus { name, value } => {
                let value = self.eval(value)?;
                self.env.insert(name.clone(), value.clone());
                Ok(value)
            }
            Expr::Lambda { params, body } => {
                let params = self.eval_params(params)?;
                Ok(Val::Function(Box::new(FunctionVal {
                    name: "<lambda>".to_string(),
                    params,
                    body: FunctionBody::Expr((**body).clone()),
                    captured: self.env.clone(),
                })))
            }
            Expr::Call { func, args } => {
                if let Expr::Name { name } = func.as_ref() {
                    if name == "next" && !self.env.contains_key(name) {
                        return self.call_next(args);
                    }
                }
                let func = self.eval(func)?;
                let (args, kwargs) = self.eval_args(args)?;
                self.call_value(func, args, kwargs)
            }
            Expr::Method { recv, name, args } => {
                let mut receiver = self.eval(recv)?;
                let (args, kwargs) = self.eval_args(args)?;
                let result = self.call_method(&mut receiver, name, args, kwargs);
                if recv.is_place() && MUTATING_METHODS.contains(&name.as_str()) {
                    self.store(recv, receiver)?;
                }
                result
            }
            Expr::Attr { recv, name } => {
                let value = self.eval(recv)?;
                attribute(&value, name)
            }
            Expr::Subscript { target, index } => {
                let container = self.eval(target)?;
                match index.as_ref() {
                    Expr::Slice { lo, hi, step } => {
                        let (lo, hi, step) = self.slice_bounds(lo.as_deref(), hi.as_deref(), step.as_deref())?;
                        get_slice(&container, lo, hi, step)
                    }
                    index => {
                        let key = self.eval(index)?;
                        get_item(&container, &key)
                    }
                }
            }
            Expr::Slice { .. } => Err(Unwind::raise("SyntaxError", "slice outside a subscript")),
            Expr::Comprehension {
                kind,
                elt,
                value,
                clauses,
            } => self.comprehension(*kind, elt, value.as_deref(), clauses),
            // coroutines are not modelled: an async call already produced its result
            Expr::Await { value } => self.eval(value),
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> EvalResult {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        if builtins::is_builtin(name) {
            return Ok(Val::Builtin(name.to_string()));
        }
        Err(name_error(name))
    }

    pub(crate) fn read_slot(&mut self, key: SlotKey) -> EvalResult {
        self.scratch_mut()?
            .read(key)
            .ok_or_else(|| Unwind::raise("RuntimeError", format!("scratch slot {} is empty", key)))
    }

    fn eval_items(&mut self, items: &[Expr]) -> Result<Vec<Val>, Unwind> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expr::Starred { value } => {
                    let value = self.eval(value)?;
                    out.extend(self.iterate(value)?);
                }
                other => out.push(self.eval(other)?),
            }
        }
        Ok(out)
    }

    pub(crate) fn eval_args(&mut self, args: &[Arg]) -> Result<(Vec<Val>, Vec<(String, Val)>), Unwind> {
        let mut positional = Vec::new();
        let mut keywords = Vec::new();
        for arg in args {
            match arg {
                Arg::Pos(expr) => positional.push(self.eval(expr)?),
                Arg::Star(expr) => {
                    let value = self.eval(expr)?;
                    positional.extend(self.iterate(value)?);
                }
                Arg::Kw(name, expr) => keywords.push((name.clone(), self.eval(expr)?)),
                Arg::DoubleStar(expr) => match self.eval(expr)? {
                    Val::Dict(pairs) => {
                        for (key, value) in pairs {
                            match key {
                                Val::Str(name) => keywords.push((name, value)),
                                _ => return Err(Unwind::type_error("keywords must be strings")),
                            }
                        }
                    }
                    other => {
                        return Err(Unwind::type_error(format!(
                            "argument after ** must be a mapping, not {}",
                            other.type_name()
                        )))
                    }
                },
            }
        }
        Ok((positional, keywords))
    }

    /// `next(it[, default])`, advancing `it` where it is stored
    fn call_next(&mut self, args: &[Arg]) -> EvalResult {
        let (place, default) = match args {
            [Arg::Pos(place)] => (place, None),
            [Arg::Pos(place), Arg::Pos(default)] => (place, Some(default)),
            _ => {
                let (args, kwargs) = self.eval_args(args)?;
                return self.call_builtin("next", args, kwargs);
            }
        };
        let mut it = self.eval(place)?;
        let default = default.map(|d| self.eval(d)).transpose()?;
        let result = self.next_value(&mut it, default);
        if place.is_place() {
            self.store(place, it)?;
        }
        result
    }

    /// One `next()` step; exhaustion raises `StopIteration` unless a default is given
    pub(crate) fn next_value(&mut self, it: &mut Val, default: Option<Val>) -> EvalResult {
        if let Some(item) = self.advance(it)? {
            return Ok(item);
        }
        match default {
            Some(default) => Ok(default),
            None => Err(stop_iteration(it)),
        }
    }

    pub(crate) fn slice_bounds(
        &mut self,
        lo: Option<&Expr>,
        hi: Option<&Expr>,
        step: Option<&Expr>,
    ) -> Result<(Option<i64>, Option<i64>, Option<i64>), Unwind> {
        let mut bound = |expr: Option<&Expr>| -> Result<Option<i64>, Unwind> {
            match expr {
                None => Ok(None),
                Some(expr) => match self.eval(expr)? {
                    Val::None => Ok(None),
                    Val::Int(n) => Ok(Some(n)),
                    Val::Bool(b) => Ok(Some(b as i64)),
                    _ => Err(Unwind::type_error("slice indices must be integers or None")),
                },
            }
        };
        Ok((bound(lo)?, bound(hi)?, bound(step)?))
    }

    fn fstring(&mut self, parts: &[FPart]) -> EvalResult {
        let mut out = String::new();
        for part in parts {
            match part {
                FPart::Lit(text) => out.push_str(text),
                FPart::Expr { expr, conversion, spec } => {
                    let value = self.eval(expr)?;
                    let value = match conversion {
                        Some('r') | Some('a') => Val::Str(repr(&value)),
                        Some('s') => Val::Str(to_str(&value)),
                        _ => value,
                    };
                    match spec {
                        Some(spec) => {
                            let text = format_value(&value, spec).map_err(|m| Unwind::raise("ValueError", m))?;
                            out.push_str(&text);
                        }
                        None => out.push_str(&to_str(&value)),
                    }
                }
            }
        }
        Ok(Val::Str(out))
    }

    /// Comprehension variables do not leak: bindings they shadow are restored
    fn comprehension(&mut self, kind: CompKind, elt: &Expr, value: Option<&Expr>, clauses: &[CompClause]) -> EvalResult {
        let mut names = Vec::new();
        for clause in clauses {
            clause.target.names(&mut names);
        }
        let saved: Vec<(String, Option<Val>)> = names
            .into_iter()
            .map(|name| {
                let old = self.env.get(&name).cloned();
                (name, old)
            })
            .collect();

        let mut out = match kind {
            CompKind::Dict => Val::Dict(Vec::new()),
            CompKind::List | CompKind::Gen => Val::List(Vec::new()),
        };
        let result = self.comp_clause(clauses, elt, value, &mut out);

        for (name, old) in saved {
            match old {
                Some(old) => self.env.insert(name, old),
                None => self.env.remove(&name),
            };
        }
        result?;

        Ok(match (kind, out) {
            (CompKind::Gen, Val::List(items)) => Val::Iter(Box::new(IterState::over(items))),
            (_, out) => out,
        })
    }

    fn comp_clause(&mut self, clauses: &[CompClause], elt: &Expr, value: Option<&Expr>, out: &mut Val) -> Result<(), Unwind> {
        let Some((clause, rest)) = clauses.split_first() else {
            match value {
                Some(value) => {
                    let key = self.eval(elt)?;
                    let value = self.eval(value)?;
                    set_item(out, key, value)?;
                }
                None => {
                    let item = self.eval(elt)?;
                    if let Val::List(items) = out {
                        items.push(item);
                    }
                }
            }
            return Ok(());
        };

        let source = self.eval(&clause.iter)?;
        let mut it = iterator_of(source)?;
        'items: while let Some(item) = self.advance(&mut it)? {
            self.assign(&clause.target, item)?;
            for cond in &clause.conds {
                if !self.eval(cond)?.is_truthy() {
                    continue 'items;
                }
            }
            self.comp_clause(rest, elt, value, out)?;
        }
        Ok(())
    }
}

/// `StopIteration` for an exhausted iterator, carrying a generator's return value
pub(crate) fn stop_iteration(it: &Val) -> Unwind {
    let args = match it {
        Val::Generator(g) => match g.return_value() {
            Some(Val::None) | None => Vec::new(),
            Some(value) => vec![value.clone()],
        },
        _ => Vec::new(),
    };
    Unwind::exc(super::types::ExcVal::new("StopIteration", args))
}

fn attribute(value: &Val, name: &str) -> EvalResult {
    match (value, name) {
        (Val::Exception(exc), "args") => Ok(Val::Tuple(exc.args.clone())),
        (Val::Exception(exc), "value") if exc.is_a("StopIteration") => {
            Ok(exc.args.first().cloned().unwrap_or(Val::None))
        }
        (Val::Function(f), "__name__") => Ok(Val::str(f.name.clone())),
        (Val::Builtin(b), "__name__") => Ok(Val::str(b.clone())),
        (Val::Generator(g), "__name__") => Ok(Val::str(g.name())),
        (Val::Generator(g), "gi_running") => Ok(Val::Bool(g.is_running())),
        (Val::Range(r), "start") => Ok(Val::Int(r.start)),
        (Val::Range(r), "stop") => Ok(Val::Int(r.stop)),
        (Val::Range(r), "step") => Ok(Val::Int(r.step)),
        _ => Err(Unwind::raise(
            "AttributeError",
            format!("'{}' object has no attribute '{}'", value.type_name(), name),
        )),
    }
}
