//! Statement execution
//!
//! A [`Machine`] runs a parsed block against an environment. With a scratch
//! record attached it runs in generator mode: `return v` (for a `v` that is
//! not a `Termination`) suspends instead of returning, and `for` loops over a
//! scratch slot advance the iterator stored in the slot.

use tracing::trace;

use super::operators::{self, del_item, del_slice, iterator_of, set_item, set_slice};
use super::types::{
    BinOp, DefBody, Env, ExcVal, ExecResult, Expr, Flow, FunctionBody, FunctionVal, Handler, Node,
    Param, ParamKind, ParamSpec, Scratch, SlotKey, Stmt, Target, Unwind, Val,
};
use crate::config;
use crate::errors::EngineError;
use crate::generator::{Generator, GeneratorState, Resume};

/* ===================== Limits ===================== */

/// Execution budget of one resumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_steps: u64,
    pub max_depth: usize,
}

impl Limits {
    pub fn current() -> Self {
        let config = config::current();
        Self {
            max_steps: config.max_steps,
            max_depth: config.max_call_depth,
        }
    }
}

/// Translate the failure of a nested generator into the outer frame
pub(crate) fn from_nested(err: EngineError) -> Unwind {
    match err {
        EngineError::UserException { exc, .. } => Unwind::exc(exc),
        EngineError::ProgrammerMisuse(message) => Unwind::raise("RuntimeError", message),
        other => Unwind::Fatal(other),
    }
}

enum LoopStep {
    Next,
    Break,
    Exit(Flow),
}

/* ===================== Machine ===================== */

pub struct Machine<'s> {
    pub(crate) env: Env,
    pub(crate) scratch: Option<&'s mut Scratch>,
    /// Exceptions whose handlers are running, innermost last
    pub(crate) handled: Vec<ExcVal>,
    suspended_handled: Option<ExcVal>,
    steps: u64,
    pub(crate) limits: Limits,
    pub(crate) depth: usize,
}

impl Machine<'static> {
    /// A machine for ordinary code, with no scratch record
    pub fn new(env: Env) -> Self {
        Self {
            env,
            scratch: None,
            handled: Vec::new(),
            suspended_handled: None,
            steps: 0,
            limits: Limits::current(),
            depth: 0,
        }
    }
}

impl<'s> Machine<'s> {
    /// A machine running one state block of a generator at call depth `depth`
    pub fn for_generator(env: Env, scratch: &'s mut Scratch, depth: usize) -> Self {
        let handled = scratch.handled().cloned().into_iter().collect();
        Self {
            env,
            scratch: Some(scratch),
            handled,
            suspended_handled: None,
            steps: 0,
            limits: Limits::current(),
            depth,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Final bindings, and the exception being handled at the suspension
    pub fn into_parts(self) -> (Env, Option<ExcVal>) {
        (self.env, self.suspended_handled)
    }

    pub fn run(&mut self, nodes: &[Node]) -> ExecResult {
        self.exec_block(nodes)
    }

    pub(crate) fn generator_mode(&self) -> bool {
        self.scratch.is_some()
    }

    pub(crate) fn scratch_mut(&mut self) -> Result<&mut Scratch, Unwind> {
        self.scratch
            .as_deref_mut()
            .ok_or_else(|| Unwind::raise("RuntimeError", "scratch slot used outside a generator"))
    }

    fn tick(&mut self) -> Result<(), Unwind> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Unwind::Fatal(EngineError::StepLimit(self.limits.max_steps)));
        }
        Ok(())
    }

    /* ===================== Blocks ===================== */

    pub(crate) fn exec_block(&mut self, nodes: &[Node]) -> ExecResult {
        for node in nodes {
            match self.exec_node(node)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_node(&mut self, node: &Node) -> ExecResult {
        self.tick()?;
        self.exec_stmt(node).map_err(|e| e.located(node.line))
    }

    fn exec_stmt(&mut self, node: &Node) -> ExecResult {
        match &node.stmt {
            Stmt::Expr { value } => {
                self.eval(value)?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
                Ok(Flow::Normal)
            }
            Stmt::AugAssign { target, op, value } => {
                self.aug_assign(target, *op, value)?;
                Ok(Flow::Normal)
            }
            Stmt::Pass => Ok(Flow::Normal),
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Val::None,
                };
                if self.generator_mode() && !value.is_termination() {
                    self.suspended_handled = self.handled.last().cloned();
                    return Ok(Flow::Suspend {
                        value,
                        line: node.line,
                    });
                }
                Ok(Flow::Return(value))
            }
            Stmt::Raise { exc, cause } => Err(self.raise(exc.as_ref(), cause.as_ref())),
            Stmt::Del { targets } => {
                for target in targets {
                    self.delete(target)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Assert { test, msg } => {
                if self.eval(test)?.is_truthy() {
                    return Ok(Flow::Normal);
                }
                let args = match msg {
                    Some(msg) => vec![self.eval(msg)?],
                    None => Vec::new(),
                };
                Err(Unwind::exc(ExcVal::new("AssertionError", args)))
            }
            Stmt::If { cond, body, orelse } => {
                if self.eval(cond)?.is_truthy() {
                    self.exec_block(body)
                } else {
                    self.exec_block(orelse)
                }
            }
            Stmt::While { cond, body, orelse } => {
                while self.eval(cond)?.is_truthy() {
                    match self.loop_body(body)? {
                        LoopStep::Next => {}
                        LoopStep::Break => return Ok(Flow::Normal),
                        LoopStep::Exit(flow) => return Ok(flow),
                    }
                }
                self.exec_block(orelse)
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => match iter {
                Expr::Scratch { key } if self.generator_mode() => self.for_tracked(*key, target, body, orelse),
                _ => {
                    let value = self.eval(iter)?;
                    let mut it = iterator_of(value)?;
                    while let Some(item) = self.advance(&mut it)? {
                        self.assign(target, item)?;
                        match self.loop_body(body)? {
                            LoopStep::Next => {}
                            LoopStep::Break => return Ok(Flow::Normal),
                            LoopStep::Exit(flow) => return Ok(flow),
                        }
                    }
                    self.exec_block(orelse)
                }
            },
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => self.exec_try(body, handlers, orelse, finalbody),
            Stmt::Def { def } => {
                let decorators = def
                    .decorators
                    .iter()
                    .map(|d| self.eval(d))
                    .collect::<Result<Vec<_>, _>>()?;
                let params = self.eval_params(&def.params)?;
                let body = match &def.body {
                    DefBody::Block(nodes) => FunctionBody::Block(nodes.clone()),
                    DefBody::Generator { source, is_async } => FunctionBody::Generator {
                        source: source.clone(),
                        is_async: *is_async,
                    },
                };
                let mut value = Val::Function(Box::new(FunctionVal {
                    name: def.name.clone(),
                    params,
                    body,
                    captured: self.env.clone(),
                }));
                for decorator in decorators.into_iter().rev() {
                    value = self.call_value(decorator, vec![value], Vec::new())?;
                }
                self.env.insert(def.name.clone(), value);
                Ok(Flow::Normal)
            }
        }
    }

    fn loop_body(&mut self, body: &[Node]) -> Result<LoopStep, Unwind> {
        Ok(match self.exec_block(body)? {
            Flow::Normal | Flow::Continue => LoopStep::Next,
            Flow::Break => LoopStep::Break,
            flow => LoopStep::Exit(flow),
        })
    }

    /// `for` over a scratch slot: the slot's iterator advances in place
    fn for_tracked(&mut self, key: SlotKey, target: &Target, body: &[Node], orelse: &[Node]) -> ExecResult {
        let delegating = matches!(target, Target::Scratch { key: SlotKey::Yielded });
        loop {
            let current = self.scratch_mut()?.remove(key).unwrap_or(Val::None);
            let mut it = match current {
                Val::Iter(_) | Val::Generator(_) => current,
                other => iterator_of(other)?,
            };
            let step = if delegating {
                self.delegate(&mut it)
            } else {
                self.advance(&mut it)
            };
            self.scratch_mut()?.set(key, it);

            let Some(item) = step? else {
                return self.exec_block(orelse);
            };
            self.assign(target, item)?;
            match self.loop_body(body)? {
                LoopStep::Next => {}
                LoopStep::Break => return Ok(Flow::Normal),
                LoopStep::Exit(flow) => return Ok(flow),
            }
        }
    }

    /// One step of `yield from`: a started inner generator receives the
    /// pending send value
    fn delegate(&mut self, it: &mut Val) -> Result<Option<Val>, Unwind> {
        let send = self.scratch_mut()?.take_send();
        match it {
            Val::Generator(inner) if inner.has_started() && send != Val::None => {
                trace!(value = %send, "forwarding send to delegate");
                match inner.resume_nested(Resume::Send(send), self.depth + 1) {
                    Ok(GeneratorState::Yielded(value)) => Ok(Some(value)),
                    Ok(GeneratorState::Complete(_)) => Ok(None),
                    Err(err) => Err(from_nested(err)),
                }
            }
            _ => self.advance(it),
        }
    }

    fn exec_try(&mut self, body: &[Node], handlers: &[Handler], orelse: &[Node], finalbody: &[Node]) -> ExecResult {
        let mut result = self.exec_block(body);

        if let Err(Unwind::Raise { exc, line }) = &result {
            let (exc, line) = (exc.clone(), *line);
            result = match self.match_handler(handlers, &exc) {
                Ok(Some(handler)) => self.run_handler(handler, exc),
                Ok(None) => Err(Unwind::Raise { exc, line }),
                Err(err) => Err(err),
            };
        } else if matches!(result, Ok(Flow::Normal)) {
            result = self.exec_block(orelse);
        }

        // a suspended frame is not finished; its `finally` runs on a later resumption
        if finalbody.is_empty() || matches!(result, Ok(Flow::Suspend { .. }) | Err(Unwind::Fatal(_))) {
            return result;
        }
        match self.exec_block(finalbody)? {
            Flow::Normal => result,
            flow => Ok(flow),
        }
    }

    fn match_handler<'h>(&mut self, handlers: &'h [Handler], exc: &ExcVal) -> Result<Option<&'h Handler>, Unwind> {
        for handler in handlers {
            let Some(filter) = &handler.filter else {
                return Ok(Some(handler));
            };
            let classes = match self.eval(filter)? {
                Val::Tuple(items) => items,
                single => vec![single],
            };
            for class in classes {
                match class {
                    Val::Builtin(name) if super::types::values::is_exception_class(&name) => {
                        if exc.is_a(&name) {
                            return Ok(Some(handler));
                        }
                    }
                    _ => {
                        return Err(Unwind::type_error(
                            "catching classes that do not inherit from BaseException is not allowed",
                        ))
                    }
                }
            }
        }
        Ok(None)
    }

    fn run_handler(&mut self, handler: &Handler, exc: ExcVal) -> ExecResult {
        if let Some(scratch) = self.scratch.as_deref_mut() {
            // a partly evaluated statement abandoned by the exception
            scratch.set(SlotKey::Args, Val::List(Vec::new()));
        }
        if let Some(name) = &handler.name {
            self.env.insert(name.clone(), Val::Exception(exc.clone()));
        }
        self.handled.push(exc);
        let result = self.exec_block(&handler.body);
        self.handled.pop();

        if let Some(name) = &handler.name {
            if !matches!(result, Ok(Flow::Suspend { .. })) {
                self.env.remove(name);
            }
        }
        result
    }

    fn raise(&mut self, exc: Option<&Expr>, cause: Option<&Expr>) -> Unwind {
        let Some(exc) = exc else {
            return match self.handled.last() {
                Some(active) => Unwind::exc(active.clone()),
                None => Unwind::raise("RuntimeError", "No active exception to reraise"),
            };
        };
        let value = match self.eval(exc) {
            Ok(value) => value,
            Err(err) => return err,
        };
        if let Some(cause) = cause {
            if let Err(err) = self.eval(cause) {
                return err;
            }
        }
        match to_exception(value) {
            Ok(exc) => Unwind::exc(exc),
            Err(err) => err,
        }
    }

    /* ===================== Assignment ===================== */

    pub(crate) fn assign(&mut self, target: &Target, value: Val) -> Result<(), Unwind> {
        match target {
            Target::Name { name } => {
                self.env.insert(name.clone(), value);
                Ok(())
            }
            Target::Scratch { key } => {
                self.scratch_mut()?.set(*key, value);
                Ok(())
            }
            Target::Subscript { target, index } => self.assign_item(target, index, value),
            Target::Unpack { items } => self.unpack(items, value),
            Target::Starred { .. } => Err(Unwind::type_error(
                "starred assignment target must be in a list or tuple",
            )),
        }
    }

    fn unpack(&mut self, targets: &[Target], value: Val) -> Result<(), Unwind> {
        let values = self.iterate(value)?;
        let star = targets.iter().position(|t| matches!(t, Target::Starred { .. }));

        match star {
            None => {
                if values.len() != targets.len() {
                    return Err(unpack_error(targets.len(), values.len(), false));
                }
                for (target, value) in targets.iter().zip(values) {
                    self.assign(target, value)?;
                }
            }
            Some(at) => {
                let after = targets.len() - at - 1;
                if values.len() < targets.len() - 1 {
                    return Err(unpack_error(targets.len() - 1, values.len(), true));
                }
                let mut values = values;
                let tail = values.split_off(values.len() - after);
                let middle = values.split_off(at);
                for (target, value) in targets[..at].iter().zip(values) {
                    self.assign(target, value)?;
                }
                if let Target::Starred { target } = &targets[at] {
                    self.assign(target, Val::List(middle))?;
                }
                for (target, value) in targets[at + 1..].iter().zip(tail) {
                    self.assign(target, value)?;
                }
            }
        }
        Ok(())
    }

    fn assign_item(&mut self, container: &Expr, index: &Expr, value: Val) -> Result<(), Unwind> {
        let mut holder = self.eval(container)?;
        match index {
            Expr::Slice { lo, hi, step } => {
                if step.is_some() {
                    return Err(Unwind::raise("ValueError", "extended slice assignment is not supported"));
                }
                let (lo, hi, _) = self.slice_bounds(lo.as_deref(), hi.as_deref(), None)?;
                let items = self.iterate(value)?;
                set_slice(&mut holder, lo, hi, items)?;
            }
            _ => {
                let key = self.eval(index)?;
                set_item(&mut holder, key, value)?;
            }
        }
        self.store(container, holder)
    }

    /// Write `value` back into the place `expr` names; temporaries are dropped
    pub(crate) fn store(&mut self, expr: &Expr, value: Val) -> Result<(), Unwind> {
        match expr {
            Expr::Name { name } => {
                self.env.insert(name.clone(), value);
                Ok(())
            }
            Expr::Scratch { key } => {
                self.scratch_mut()?.set(*key, value);
                Ok(())
            }
            Expr::Subscript { target, index } => self.assign_item(target, index, value),
            _ => Ok(()),
        }
    }

    fn aug_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> Result<(), Unwind> {
        let current = match target {
            Target::Name { name } => self.lookup(name)?,
            Target::Scratch { key } => self.read_slot(*key)?,
            Target::Subscript { target: container, index } => self.eval(&Expr::Subscript {
                target: container.clone(),
                index: index.clone(),
            })?,
            _ => return Err(Unwind::type_error("illegal expression for augmented assignment")),
        };
        let rhs = self.eval(value)?;
        // list `+=` extends the live list, which the right side may have changed
        let current = match (op, &current, target) {
            (BinOp::Add, Val::List(_), Target::Name { name }) => self.lookup(name)?,
            (BinOp::Add, Val::List(_), Target::Scratch { key }) => self.read_slot(*key)?,
            _ => current,
        };
        let result = match (op, current) {
            (BinOp::Add, Val::List(mut items)) => {
                items.extend(self.iterate(rhs)?);
                Val::List(items)
            }
            (op, current) => operators::binary(op, &current, &rhs)?,
        };
        self.assign(target, result)
    }

    fn delete(&mut self, target: &Target) -> Result<(), Unwind> {
        match target {
            Target::Name { name } => match self.env.remove(name) {
                Some(_) => Ok(()),
                None => Err(name_error(name)),
            },
            Target::Scratch { key } => {
                self.scratch_mut()?.remove(*key);
                Ok(())
            }
            Target::Subscript { target: container, index } => {
                let mut holder = self.eval(container)?;
                match index.as_ref() {
                    Expr::Slice { lo, hi, step } => {
                        let (lo, hi, step) = self.slice_bounds(lo.as_deref(), hi.as_deref(), step.as_deref())?;
                        del_slice(&mut holder, lo, hi, step)?;
                    }
                    index => {
                        let key = self.eval(index)?;
                        del_item(&mut holder, &key)?;
                    }
                }
                self.store(container, holder)
            }
            Target::Unpack { items } => items.iter().try_for_each(|t| self.delete(t)),
            Target::Starred { target } => self.delete(target),
        }
    }

    /* ===================== Iteration ===================== */

    /// Advance an iterator value in place; `None` once it is exhausted
    pub(crate) fn advance(&mut self, it: &mut Val) -> Result<Option<Val>, Unwind> {
        match it {
            Val::Iter(state) => Ok(state.next_item()),
            Val::Generator(inner) => match inner.resume_nested(Resume::Next, self.depth + 1) {
                Ok(GeneratorState::Yielded(value)) => Ok(Some(value)),
                Ok(GeneratorState::Complete(_)) => Ok(None),
                Err(err) => Err(from_nested(err)),
            },
            other => Err(Unwind::type_error(format!(
                "'{}' object is not an iterator",
                other.type_name()
            ))),
        }
    }

    /// Drain any iterable into a vector, running generators to completion
    pub(crate) fn iterate(&mut self, value: Val) -> Result<Vec<Val>, Unwind> {
        match value {
            Val::Generator(_) => {
                let mut it = value;
                let mut out = Vec::new();
                while let Some(item) = self.advance(&mut it)? {
                    self.tick()?;
                    out.push(item);
                }
                Ok(out)
            }
            Val::Range(range) => operators::range_items(&range),
            other => operators::items_of(&other).ok_or_else(|| {
                Unwind::type_error(format!("'{}' object is not iterable", other.type_name()))
            }),
        }
    }

    /* ===================== Calls ===================== */

    pub(crate) fn eval_params(&mut self, specs: &[ParamSpec]) -> Result<Vec<Param>, Unwind> {
        specs
            .iter()
            .map(|spec| {
                Ok(Param {
                    name: spec.name.clone(),
                    default: spec.default.as_ref().map(|d| self.eval(d)).transpose()?,
                    kind: spec.kind,
                })
            })
            .collect()
    }

    pub(crate) fn call_value(&mut self, func: Val, args: Vec<Val>, kwargs: Vec<(String, Val)>) -> super::types::EvalResult {
        match func {
            Val::Builtin(name) => self.call_builtin(&name, args, kwargs),
            Val::Function(function) => self.call_function(*function, args, kwargs),
            other => Err(Unwind::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(&mut self, function: FunctionVal, args: Vec<Val>, kwargs: Vec<(String, Val)>) -> super::types::EvalResult {
        let bound = bind_arguments(&function.name, &function.params, args, kwargs)?;
        let mut env = function.captured.clone();
        if function.name != "<lambda>" && !bound.contains_key(&function.name) {
            env.insert(function.name.clone(), Val::Function(Box::new(function.clone())));
        }
        env.extend(bound);

        if let FunctionBody::Generator { source, .. } = &function.body {
            return Generator::from_locals(source, env)
                .map(|g| Val::Generator(Box::new(g)))
                .map_err(Unwind::Fatal);
        }

        if self.depth >= self.limits.max_depth {
            return Err(Unwind::raise("RecursionError", "maximum recursion depth exceeded"));
        }
        let saved_env = std::mem::replace(&mut self.env, env);
        let saved_scratch = self.scratch.take();
        self.depth += 1;

        let result = match &function.body {
            FunctionBody::Expr(expr) => self.eval(expr).map(Flow::Return),
            FunctionBody::Block(nodes) => self.exec_block(nodes),
            FunctionBody::Generator { .. } => Ok(Flow::Normal),
        };

        self.depth -= 1;
        self.scratch = saved_scratch;
        self.env = saved_env;

        match result {
            Ok(Flow::Return(value)) | Ok(Flow::Suspend { value, .. }) => Ok(value),
            Ok(Flow::Normal) => Ok(Val::None),
            Ok(Flow::Break) | Ok(Flow::Continue) => Err(Unwind::raise(
                "SyntaxError",
                "'break' or 'continue' outside loop",
            )),
            Err(err) => Err(err.unlocated()),
        }
    }
}

/* ===================== Helpers ===================== */

pub(crate) fn name_error(name: &str) -> Unwind {
    Unwind::raise("NameError", format!("name '{}' is not defined", name))
}

fn unpack_error(expected: usize, got: usize, starred: bool) -> Unwind {
    let message = if got < expected {
        if starred {
            format!("not enough values to unpack (expected at least {}, got {})", expected, got)
        } else {
            format!("not enough values to unpack (expected {}, got {})", expected, got)
        }
    } else {
        format!("too many values to unpack (expected {})", expected)
    };
    Unwind::raise("ValueError", message)
}

/// The exception a `raise` operand denotes
pub(crate) fn to_exception(value: Val) -> Result<ExcVal, Unwind> {
    match value {
        Val::Exception(exc) => Ok(exc),
        Val::Builtin(name) if super::types::values::is_exception_class(&name) => Ok(ExcVal::new(name, Vec::new())),
        _ => Err(Unwind::type_error("exceptions must derive from BaseException")),
    }
}

/// Bind call arguments to parameters
pub fn bind_arguments(
    function: &str,
    params: &[Param],
    args: Vec<Val>,
    kwargs: Vec<(String, Val)>,
) -> Result<Env, Unwind> {
    let mut env = Env::new();
    let positional: Vec<&Param> = params.iter().filter(|p| p.kind == ParamKind::Positional).collect();
    let var_args = params.iter().find(|p| p.kind == ParamKind::VarArgs);
    let var_kw = params.iter().find(|p| p.kind == ParamKind::VarKw);

    let mut args = args.into_iter();
    for param in &positional {
        match args.next() {
            Some(value) => {
                env.insert(param.name.clone(), value);
            }
            None => break,
        }
    }
    let extra: Vec<Val> = args.collect();
    match var_args {
        Some(param) => {
            env.insert(param.name.clone(), Val::Tuple(extra));
        }
        None if !extra.is_empty() => {
            return Err(Unwind::type_error(format!(
                "{}() takes {} positional arguments but {} were given",
                function,
                positional.len(),
                positional.len() + extra.len()
            )));
        }
        None => {}
    }

    let mut extra_kw = Vec::new();
    for (name, value) in kwargs {
        let named = params
            .iter()
            .any(|p| p.name == name && matches!(p.kind, ParamKind::Positional | ParamKind::KeywordOnly));
        if !named {
            extra_kw.push((Val::Str(name), value));
            continue;
        }
        if env.contains_key(&name) {
            return Err(Unwind::type_error(format!(
                "{}() got multiple values for argument '{}'",
                function, name
            )));
        }
        env.insert(name, value);
    }
    match var_kw {
        Some(param) => {
            env.insert(param.name.clone(), Val::Dict(extra_kw));
        }
        None => {
            if let Some((Val::Str(name), _)) = extra_kw.first() {
                return Err(Unwind::type_error(format!(
                    "{}() got an unexpected keyword argument '{}'",
                    function, name
                )));
            }
        }
    }

    for param in params {
        if env.contains_key(&param.name) {
            continue;
        }
        match &param.default {
            Some(default) => {
                env.insert(param.name.clone(), default.clone());
            }
            None => {
                return Err(Unwind::type_error(format!(
                    "{}() missing required argument: '{}'",
                    function, param.name
                )));
            }
        }
    }
    Ok(env)
}
