//! Line parser
//!
//! Each normalized line is parsed on its own with the pest grammar in
//! `line.pest`; the block builder then stacks the lines into a statement
//! tree by indentation. Binary operators go through a Pratt parser.

use std::sync::OnceLock;

use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use super::types::{
    Arg, BinOp, BoolOp, CmpOp, CompClause, CompKind, DefBody, DefSpec, DictItem, Expr, FPart,
    Handler, Node, ParamKind, ParamSpec, SlotKey, Stmt, Target, UnaryOp, Val,
};
use crate::errors::{EngineError, EngineResult};
use crate::rewrite::scanner::{self, TokKind};

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "interpreter/line.pest"]
struct LineParser;

fn pratt() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::op_bitor, Assoc::Left))
            .op(Op::infix(Rule::op_bitxor, Assoc::Left))
            .op(Op::infix(Rule::op_bitand, Assoc::Left))
            .op(Op::infix(Rule::op_lshift, Assoc::Left) | Op::infix(Rule::op_rshift, Assoc::Left))
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
            .op(Op::infix(Rule::op_mul, Assoc::Left)
                | Op::infix(Rule::op_matmul, Assoc::Left)
                | Op::infix(Rule::op_div, Assoc::Left)
                | Op::infix(Rule::op_floordiv, Assoc::Left)
                | Op::infix(Rule::op_mod, Assoc::Left))
            .op(Op::prefix(Rule::op_neg) | Op::prefix(Rule::op_pos) | Op::prefix(Rule::op_invert))
            .op(Op::infix(Rule::op_pow, Assoc::Right))
    })
}

/* ===================== Error Types ===================== */

#[derive(Debug)]
enum ParseError {
    Pest(String),
    Build(String),
    Unsupported(String),
}

impl ParseError {
    fn located(self, line: usize) -> EngineError {
        match self {
            ParseError::Pest(message) | ParseError::Build(message) => EngineError::parse(line, message),
            ParseError::Unsupported(construct) => EngineError::unsupported(line, construct),
        }
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let column = match err.line_col {
            pest::error::LineColLocation::Pos((_, col)) => col,
            pest::error::LineColLocation::Span((_, col), _) => col,
        };
        ParseError::Pest(format!("{} at column {}", err.variant.message(), column))
    }
}

type ParseResult<T> = Result<T, ParseError>;

fn build_error<T>(message: impl Into<String>) -> ParseResult<T> {
    Err(ParseError::Build(message.into()))
}

fn next<'i>(pairs: &mut impl Iterator<Item = Pair<'i, Rule>>, what: &str) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParseError::Build(format!("missing {}", what)))
}

/// Keywords that only separate the parts of a rule
fn is_separator(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_and
            | Rule::kw_as
            | Rule::kw_assert
            | Rule::kw_async
            | Rule::kw_await
            | Rule::kw_def
            | Rule::kw_del
            | Rule::kw_elif
            | Rule::kw_else
            | Rule::kw_except
            | Rule::kw_for
            | Rule::kw_from
            | Rule::kw_if
            | Rule::kw_in
            | Rule::kw_lambda
            | Rule::kw_or
            | Rule::kw_raise
            | Rule::kw_return
            | Rule::kw_while
    )
}

fn significant(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pair.into_inner().filter(|p| !is_separator(p.as_rule()))
}

fn first_word(text: &str) -> &str {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("")
}

/* ===================== Lines ===================== */

/// A parsed `def` header
#[derive(Debug, Clone, PartialEq)]
pub struct DefSignature {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub is_async: bool,
}

/// One line before blocks are attached
#[derive(Debug, Clone, PartialEq)]
enum Line {
    Simple(Stmt),
    Decorator(Expr),
    If(Expr),
    Elif(Expr),
    Else,
    While(Expr),
    For(Target, Expr),
    Try,
    Except(Option<Expr>, Option<String>),
    Finally,
    Def(DefSignature),
}

/// Statements the rewriting engine passes through but the interpreter does not run
const UNSUPPORTED_HEADS: &[&str] = &["class", "with", "match", "case", "import", "from", "yield", "async"];

fn parse_line(text: &str) -> ParseResult<Line> {
    let mut pairs = match LineParser::parse(Rule::line, text) {
        Ok(pairs) => pairs,
        Err(err) => {
            let head = first_word(text);
            if UNSUPPORTED_HEADS.contains(&head) {
                return Err(ParseError::Unsupported(format!("{} statement", head)));
            }
            return Err(err.into());
        }
    };
    let line = next(&mut pairs, "line")?;
    build_line(next(&mut line.into_inner(), "statement")?)
}

fn build_line(pair: Pair<Rule>) -> ParseResult<Line> {
    match pair.as_rule() {
        Rule::if_header => Ok(Line::If(build_header_expression(pair)?)),
        Rule::elif_header => Ok(Line::Elif(build_header_expression(pair)?)),
        Rule::else_header => Ok(Line::Else),
        Rule::while_header => Ok(Line::While(build_header_expression(pair)?)),
        Rule::for_header => {
            let mut inner = significant(pair);
            let target = build_target_list(next(&mut inner, "loop target")?)?;
            let iter = build_testlist(next(&mut inner, "iterable")?)?;
            Ok(Line::For(target, iter))
        }
        Rule::try_header => Ok(Line::Try),
        Rule::except_header => {
            let mut inner = significant(pair);
            let filter = inner.next().map(build_expression).transpose()?;
            let name = inner.next().map(|p| p.as_str().to_string());
            Ok(Line::Except(filter, name))
        }
        Rule::finally_header => Ok(Line::Finally),
        Rule::def_header => Ok(Line::Def(build_def_header(pair)?)),
        Rule::decorator => Ok(Line::Decorator(build_expression(next(
            &mut pair.into_inner(),
            "decorator",
        )?)?)),
        _ => Ok(Line::Simple(build_statement(pair)?)),
    }
}

fn build_header_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    build_expression(next(&mut significant(pair), "condition")?)
}

fn build_def_header(pair: Pair<Rule>) -> ParseResult<DefSignature> {
    let mut is_async = false;
    let mut name = None;
    let mut params = Vec::new();
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_async => is_async = true,
            Rule::ident => name = Some(child.as_str().to_string()),
            Rule::param_list => params = build_params(child)?,
            // `def` keyword and the return annotation
            _ => {}
        }
    }
    match name {
        Some(name) => Ok(DefSignature {
            name,
            params,
            is_async,
        }),
        None => build_error("definition without a name"),
    }
}

fn build_params(pair: Pair<Rule>) -> ParseResult<Vec<ParamSpec>> {
    let mut params = Vec::new();
    let mut keyword_only = false;

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::param | Rule::lambda_param => {
                let mut inner = item.into_inner();
                let name = next(&mut inner, "parameter name")?.as_str().to_string();
                let mut default = None;
                for part in inner {
                    if part.as_rule() == Rule::param_default {
                        default = Some(build_expression(next(&mut part.into_inner(), "default")?)?);
                    }
                }
                params.push(ParamSpec {
                    name,
                    default,
                    kind: if keyword_only {
                        ParamKind::KeywordOnly
                    } else {
                        ParamKind::Positional
                    },
                });
            }
            Rule::var_args | Rule::star_param => {
                let name = next(&mut item.into_inner(), "parameter name")?.as_str().to_string();
                params.push(ParamSpec {
                    name,
                    default: None,
                    kind: ParamKind::VarArgs,
                });
                keyword_only = true;
            }
            Rule::var_kw | Rule::dstar_param => {
                let name = next(&mut item.into_inner(), "parameter name")?.as_str().to_string();
                params.push(ParamSpec {
                    name,
                    default: None,
                    kind: ParamKind::VarKw,
                });
            }
            Rule::bare_star => keyword_only = true,
            Rule::slash => {}
            other => return build_error(format!("unexpected parameter {:?}", other)),
        }
    }
    Ok(params)
}

/* ===================== Statements ===================== */

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    match pair.as_rule() {
        Rule::pass_stmt | Rule::scope_stmt => Ok(Stmt::Pass),
        Rule::break_stmt => Ok(Stmt::Break),
        Rule::continue_stmt => Ok(Stmt::Continue),
        Rule::return_stmt => {
            let value = significant(pair).next().map(build_testlist).transpose()?;
            Ok(Stmt::Return { value })
        }
        Rule::raise_stmt => {
            let mut inner = significant(pair);
            let exc = inner.next().map(build_expression).transpose()?;
            let cause = inner.next().map(build_expression).transpose()?;
            Ok(Stmt::Raise { exc, cause })
        }
        Rule::del_stmt => {
            let targets = match build_target_list(next(&mut significant(pair), "target")?)? {
                Target::Unpack { items } => items,
                single => vec![single],
            };
            Ok(Stmt::Del { targets })
        }
        Rule::assert_stmt => {
            let mut inner = significant(pair);
            let test = build_expression(next(&mut inner, "assertion")?)?;
            let msg = inner.next().map(build_expression).transpose()?;
            Ok(Stmt::Assert { test, msg })
        }
        Rule::aug_assign => {
            let mut inner = pair.into_inner();
            let target = build_target(next(&mut inner, "target")?)?;
            let symbol = next(&mut inner, "operator")?.as_str().trim_end_matches('=').to_string();
            let value = build_testlist(next(&mut inner, "value")?)?;
            if matches!(target, Target::Unpack { .. } | Target::Starred { .. }) {
                return build_error("illegal expression for augmented assignment");
            }
            let op = BinOp::from_symbol(&symbol)
                .ok_or_else(|| ParseError::Build(format!("unknown operator `{}=`", symbol)))?;
            Ok(Stmt::AugAssign { target, op, value })
        }
        Rule::assign => {
            let mut parts: Vec<Pair<Rule>> = pair.into_inner().collect();
            let value = build_testlist(
                parts
                    .pop()
                    .ok_or_else(|| ParseError::Build("missing assigned value".into()))?,
            )?;
            let targets = parts
                .into_iter()
                .map(build_target_list)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Stmt::Assign { targets, value })
        }
        Rule::expr_stmt => Ok(Stmt::Expr {
            value: build_testlist(next(&mut pair.into_inner(), "expression")?)?,
        }),
        other => build_error(format!("unexpected statement {:?}", other)),
    }
}

/* ===================== Targets ===================== */

fn build_target_list(pair: Pair<Rule>) -> ParseResult<Target> {
    let mut items = Vec::new();
    let mut comma = false;
    for child in pair.into_inner() {
        if child.as_rule() == Rule::comma {
            comma = true;
        } else {
            items.push(build_target(child)?);
        }
    }
    if items.len() == 1 && !comma && !matches!(items[0], Target::Starred { .. }) {
        Ok(items.remove(0))
    } else {
        Ok(Target::Unpack { items })
    }
}

fn build_target(pair: Pair<Rule>) -> ParseResult<Target> {
    let inner = next(&mut pair.into_inner(), "target")?;
    match inner.as_rule() {
        Rule::star_target => Ok(Target::Starred {
            target: Box::new(build_target(next(&mut inner.into_inner(), "target")?)?),
        }),
        Rule::paren_target => build_target_list(next(&mut inner.into_inner(), "targets")?),
        Rule::bracket_target => match build_target_list(next(&mut inner.into_inner(), "targets")?)? {
            Target::Unpack { items } => Ok(Target::Unpack { items }),
            single => Ok(Target::Unpack { items: vec![single] }),
        },
        Rule::primary => target_from_expr(build_primary(inner)?),
        other => build_error(format!("unexpected target {:?}", other)),
    }
}

fn target_from_expr(expr: Expr) -> ParseResult<Target> {
    match expr {
        Expr::Name { name } => Ok(Target::Name { name }),
        Expr::Scratch { key } => Ok(Target::Scratch { key }),
        Expr::Subscript { target, index } => Ok(Target::Subscript { target, index }),
        Expr::Attr { .. } => Err(ParseError::Unsupported("attribute assignment".into())),
        _ => build_error("cannot assign to expression"),
    }
}

/* ===================== Expressions ===================== */

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::expression => build_expression(next(&mut pair.into_inner(), "expression")?),
        Rule::ternary => {
            let mut inner = significant(pair);
            let then = build_expression(next(&mut inner, "operand")?)?;
            match inner.next() {
                None => Ok(then),
                Some(cond) => {
                    let cond = build_expression(cond)?;
                    let orelse = build_expression(next(&mut inner, "else branch")?)?;
                    Ok(Expr::Ternary {
                        cond: Box::new(cond),
                        then: Box::new(then),
                        orelse: Box::new(orelse),
                    })
                }
            }
        }
        Rule::lambda_expr => {
            let mut params = Vec::new();
            let mut body = None;
            for child in significant(pair) {
                match child.as_rule() {
                    Rule::lambda_param_list => params = build_params(child)?,
                    _ => body = Some(build_expression(child)?),
                }
            }
            match body {
                Some(body) => Ok(Expr::Lambda {
                    params,
                    body: Box::new(body),
                }),
                None => build_error("lambda without a body"),
            }
        }
        Rule::disjunction | Rule::conjunction => {
            let op = if pair.as_rule() == Rule::disjunction {
                BoolOp::Or
            } else {
                BoolOp::And
            };
            let mut operands = significant(pair);
            let mut expr = build_expression(next(&mut operands, "operand")?)?;
            for operand in operands {
                expr = Expr::Bool {
                    op,
                    lhs: Box::new(expr),
                    rhs: Box::new(build_expression(operand)?),
                };
            }
            Ok(expr)
        }
        Rule::inversion => {
            let mut inner = pair.into_inner();
            let first = next(&mut inner, "operand")?;
            if first.as_rule() == Rule::kw_not {
                let operand = build_expression(next(&mut inner, "operand")?)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            } else {
                build_expression(first)
            }
        }
        Rule::comparison => {
            let mut inner = pair.into_inner();
            let first = build_expression(next(&mut inner, "operand")?)?;
            let mut rest = Vec::new();
            while let Some(op) = inner.next() {
                let op = build_comp_op(op)?;
                rest.push((op, build_expression(next(&mut inner, "operand")?)?));
            }
            if rest.is_empty() {
                Ok(first)
            } else {
                Ok(Expr::Compare {
                    first: Box::new(first),
                    rest,
                })
            }
        }
        Rule::bitwise => build_bitwise(pair.into_inner()),
        Rule::primary => build_primary(pair),
        Rule::await_expr => Ok(Expr::Await {
            value: Box::new(build_expression(next(&mut significant(pair), "awaited value")?)?),
        }),
        Rule::named => {
            let mut inner = pair.into_inner();
            let name = next(&mut inner, "name")?.as_str().to_string();
            let value = build_expression(next(&mut inner, "value")?)?;
            Ok(Expr::Walrus {
                name,
                value: Box::new(value),
            })
        }
        Rule::starred => Ok(Expr::Starred {
            value: Box::new(build_expression(next(&mut pair.into_inner(), "starred value")?)?),
        }),
        Rule::testlist | Rule::elements => build_testlist(pair),
        _ => build_atom(pair),
    }
}

fn build_comp_op(pair: Pair<Rule>) -> ParseResult<CmpOp> {
    let op = next(&mut pair.into_inner(), "comparison operator")?;
    Ok(match op.as_rule() {
        Rule::op_eq => CmpOp::Eq,
        Rule::op_ne => CmpOp::NotEq,
        Rule::op_le => CmpOp::LtE,
        Rule::op_ge => CmpOp::GtE,
        Rule::op_lt => CmpOp::Lt,
        Rule::op_gt => CmpOp::Gt,
        Rule::op_not_in => CmpOp::NotIn,
        Rule::op_is_not => CmpOp::IsNot,
        Rule::op_in => CmpOp::In,
        Rule::op_is => CmpOp::Is,
        other => return build_error(format!("unexpected comparison {:?}", other)),
    })
}

fn binary_op(rule: Rule) -> ParseResult<BinOp> {
    Ok(match rule {
        Rule::op_pow => BinOp::Pow,
        Rule::op_floordiv => BinOp::FloorDiv,
        Rule::op_lshift => BinOp::LShift,
        Rule::op_rshift => BinOp::RShift,
        Rule::op_add => BinOp::Add,
        Rule::op_sub => BinOp::Sub,
        Rule::op_mul => BinOp::Mul,
        Rule::op_matmul => BinOp::MatMul,
        Rule::op_div => BinOp::Div,
        Rule::op_mod => BinOp::Mod,
        Rule::op_bitor => BinOp::BitOr,
        Rule::op_bitxor => BinOp::BitXor,
        Rule::op_bitand => BinOp::BitAnd,
        other => return build_error(format!("unexpected operator {:?}", other)),
    })
}

fn build_bitwise(pairs: Pairs<Rule>) -> ParseResult<Expr> {
    pratt()
        .map_primary(build_expression)
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::op_neg => UnaryOp::Neg,
                Rule::op_pos => UnaryOp::Pos,
                _ => UnaryOp::Invert,
            };
            Ok(fold_unary(op, operand?))
        })
        .map_infix(|lhs, op, rhs| {
            Ok(Expr::Binary {
                op: binary_op(op.as_rule())?,
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
            })
        })
        .parse(pairs)
}

/// `-1` is a literal, not a negation
fn fold_unary(op: UnaryOp, operand: Expr) -> Expr {
    match (op, operand) {
        (UnaryOp::Neg, Expr::Lit { v: Val::Int(n) }) if n != i64::MIN => Expr::Lit { v: Val::Int(-n) },
        (UnaryOp::Neg, Expr::Lit { v: Val::Float(f) }) => Expr::Lit { v: Val::Float(-f) },
        (op, operand) => Expr::Unary {
            op,
            operand: Box::new(operand),
        },
    }
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_atom(next(&mut inner, "atom")?)?;

    for trailer in inner {
        expr = match trailer.as_rule() {
            Rule::call => {
                let args = match trailer.into_inner().next() {
                    Some(list) => build_arguments(list)?,
                    None => Vec::new(),
                };
                match expr {
                    Expr::Attr { recv, name } => Expr::Method { recv, name, args },
                    func => Expr::Call {
                        func: Box::new(func),
                        args,
                    },
                }
            }
            Rule::subscription => {
                let list = next(&mut trailer.into_inner(), "subscript")?;
                Expr::Subscript {
                    target: Box::new(expr),
                    index: Box::new(build_subscript_list(list)?),
                }
            }
            Rule::attribute => {
                let name = next(&mut trailer.into_inner(), "attribute name")?.as_str().to_string();
                Expr::Attr {
                    recv: Box::new(expr),
                    name,
                }
            }
            other => return build_error(format!("unexpected trailer {:?}", other)),
        };
    }
    Ok(expr)
}

fn build_atom(pair: Pair<Rule>) -> ParseResult<Expr> {
    match pair.as_rule() {
        Rule::kw_none => Ok(Expr::Lit { v: Val::None }),
        Rule::kw_true => Ok(Expr::Lit { v: Val::Bool(true) }),
        Rule::kw_false => Ok(Expr::Lit { v: Val::Bool(false) }),
        Rule::number => build_number(pair.as_str()),
        Rule::strings => build_strings(pair),
        Rule::ident => Ok(Expr::Name {
            name: pair.as_str().to_string(),
        }),
        Rule::scratch => SlotKey::parse(pair.as_str())
            .map(|key| Expr::Scratch { key })
            .ok_or_else(|| ParseError::Build(format!("unknown scratch slot `{}`", pair.as_str()))),
        Rule::paren => match pair.into_inner().next() {
            None => Ok(Expr::Tuple { items: Vec::new() }),
            Some(inner) if inner.as_rule() == Rule::comprehension => build_comprehension(inner, CompKind::Gen),
            Some(inner) => build_testlist(inner),
        },
        Rule::list_display => match pair.into_inner().next() {
            None => Ok(Expr::List { items: Vec::new() }),
            Some(inner) if inner.as_rule() == Rule::comprehension => build_comprehension(inner, CompKind::List),
            Some(inner) => Ok(Expr::List {
                items: build_items(inner)?.0,
            }),
        },
        Rule::dict_display => match pair.into_inner().next() {
            None => Ok(Expr::Dict { items: Vec::new() }),
            Some(inner) if inner.as_rule() == Rule::dict_comprehension => {
                build_comprehension(inner, CompKind::Dict)
            }
            Some(inner) => build_dict_items(inner),
        },
        Rule::expression | Rule::primary => build_expression(pair),
        other => build_error(format!("unexpected expression {:?}", other)),
    }
}

fn build_items(pair: Pair<Rule>) -> ParseResult<(Vec<Expr>, bool)> {
    let mut items = Vec::new();
    let mut comma = false;
    for child in pair.into_inner() {
        if child.as_rule() == Rule::comma {
            comma = true;
        } else {
            items.push(build_expression(child)?);
        }
    }
    Ok((items, comma))
}

/// A bare expression, or a tuple when commas or starred items appear
fn build_testlist(pair: Pair<Rule>) -> ParseResult<Expr> {
    let (mut items, comma) = build_items(pair)?;
    if items.len() == 1 && !comma && !matches!(items[0], Expr::Starred { .. }) {
        Ok(items.remove(0))
    } else {
        Ok(Expr::Tuple { items })
    }
}

fn build_dict_items(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut items = Vec::new();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::dict_pair => {
                let mut inner = item.into_inner();
                let key = build_expression(next(&mut inner, "key")?)?;
                let value = build_expression(next(&mut inner, "value")?)?;
                items.push(DictItem::Pair(key, value));
            }
            Rule::dict_spread => {
                items.push(DictItem::Spread(build_expression(next(&mut item.into_inner(), "mapping")?)?));
            }
            other => return build_error(format!("unexpected dict item {:?}", other)),
        }
    }
    Ok(Expr::Dict { items })
}

fn build_arguments(pair: Pair<Rule>) -> ParseResult<Vec<Arg>> {
    pair.into_inner()
        .map(|arg| {
            Ok(match arg.as_rule() {
                Rule::kwarg => {
                    let mut inner = arg.into_inner();
                    let name = next(&mut inner, "keyword")?.as_str().to_string();
                    Arg::Kw(name, build_expression(next(&mut inner, "keyword value")?)?)
                }
                Rule::star_arg => Arg::Star(build_expression(next(&mut arg.into_inner(), "argument")?)?),
                Rule::dstar_arg => Arg::DoubleStar(build_expression(next(&mut arg.into_inner(), "argument")?)?),
                Rule::comprehension => Arg::Pos(build_comprehension(arg, CompKind::Gen)?),
                _ => Arg::Pos(build_expression(arg)?),
            })
        })
        .collect()
}

fn build_subscript_list(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut items = Vec::new();
    let mut comma = false;
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::comma => comma = true,
            Rule::slice => items.push(build_slice(child)?),
            _ => items.push(build_expression(child)?),
        }
    }
    if items.len() == 1 && !comma {
        Ok(items.remove(0))
    } else {
        Ok(Expr::Tuple { items })
    }
}

fn build_slice(pair: Pair<Rule>) -> ParseResult<Expr> {
    let (mut lo, mut hi, mut step) = (None, None, None);
    for part in pair.into_inner() {
        let rule = part.as_rule();
        let value = Some(Box::new(build_expression(next(&mut part.into_inner(), "slice bound")?)?));
        match rule {
            Rule::slice_lo => lo = value,
            Rule::slice_hi => hi = value,
            _ => step = value,
        }
    }
    Ok(Expr::Slice { lo, hi, step })
}

fn build_comprehension(pair: Pair<Rule>, kind: CompKind) -> ParseResult<Expr> {
    let mut inner = pair.into_inner();
    let elt = build_expression(next(&mut inner, "element")?)?;
    let value = if kind == CompKind::Dict {
        Some(Box::new(build_expression(next(&mut inner, "value")?)?))
    } else {
        None
    };
    let clauses = inner.map(build_comp_for).collect::<ParseResult<Vec<_>>>()?;
    Ok(Expr::Comprehension {
        kind,
        elt: Box::new(elt),
        value,
        clauses,
    })
}

fn build_comp_for(pair: Pair<Rule>) -> ParseResult<CompClause> {
    let mut inner = significant(pair);
    let target = build_target_list(next(&mut inner, "target")?)?;
    let iter = build_expression(next(&mut inner, "iterable")?)?;
    let conds = inner
        .map(|cond| build_expression(next(&mut significant(cond), "condition")?))
        .collect::<ParseResult<Vec<_>>>()?;
    Ok(CompClause { target, iter, conds })
}

/* ===================== Literals ===================== */

fn build_number(text: &str) -> ParseResult<Expr> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    let lower = clean.to_ascii_lowercase();
    let radix = [("0x", 16), ("0b", 2), ("0o", 8)]
        .into_iter()
        .find_map(|(prefix, radix)| lower.strip_prefix(prefix).map(|digits| (digits, radix)));

    let value = match radix {
        Some((digits, radix)) => i64::from_str_radix(digits, radix).map(Val::Int).map_err(|e| e.to_string()),
        None if lower.contains('.') || lower.contains('e') => {
            clean.parse::<f64>().map(Val::Float).map_err(|e| e.to_string())
        }
        None => clean.parse::<i64>().map(Val::Int).map_err(|e| e.to_string()),
    };
    value
        .map(|v| Expr::Lit { v })
        .map_err(|e| ParseError::Build(format!("invalid number `{}`: {}", text, e)))
}

fn build_strings(pair: Pair<Rule>) -> ParseResult<Expr> {
    let mut parts: Vec<FPart> = Vec::new();
    let mut formatted = false;

    for piece in pair.into_inner() {
        let (prefix, body) = split_string(piece.as_str())?;
        let raw = prefix.chars().any(|c| c == 'r' || c == 'R');
        if prefix.chars().any(|c| c == 'f' || c == 'F') {
            formatted = true;
            for part in fstring_parts(body, raw)? {
                push_part(&mut parts, part);
            }
        } else {
            push_part(&mut parts, FPart::Lit(unescape(body, raw)));
        }
    }

    if formatted {
        return Ok(Expr::FString { parts });
    }
    let text = parts
        .into_iter()
        .map(|part| match part {
            FPart::Lit(text) => text,
            FPart::Expr { .. } => String::new(),
        })
        .collect();
    Ok(Expr::Lit { v: Val::Str(text) })
}

fn push_part(parts: &mut Vec<FPart>, part: FPart) {
    if let (FPart::Lit(text), Some(FPart::Lit(last))) = (&part, parts.last_mut()) {
        last.push_str(text);
        return;
    }
    parts.push(part);
}

fn split_string(token: &str) -> ParseResult<(&str, &str)> {
    let quote_at = token
        .find(|c: char| c == '"' || c == '\'')
        .ok_or_else(|| ParseError::Build("string without quotes".into()))?;
    let (prefix, rest) = token.split_at(quote_at);
    let width = if rest.starts_with("\"\"\"") || rest.starts_with("'''") { 3 } else { 1 };
    if rest.len() < 2 * width {
        return build_error("unterminated string literal");
    }
    Ok((prefix, &rest[width..rest.len() - width]))
}

fn unescape(text: &str, raw: bool) -> String {
    if raw || !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push(kind);
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn fstring_parts(body: &str, raw: bool) -> ParseResult<Vec<FPart>> {
    let chars: Vec<char> = body.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => {
                literal.push('{');
                i += 2;
            }
            '{' => {
                let end = interpolation_end(&chars, i + 1)?;
                if !literal.is_empty() {
                    parts.push(FPart::Lit(unescape(&std::mem::take(&mut literal), raw)));
                }
                let inner: String = chars[i + 1..end].iter().collect();
                parts.push(build_interpolation(&inner)?);
                i = end + 1;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                literal.push('}');
                i += 2;
            }
            '}' => return build_error("f-string: single '}' is not allowed"),
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        parts.push(FPart::Lit(unescape(&literal, raw)));
    }
    Ok(parts)
}

fn interpolation_end(chars: &[char], mut i: usize) -> ParseResult<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '}' if depth == 0 => return Ok(i),
                '}' => depth -= 1,
                _ => {}
            },
        }
        i += 1;
    }
    build_error("f-string: expecting '}'")
}

fn build_interpolation(inner: &str) -> ParseResult<FPart> {
    let chars: Vec<char> = inner.chars().collect();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut expr_end = chars.len();
    let mut conversion = None;
    let mut spec = None;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => {
                expr_end = i;
                conversion = chars.get(i + 1).copied();
                if chars.get(i + 2) == Some(&':') {
                    spec = Some(chars[i + 3..].iter().collect());
                }
                break;
            }
            ':' if depth == 0 => {
                expr_end = i;
                spec = Some(chars[i + 1..].iter().collect());
                break;
            }
            _ => {}
        }
    }

    if let Some(c) = conversion {
        if !matches!(c, 'r' | 's' | 'a') {
            return build_error(format!("f-string: invalid conversion character '{}'", c));
        }
    }
    let text: String = chars[..expr_end].iter().collect();
    Ok(FPart::Expr {
        expr: parse_expression_text(text.trim())?,
        conversion,
        spec,
    })
}

fn parse_expression_text(text: &str) -> ParseResult<Expr> {
    let mut pairs = LineParser::parse(Rule::expression_only, text)?;
    let top = next(&mut pairs, "expression")?;
    build_testlist(next(&mut top.into_inner(), "expression")?)
}

/* ===================== Block Builder ===================== */

struct RawLine<'a> {
    index: usize,
    indent: usize,
    text: &'a str,
    full: &'a str,
}

struct BlockBuilder<'a> {
    lines: Vec<RawLine<'a>>,
    pos: usize,
}

/// Parse indented lines into statements; `Node::line` indexes `lines`
pub fn parse_block(lines: &[String]) -> EngineResult<Vec<Node>> {
    let raw: Vec<RawLine> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, full)| {
            let text = full.trim_start_matches(' ');
            (!text.trim().is_empty()).then(|| RawLine {
                index,
                indent: full.len() - text.len(),
                text: text.trim_end(),
                full,
            })
        })
        .collect();

    let base = raw.iter().map(|line| line.indent).min().unwrap_or(0);
    let mut builder = BlockBuilder { lines: raw, pos: 0 };
    let nodes = builder.block(base)?;
    match builder.lines.get(builder.pos) {
        Some(stray) => Err(EngineError::parse(
            stray.index,
            "unindent does not match any outer indentation level",
        )),
        None => Ok(nodes),
    }
}

/// Parse one expression, e.g. a parameter default
pub fn parse_expression(text: &str) -> EngineResult<Expr> {
    parse_expression_text(text).map_err(|e| e.located(0))
}

/// Parse a `def` header line
pub fn parse_signature(header: &str) -> EngineResult<DefSignature> {
    match parse_line(header).map_err(|e| e.located(0))? {
        Line::Def(signature) => Ok(signature),
        _ => Err(EngineError::parse(0, "expected a function definition")),
    }
}

impl<'a> BlockBuilder<'a> {
    fn peek(&self) -> Option<&RawLine<'a>> {
        self.lines.get(self.pos)
    }

    fn clause_at(&self, indent: usize, word: &str) -> Option<usize> {
        self.peek()
            .filter(|line| line.indent == indent && first_word(line.text) == word)
            .map(|line| line.index)
    }

    fn parse_at(&self, pos: usize) -> EngineResult<Line> {
        let raw = &self.lines[pos];
        parse_line(raw.text).map_err(|e| e.located(raw.index))
    }

    fn body(&mut self, indent: usize, header: usize) -> EngineResult<Vec<Node>> {
        match self.peek() {
            Some(next) if next.indent > indent => {
                let inner = next.indent;
                self.block(inner)
            }
            _ => Err(EngineError::parse(header, "expected an indented block")),
        }
    }

    fn block(&mut self, indent: usize) -> EngineResult<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut decorators: Vec<Expr> = Vec::new();

        while let Some(raw) = self.peek() {
            if raw.indent < indent {
                break;
            }
            let index = raw.index;
            if raw.indent > indent {
                return Err(EngineError::parse(index, "unexpected indent"));
            }
            let line = self.parse_at(self.pos)?;
            self.pos += 1;

            if !decorators.is_empty() && !matches!(line, Line::Decorator(_) | Line::Def(_)) {
                return Err(EngineError::parse(index, "decorator must precede a definition"));
            }
            let stmt = match line {
                Line::Simple(stmt) => stmt,
                Line::Decorator(expr) => {
                    decorators.push(expr);
                    continue;
                }
                Line::If(cond) => {
                    let body = self.body(indent, index)?;
                    let orelse = self.if_tail(indent)?;
                    Stmt::If { cond, body, orelse }
                }
                Line::While(cond) => {
                    let body = self.body(indent, index)?;
                    let orelse = self.else_clause(indent)?;
                    Stmt::While { cond, body, orelse }
                }
                Line::For(target, iter) => {
                    let body = self.body(indent, index)?;
                    let orelse = self.else_clause(indent)?;
                    Stmt::For {
                        target,
                        iter,
                        body,
                        orelse,
                    }
                }
                Line::Try => self.try_statement(indent, index)?,
                Line::Def(signature) => {
                    let decorators = std::mem::take(&mut decorators);
                    Stmt::Def {
                        def: Box::new(self.definition(signature, decorators, indent, index)?),
                    }
                }
                Line::Elif(_) | Line::Else | Line::Except(..) | Line::Finally => {
                    return Err(EngineError::parse(index, "clause without a matching statement"));
                }
            };
            nodes.push(Node { line: index, stmt });
        }

        if let Some(line) = self.lines.get(self.pos.saturating_sub(1)).filter(|_| !decorators.is_empty()) {
            return Err(EngineError::parse(line.index, "decorator must precede a definition"));
        }
        Ok(nodes)
    }

    fn if_tail(&mut self, indent: usize) -> EngineResult<Vec<Node>> {
        if let Some(index) = self.clause_at(indent, "elif") {
            let Line::Elif(cond) = self.parse_at(self.pos)? else {
                return Err(EngineError::parse(index, "malformed elif"));
            };
            self.pos += 1;
            let body = self.body(indent, index)?;
            let orelse = self.if_tail(indent)?;
            return Ok(vec![Node {
                line: index,
                stmt: Stmt::If { cond, body, orelse },
            }]);
        }
        self.else_clause(indent)
    }

    fn else_clause(&mut self, indent: usize) -> EngineResult<Vec<Node>> {
        match self.clause_at(indent, "else") {
            Some(index) => {
                if self.parse_at(self.pos)? != Line::Else {
                    return Err(EngineError::parse(index, "malformed else"));
                }
                self.pos += 1;
                self.body(indent, index)
            }
            None => Ok(Vec::new()),
        }
    }

    fn try_statement(&mut self, indent: usize, index: usize) -> EngineResult<Stmt> {
        let body = self.body(indent, index)?;

        let mut handlers = Vec::new();
        while let Some(at) = self.clause_at(indent, "except") {
            let Line::Except(filter, name) = self.parse_at(self.pos)? else {
                return Err(EngineError::parse(at, "malformed except"));
            };
            self.pos += 1;
            let body = self.body(indent, at)?;
            handlers.push(Handler { filter, name, body });
        }

        let orelse = if handlers.is_empty() {
            Vec::new()
        } else {
            self.else_clause(indent)?
        };
        let finalbody = match self.clause_at(indent, "finally") {
            Some(at) => {
                self.pos += 1;
                self.body(indent, at)?
            }
            None => Vec::new(),
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(EngineError::parse(index, "expected 'except' or 'finally' block"));
        }
        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn definition(
        &mut self,
        signature: DefSignature,
        decorators: Vec<Expr>,
        indent: usize,
        index: usize,
    ) -> EngineResult<DefSpec> {
        let start = self.pos;
        let mut end = start;
        while self.lines.get(end).map_or(false, |line| line.indent > indent) {
            end += 1;
        }
        if end == start {
            return Err(EngineError::parse(index, "expected an indented block"));
        }

        let body = if suspends(&self.lines[start..end]) {
            let mut source = self.lines[start - 1].text.to_string();
            for line in &self.lines[start..end] {
                source.push('\n');
                source.push_str(&line.full[indent..]);
            }
            self.pos = end;
            DefBody::Generator {
                source,
                is_async: signature.is_async,
            }
        } else {
            DefBody::Block(self.body(indent, index)?)
        };

        Ok(DefSpec {
            name: signature.name,
            params: signature.params,
            decorators,
            body,
        })
    }
}

/// Whether a function body (nested definitions excluded) contains `yield`
fn suspends(lines: &[RawLine]) -> bool {
    let mut nested: Option<usize> = None;
    for line in lines {
        if let Some(at) = nested {
            if line.indent > at {
                continue;
            }
            nested = None;
        }
        let word = first_word(line.text);
        if word == "def" || word == "class" || (word == "async" && line.text.starts_with("async def")) {
            nested = Some(line.indent);
            continue;
        }
        let yields = scanner::tokenize(line.text)
            .map(|tokens| tokens.iter().any(|t| t.kind == TokKind::Name && t.text == "yield"))
            .unwrap_or(false);
        if yields {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> Expr {
        parse_expression(text).unwrap()
    }

    fn name(n: &str) -> Expr {
        Expr::Name { name: n.to_string() }
    }

    fn int(n: i64) -> Expr {
        Expr::Lit { v: Val::Int(n) }
    }

    fn block(lines: &[&str]) -> Vec<Node> {
        parse_block(&lines.iter().map(|l| l.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(int(1)),
                rhs: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    lhs: Box::new(int(2)),
                    rhs: Box::new(int(3)),
                }),
            }
        );
        // unary minus binds looser than `**`
        assert_eq!(
            expr("-2 ** 2"),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Binary {
                    op: BinOp::Pow,
                    lhs: Box::new(int(2)),
                    rhs: Box::new(int(2)),
                }),
            }
        );
        assert_eq!(expr("-3"), int(-3));
    }

    #[test]
    fn test_scratch_slots_and_methods() {
        assert_eq!(
            expr(".args.pop(0)"),
            Expr::Method {
                recv: Box::new(Expr::Scratch { key: SlotKey::Args }),
                name: "pop".to_string(),
                args: vec![Arg::Pos(int(0))],
            }
        );
        assert_eq!(expr(".12"), Expr::Scratch { key: SlotKey::Tracked(12) });
    }

    #[test]
    fn test_comparison_chain_and_membership() {
        let Expr::Compare { rest, .. } = expr("a < b <= c not in d") else {
            panic!("expected a comparison");
        };
        let ops: Vec<CmpOp> = rest.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::NotIn]);
    }

    #[test]
    fn test_ternary_lambda_and_walrus() {
        assert!(matches!(expr("a if c else b"), Expr::Ternary { .. }));
        assert!(matches!(expr("lambda x, y=1: x + y"), Expr::Lambda { ref params, .. } if params.len() == 2));
        assert!(matches!(expr("(n := 5)"), Expr::Walrus { .. }));
    }

    #[test]
    fn test_tuples_and_comprehensions() {
        assert_eq!(expr("1,"), Expr::Tuple { items: vec![int(1)] });
        assert_eq!(expr("(1)"), int(1));
        assert!(matches!(
            expr("[x * 2 for x in xs if x]"),
            Expr::Comprehension { kind: CompKind::List, ref clauses, .. } if clauses[0].conds.len() == 1
        ));
        assert!(matches!(
            expr("{k: v for k, v in items}"),
            Expr::Comprehension { kind: CompKind::Dict, .. }
        ));
        assert!(matches!(
            expr("sum(x for x in xs)"),
            Expr::Call { ref args, .. } if matches!(args[0], Arg::Pos(Expr::Comprehension { kind: CompKind::Gen, .. }))
        ));
    }

    #[test]
    fn test_strings_and_fstrings() {
        assert_eq!(expr("'a' \"b\""), Expr::Lit { v: Val::str("ab") });
        assert_eq!(expr("'tab\\there'"), Expr::Lit { v: Val::str("tab\there") });
        assert_eq!(expr("r'\\n'"), Expr::Lit { v: Val::str("\\n") });

        let Expr::FString { parts } = expr("f'{x!r:>4} and {{braces}}'") else {
            panic!("expected an f-string");
        };
        assert_eq!(
            parts,
            vec![
                FPart::Expr {
                    expr: name("x"),
                    conversion: Some('r'),
                    spec: Some(">4".to_string()),
                },
                FPart::Lit(" and {braces}".to_string()),
            ]
        );
    }

    #[test]
    fn test_statements() {
        let nodes = block(&[
            "a, *rest = items",
            "x = y = 0",
            ".args += [.send]",
            "total **= 2",
            "del d[k]",
            "return Termination()",
        ]);
        assert!(matches!(&nodes[0].stmt, Stmt::Assign { targets, .. } if matches!(&targets[0], Target::Unpack { items } if items.len() == 2)));
        assert!(matches!(&nodes[1].stmt, Stmt::Assign { targets, .. } if targets.len() == 2));
        assert!(matches!(&nodes[2].stmt, Stmt::AugAssign { target: Target::Scratch { key: SlotKey::Args }, op: BinOp::Add, .. }));
        assert!(matches!(&nodes[3].stmt, Stmt::AugAssign { op: BinOp::Pow, .. }));
        assert!(matches!(&nodes[4].stmt, Stmt::Del { targets } if targets.len() == 1));
        assert!(matches!(&nodes[5].stmt, Stmt::Return { value: Some(Expr::Call { .. }) }));
    }

    #[test]
    fn test_blocks_nest_by_indentation() {
        let nodes = block(&[
            "    if a:",
            "        x = 1",
            "    elif b:",
            "        x = 2",
            "    else:",
            "        x = 3",
            "    for i in .4:",
            "        pass",
            "    else:",
            "        y = 1",
            "    try:",
            "        pass",
            "    except (ValueError, KeyError) as e:",
            "        raise",
            "    finally:",
            "        z = 1",
        ]);
        assert_eq!(nodes.len(), 3);
        let Stmt::If { orelse, .. } = &nodes[0].stmt else {
            panic!("expected if");
        };
        assert!(matches!(&orelse[0].stmt, Stmt::If { orelse, .. } if orelse.len() == 1));
        assert!(matches!(&nodes[1].stmt, Stmt::For { orelse, .. } if orelse.len() == 1));
        assert!(matches!(
            &nodes[2].stmt,
            Stmt::Try { handlers, finalbody, .. } if handlers[0].name.as_deref() == Some("e") && finalbody.len() == 1
        ));
        assert_eq!(nodes[2].line, 10);
    }

    #[test]
    fn test_nested_generator_definition_keeps_source() {
        let nodes = block(&[
            "    @wrap",
            "    def inner(n, *, step=1):",
            "        for i in range(n):",
            "            yield i",
            "    x = 1",
        ]);
        let Stmt::Def { def } = &nodes[0].stmt else {
            panic!("expected def");
        };
        assert_eq!(def.decorators, vec![name("wrap")]);
        assert_eq!(def.params[1].kind, ParamKind::KeywordOnly);
        assert_eq!(
            def.body,
            DefBody::Generator {
                source: "def inner(n, *, step=1):\n    for i in range(n):\n        yield i".to_string(),
                is_async: false,
            }
        );
        assert!(matches!(nodes[1].stmt, Stmt::Assign { .. }));
    }

    #[test]
    fn test_errors_are_located() {
        let lines: Vec<String> = vec!["x = 1".into(), "class C:".into()];
        assert!(matches!(
            parse_block(&lines),
            Err(EngineError::UnsupportedConstruct { line: 1, .. })
        ));
        let lines: Vec<String> = vec!["if x:".into(), "    y = (".into()];
        assert!(matches!(parse_block(&lines), Err(EngineError::Parse { line: 1, .. })));
        let lines: Vec<String> = vec!["a.b = 1".into()];
        assert!(matches!(
            parse_block(&lines),
            Err(EngineError::UnsupportedConstruct { line: 0, .. })
        ));
    }

    #[test]
    fn test_signature() {
        let signature = parse_signature("async def g(a, b=2, *rest, **kw):").unwrap();
        assert_eq!(signature.name, "g");
        assert!(signature.is_async);
        let kinds: Vec<ParamKind> = signature.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParamKind::Positional, ParamKind::Positional, ParamKind::VarArgs, ParamKind::VarKw]
        );
    }
}
