//! Resolution and evaluation of parsed scripts against the runtime builtins.

use crate::driver::parser::{Expr, ExprKind, Script};
use crate::runtime::builtins;
use crate::runtime::diagnostics;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::handle::Handle;
use crate::runtime::value::Value;
use std::ops::Range;
use std::sync::Arc;

/// Result of `print`, which has nothing meaningful to return.
pub const NOTHING_SYMBOL: &str = "Nothing";

#[derive(Clone, Copy)]
pub enum Builtin {
    Nullary(fn() -> RuntimeResult<Handle>),
    Unary(fn(&Value) -> RuntimeResult<Handle>),
    Binary(fn(&Value, &Value) -> RuntimeResult<Handle>),
    Ternary(fn(&Value, &Value, &Value) -> RuntimeResult<Handle>),
}

impl Builtin {
    pub fn arity(self) -> usize {
        match self {
            Builtin::Nullary(_) => 0,
            Builtin::Unary(_) => 1,
            Builtin::Binary(_) => 2,
            Builtin::Ternary(_) => 3,
        }
    }
}

fn equals(left: &Value, right: &Value) -> RuntimeResult<Handle> {
    Ok(builtins::equals(left, right))
}

fn type_of(value: &Value) -> RuntimeResult<Handle> {
    Ok(builtins::type_of(value))
}

fn to_debug_text(value: &Value) -> RuntimeResult<Handle> {
    Ok(builtins::to_debug_text(value))
}

fn print(value: &Value) -> RuntimeResult<Handle> {
    diagnostics::print(value);
    Ok(Handle::tag(NOTHING_SYMBOL))
}

fn panic(reason: &Value) -> RuntimeResult<Handle> {
    diagnostics::panic(reason)
}

fn environment() -> RuntimeResult<Handle> {
    Ok(Handle::environment())
}

pub const BUILTINS: &[(&str, Builtin)] = &[
    ("equals", Builtin::Binary(equals)),
    ("ifelse", Builtin::Ternary(builtins::if_else)),
    ("function_run", Builtin::Unary(builtins::function_run)),
    ("add", Builtin::Binary(builtins::int_add)),
    ("subtract", Builtin::Binary(builtins::int_subtract)),
    ("multiply", Builtin::Binary(builtins::int_multiply)),
    ("divide_truncating", Builtin::Binary(builtins::int_divide_truncating)),
    ("remainder", Builtin::Binary(builtins::int_remainder)),
    ("modulo", Builtin::Binary(builtins::int_modulo)),
    ("bit_length", Builtin::Unary(builtins::int_bit_length)),
    ("bitwise_and", Builtin::Binary(builtins::int_bitwise_and)),
    ("bitwise_or", Builtin::Binary(builtins::int_bitwise_or)),
    ("bitwise_xor", Builtin::Binary(builtins::int_bitwise_xor)),
    ("compare_to", Builtin::Binary(builtins::int_compare_to)),
    ("shift_left", Builtin::Binary(builtins::int_shift_left)),
    ("shift_right", Builtin::Binary(builtins::int_shift_right)),
    ("typeof", Builtin::Unary(type_of)),
    ("text_concatenate", Builtin::Binary(builtins::text_concatenate)),
    ("text_length", Builtin::Unary(builtins::text_length)),
    ("text_is_empty", Builtin::Unary(builtins::text_is_empty)),
    ("text_contains", Builtin::Binary(builtins::text_contains)),
    ("text_starts_with", Builtin::Binary(builtins::text_starts_with)),
    ("text_ends_with", Builtin::Binary(builtins::text_ends_with)),
    ("text_trim_start", Builtin::Unary(builtins::text_trim_start)),
    ("text_trim_end", Builtin::Unary(builtins::text_trim_end)),
    ("text_get_range", Builtin::Ternary(builtins::text_get_range)),
    ("to_debug_text", Builtin::Unary(to_debug_text)),
    ("print", Builtin::Unary(print)),
    ("panic", Builtin::Unary(panic)),
    ("environment", Builtin::Nullary(environment)),
];

pub fn lookup(name: &str) -> Option<(&'static str, Builtin)> {
    BUILTINS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .copied()
}

/// A script expression with every call resolved to its builtin.
#[derive(Clone)]
pub struct Node {
    pub op: Op,
    pub span: Range<usize>,
}

#[derive(Clone)]
pub enum Op {
    Call {
        name: &'static str,
        builtin: Builtin,
        args: Vec<Node>,
    },
    Thunk(Arc<Node>),
    Int(i128),
    Text(String),
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    UnknownFunction {
        name: String,
        span: Range<usize>,
        suggestion: Option<&'static str>,
    },
    Arity {
        name: &'static str,
        expected: usize,
        found: usize,
        span: Range<usize>,
    },
}

/// Resolves names and checks argument counts for the whole script before
/// anything runs.
pub fn resolve(script: &Script) -> Result<Vec<Node>, CheckError> {
    script.exprs.iter().map(resolve_expr).collect()
}

fn resolve_expr(expr: &Expr) -> Result<Node, CheckError> {
    let op = match &expr.kind {
        ExprKind::Call {
            name,
            name_span,
            args,
        } => {
            let Some((name, builtin)) = lookup(name) else {
                return Err(CheckError::UnknownFunction {
                    name: name.clone(),
                    span: name_span.clone(),
                    suggestion: suggest(name),
                });
            };
            if args.len() != builtin.arity() {
                return Err(CheckError::Arity {
                    name,
                    expected: builtin.arity(),
                    found: args.len(),
                    span: expr.span.clone(),
                });
            }
            Op::Call {
                name,
                builtin,
                args: args.iter().map(resolve_expr).collect::<Result<_, _>>()?,
            }
        }
        ExprKind::Thunk(body) => Op::Thunk(Arc::new(resolve_expr(body)?)),
        ExprKind::Int(value) => Op::Int(*value),
        ExprKind::Text(text) => Op::Text(text.clone()),
        ExprKind::Tag(name) => Op::Tag(name.clone()),
    };
    Ok(Node {
        op,
        span: expr.span.clone(),
    })
}

fn suggest(name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .map(|(candidate, _)| (edit_distance(name, candidate), *candidate))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut previous = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous + usize::from(ca != *cb);
            previous = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(previous + 1);
        }
    }
    row[b.len()]
}

/// Evaluates one node. Arguments are evaluated left to right and released as
/// soon as the call returns.
pub fn evaluate(node: &Node) -> RuntimeResult<Handle> {
    match &node.op {
        Op::Int(value) => Ok(Handle::int(*value)),
        Op::Text(text) => Ok(Handle::text(text)),
        Op::Tag(name) => Ok(Handle::tag(name)),
        Op::Thunk(body) => {
            let body = Arc::clone(body);
            Ok(Handle::closure(move || evaluate(&body)))
        }
        Op::Call {
            name,
            builtin,
            args,
        } => {
            let args = args.iter().map(evaluate).collect::<RuntimeResult<Vec<_>>>()?;
            apply(name, *builtin, &args)
        }
    }
}

fn apply(name: &'static str, builtin: Builtin, args: &[Handle]) -> RuntimeResult<Handle> {
    match (builtin, args) {
        (Builtin::Nullary(f), []) => f(),
        (Builtin::Unary(f), [a]) => f(a),
        (Builtin::Binary(f), [a, b]) => f(a, b),
        (Builtin::Ternary(f), [a, b, c]) => f(a, b, c),
        _ => Err(RuntimeError::Arity {
            operation: name,
            expected: builtin.arity(),
            found: args.len(),
        }),
    }
}
