//! Numeric primitives: left-fold arithmetic and chained comparisons.
//! Every argument is type-checked; a non-number anywhere is a type error.

use crate::common::expr::Value;
use crate::common::trace::{Trace, TraceKind};

use super::builtin::{at_least, number};

fn fold(
    name: &str,
    args: &[Value],
    op: impl Fn(i64, i64) -> Result<i64, Trace>,
) -> Result<Value, Trace> {
    at_least(name, args, 1)?;
    let mut acc = number(name, &args[0])?;
    for arg in &args[1..] {
        acc = op(acc, number(name, arg)?)?;
    }
    Ok(Value::Number(acc))
}

fn chain(
    name: &'static str,
    args: &[Value],
    relation: impl Fn(i64, i64) -> bool,
) -> Result<Value, Trace> {
    at_least(name, args, 2)?;
    let mut left = number(name, &args[0])?;
    for arg in &args[1..] {
        let right = number(name, arg)?;
        if !relation(left, right) {
            return Ok(Value::Boolean(false));
        }
        left = right;
    }
    Ok(Value::Boolean(true))
}

fn nonzero(name: &str, divisor: i64) -> Result<i64, Trace> {
    if divisor == 0 {
        Err(Trace::error(TraceKind::Type, &format!("{}: division by zero", name)))
    } else {
        Ok(divisor)
    }
}

/// Floor division: the quotient rounds toward negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let quotient = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        quotient - 1
    } else {
        quotient
    }
}

/// Floor remainder: the result takes the sign of the divisor.
fn floor_rem(a: i64, b: i64) -> i64 {
    let remainder = a % b;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        remainder + b
    } else {
        remainder
    }
}

pub fn add(args: &[Value]) -> Result<Value, Trace> {
    fold("+", args, |a, b| Ok(a.wrapping_add(b)))
}

pub fn sub(args: &[Value]) -> Result<Value, Trace> {
    fold("-", args, |a, b| Ok(a.wrapping_sub(b)))
}

pub fn mul(args: &[Value]) -> Result<Value, Trace> {
    fold("*", args, |a, b| Ok(a.wrapping_mul(b)))
}

pub fn quotient(args: &[Value]) -> Result<Value, Trace> {
    fold("quotient", args, |a, b| Ok(floor_div(a, nonzero("quotient", b)?)))
}

pub fn modulo(args: &[Value]) -> Result<Value, Trace> {
    fold("modulo", args, |a, b| Ok(floor_rem(a, nonzero("modulo", b)?)))
}

pub fn num_eq(args: &[Value]) -> Result<Value, Trace> {
    chain("=", args, |a, b| a == b)
}

pub fn less(args: &[Value]) -> Result<Value, Trace> {
    chain("<", args, |a, b| a < b)
}

pub fn less_equal(args: &[Value]) -> Result<Value, Trace> {
    chain("<=", args, |a, b| a <= b)
}

pub fn greater(args: &[Value]) -> Result<Value, Trace> {
    chain(">", args, |a, b| a > b)
}

pub fn greater_equal(args: &[Value]) -> Result<Value, Trace> {
    chain(">=", args, |a, b| a >= b)
}
