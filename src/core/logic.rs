//! Predicates, identity, and the boolean connectives.

use crate::common::expr::Value;
use crate::common::trace::Trace;

use super::builtin::{exactly, number, single};

pub fn is_pair(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("pair?", args)?;
    Ok(Value::Boolean(matches!(arg, Value::Pair(_))))
}

pub fn is_boolean(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("boolean?", args)?;
    Ok(Value::Boolean(matches!(arg, Value::Boolean(_))))
}

pub fn is_symbol(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("symbol?", args)?;
    Ok(Value::Boolean(matches!(arg, Value::Symbol(_))))
}

pub fn is_number(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("number?", args)?;
    Ok(Value::Boolean(matches!(arg, Value::Number(_))))
}

pub fn is_null(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("null?", args)?;
    Ok(Value::Boolean(matches!(arg, Value::Null)))
}

/// Unlike the other predicates, `zero?` is numeric: a non-number
/// argument is a type error, not a `#f`.
pub fn is_zero(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("zero?", args)?;
    Ok(Value::Boolean(number("zero?", &arg)? == 0))
}

/// A rough approximation of Scheme's `eqv?` that's good enough for
/// most practical purposes: identity for pairs, value equality for
/// atoms. `eq?` is the same procedure.
pub fn eqv(args: &[Value]) -> Result<Value, Trace> {
    exactly("eqv?", args, 2)?;
    Ok(Value::Boolean(args[0].identical(&args[1])))
}

/// `#t` only for `#f`; everything else, the empty list included,
/// counts as true.
pub fn not(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("not", args)?;
    Ok(Value::Boolean(arg.is_false()))
}

// `and` and `or` conform to the value rules of R5RS section 4.2,
// but as procedures their arguments arrive already evaluated, so
// they do not short-circuit.

pub fn and(args: &[Value]) -> Result<Value, Trace> {
    for arg in args {
        if arg.is_false() {
            return Ok(arg.clone());
        }
    }
    Ok(args.last().cloned().unwrap_or(Value::Boolean(true)))
}

pub fn or(args: &[Value]) -> Result<Value, Trace> {
    for arg in args {
        if *arg == Value::Boolean(true) {
            return Ok(arg.clone());
        }
    }
    Ok(args.last().cloned().unwrap_or(Value::Boolean(false)))
}
