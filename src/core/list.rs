//! Pair and list primitives.

use std::rc::Rc;

use crate::common::expr::{Pair, Value};
use crate::common::trace::{Trace, TraceKind};

use super::builtin::{exactly, single};

fn pair_of(name: &str, arg: &Value) -> Result<Rc<Pair>, Trace> {
    match arg {
        Value::Pair(pair) => Ok(pair.clone()),
        other => Err(Trace::error(
            TraceKind::Type,
            &format!("{} expects a pair, got {}", name, other),
        )),
    }
}

pub fn cons(args: &[Value]) -> Result<Value, Trace> {
    exactly("cons", args, 2)?;
    Ok(Value::pair(args[0].clone(), args[1].clone()))
}

pub fn list(args: &[Value]) -> Result<Value, Trace> {
    Ok(Value::list(args))
}

pub fn car(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("car", args)?;
    Ok(pair_of("car", &arg)?.first.borrow().clone())
}

pub fn cdr(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("cdr", args)?;
    Ok(pair_of("cdr", &arg)?.second.borrow().clone())
}

pub fn cadr(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("cadr", args)?;
    let rest = pair_of("cadr", &arg)?.second.borrow().clone();
    Ok(pair_of("cadr", &rest)?.first.borrow().clone())
}

pub fn caddr(args: &[Value]) -> Result<Value, Trace> {
    let arg = single("caddr", args)?;
    let rest = pair_of("caddr", &arg)?.second.borrow().clone();
    let rest = pair_of("caddr", &rest)?.second.borrow().clone();
    Ok(pair_of("caddr", &rest)?.first.borrow().clone())
}

/// `set-car!` rewrites a pair in place and returns nothing useful.
pub fn set_car(args: &[Value]) -> Result<Value, Trace> {
    exactly("set-car!", args, 2)?;
    *pair_of("set-car!", &args[0])?.first.borrow_mut() = args[1].clone();
    Ok(Value::Null)
}

pub fn set_cdr(args: &[Value]) -> Result<Value, Trace> {
    exactly("set-cdr!", args, 2)?;
    *pair_of("set-cdr!", &args[0])?.second.borrow_mut() = args[1].clone();
    Ok(Value::Null)
}

#[cfg(test)]
mod test {
    use super::*;

    fn num(n: i64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn cons_car_cdr() {
        let pair = cons(&[num(1), num(2)]).unwrap();
        assert_eq!(car(&[pair.clone()]).unwrap(), num(1));
        assert_eq!(cdr(&[pair]).unwrap(), num(2));
    }

    #[test]
    fn list_builds_nested_pairs() {
        let built = list(&[num(1), num(2), num(3)]).unwrap();
        assert_eq!(format!("{}", built), "(1 2 3)");
        assert_eq!(cadr(&[built.clone()]).unwrap(), num(2));
        assert_eq!(caddr(&[built]).unwrap(), num(3));
        assert_eq!(list(&[]).unwrap(), Value::Null);
    }

    #[test]
    fn accessors_fail_on_non_pairs() {
        assert!(car(&[num(1)]).is_err());
        assert!(cdr(&[Value::Null]).is_err());
        assert!(cadr(&[list(&[num(1)]).unwrap()]).is_err());
    }

    #[test]
    fn mutation() {
        let pair = cons(&[num(1), num(2)]).unwrap();
        set_car(&[pair.clone(), num(9)]).unwrap();
        set_cdr(&[pair.clone(), Value::Null]).unwrap();
        assert_eq!(format!("{}", pair), "(9)");
    }
}
