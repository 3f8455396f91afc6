//! The fixed table of primitive procedures, shared by the
//! evaluator and the VM.
//!
//! The calling convention: arguments arrive as a positional slice
//! of already-evaluated values, and every primitive returns a
//! single value. `write` is constructed per component since it
//! captures the component's output sink.

pub mod builtin;

pub mod list;
pub mod logic;
pub mod math;

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::common::env::Env;
use crate::common::expr::Value;

use builtin::{Builtin, NativeFn};

/// The fixed registry: every primitive except the sink-capturing
/// `write` and the VM-only `debug-vm`.
pub fn natives() -> Vec<(&'static str, NativeFn)> {
    vec![
        // logic
        ("eqv?", logic::eqv),
        ("eq?", logic::eqv),
        ("pair?", logic::is_pair),
        ("boolean?", logic::is_boolean),
        ("symbol?", logic::is_symbol),
        ("number?", logic::is_number),
        ("null?", logic::is_null),
        ("zero?", logic::is_zero),
        ("not", logic::not),
        ("and", logic::and),
        ("or", logic::or),
        // lists
        ("cons", list::cons),
        ("list", list::list),
        ("car", list::car),
        ("cdr", list::cdr),
        ("cadr", list::cadr),
        ("caddr", list::caddr),
        ("set-car!", list::set_car),
        ("set-cdr!", list::set_cdr),
        // math
        ("+", math::add),
        ("-", math::sub),
        ("*", math::mul),
        ("quotient", math::quotient),
        ("modulo", math::modulo),
        ("=", math::num_eq),
        ("<", math::less),
        ("<=", math::less_equal),
        (">", math::greater),
        (">=", math::greater_equal),
    ]
}

/// Build a fresh global frame: the whole native table plus a
/// `write` bound to the given sink.
pub fn global_env(out: Rc<RefCell<dyn Write>>) -> Env {
    let mut bindings = HashMap::new();
    for (name, function) in natives() {
        bindings.insert(
            name.to_string(),
            Value::Builtin(Rc::new(Builtin::native(name, function))),
        );
    }
    bindings.insert(
        "write".to_string(),
        Value::Builtin(Rc::new(Builtin::write(out))),
    );
    Env::extend(bindings, None)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn global_env_is_seeded() {
        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(vec![]));
        let env = global_env(out.clone());

        for name in ["cons", "write", "+", "eqv?", "set-cdr!"] {
            assert!(env.lookup(name).is_ok(), "{} missing from global env", name);
        }
    }

    #[test]
    fn write_prints_repr_and_newline() {
        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(vec![]));
        let env = global_env(out.clone());

        let write = match env.lookup("write").unwrap() {
            Value::Builtin(b) => b,
            _ => unreachable!(),
        };
        let list = Value::list(&[Value::Number(1), Value::Number(2)]);
        assert_eq!(write.apply(&[list]).unwrap(), Value::Null);

        assert_eq!(String::from_utf8(out.borrow().clone()).unwrap(), "(1 2)\n");
    }
}
