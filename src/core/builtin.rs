use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::io::Write;
use std::rc::Rc;

use crate::common::expr::Value;
use crate::common::trace::{Trace, TraceKind};

/// The signature every primitive shares: a positional slice of
/// already-evaluated values in, a single value out.
pub type NativeFn = fn(&[Value]) -> Result<Value, Trace>;

/// How a built-in runs.
pub enum Flavor {
    /// An ordinary primitive from the fixed table.
    Native(NativeFn),
    /// `write`: prints the external representation of its argument,
    /// followed by a newline, to the sink it was constructed with.
    Write(Rc<RefCell<dyn Write>>),
    /// `debug-vm`: dumps the VM state. The VM intercepts this one at
    /// `CALL` since only it can see its own stacks; applying it
    /// anywhere else does nothing.
    DebugVm,
}

/// A primitive procedure.
pub struct Builtin {
    pub name: String,
    pub flavor: Flavor,
}

impl Builtin {
    pub fn native(name: &str, function: NativeFn) -> Builtin {
        Builtin { name: name.to_string(), flavor: Flavor::Native(function) }
    }

    pub fn write(out: Rc<RefCell<dyn Write>>) -> Builtin {
        Builtin { name: "write".to_string(), flavor: Flavor::Write(out) }
    }

    pub fn debug_vm() -> Builtin {
        Builtin { name: "debug-vm".to_string(), flavor: Flavor::DebugVm }
    }

    /// Apply this builtin to a list of evaluated arguments.
    pub fn apply(&self, args: &[Value]) -> Result<Value, Trace> {
        match &self.flavor {
            Flavor::Native(function) => function(args),
            Flavor::Write(out) => {
                let arg = single(&self.name, args)?;
                writeln!(out.borrow_mut(), "{}", arg).map_err(|e| {
                    Trace::error(TraceKind::Io, &format!("write failed: {}", e))
                })?;
                Ok(Value::Null)
            }
            Flavor::DebugVm => Ok(Value::Null),
        }
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

// Argument plumbing shared by the primitive modules.

pub(super) fn single(name: &str, args: &[Value]) -> Result<Value, Trace> {
    exactly(name, args, 1).map(|()| args[0].clone())
}

pub(super) fn exactly(name: &str, args: &[Value], count: usize) -> Result<(), Trace> {
    if args.len() == count {
        Ok(())
    } else {
        Err(Trace::error(
            TraceKind::Arity,
            &format!("{} takes {} argument(s), got {}", name, count, args.len()),
        ))
    }
}

pub(super) fn at_least(name: &str, args: &[Value], count: usize) -> Result<(), Trace> {
    if args.len() >= count {
        Ok(())
    } else {
        Err(Trace::error(
            TraceKind::Arity,
            &format!("{} takes at least {} argument(s), got {}", name, count, args.len()),
        ))
    }
}

pub(super) fn number(name: &str, arg: &Value) -> Result<i64, Trace> {
    match arg {
        Value::Number(n) => Ok(*n),
        other => Err(Trace::error(
            TraceKind::Type,
            &format!("{} expects numbers, got {}", name, other),
        )),
    }
}
