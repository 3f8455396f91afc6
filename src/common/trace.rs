use std::fmt::{Display, Formatter};

use crate::common::form::FormError;

/// The class of a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// A name that is bound nowhere in the environment chain.
    Unbound,
    /// A value of the wrong class at a built-in or call site.
    Type,
    /// A formals/arguments count mismatch.
    Arity,
    /// A malformed special form reached during evaluation.
    Form,
    /// Malformed or misbehaving bytecode.
    Vm,
    /// The output sink failed.
    Io,
}

impl Display for TraceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TraceKind::Unbound => "Unbound",
            TraceKind::Type => "Type",
            TraceKind::Arity => "Arity",
            TraceKind::Form => "Form",
            TraceKind::Vm => "VM",
            TraceKind::Io => "IO",
        };
        write!(f, "{}", name)
    }
}

/// Represents a runtime error raised by the evaluator or the VM.
/// Never caught internally; the caller renders it and gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub kind: TraceKind,
    pub message: String,
}

impl Trace {
    pub fn error(kind: TraceKind, message: &str) -> Trace {
        Trace { kind, message: message.to_string() }
    }

    pub fn unbound(name: &str) -> Trace {
        Trace::error(TraceKind::Unbound, &format!("unbound variable \"{}\"", name))
    }
}

impl Display for Trace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Runtime {} Error: {}", self.kind, self.message)
    }
}

impl std::error::Error for Trace {}

impl From<FormError> for Trace {
    fn from(error: FormError) -> Trace {
        Trace::error(TraceKind::Form, &error.message)
    }
}
