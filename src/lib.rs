//! # Bobscheme
//! A small Scheme implementation with two interchangeable back
//! ends: a tree-walking interpreter, and a bytecode compiler
//! paired with a stack VM.
//!
//! ## Overview of the pipeline
//! Source code is represented as a [`Source`] object: a string
//! plus a label naming where it came from (a file, the repl, or
//! an embedded snippet). Regions of a source are marked with
//! [`Span`]s, which error types carry so mistakes can be reported
//! with line and column coordinates against that origin.
//!
//! The lexer (`compiler::lex`) turns a source into a stream of
//! spanned tokens using a prioritized regex ruleset. The parser
//! (`compiler::parse`) is recursive-descent and, since Scheme
//! code is data, produces plain [`Value`]s: atoms and nested
//! pairs. Static errors from either are [`Syntax`] values.
//!
//! From there, one of two things happens:
//!
//! - The interpreter (`interp`) walks the expressions directly
//!   with the classic eval/apply loop.
//! - The compiler (`compiler::compile`) lowers the expressions to
//!   unassembled bytecode, the assembler (`compiler::assemble`)
//!   resolves labels and tables to produce a [`CodeObject`], and
//!   the VM (`vm`) executes it. Code objects can round-trip
//!   through the binary codec (`bytecode::serial`) on the way;
//!   that is what a `.bobc` file holds.
//!
//! Runtime errors from either back end are [`Trace`] values.
//! Both back ends share the global environment seeding in `core`
//! and print through whatever sink they were constructed with:
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use bobscheme::{compile_code, Source, Vm};
//!
//! let source = Source::source("(write (+ 1 2))");
//! let code = compile_code(source).unwrap();
//!
//! let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(vec![]));
//! let mut vm = Vm::with_output(out.clone());
//! vm.run(Rc::new(code)).unwrap();
//!
//! assert_eq!(String::from_utf8(out.borrow().clone()).unwrap(), "3\n");
//! ```

pub mod bytecode;
pub mod common;
pub mod compiler;
pub mod core;
pub mod interp;
pub mod vm;

use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::rc::Rc;

pub use bytecode::serial::{deserialize, serialize, MarshalError};
pub use bytecode::CodeObject;
pub use common::{Source, Span, Spanned, Trace, Value};
pub use compiler::Syntax;
pub use interp::Interpreter;
pub use vm::Vm;

/// Anything the full pipeline can fail with.
#[derive(Debug)]
pub enum Error {
    Syntax(Syntax),
    Trace(Trace),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(syntax) => write!(f, "{}", syntax),
            Error::Trace(trace) => write!(f, "{}", trace),
        }
    }
}

impl std::error::Error for Error {}

impl From<Syntax> for Error {
    fn from(syntax: Syntax) -> Error {
        Error::Syntax(syntax)
    }
}

impl From<Trace> for Error {
    fn from(trace: Trace) -> Error {
        Error::Trace(trace)
    }
}

/// Compile (and assemble) a source into a code object.
pub fn compile_code(source: Rc<Source>) -> Result<CodeObject, Syntax> {
    let exprs = compiler::parse_source(source)?;
    compiler::assemble(&compiler::compile(&exprs)?)
}

/// Interpret a whole source for its side effects, writing
/// `write` output to the given sink.
pub fn interpret_code(
    source: Rc<Source>,
    out: Rc<RefCell<dyn Write>>,
) -> Result<(), Error> {
    let exprs = compiler::parse_source(source)?;
    let interp = Interpreter::with_output(out);
    for expr in &exprs {
        interp.interpret(expr)?;
    }
    Ok(())
}
