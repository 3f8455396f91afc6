//! This module contains the front end and the bytecode back end:
//! lexing, parsing, lowering to unassembled code, and assembly.
//! The other back end, direct evaluation, lives in `interp`.

pub mod assemble;
pub mod compile;
pub mod lex;
pub mod parse;
pub mod syntax;

pub use assemble::assemble;
pub use compile::compile;
pub use lex::lex;
pub use parse::{parse, parse_source};
pub use syntax::Syntax;
