//! Contains datastructures and utility functions
//! common to the evaluator, the `compiler`, and the `vm`:
//!
//! - The shared Scheme value/expression universe.
//! - Special-form dissection and derived-form expansion.
//! - Lexical environments.
//! - Source code representation and span annotations.
//! - Runtime error traces.

pub mod env;
pub mod expr;
pub mod form;
pub mod source;
pub mod span;
pub mod trace;

pub use env::Env;
pub use expr::Value;
pub use source::Source;
pub use span::{Span, Spanned};
pub use trace::Trace;
