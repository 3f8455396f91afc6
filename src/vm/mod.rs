//! This module contains the virtual machine that executes
//! assembled bytecode, and its diagnostic state dump.

pub mod machine;
pub mod state;

pub use machine::{Closure, Vm};
