//! The two-pass assembler: translates a [`CompiledProcedure`] into
//! a self-contained [`CodeObject`].
//!
//! Pass one walks the slots recording the instruction offset of
//! every label (labels themselves occupy no offset). Pass two
//! translates each symbolic argument into its numeric form:
//! constants and nested procedures become constants-table indices,
//! names become varnames-table indices, labels become code offsets.

use std::collections::HashMap;
use std::rc::Rc;

use crate::bytecode::{CodeObject, Constant, Instruction, Opcode};
use crate::common::expr::Value;
use crate::compiler::compile::{Arg, Asm, CompiledProcedure};
use crate::compiler::syntax::Syntax;

/// Assemble a compiled procedure, recursively assembling every
/// nested procedure it carries.
pub fn assemble(procedure: &CompiledProcedure) -> Result<CodeObject, Syntax> {
    let offsets = label_offsets(procedure);

    let mut code = CodeObject {
        name: procedure.name.clone(),
        formals: procedure.formals.clone(),
        ..CodeObject::default()
    };

    for asm in &procedure.code {
        let (opcode, arg) = match asm {
            Asm::Label(_) => continue,
            Asm::Instr(opcode, arg) => (*opcode, arg),
        };

        let numeric = match (opcode, arg) {
            // Two literals with equal shape must remain distinct
            // pairs so `eqv?` can tell them apart, so pair
            // constants are never folded together. Atoms are.
            (Opcode::Const, Arg::Value(value @ Value::Pair(_))) => {
                code.constants.push(Constant::Value(value.clone()));
                code.constants.len() - 1
            }
            (Opcode::Const, Arg::Value(value)) => {
                find_or_append_constant(&mut code.constants, value)
            }
            (
                Opcode::LoadVar | Opcode::StoreVar | Opcode::DefVar,
                Arg::Value(Value::Symbol(name)),
            ) => find_or_append(&mut code.varnames, name),
            (Opcode::Function, Arg::Proc(inner)) => {
                code.constants.push(Constant::Code(Rc::new(assemble(inner)?)));
                code.constants.len() - 1
            }
            (Opcode::Jump | Opcode::FJump, Arg::Label(label)) => match offsets.get(label) {
                Some(offset) => *offset,
                None => {
                    return Err(Syntax::compile(&format!(
                        "jump to an unplaced label in {:?}",
                        procedure.name,
                    )))
                }
            },
            (Opcode::Call, Arg::Count(count)) => *count,
            (Opcode::Pop | Opcode::Return, _) => 0,
            (opcode, arg) => {
                return Err(Syntax::compile(&format!(
                    "malformed instruction {:?} {:?}",
                    opcode, arg,
                )))
            }
        };

        code.code.push(Instruction::new(opcode, numeric as u32));
    }

    // Every jump must land inside this code object. A join label
    // after the final instruction resolves to len(code), which is
    // where run-to-completion begins, so that offset is in range.
    for instr in &code.code {
        if matches!(instr.opcode, Opcode::Jump | Opcode::FJump)
            && instr.arg as usize > code.code.len()
        {
            return Err(Syntax::compile(&format!(
                "jump target {} outside code of length {}",
                instr.arg,
                code.code.len(),
            )));
        }
    }

    Ok(code)
}

/// The first pass: map each label to the offset of the
/// instruction that follows it.
fn label_offsets(procedure: &CompiledProcedure) -> HashMap<usize, usize> {
    let mut offsets = HashMap::new();
    let mut offset = 0;

    for asm in &procedure.code {
        match asm {
            Asm::Label(label) => {
                offsets.insert(*label, offset);
            }
            Asm::Instr(..) => offset += 1,
        }
    }
    offsets
}

fn find_or_append(names: &mut Vec<String>, name: &str) -> usize {
    match names.iter().position(|existing| existing == name) {
        Some(index) => index,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}

fn find_or_append_constant(constants: &mut Vec<Constant>, value: &Value) -> usize {
    let position = constants.iter().position(|existing| match existing {
        Constant::Value(existing) => existing == value,
        Constant::Code(_) => false,
    });
    match position {
        Some(index) => index,
        None => {
            constants.push(Constant::Value(value.clone()));
            constants.len() - 1
        }
    }
}
