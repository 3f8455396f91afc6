//! Lowers expression trees to unassembled bytecode: instruction
//! slots whose arguments are still symbolic (values, names, labels,
//! nested procedures), interleaved with label markers. The
//! assembler turns the result into a [`CodeObject`].
//!
//! [`CodeObject`]: crate::bytecode::CodeObject

use crate::bytecode::Opcode;
use crate::common::expr::Value;
use crate::common::form;
use crate::compiler::syntax::Syntax;

/// A not-yet-numeric instruction argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    None,
    /// A constant to place in the constants table, or the symbol
    /// naming a variable.
    Value(Value),
    /// A jump target, to be resolved to an offset.
    Label(usize),
    /// A nested procedure, to be assembled and placed in the
    /// constants table.
    Proc(CompiledProcedure),
    /// A `CALL` argument count.
    Count(usize),
}

/// One slot of unassembled code.
#[derive(Debug, Clone, PartialEq)]
pub enum Asm {
    /// A position marker; occupies no instruction offset.
    Label(usize),
    Instr(Opcode, Arg),
}

/// A compiled but unassembled procedure.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProcedure {
    /// For debugging; attached by `define`, empty for anonymous
    /// procedures and the top level.
    pub name: String,
    pub formals: Vec<String>,
    pub code: Vec<Asm>,
}

/// Compile a parsed expression sequence into a single argument-less
/// procedure: the whole program as one anonymous code body.
pub fn compile(exprs: &[Value]) -> Result<CompiledProcedure, Syntax> {
    let mut compiler = Compiler { labels: 0 };
    Ok(CompiledProcedure {
        name: String::new(),
        formals: vec![],
        code: compiler.sequence(exprs)?,
    })
}

struct Compiler {
    labels: usize,
}

impl Compiler {
    fn fresh_label(&mut self) -> usize {
        self.labels += 1;
        self.labels
    }

    fn comp(&mut self, expr: &Value) -> Result<Vec<Asm>, Syntax> {
        if form::is_self_evaluating(expr) {
            Ok(vec![Asm::Instr(Opcode::Const, Arg::Value(expr.clone()))])
        } else if form::is_variable(expr) {
            Ok(vec![Asm::Instr(Opcode::LoadVar, Arg::Value(expr.clone()))])
        } else if form::is_quoted(expr) {
            Ok(vec![Asm::Instr(Opcode::Const, Arg::Value(form::quotation_text(expr)?))])
        } else if form::is_assignment(expr) {
            let variable = self.symbol(form::assignment_variable(expr)?, "set!")?;
            let mut code = self.comp(&form::assignment_value(expr)?)?;
            code.push(Asm::Instr(Opcode::StoreVar, Arg::Value(variable)));
            Ok(code)
        } else if form::is_definition(expr) {
            self.comp_definition(expr)
        } else if form::is_if(expr) {
            self.comp_if(expr)
        } else if form::is_cond(expr) {
            self.comp(&form::cond_to_ifs(expr)?)
        } else if form::is_let(expr) {
            self.comp(&form::let_to_application(expr)?)
        } else if form::is_lambda(expr) {
            self.comp_lambda(expr)
        } else if form::is_begin(expr) {
            let actions = form::begin_actions(expr)?.expand();
            self.sequence(&actions)
        } else if form::is_application(expr) {
            self.comp_application(expr)
        } else {
            Err(Syntax::compile(&format!("unknown expression: {}", expr)))
        }
    }

    fn symbol(&self, value: Value, place: &str) -> Result<Value, Syntax> {
        match value {
            Value::Symbol(_) => Ok(value),
            other => Err(Syntax::compile(&format!(
                "expected symbol in {}, got: {}",
                place, other,
            ))),
        }
    }

    /// Compile each expression, separating them with `POP`s so
    /// intermediate values are discarded; the last value stays.
    fn sequence(&mut self, exprs: &[Value]) -> Result<Vec<Asm>, Syntax> {
        let mut code = vec![];
        for (index, expr) in exprs.iter().enumerate() {
            if index > 0 {
                code.push(Asm::Instr(Opcode::Pop, Arg::None));
            }
            code.extend(self.comp(expr)?);
        }
        Ok(code)
    }

    fn comp_definition(&mut self, expr: &Value) -> Result<Vec<Asm>, Syntax> {
        let variable = self.symbol(form::definition_variable(expr)?, "define")?;
        let mut code = self.comp(&form::definition_value(expr)?)?;

        // A directly-defined lambda gets the variable's name
        // attached for debugging.
        if let Some(Asm::Instr(Opcode::Function, Arg::Proc(procedure))) = code.last_mut() {
            if let Value::Symbol(name) = &variable {
                procedure.name = name.clone();
            }
        }

        code.push(Asm::Instr(Opcode::DefVar, Arg::Value(variable)));
        Ok(code)
    }

    fn comp_if(&mut self, expr: &Value) -> Result<Vec<Asm>, Syntax> {
        let label_else = self.fresh_label();
        let label_after = self.fresh_label();

        let mut code = self.comp(&form::if_predicate(expr)?)?;
        code.push(Asm::Instr(Opcode::FJump, Arg::Label(label_else)));
        code.extend(self.comp(&form::if_consequent(expr)?)?);
        code.push(Asm::Instr(Opcode::Jump, Arg::Label(label_after)));
        code.push(Asm::Label(label_else));
        code.extend(self.comp(&form::if_alternative(expr)?)?);
        code.push(Asm::Label(label_after));
        Ok(code)
    }

    fn comp_lambda(&mut self, expr: &Value) -> Result<Vec<Asm>, Syntax> {
        let mut formals = vec![];
        for formal in form::lambda_formals(expr)?.expand() {
            match self.symbol(formal, "formals list")? {
                Value::Symbol(name) => formals.push(name),
                _ => unreachable!(),
            }
        }

        // The body compiles as a sequence with a RETURN appended.
        let body = form::lambda_body(expr)?.expand();
        let mut code = self.sequence(&body)?;
        code.push(Asm::Instr(Opcode::Return, Arg::None));

        Ok(vec![Asm::Instr(
            Opcode::Function,
            Arg::Proc(CompiledProcedure { name: String::new(), formals, code }),
        )])
    }

    /// Operands left to right, then the operator, then `CALL n`.
    fn comp_application(&mut self, expr: &Value) -> Result<Vec<Asm>, Syntax> {
        let operands = form::application_operands(expr)?.expand();

        let mut code = vec![];
        for operand in &operands {
            code.extend(self.comp(operand)?);
        }
        code.extend(self.comp(&form::application_operator(expr)?)?);
        code.push(Asm::Instr(Opcode::Call, Arg::Count(operands.len())));
        Ok(code)
    }
}
