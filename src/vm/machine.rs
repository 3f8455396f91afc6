//! The stack machine that executes assembled bytecode.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use crate::bytecode::{CodeObject, Constant, Opcode};
use crate::common::env::Env;
use crate::common::expr::Value;
use crate::common::trace::{Trace, TraceKind};
use crate::core;
use crate::core::builtin::{Builtin, Flavor};
use crate::vm::state;

/// A code object paired with the environment in force at its
/// creation; what the `FUNCTION` instruction pushes.
pub struct Closure {
    pub code: Rc<CodeObject>,
    pub env: Env,
}

impl Debug for Closure {
    // The environment can point back at this closure;
    // leave it out.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Closure({})", self.code.name)
    }
}

/// One level of the execution state: the code object being run,
/// the index of the next instruction in it, and the environment
/// the code runs in.
pub struct Frame {
    pub code: Rc<CodeObject>,
    pub pc: usize,
    pub env: Env,
}

/// The virtual machine: an operand stack of values, a stack of
/// suspended caller frames, and a current frame. Initialize,
/// then `run` a code object.
pub struct Vm {
    valuestack: Vec<Value>,
    framestack: Vec<Frame>,
    global: Env,
}

impl Vm {
    /// A VM whose `write` prints to stdout.
    pub fn new() -> Vm {
        Vm::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Vm {
        let global = core::global_env(out);
        global.define("debug-vm", Value::Builtin(Rc::new(Builtin::debug_vm())));

        Vm {
            valuestack: vec![],
            framestack: vec![],
            global,
        }
    }

    /// The main execution function: run a code object until there
    /// are no more instructions to execute. Running off the end of
    /// the top-level code is success; running off the end of any
    /// other code object means the bytecode is malformed.
    pub fn run(&mut self, code: Rc<CodeObject>) -> Result<(), Trace> {
        let mut frame = Frame { code, pc: 0, env: self.global.clone() };

        loop {
            if frame.pc >= frame.code.code.len() {
                if self.framestack.is_empty() {
                    return Ok(());
                }
                return Err(Trace::error(
                    TraceKind::Vm,
                    &format!("code object <{}> ended prematurely", frame.code.name),
                ));
            }

            let instr = frame.code.code[frame.pc];
            frame.pc += 1;
            let index = instr.arg as usize;

            match instr.opcode {
                Opcode::Const => match frame.code.constants.get(index) {
                    Some(Constant::Value(value)) => self.valuestack.push(value.clone()),
                    Some(Constant::Code(_)) => {
                        return Err(self.malformed("CONST references a procedure"))
                    }
                    None => return Err(self.malformed("CONST index out of range")),
                },
                Opcode::LoadVar => {
                    let value = frame.env.lookup(self.varname(&frame, index)?)?;
                    self.valuestack.push(value);
                }
                Opcode::StoreVar => {
                    let value = self.pop()?;
                    frame.env.set(self.varname(&frame, index)?, value)?;
                }
                Opcode::DefVar => {
                    let value = self.pop()?;
                    frame.env.define(self.varname(&frame, index)?, value);
                }
                Opcode::Pop => {
                    self.valuestack.pop();
                }
                Opcode::Jump => frame.pc = index,
                Opcode::FJump => {
                    if self.pop()?.is_false() {
                        frame.pc = index;
                    }
                }
                Opcode::Function => match frame.code.constants.get(index) {
                    Some(Constant::Code(code)) => {
                        self.valuestack.push(Value::Closure(Rc::new(Closure {
                            code: Rc::clone(code),
                            env: frame.env.clone(),
                        })));
                    }
                    _ => return Err(self.malformed("FUNCTION expects a procedure constant")),
                },
                Opcode::Call => self.call(&mut frame, index)?,
                Opcode::Return => {
                    frame = self.framestack.pop().ok_or_else(|| {
                        self.malformed("RETURN outside a procedure")
                    })?;
                }
            }
        }
    }

    /// `CALL n`: below the callee sit its `n` arguments, the last
    /// one pushed most recently. A builtin is applied on the spot;
    /// a closure suspends the current frame and becomes current.
    fn call(&mut self, frame: &mut Frame, count: usize) -> Result<(), Trace> {
        let callee = self.pop()?;

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.pop()?);
        }
        args.reverse();

        match callee {
            Value::Builtin(builtin) => {
                let result = match &builtin.flavor {
                    Flavor::DebugVm => {
                        println!("{}", state::show(&self.valuestack, &self.framestack));
                        Value::Null
                    }
                    _ => builtin.apply(&args)?,
                };
                self.valuestack.push(result);
            }
            Value::Closure(closure) => {
                if closure.code.formals.len() != count {
                    return Err(Trace::error(
                        TraceKind::Arity,
                        &format!(
                            "calling procedure <{}> with {} argument(s), expected {}",
                            closure.code.name,
                            count,
                            closure.code.formals.len(),
                        ),
                    ));
                }

                let mut bindings = HashMap::new();
                for (formal, arg) in closure.code.formals.iter().zip(args) {
                    bindings.insert(formal.clone(), arg);
                }
                let extended = Env::extend(bindings, Some(closure.env.clone()));

                let caller = mem::replace(
                    frame,
                    Frame { code: Rc::clone(&closure.code), pc: 0, env: extended },
                );
                self.framestack.push(caller);
            }
            other => {
                return Err(Trace::error(
                    TraceKind::Type,
                    &format!("invalid object in call position: {}", other),
                ))
            }
        }
        Ok(())
    }

    fn varname<'a>(&self, frame: &'a Frame, index: usize) -> Result<&'a str, Trace> {
        frame
            .code
            .varnames
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.malformed("variable index out of range"))
    }

    fn pop(&mut self) -> Result<Value, Trace> {
        self.valuestack
            .pop()
            .ok_or_else(|| self.malformed("operand stack underflow"))
    }

    fn malformed(&self, reason: &str) -> Trace {
        Trace::error(TraceKind::Vm, reason)
    }
}

impl Default for Vm {
    fn default() -> Vm {
        Vm::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bytecode::Instruction;
    use crate::common::source::Source;
    use crate::compiler::{assemble, compile, parse_source};

    fn run_code(code: &str) -> Result<String, Trace> {
        let exprs = parse_source(Source::source(code)).unwrap();
        let assembled = assemble(&compile(&exprs).unwrap()).unwrap();

        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(vec![]));
        let mut vm = Vm::with_output(out.clone());
        vm.run(Rc::new(assembled))?;

        let bytes = out.borrow().clone();
        Ok(String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn constants_and_write() {
        assert_eq!(run_code("(write 42)").unwrap(), "42\n");
        assert_eq!(run_code("(write '(1 2 3))").unwrap(), "(1 2 3)\n");
    }

    #[test]
    fn variables_and_mutation() {
        let code = "(define x 1)
                    (define (bump) (set! x (+ x 1)))
                    (bump) (bump)
                    (write x)";
        assert_eq!(run_code(code).unwrap(), "3\n");
    }

    #[test]
    fn branches() {
        assert_eq!(run_code("(write (if #f 1 2))").unwrap(), "2\n");
        assert_eq!(run_code("(write (if 0 1 2))").unwrap(), "1\n");
        assert_eq!(run_code("(write (if #f 1))").unwrap(), "#f\n");
    }

    #[test]
    fn closures_and_capture() {
        let code = "(define (make-adder k) (lambda (x) (+ x k)))
                    (define add3 (make-adder 3))
                    (write (add3 10))";
        assert_eq!(run_code(code).unwrap(), "13\n");
    }

    #[test]
    fn recursion() {
        let code = "(define (f n) (if (= n 0) 1 (* n (f (- n 1)))))
                    (write (f 5))";
        assert_eq!(run_code(code).unwrap(), "120\n");
    }

    #[test]
    fn arity_mismatch_at_call() {
        let code = "(define (f x) x) (f 1 2)";
        assert!(matches!(
            run_code(code),
            Err(Trace { kind: TraceKind::Arity, .. }),
        ));
    }

    #[test]
    fn calling_a_non_callable() {
        assert!(matches!(
            run_code("(1 2)"),
            Err(Trace { kind: TraceKind::Type, .. }),
        ));
    }

    #[test]
    fn unbound_loadvar() {
        assert!(matches!(
            run_code("(write ghost)"),
            Err(Trace { kind: TraceKind::Unbound, .. }),
        ));
    }

    #[test]
    fn premature_end_of_procedure() {
        // A procedure without RETURN runs off its end.
        let broken = CodeObject {
            name: "broken".to_string(),
            constants: vec![
                Constant::Code(Rc::new(CodeObject {
                    name: "no-return".to_string(),
                    constants: vec![Constant::Value(Value::Number(1))],
                    code: vec![Instruction::new(Opcode::Const, 0)],
                    ..CodeObject::default()
                })),
            ],
            code: vec![
                Instruction::new(Opcode::Function, 0),
                Instruction::new(Opcode::Call, 0),
            ],
            ..CodeObject::default()
        };

        let mut vm = Vm::with_output(Rc::new(RefCell::new(Vec::<u8>::new())));
        assert!(matches!(
            vm.run(Rc::new(broken)),
            Err(Trace { kind: TraceKind::Vm, .. }),
        ));
    }

    #[test]
    fn pop_on_an_empty_stack_is_a_no_op() {
        let code = CodeObject {
            code: vec![Instruction::new(Opcode::Pop, 0)],
            ..CodeObject::default()
        };
        let mut vm = Vm::with_output(Rc::new(RefCell::new(Vec::<u8>::new())));
        assert!(vm.run(Rc::new(code)).is_ok());
    }

    #[test]
    fn corrupt_indices_are_errors_not_panics() {
        let code = CodeObject {
            code: vec![Instruction::new(Opcode::Const, 7)],
            ..CodeObject::default()
        };
        let mut vm = Vm::with_output(Rc::new(RefCell::new(Vec::<u8>::new())));
        assert!(matches!(
            vm.run(Rc::new(code)),
            Err(Trace { kind: TraceKind::Vm, .. }),
        ));
    }

    #[test]
    fn deep_recursion_is_bounded_by_the_frame_stack() {
        let code = "(define (loop n) (if (= n 0) 0 (loop (- n 1))))
                    (write (loop 100000))";
        assert_eq!(run_code(code).unwrap(), "0\n");
    }
}
