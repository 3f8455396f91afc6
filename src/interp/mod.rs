//! The tree-walking evaluator: the classic eval/apply pair,
//! with one twist. `eval` is a loop over a mutable current
//! `(expression, environment)` state; whenever the next action
//! is a direct substitute for the current expression (an `if`
//! arm, a desugared `cond`/`let`, the tail of a `begin` or of a
//! compound procedure's body) the loop rewrites its state instead
//! of recursing. Stack growth is bounded by lexical nesting, not
//! call depth, so tail-recursive Scheme runs in constant space.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::io::{self, Write};
use std::rc::Rc;

use crate::common::env::Env;
use crate::common::expr::Value;
use crate::common::form;
use crate::common::trace::{Trace, TraceKind};
use crate::core;

/// A compound procedure (closure): formals and body as parsed
/// data, together with the environment the `lambda` was
/// evaluated in.
pub struct Procedure {
    pub formals: Value,
    pub body: Value,
    pub env: Env,
}

impl Debug for Procedure {
    // The captured environment may point back at this very
    // procedure, so it stays out of the rendering.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Procedure({} {})", self.formals, self.body)
    }
}

/// A Scheme interpreter. Owns its global environment; `write`
/// in interpreted code prints to the configured sink.
pub struct Interpreter {
    global: Env,
}

impl Interpreter {
    /// An interpreter that writes to stdout.
    pub fn new() -> Interpreter {
        Interpreter::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    pub fn with_output(out: Rc<RefCell<dyn Write>>) -> Interpreter {
        Interpreter { global: core::global_env(out) }
    }

    /// Evaluate one expression in the interpreter's global
    /// environment and return its value.
    pub fn interpret(&self, expr: &Value) -> Result<Value, Trace> {
        self.eval(expr.clone(), self.global.clone())
    }

    fn eval(&self, expr: Value, env: Env) -> Result<Value, Trace> {
        let mut expr = expr;
        let mut env = env;

        loop {
            if form::is_self_evaluating(&expr) {
                return Ok(expr);
            } else if let Value::Symbol(name) = &expr {
                return env.lookup(name);
            } else if form::is_quoted(&expr) {
                return Ok(form::quotation_text(&expr)?);
            } else if form::is_assignment(&expr) {
                let name = symbol_name(form::assignment_variable(&expr)?, "set!")?;
                let value = self.eval(form::assignment_value(&expr)?, env.clone())?;
                env.set(&name, value)?;
                return Ok(Value::Null);
            } else if form::is_definition(&expr) {
                let name = symbol_name(form::definition_variable(&expr)?, "define")?;
                let value = self.eval(form::definition_value(&expr)?, env.clone())?;
                env.define(&name, value);
                return Ok(Value::Null);
            } else if form::is_if(&expr) {
                let predicate = self.eval(form::if_predicate(&expr)?, env.clone())?;
                expr = if predicate.is_false() {
                    form::if_alternative(&expr)?
                } else {
                    form::if_consequent(&expr)?
                };
            } else if form::is_cond(&expr) {
                expr = form::cond_to_ifs(&expr)?;
            } else if form::is_let(&expr) {
                expr = form::let_to_application(&expr)?;
            } else if form::is_lambda(&expr) {
                return Ok(Value::Procedure(Rc::new(Procedure {
                    formals: form::lambda_formals(&expr)?,
                    body: form::lambda_body(&expr)?,
                    env,
                })));
            } else if form::is_begin(&expr) {
                expr = self.eval_butlast(form::begin_actions(&expr)?, &env, "begin")?;
            } else if form::is_application(&expr) {
                let operator =
                    self.eval(form::application_operator(&expr)?, env.clone())?;

                let mut args = vec![];
                for operand in form::application_operands(&expr)?.expand() {
                    args.push(self.eval(operand, env.clone())?);
                }

                match operator {
                    Value::Builtin(builtin) => return builtin.apply(&args),
                    Value::Procedure(procedure) => {
                        let extended = extend_for_call(&procedure, &args)?;
                        expr = self.eval_butlast(
                            procedure.body.clone(),
                            &extended,
                            "procedure body",
                        )?;
                        env = extended;
                    }
                    other => {
                        return Err(Trace::error(
                            TraceKind::Type,
                            &format!("not a procedure: {}", other),
                        ))
                    }
                }
            } else {
                return Err(Trace::error(
                    TraceKind::Form,
                    &format!("unknown expression: {}", expr),
                ));
            }
        }
    }

    /// Evaluate every expression of a sequence except the last,
    /// returning the last unevaluated: it is in tail position.
    fn eval_butlast(&self, seq: Value, env: &Env, what: &str) -> Result<Value, Trace> {
        let exprs = seq.expand();
        match exprs.split_last() {
            Some((last, rest)) => {
                for expr in rest {
                    self.eval(expr.clone(), env.clone())?;
                }
                Ok(last.clone())
            }
            None => Err(Trace::error(
                TraceKind::Form,
                &format!("empty sequence in {}", what),
            )),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

fn symbol_name(value: Value, place: &str) -> Result<String, Trace> {
    match value {
        Value::Symbol(name) => Ok(name),
        other => Err(Trace::error(
            TraceKind::Form,
            &format!("expected symbol in {}, got: {}", place, other),
        )),
    }
}

/// Extend a procedure's captured environment with a fresh frame
/// binding formal names to argument values.
fn extend_for_call(procedure: &Procedure, args: &[Value]) -> Result<Env, Trace> {
    let formals = procedure.formals.expand();
    if formals.len() != args.len() {
        return Err(Trace::error(
            TraceKind::Arity,
            &format!(
                "procedure expects {} argument(s), got {}",
                formals.len(),
                args.len(),
            ),
        ));
    }

    let mut bindings = HashMap::new();
    for (formal, arg) in formals.into_iter().zip(args) {
        bindings.insert(symbol_name(formal, "formals list")?, arg.clone());
    }
    Ok(Env::extend(bindings, Some(procedure.env.clone())))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::source::Source;
    use crate::compiler::parse::parse_source;

    fn eval_all(code: &str) -> Result<Value, Trace> {
        let interp = Interpreter::with_output(Rc::new(RefCell::new(Vec::<u8>::new())));
        let mut last = Value::Null;
        for expr in parse_source(Source::source(code)).unwrap() {
            last = interp.interpret(&expr)?;
        }
        Ok(last)
    }

    fn written(code: &str) -> String {
        let out: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(vec![]));
        let interp = Interpreter::with_output(out.clone());
        for expr in parse_source(Source::source(code)).unwrap() {
            interp.interpret(&expr).unwrap();
        }
        let bytes = out.borrow().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn self_evaluating_and_quote() {
        assert_eq!(eval_all("42").unwrap(), Value::Number(42));
        assert_eq!(eval_all("#f").unwrap(), Value::Boolean(false));
        assert_eq!(eval_all("'sym").unwrap(), Value::symbol("sym"));
        assert_eq!(format!("{}", eval_all("'(1 2)").unwrap()), "(1 2)");
    }

    #[test]
    fn define_and_lookup() {
        assert_eq!(eval_all("(define x 3) x").unwrap(), Value::Number(3));
        assert_eq!(eval_all("(define x 3) (define x 4) x").unwrap(), Value::Number(4));
        assert!(matches!(
            eval_all("nope"),
            Err(Trace { kind: TraceKind::Unbound, .. }),
        ));
    }

    #[test]
    fn set_walks_to_the_binding_frame() {
        let code = "(define x 1)
                    (define (bump) (set! x (+ x 1)))
                    (bump) (bump)
                    x";
        assert_eq!(eval_all(code).unwrap(), Value::Number(3));
        assert!(matches!(
            eval_all("(set! ghost 1)"),
            Err(Trace { kind: TraceKind::Unbound, .. }),
        ));
    }

    #[test]
    fn if_only_false_is_false() {
        assert_eq!(eval_all("(if #f 1 2)").unwrap(), Value::Number(2));
        assert_eq!(eval_all("(if 0 1 2)").unwrap(), Value::Number(1));
        assert_eq!(eval_all("(if '() 1 2)").unwrap(), Value::Number(1));
        // one-armed if
        assert_eq!(eval_all("(if #f 1)").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn begin_returns_the_last_value() {
        assert_eq!(eval_all("(begin 1 2 3)").unwrap(), Value::Number(3));
    }

    #[test]
    fn lexical_scoping_not_dynamic() {
        // the captured x is the definition-site binding
        let code = "(define x 10)
                    (define (capture) x)
                    (define (shadow x) (capture))
                    (shadow 99)";
        assert_eq!(eval_all(code).unwrap(), Value::Number(10));
    }

    #[test]
    fn closures_capture_their_environment() {
        let code = "(define (make-adder k) (lambda (x) (+ x k)))
                    (define add3 (make-adder 3))
                    (add3 10)";
        assert_eq!(eval_all(code).unwrap(), Value::Number(13));
    }

    #[test]
    fn arity_mismatch() {
        assert!(matches!(
            eval_all("(define (f x) x) (f 1 2)"),
            Err(Trace { kind: TraceKind::Arity, .. }),
        ));
        assert!(matches!(
            eval_all("(define (f x) x) (f)"),
            Err(Trace { kind: TraceKind::Arity, .. }),
        ));
    }

    #[test]
    fn calling_a_non_procedure() {
        assert!(matches!(
            eval_all("(1 2)"),
            Err(Trace { kind: TraceKind::Type, .. }),
        ));
    }

    #[test]
    fn mutual_recursion_at_top_level() {
        // forward references resolve at call time
        let code = "(define (even? n) (if (= n 0) #t (odd? (- n 1))))
                    (define (odd? n) (if (= n 0) #f (even? (- n 1))))
                    (even? 10)";
        assert_eq!(eval_all(code).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn deep_tail_recursion_terminates() {
        let code = "(define (loop n) (if (= n 0) 0 (loop (- n 1))))
                    (loop 100000)";
        assert_eq!(eval_all(code).unwrap(), Value::Number(0));
    }

    #[test]
    fn write_goes_to_the_sink() {
        assert_eq!(written("(write (cons 1 2)) (write #t)"), "(1 . 2)\n#t\n");
    }

    #[test]
    fn cond_and_let_desugar_in_place() {
        assert_eq!(
            eval_all("(cond ((= 1 2) 'a) ((= 2 2) 'b) (else 'c))").unwrap(),
            Value::symbol("b"),
        );
        assert_eq!(
            eval_all("(let ((x 2) (y 3)) (* x y))").unwrap(),
            Value::Number(6),
        );
        assert_eq!(eval_all("(cond (#f 1))").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn malformed_forms_trace_at_runtime() {
        assert!(matches!(
            eval_all("(cond (else 1) (#t 2))"),
            Err(Trace { kind: TraceKind::Form, .. }),
        ));
    }
}
