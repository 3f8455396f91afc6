//! Dissection of Scheme expressions into their constituents,
//! and the expansion of derived forms into the core ones.
//!
//! Special forms are pairs whose first element is a
//! distinguishing symbol; everything here works on plain
//! [`Value`]s, so both the evaluator and the compiler share
//! one set of recognizers, accessors, and desugarings.

use std::fmt::{Display, Formatter};

use crate::common::expr::Value;

/// A malformed special form: `(if)`, a non-final `else`, and friends.
/// The compiler reports these as compile errors; the evaluator
/// surfaces them as runtime traces when the form is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormError {
    pub message: String,
}

impl FormError {
    fn new(message: &str) -> FormError {
        FormError { message: message.to_string() }
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

type Form<T> = Result<T, FormError>;

/// `pair.first`, or an error naming the form being dissected.
fn first(expr: &Value, form: &str) -> Form<Value> {
    match expr {
        Value::Pair(pair) => Ok(pair.first.borrow().clone()),
        _ => Err(FormError::new(&format!("malformed {}: {}", form, expr))),
    }
}

/// `pair.second`, or an error naming the form being dissected.
fn second(expr: &Value, form: &str) -> Form<Value> {
    match expr {
        Value::Pair(pair) => Ok(pair.second.borrow().clone()),
        _ => Err(FormError::new(&format!("malformed {}: {}", form, expr))),
    }
}

/// Is the expression a list starting with the given symbolic tag?
fn is_tagged(expr: &Value, tag: &str) -> bool {
    if let Value::Pair(pair) = expr {
        if let Value::Symbol(name) = &*pair.first.borrow() {
            return name == tag;
        }
    }
    false
}

pub fn is_self_evaluating(expr: &Value) -> bool {
    matches!(expr, Value::Number(_) | Value::Boolean(_))
}

pub fn is_variable(expr: &Value) -> bool {
    matches!(expr, Value::Symbol(_))
}

pub fn is_quoted(expr: &Value) -> bool     { is_tagged(expr, "quote") }
pub fn is_assignment(expr: &Value) -> bool { is_tagged(expr, "set!") }
pub fn is_definition(expr: &Value) -> bool { is_tagged(expr, "define") }
pub fn is_lambda(expr: &Value) -> bool     { is_tagged(expr, "lambda") }
pub fn is_if(expr: &Value) -> bool         { is_tagged(expr, "if") }
pub fn is_cond(expr: &Value) -> bool       { is_tagged(expr, "cond") }
pub fn is_let(expr: &Value) -> bool        { is_tagged(expr, "let") }
pub fn is_begin(expr: &Value) -> bool      { is_tagged(expr, "begin") }

/// Any other pair is a procedure application.
pub fn is_application(expr: &Value) -> bool {
    matches!(expr, Value::Pair(_))
}

pub fn quotation_text(expr: &Value) -> Form<Value> {
    first(&second(expr, "quote")?, "quote")
}

pub fn assignment_variable(expr: &Value) -> Form<Value> {
    first(&second(expr, "set!")?, "set!")
}

pub fn assignment_value(expr: &Value) -> Form<Value> {
    first(&second(&second(expr, "set!")?, "set!")?, "set!")
}

// Definitions have the form
//   (define <var> <value>)
// or the form
//   (define (<var> <formal1> ... <formaln>) <body>)
//
// The latter (standard procedure definition) is sugar for
//   (define <var> (lambda (<formal1> ... <formaln>) <body>))
// and is rewritten into that shape on access.

pub fn definition_variable(expr: &Value) -> Form<Value> {
    let head = first(&second(expr, "define")?, "define")?;
    match head {
        Value::Symbol(_) => Ok(head),
        Value::Pair(_) => first(&head, "define"),
        _ => Err(FormError::new(&format!("malformed define: {}", expr))),
    }
}

pub fn definition_value(expr: &Value) -> Form<Value> {
    let head = first(&second(expr, "define")?, "define")?;
    match head {
        Value::Symbol(_) => first(&second(&second(expr, "define")?, "define")?, "define"),
        Value::Pair(_) => Ok(make_lambda(
            second(&head, "define")?,            // formal parameters
            second(&second(expr, "define")?, "define")?, // body
        )),
        _ => Err(FormError::new(&format!("malformed define: {}", expr))),
    }
}

pub fn lambda_formals(expr: &Value) -> Form<Value> {
    first(&second(expr, "lambda")?, "lambda")
}

pub fn lambda_body(expr: &Value) -> Form<Value> {
    second(&second(expr, "lambda")?, "lambda")
}

pub fn make_lambda(formals: Value, body: Value) -> Value {
    Value::pair(Value::symbol("lambda"), Value::pair(formals, body))
}

pub fn if_predicate(expr: &Value) -> Form<Value> {
    first(&second(expr, "if")?, "if")
}

pub fn if_consequent(expr: &Value) -> Form<Value> {
    first(&second(&second(expr, "if")?, "if")?, "if")
}

/// A one-armed `if` gets `#f` as its alternative.
pub fn if_alternative(expr: &Value) -> Form<Value> {
    match second(&second(&second(expr, "if")?, "if")?, "if")? {
        Value::Null => Ok(Value::Boolean(false)),
        alternative => first(&alternative, "if"),
    }
}

pub fn make_if(predicate: Value, consequent: Value, alternative: Value) -> Value {
    Value::list(&[Value::symbol("if"), predicate, consequent, alternative])
}

/// The expression sequence inside a `begin`.
pub fn begin_actions(expr: &Value) -> Form<Value> {
    second(expr, "begin")
}

pub fn application_operator(expr: &Value) -> Form<Value> {
    first(expr, "application")
}

pub fn application_operands(expr: &Value) -> Form<Value> {
    second(expr, "application")
}

/// Convert a sequence of expressions to a single expression,
/// adding `begin` only when the sequence is longer than one.
pub fn sequence_to_exp(seq: Value) -> Value {
    let lone = match &seq {
        Value::Null => return Value::Null,
        Value::Pair(pair) if matches!(&*pair.second.borrow(), Value::Null) => {
            Some(pair.first.borrow().clone())
        }
        _ => None,
    };
    match lone {
        Some(expr) => expr,
        None => Value::pair(Value::symbol("begin"), seq),
    }
}

/// `cond` is a derived form, expanded into nested `if`s.
///
/// A clause `(p e1 .. en)` becomes `(if p (begin e1 .. en) <rest>)`;
/// an `else` clause is allowed only in the last position and becomes
/// the innermost alternative. When no clause matches, the value of
/// the whole form is `#f`.
pub fn cond_to_ifs(expr: &Value) -> Form<Value> {
    expand_cond_clauses(&second(expr, "cond")?)
}

fn expand_cond_clauses(clauses: &Value) -> Form<Value> {
    let clause = match clauses {
        Value::Null => return Ok(Value::Boolean(false)),
        _ => first(clauses, "cond")?,
    };
    let rest = second(clauses, "cond")?;

    let predicate = first(&clause, "cond clause")?;
    let actions = second(&clause, "cond clause")?;

    if predicate == Value::symbol("else") {
        match rest {
            Value::Null => Ok(sequence_to_exp(actions)),
            _ => Err(FormError::new(&format!(
                "else clause is not last in cond: {}",
                clauses,
            ))),
        }
    } else {
        Ok(make_if(
            predicate,
            sequence_to_exp(actions),
            expand_cond_clauses(&rest)?,
        ))
    }
}

/// `let` is a derived form:
///
/// ```scheme
/// (let ((v1 e1) ... (vn en)) body)
/// ```
///
/// expands to the immediate application
///
/// ```scheme
/// ((lambda (v1 ... vn) body) e1 ... en)
/// ```
pub fn let_to_application(expr: &Value) -> Form<Value> {
    let mut vars = vec![];
    let mut vals = vec![];

    let mut bindings = first(&second(expr, "let")?, "let")?;
    while !matches!(bindings, Value::Null) {
        let binding = first(&bindings, "let binding")?;
        vars.push(first(&binding, "let binding")?);
        vals.push(first(&second(&binding, "let binding")?, "let binding")?);
        bindings = second(&bindings, "let binding")?;
    }

    let body = second(&second(expr, "let")?, "let")?;
    let lambda = make_lambda(Value::list(&vars), body);

    let mut application = vec![lambda];
    application.extend(vals);
    Ok(Value::list(&application))
}
