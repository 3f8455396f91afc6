use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::expr::Value;
use crate::common::trace::Trace;

/// One level of a lexical environment: a map from names to
/// values plus a link to the parent frame. All frame chains
/// terminate in a top-level frame with no parent.
#[derive(Debug)]
pub struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Env>,
}

/// An environment in which variables are bound to values.
///
/// Frames are shared: a closure keeps its defining frame alive,
/// and a frame may in turn hold that closure when it was bound
/// with `define`. The resulting reference cycles run through the
/// global frame and live for the owning component's lifetime.
#[derive(Debug, Clone)]
pub struct Env(Rc<RefCell<Frame>>);

impl Env {
    /// Create a new frame with the given bindings,
    /// chained to an optional parent.
    pub fn extend(bindings: HashMap<String, Value>, parent: Option<Env>) -> Env {
        Env(Rc::new(RefCell::new(Frame { bindings, parent })))
    }

    /// Looks up the bound value for the given variable,
    /// climbing up the parent references as required.
    pub fn lookup(&self, name: &str) -> Result<Value, Trace> {
        let frame = self.0.borrow();
        if let Some(value) = frame.bindings.get(name) {
            Ok(value.clone())
        } else if let Some(parent) = &frame.parent {
            parent.lookup(name)
        } else {
            Err(Trace::unbound(name))
        }
    }

    /// Add a binding of `name -> value` to this frame.
    /// An existing binding for the name is replaced.
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(name.to_string(), value);
    }

    /// Sets the value of an existing binding, rewriting it in the
    /// nearest frame that has it.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Trace> {
        let mut frame = self.0.borrow_mut();
        if let Some(slot) = frame.bindings.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(parent) = frame.parent.clone() {
            drop(frame);
            parent.set(name, value)
        } else {
            Err(Trace::unbound(name))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn root() -> Env {
        Env::extend(HashMap::new(), None)
    }

    #[test]
    fn define_then_lookup() {
        let env = root();
        env.define("x", Value::Number(3));
        assert_eq!(env.lookup("x").unwrap(), Value::Number(3));
    }

    #[test]
    fn lookup_climbs_parents() {
        let parent = root();
        parent.define("x", Value::Number(1));
        let child = Env::extend(HashMap::new(), Some(parent));
        assert_eq!(child.lookup("x").unwrap(), Value::Number(1));
        assert!(child.lookup("y").is_err());
    }

    #[test]
    fn define_shadows_in_current_frame() {
        let parent = root();
        parent.define("x", Value::Number(1));
        let child = Env::extend(HashMap::new(), Some(parent.clone()));
        child.define("x", Value::Number(2));

        assert_eq!(child.lookup("x").unwrap(), Value::Number(2));
        assert_eq!(parent.lookup("x").unwrap(), Value::Number(1));
    }

    #[test]
    fn set_rewrites_nearest_binding() {
        let parent = root();
        parent.define("x", Value::Number(1));
        let child = Env::extend(HashMap::new(), Some(parent.clone()));

        child.set("x", Value::Number(5)).unwrap();
        assert_eq!(parent.lookup("x").unwrap(), Value::Number(5));

        assert!(child.set("nope", Value::Null).is_err());
    }
}
