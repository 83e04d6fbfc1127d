use crate::interpreter::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One link in the scope chain. Shared via `Rc` so a closure can keep its
/// defining scope alive after the block that created it has returned.
struct EnvironmentNode {
    values: RefCell<HashMap<String, Value>>,
    parent: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Rc<EnvironmentNode>);

/// Whether `define` bound a fresh name or silently shadowed one that was
/// already in scope in a *non-global* scope; the latter is reported (but
/// not fatal) by the caller.
pub enum DefineOutcome {
    Fresh,
    Redefined,
}

impl Environment {
    pub fn new_global() -> Self {
        Self(Rc::new(EnvironmentNode {
            values: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(parent: &Environment) -> Self {
        Self(Rc::new(EnvironmentNode {
            values: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        }))
    }

    pub fn is_global(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Redefinition is only silent at global scope; everywhere else the
    /// caller is told so it can report (but not abort on) the shadowing.
    pub fn define(&self, name: String, value: Value) -> DefineOutcome {
        let already_present = self.0.values.borrow().contains_key(&name);
        self.0.values.borrow_mut().insert(name, value);
        if already_present && !self.is_global() {
            DefineOutcome::Redefined
        } else {
            DefineOutcome::Fresh
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.values.borrow().get(name) {
            return Some(v.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.get(name))
    }

    pub fn get_at(&self, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(distance).0.values.borrow().get(name).cloned()
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), ()> {
        if self.0.values.borrow().contains_key(name) {
            self.0.values.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        match &self.0.parent {
            Some(p) => p.assign(name, value),
            None => Err(()),
        }
    }

    pub fn assign_at(&self, distance: usize, name: &str, value: Value) -> Result<(), ()> {
        let ancestor = self.ancestor(distance);
        if ancestor.0.values.borrow().contains_key(name) {
            ancestor.0.values.borrow_mut().insert(name.to_string(), value);
            Ok(())
        } else {
            Err(())
        }
    }

    fn ancestor(&self, distance: usize) -> Environment {
        let mut env = self.clone();
        for _ in 0..distance {
            env = env
                .0
                .parent
                .clone()
                .expect("resolver-computed distance outran the scope chain");
        }
        env
    }
}
