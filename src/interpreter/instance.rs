use crate::interpreter::class::LoxClass;
use crate::interpreter::value::{Object, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// `{ class, fields }`. Property lookup checks the instance's own fields
/// before falling back to a method on the class (bound to `self`, so the
/// method sees the right `this`).
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn get(this: &Rc<RefCell<Self>>, name: &str) -> Option<Value> {
        if let Some(v) = this.borrow().fields.get(name) {
            return Some(v.clone());
        }
        let method = this.borrow().class.find_method(name)?;
        Some(Value::Object(Object::Function(Rc::new(
            method.bind(Rc::clone(this)),
        ))))
    }

    pub fn set(&mut self, name: String, value: Value) {
        self.fields.insert(name, value);
    }
}
