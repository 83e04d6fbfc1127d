use crate::interpreter::callable::Callable;
use crate::interpreter::function::LoxFunction;
use crate::scanner::Token;
use std::collections::HashMap;
use std::rc::Rc;

/// `{ name, superclass?, methods }`. Calling a class (see
/// [`crate::interpreter::tree_walker::Interpreter::call_value`]) constructs
/// an instance and, if an `init` method exists, runs it for its side effects;
/// the returned value is always the instance, per
/// [`LoxFunction::call`]'s initializer special-case. Construction is
/// handled directly by the interpreter rather than through the `Callable`
/// trait because it needs the class's own `Rc` to hand to the new
/// instance.
pub struct LoxClass {
    pub name: Token,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: Token,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods
            .get(name)
            .cloned()
            .or_else(|| self.superclass.as_ref().and_then(|s| s.find_method(name)))
    }

    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(0)
    }
}
