use crate::context::LoxContext;
use crate::interpreter::callable::Callable;
use crate::interpreter::environment::Environment;
use crate::interpreter::instance::LoxInstance;
use crate::interpreter::tree_walker::{Flow, Interpreter, RuntimeError};
use crate::interpreter::value::{Object, Value};
use crate::parser::ast::FunctionDeclaration;
use std::cell::RefCell;
use std::rc::Rc;

/// `{ declaration, closure, isInitializer }`. Arity is the declaration's
/// parameter count; calling allocates a fresh child environment over
/// `closure`, binds parameters into it, and runs the body.
pub struct LoxFunction {
    declaration: Rc<FunctionDeclaration>,
    closure: Environment,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDeclaration>, closure: Environment, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Equality for [`Value`] is declaration-node identity: the same
    /// `Rc<FunctionDeclaration>` pointer under possibly different closures
    /// still counts as the same function for comparison purposes, which is
    /// what `Rc::ptr_eq` on the wrapping `Rc<LoxFunction>` already gives us
    /// at the call site.
    pub fn declaration(&self) -> &Rc<FunctionDeclaration> {
        &self.declaration
    }

    /// Produces a new `LoxFunction` whose closure has `this` (and, for a
    /// method declared in a subclass, implicitly `super` via the existing
    /// chain) bound to `instance`. Used when a method is looked up off an
    /// instance.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let env = Environment::child(&self.closure);
        env.define(
            "this".to_string(),
            Value::Object(Object::Instance(instance)),
        );
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn name(&self) -> &str {
        self.name()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        ctx: &mut LoxContext,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let call_env = Environment::child(&self.closure);
        for (param, arg) in self.declaration.params.iter().zip(arguments) {
            call_env.define(param.lexeme.clone(), arg);
        }

        let result = interpreter.execute_block(&self.declaration.body, call_env.clone(), ctx);

        // A bare `return;` (or falling off the end) in an `init` method
        // always yields the instance itself, never `nil`.
        if self.is_initializer {
            let this = self
                .closure
                .get("this")
                .expect("initializer body always runs with a bound `this`");
            return match result {
                Ok(_) => Ok(this),
                Err(Flow::Return(_)) => Ok(this),
                Err(Flow::Error(e)) => Err(e),
            };
        }

        match result {
            Ok(_) => Ok(Value::Nil),
            Err(Flow::Return(v)) => Ok(v),
            Err(Flow::Error(e)) => Err(e),
        }
    }
}
