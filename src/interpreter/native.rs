use crate::context::LoxContext;
use crate::interpreter::callable::Callable;
use crate::interpreter::tree_walker::{Interpreter, RuntimeError};
use crate::interpreter::value::Value;
use std::time::{SystemTime, UNIX_EPOCH};

type NativeFn = fn(Vec<Value>) -> Value;

/// A function pre-bound in the global environment before any user code
/// runs. Identity for `Value` equality is by `Rc` pointer, same as a
/// user-defined function.
pub struct NativeFunction {
    pub name: &'static str,
    arity: usize,
    implementation: NativeFn,
}

impl NativeFunction {
    pub fn clock() -> Self {
        Self {
            name: "clock",
            arity: 0,
            implementation: |_args| {
                let seconds = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                Value::Number(seconds)
            },
        }
    }

    pub fn str() -> Self {
        Self {
            name: "str",
            arity: 1,
            implementation: |mut args| Value::String(args.remove(0).to_string()),
        }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn name(&self) -> &str {
        self.name
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        _ctx: &mut LoxContext,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        Ok((self.implementation)(arguments))
    }
}
