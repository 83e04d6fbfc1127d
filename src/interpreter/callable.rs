use crate::context::LoxContext;
use crate::interpreter::tree_walker::{Interpreter, RuntimeError};
use crate::interpreter::value::Value;

/// A user-defined function, bound method, or native function invocable
/// with `(...)`. Class construction is handled separately by the
/// interpreter (see [`crate::interpreter::class::LoxClass`]) since it
/// needs to hand out the class's own `Rc`.
pub trait Callable {
    fn arity(&self) -> usize;
    fn name(&self) -> &str;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        ctx: &mut LoxContext,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}
