pub mod callable;
pub mod class;
pub mod environment;
pub mod function;
pub mod instance;
pub mod native;
pub mod tree_walker;
pub mod value;

pub use environment::Environment;
pub use tree_walker::{ExecuteError, Interpreter, RuntimeError};
pub use value::Value;
