use jlox::config::LoxConfig;
use jlox::context::LoxContext;
use jlox::Interpreter;

/// Execute the provided Lox source code against a fresh interpreter and
/// return everything written to its output stream (diagnostics and `print`
/// output interleaved, exactly as the CLI would show it).
pub fn execute(source: &str) -> String {
    let mut buffer = Vec::new();
    let mut ctx = LoxContext::new(&mut buffer, LoxConfig::default());
    let _ = Interpreter::new().execute_source(source, &mut ctx);
    String::from_utf8(buffer).unwrap()
}
