use crate::config::LoxConfig;
use crate::context::LoxContext;
use crate::Interpreter;
use std::io::{stdout, Write};

/// Read-print-evaluation loop. One line is one evaluation cycle; the
/// interpreter instance persists across lines so a `var`/`fun` declared on
/// one line is visible on the next, but each line gets a fresh
/// [`LoxContext`] (so one line's parse errors don't latch `HadError` for
/// the rest of the session).
pub fn repl(config: LoxConfig) -> std::io::Result<()> {
    let mut interpreter = Interpreter::new();
    loop {
        print!("> ");
        stdout().flush()?;
        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break Ok(());
        }
        let input = input.trim_end().to_string();
        if input.is_empty() {
            continue;
        }
        let mut out = stdout();
        let mut ctx = LoxContext::new(&mut out, config);
        let _ = interpreter.execute_source(&input, &mut ctx);
    }
}
