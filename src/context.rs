use crate::config::LoxConfig;
use std::io::Write;

/// A diagnostic sink: `report` is called with a 1-based line number, a
/// `where`-clause (e.g. `" at 'Identifier'"`, `" at end"`, or `""`) and the
/// message body.
///
/// [`LoxContext`] is the only implementation the core ships, but the trait
/// keeps the core's diagnostics swappable without touching the scanner,
/// parser, resolver or interpreter.
pub trait Reporter {
    fn report(&mut self, line: u64, location: &str, message: &str);
}

/// The controlling object threaded through every stage: scanner, parser,
/// resolver and interpreter all borrow it mutably for the duration of a
/// single `execute_source` call. It owns the output sink (diagnostics and
/// `print` statements interleave correctly because they share it), the
/// sticky `HadError` flag, and the trace configuration.
pub struct LoxContext<'out> {
    output: &'out mut dyn Write,
    had_error: bool,
    config: LoxConfig,
}

impl<'out> LoxContext<'out> {
    pub fn new(output: &'out mut dyn Write, config: LoxConfig) -> Self {
        Self {
            output,
            had_error: false,
            config,
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn config(&self) -> LoxConfig {
        self.config
    }

    /// `runtime error: <message>\n`, used once at the top of interpretation
    /// when a `RuntimeError` unwinds out of the interpreter.
    pub fn report_runtime_error(&mut self, message: &str) {
        let _ = writeln!(self.output, "runtime error: {message}");
    }

    /// Writes a single evaluated `print` value followed by a newline.
    pub fn print_line(&mut self, value: &str) {
        let _ = writeln!(self.output, "{value}");
    }

    pub fn trace(&self, f: impl FnOnce() -> String) {
        if self.config.trace {
            tracing::debug!("{}", f());
        }
    }
}

impl<'out> Reporter for LoxContext<'out> {
    fn report(&mut self, line: u64, location: &str, message: &str) {
        self.had_error = true;
        let _ = writeln!(self.output, "[line {line}] Error{location}: {message}");
    }
}
