/// Configuration flags threaded through every stage via [`crate::LoxContext`].
///
/// There is no config file format: the only knob is whether to log internal
/// tracing (scanned token counts, resolved locals table size) at `DEBUG`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoxConfig {
    pub trace: bool,
}

impl LoxConfig {
    pub fn new(trace: bool) -> Self {
        Self { trace }
    }
}
