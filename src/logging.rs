//! An explicit logging sink, replacing the source's process-wide `verbose`
//! flag (`static bool verbose` plus the `LOG(...)` macro in `sdtconvert.c`).
//!
//! Passing a `&dyn Logger` into each component rather than reading a global
//! lets tests capture what was logged instead of scraping stderr.

/// Where a component's informational and warning messages go.
pub trait Logger {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Logs through the `log` crate's `info!`/`warn!` macros; used by the
/// binary, with `env_logger` as the installed backend.
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
}

/// Captures messages in memory instead of emitting them, for assertions in
/// tests.
#[derive(Default)]
pub struct RecordingLogger {
    messages: std::cell::RefCell<Vec<(Level, String)>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.messages.borrow_mut().push((Level::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.messages.borrow_mut().push((Level::Warn, message.to_string()));
    }
}
