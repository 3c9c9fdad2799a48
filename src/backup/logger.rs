//! Optional, injectable logger for backup events.
//!
//! Components keep an `Option<Arc<dyn Logger>>` and report through [`log_with`],
//! which does nothing when no logger was injected. Internal diagnostics go
//! straight to `tracing` instead.

use std::fmt::Debug;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

pub trait Logger: Debug + Send + Sync {
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

pub type SharedLogger = Arc<dyn Logger>;

/// Sends `msg` prefixed with `component` to the logger at `level`, if there is one.
pub fn log_with(logger: &Option<SharedLogger>, component: &str, level: Level, msg: &str) {
    if let Some(logger) = logger {
        let msg = format!("{component}: {msg}");
        match level {
            Level::Debug => logger.debug(&msg),
            Level::Info => logger.info(&msg),
            Level::Warn => logger.warn(&msg),
            Level::Error => logger.error(&msg),
        }
    }
}

/// Forwards every level to the matching `tracing` macro.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }
}

/// Keeps every message in memory, mostly useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: std::sync::Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn records(&self) -> Vec<(Level, String)> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg)
            .collect()
    }

    fn push(&self, level: Level, msg: &str) {
        match self.records.lock() {
            Ok(mut records) => records.push((level, msg.to_owned())),
            Err(poisoned) => poisoned.into_inner().push((level, msg.to_owned())),
        }
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, msg: &str) {
        self.push(Level::Debug, msg)
    }

    fn info(&self, msg: &str) {
        self.push(Level::Info, msg)
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg)
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_with_absent_logger_is_noop() {
        log_with(&None, "Driver", Level::Info, "nothing happens");
    }

    #[test]
    fn test_log_with_prefixes_component() {
        let memory = Arc::new(MemoryLogger::default());
        let logger: Option<SharedLogger> = Some(memory.clone());

        log_with(&logger, "Driver", Level::Info, "Archive 'a' deleted");
        log_with(&logger, "Backup", Level::Warn, "careful");

        assert_eq!(memory.messages(Level::Info), vec!["Driver: Archive 'a' deleted"]);
        assert_eq!(memory.messages(Level::Warn), vec!["Backup: careful"]);
        assert!(memory.messages(Level::Error).is_empty());
    }

    #[test]
    fn test_tracing_logger_does_not_panic() {
        let logger: Option<SharedLogger> = Some(Arc::new(TracingLogger));
        log_with(&logger, "Backup", Level::Debug, "debug");
        log_with(&logger, "Backup", Level::Error, "error");
    }
}
