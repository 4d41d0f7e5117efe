//! Process-wide logger handle.
//!
//! Thin veneer over a guarded [`Logger`] instance so applications can emit
//! from anywhere without plumbing. Tests that need isolation construct
//! their own `Logger` instead.

use std::sync::{Arc, RwLock};

use crate::config::Config;
use crate::event::{Event, EventBuilder, Severity};
use crate::logger::{Logger, Stats};

static GLOBAL: RwLock<Option<Arc<Logger>>> = RwLock::new(None);

/// Initialize the process-wide pipeline. A second call without an
/// intervening [`shutdown`] is a no-op with a stderr notice.
pub fn init(config: Config) {
    let mut global = GLOBAL.write().unwrap();
    if global.is_some() {
        eprintln!("logmedic: already initialized, ignoring init()");
        return;
    }
    *global = Some(Logger::new(config));
}

/// Drain and stop the process-wide pipeline. Safe to call repeatedly.
pub fn shutdown() {
    let logger = GLOBAL.write().unwrap().take();
    if let Some(logger) = logger {
        logger.shutdown();
    }
}

/// The current process-wide logger, if initialized.
pub fn handle() -> Option<Arc<Logger>> {
    GLOBAL.read().unwrap().clone()
}

/// Start building an event against the process-wide pipeline.
pub fn event(event_type: impl Into<String>) -> EventBuilder {
    match handle() {
        Some(logger) => logger.event(event_type),
        None => EventBuilder::new(event_type),
    }
}

/// Sugar for a `metric.observed` event carrying the metric name in context.
pub fn observe(metric_name: &str) -> EventBuilder {
    event("metric.observed").context("metric_name", metric_name)
}

pub fn trace(msg: impl Into<String>) {
    event("log.message").severity(Severity::Trace).message(msg).emit();
}

pub fn debug(msg: impl Into<String>) {
    event("log.message").severity(Severity::Debug).message(msg).emit();
}

pub fn info(msg: impl Into<String>) {
    event("log.message").severity(Severity::Info).message(msg).emit();
}

pub fn warn(msg: impl Into<String>) {
    event("log.message").severity(Severity::Warning).message(msg).emit();
}

pub fn error(msg: impl Into<String>) {
    event("log.message").severity(Severity::Error).message(msg).emit();
}

pub fn critical(msg: impl Into<String>) {
    event("log.message")
        .severity(Severity::Critical)
        .message(msg)
        .capture_stack_trace()
        .emit();
}

/// Stats of the process-wide pipeline, if initialized.
pub fn stats() -> Option<Stats> {
    handle().map(|logger| logger.stats())
}

/// Route an already-built event. Uninitialized emission degrades to a
/// stderr dump instead of crashing.
pub(crate) fn emit(event: Event) {
    match handle() {
        Some(logger) => logger.emit(event),
        None => eprintln!("logmedic (uninitialized): {}", event.to_line()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global handle is process-wide state, so the whole lifecycle is
    // exercised in a single test to avoid cross-test interference.
    #[test]
    fn lifecycle_init_emit_shutdown() {
        // Emission before init must not panic.
        event("before.init").message("dumped to stderr").emit();
        assert!(stats().is_none());

        let config = Config {
            log_to_console: false,
            ..Config::default()
        };
        init(config.clone());
        assert!(handle().is_some());

        // Second init is a warning no-op; the original instance survives.
        let first = handle().unwrap();
        init(config);
        assert!(Arc::ptr_eq(&first, &handle().unwrap()));

        event("global.event").emit();
        observe("latency_ms").metric("latency_ms", 12.0).emit();
        info("plain message");

        shutdown();
        assert!(handle().is_none());

        // Shutdown again is a no-op.
        shutdown();

        // Re-init after shutdown works.
        init(Config {
            log_to_console: false,
            ..Config::default()
        });
        assert!(handle().is_some());
        shutdown();
    }
}
