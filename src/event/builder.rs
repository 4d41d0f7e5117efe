//! Fluent construction of events.
//!
//! Builders are consumed by `emit()`, which hands the finished event to the
//! owning logger (or the process-wide one when unbound). `build()` returns
//! the event without emitting, mainly for tests.

use std::sync::Arc;

use crate::event::{Event, Severity};
use crate::logger::Logger;

const DEFAULT_STACK_FRAMES: usize = 32;

/// Chained setters over an [`Event`] under construction.
pub struct EventBuilder {
    event: Event,
    sink: Option<Arc<Logger>>,
}

impl EventBuilder {
    /// Builder routed through the process-wide logger on `emit()`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event: Event::new(event_type),
            sink: None,
        }
    }

    pub(crate) fn bound(event: Event, sink: Arc<Logger>) -> Self {
        Self {
            event,
            sink: Some(sink),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.event.severity = severity;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = message.into();
        self
    }

    /// Attach a semantic entity reference (user, order, instance, ...).
    pub fn entity(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.event.entities.insert(name.into(), value.into());
        self
    }

    /// Attach a numeric metric. Non-finite values are carried but skipped by
    /// the anomaly detectors.
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.event.metrics.insert(name.into(), value);
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.event.context.insert(key.into(), value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.event.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.event.service_name = name.into();
        self
    }

    pub fn service_instance(mut self, instance: impl Into<String>) -> Self {
        self.event.service_instance = instance.into();
        self
    }

    pub fn trace_id(mut self, id: impl Into<String>) -> Self {
        self.event.trace_id = id.into();
        self
    }

    pub fn span_id(mut self, id: impl Into<String>) -> Self {
        self.event.span_id = id.into();
        self
    }

    pub fn predicted_label(mut self, label: impl Into<String>) -> Self {
        self.event.predicted_labels.push(label.into());
        self
    }

    /// Best-effort capture of the current call stack.
    pub fn capture_stack_trace(mut self) -> Self {
        self.event.capture_stack_trace(DEFAULT_STACK_FRAMES);
        self
    }

    /// Hand the event to the processing pipeline.
    pub fn emit(self) {
        match self.sink {
            Some(logger) => logger.emit(self.event),
            None => crate::global::emit(self.event),
        }
    }

    /// Return the built event without emitting it.
    pub fn build(self) -> Event {
        self.event
    }
}
