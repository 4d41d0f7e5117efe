//! Structured semantic events -- the unit everything downstream consumes.
//!
//! An [`Event`] carries a dotted event type, typed severity, string entities,
//! numeric metrics, and free-form context. The pipeline annotates it with an
//! anomaly score (and possibly an incident id) before it reaches history,
//! callbacks, and sinks.

pub mod builder;

pub use builder::EventBuilder;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events scoring at or above this are counted as anomalies and fan out to
/// anomaly callbacks. Incident creation uses its own configurable threshold.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.7;

/// Severity levels, ordered. `Alert` is reserved for pipeline-generated
/// high-priority events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured stack frame. Capture is best-effort: fields a platform
/// cannot resolve stay empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
    pub module: String,
}

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(0);

fn next_event_id() -> u64 {
    NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single structured log event.
///
/// Entities and context are string-to-string maps; metrics are the only
/// numeric input the analytics stages look at. Ids are unique and
/// monotonically increasing per process.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: u64,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub entities: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub context: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub stack_trace: Vec<StackFrame>,
    pub service_name: String,
    pub service_instance: String,
    pub trace_id: String,
    pub span_id: String,
    pub anomaly_score: f64,
    pub predicted_labels: Vec<String>,
    pub incident_id: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_id: next_event_id(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            severity: Severity::Info,
            message: String::new(),
            entities: BTreeMap::new(),
            metrics: BTreeMap::new(),
            context: BTreeMap::new(),
            tags: Vec::new(),
            stack_trace: Vec::new(),
            service_name: String::new(),
            service_instance: String::new(),
            trace_id: String::new(),
            span_id: String::new(),
            anomaly_score: 0.0,
            predicted_labels: Vec::new(),
            incident_id: None,
        }
    }

    /// Whether the pipeline flagged this event as anomalous.
    pub fn is_anomalous(&self) -> bool {
        self.anomaly_score >= DEFAULT_ANOMALY_THRESHOLD
    }

    /// Capture the current call stack into the event, up to `max_frames`.
    ///
    /// Yields an empty trace on platforms without symbol introspection.
    pub fn capture_stack_trace(&mut self, max_frames: usize) {
        let bt = backtrace::Backtrace::new();
        for frame in bt.frames().iter().take(max_frames) {
            for symbol in frame.symbols() {
                self.stack_trace.push(StackFrame {
                    function: symbol
                        .name()
                        .map(|n| n.to_string())
                        .unwrap_or_default(),
                    file: symbol
                        .filename()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    line: symbol.lineno().unwrap_or(0),
                    module: String::new(),
                });
            }
        }
    }

    /// Compact JSON rendering for storage and transmission.
    ///
    /// Key order is stable: identity fields first, then the optional scalar
    /// fields, then the non-empty maps, then the anomaly score.
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct Wire<'a> {
            event_id: u64,
            event_type: &'a str,
            timestamp: i64,
            severity: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            message: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            service: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            trace_id: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            entities: Option<&'a BTreeMap<String, String>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            metrics: Option<&'a BTreeMap<String, f64>>,
            #[serde(skip_serializing_if = "Option::is_none")]
            context: Option<&'a BTreeMap<String, String>>,
            anomaly_score: f64,
            #[serde(skip_serializing_if = "Option::is_none")]
            incident_id: Option<&'a str>,
        }

        fn non_empty(s: &str) -> Option<&str> {
            (!s.is_empty()).then_some(s)
        }

        let wire = Wire {
            event_id: self.event_id,
            event_type: &self.event_type,
            timestamp: self.timestamp.timestamp_millis(),
            severity: self.severity.as_str(),
            message: non_empty(&self.message),
            service: non_empty(&self.service_name),
            trace_id: non_empty(&self.trace_id),
            entities: (!self.entities.is_empty()).then_some(&self.entities),
            metrics: (!self.metrics.is_empty()).then_some(&self.metrics),
            context: (!self.context.is_empty()).then_some(&self.context),
            anomaly_score: self.anomaly_score,
            incident_id: self.incident_id.as_deref(),
        };

        // A plain struct of scalars and maps; serialization cannot fail.
        serde_json::to_string(&wire).unwrap_or_default()
    }

    /// Human-readable single-line rendering used by the file and console
    /// sinks.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} [{}]",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.severity.as_str()
        );

        if !self.service_name.is_empty() {
            line.push_str(" [");
            line.push_str(&self.service_name);
            if !self.service_instance.is_empty() {
                line.push(':');
                line.push_str(&self.service_instance);
            }
            line.push(']');
        }

        line.push(' ');
        line.push_str(&self.event_type);

        if !self.message.is_empty() {
            line.push_str(" - ");
            line.push_str(&self.message);
        }

        if !self.entities.is_empty() {
            let pairs: Vec<String> = self
                .entities
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            line.push_str(&format!(" {{{}}}", pairs.join(", ")));
        }

        if !self.metrics.is_empty() {
            let pairs: Vec<String> = self
                .metrics
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            line.push_str(&format!(" [{}]", pairs.join(", ")));
        }

        if self.is_anomalous() {
            line.push_str(&format!(" ⚠️ ANOMALY({})", self.anomaly_score));
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_are_unique_and_increasing() {
        let a = Event::new("test.first");
        let b = Event::new("test.second");
        let c = Event::new("test.third");
        assert!(a.event_id < b.event_id);
        assert!(b.event_id < c.event_id);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Trace < Severity::Debug);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Critical < Severity::Alert);
        assert!(Severity::Error >= Severity::Error);
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let mut event = Event::new("payment.processed");
        event.severity = Severity::Warning;
        event.message = "card declined".to_string();
        event.service_name = "payments".to_string();
        event.trace_id = "t-123".to_string();
        event.entities.insert("user".into(), "u42".into());
        event.metrics.insert("amount".into(), 19.99);
        event.context.insert("region".into(), "eu-west".into());
        event.anomaly_score = 0.25;

        let parsed: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(parsed["event_id"], event.event_id);
        assert_eq!(parsed["event_type"], "payment.processed");
        assert_eq!(parsed["timestamp"], event.timestamp.timestamp_millis());
        assert_eq!(parsed["severity"], "WARNING");
        assert_eq!(parsed["message"], "card declined");
        assert_eq!(parsed["service"], "payments");
        assert_eq!(parsed["trace_id"], "t-123");
        assert_eq!(parsed["entities"]["user"], "u42");
        assert_eq!(parsed["metrics"]["amount"], 19.99);
        assert_eq!(parsed["context"]["region"], "eu-west");
        assert_eq!(parsed["anomaly_score"], 0.25);
    }

    #[test]
    fn json_omits_empty_sections() {
        let event = Event::new("bare.event");
        let parsed: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert!(parsed.get("message").is_none());
        assert!(parsed.get("entities").is_none());
        assert!(parsed.get("metrics").is_none());
        assert!(parsed.get("context").is_none());
        assert!(parsed.get("incident_id").is_none());
    }

    #[test]
    fn line_format_includes_service_and_anomaly_marker() {
        let mut event = Event::new("api.timeout");
        event.service_name = "gateway".to_string();
        event.service_instance = "gw-1".to_string();
        event.message = "upstream timed out".to_string();
        event.anomaly_score = 0.9;

        let line = event.to_line();
        assert!(line.contains("[gateway:gw-1]"));
        assert!(line.contains("api.timeout - upstream timed out"));
        assert!(line.contains("ANOMALY(0.9)"));
    }
}
