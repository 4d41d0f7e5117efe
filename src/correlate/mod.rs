//! Event correlation -- groups events sharing a trace, entity, service, or
//! time window, learns causal links between event types, and nominates root
//! causes for correlated groups.

pub mod causality;
pub mod correlator;
pub mod root_cause;

pub use causality::{CausalKind, CausalRelationship, CausalityAnalyzer};
pub use correlator::EventCorrelator;
pub use root_cause::{Evidence, RootCause, RootCauseAnalyzer};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::clock::SharedClock;
use crate::event::Event;

/// Which strategy produced a correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    TraceId,
    Entity,
    Service,
    Temporal,
}

impl CorrelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationType::TraceId => "trace_id",
            CorrelationType::Entity => "entity",
            CorrelationType::Service => "service",
            CorrelationType::Temporal => "temporal",
        }
    }
}

/// A group of events correlated by one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct Correlation {
    pub event_ids: Vec<u64>,
    pub correlation_type: CorrelationType,
    pub confidence: f64,
    pub reason: String,
    pub first_event_time: DateTime<Utc>,
    pub last_event_time: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

/// Main entry point tying the correlator, causality learning, and root-cause
/// analysis together.
pub struct CorrelationEngine {
    correlator: Arc<EventCorrelator>,
    causality: Arc<CausalityAnalyzer>,
    root_cause: RootCauseAnalyzer,
}

impl CorrelationEngine {
    pub fn new(clock: SharedClock) -> Self {
        let correlator = Arc::new(EventCorrelator::new(clock));
        let causality = Arc::new(CausalityAnalyzer::new());
        let root_cause = RootCauseAnalyzer::new(correlator.clone());
        Self {
            correlator,
            causality,
            root_cause,
        }
    }

    /// Correlate the event against the store and learn causal links from the
    /// recent-history context. Runs each strategy exactly once per event.
    pub fn process(&self, event: &Event, history: &[Event]) -> Vec<Correlation> {
        let correlations = self.correlator.correlate(event);
        self.causality.learn(event, history);
        correlations
    }

    pub fn correlator(&self) -> &Arc<EventCorrelator> {
        &self.correlator
    }

    pub fn causality(&self) -> &Arc<CausalityAnalyzer> {
        &self.causality
    }

    pub fn root_cause(&self) -> &RootCauseAnalyzer {
        &self.root_cause
    }

    /// Seed the analyzer with well-known service causalities.
    pub fn register_builtin_relationships(&self) {
        self.causality.register(CausalRelationship {
            cause_event_type: "database.slow".into(),
            effect_event_type: "api.timeout".into(),
            kind: CausalKind::Causes,
            strength: 0.9,
            typical_delay: Duration::milliseconds(500),
            observed_count: 100,
        });
        self.causality.register(CausalRelationship {
            cause_event_type: "api.timeout".into(),
            effect_event_type: "user.error".into(),
            kind: CausalKind::Causes,
            strength: 0.8,
            typical_delay: Duration::milliseconds(100),
            observed_count: 100,
        });
        self.causality.register(CausalRelationship {
            cause_event_type: "circuit_breaker.open".into(),
            effect_event_type: "api.call".into(),
            kind: CausalKind::Prevents,
            strength: 1.0,
            typical_delay: Duration::zero(),
            observed_count: 100,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[test]
    fn builtin_relationships_are_registered() {
        let engine = CorrelationEngine::new(Arc::new(SystemClock));
        engine.register_builtin_relationships();
        let known = engine.causality().known_relationships();
        assert_eq!(known.len(), 3);
        assert!(known
            .iter()
            .any(|r| r.cause_event_type == "database.slow"
                && r.effect_event_type == "api.timeout"
                && r.kind == CausalKind::Causes));
    }

    #[test]
    fn process_returns_correlations_once() {
        let engine = CorrelationEngine::new(Arc::new(SystemClock));

        let mut first = Event::new("api.request");
        first.trace_id = "t-1".into();
        assert!(engine.process(&first, &[]).is_empty());

        let mut second = Event::new("api.response");
        second.trace_id = "t-1".into();
        let correlations = engine.process(&second, &[first.clone()]);
        let trace: Vec<_> = correlations
            .iter()
            .filter(|c| c.correlation_type == CorrelationType::TraceId)
            .collect();
        assert_eq!(trace.len(), 1);

        // Only the strategies' own results are stored, nothing twice.
        let stored = engine.correlator().active_correlations();
        assert_eq!(stored.len(), correlations.len());
    }
}
