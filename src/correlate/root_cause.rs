//! Root-cause nomination for correlated event groups.
//!
//! Heuristic: event ids are monotone, so the smallest id in a correlation is
//! the earliest event and the most likely origin.

use std::sync::Arc;

use crate::correlate::{Correlation, EventCorrelator};

/// One piece of support for a root-cause nomination.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub kind: String,
    pub description: String,
    pub weight: f64,
}

/// A nominated root cause with supporting evidence.
#[derive(Debug, Clone)]
pub struct RootCause {
    pub root_event_id: u64,
    pub affected_event_ids: Vec<u64>,
    pub confidence: f64,
    pub explanation: String,
    pub evidence: Vec<Evidence>,
}

/// Derives root causes from stored correlations.
pub struct RootCauseAnalyzer {
    correlator: Arc<EventCorrelator>,
}

impl RootCauseAnalyzer {
    pub fn new(correlator: Arc<EventCorrelator>) -> Self {
        Self { correlator }
    }

    /// Nominate the earliest event in the correlation as root cause.
    pub fn find_root_cause(&self, correlation: &Correlation) -> Option<RootCause> {
        let root_event_id = correlation.event_ids.iter().copied().min()?;

        Some(RootCause {
            root_event_id,
            affected_event_ids: correlation.event_ids.clone(),
            confidence: correlation.confidence * 0.7,
            explanation: "Earliest event in correlation chain".to_string(),
            evidence: vec![
                Evidence {
                    kind: "temporal".to_string(),
                    description: "First event in time sequence".to_string(),
                    weight: 0.6,
                },
                Evidence {
                    kind: "correlation".to_string(),
                    description: correlation.reason.clone(),
                    weight: correlation.confidence,
                },
            ],
        })
    }

    /// Nominate a root cause for a specific event using its strongest
    /// stored correlation.
    pub fn find_root_cause_for_event(&self, event_id: u64) -> Option<RootCause> {
        let correlations = self.correlator.correlations_for_event(event_id);
        let best = correlations.into_iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        self.find_root_cause(&best)
    }
}
