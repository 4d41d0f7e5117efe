//! Learned and declared causal links between event types.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Duration;

use crate::event::Event;

/// How the context window reaches back when learning from history.
const LEARN_WINDOW_SECS: i64 = 60;

/// Per-observation strength increase, capped at 1.0.
const STRENGTH_STEP: f64 = 0.05;

/// Strength assigned to a newly observed pair.
const INITIAL_STRENGTH: f64 = 0.1;

/// Direction of a causal association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalKind {
    /// A causes B.
    Causes,
    /// A prevents B.
    Prevents,
    /// A enables B.
    Enables,
    /// A precedes B; temporal only.
    Precedes,
}

impl CausalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CausalKind::Causes => "causes",
            CausalKind::Prevents => "prevents",
            CausalKind::Enables => "enables",
            CausalKind::Precedes => "precedes",
        }
    }
}

/// A directed association between two event types.
#[derive(Debug, Clone)]
pub struct CausalRelationship {
    pub cause_event_type: String,
    pub effect_event_type: String,
    pub kind: CausalKind,
    pub strength: f64,
    pub typical_delay: Duration,
    pub observed_count: u64,
}

impl CausalRelationship {
    pub fn description(&self) -> String {
        format!(
            "{} {} {} (strength={}, observed={}x)",
            self.cause_event_type,
            self.kind.as_str(),
            self.effect_event_type,
            self.strength,
            self.observed_count
        )
    }
}

/// Tracks causal relationships keyed by (cause type, effect type).
#[derive(Default)]
pub struct CausalityAnalyzer {
    relationships: Mutex<HashMap<(String, String), CausalRelationship>>,
}

impl CausalityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known relationships where a context event's type leads to this
    /// event's type.
    pub fn analyze(&self, event: &Event, history: &[Event]) -> Vec<CausalRelationship> {
        let relationships = self.relationships.lock().unwrap();
        history
            .iter()
            .filter_map(|prev| {
                relationships
                    .get(&(prev.event_type.clone(), event.event_type.clone()))
                    .cloned()
            })
            .collect()
    }

    /// Upsert a relationship for every context event inside the learning
    /// window. New pairs start as PRECEDES; repeats strengthen and refine
    /// the typical delay as a running mean.
    pub fn learn(&self, event: &Event, history: &[Event]) {
        let mut relationships = self.relationships.lock().unwrap();
        let cutoff = event.timestamp - Duration::seconds(LEARN_WINDOW_SECS);

        for prev in history {
            if prev.timestamp < cutoff {
                continue;
            }

            let delay = event.timestamp - prev.timestamp;
            let key = (prev.event_type.clone(), event.event_type.clone());

            relationships
                .entry(key)
                .and_modify(|rel| {
                    rel.observed_count += 1;
                    let n = rel.observed_count as i64;
                    let mean_ms = (rel.typical_delay.num_milliseconds() * (n - 1)
                        + delay.num_milliseconds())
                        / n;
                    rel.typical_delay = Duration::milliseconds(mean_ms);
                    rel.strength = (rel.strength + STRENGTH_STEP).min(1.0);
                })
                .or_insert_with(|| CausalRelationship {
                    cause_event_type: prev.event_type.clone(),
                    effect_event_type: event.event_type.clone(),
                    kind: CausalKind::Precedes,
                    strength: INITIAL_STRENGTH,
                    typical_delay: delay,
                    observed_count: 1,
                });
        }
    }

    /// Declare a known relationship up front.
    pub fn register(&self, rel: CausalRelationship) {
        let key = (rel.cause_event_type.clone(), rel.effect_event_type.clone());
        self.relationships.lock().unwrap().insert(key, rel);
    }

    pub fn known_relationships(&self) -> Vec<CausalRelationship> {
        self.relationships.lock().unwrap().values().cloned().collect()
    }
}
