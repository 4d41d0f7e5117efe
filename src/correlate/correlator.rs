//! Indexed store of recent events with four correlation strategies.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::Duration;

use crate::clock::SharedClock;
use crate::correlate::{Correlation, CorrelationType};
use crate::event::Event;

const TRACE_CONFIDENCE: f64 = 1.0;
const ENTITY_CONFIDENCE: f64 = 0.8;
const SERVICE_CONFIDENCE: f64 = 0.6;
const TEMPORAL_CONFIDENCE: f64 = 0.4;

/// Same-service correlation only looks back this far.
const SERVICE_WINDOW_SECS: i64 = 60;

/// Temporal correlation groups events within this distance.
const TEMPORAL_WINDOW_SECS: i64 = 5;

#[derive(Default)]
struct State {
    events: HashMap<u64, Event>,
    correlations: Vec<Correlation>,
    trace_index: HashMap<String, Vec<u64>>,
    entity_index: HashMap<String, Vec<u64>>,
    service_index: HashMap<String, Vec<u64>>,
}

impl State {
    fn index_event(&mut self, event: &Event) {
        let id = event.event_id;
        if !event.trace_id.is_empty() {
            self.trace_index
                .entry(event.trace_id.clone())
                .or_default()
                .push(id);
        }
        for value in event.entities.values() {
            self.entity_index.entry(value.clone()).or_default().push(id);
        }
        if !event.service_name.is_empty() {
            self.service_index
                .entry(event.service_name.clone())
                .or_default()
                .push(id);
        }
    }

    fn by_trace_id(&self, event: &Event) -> Option<Correlation> {
        if event.trace_id.is_empty() {
            return None;
        }
        let prior = self.trace_index.get(&event.trace_id)?;
        if prior.is_empty() {
            return None;
        }

        let mut event_ids = prior.clone();
        event_ids.push(event.event_id);

        let mut metadata = BTreeMap::new();
        metadata.insert("trace_id".to_string(), event.trace_id.clone());

        Some(Correlation {
            event_ids,
            correlation_type: CorrelationType::TraceId,
            confidence: TRACE_CONFIDENCE,
            reason: format!("Events share trace ID: {}", event.trace_id),
            first_event_time: event.timestamp,
            last_event_time: event.timestamp,
            metadata,
        })
    }

    fn by_entities(&self, event: &Event) -> Option<Correlation> {
        let mut related: HashSet<u64> = HashSet::new();
        for value in event.entities.values() {
            if let Some(ids) = self.entity_index.get(value) {
                related.extend(ids.iter().filter(|id| **id != event.event_id));
            }
        }
        if related.is_empty() {
            return None;
        }

        let mut event_ids: Vec<u64> = related.into_iter().collect();
        event_ids.sort_unstable();
        event_ids.push(event.event_id);

        Some(Correlation {
            event_ids,
            correlation_type: CorrelationType::Entity,
            confidence: ENTITY_CONFIDENCE,
            reason: "Events share common entities".to_string(),
            first_event_time: event.timestamp,
            last_event_time: event.timestamp,
            metadata: BTreeMap::new(),
        })
    }

    fn by_service(&self, event: &Event) -> Option<Correlation> {
        if event.service_name.is_empty() {
            return None;
        }
        let ids = self.service_index.get(&event.service_name)?;

        let cutoff = event.timestamp - Duration::seconds(SERVICE_WINDOW_SECS);
        let recent: Vec<u64> = ids
            .iter()
            .copied()
            .filter(|id| {
                self.events
                    .get(id)
                    .is_some_and(|e| e.timestamp >= cutoff)
            })
            .collect();
        if recent.is_empty() {
            return None;
        }

        let mut event_ids = recent;
        event_ids.push(event.event_id);

        let mut metadata = BTreeMap::new();
        metadata.insert("service".to_string(), event.service_name.clone());

        Some(Correlation {
            event_ids,
            correlation_type: CorrelationType::Service,
            confidence: SERVICE_CONFIDENCE,
            reason: format!("Events from same service: {}", event.service_name),
            first_event_time: event.timestamp,
            last_event_time: event.timestamp,
            metadata,
        })
    }

    fn by_time(&self, event: &Event) -> Option<Correlation> {
        let window = Duration::seconds(TEMPORAL_WINDOW_SECS);
        let mut nearby: Vec<u64> = self
            .events
            .values()
            .filter(|e| {
                e.event_id != event.event_id
                    && (e.timestamp - event.timestamp).abs() <= window
            })
            .map(|e| e.event_id)
            .collect();
        if nearby.len() < 2 {
            return None;
        }
        nearby.sort_unstable();
        nearby.push(event.event_id);

        Some(Correlation {
            event_ids: nearby,
            correlation_type: CorrelationType::Temporal,
            confidence: TEMPORAL_CONFIDENCE,
            reason: format!("Events occurred within {TEMPORAL_WINDOW_SECS} seconds"),
            first_event_time: event.timestamp,
            last_event_time: event.timestamp,
            metadata: BTreeMap::new(),
        })
    }
}

/// Stores recent events plus their correlations, indexed by trace, entity
/// value, and service.
pub struct EventCorrelator {
    state: Mutex<State>,
    clock: SharedClock,
}

impl EventCorrelator {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    /// Apply all strategies to the event, then add it to the store.
    pub fn correlate(&self, event: &Event) -> Vec<Correlation> {
        let mut state = self.state.lock().unwrap();

        let found: Vec<Correlation> = [
            state.by_trace_id(event),
            state.by_entities(event),
            state.by_service(event),
            state.by_time(event),
        ]
        .into_iter()
        .flatten()
        .collect();

        state.events.insert(event.event_id, event.clone());
        state.index_event(event);
        state.correlations.extend(found.iter().cloned());

        found
    }

    pub fn correlations_for_event(&self, event_id: u64) -> Vec<Correlation> {
        let state = self.state.lock().unwrap();
        state
            .correlations
            .iter()
            .filter(|c| c.event_ids.contains(&event_id))
            .cloned()
            .collect()
    }

    pub fn active_correlations(&self) -> Vec<Correlation> {
        self.state.lock().unwrap().correlations.clone()
    }

    /// Evict events and correlations older than `max_age` and rebuild the
    /// indices from what remains.
    pub fn cleanup(&self, max_age: Duration) {
        let cutoff = self.clock.now() - max_age;
        let mut state = self.state.lock().unwrap();

        state.events.retain(|_, e| e.timestamp >= cutoff);
        state.correlations.retain(|c| c.last_event_time >= cutoff);

        state.trace_index.clear();
        state.entity_index.clear();
        state.service_index.clear();

        let events: Vec<Event> = state.events.values().cloned().collect();
        for event in &events {
            state.index_event(event);
        }
    }
}
