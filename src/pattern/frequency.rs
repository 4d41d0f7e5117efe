//! Frequency patterns -- bursts of one event type or repeated activity from
//! the same entity within a time window.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::event::Event;
use crate::pattern::PatternMatcher;

/// What kind of frequency anomaly to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyKind {
    /// Sudden spike in event frequency.
    Burst,
    /// Same entity value appearing too often.
    Repeated,
    /// Expected event not occurring. Reserved; never matches.
    Absence,
}

#[derive(Default)]
struct FrequencyState {
    event_times: VecDeque<DateTime<Utc>>,
    entity_times: HashMap<String, VecDeque<DateTime<Utc>>>,
}

/// Window-and-threshold pattern bound to a single event type.
pub struct FrequencyPattern {
    name: String,
    event_type: String,
    kind: FrequencyKind,
    threshold: usize,
    window: Duration,
    state: Mutex<FrequencyState>,
}

impl FrequencyPattern {
    pub fn new(
        name: impl Into<String>,
        event_type: impl Into<String>,
        kind: FrequencyKind,
        threshold: usize,
        window: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            event_type: event_type.into(),
            kind,
            threshold,
            window,
            state: Mutex::new(FrequencyState::default()),
        }
    }
}

fn prune(times: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
    while times.front().is_some_and(|ts| *ts < cutoff) {
        times.pop_front();
    }
}

impl PatternMatcher for FrequencyPattern {
    fn matches(&self, event: &Event, _history: &[Event]) -> f64 {
        if event.event_type != self.event_type {
            return 0.0;
        }

        let mut state = self.state.lock().unwrap();
        let cutoff = event.timestamp - self.window;
        prune(&mut state.event_times, cutoff);

        match self.kind {
            FrequencyKind::Burst => {
                let count = state.event_times.len();
                if count >= self.threshold {
                    // Score climbs with how far past the threshold we are.
                    let excess = (count - self.threshold + 1) as f64 / self.threshold as f64;
                    (0.7 + excess * 0.3).min(1.0)
                } else {
                    0.0
                }
            }
            FrequencyKind::Repeated => {
                for value in event.entities.values() {
                    if let Some(times) = state.entity_times.get_mut(value) {
                        prune(times, cutoff);
                        if times.len() >= self.threshold {
                            return 1.0;
                        }
                    }
                }
                0.0
            }
            FrequencyKind::Absence => 0.0,
        }
    }

    fn train(&self, event: &Event) {
        if event.event_type != self.event_type {
            return;
        }

        let mut state = self.state.lock().unwrap();
        state.event_times.push_back(event.timestamp);
        for value in event.entities.values() {
            state
                .entity_times
                .entry(value.clone())
                .or_default()
                .push_back(event.timestamp);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        match self.kind {
            FrequencyKind::Burst => format!(
                "Frequency pattern: {} (burst detection, threshold={})",
                self.event_type, self.threshold
            ),
            FrequencyKind::Repeated => format!(
                "Frequency pattern: {} (repeated entity, threshold={})",
                self.event_type, self.threshold
            ),
            FrequencyKind::Absence => {
                format!("Frequency pattern: {} (absence detection)", self.event_type)
            }
        }
    }
}
