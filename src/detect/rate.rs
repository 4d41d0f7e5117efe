//! Rate detector -- flags event types arriving much faster or much slower
//! than their learned baseline rate.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::detect::Detector;
use crate::event::Event;

/// Baselines below this (events/s) are treated as "not learned yet".
const BASELINE_FLOOR: f64 = 0.1;

/// EMA smoothing for the baseline rate.
const BASELINE_ALPHA: f64 = 0.1;

#[derive(Debug, Default)]
struct RateState {
    timestamps: VecDeque<DateTime<Utc>>,
    baseline_rate: f64,
}

/// Per-event-type arrival rate detector.
pub struct RateDetector {
    event_rates: Mutex<HashMap<String, RateState>>,
    window: Duration,
}

impl RateDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            event_rates: Mutex::new(HashMap::new()),
            window,
        }
    }

    fn window_seconds(&self) -> f64 {
        self.window.num_milliseconds() as f64 / 1000.0
    }
}

impl Detector for RateDetector {
    fn score(&self, event: &Event) -> f64 {
        let mut rates = self.event_rates.lock().unwrap();
        let Some(state) = rates.get_mut(&event.event_type) else {
            return 0.0;
        };
        if state.timestamps.is_empty() {
            return 0.0;
        }

        let cutoff = event.timestamp - self.window;
        while state
            .timestamps
            .front()
            .is_some_and(|ts| *ts < cutoff)
        {
            state.timestamps.pop_front();
        }

        let current_rate = state.timestamps.len() as f64 / self.window_seconds();
        if state.baseline_rate < BASELINE_FLOOR {
            return 0.0;
        }

        let ratio = current_rate / state.baseline_rate;
        if ratio > 2.0 {
            // Rate spike.
            ((ratio - 2.0) / 3.0).min(1.0)
        } else if ratio < 0.5 {
            // Rate drop.
            ((0.5 - ratio) / 0.5).min(1.0)
        } else {
            0.0
        }
    }

    fn train(&self, event: &Event) {
        let mut rates = self.event_rates.lock().unwrap();
        let state = rates.entry(event.event_type.clone()).or_default();
        state.timestamps.push_back(event.timestamp);

        let cutoff = event.timestamp - self.window;
        let count = state.timestamps.iter().filter(|ts| **ts >= cutoff).count();
        let current_rate = count as f64 / self.window_seconds();

        if state.baseline_rate < BASELINE_FLOOR {
            state.baseline_rate = current_rate;
        } else {
            state.baseline_rate =
                (1.0 - BASELINE_ALPHA) * state.baseline_rate + BASELINE_ALPHA * current_rate;
        }
    }

    fn name(&self) -> &'static str {
        "rate"
    }
}
