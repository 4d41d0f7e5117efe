//! Moving-average detector -- flags sudden spikes or drops against a
//! sliding window of recent values, using mean absolute deviation.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::detect::Detector;
use crate::event::Event;

const MIN_SAMPLES: usize = 10;
const DEVIATION_FLOOR: f64 = 1e-6;
const DEFAULT_THRESHOLD: f64 = 2.5;

#[derive(Debug, Default)]
struct Window {
    values: VecDeque<f64>,
    sum: f64,
}

/// Per-metric sliding window detector.
pub struct MovingAverageDetector {
    metric_history: Mutex<HashMap<String, Window>>,
    window_size: usize,
    threshold: f64,
}

impl MovingAverageDetector {
    pub fn new(window_size: usize) -> Self {
        Self::with_threshold(window_size, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(window_size: usize, threshold: f64) -> Self {
        Self {
            metric_history: Mutex::new(HashMap::new()),
            window_size,
            threshold,
        }
    }
}

impl Detector for MovingAverageDetector {
    fn score(&self, event: &Event) -> f64 {
        if event.metrics.is_empty() {
            return 0.0;
        }

        let history = self.metric_history.lock().unwrap();
        let mut max_score: f64 = 0.0;

        for (name, &value) in &event.metrics {
            if !value.is_finite() {
                continue;
            }
            let Some(window) = history.get(name) else { continue };
            if window.values.len() < MIN_SAMPLES {
                continue;
            }

            let avg = window.sum / window.values.len() as f64;
            let mad = window
                .values
                .iter()
                .map(|v| (v - avg).abs())
                .sum::<f64>()
                / window.values.len() as f64;

            if mad < DEVIATION_FLOOR {
                if (value - avg).abs() > DEVIATION_FLOOR {
                    return 1.0;
                }
                continue;
            }

            let deviation = (value - avg).abs() / (self.threshold * mad);
            max_score = max_score.max(deviation.tanh());
        }

        max_score
    }

    fn train(&self, event: &Event) {
        let mut history = self.metric_history.lock().unwrap();
        for (name, &value) in &event.metrics {
            if !value.is_finite() {
                continue;
            }
            let window = history.entry(name.clone()).or_default();
            window.values.push_back(value);
            window.sum += value;
            if window.values.len() > self.window_size {
                if let Some(old) = window.values.pop_front() {
                    window.sum -= old;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "moving_average"
    }
}
