//! Z-score detector -- per-metric running mean and variance via Welford's
//! online algorithm.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::detect::Detector;
use crate::event::Event;

/// Samples required per metric before the detector starts scoring it.
const MIN_SAMPLES: u64 = 30;

/// Below this the metric is treated as constant.
const VARIANCE_FLOOR: f64 = 1e-6;

#[derive(Debug, Default, Clone)]
struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    fn stddev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            0.0
        }
    }
}

/// Statistical detector comparing each metric to its learned mean/stddev.
pub struct ZScoreDetector {
    metric_stats: Mutex<HashMap<String, Welford>>,
    threshold: f64,
}

impl ZScoreDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            metric_stats: Mutex::new(HashMap::new()),
            threshold,
        }
    }
}

impl Detector for ZScoreDetector {
    fn score(&self, event: &Event) -> f64 {
        if event.metrics.is_empty() {
            return 0.0;
        }

        let stats = self.metric_stats.lock().unwrap();
        let mut max_score: f64 = 0.0;

        for (name, &value) in &event.metrics {
            if !value.is_finite() {
                continue;
            }
            let Some(s) = stats.get(name) else { continue };
            if s.count < MIN_SAMPLES {
                continue;
            }

            let stddev = s.stddev();
            if stddev < VARIANCE_FLOOR {
                // A constant metric that suddenly moved is maximally anomalous.
                if (value - s.mean).abs() > VARIANCE_FLOOR {
                    return 1.0;
                }
                continue;
            }

            let z = (value - s.mean).abs() / stddev;
            let normalized = (z / self.threshold).tanh();
            max_score = max_score.max(normalized);
        }

        max_score
    }

    fn train(&self, event: &Event) {
        let mut stats = self.metric_stats.lock().unwrap();
        for (name, &value) in &event.metrics {
            if !value.is_finite() {
                continue;
            }
            stats.entry(name.clone()).or_default().update(value);
        }
    }

    fn name(&self) -> &'static str {
        "z_score"
    }
}
