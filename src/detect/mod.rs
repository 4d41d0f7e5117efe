//! Online anomaly detection over event metrics.
//!
//! Detectors score first and train second, so a truly novel first
//! observation can still be flagged. Each detector guards its own state;
//! scores are always in `[0, 1]`.

pub mod ensemble;
pub mod moving_average;
pub mod rate;
pub mod zscore;

pub use ensemble::{CombineMethod, EnsembleDetector};
pub use moving_average::MovingAverageDetector;
pub use rate::RateDetector;
pub use zscore::ZScoreDetector;

use std::sync::Arc;

use chrono::Duration;

use crate::event::Event;

/// An online anomaly detection algorithm.
pub trait Detector: Send + Sync {
    /// Anomaly score for the event, 0.0 (normal) to 1.0 (highly anomalous).
    fn score(&self, event: &Event) -> f64;

    /// Fold the event into the learned baseline.
    fn train(&self, event: &Event);

    fn name(&self) -> &'static str;
}

/// The default stack: Z-score (threshold 3.0), moving average (window 100),
/// and event-rate (60 s window) detectors combined by maximum score.
pub fn default_detector() -> Arc<dyn Detector> {
    let mut ensemble = EnsembleDetector::new(CombineMethod::Max);
    ensemble.add_detector(Arc::new(ZScoreDetector::new(3.0)), 1.0);
    ensemble.add_detector(Arc::new(MovingAverageDetector::new(100)), 1.0);
    ensemble.add_detector(Arc::new(RateDetector::new(Duration::seconds(60))), 0.8);
    Arc::new(ensemble)
}
