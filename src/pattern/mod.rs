//! Multi-event pattern detection over the recent-history window.
//!
//! Matchers score the incoming event against recent history; the engine
//! reports matches scoring above 0.5, strongest first, then trains every
//! matcher with the event.

pub mod builtins;
pub mod frequency;
pub mod regex;
pub mod sequential;

pub use frequency::{FrequencyKind, FrequencyPattern};
pub use self::regex::{RegexPattern, RegexTarget};
pub use sequential::{SequentialPattern, Step};

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::event::Event;

/// Matches below this are not reported.
const MATCH_FLOOR: f64 = 0.5;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern expression: {0}")]
    InvalidExpression(#[from] ::regex::Error),
}

/// A declarative matcher over the newest event plus recent history.
pub trait PatternMatcher: Send + Sync {
    /// Match score, 0.0 (no match) to 1.0 (full match).
    fn matches(&self, event: &Event, history: &[Event]) -> f64;

    /// Learn from an observed event.
    fn train(&self, event: &Event);

    fn name(&self) -> &str;

    /// Human-readable description of what this pattern detects.
    fn description(&self) -> String;
}

/// One reported pattern match.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub name: String,
    pub score: f64,
    pub description: String,
}

/// Registry of pattern matchers.
#[derive(Default)]
pub struct PatternEngine {
    patterns: Mutex<Vec<Arc<dyn PatternMatcher>>>,
}

impl PatternEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pattern: Arc<dyn PatternMatcher>) {
        self.patterns.lock().unwrap().push(pattern);
    }

    /// Register the stock patterns: cascading failure, auth failure burst,
    /// retry storm, and exception detection.
    pub fn register_builtins(&self) {
        self.register(builtins::cascading_failure());
        self.register(builtins::auth_failure_burst());
        self.register(builtins::retry_storm());
        self.register(builtins::exception_detected());
    }

    /// Score the event against every registered pattern. Only significant
    /// matches are returned, sorted by descending score.
    pub fn match_event(&self, event: &Event, history: &[Event]) -> Vec<PatternMatch> {
        let patterns = self.patterns.lock().unwrap();
        let mut matches: Vec<PatternMatch> = patterns
            .iter()
            .filter_map(|p| {
                let score = p.matches(event, history);
                (score > MATCH_FLOOR).then(|| PatternMatch {
                    name: p.name().to_string(),
                    score,
                    description: p.description(),
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches
    }

    /// Feed the event to every registered pattern.
    pub fn train_all(&self, event: &Event) {
        let patterns = self.patterns.lock().unwrap();
        for pattern in patterns.iter() {
            pattern.train(event);
        }
    }

    pub fn patterns(&self) -> Vec<Arc<dyn PatternMatcher>> {
        self.patterns.lock().unwrap().clone()
    }
}
