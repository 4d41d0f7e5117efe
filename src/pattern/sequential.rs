//! Sequential patterns -- ordered step chains within per-step time windows,
//! e.g. database.slow → api.timeout → user.error.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Duration;
use regex::Regex;

use crate::event::Event;
use crate::pattern::{PatternError, PatternMatcher};

/// One step in a sequence. `max_time_since_prev` bounds how far before the
/// succeeding step's event this step may have occurred.
pub struct Step {
    pub event_type: String,
    pub required_entities: Vec<String>,
    pub entity_matcher: Option<Regex>,
    pub max_time_since_prev: Duration,
}

impl Step {
    pub fn new(event_type: impl Into<String>, max_time_since_prev: Duration) -> Self {
        Self {
            event_type: event_type.into(),
            required_entities: Vec::new(),
            entity_matcher: None,
            max_time_since_prev,
        }
    }

    /// Require an entity key to be present on the matching event.
    pub fn require_entity(mut self, key: impl Into<String>) -> Self {
        self.required_entities.push(key.into());
        self
    }

    /// Require some entity value to match the given expression.
    pub fn entity_matcher(mut self, expression: &str) -> Result<Self, PatternError> {
        self.entity_matcher = Some(Regex::new(expression)?);
        Ok(self)
    }

    fn matches(&self, event: &Event) -> bool {
        if event.event_type != self.event_type {
            return false;
        }
        for required in &self.required_entities {
            if !event.entities.contains_key(required) {
                return false;
            }
        }
        if let Some(matcher) = &self.entity_matcher {
            if !event.entities.values().any(|v| matcher.is_match(v)) {
                return false;
            }
        }
        true
    }
}

/// Ordered multi-step pattern. The incoming event must match the final
/// step; earlier steps are searched backwards through history.
pub struct SequentialPattern {
    name: String,
    steps: Vec<Step>,
    match_count: AtomicU64,
}

impl SequentialPattern {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            match_count: AtomicU64::new(0),
        }
    }

    pub fn match_count(&self) -> u64 {
        self.match_count.load(Ordering::Relaxed)
    }
}

impl PatternMatcher for SequentialPattern {
    fn matches(&self, event: &Event, history: &[Event]) -> f64 {
        let Some(last_step) = self.steps.last() else {
            return 0.0;
        };
        if !last_step.matches(event) {
            return 0.0;
        }
        if self.steps.len() == 1 {
            self.match_count.fetch_add(1, Ordering::Relaxed);
            return 1.0;
        }

        let mut current_step = self.steps.len() - 1;
        let mut current_time = event.timestamp;

        for prev in history.iter().rev() {
            let sought = &self.steps[current_step - 1];

            let gap = current_time - prev.timestamp;
            if gap > sought.max_time_since_prev {
                // Too old relative to the step that succeeded it.
                break;
            }

            if sought.matches(prev) {
                current_step -= 1;
                current_time = prev.timestamp;
                if current_step == 0 {
                    self.match_count.fetch_add(1, Ordering::Relaxed);
                    return 1.0;
                }
            }
        }

        // Partial credit for an incomplete chain.
        let progress = 1.0 - current_step as f64 / self.steps.len() as f64;
        progress * 0.5
    }

    fn train(&self, _event: &Event) {
        // Sequential patterns are stateless; history carries the context.
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        let chain: Vec<&str> = self.steps.iter().map(|s| s.event_type.as_str()).collect();
        format!(
            "Sequential pattern: {} (matched {} times)",
            chain.join(" -> "),
            self.match_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event_at(ty: &str, offset_secs: i64, base: chrono::DateTime<Utc>) -> Event {
        let mut event = Event::new(ty);
        event.timestamp = base + Duration::seconds(offset_secs);
        event
    }

    fn cascade() -> SequentialPattern {
        SequentialPattern::new(
            "cascading_failure",
            vec![
                Step::new("database.slow", Duration::seconds(10)),
                Step::new("api.timeout", Duration::seconds(5)),
                Step::new("user.error", Duration::seconds(3)),
            ],
        )
    }

    #[test]
    fn full_chain_in_window_scores_one() {
        let base = Utc::now();
        let pattern = cascade();
        let history = vec![
            event_at("database.slow", 0, base),
            event_at("api.timeout", 2, base),
        ];
        let candidate = event_at("user.error", 4, base);
        assert_eq!(pattern.matches(&candidate, &history), 1.0);
        assert_eq!(pattern.match_count(), 1);
    }

    #[test]
    fn wrong_final_event_scores_zero() {
        let base = Utc::now();
        let pattern = cascade();
        let history = vec![
            event_at("database.slow", 0, base),
            event_at("api.timeout", 2, base),
        ];
        let candidate = event_at("cache.miss", 4, base);
        assert_eq!(pattern.matches(&candidate, &history), 0.0);
    }

    #[test]
    fn unrelated_history_gives_partial_credit_below_floor() {
        let base = Utc::now();
        let pattern = cascade();
        let history = vec![
            event_at("cache.miss", 2, base),
            event_at("user.login", 3, base),
        ];
        let candidate = event_at("user.error", 4, base);
        let score = pattern.matches(&candidate, &history);
        assert!(score < 0.5, "score was {score}");
    }

    #[test]
    fn step_window_breaks_the_chain() {
        let base = Utc::now();
        let pattern = cascade();
        // api.timeout happened 8s before user.error, beyond its 3s window...
        let history = vec![
            event_at("database.slow", 0, base),
            event_at("api.timeout", 2, base),
        ];
        let candidate = event_at("user.error", 10, base);
        let score = pattern.matches(&candidate, &history);
        assert!(score < 1.0);
    }

    #[test]
    fn single_step_pattern_always_full_match() {
        let pattern = SequentialPattern::new(
            "deploy_seen",
            vec![Step::new("deploy.started", Duration::seconds(60))],
        );
        assert_eq!(pattern.matches(&Event::new("deploy.started"), &[]), 1.0);
    }

    #[test]
    fn required_entity_gates_the_step() {
        let base = Utc::now();
        let pattern = SequentialPattern::new(
            "user_error",
            vec![Step::new("user.error", Duration::seconds(5)).require_entity("user")],
        );
        let plain = event_at("user.error", 0, base);
        assert_eq!(pattern.matches(&plain, &[]), 0.0);

        let mut with_entity = event_at("user.error", 0, base);
        with_entity.entities.insert("user".into(), "u1".into());
        assert_eq!(pattern.matches(&with_entity, &[]), 1.0);
    }

    #[test]
    fn entity_matcher_filters_on_value() -> Result<(), PatternError> {
        let pattern = SequentialPattern::new(
            "admin_error",
            vec![Step::new("user.error", Duration::seconds(5)).entity_matcher("^admin-")?],
        );
        let mut admin = Event::new("user.error");
        admin.entities.insert("user".into(), "admin-7".into());
        assert_eq!(pattern.matches(&admin, &[]), 1.0);

        let mut regular = Event::new("user.error");
        regular.entities.insert("user".into(), "u-7".into());
        assert_eq!(pattern.matches(&regular, &[]), 0.0);
        Ok(())
    }
}
