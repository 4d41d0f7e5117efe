//! Regex patterns -- match an expression against a single event field.

use regex::Regex;

use crate::event::Event;
use crate::pattern::{PatternError, PatternMatcher};

/// Which field the expression is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexTarget {
    Message,
    EventType,
    /// A named entity value.
    Entity(String),
}

/// Single-event matcher on message, event type, or one entity.
pub struct RegexPattern {
    name: String,
    expression: Regex,
    target: RegexTarget,
}

impl RegexPattern {
    pub fn new(
        name: impl Into<String>,
        expression: &str,
        target: RegexTarget,
    ) -> Result<Self, PatternError> {
        Ok(Self {
            name: name.into(),
            expression: Regex::new(expression)?,
            target,
        })
    }
}

impl PatternMatcher for RegexPattern {
    fn matches(&self, event: &Event, _history: &[Event]) -> f64 {
        let value = match &self.target {
            RegexTarget::Message => event.message.as_str(),
            RegexTarget::EventType => event.event_type.as_str(),
            RegexTarget::Entity(key) => match event.entities.get(key) {
                Some(v) => v.as_str(),
                None => return 0.0,
            },
        };
        if self.expression.is_match(value) {
            1.0
        } else {
            0.0
        }
    }

    fn train(&self, _event: &Event) {}

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        let field = match &self.target {
            RegexTarget::Message => "message".to_string(),
            RegexTarget::EventType => "event_type".to_string(),
            RegexTarget::Entity(key) => format!("entity '{key}'"),
        };
        format!("Regex pattern: {} in {}", self.expression.as_str(), field)
    }
}
