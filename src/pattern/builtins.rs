//! Stock pattern definitions registered on engine init.

use std::sync::Arc;

use chrono::Duration;

use crate::pattern::{
    FrequencyKind, FrequencyPattern, PatternMatcher, RegexPattern, RegexTarget, SequentialPattern,
    Step,
};

/// database.slow → api.timeout → user.error within tight windows.
pub fn cascading_failure() -> Arc<dyn PatternMatcher> {
    Arc::new(SequentialPattern::new(
        "cascading_failure",
        vec![
            Step::new("database.slow", Duration::seconds(10)),
            Step::new("api.timeout", Duration::seconds(5)),
            Step::new("user.error", Duration::seconds(3)),
        ],
    ))
}

/// Five auth.failed events from the same entity inside a minute.
pub fn auth_failure_burst() -> Arc<dyn PatternMatcher> {
    Arc::new(FrequencyPattern::new(
        "auth_failure_burst",
        "auth.failed",
        FrequencyKind::Repeated,
        5,
        Duration::seconds(60),
    ))
}

/// Ten api.retry events inside thirty seconds.
pub fn retry_storm() -> Arc<dyn PatternMatcher> {
    Arc::new(FrequencyPattern::new(
        "retry_storm",
        "api.retry",
        FrequencyKind::Burst,
        10,
        Duration::seconds(30),
    ))
}

/// Exception-looking text in the event message.
pub fn exception_detected() -> Arc<dyn PatternMatcher> {
    // The expression is static and known-good.
    Arc::new(
        RegexPattern::new(
            "exception_detected",
            r"Exception|Error|Traceback|at \w+\.\w+\(",
            RegexTarget::Message,
        )
        .expect("builtin exception pattern must compile"),
    )
}

/// Gradual memory exhaustion chain. Available but not registered by default.
pub fn memory_leak() -> Arc<dyn PatternMatcher> {
    Arc::new(SequentialPattern::new(
        "memory_leak",
        vec![
            Step::new("memory.high", Duration::minutes(5)),
            Step::new("gc.frequent", Duration::minutes(2)),
            Step::new("oom.warning", Duration::minutes(1)),
        ],
    ))
}
