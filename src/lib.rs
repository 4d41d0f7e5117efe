//! LogMedic -- in-process structured event logging with built-in triage.
//!
//! Application code emits semantically typed events carrying entities,
//! metrics, and context. A background worker pool scores each event against
//! learned baselines, matches it against sequential and frequency patterns,
//! correlates it with recent events, and synthesizes deduplicated incidents
//! that can be forwarded to external trackers.
//!
//! ```no_run
//! use logmedic::{global, Config, Severity};
//!
//! global::init(Config {
//!     service_name: "payments".into(),
//!     enable_auto_incidents: true,
//!     ..Config::default()
//! });
//!
//! global::event("payment.fraud_detected")
//!     .severity(Severity::Warning)
//!     .entity("user", "u-1042")
//!     .metric("amount", 2499.0)
//!     .message("velocity check tripped")
//!     .emit();
//!
//! global::shutdown();
//! ```

pub mod clock;
pub mod config;
pub mod correlate;
pub mod detect;
pub mod event;
pub mod global;
pub mod incident;
pub mod logger;
pub mod pattern;
pub mod queue;

pub use config::Config;
pub use event::{Event, EventBuilder, Severity};
pub use incident::{Incident, IncidentSeverity, IncidentStatus};
pub use logger::{Logger, Stats};
