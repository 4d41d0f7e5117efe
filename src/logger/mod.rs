//! Pipeline coordinator -- sampling, the worker pool, bounded history,
//! stats, callback fan-out, and the file/console sinks.
//!
//! Producers call [`Logger::emit`] from any thread; a fixed pool of workers
//! drains the bounded queue and runs each event through anomaly scoring,
//! pattern matching, correlation, and incident evaluation.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::{SharedClock, SystemClock};
use crate::config::Config;
use crate::correlate::CorrelationEngine;
use crate::detect::{self, Detector};
use crate::event::{Event, EventBuilder, Severity, DEFAULT_ANOMALY_THRESHOLD};
use crate::incident::{
    IncidentManager, IncidentManagerConfig, JiraIntegration, NullTransport,
    PagerDutyIntegration, SlackIntegration,
};
use crate::pattern::PatternEngine;
use crate::queue::EventQueue;

/// Bounded ring of recently processed events shared with the pattern and
/// correlation stages.
const MAX_HISTORY: usize = 1000;

/// Lifetime counters. All monotone over the life of the process.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Stats {
    pub events_total: u64,
    pub events_dropped: u64,
    pub anomalies_detected: u64,
    pub patterns_matched: u64,
    pub correlations_found: u64,
    pub incidents_created: u64,
}

pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// The coordinator. Construct with [`Logger::new`], emit events, then call
/// [`Logger::shutdown`] to drain and join the workers.
pub struct Logger {
    config: Config,
    clock: SharedClock,
    queue: Arc<EventQueue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
    detector: Option<Arc<dyn Detector>>,
    patterns: Option<Arc<PatternEngine>>,
    correlation: Option<Arc<CorrelationEngine>>,
    incidents: Option<Arc<IncidentManager>>,
    history: Mutex<VecDeque<Event>>,
    stats: Mutex<Stats>,
    event_callbacks: Mutex<Vec<EventCallback>>,
    anomaly_callbacks: Mutex<Vec<EventCallback>>,
    log_file: Option<Mutex<File>>,
}

impl Logger {
    /// Build a pipeline on the system clock and start its workers.
    pub fn new(config: Config) -> Arc<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a pipeline on an injected clock. Tests use this with
    /// [`crate::clock::ManualClock`] to drive windows deterministically.
    pub fn with_clock(config: Config, clock: SharedClock) -> Arc<Self> {
        let log_file = config.log_file_path.as_ref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(Mutex::new(file)),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to open log file");
                    None
                }
            }
        });

        let detector = config
            .enable_anomaly_detection
            .then(detect::default_detector);

        let patterns = config.enable_pattern_matching.then(|| {
            let engine = PatternEngine::new();
            engine.register_builtins();
            Arc::new(engine)
        });

        let correlation = config.enable_correlation.then(|| {
            let engine = CorrelationEngine::new(clock.clone());
            engine.register_builtin_relationships();
            Arc::new(engine)
        });

        let incidents = config.enable_auto_incidents.then(|| {
            let manager = IncidentManager::new(
                IncidentManagerConfig {
                    anomaly_threshold: config.incident_anomaly_threshold,
                    pattern_match_threshold: config.incident_pattern_threshold,
                    correlated_events_threshold: config.incident_correlation_threshold,
                    ..IncidentManagerConfig::default()
                },
                clock.clone(),
            );

            // Adapters forward through a pluggable transport; register a real
            // one via `incident_manager()` to actually ship incidents.
            let transport = Arc::new(NullTransport);
            if config.jira.enabled && !config.jira.url.is_empty() {
                manager.register_integration(Arc::new(JiraIntegration::new(
                    config.jira.clone(),
                    transport.clone(),
                )));
                info!(url = %config.jira.url, "Jira integration enabled");
            }
            if config.pagerduty.enabled && !config.pagerduty.integration_key.is_empty() {
                manager.register_integration(Arc::new(PagerDutyIntegration::new(
                    config.pagerduty.clone(),
                    transport.clone(),
                )));
                info!("PagerDuty integration enabled");
            }
            if config.slack.enabled && !config.slack.webhook_url.is_empty() {
                manager.register_integration(Arc::new(SlackIntegration::new(
                    config.slack.clone(),
                    transport,
                )));
                info!(channel = %config.slack.channel, "Slack integration enabled");
            }

            Arc::new(manager)
        });

        let worker_count = config.worker_threads;
        let logger = Arc::new(Self {
            queue: Arc::new(EventQueue::new(config.async_queue_size)),
            config,
            clock,
            workers: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
            detector,
            patterns,
            correlation,
            incidents,
            history: Mutex::new(VecDeque::new()),
            stats: Mutex::new(Stats::default()),
            event_callbacks: Mutex::new(Vec::new()),
            anomaly_callbacks: Mutex::new(Vec::new()),
            log_file,
        });

        let mut workers = logger.workers.lock().unwrap();
        for i in 0..worker_count {
            let queue = logger.queue.clone();
            let weak: Weak<Logger> = Arc::downgrade(&logger);
            let spawned = std::thread::Builder::new()
                .name(format!("logmedic-worker-{i}"))
                .spawn(move || {
                    while let Some(event) = queue.pop() {
                        let Some(logger) = weak.upgrade() else { break };
                        logger.process_event(event);
                    }
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => warn!(error = %err, "failed to spawn worker thread"),
            }
        }
        drop(workers);

        logger
    }

    /// Start building an event stamped with this pipeline's clock.
    pub fn event(self: &Arc<Self>, event_type: impl Into<String>) -> EventBuilder {
        let mut event = Event::new(event_type);
        event.timestamp = self.clock.now();
        if event.service_name.is_empty() {
            event.service_name = self.config.service_name.clone();
        }
        if event.service_instance.is_empty() {
            event.service_instance = self.config.service_instance.clone();
        }
        EventBuilder::bound(event, self.clone())
    }

    /// Sugar for a `metric.observed` event carrying the metric name in
    /// context.
    pub fn observe(self: &Arc<Self>, metric_name: &str) -> EventBuilder {
        self.event("metric.observed").context("metric_name", metric_name)
    }

    pub fn trace(self: &Arc<Self>, msg: impl Into<String>) {
        self.log_message(Severity::Trace, msg, false);
    }

    pub fn debug(self: &Arc<Self>, msg: impl Into<String>) {
        self.log_message(Severity::Debug, msg, false);
    }

    pub fn info(self: &Arc<Self>, msg: impl Into<String>) {
        self.log_message(Severity::Info, msg, false);
    }

    pub fn warn(self: &Arc<Self>, msg: impl Into<String>) {
        self.log_message(Severity::Warning, msg, false);
    }

    pub fn error(self: &Arc<Self>, msg: impl Into<String>) {
        self.log_message(Severity::Error, msg, false);
    }

    pub fn critical(self: &Arc<Self>, msg: impl Into<String>) {
        self.log_message(Severity::Critical, msg, true);
    }

    fn log_message(self: &Arc<Self>, severity: Severity, msg: impl Into<String>, stack: bool) {
        let mut builder = self.event("log.message").severity(severity).message(msg);
        if stack {
            builder = builder.capture_stack_trace();
        }
        builder.emit();
    }

    /// Sample, count, and enqueue. Never blocks the producer: a full queue
    /// drops the event and bumps `events_dropped`.
    pub fn emit(&self, event: Event) {
        if !self.should_sample(&event) {
            return;
        }

        self.stats.lock().unwrap().events_total += 1;

        if !self.queue.push(event) {
            self.stats.lock().unwrap().events_dropped += 1;
        }
    }

    fn should_sample(&self, event: &Event) -> bool {
        if self.config.sample_anomalies_always
            && (event.is_anomalous() || event.severity >= Severity::Error)
        {
            return true;
        }
        if self.config.sampling_rate >= 1.0 {
            return true;
        }
        rand::thread_rng().gen::<f64>() < self.config.sampling_rate
    }

    /// The per-event pipeline run by workers.
    fn process_event(&self, mut event: Event) {
        // 1. Anomaly scoring, then training, so first-of-its-kind outliers
        //    still score.
        if let Some(detector) = &self.detector {
            if !event.metrics.is_empty() {
                let score = detector.score(&event).clamp(0.0, 1.0);
                event.anomaly_score = score;
                detector.train(&event);

                if score >= DEFAULT_ANOMALY_THRESHOLD {
                    self.stats.lock().unwrap().anomalies_detected += 1;
                    let callbacks: Vec<EventCallback> =
                        self.anomaly_callbacks.lock().unwrap().clone();
                    for callback in callbacks {
                        if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                            warn!("anomaly callback panicked");
                        }
                    }
                }
            }
        }

        // Snapshot history once; the analytics stages must not run under the
        // history lock.
        let history: Vec<Event> = {
            let history = self.history.lock().unwrap();
            history.iter().cloned().collect()
        };

        // 2. Pattern matching plus training.
        let mut matched_patterns: Vec<String> = Vec::new();
        if let Some(engine) = &self.patterns {
            let matches = engine.match_event(&event, &history);
            if !matches.is_empty() {
                self.stats.lock().unwrap().patterns_matched += matches.len() as u64;
                matched_patterns = matches.into_iter().map(|m| m.name).collect();
            }
            engine.train_all(&event);
        }

        // 3. Correlation and causality learning.
        let mut correlations = Vec::new();
        if let Some(engine) = &self.correlation {
            correlations = engine.process(&event, &history);
            if !correlations.is_empty() {
                self.stats.lock().unwrap().correlations_found += correlations.len() as u64;
            }
        }

        // 4. Incident evaluation.
        if let Some(manager) = &self.incidents {
            if let Some(incident) =
                manager.evaluate_event(&event, &correlations, &matched_patterns)
            {
                self.stats.lock().unwrap().incidents_created += 1;
                event.incident_id = Some(incident.incident_id.clone());
                info!(
                    incident = %incident.incident_id,
                    severity = incident.severity.as_str(),
                    title = %incident.title,
                    "incident created"
                );
            }
        }

        // 5. Append to the bounded history ring.
        {
            let mut history = self.history.lock().unwrap();
            history.push_back(event.clone());
            if history.len() > MAX_HISTORY {
                history.pop_front();
            }
        }

        // 6. Event callback fan-out, each isolated.
        let callbacks: Vec<EventCallback> = self.event_callbacks.lock().unwrap().clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!("event callback panicked");
            }
        }

        // 7. Sinks.
        if let Some(file) = &self.log_file {
            let mut line = String::new();
            if let Some(first) = matched_patterns.first() {
                line.push_str(&format!("[PATTERN:{first}] "));
            }
            line.push_str(&event.to_line());

            let mut file = file.lock().unwrap();
            if let Err(err) = writeln!(file, "{line}") {
                warn!(error = %err, "failed to write event log");
            }
        }

        if self.config.log_to_console {
            let prefix = matched_patterns
                .first()
                .map(|p| format!("🔍 PATTERN: {p} - "))
                .unwrap_or_default();
            if event.is_anomalous() {
                println!("{prefix}🔴 {}", event.to_line());
            } else if event.severity >= Severity::Warning {
                println!("{prefix}🟡 {}", event.to_line());
            } else if !prefix.is_empty() {
                println!("{prefix}{}", event.to_line());
            }
        }
    }

    /// Stop accepting events, drain the queue, and join the workers.
    /// Calling this twice is a no-op the second time.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.queue.shutdown();

        let workers: Vec<JoinHandle<()>> = self.workers.lock().unwrap().drain(..).collect();
        for worker in workers {
            let _ = worker.join();
        }

        if let Some(file) = &self.log_file {
            let _ = file.lock().unwrap().flush();
        }

        let stats = self.stats();
        info!(
            events = stats.events_total,
            anomalies = stats.anomalies_detected,
            dropped = stats.events_dropped,
            "shutdown complete"
        );
    }

    pub fn on_event(&self, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.event_callbacks.lock().unwrap().push(Arc::new(callback));
    }

    /// Fires for events scoring at or above the anomaly alert threshold.
    pub fn on_anomaly(&self, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.anomaly_callbacks.lock().unwrap().push(Arc::new(callback));
    }

    pub fn stats(&self) -> Stats {
        *self.stats.lock().unwrap()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn pattern_engine(&self) -> Option<&Arc<PatternEngine>> {
        self.patterns.as_ref()
    }

    pub fn correlation_engine(&self) -> Option<&Arc<CorrelationEngine>> {
        self.correlation.as_ref()
    }

    pub fn incident_manager(&self) -> Option<&Arc<IncidentManager>> {
        self.incidents.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Releases workers blocked in pop if shutdown() was never called;
        // they hold only weak references and exit on their own.
        self.queue.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn quiet_config() -> Config {
        Config {
            log_to_console: false,
            ..Config::default()
        }
    }

    #[test]
    fn emit_counts_and_processes() {
        let logger = Logger::new(quiet_config());
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        logger.on_event(move |_| {
            seen_clone.fetch_add(1, Ordering::Relaxed);
        });

        for i in 0..10 {
            logger.event(format!("unit.test.{i}")).emit();
        }
        logger.shutdown();

        let stats = logger.stats();
        assert_eq!(stats.events_total, 10);
        assert_eq!(stats.events_dropped, 0);
        assert_eq!(seen.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn shutdown_twice_is_idempotent() {
        let logger = Logger::new(quiet_config());
        logger.event("once").emit();
        logger.shutdown();
        let stats_after_first = logger.stats();
        logger.shutdown();
        let stats_after_second = logger.stats();
        assert_eq!(stats_after_first.events_total, stats_after_second.events_total);
        assert_eq!(
            stats_after_first.events_dropped,
            stats_after_second.events_dropped
        );
    }

    #[test]
    fn emit_after_shutdown_is_counted_as_dropped() {
        let logger = Logger::new(quiet_config());
        logger.shutdown();
        logger.event("late").emit();
        let stats = logger.stats();
        assert_eq!(stats.events_total, 1);
        assert_eq!(stats.events_dropped, 1);
    }

    #[test]
    fn sampling_rate_zero_keeps_only_errors() {
        let config = Config {
            sampling_rate: 0.0,
            sample_anomalies_always: true,
            log_to_console: false,
            ..Config::default()
        };
        let logger = Logger::new(config);

        for _ in 0..20 {
            logger.event("chatty.info").emit();
        }
        logger.event("serious").severity(Severity::Error).emit();
        logger.shutdown();

        assert_eq!(logger.stats().events_total, 1);
    }

    #[test]
    fn service_identity_is_stamped_from_config() {
        let config = Config {
            service_name: "payments".to_string(),
            service_instance: "pay-3".to_string(),
            log_to_console: false,
            ..Config::default()
        };
        let logger = Logger::new(config);
        let event = logger.event("any").build();
        assert_eq!(event.service_name, "payments");
        assert_eq!(event.service_instance, "pay-3");
        logger.shutdown();
    }

    #[test]
    fn failing_event_callback_does_not_block_others() {
        let logger = Logger::new(quiet_config());
        let seen = Arc::new(AtomicUsize::new(0));

        logger.on_event(|_| panic!("bad listener"));
        let seen_clone = seen.clone();
        logger.on_event(move |_| {
            seen_clone.fetch_add(1, Ordering::Relaxed);
        });

        logger.event("resilient").emit();
        logger.shutdown();
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }
}
