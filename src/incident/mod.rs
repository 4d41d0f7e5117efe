//! Incident synthesis -- turns anomalous, pattern-matching, or heavily
//! correlated events into deduplicated incident records and dispatches them
//! to registered trackers.

pub mod integration;

pub use integration::{
    Integration, JiraIntegration, NullTransport, PagerDutyIntegration, SlackIntegration,
    Transport, TransportError, TransportResponse,
};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

use crate::clock::SharedClock;
use crate::correlate::Correlation;
use crate::event::Event;

/// Incident severity, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "LOW",
            IncidentSeverity::Medium => "MEDIUM",
            IncidentSeverity::High => "HIGH",
            IncidentSeverity::Critical => "CRITICAL",
        }
    }
}

/// Incident lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Identified,
    Monitoring,
    Resolved,
    Closed,
}

impl IncidentStatus {
    /// Terminal statuses take no further lifecycle transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Closed)
    }
}

/// A synthesized problem record.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub incident_id: String,
    pub title: String,
    pub description: String,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub event_ids: Vec<u64>,
    pub root_cause: Option<String>,
    pub root_cause_event_id: Option<u64>,
    pub anomaly_score: f64,
    pub affected_services_count: usize,
    pub affected_users_count: usize,
    pub labels: BTreeMap<String, String>,
    pub tags: Vec<String>,
    /// External tracker ids keyed by integration name.
    pub external_ids: BTreeMap<String, String>,
}

impl Incident {
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} (ID: {}, Score: {})",
            self.severity.as_str(),
            self.title,
            self.incident_id,
            self.anomaly_score
        )
    }
}

/// Thresholds and windows governing incident creation.
#[derive(Debug, Clone)]
pub struct IncidentManagerConfig {
    /// Minimum anomaly score to create an incident.
    pub anomaly_threshold: f64,
    /// Minimum pattern matches to create an incident.
    pub pattern_match_threshold: usize,
    /// Minimum correlations to create an incident.
    pub correlated_events_threshold: usize,

    pub enable_auto_resolution: bool,
    pub resolution_timeout: Duration,

    pub enable_deduplication: bool,
    pub deduplication_window: Duration,

    pub critical_threshold: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
}

impl Default for IncidentManagerConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: 0.75,
            pattern_match_threshold: 1,
            correlated_events_threshold: 3,
            enable_auto_resolution: true,
            resolution_timeout: Duration::minutes(15),
            enable_deduplication: true,
            deduplication_window: Duration::minutes(5),
            critical_threshold: 0.95,
            high_threshold: 0.85,
            medium_threshold: 0.75,
        }
    }
}

/// Manager-level counters, monotone except `currently_open`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IncidentStats {
    pub total_created: u64,
    pub currently_open: u64,
    pub resolved: u64,
    pub deduplicated: u64,
}

pub type IncidentCallback = Arc<dyn Fn(&Incident) + Send + Sync>;

#[derive(Default)]
struct ManagerState {
    incidents: HashMap<String, Incident>,
    stats: IncidentStats,
}

/// Creates, deduplicates, and resolves incidents; forwards them to
/// registered integrations. Integration and callback invocations happen
/// outside the manager lock.
pub struct IncidentManager {
    config: IncidentManagerConfig,
    clock: SharedClock,
    next_incident_id: AtomicU64,
    state: Mutex<ManagerState>,
    on_created: Mutex<Vec<IncidentCallback>>,
    on_resolved: Mutex<Vec<IncidentCallback>>,
    integrations: Mutex<Vec<Arc<dyn Integration>>>,
}

impl IncidentManager {
    pub fn new(config: IncidentManagerConfig, clock: SharedClock) -> Self {
        Self {
            config,
            clock,
            next_incident_id: AtomicU64::new(1),
            state: Mutex::new(ManagerState::default()),
            on_created: Mutex::new(Vec::new()),
            on_resolved: Mutex::new(Vec::new()),
            integrations: Mutex::new(Vec::new()),
        }
    }

    /// Decide whether the event warrants an incident; if so, synthesize and
    /// commit one. Returns `None` when below every threshold or suppressed
    /// as a duplicate.
    pub fn evaluate_event(
        &self,
        event: &Event,
        correlations: &[Correlation],
        matched_patterns: &[String],
    ) -> Option<Incident> {
        let should_create = event.anomaly_score >= self.config.anomaly_threshold
            || matched_patterns.len() >= self.config.pattern_match_threshold
            || correlations.len() >= self.config.correlated_events_threshold;
        if !should_create {
            return None;
        }

        let severity = self.classify_severity(
            event.anomaly_score,
            matched_patterns.len(),
            correlations.len(),
        );

        let title = if let Some(first) = matched_patterns.first() {
            format!("Pattern detected: {first}")
        } else {
            format!("Anomaly in {}", event.event_type)
        };

        let description = build_description(event, correlations, matched_patterns);

        let mut event_ids = vec![event.event_id];
        let mut seen: HashSet<u64> = event_ids.iter().copied().collect();
        for corr in correlations {
            for &id in &corr.event_ids {
                if seen.insert(id) {
                    event_ids.push(id);
                }
            }
        }

        let mut labels = BTreeMap::new();
        labels.insert("severity".to_string(), severity.as_str().to_string());
        labels.insert("event_type".to_string(), event.event_type.clone());
        if !event.service_name.is_empty() {
            labels.insert("service".to_string(), event.service_name.clone());
        }

        let mut tags = Vec::new();
        if event.anomaly_score >= 0.9 {
            tags.push("critical-anomaly".to_string());
        }
        for pattern in matched_patterns {
            tags.push(format!("pattern:{pattern}"));
        }

        let incident = Incident {
            incident_id: self.generate_incident_id(),
            title,
            description,
            severity,
            status: IncidentStatus::Open,
            created_at: self.clock.now(),
            resolved_at: None,
            event_ids,
            root_cause: None,
            root_cause_event_id: None,
            anomaly_score: event.anomaly_score,
            affected_services_count: usize::from(!event.service_name.is_empty()),
            affected_users_count: 0,
            labels,
            tags,
            external_ids: BTreeMap::new(),
        };

        {
            let mut state = self.state.lock().unwrap();
            if self.config.enable_deduplication {
                if let Some(existing) = find_duplicate(&state.incidents, &incident, self.config.deduplication_window) {
                    warn!(incident = %existing, title = %incident.title, "suppressing duplicate incident");
                    state.stats.deduplicated += 1;
                    return None;
                }
            }
        }

        Some(self.commit(incident))
    }

    /// Create an incident directly, bypassing thresholds and deduplication.
    pub fn create_incident(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: IncidentSeverity,
        event_ids: Vec<u64>,
    ) -> Incident {
        let mut labels = BTreeMap::new();
        labels.insert("severity".to_string(), severity.as_str().to_string());

        let incident = Incident {
            incident_id: self.generate_incident_id(),
            title: title.into(),
            description: description.into(),
            severity,
            status: IncidentStatus::Open,
            created_at: self.clock.now(),
            resolved_at: None,
            event_ids,
            root_cause: None,
            root_cause_event_id: None,
            anomaly_score: 0.0,
            affected_services_count: 0,
            affected_users_count: 0,
            labels,
            tags: Vec::new(),
            external_ids: BTreeMap::new(),
        };

        self.commit(incident)
    }

    /// Store the incident, notify integrations, then fire creation
    /// callbacks. Each integration and callback is isolated from the rest.
    fn commit(&self, mut incident: Incident) -> Incident {
        {
            let mut state = self.state.lock().unwrap();
            state
                .incidents
                .insert(incident.incident_id.clone(), incident.clone());
            state.stats.total_created += 1;
            state.stats.currently_open += 1;
        }

        let integrations: Vec<Arc<dyn Integration>> =
            self.integrations.lock().unwrap().clone();
        for integration in integrations {
            let name = integration.name().to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                integration.create_incident(&incident)
            }));
            match outcome {
                Ok(external_id) => {
                    incident.external_ids.insert(name, external_id);
                }
                Err(_) => warn!(integration = %name, "integration panicked on create"),
            }
        }

        if !incident.external_ids.is_empty() {
            let mut state = self.state.lock().unwrap();
            if let Some(stored) = state.incidents.get_mut(&incident.incident_id) {
                stored.external_ids = incident.external_ids.clone();
            }
        }

        let callbacks: Vec<IncidentCallback> = self.on_created.lock().unwrap().clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&incident))).is_err() {
                warn!("incident-created callback panicked");
            }
        }

        incident
    }

    /// Move the incident to a new status, maintaining the `resolved_at`
    /// invariant. Unknown ids are ignored.
    pub fn update_status(&self, incident_id: &str, new_status: IncidentStatus) {
        let mut state = self.state.lock().unwrap();
        let now = self.clock.now();
        if let Some(incident) = state.incidents.get_mut(incident_id) {
            incident.status = new_status;
            match new_status {
                IncidentStatus::Resolved => {
                    incident.resolved_at.get_or_insert(now);
                }
                _ => incident.resolved_at = None,
            }
        }
    }

    /// Resolve the incident, notify integrations, fire resolution
    /// callbacks. Unknown ids are a silent no-op.
    pub fn resolve_incident(&self, incident_id: &str, resolution: &str) {
        let resolved = {
            let mut state = self.state.lock().unwrap();
            let now = self.clock.now();
            let Some(incident) = state.incidents.get_mut(incident_id) else {
                return;
            };
            if incident.status == IncidentStatus::Resolved {
                return;
            }
            incident.status = IncidentStatus::Resolved;
            incident.resolved_at = Some(now);
            incident.root_cause = Some(resolution.to_string());

            state.stats.currently_open = state.stats.currently_open.saturating_sub(1);
            state.stats.resolved += 1;
            state.incidents.get(incident_id).cloned()
        };

        let Some(incident) = resolved else { return };

        let integrations: Vec<Arc<dyn Integration>> =
            self.integrations.lock().unwrap().clone();
        for integration in integrations {
            if let Some(external_id) = incident.external_ids.get(integration.name()) {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    integration.resolve_incident(external_id, resolution)
                }));
                if outcome.is_err() {
                    warn!(integration = integration.name(), "integration panicked on resolve");
                }
            }
        }

        let callbacks: Vec<IncidentCallback> = self.on_resolved.lock().unwrap().clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&incident))).is_err() {
                warn!("incident-resolved callback panicked");
            }
        }
    }

    /// Resolve every non-terminal incident older than the resolution
    /// timeout.
    pub fn auto_resolve_stale_incidents(&self) {
        if !self.config.enable_auto_resolution {
            return;
        }

        let mut state = self.state.lock().unwrap();
        let now = self.clock.now();
        let cutoff = now - self.config.resolution_timeout;

        let mut resolved = 0u64;
        for incident in state.incidents.values_mut() {
            if !incident.status.is_terminal() && incident.created_at < cutoff {
                incident.status = IncidentStatus::Resolved;
                incident.resolved_at = Some(now);
                incident.root_cause = Some("Auto-resolved: no further activity".to_string());
                resolved += 1;
            }
        }
        state.stats.currently_open = state.stats.currently_open.saturating_sub(resolved);
        state.stats.resolved += resolved;
    }

    pub fn get_incident(&self, incident_id: &str) -> Option<Incident> {
        self.state.lock().unwrap().incidents.get(incident_id).cloned()
    }

    pub fn open_incidents(&self) -> Vec<Incident> {
        self.state
            .lock()
            .unwrap()
            .incidents
            .values()
            .filter(|i| {
                matches!(
                    i.status,
                    IncidentStatus::Open | IncidentStatus::Investigating
                )
            })
            .cloned()
            .collect()
    }

    pub fn all_incidents(&self) -> Vec<Incident> {
        self.state.lock().unwrap().incidents.values().cloned().collect()
    }

    pub fn stats(&self) -> IncidentStats {
        self.state.lock().unwrap().stats
    }

    pub fn register_integration(&self, integration: Arc<dyn Integration>) {
        self.integrations.lock().unwrap().push(integration);
    }

    pub fn on_incident_created(&self, callback: impl Fn(&Incident) + Send + Sync + 'static) {
        self.on_created.lock().unwrap().push(Arc::new(callback));
    }

    pub fn on_incident_resolved(&self, callback: impl Fn(&Incident) + Send + Sync + 'static) {
        self.on_resolved.lock().unwrap().push(Arc::new(callback));
    }

    fn classify_severity(
        &self,
        anomaly_score: f64,
        pattern_matches: usize,
        correlated_events: usize,
    ) -> IncidentSeverity {
        if anomaly_score >= self.config.critical_threshold {
            IncidentSeverity::Critical
        } else if anomaly_score >= self.config.high_threshold || pattern_matches >= 2 {
            IncidentSeverity::High
        } else if anomaly_score >= self.config.medium_threshold || correlated_events >= 5 {
            IncidentSeverity::Medium
        } else {
            IncidentSeverity::Low
        }
    }

    fn generate_incident_id(&self) -> String {
        let id = self.next_incident_id.fetch_add(1, Ordering::Relaxed);
        format!("INC-{id:06}")
    }
}

fn build_description(
    event: &Event,
    correlations: &[Correlation],
    matched_patterns: &[String],
) -> String {
    let mut desc = String::new();
    let _ = writeln!(desc, "Incident created from event: {}", event.event_type);
    let _ = writeln!(desc, "Anomaly score: {}", event.anomaly_score);

    if !matched_patterns.is_empty() {
        let _ = writeln!(desc, "\nMatched patterns:");
        for pattern in matched_patterns {
            let _ = writeln!(desc, "  - {pattern}");
        }
    }

    if !correlations.is_empty() {
        let _ = writeln!(desc, "\nCorrelated events: {}", correlations.len());
        for corr in correlations {
            let _ = writeln!(desc, "  - {} (confidence: {})", corr.reason, corr.confidence);
        }
    }

    if !event.message.is_empty() {
        let _ = writeln!(desc, "\nMessage: {}", event.message);
    }

    if !event.entities.is_empty() {
        let _ = writeln!(desc, "\nEntities:");
        for (key, value) in &event.entities {
            let _ = writeln!(desc, "  {key}: {value}");
        }
    }

    if !event.metrics.is_empty() {
        let _ = writeln!(desc, "\nMetrics:");
        for (key, value) in &event.metrics {
            let _ = writeln!(desc, "  {key}: {value}");
        }
    }

    desc
}

fn find_duplicate(
    incidents: &HashMap<String, Incident>,
    candidate: &Incident,
    window: Duration,
) -> Option<String> {
    let cutoff = candidate.created_at - window;

    for (id, existing) in incidents {
        if existing.created_at < cutoff || existing.status.is_terminal() {
            continue;
        }

        if existing.title == candidate.title && existing.severity == candidate.severity {
            return Some(id.clone());
        }

        let existing_ids: HashSet<u64> = existing.event_ids.iter().copied().collect();
        let overlap = candidate
            .event_ids
            .iter()
            .filter(|id| existing_ids.contains(id))
            .count();
        if overlap > candidate.event_ids.len() / 2 {
            return Some(id.clone());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    fn manager_with_clock() -> (Arc<ManualClock>, IncidentManager) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = IncidentManager::new(IncidentManagerConfig::default(), clock.clone());
        (clock, manager)
    }

    fn scored_event(ty: &str, score: f64) -> Event {
        let mut event = Event::new(ty);
        event.anomaly_score = score;
        event
    }

    #[test]
    fn below_all_thresholds_creates_nothing() {
        let (_, manager) = manager_with_clock();
        assert!(manager
            .evaluate_event(&scored_event("calm.event", 0.1), &[], &[])
            .is_none());
        assert_eq!(manager.stats().total_created, 0);
    }

    #[test]
    fn anomaly_threshold_creates_incident() {
        let (_, manager) = manager_with_clock();
        let incident = manager
            .evaluate_event(&scored_event("payment.fail", 0.8), &[], &[])
            .expect("incident");
        assert_eq!(incident.incident_id, "INC-000001");
        assert_eq!(incident.title, "Anomaly in payment.fail");
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(manager.stats().total_created, 1);
        assert_eq!(manager.stats().currently_open, 1);
    }

    #[test]
    fn pattern_match_creates_incident_with_pattern_title() {
        let (_, manager) = manager_with_clock();
        let incident = manager
            .evaluate_event(
                &scored_event("user.error", 0.0),
                &[],
                &["cascading_failure".to_string()],
            )
            .expect("incident");
        assert_eq!(incident.title, "Pattern detected: cascading_failure");
        assert!(incident.tags.contains(&"pattern:cascading_failure".to_string()));
        assert!(incident
            .description
            .contains("Matched patterns:\n  - cascading_failure"));
    }

    #[test]
    fn severity_bands_follow_score() {
        let (_, manager) = manager_with_clock();
        let classify = |score| manager.classify_severity(score, 0, 0);
        assert_eq!(classify(0.5), IncidentSeverity::Low);
        assert_eq!(classify(0.75), IncidentSeverity::Medium);
        assert_eq!(classify(0.85), IncidentSeverity::High);
        assert_eq!(classify(0.95), IncidentSeverity::Critical);
    }

    #[test]
    fn two_patterns_or_many_correlations_raise_severity() {
        let (_, manager) = manager_with_clock();
        assert_eq!(manager.classify_severity(0.0, 2, 0), IncidentSeverity::High);
        assert_eq!(manager.classify_severity(0.0, 0, 5), IncidentSeverity::Medium);
        assert_eq!(manager.classify_severity(0.0, 1, 4), IncidentSeverity::Low);
    }

    #[test]
    fn duplicate_title_within_window_is_suppressed() {
        let (_, manager) = manager_with_clock();
        // Scores land in the same severity band, so titles and severities match.
        assert!(manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .is_some());
        assert!(manager
            .evaluate_event(&scored_event("db.down", 0.97), &[], &[])
            .is_none());

        let stats = manager.stats();
        assert_eq!(stats.total_created, 1);
        assert_eq!(stats.deduplicated, 1);
    }

    #[test]
    fn dedup_window_expires() {
        let (clock, manager) = manager_with_clock();
        assert!(manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .is_some());

        clock.advance(Duration::minutes(6));
        assert!(manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .is_some());
        assert_eq!(manager.stats().total_created, 2);
    }

    #[test]
    fn resolved_incidents_do_not_block_new_ones() {
        let (_, manager) = manager_with_clock();
        let incident = manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .unwrap();
        manager.resolve_incident(&incident.incident_id, "failover completed");

        assert!(manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .is_some());
    }

    #[test]
    fn resolve_sets_fields_and_stats() {
        let (_, manager) = manager_with_clock();
        let incident = manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .unwrap();

        manager.resolve_incident(&incident.incident_id, "restarted primary");

        let stored = manager.get_incident(&incident.incident_id).unwrap();
        assert_eq!(stored.status, IncidentStatus::Resolved);
        assert!(stored.resolved_at.is_some());
        assert!(stored.resolved_at.unwrap() >= stored.created_at);
        assert_eq!(stored.root_cause.as_deref(), Some("restarted primary"));

        let stats = manager.stats();
        assert_eq!(stats.currently_open, 0);
        assert_eq!(stats.resolved, 1);
    }

    #[test]
    fn resolve_unknown_id_is_a_silent_noop() {
        let (_, manager) = manager_with_clock();
        manager.resolve_incident("INC-999999", "nothing here");
        assert_eq!(manager.stats().resolved, 0);
    }

    #[test]
    fn update_status_maintains_resolved_at_invariant() {
        let (_, manager) = manager_with_clock();
        let incident = manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .unwrap();

        manager.update_status(&incident.incident_id, IncidentStatus::Resolved);
        assert!(manager
            .get_incident(&incident.incident_id)
            .unwrap()
            .resolved_at
            .is_some());

        manager.update_status(&incident.incident_id, IncidentStatus::Monitoring);
        assert!(manager
            .get_incident(&incident.incident_id)
            .unwrap()
            .resolved_at
            .is_none());
    }

    #[test]
    fn auto_resolve_closes_stale_non_terminal_incidents() {
        let (clock, manager) = manager_with_clock();
        let incident = manager
            .evaluate_event(&scored_event("db.down", 0.96), &[], &[])
            .unwrap();
        manager.update_status(&incident.incident_id, IncidentStatus::Identified);

        clock.advance(Duration::minutes(20));
        manager.auto_resolve_stale_incidents();

        let stored = manager.get_incident(&incident.incident_id).unwrap();
        assert_eq!(stored.status, IncidentStatus::Resolved);
        assert_eq!(
            stored.root_cause.as_deref(),
            Some("Auto-resolved: no further activity")
        );
        assert_eq!(manager.stats().resolved, 1);
    }

    #[test]
    fn created_callbacks_are_isolated_from_panics() {
        let (_, manager) = manager_with_clock();
        let fired = Arc::new(AtomicUsize::new(0));

        manager.on_incident_created(|_| panic!("listener blew up"));
        let fired_clone = fired.clone();
        manager.on_incident_created(move |_| {
            fired_clone.fetch_add(1, Ordering::Relaxed);
        });

        manager.evaluate_event(&scored_event("db.down", 0.96), &[], &[]);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn incident_ids_are_zero_padded_and_monotone() {
        let (_, manager) = manager_with_clock();
        let a = manager.create_incident("first", "d", IncidentSeverity::Low, vec![]);
        let b = manager.create_incident("second", "d", IncidentSeverity::Low, vec![]);
        assert_eq!(a.incident_id, "INC-000001");
        assert_eq!(b.incident_id, "INC-000002");
    }

    #[test]
    fn event_id_overlap_deduplicates() {
        let (_, manager) = manager_with_clock();

        let event = scored_event("cache.storm", 0.8);
        let correlation = Correlation {
            event_ids: vec![event.event_id, 1_000_001, 1_000_002, 1_000_003],
            correlation_type: crate::correlate::CorrelationType::Entity,
            confidence: 0.8,
            reason: "Events share common entities".into(),
            first_event_time: Utc::now(),
            last_event_time: Utc::now(),
            metadata: BTreeMap::new(),
        };

        assert!(manager
            .evaluate_event(&event, &[correlation.clone()], &[])
            .is_some());

        // Different title and severity, but sharing most event ids.
        let mut second = scored_event("cache.other", 0.97);
        second.event_id = event.event_id;
        assert!(manager
            .evaluate_event(&second, &[correlation], &[])
            .is_none());
        assert_eq!(manager.stats().deduplicated, 1);
    }
}
