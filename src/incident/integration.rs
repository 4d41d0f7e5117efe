//! External tracker integrations.
//!
//! The manager talks to trackers through the [`Integration`] trait; concrete
//! adapters here build the Jira / PagerDuty / Slack payloads and hand them to
//! a pluggable [`Transport`]. Nothing in this module performs network I/O
//! itself, and nothing crosses the integration boundary as an error: adapters
//! return sentinel ids (`*-DISABLED`, `*-ERROR`) instead.

use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::config::{JiraConfig, PagerDutyConfig, SlackConfig};
use crate::incident::{Incident, IncidentSeverity};

const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// Response surfaced by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no transport configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Request(String),
}

/// Delivery mechanism plug-in. Implementations own retries, TLS, and
/// authentication encoding; `basic_auth` carries raw credentials when an
/// adapter needs them.
pub trait Transport: Send + Sync {
    fn post(
        &self,
        url: &str,
        body: &str,
        basic_auth: Option<(&str, &str)>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Default transport that refuses every request. Adapters degrade to their
/// error sentinel, so incident creation itself still succeeds.
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn post(
        &self,
        _url: &str,
        _body: &str,
        _basic_auth: Option<(&str, &str)>,
    ) -> Result<TransportResponse, TransportError> {
        Err(TransportError::NotConfigured)
    }
}

/// An external incident tracker.
///
/// `create_incident` must not fail across the boundary: return a sentinel id
/// instead. `resolve_incident` must tolerate unknown ids.
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    /// Create the incident externally and return its external id.
    fn create_incident(&self, incident: &Incident) -> String;

    /// Push updated incident state. Optional; default is a no-op.
    fn update_incident(&self, _external_id: &str, _incident: &Incident) {}

    /// Resolve the incident externally.
    fn resolve_incident(&self, external_id: &str, resolution: &str);
}

fn is_sentinel(external_id: &str) -> bool {
    external_id.ends_with("-DISABLED") || external_id.ends_with("-ERROR")
}

// ---------------------------------------------------------------------------
// Jira
// ---------------------------------------------------------------------------

/// Jira Cloud issues via the REST v2 API payload shape.
pub struct JiraIntegration {
    config: JiraConfig,
    transport: std::sync::Arc<dyn Transport>,
}

impl JiraIntegration {
    pub fn new(config: JiraConfig, transport: std::sync::Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn issue_url(&self) -> String {
        format!("{}/rest/api/2/issue", self.config.url.trim_end_matches('/'))
    }

    fn priority(severity: IncidentSeverity) -> &'static str {
        match severity {
            IncidentSeverity::Critical => "Highest",
            IncidentSeverity::High => "High",
            IncidentSeverity::Medium => "Medium",
            IncidentSeverity::Low => "Low",
        }
    }
}

impl Integration for JiraIntegration {
    fn name(&self) -> &str {
        "Jira"
    }

    fn create_incident(&self, incident: &Incident) -> String {
        if self.config.url.is_empty() || self.config.project_key.is_empty() {
            return "JIRA-DISABLED".to_string();
        }

        let payload = json!({
            "fields": {
                "project": { "key": self.config.project_key },
                "summary": incident.title,
                "description": incident.description,
                "issuetype": { "name": "Bug" },
                "priority": { "name": Self::priority(incident.severity) },
            }
        });

        let auth = (self.config.username.as_str(), self.config.api_token.as_str());
        match self
            .transport
            .post(&self.issue_url(), &payload.to_string(), Some(auth))
        {
            Ok(response) if response.status == 201 => {
                serde_json::from_str::<serde_json::Value>(&response.body)
                    .ok()
                    .and_then(|v| v.get("key").and_then(|k| k.as_str()).map(str::to_string))
                    .unwrap_or_else(|| "JIRA-CREATED".to_string())
            }
            Ok(response) => {
                warn!(status = response.status, "Jira create failed");
                "JIRA-ERROR".to_string()
            }
            Err(err) => {
                warn!(error = %err, "Jira transport error");
                "JIRA-ERROR".to_string()
            }
        }
    }

    fn resolve_incident(&self, external_id: &str, resolution: &str) {
        if self.config.url.is_empty() || is_sentinel(external_id) {
            return;
        }

        let payload = json!({
            "transition": { "id": "31" },
            "fields": { "resolution": { "name": resolution } },
        });
        let url = format!(
            "{}/rest/api/3/issue/{}/transitions",
            self.config.url.trim_end_matches('/'),
            external_id
        );
        let auth = (self.config.username.as_str(), self.config.api_token.as_str());
        if let Err(err) = self.transport.post(&url, &payload.to_string(), Some(auth)) {
            warn!(error = %err, issue = external_id, "Jira resolve failed");
        }
    }
}

// ---------------------------------------------------------------------------
// PagerDuty
// ---------------------------------------------------------------------------

/// PagerDuty Events API v2 trigger/resolve events.
pub struct PagerDutyIntegration {
    config: PagerDutyConfig,
    transport: std::sync::Arc<dyn Transport>,
}

impl PagerDutyIntegration {
    pub fn new(config: PagerDutyConfig, transport: std::sync::Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn pd_severity(severity: IncidentSeverity) -> &'static str {
        match severity {
            IncidentSeverity::Critical => "critical",
            IncidentSeverity::High => "error",
            IncidentSeverity::Medium => "warning",
            IncidentSeverity::Low => "info",
        }
    }
}

impl Integration for PagerDutyIntegration {
    fn name(&self) -> &str {
        "PagerDuty"
    }

    fn create_incident(&self, incident: &Incident) -> String {
        if self.config.integration_key.is_empty() {
            return "PD-DISABLED".to_string();
        }

        let mut payload = json!({
            "summary": incident.title,
            "severity": Self::pd_severity(incident.severity),
            "source": "logmedic",
            "custom_details": { "incident_id": incident.incident_id },
        });
        if let Some(service) = incident.labels.get("service") {
            payload["component"] = json!(service);
        }

        let body = json!({
            "routing_key": self.config.integration_key,
            "event_action": "trigger",
            "dedup_key": incident.incident_id,
            "payload": payload,
        });

        match self
            .transport
            .post(PAGERDUTY_EVENTS_URL, &body.to_string(), None)
        {
            Ok(response) if response.status == 202 => {
                serde_json::from_str::<serde_json::Value>(&response.body)
                    .ok()
                    .and_then(|v| {
                        v.get("dedup_key")
                            .and_then(|k| k.as_str())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| format!("PD-{}", incident.incident_id))
            }
            Ok(response) => {
                warn!(status = response.status, "PagerDuty create failed");
                "PD-ERROR".to_string()
            }
            Err(err) => {
                warn!(error = %err, "PagerDuty transport error");
                "PD-ERROR".to_string()
            }
        }
    }

    fn resolve_incident(&self, external_id: &str, _resolution: &str) {
        if self.config.integration_key.is_empty() || is_sentinel(external_id) {
            return;
        }

        let body = json!({
            "routing_key": self.config.integration_key,
            "event_action": "resolve",
            "dedup_key": external_id,
        });
        if let Err(err) = self
            .transport
            .post(PAGERDUTY_EVENTS_URL, &body.to_string(), None)
        {
            warn!(error = %err, dedup_key = external_id, "PagerDuty resolve failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Slack
// ---------------------------------------------------------------------------

/// Slack incoming-webhook notifications.
pub struct SlackIntegration {
    config: SlackConfig,
    transport: std::sync::Arc<dyn Transport>,
}

impl SlackIntegration {
    pub fn new(config: SlackConfig, transport: std::sync::Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    fn color(severity: IncidentSeverity) -> &'static str {
        match severity {
            IncidentSeverity::Critical => "#FF0000",
            IncidentSeverity::High => "#FF6600",
            IncidentSeverity::Medium => "#FFCC00",
            IncidentSeverity::Low => "#36A64F",
        }
    }

    fn emoji(severity: IncidentSeverity) -> &'static str {
        match severity {
            IncidentSeverity::Critical => ":fire:",
            IncidentSeverity::High => ":warning:",
            IncidentSeverity::Medium => ":large_orange_diamond:",
            IncidentSeverity::Low => ":information_source:",
        }
    }
}

impl Integration for SlackIntegration {
    fn name(&self) -> &str {
        "Slack"
    }

    fn create_incident(&self, incident: &Incident) -> String {
        if self.config.webhook_url.is_empty() {
            return "SLACK-DISABLED".to_string();
        }

        let mut body = json!({
            "text": format!(
                "{} New Incident: {}",
                Self::emoji(incident.severity),
                incident.title
            ),
            "attachments": [{
                "color": Self::color(incident.severity),
                "fields": [
                    { "title": "Incident ID", "value": incident.incident_id, "short": true },
                    { "title": "Severity", "value": incident.severity.as_str(), "short": true },
                    { "title": "Description", "value": incident.description, "short": false },
                    {
                        "title": "Events",
                        "value": format!("{} related events", incident.event_ids.len()),
                        "short": true
                    },
                ],
                "footer": "logmedic",
                "ts": incident.created_at.timestamp(),
            }],
        });
        if !self.config.channel.is_empty() {
            body["channel"] = json!(self.config.channel);
        }

        match self
            .transport
            .post(&self.config.webhook_url, &body.to_string(), None)
        {
            Ok(response) if response.status == 200 => {
                format!("SLACK-{}", incident.incident_id)
            }
            Ok(response) => {
                warn!(status = response.status, "Slack webhook failed");
                "SLACK-ERROR".to_string()
            }
            Err(err) => {
                warn!(error = %err, "Slack transport error");
                "SLACK-ERROR".to_string()
            }
        }
    }

    fn update_incident(&self, external_id: &str, incident: &Incident) {
        if self.config.webhook_url.is_empty() || is_sentinel(external_id) {
            return;
        }
        let body = json!({
            "text": format!(":arrows_counterclockwise: Incident Updated: {}", incident.title),
        });
        let _ = self
            .transport
            .post(&self.config.webhook_url, &body.to_string(), None);
    }

    fn resolve_incident(&self, external_id: &str, resolution: &str) {
        if self.config.webhook_url.is_empty() || is_sentinel(external_id) {
            return;
        }
        let body = json!({
            "text": format!(
                ":white_check_mark: Incident Resolved: {external_id}\nResolution: {resolution}"
            ),
        });
        if let Err(err) = self
            .transport
            .post(&self.config.webhook_url, &body.to_string(), None)
        {
            warn!(error = %err, "Slack resolve notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::IncidentStatus;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    fn sample_incident() -> Incident {
        Incident {
            incident_id: "INC-000007".to_string(),
            title: "Pattern detected: cascading_failure".to_string(),
            description: "Incident created from event: user.error".to_string(),
            severity: IncidentSeverity::High,
            status: IncidentStatus::Open,
            created_at: Utc::now(),
            resolved_at: None,
            event_ids: vec![1, 2, 3],
            root_cause: None,
            root_cause_event_id: None,
            anomaly_score: 0.9,
            affected_services_count: 1,
            affected_users_count: 0,
            labels: BTreeMap::from([("service".to_string(), "gateway".to_string())]),
            tags: vec![],
            external_ids: BTreeMap::new(),
        }
    }

    /// Records every request and answers with a canned response.
    struct RecordingTransport {
        requests: Mutex<Vec<(String, String)>>,
        status: u16,
        body: String,
    }

    impl RecordingTransport {
        fn new(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                status,
                body: body.to_string(),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Transport for RecordingTransport {
        fn post(
            &self,
            url: &str,
            body: &str,
            _basic_auth: Option<(&str, &str)>,
        ) -> Result<TransportResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), body.to_string()));
            Ok(TransportResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn jira_config() -> JiraConfig {
        JiraConfig {
            url: "https://acme.atlassian.net/".to_string(),
            username: "bot@acme.dev".to_string(),
            api_token: "token".to_string(),
            project_key: "OPS".to_string(),
            enabled: true,
        }
    }

    #[test]
    fn unconfigured_adapters_return_disabled_sentinels() {
        let transport = RecordingTransport::new(200, "");
        let jira = JiraIntegration::new(JiraConfig::default(), transport.clone());
        let pd = PagerDutyIntegration::new(PagerDutyConfig::default(), transport.clone());
        let slack = SlackIntegration::new(SlackConfig::default(), transport.clone());

        let incident = sample_incident();
        assert_eq!(jira.create_incident(&incident), "JIRA-DISABLED");
        assert_eq!(pd.create_incident(&incident), "PD-DISABLED");
        assert_eq!(slack.create_incident(&incident), "SLACK-DISABLED");
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn jira_create_parses_issue_key() {
        let transport = RecordingTransport::new(201, r#"{"id":"1","key":"OPS-42"}"#);
        let jira = JiraIntegration::new(jira_config(), transport.clone());

        assert_eq!(jira.create_incident(&sample_incident()), "OPS-42");
        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, "https://acme.atlassian.net/rest/api/2/issue");
        assert!(requests[0].1.contains("\"summary\""));
        assert!(requests[0].1.contains("OPS"));
    }

    #[test]
    fn jira_create_degrades_to_error_sentinel() {
        let transport = RecordingTransport::new(400, "bad request");
        let jira = JiraIntegration::new(jira_config(), transport);
        assert_eq!(jira.create_incident(&sample_incident()), "JIRA-ERROR");

        let jira = JiraIntegration::new(jira_config(), Arc::new(NullTransport));
        assert_eq!(jira.create_incident(&sample_incident()), "JIRA-ERROR");
    }

    #[test]
    fn pagerduty_returns_dedup_key() {
        let transport =
            RecordingTransport::new(202, r#"{"status":"success","dedup_key":"INC-000007"}"#);
        let pd = PagerDutyIntegration::new(
            PagerDutyConfig {
                integration_key: "rk".to_string(),
                api_token: String::new(),
                enabled: true,
            },
            transport.clone(),
        );
        assert_eq!(pd.create_incident(&sample_incident()), "INC-000007");
        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].1.contains("\"event_action\":\"trigger\""));
        assert!(requests[0].1.contains("\"component\":\"gateway\""));
    }

    #[test]
    fn slack_success_uses_incident_id() {
        let transport = RecordingTransport::new(200, "ok");
        let slack = SlackIntegration::new(
            SlackConfig {
                webhook_url: "https://hooks.slack.example/T000".to_string(),
                channel: "#incidents".to_string(),
                enabled: true,
            },
            transport.clone(),
        );
        assert_eq!(slack.create_incident(&sample_incident()), "SLACK-INC-000007");
        let requests = transport.requests.lock().unwrap();
        assert!(requests[0].1.contains("#incidents"));
        assert!(requests[0].1.contains("New Incident"));
    }

    #[test]
    fn resolve_skips_sentinel_ids() {
        let transport = RecordingTransport::new(200, "ok");
        let jira = JiraIntegration::new(jira_config(), transport.clone());
        jira.resolve_incident("JIRA-ERROR", "fixed");
        jira.resolve_incident("JIRA-DISABLED", "fixed");
        assert_eq!(transport.request_count(), 0);

        jira.resolve_incident("OPS-42", "fixed");
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn default_update_is_a_noop() {
        let transport = RecordingTransport::new(200, "ok");
        let jira = JiraIntegration::new(jira_config(), transport.clone());
        jira.update_incident("OPS-42", &sample_incident());
        assert_eq!(transport.request_count(), 0);
    }
}
