//! Library configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Jira Cloud tracker settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://your-domain.atlassian.net`.
    pub url: String,
    pub username: String,
    pub api_token: String,
    /// Project key, e.g. `PROJ`.
    pub project_key: String,
    pub enabled: bool,
}

/// PagerDuty Events API v2 settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerDutyConfig {
    pub integration_key: String,
    pub api_token: String,
    pub enabled: bool,
}

/// Slack incoming-webhook settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub webhook_url: String,
    /// Optional channel override.
    pub channel: String,
    pub enabled: bool,
}

/// Top-level configuration handed to `Logger::new` / `global::init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service_name: String,
    pub service_instance: String,
    pub environment: String,

    /// Fraction of events kept when sampling, 1.0 keeps everything.
    pub sampling_rate: f64,
    /// Keep anomalous or ERROR-and-above events regardless of sampling.
    pub sample_anomalies_always: bool,

    pub async_queue_size: usize,
    pub worker_threads: usize,

    pub enable_anomaly_detection: bool,
    pub enable_pattern_matching: bool,
    pub enable_correlation: bool,
    /// Reserved; prediction is not implemented.
    pub enable_prediction: bool,
    pub enable_auto_incidents: bool,

    /// Minimum anomaly score for incident creation.
    pub incident_anomaly_threshold: f64,
    /// Minimum pattern matches for incident creation.
    pub incident_pattern_threshold: usize,
    /// Minimum correlations for incident creation.
    pub incident_correlation_threshold: usize,

    pub storage_path: PathBuf,
    pub max_storage_mb: usize,

    /// Append-mode event log; `None` disables the file sink.
    pub log_file_path: Option<PathBuf>,
    pub log_to_console: bool,

    pub jira: JiraConfig,
    pub pagerduty: PagerDutyConfig,
    pub slack: SlackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            service_instance: String::new(),
            environment: "production".to_string(),
            sampling_rate: 1.0,
            sample_anomalies_always: true,
            async_queue_size: 8192,
            worker_threads: 2,
            enable_anomaly_detection: true,
            enable_pattern_matching: true,
            enable_correlation: true,
            enable_prediction: false,
            enable_auto_incidents: false,
            incident_anomaly_threshold: 0.8,
            incident_pattern_threshold: 1,
            incident_correlation_threshold: 3,
            storage_path: PathBuf::from("./logmedic_data"),
            max_storage_mb: 1024,
            log_file_path: None,
            log_to_console: true,
            jira: JiraConfig::default(),
            pagerduty: PagerDutyConfig::default(),
            slack: SlackConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.environment, "production");
        assert_eq!(config.sampling_rate, 1.0);
        assert!(config.sample_anomalies_always);
        assert_eq!(config.async_queue_size, 8192);
        assert_eq!(config.worker_threads, 2);
        assert!(!config.enable_auto_incidents);
        assert_eq!(config.incident_anomaly_threshold, 0.8);
        assert_eq!(config.incident_pattern_threshold, 1);
        assert_eq!(config.incident_correlation_threshold, 3);
        assert!(config.log_to_console);
        assert!(!config.jira.enabled);
    }

    #[test]
    fn partial_toml_style_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"service_name":"payments","worker_threads":4,"slack":{"enabled":true,"webhook_url":"https://hooks.example/x"}}"#,
        )
        .unwrap();
        assert_eq!(config.service_name, "payments");
        assert_eq!(config.worker_threads, 4);
        assert!(config.slack.enabled);
        assert_eq!(config.environment, "production");
    }
}
