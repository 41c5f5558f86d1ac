//! Pipeline settings
//!
//! Endpoint and alarm tuning, loadable from
//! ~/.config/briefbox/pipeline.json with serde defaults for every field so
//! a partial file (or none at all) still yields a working configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings filename in the Briefbox config directory
const SETTINGS_FILE: &str = "pipeline.json";

/// Tunable pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Mail provider API base URL
    pub gmail_base_url: String,
    /// Summarisation backend endpoint
    pub backend_endpoint: String,
    /// Seconds before the first periodic cycle
    pub alarm_initial_delay_secs: u64,
    /// Seconds between periodic cycles
    pub alarm_interval_secs: u64,
    /// Minimum seconds between any two cycles before an alarm tick is
    /// allowed to start another one
    pub alarm_cooldown_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gmail_base_url: "https://www.googleapis.com/gmail/v1".into(),
            backend_endpoint: "http://127.0.0.1:8000/summarize".into(),
            alarm_initial_delay_secs: 60,
            alarm_interval_secs: 30 * 60,
            alarm_cooldown_secs: 60,
        }
    }
}

impl PipelineConfig {
    /// Load settings from the config directory, falling back to defaults
    /// when no settings file exists.
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            return config::load_json(SETTINGS_FILE);
        }
        Ok(Self::default())
    }

    /// Persist settings to the config directory
    pub fn save(&self) -> Result<()> {
        config::save_json(SETTINGS_FILE, self)
    }

    pub fn alarm_initial_delay(&self) -> Duration {
        Duration::from_secs(self.alarm_initial_delay_secs)
    }

    pub fn alarm_interval(&self) -> Duration {
        Duration::from_secs(self.alarm_interval_secs)
    }

    pub fn alarm_cooldown(&self) -> Duration {
        Duration::from_secs(self.alarm_cooldown_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(config.gmail_base_url.starts_with("https://"));
        assert_eq!(config.alarm_interval_secs, 1800);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "backend_endpoint": "http://10.0.0.1:9000/summarize" }"#)
                .unwrap();
        assert_eq!(config.backend_endpoint, "http://10.0.0.1:9000/summarize");
        assert_eq!(
            config.gmail_base_url,
            PipelineConfig::default().gmail_base_url
        );
    }
}
