//! [apps/server/src/config.rs]
//! TOML configuration, loaded once at startup and never mutated afterward.
//! An unreadable or malformed file is the one documented fatal startup
//! error: the caller exits non-zero rather than falling back to defaults.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct WardenConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub database: DatabaseConfig,
    pub timeseries: TimeSeriesConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { horizon_days: default_horizon_days() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    pub dingtalk: Option<DingTalkSinkConfig>,
    pub wecom: Option<WebhookSinkConfig>,
    pub feishu: Option<WebhookSinkConfig>,
    pub webhook: Option<WebhookSinkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DingTalkSinkConfig {
    pub webhook_url: String,
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSinkConfig {
    pub url: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_horizon_days() -> i64 {
    30
}

impl WardenConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
        let config: WardenConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("malformed config file {}: {}", path.display(), e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let raw = r#"
            [database]
            url = ":memory:"

            [timeseries]
            base_url = "http://localhost:9090"
        "#;
        let config: WardenConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.retention.horizon_days, 30);
        assert!(config.notification.dingtalk.is_none());
    }
}
