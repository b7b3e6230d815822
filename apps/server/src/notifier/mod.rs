//! [apps/server/src/notifier/mod.rs]
//! Notifier (C7): renders an alert transition and POSTs it to every
//! configured sink independently. A sink failure is logged and never
//! alters alert state — the record is already persisted before this runs.

use std::time::Duration;
use tracing::{instrument, warn};
use warden_domain_models::{AlertRecord, Probe};
use warden_domain_notification::{
    dingtalk_signed_query, dingtalk_style_payload, feishu_payload, generic_webhook_payload,
    AlertNotificationContext,
};

use crate::config::NotificationConfig;

const SINK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Notifier {
    http: reqwest::Client,
    config: NotificationConfig,
}

impl Notifier {
    pub fn new(config: NotificationConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("warden-server/notifier")
            .build()
            .expect("failed to build notifier http client");
        Self { http, config }
    }

    /// Dispatches to every sink enabled on this rule's `notification`
    /// targets that also has a sink configured at the server level.
    /// Sinks run independently; one failing does not stop the others.
    #[instrument(skip(self, probe, record))]
    pub async fn notify(&self, probe: &Probe, record: &AlertRecord, targets: warden_domain_models::NotificationTargets) {
        let context = AlertNotificationContext::new(probe, record);

        if targets.dingtalk {
            if let Some(sink) = &self.config.dingtalk {
                self.send_dingtalk(sink, &context.render_text()).await;
            }
        }
        if targets.wecom {
            if let Some(sink) = &self.config.wecom {
                self.send_simple(&sink.url, dingtalk_style_payload(&context.render_text()), "wecom").await;
            }
        }
        if targets.feishu {
            if let Some(sink) = &self.config.feishu {
                self.send_simple(&sink.url, feishu_payload(&context.render_text()), "feishu").await;
            }
        }
        if targets.webhook {
            if let Some(sink) = &self.config.webhook {
                self.send_simple(&sink.url, generic_webhook_payload(probe, record), "webhook").await;
            }
        }
    }

    async fn send_dingtalk(&self, sink: &crate::config::DingTalkSinkConfig, message: &str) {
        let mut url = sink.webhook_url.clone();

        if let Some(secret) = &sink.secret {
            match dingtalk_signed_query(secret, crate::util::now_ms()) {
                Ok(query) => {
                    let separator = if url.contains('?') { '&' } else { '?' };
                    url = format!("{url}{separator}{query}");
                }
                Err(error) => {
                    warn!(event = "sink_sign_failed", sink = "dingtalk", error = %error, "failed to sign dingtalk request");
                    return;
                }
            }
        }

        self.send_simple(&url, dingtalk_style_payload(message), "dingtalk").await;
    }

    async fn send_simple(&self, url: &str, body: serde_json::Value, sink_name: &'static str) {
        let result = self.http.post(url).timeout(SINK_TIMEOUT).json(&body).send().await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(event = "sink_notify_failed", sink = sink_name, status = %response.status(), "sink returned non-2xx");
            }
            Err(error) => {
                warn!(event = "sink_notify_failed", sink = sink_name, error = %error, "sink request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_builds_without_any_sink_configured() {
        let _ = Notifier::new(NotificationConfig::default());
    }
}
