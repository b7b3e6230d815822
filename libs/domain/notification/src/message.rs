// [libs/domain/notification/src/message.rs]
/*!
 * Renders an alert transition into the UTF-8 message sinks expect, and
 * builds the JSON payload shape each sink transport sends over the wire.
 */

use serde::Serialize;
use serde_json::{json, Value};
use warden_domain_models::{AlertKind, AlertLevel, AlertRecord, AlertStatus, Probe};

/// Everything the message renderer needs about the probe and the alert
/// transition that just occurred. Built by the caller from the `Probe`
/// and `AlertRecord` already in hand.
#[derive(Debug, Clone)]
pub struct AlertNotificationContext<'a> {
    pub probe: &'a Probe,
    pub record: &'a AlertRecord,
}

impl<'a> AlertNotificationContext<'a> {
    pub fn new(probe: &'a Probe, record: &'a AlertRecord) -> Self {
        Self { probe, record }
    }

    fn kind_label(&self) -> &'static str {
        match self.record.kind {
            AlertKind::Cpu => "cpu",
            AlertKind::Memory => "memory",
            AlertKind::Disk => "disk",
            AlertKind::NetworkDown => "network_down",
        }
    }

    fn transition_label(&self) -> &'static str {
        match self.record.status {
            AlertStatus::Firing => "FIRING",
            AlertStatus::Resolved => "RESOLVED",
        }
    }

    fn event_timestamp_ms(&self) -> i64 {
        match self.record.status {
            AlertStatus::Firing => self.record.fired_at_ms,
            AlertStatus::Resolved => self.record.resolved_at_ms.unwrap_or(self.record.fired_at_ms),
        }
    }

    /// Renders a human-readable plain-text message: level glyph, probe
    /// identity, kind, threshold, actual value and event timestamp in
    /// ISO-ish local form.
    pub fn render_text(&self) -> String {
        let glyph = self.record.level.glyph();
        let ts = chrono::DateTime::from_timestamp_millis(self.event_timestamp_ms())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.event_timestamp_ms().to_string());

        format!(
            "{glyph} [{transition}] {rule}\nprobe: {display_name} ({probe_id})\nhostname: {hostname}  ip: {ip}\nkind: {kind}  threshold: {threshold}  actual: {actual}\nat: {ts}",
            glyph = glyph,
            transition = self.transition_label(),
            rule = self.record.rule_name,
            display_name = self.probe.display_name,
            probe_id = self.probe.id,
            hostname = self.probe.hostname.as_deref().unwrap_or("unknown"),
            ip = self.probe.ip.as_deref().unwrap_or("unknown"),
            kind = self.kind_label(),
            threshold = self.record.threshold,
            actual = self.record.actual_value,
            ts = ts,
        )
    }
}

/// `{"msgtype":"text","text":{"content":"..."}}` — shared by DingTalk and
/// WeCom, which use an identical body shape.
pub fn dingtalk_style_payload(message: &str) -> Value {
    json!({ "msgtype": "text", "text": { "content": message } })
}

/// `{"msg_type":"text","content":{"text":"..."}}`
pub fn feishu_payload(message: &str) -> Value {
    json!({ "msg_type": "text", "content": { "text": message } })
}

/// `{"agent":{...},"record":{...}}` — the generic webhook receives the
/// full internal records, verbatim, instead of formatted text.
pub fn generic_webhook_payload(probe: &Probe, record: &AlertRecord) -> Value
where
    Probe: Serialize,
    AlertRecord: Serialize,
{
    json!({ "agent": probe, "record": record })
}

/// Maps a rule's severity level onto the coarse classification carried in
/// logs and, eventually, an admin-facing feed.
pub fn level_to_severity(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Info => "info",
        AlertLevel::Warning => "warning",
        AlertLevel::Critical => "critical",
    }
}
