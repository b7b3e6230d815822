// [libs/domain/models/src/alert.rs]
/*!
 * Alert rule definitions, the in-memory per-(probe, rule, kind) state
 * machine, and the persisted, user-visible `AlertRecord`.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use typeshare::typeshare;
use uuid::Uuid;

/// The closed set of kinds a rule can evaluate. `network_down` is derived
/// from status-transition events rather than a raw metrics sample.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Cpu,
    Memory,
    Disk,
    NetworkDown,
}

/// Which probes a rule applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "scope_type", rename_all = "snake_case")]
pub enum AlertScope {
    All,
    Set { probe_ids: HashSet<Uuid> },
}

impl AlertScope {
    pub fn matches(&self, probe_id: Uuid) -> bool {
        match self {
            AlertScope::All => true,
            AlertScope::Set { probe_ids } => probe_ids.contains(&probe_id),
        }
    }
}

/// Severity carried verbatim from the rule into the persisted record and
/// the notification message.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    /// Glyph prefix used when rendering the plain-text sink message.
    pub fn glyph(self) -> &'static str {
        match self {
            AlertLevel::Info => "ℹ️",
            AlertLevel::Warning => "⚠️",
            AlertLevel::Critical => "🔴",
        }
    }
}

/// Operator-defined threshold+duration policy over one kind for a set of
/// probes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    pub id: Uuid,
    pub name: String,
    pub scope: AlertScope,
    pub kind: AlertKind,
    pub threshold: f64,
    pub duration_s: i64,
    /// Only meaningful for `AlertKind::NetworkDown`; `duration_s` is used
    /// for every other kind.
    pub network_duration_s: Option<i64>,
    pub level: AlertLevel,
    pub enabled: bool,
    pub notification: NotificationTargets,
}

impl AlertRule {
    pub fn is_active_for(&self, probe_id: Uuid) -> bool {
        self.enabled && self.scope.matches(probe_id)
    }

    pub fn effective_duration_ms(&self) -> i64 {
        let seconds = match self.kind {
            AlertKind::NetworkDown => self.network_duration_s.unwrap_or(self.duration_s),
            _ => self.duration_s,
        };
        seconds * 1000
    }
}

/// Which sinks a firing/resolved transition on this rule should reach.
/// Kept local to avoid a dependency cycle with the notification crate,
/// which only needs to know which channels are switched on.
#[typeshare]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationTargets {
    pub dingtalk: bool,
    pub wecom: bool,
    pub feishu: bool,
    pub webhook: bool,
}

/// In-memory per-(probe, rule, kind) evaluation state. Created lazily on
/// first breach, destroyed on resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertState {
    pub probe_id: Uuid,
    pub rule_id: Uuid,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub duration_ms: i64,
    pub first_breach_ms: i64,
    pub is_firing: bool,
    pub last_record_id: Option<i64>,
    /// Wall-clock of the last `actual_value` update while firing; used to
    /// enforce the optional 60 s floor described in the design notes.
    pub last_value_update_ms: Option<i64>,
}

impl AlertState {
    pub fn new_breach(probe_id: Uuid, rule_id: Uuid, kind: AlertKind, value: f64, threshold: f64, duration_ms: i64, now_ms: i64) -> Self {
        Self {
            probe_id,
            rule_id,
            kind,
            value,
            threshold,
            duration_ms,
            first_breach_ms: now_ms,
            is_firing: false,
            last_record_id: None,
            last_value_update_ms: None,
        }
    }

    pub fn has_sustained(&self, now_ms: i64) -> bool {
        now_ms - self.first_breach_ms >= self.duration_ms
    }

    /// Reconstructs firing state for an already-persisted, unresolved
    /// record discovered at boot.
    pub fn from_unresolved_record(record: &AlertRecord, threshold: f64, duration_ms: i64) -> Self {
        Self {
            probe_id: record.probe_id,
            rule_id: record.rule_id,
            kind: record.kind,
            value: record.actual_value,
            threshold,
            duration_ms,
            first_breach_ms: record.fired_at_ms,
            is_firing: true,
            last_record_id: Some(record.id),
            last_value_update_ms: None,
        }
    }
}

/// Lifecycle of a persisted alert record.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

/// Persisted, user-visible instance of an alert. Immutable after resolve.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRecord {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub probe_id: Uuid,
    pub rule_id: Uuid,
    pub rule_name: String,
    pub kind: AlertKind,
    pub message: String,
    pub threshold: f64,
    pub actual_value: f64,
    pub level: AlertLevel,
    pub status: AlertStatus,
    #[typeshare(serialized_as = "number")]
    pub fired_at_ms: i64,
    #[typeshare(serialized_as = "number")]
    pub resolved_at_ms: Option<i64>,
}
