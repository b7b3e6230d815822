// [libs/infra/store/src/repositories/alert_rule.rs]
/*! Rule cache source: the evaluator reloads this on invalidation signal
 * or at a 30 s floor, never on the hot ingest path. */

use crate::errors::StoreError;
use crate::StoreClient;
use libsql::params;
use tracing::instrument;
use uuid::Uuid;
use warden_domain_models::{AlertKind, AlertLevel, AlertRule, AlertScope, NotificationTargets};

pub struct AlertRuleRepository {
    client: StoreClient,
}

impl AlertRuleRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn list_enabled(&self) -> Result<Vec<AlertRule>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn.query("SELECT * FROM alert_rules WHERE enabled = 1", ()).await?;

        let mut rules = Vec::new();
        while let Some(row) = rows.next().await? {
            rules.push(row_to_rule(&row)?);
        }
        Ok(rules)
    }

    pub async fn upsert(&self, rule: &AlertRule, now_ms: i64) -> Result<(), StoreError> {
        let conn = self.client.connection()?;

        let scope_json =
            serde_json::to_string(&rule.scope).map_err(|e| StoreError::Mapping(e.to_string()))?;
        let notification_json = serde_json::to_string(&rule.notification)
            .map_err(|e| StoreError::Mapping(e.to_string()))?;

        conn.execute(
            "INSERT INTO alert_rules (id, name, scope_json, kind, threshold, duration_s, network_duration_s, level, enabled, notification_json, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                scope_json = excluded.scope_json,
                kind = excluded.kind,
                threshold = excluded.threshold,
                duration_s = excluded.duration_s,
                network_duration_s = excluded.network_duration_s,
                level = excluded.level,
                enabled = excluded.enabled,
                notification_json = excluded.notification_json,
                updated_at_ms = excluded.updated_at_ms",
            params![
                rule.id.to_string(),
                rule.name.clone(),
                scope_json,
                kind_to_str(rule.kind),
                rule.threshold,
                rule.duration_s,
                rule.network_duration_s,
                level_to_str(rule.level),
                rule.enabled as i64,
                notification_json,
                now_ms,
            ],
        )
        .await?;

        Ok(())
    }
}

fn kind_to_str(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::Cpu => "cpu",
        AlertKind::Memory => "memory",
        AlertKind::Disk => "disk",
        AlertKind::NetworkDown => "network_down",
    }
}

fn str_to_kind(s: &str) -> Result<AlertKind, StoreError> {
    match s {
        "cpu" => Ok(AlertKind::Cpu),
        "memory" => Ok(AlertKind::Memory),
        "disk" => Ok(AlertKind::Disk),
        "network_down" => Ok(AlertKind::NetworkDown),
        other => Err(StoreError::Mapping(format!("unknown alert kind: {}", other))),
    }
}

fn level_to_str(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Info => "info",
        AlertLevel::Warning => "warning",
        AlertLevel::Critical => "critical",
    }
}

fn str_to_level(s: &str) -> Result<AlertLevel, StoreError> {
    match s {
        "info" => Ok(AlertLevel::Info),
        "warning" => Ok(AlertLevel::Warning),
        "critical" => Ok(AlertLevel::Critical),
        other => Err(StoreError::Mapping(format!("unknown alert level: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreClient;
    use warden_domain_models::{AlertKind, AlertLevel, AlertRule, AlertScope, NotificationTargets};

    fn sample_rule() -> AlertRule {
        AlertRule {
            id: Uuid::new_v4(),
            name: "cpu hot".into(),
            scope: AlertScope::All,
            kind: AlertKind::Cpu,
            threshold: 90.0,
            duration_s: 60,
            network_duration_s: None,
            level: AlertLevel::Warning,
            enabled: true,
            notification: NotificationTargets { dingtalk: true, wecom: false, feishu: false, webhook: true },
        }
    }

    #[tokio::test]
    async fn upsert_then_list_enabled_round_trips_a_rule() {
        let client = StoreClient::connect(":memory:", None).await.unwrap();
        let repo = AlertRuleRepository::new(client);
        let rule = sample_rule();

        repo.upsert(&rule, 1_000).await.unwrap();

        let rules = repo.list_enabled().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, rule.id);
        assert_eq!(rules[0].kind, AlertKind::Cpu);
        assert_eq!(rules[0].threshold, 90.0);
        assert_eq!(rules[0].notification, rule.notification);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_id_and_disabling_drops_it_from_list_enabled() {
        let client = StoreClient::connect(":memory:", None).await.unwrap();
        let repo = AlertRuleRepository::new(client);
        let mut rule = sample_rule();

        repo.upsert(&rule, 1_000).await.unwrap();
        rule.threshold = 95.0;
        rule.enabled = false;
        repo.upsert(&rule, 2_000).await.unwrap();

        assert!(repo.list_enabled().await.unwrap().is_empty());
    }
}

fn row_to_rule(row: &libsql::Row) -> Result<AlertRule, StoreError> {
    let id: String = row.get(0).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let scope_json: String = row.get(2).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let kind: String = row.get(3).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let level: String = row.get(7).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let enabled: i64 = row.get(8).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let notification_json: String = row.get(9).map_err(|e| StoreError::Mapping(e.to_string()))?;

    Ok(AlertRule {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Mapping(e.to_string()))?,
        name: row.get(1).map_err(|e| StoreError::Mapping(e.to_string()))?,
        scope: serde_json::from_str::<AlertScope>(&scope_json)
            .map_err(|e| StoreError::Mapping(e.to_string()))?,
        kind: str_to_kind(&kind)?,
        threshold: row.get(4).map_err(|e| StoreError::Mapping(e.to_string()))?,
        duration_s: row.get(5).map_err(|e| StoreError::Mapping(e.to_string()))?,
        network_duration_s: row.get(6).ok(),
        level: str_to_level(&level)?,
        enabled: enabled != 0,
        notification: serde_json::from_str::<NotificationTargets>(&notification_json)
            .map_err(|e| StoreError::Mapping(e.to_string()))?,
    })
}
