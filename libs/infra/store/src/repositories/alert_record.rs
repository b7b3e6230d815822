// [libs/infra/store/src/repositories/alert_record.rs]
/*!
 * Persisted alert records: insert on firing, update to resolved, and the
 * boot-time load of unresolved records used to reconstruct `AlertState`.
 */

use crate::errors::StoreError;
use crate::StoreClient;
use libsql::params;
use tracing::instrument;
use uuid::Uuid;
use warden_domain_models::{AlertKind, AlertLevel, AlertRecord, AlertStatus};

pub struct AlertRecordRepository {
    client: StoreClient,
}

impl AlertRecordRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Inserts a new `status=firing` record and returns its row id, which
    /// becomes the evaluator's `last_record_id` for this breach.
    #[instrument(skip(self, message))]
    pub async fn insert_firing(
        &self,
        probe_id: Uuid,
        rule_id: Uuid,
        rule_name: &str,
        kind: AlertKind,
        message: &str,
        threshold: f64,
        actual_value: f64,
        level: AlertLevel,
        fired_at_ms: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.client.connection()?;

        conn.execute(
            "INSERT INTO alert_records (probe_id, rule_id, rule_name, kind, message, threshold, actual_value, level, status, fired_at_ms, resolved_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'firing', ?9, NULL)",
            params![
                probe_id.to_string(),
                rule_id.to_string(),
                rule_name.to_string(),
                kind_to_str(kind),
                message.to_string(),
                threshold,
                actual_value,
                level_to_str(level),
                fired_at_ms,
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, record_id: i64, resolved_at_ms: i64) -> Result<(), StoreError> {
        let conn = self.client.connection()?;

        let affected = conn
            .execute(
                "UPDATE alert_records SET status = 'resolved', resolved_at_ms = ?2 WHERE id = ?1 AND status = 'firing'",
                params![record_id, resolved_at_ms],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound("firing alert_record"));
        }
        Ok(())
    }

    /// Loads every record still `status=firing`, used once at boot to
    /// rebuild the in-memory `AlertState` table.
    #[instrument(skip(self))]
    pub async fn list_unresolved(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query("SELECT * FROM alert_records WHERE status = 'firing'", ())
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
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

fn row_to_record(row: &libsql::Row) -> Result<AlertRecord, StoreError> {
    let probe_id: String = row.get(1).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let rule_id: String = row.get(2).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let kind: String = row.get(4).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let level: String = row.get(8).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let status: String = row.get(9).map_err(|e| StoreError::Mapping(e.to_string()))?;

    Ok(AlertRecord {
        id: row.get(0).map_err(|e| StoreError::Mapping(e.to_string()))?,
        probe_id: Uuid::parse_str(&probe_id).map_err(|e| StoreError::Mapping(e.to_string()))?,
        rule_id: Uuid::parse_str(&rule_id).map_err(|e| StoreError::Mapping(e.to_string()))?,
        rule_name: row.get(3).map_err(|e| StoreError::Mapping(e.to_string()))?,
        kind: str_to_kind(&kind)?,
        message: row.get(5).map_err(|e| StoreError::Mapping(e.to_string()))?,
        threshold: row.get(6).map_err(|e| StoreError::Mapping(e.to_string()))?,
        actual_value: row.get(7).map_err(|e| StoreError::Mapping(e.to_string()))?,
        level: str_to_level(&level)?,
        status: if status == "firing" { AlertStatus::Firing } else { AlertStatus::Resolved },
        fired_at_ms: row.get(10).map_err(|e| StoreError::Mapping(e.to_string()))?,
        resolved_at_ms: row.get(11).ok(),
    })
}
