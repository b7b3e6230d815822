// [libs/infra/store/src/repositories/host_snapshot.rs]
/*! Only the latest host snapshot is retained per probe; the upsert both
 * writes the new row and implicitly discards the old one via the primary
 * key on `probe_id`. */

use crate::errors::StoreError;
use crate::StoreClient;
use libsql::params;
use tracing::instrument;
use uuid::Uuid;
use warden_domain_models::HostSnapshot;

pub struct HostSnapshotRepository {
    client: StoreClient,
}

impl HostSnapshotRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self, snapshot))]
    pub async fn upsert(&self, snapshot: &HostSnapshot, now_ms: i64) -> Result<(), StoreError> {
        let conn = self.client.connection()?;

        conn.execute(
            "INSERT INTO host_snapshots (probe_id, hostname, platform, kernel_version, uptime_s, boot_time_s, process_count, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(probe_id) DO UPDATE SET
                hostname = excluded.hostname,
                platform = excluded.platform,
                kernel_version = excluded.kernel_version,
                uptime_s = excluded.uptime_s,
                boot_time_s = excluded.boot_time_s,
                process_count = excluded.process_count,
                updated_at_ms = excluded.updated_at_ms",
            params![
                snapshot.probe_id.to_string(),
                snapshot.hostname.clone(),
                snapshot.platform.clone(),
                snapshot.kernel_version.clone(),
                snapshot.uptime_s,
                snapshot.boot_time_s,
                snapshot.process_count,
                now_ms,
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get(&self, probe_id: Uuid) -> Result<Option<HostSnapshot>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query("SELECT * FROM host_snapshots WHERE probe_id = ?1", params![probe_id.to_string()])
            .await?;

        match rows.next().await? {
            Some(row) => {
                let probe_id: String = row.get(0).map_err(|e| StoreError::Mapping(e.to_string()))?;
                Ok(Some(HostSnapshot {
                    probe_id: Uuid::parse_str(&probe_id).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    hostname: row.get(1).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    platform: row.get(2).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    kernel_version: row.get(3).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    uptime_s: row.get(4).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    boot_time_s: row.get(5).map_err(|e| StoreError::Mapping(e.to_string()))?,
                    process_count: row.get(6).map_err(|e| StoreError::Mapping(e.to_string()))?,
                }))
            }
            None => Ok(None),
        }
    }
}
