// [libs/infra/store/src/repositories/probe.rs]
/*! Probe registry: upsert on register, last-seen advancement, lookups. */

use crate::errors::StoreError;
use crate::StoreClient;
use libsql::params;
use tracing::{info, instrument};
use uuid::Uuid;
use warden_domain_models::{Probe, ProbeStatus};

pub struct ProbeRepository {
    client: StoreClient,
}

impl ProbeRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Upserts the fields a `register` frame carries. `registered_at_ms`
    /// is preserved across re-registrations; only `client.connection()`
    /// call sites decide `now_ms`.
    #[instrument(skip(self, probe))]
    pub async fn upsert_on_register(&self, probe: &Probe) -> Result<(), StoreError> {
        let conn = self.client.connection()?;

        conn.execute(
            "INSERT INTO probes (id, display_name, hostname, ip, os, arch, version, status, last_seen_ms, registered_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'online', ?8, ?8)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                hostname = COALESCE(excluded.hostname, probes.hostname),
                ip = COALESCE(excluded.ip, probes.ip),
                os = COALESCE(excluded.os, probes.os),
                arch = COALESCE(excluded.arch, probes.arch),
                version = COALESCE(excluded.version, probes.version),
                status = 'online',
                last_seen_ms = excluded.last_seen_ms",
            params![
                probe.id.to_string(),
                probe.display_name.clone(),
                probe.hostname.clone(),
                probe.ip.clone(),
                probe.os.clone(),
                probe.arch.clone(),
                probe.version.clone(),
                probe.last_seen_ms,
            ],
        )
        .await?;

        info!(event = "probe_registered", probe_id = %probe.id, "probe upserted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn touch_last_seen(&self, probe_id: Uuid, now_ms: i64) -> Result<(), StoreError> {
        let conn = self.client.connection()?;
        conn.execute(
            "UPDATE probes SET last_seen_ms = ?2 WHERE id = ?1",
            params![probe_id.to_string(), now_ms],
        )
        .await?;
        Ok(())
    }

    pub async fn get(&self, probe_id: Uuid) -> Result<Option<Probe>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn
            .query("SELECT * FROM probes WHERE id = ?1", params![probe_id.to_string()])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_probe(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<Probe>, StoreError> {
        let conn = self.client.connection()?;
        let mut rows = conn.query("SELECT * FROM probes", ()).await?;

        let mut probes = Vec::new();
        while let Some(row) = rows.next().await? {
            probes.push(row_to_probe(&row)?);
        }
        Ok(probes)
    }
}

fn row_to_probe(row: &libsql::Row) -> Result<Probe, StoreError> {
    let id: String = row.get(0).map_err(|e| StoreError::Mapping(e.to_string()))?;
    let status: String = row.get(7).map_err(|e| StoreError::Mapping(e.to_string()))?;

    Ok(Probe {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Mapping(e.to_string()))?,
        display_name: row.get(1).map_err(|e| StoreError::Mapping(e.to_string()))?,
        hostname: row.get(2).ok(),
        ip: row.get(3).ok(),
        os: row.get(4).ok(),
        arch: row.get(5).ok(),
        version: row.get(6).ok(),
        status: if status == "online" { ProbeStatus::Online } else { ProbeStatus::Offline },
        last_seen_ms: row.get(8).map_err(|e| StoreError::Mapping(e.to_string()))?,
        registered_at_ms: row.get(9).map_err(|e| StoreError::Mapping(e.to_string()))?,
    })
}
