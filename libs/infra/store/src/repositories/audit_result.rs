// [libs/infra/store/src/repositories/audit_result.rs]
/*! Passthrough persistence for `audit_result` frames: stored as-is, never
 * fed to the alert evaluator. */

use crate::errors::StoreError;
use crate::StoreClient;
use libsql::params;
use tracing::instrument;
use warden_domain_models::AuditResult;

pub struct AuditResultRepository {
    client: StoreClient,
}

impl AuditResultRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self, result))]
    pub async fn insert(&self, result: &AuditResult) -> Result<(), StoreError> {
        let conn = self.client.connection()?;

        let payload_json =
            serde_json::to_string(&result.payload).map_err(|e| StoreError::Mapping(e.to_string()))?;

        conn.execute(
            "INSERT INTO audit_results (probe_id, received_at_ms, payload_json) VALUES (?1, ?2, ?3)",
            params![result.probe_id.to_string(), result.received_at_ms, payload_json],
        )
        .await?;

        Ok(())
    }
}
