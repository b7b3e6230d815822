// [libs/infra/store/src/client.rs]
/*!
 * Connection management for the relational store. In-memory URLs need an
 * anchor connection kept alive for the lifetime of the client, otherwise
 * libSQL drops the schema as soon as the bootstrap connection closes.
 */

use crate::errors::StoreError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

#[derive(Clone)]
pub struct StoreClient {
    driver: Arc<Database>,
    /// Keeps an in-memory database alive; dropped without effect for
    /// disk-backed or remote connections.
    _memory_anchor: Option<Arc<Connection>>,
}

impl StoreClient {
    #[instrument(skip(access_token))]
    pub async fn connect(connection_url: &str, access_token: Option<String>) -> Result<Self, StoreError> {
        if connection_url.is_empty() {
            return Err(StoreError::Configuration("DATABASE_URL is empty".into()));
        }

        info!(event = "store_connecting", url = connection_url, "opening relational store connection");

        let is_remote = connection_url.starts_with("libsql://") || connection_url.starts_with("https://");
        let is_memory = connection_url.contains(":memory:") || connection_url.contains("mode=memory");

        let driver = if is_remote {
            let token = access_token
                .ok_or_else(|| StoreError::Configuration("remote store requires an access token".into()))?;
            Builder::new_remote(connection_url.to_string(), token).build().await
        } else {
            Builder::new_local(connection_url).build().await
        }
        .map_err(|e| StoreError::Connection(e.to_string()))?;

        let driver = Arc::new(driver);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = driver.connect().map_err(|e| StoreError::Connection(e.to_string()))?;
            apply_schema(&anchor_conn).await.map_err(|e| StoreError::Connection(e.to_string()))?;
            anchor = Some(Arc::new(anchor_conn));
            info!(event = "store_memory_anchored", "in-memory store schema applied and anchored");
        } else {
            let bootstrap_conn = driver.connect().map_err(|e| StoreError::Connection(e.to_string()))?;
            apply_schema(&bootstrap_conn).await.map_err(|e| StoreError::Connection(e.to_string()))?;
        }

        Ok(Self { driver, _memory_anchor: anchor })
    }

    pub fn connection(&self) -> Result<Connection, StoreError> {
        self.driver.connect().map_err(|e| {
            error!(event = "store_connection_failed", error = %e, "failed to allocate connection");
            StoreError::Connection(e.to_string())
        })
    }
}
