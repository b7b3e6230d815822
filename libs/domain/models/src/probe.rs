// [libs/domain/models/src/probe.rs]
/*!
 * Identity and liveness record for a single monitored host.
 *
 * A `Probe` is created on first `register` frame and lives forever (soft);
 * it is never deleted by the ingest path, only its fields are refreshed.
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Stable identity of a probe, persisted on the probe host and carried in
/// every frame it sends.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Probe {
    pub id: Uuid,
    pub display_name: String,
    pub hostname: Option<String>,
    pub ip: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
    pub status: ProbeStatus,
    #[typeshare(serialized_as = "number")]
    pub last_seen_ms: i64,
    #[typeshare(serialized_as = "number")]
    pub registered_at_ms: i64,
}

/// Coarse online/offline indicator derived from liveness, not a wire field.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Online,
    Offline,
}

impl Probe {
    /// Builds the record inserted on first `register`, or the fields
    /// refreshed on a subsequent `register` from the same probe id.
    pub fn from_register(id: Uuid, display_name: String, now_ms: i64) -> Self {
        Self {
            id,
            display_name,
            hostname: None,
            ip: None,
            os: None,
            arch: None,
            version: None,
            status: ProbeStatus::Online,
            last_seen_ms: now_ms,
            registered_at_ms: now_ms,
        }
    }
}
