// [libs/domain/models/src/host.rs]
/*!
 * Supplementary per-probe records: the latest host snapshot (only one is
 * retained per probe) and opaque passthrough audit results.
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Upsert target of a `host_info` frame. Seconds-based fields (`uptime_s`,
/// `boot_time_s`) are never mixed with the millisecond timestamps used
/// everywhere else in the system.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSnapshot {
    pub probe_id: Uuid,
    pub hostname: String,
    pub platform: String,
    pub kernel_version: String,
    #[typeshare(serialized_as = "number")]
    pub uptime_s: i64,
    #[typeshare(serialized_as = "number")]
    pub boot_time_s: i64,
    pub process_count: u32,
}

/// Passthrough record for `audit_result` frames; the payload is opaque to
/// the core and stored verbatim.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditResult {
    pub probe_id: Uuid,
    #[typeshare(serialized_as = "number")]
    pub received_at_ms: i64,
    pub payload: serde_json::Value,
}
