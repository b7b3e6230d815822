//! [apps/server/src/ingest/handler.rs]
//! Ingest Handler (C5): dispatches one decoded inbound frame to its side
//! effects. Persistence failures are logged and never propagate; a
//! downstream write failure must never tear down the session.

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use warden_domain_models::{
    AlertKind, AuditResult, FrameType, HostSnapshot, InboundFrame, MetricKind, MetricsEnvelope,
    Probe, RegisterPayload,
};

use crate::ingest::converter::convert;
use crate::state::AppState;

/// Dispatches one already-decoded frame. `last_seen_ms` is advanced for
/// every frame type, matching "advanced on every inbound frame" (data model,
/// probe identity).
#[instrument(skip(state, frame))]
pub async fn dispatch_frame(state: &AppState, probe_id: Uuid, frame: InboundFrame) {
    let now_ms = crate::util::now_ms();

    if let Err(error) = state.probes.touch_last_seen(probe_id, now_ms).await {
        warn!(event = "probe_touch_failed", probe_id = %probe_id, error = %error, "failed to advance last_seen_ms");
    }

    match frame.frame_type {
        FrameType::Register => {
            handle_register(state, &frame.data, now_ms).await;
        }
        FrameType::Heartbeat => {
            // last_seen_ms was already advanced above; heartbeat carries no
            // other side effect.
        }
        FrameType::Metrics => handle_metrics(state, probe_id, &frame.data, now_ms).await,
        FrameType::AuditResult => handle_audit_result(state, probe_id, &frame.data, now_ms).await,
        FrameType::CommandAck | FrameType::Other => {
            debug!(event = "frame_ignored", probe_id = %probe_id, frame_type = ?frame.frame_type, "no handler for this frame type");
        }
    }
}

/// Upserts the `Probe` row from a `register` payload and returns its id.
/// Called both from the pre-registration handshake (to learn the probe's
/// identity) and from `dispatch_frame` for any later re-registration.
#[instrument(skip(state, data))]
pub async fn handle_register(state: &AppState, data: &Value, now_ms: i64) -> Option<Uuid> {
    let payload: RegisterPayload = match serde_json::from_value(data.clone()) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(event = "register_decode_error", error = %error, "malformed register payload");
            return None;
        }
    };

    let display_name = payload.display_name.clone().unwrap_or_else(|| payload.id.to_string());
    let mut probe = Probe::from_register(payload.id, display_name, now_ms);
    probe.hostname = payload.hostname;
    probe.ip = payload.ip;
    probe.os = payload.os;
    probe.arch = payload.arch;
    probe.version = payload.version;

    if let Err(error) = state.probes.upsert_on_register(&probe).await {
        error!(event = "probe_upsert_failed", probe_id = %probe.id, error = %error, "failed to persist probe registration");
        return None;
    }

    info!(event = "probe_status_online", probe_id = %probe.id, "probe registered, status online");
    Some(probe.id)
}

async fn handle_metrics(state: &AppState, probe_id: Uuid, data: &Value, now_ms: i64) {
    let envelope: MetricsEnvelope = match serde_json::from_value(data.clone()) {
        Ok(envelope) => envelope,
        Err(error) => {
            debug!(event = "metrics_decode_error", probe_id = %probe_id, error = %error, "malformed metrics envelope");
            return;
        }
    };

    if envelope.kind == MetricKind::HostInfo {
        handle_host_info(state, probe_id, &envelope.data, now_ms).await;
        return;
    }

    let samples = convert(probe_id, envelope.kind, &envelope.data, envelope.timestamp);
    if !samples.is_empty() {
        if let Err(error) = state.timeseries.write(&samples).await {
            warn!(event = "timeseries_write_failed", probe_id = %probe_id, error = %error, "dropping batch after retry");
        }
    }

    if let Some((kind, value)) = primary_scalar(envelope.kind, &envelope.data) {
        state.evaluator.evaluate(probe_id, kind, value, now_ms).await;
    }
}

/// Extracts the single scalar fed to the Alert Evaluator for the kinds it
/// watches. Disk uses the maximum mount-point usage across all mounts in
/// the frame; `network_down` is derived from a `status` field on the
/// `network` body rather than a distinct wire kind.
fn primary_scalar(kind: MetricKind, body: &Value) -> Option<(AlertKind, f64)> {
    match kind {
        MetricKind::Cpu => Some((AlertKind::Cpu, body.get("usage_percent").and_then(Value::as_f64).unwrap_or(0.0))),
        MetricKind::Memory => {
            Some((AlertKind::Memory, body.get("usage_percent").and_then(Value::as_f64).unwrap_or(0.0)))
        }
        MetricKind::Disk => {
            let max_usage = body
                .get("mounts")
                .and_then(Value::as_array)
                .map(|mounts| {
                    mounts
                        .iter()
                        .map(|mount| mount.get("usage_percent").and_then(Value::as_f64).unwrap_or(0.0))
                        .fold(0.0_f64, f64::max)
                })
                .unwrap_or(0.0);
            Some((AlertKind::Disk, max_usage))
        }
        MetricKind::Network => {
            let is_down = body.get("status").and_then(Value::as_str).map(|s| s == "down").unwrap_or(false);
            Some((AlertKind::NetworkDown, if is_down { 1.0 } else { 0.0 }))
        }
        _ => None,
    }
}

async fn handle_host_info(state: &AppState, probe_id: Uuid, data: &Value, now_ms: i64) {
    let snapshot = HostSnapshot {
        probe_id,
        hostname: data.get("hostname").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        platform: data.get("platform").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        kernel_version: data.get("kernel_version").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        uptime_s: data.get("uptime_s").and_then(Value::as_i64).unwrap_or(0),
        boot_time_s: data.get("boot_time_s").and_then(Value::as_i64).unwrap_or(0),
        process_count: data.get("process_count").and_then(Value::as_u64).unwrap_or(0) as u32,
    };

    if let Err(error) = state.host_snapshots.upsert(&snapshot, now_ms).await {
        warn!(event = "host_snapshot_upsert_failed", probe_id = %probe_id, error = %error, "failed to persist host snapshot");
    }
}

async fn handle_audit_result(state: &AppState, probe_id: Uuid, data: &Value, now_ms: i64) {
    let result = AuditResult { probe_id, received_at_ms: now_ms, payload: data.clone() };
    if let Err(error) = state.audit_results.insert(&result).await {
        warn!(event = "audit_result_insert_failed", probe_id = %probe_id, error = %error, "failed to persist audit result");
    }
}
