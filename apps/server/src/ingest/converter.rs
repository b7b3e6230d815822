//! [apps/server/src/ingest/converter.rs]
//! Metric Converter (C2): a pure function translating a probe-native
//! metrics body into labelled samples. Never fails on unknown fields;
//! unknown kinds are logged and dropped by the caller.

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;
use warden_domain_models::{MetricKind, Sample};

/// Converts one `(probe_id, kind, body, ts_ms)` tuple into zero or more
/// samples. `host_info` never produces samples here — its side effect is a
/// host snapshot upsert, handled directly by the ingest handler.
pub fn convert(probe_id: Uuid, kind: MetricKind, body: &Value, ts_ms: i64) -> Vec<Sample> {
    let agent_id = probe_id.to_string();

    match kind {
        MetricKind::Cpu => convert_cpu(&agent_id, body, ts_ms),
        MetricKind::Memory => convert_memory(&agent_id, body, ts_ms),
        MetricKind::Disk => convert_disk(&agent_id, body, ts_ms),
        MetricKind::Network => convert_network(&agent_id, body, ts_ms),
        MetricKind::NetworkConn => convert_network_conn(&agent_id, body, ts_ms),
        MetricKind::DiskIo => convert_disk_io(&agent_id, body, ts_ms),
        MetricKind::Gpu => convert_gpu(&agent_id, body, ts_ms),
        MetricKind::Temperature => convert_temperature(&agent_id, body, ts_ms),
        MetricKind::Load => convert_load(&agent_id, body, ts_ms),
        MetricKind::Monitor => convert_monitor(&agent_id, body, ts_ms),
        MetricKind::HostInfo => Vec::new(),
        MetricKind::Unknown => {
            debug!(event = "metric_kind_unknown", probe_id = %probe_id, "dropping frame with unknown metric kind");
            Vec::new()
        }
    }
}

fn f64_field(body: &Value, key: &str) -> f64 {
    body.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn str_field<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

fn items<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn convert_cpu(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    vec![
        Sample::new("cpu_usage_percent", agent_id, f64_field(body, "usage_percent"), ts_ms),
        Sample::new("cpu_cores_logical", agent_id, f64_field(body, "cores_logical"), ts_ms),
        Sample::new("cpu_cores_physical", agent_id, f64_field(body, "cores_physical"), ts_ms),
    ]
}

fn convert_memory(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    vec![
        Sample::new("memory_usage_percent", agent_id, f64_field(body, "usage_percent"), ts_ms),
        Sample::new("memory_total_bytes", agent_id, f64_field(body, "total_bytes"), ts_ms),
        Sample::new("memory_used_bytes", agent_id, f64_field(body, "used_bytes"), ts_ms),
        Sample::new("memory_available_bytes", agent_id, f64_field(body, "available_bytes"), ts_ms),
        Sample::new("memory_swap_total_bytes", agent_id, f64_field(body, "swap_total_bytes"), ts_ms),
        Sample::new("memory_swap_used_bytes", agent_id, f64_field(body, "swap_used_bytes"), ts_ms),
    ]
}

fn convert_disk(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    items(body, "mounts")
        .iter()
        .flat_map(|mount| {
            let mount_point = str_field(mount, "mount_point").to_string();
            [
                Sample::new("disk_usage_percent", agent_id, f64_field(mount, "usage_percent"), ts_ms),
                Sample::new("disk_total_bytes", agent_id, f64_field(mount, "total_bytes"), ts_ms),
                Sample::new("disk_used_bytes", agent_id, f64_field(mount, "used_bytes"), ts_ms),
                Sample::new("disk_free_bytes", agent_id, f64_field(mount, "free_bytes"), ts_ms),
            ]
            .into_iter()
            .map(move |sample| sample.with_label("mount_point", mount_point.clone()))
            .collect::<Vec<_>>()
        })
        .collect()
}

fn convert_network(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    items(body, "interfaces")
        .iter()
        .flat_map(|iface| {
            let interface = str_field(iface, "interface").to_string();
            [
                Sample::new("network_sent_bytes_rate", agent_id, f64_field(iface, "sent_bytes_rate"), ts_ms),
                Sample::new("network_sent_bytes_total", agent_id, f64_field(iface, "sent_bytes_total"), ts_ms),
                Sample::new("network_recv_bytes_rate", agent_id, f64_field(iface, "recv_bytes_rate"), ts_ms),
                Sample::new("network_recv_bytes_total", agent_id, f64_field(iface, "recv_bytes_total"), ts_ms),
            ]
            .into_iter()
            .map(move |sample| sample.with_label("interface", interface.clone()))
            .collect::<Vec<_>>()
        })
        .collect()
}

fn convert_network_conn(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    vec![
        Sample::new("network_conn_established", agent_id, f64_field(body, "established"), ts_ms),
        Sample::new("network_conn_syn_sent", agent_id, f64_field(body, "syn_sent"), ts_ms),
        Sample::new("network_conn_syn_recv", agent_id, f64_field(body, "syn_recv"), ts_ms),
        Sample::new("network_conn_time_wait", agent_id, f64_field(body, "time_wait"), ts_ms),
        Sample::new("network_conn_close_wait", agent_id, f64_field(body, "close_wait"), ts_ms),
        Sample::new("network_conn_total", agent_id, f64_field(body, "total"), ts_ms),
    ]
}

fn convert_disk_io(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    let devices = items(body, "devices");
    let read_rate: f64 = devices.iter().map(|d| f64_field(d, "read_bytes_rate")).sum();
    let write_rate: f64 = devices.iter().map(|d| f64_field(d, "write_bytes_rate")).sum();

    vec![
        Sample::new("disk_read_bytes_rate", agent_id, read_rate, ts_ms),
        Sample::new("disk_write_bytes_rate", agent_id, write_rate, ts_ms),
    ]
}

fn convert_gpu(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    items(body, "devices")
        .iter()
        .enumerate()
        .flat_map(|(index, device)| {
            let gpu_index = device
                .get("index")
                .and_then(Value::as_i64)
                .unwrap_or(index as i64)
                .to_string();
            let gpu_name = str_field(device, "name").to_string();
            [
                Sample::new("gpu_utilization_percent", agent_id, f64_field(device, "utilization_percent"), ts_ms),
                Sample::new("gpu_memory_total_bytes", agent_id, f64_field(device, "memory_total_bytes"), ts_ms),
                Sample::new("gpu_memory_used_bytes", agent_id, f64_field(device, "memory_used_bytes"), ts_ms),
                Sample::new("gpu_temperature_celsius", agent_id, f64_field(device, "temperature_celsius"), ts_ms),
                Sample::new("gpu_power_draw_watts", agent_id, f64_field(device, "power_draw_watts"), ts_ms),
            ]
            .into_iter()
            .map({
                let gpu_index = gpu_index.clone();
                let gpu_name = gpu_name.clone();
                move |sample| sample.with_label("gpu_index", gpu_index.clone()).with_label("gpu_name", gpu_name.clone())
            })
            .collect::<Vec<_>>()
        })
        .collect()
}

fn convert_temperature(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    items(body, "sensors")
        .iter()
        .map(|sensor| {
            let label = str_field(sensor, "label").to_string();
            Sample::new("temperature_celsius", agent_id, f64_field(sensor, "celsius"), ts_ms)
                .with_label("sensor_label", label)
        })
        .collect()
}

/// Not part of the closed naming table in the wire spec; this system still
/// receives a `load` metric kind, so its samples follow the usual
/// unix load-average convention rather than being silently dropped.
fn convert_load(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    vec![
        Sample::new("load_average_1m", agent_id, f64_field(body, "load_1m"), ts_ms),
        Sample::new("load_average_5m", agent_id, f64_field(body, "load_5m"), ts_ms),
        Sample::new("load_average_15m", agent_id, f64_field(body, "load_15m"), ts_ms),
    ]
}

fn convert_monitor(agent_id: &str, body: &Value, ts_ms: i64) -> Vec<Sample> {
    let monitor_id = str_field(body, "monitor_id").to_string();
    let monitor_type = str_field(body, "monitor_type").to_string();
    let target = str_field(body, "target").to_string();

    vec![Sample::new("monitor_response_time_ms", agent_id, f64_field(body, "response_time_ms"), ts_ms)
        .with_label("monitor_id", monitor_id)
        .with_label("monitor_type", monitor_type)
        .with_label("target", target)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cpu_is_a_pure_function_of_its_inputs() {
        let probe_id = Uuid::new_v4();
        let body = json!({ "usage_percent": 82.5, "cores_logical": 8.0, "cores_physical": 4.0 });

        let first = convert(probe_id, MetricKind::Cpu, &body, 1_000);
        let second = convert(probe_id, MetricKind::Cpu, &body, 1_000);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].name, "cpu_usage_percent");
        assert_eq!(first[0].value, 82.5);
        assert_eq!(first[0].labels.get("agent_id").unwrap(), &probe_id.to_string());
    }

    #[test]
    fn disk_emits_one_group_per_mount_with_mount_point_label() {
        let probe_id = Uuid::new_v4();
        let body = json!({
            "mounts": [
                { "mount_point": "/", "usage_percent": 42.0, "total_bytes": 100.0, "used_bytes": 42.0, "free_bytes": 58.0 },
                { "mount_point": "/data", "usage_percent": 10.0, "total_bytes": 200.0, "used_bytes": 20.0, "free_bytes": 180.0 },
            ]
        });

        let samples = convert(probe_id, MetricKind::Disk, &body, 2_000);
        assert_eq!(samples.len(), 8);
        assert_eq!(samples[0].labels.get("mount_point").unwrap(), "/");
        assert_eq!(samples[4].labels.get("mount_point").unwrap(), "/data");
    }

    #[test]
    fn unknown_kind_and_missing_fields_never_panic() {
        let probe_id = Uuid::new_v4();
        let body = json!({ "unexpected": "shape" });
        assert!(convert(probe_id, MetricKind::Unknown, &body, 0).is_empty());
        assert_eq!(convert(probe_id, MetricKind::Cpu, &body, 0).len(), 3);
    }

    #[test]
    fn host_info_never_produces_samples() {
        let probe_id = Uuid::new_v4();
        let samples = convert(probe_id, MetricKind::HostInfo, &json!({}), 0);
        assert!(samples.is_empty());
    }
}
