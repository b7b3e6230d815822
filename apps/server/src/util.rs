//! [apps/server/src/util.rs]
//! Small cross-module helpers that don't warrant their own module.

/// Current wall-clock time in milliseconds since epoch, the unit every
/// timestamp in this system is carried in.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
