//! [apps/server/src/session/manager.rs]
//! Owns the set of live probe sessions. The table is guarded by a
//! readers-writer lock; `SendTo`/`Count`/`Clients` take read locks only and
//! never hold the lock across a blocking send.

use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 120 s of silence makes a session eligible for eviction.
pub const LIVENESS_TIMEOUT_MS: i64 = 120_000;
/// Supervisor tick interval.
pub const SUPERVISOR_TICK: Duration = Duration::from_secs(30);
/// Per-session outbound queue capacity.
pub const SEND_QUEUE_CAPACITY: usize = 256;

/// Handle to one live session's outbound queue and liveness clock. Cheap to
/// clone; every clone shares the same underlying queue and flags.
///
/// Liveness is tracked against `tokio::time::Instant` rather than wall-clock
/// time: it is monotonic, immune to clock adjustments, and lets tests drive
/// the liveness window with `tokio::time::pause`/`advance` instead of a real
/// 120 s sleep.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) outbound_tx: mpsc::Sender<Message>,
    last_active: Arc<Mutex<Instant>>,
    closed: Arc<AtomicBool>,
    closed_notify: Arc<Notify>,
}

impl SessionHandle {
    pub fn new(outbound_tx: mpsc::Sender<Message>) -> Self {
        Self {
            outbound_tx,
            last_active: Arc::new(Mutex::new(Instant::now())),
            closed: Arc::new(AtomicBool::new(false)),
            closed_notify: Arc::new(Notify::new()),
        }
    }

    pub fn touch(&self) {
        *self.last_active.lock().expect("liveness clock lock poisoned") = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().expect("liveness clock lock poisoned").elapsed()
    }

    /// One-shot close guard: the first caller to observe `false` performs
    /// the close, every other caller (concurrent displacement, tick
    /// eviction, read-loop teardown) is a no-op.
    pub fn close(&self, reason: &'static str) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.outbound_tx.try_send(Message::Close(None));
        self.closed_notify.notify_one();
        debug!(event = "session_queue_closed", reason, "closing session send queue");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves once `close` has run on this handle, whether that came from
    /// displacement, supervisor eviction, or this session's own teardown.
    /// The owning `run_probe_session` races this so an externally-initiated
    /// close tears the task down immediately instead of waiting out the
    /// read side's own deadline.
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.closed_notify.notified().await;
    }

    /// Identity check used by `Unregister`: two handles refer to the same
    /// physical session iff they share the same closed-flag allocation.
    pub fn same_session_as(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.closed, &other.closed)
    }
}

pub enum SendOutcome {
    Ok,
    NotFound,
    QueueFull,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    registered_total: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()), registered_total: AtomicU64::new(0) }
    }

    /// Atomically displaces any existing session for `probe_id` and
    /// installs `handle`. All work completes before returning; the
    /// displaced handle's socket is closed synchronously.
    #[instrument(skip(self, handle))]
    pub fn register(&self, probe_id: Uuid, handle: SessionHandle) {
        let previous = {
            let mut table = self.sessions.write().expect("session table lock poisoned");
            table.insert(probe_id, handle)
        };

        if let Some(prev) = previous {
            prev.close("displaced_by_new_registration");
        }

        self.registered_total.fetch_add(1, Ordering::Relaxed);
        info!(
            event = "session_registered",
            probe_id = %probe_id,
            total_registrations = self.registered_total.load(Ordering::Relaxed),
            "probe session registered"
        );
    }

    /// Removes the session for `probe_id` iff `handle` is still the
    /// currently-registered one (identity check, not just id), guarding
    /// against a registered-then-displaced session unregistering the
    /// session that replaced it.
    pub fn unregister(&self, probe_id: Uuid, handle: &SessionHandle) {
        let mut table = self.sessions.write().expect("session table lock poisoned");
        if let Some(current) = table.get(&probe_id) {
            if current.same_session_as(handle) {
                table.remove(&probe_id);
            }
        }
    }

    pub fn send_to(&self, probe_id: Uuid, frame: Message) -> SendOutcome {
        let table = self.sessions.read().expect("session table lock poisoned");
        match table.get(&probe_id) {
            None => SendOutcome::NotFound,
            Some(handle) => match handle.outbound_tx.try_send(frame) {
                Ok(()) => SendOutcome::Ok,
                Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::QueueFull,
                Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::NotFound,
            },
        }
    }

    pub fn broadcast(&self, frame: Message) {
        let table = self.sessions.read().expect("session table lock poisoned");
        for (probe_id, handle) in table.iter() {
            if handle.outbound_tx.try_send(frame.clone()).is_err() {
                warn!(event = "broadcast_drop", probe_id = %probe_id, "dropping broadcast frame on full/closed queue");
            }
        }
    }

    pub fn clients(&self) -> Vec<Uuid> {
        self.sessions.read().expect("session table lock poisoned").keys().copied().collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.read().expect("session table lock poisoned").len()
    }

    /// Runs the 30 s supervisor tick forever, evicting sessions silent past
    /// [`LIVENESS_TIMEOUT_MS`]. Membership is re-verified under the write
    /// lock before closing, so a session that re-registers between the scan
    /// and the sweep is not evicted out from under its replacement.
    pub async fn run_supervisor(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(SUPERVISOR_TICK);
        loop {
            ticker.tick().await;
            self.run_eviction_sweep_now();
        }
    }

    fn evict_stale_sessions(&self) {
        let timeout = Duration::from_millis(LIVENESS_TIMEOUT_MS as u64);
        let stale: Vec<Uuid> = {
            let table = self.sessions.read().expect("session table lock poisoned");
            table
                .iter()
                .filter(|(_, handle)| handle.idle_for() > timeout)
                .map(|(probe_id, _)| *probe_id)
                .collect()
        };

        if stale.is_empty() {
            return;
        }

        let mut table = self.sessions.write().expect("session table lock poisoned");
        for probe_id in stale {
            if let Some(handle) = table.get(&probe_id) {
                if handle.idle_for() > timeout {
                    info!(event = "session_evicted", probe_id = %probe_id, "evicting session past liveness timeout");
                    handle.close("liveness_timeout");
                    table.remove(&probe_id);
                }
            }
        }
    }

    /// Runs one eviction pass immediately rather than waiting for the next
    /// supervisor tick. The supervisor uses this internally; it is also the
    /// seam integration tests use to drive liveness eviction deterministically
    /// under `tokio::time::pause`/`advance` instead of a real 120 s wait.
    pub fn run_eviction_sweep_now(&self) {
        self.evict_stale_sessions();
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (SessionHandle, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
        (SessionHandle::new(tx), rx)
    }

    #[test]
    fn register_displaces_prior_session_for_same_probe() {
        let manager = SessionManager::new();
        let probe_id = Uuid::new_v4();

        let (first, _first_rx) = handle();
        manager.register(probe_id, first.clone());
        assert_eq!(manager.count(), 1);

        let (second, _second_rx) = handle();
        manager.register(probe_id, second);
        assert_eq!(manager.count(), 1);
        assert!(first.is_closed());
    }

    #[test]
    fn unregister_is_a_noop_for_a_stale_identity() {
        let manager = SessionManager::new();
        let probe_id = Uuid::new_v4();

        let (first, _first_rx) = handle();
        manager.register(probe_id, first.clone());

        let (second, _second_rx) = handle();
        manager.register(probe_id, second);

        // The displaced handle must not be able to unregister its replacement.
        manager.unregister(probe_id, &first);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn send_to_unknown_probe_is_not_found() {
        let manager = SessionManager::new();
        match manager.send_to(Uuid::new_v4(), Message::Ping(vec![])) {
            SendOutcome::NotFound => {}
            _ => panic!("expected NotFound"),
        }
    }
}
