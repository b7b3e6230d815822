use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;
use warden_server::config::{DatabaseConfig, NotificationConfig, RetentionConfig, TimeSeriesConfig, WardenConfig};
use warden_server::routes::build_router;
use warden_server::state::AppState;

async fn spawn_test_server() -> (SocketAddr, AppState) {
    let config = WardenConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        database: DatabaseConfig { url: ":memory:".to_string(), auth_token: None },
        timeseries: TimeSeriesConfig { base_url: "http://127.0.0.1:9".to_string() },
        retention: RetentionConfig::default(),
        notification: NotificationConfig::default(),
    };

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let state = AppState::new(&config, shutdown_rx).await.expect("state build");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let router = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (addr, state)
}

fn register_frame(probe_id: Uuid) -> WsMessage {
    WsMessage::Text(serde_json::json!({"type": "register", "data": {"id": probe_id}}).to_string())
}

async fn wait_for_count(state: &AppState, expected: usize) {
    for _ in 0..200 {
        if state.sessions.count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session count never reached {expected}, saw {}", state.sessions.count());
}

/// S6: a session silent past the liveness timeout is evicted by the
/// supervisor's sweep, and the read loop it was driving unwinds with an
/// I/O error rather than lingering on the socket.
#[tokio::test]
async fn silent_session_is_evicted_past_the_liveness_window() {
    tokio::time::pause();

    let (addr, state) = spawn_test_server().await;
    let url = format!("ws://{addr}/api/v1/probes/stream");
    let probe_id = Uuid::new_v4();

    let (mut client, _) = tokio_tungstenite::connect_async(&url).await.expect("client connect");
    client.send(register_frame(probe_id)).await.expect("register");
    wait_for_count(&state, 1).await;

    // t0 + 130s: past LIVENESS_TIMEOUT_MS with no further frames sent.
    tokio::time::advance(Duration::from_millis(130_000)).await;
    state.sessions.run_eviction_sweep_now();

    assert_eq!(state.sessions.count(), 0, "stale session must be evicted from the table");

    let closed = tokio::time::timeout(Duration::from_secs(2), client.next()).await;
    match closed {
        Ok(Some(Ok(WsMessage::Close(_)))) => {}
        Ok(Some(Err(_))) => {}
        Ok(None) => {}
        other => panic!("expected the evicted client's socket to close, got {other:?}"),
    }
}
