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

/// Waits until the session table reports exactly `expected` registered
/// sessions, or panics after a generous bound of yields. The server does
/// its registration work on a spawned task, so the test driver has to give
/// it a chance to run rather than observing `count()` synchronously after
/// a send.
async fn wait_for_count(state: &AppState, expected: usize) {
    for _ in 0..200 {
        if state.sessions.count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session count never reached {expected}, saw {}", state.sessions.count());
}

#[tokio::test(flavor = "multi_thread")]
async fn register_displaces_prior_live_session_within_one_second() {
    let (addr, state) = spawn_test_server().await;
    let url = format!("ws://{addr}/api/v1/probes/stream");
    let probe_id = Uuid::new_v4();

    let (mut client_a, _) = tokio_tungstenite::connect_async(&url).await.expect("client a connect");
    client_a.send(register_frame(probe_id)).await.expect("client a register");
    wait_for_count(&state, 1).await;

    let (mut client_b, _) = tokio_tungstenite::connect_async(&url).await.expect("client b connect");
    client_b.send(register_frame(probe_id)).await.expect("client b register");

    let displaced = tokio::time::timeout(Duration::from_secs(1), client_a.next()).await;
    match displaced {
        Ok(Some(Ok(WsMessage::Close(_)))) => {}
        Ok(Some(Err(_))) => {}
        Ok(None) => {}
        other => panic!("expected client a's socket to close within 1s, got {other:?}"),
    }

    assert_eq!(state.sessions.count(), 1, "displacement must not change the registered count");
}
