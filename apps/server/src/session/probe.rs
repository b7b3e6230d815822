//! [apps/server/src/session/probe.rs]
//! Probe Session (C4): per-connection state machine `accepted -> registered
//! -> closed` and the two loops (read, write) that drive one socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use warden_domain_models::InboundFrame;

use crate::ingest::handler::dispatch_frame;
use crate::session::manager::{SessionHandle, SEND_QUEUE_CAPACITY};
use crate::state::AppState;
use crate::util::now_ms;

const INITIAL_READ_DEADLINE: Duration = Duration::from_secs(60);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Drives one accepted socket from `accepted` through to `closed`. Returns
/// once the session has fully unwound: both loops have stopped and, if the
/// probe ever registered, it has been removed from the session table.
#[instrument(skip(socket, state, shutdown))]
pub async fn run_probe_session(socket: WebSocket, state: AppState, mut shutdown: watch::Receiver<bool>) {
    let (mut sink, mut stream) = socket.split();

    let probe_id = match await_registration(&mut stream, &state).await {
        Some(id) => id,
        None => {
            let _ = sink.close().await;
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(SEND_QUEUE_CAPACITY);
    let session_handle = SessionHandle::new(outbound_tx);
    state.sessions.register(probe_id, session_handle.clone());

    let write_task = tokio::spawn(async move {
        let mut ping_ticker = tokio::time::interval(PING_INTERVAL);
        loop {
            tokio::select! {
                maybe_frame = outbound_rx.recv() => {
                    match maybe_frame {
                        Some(Message::Close(_)) | None => {
                            let _ = tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Close(None))).await;
                            break;
                        }
                        Some(frame) => {
                            if tokio::time::timeout(WRITE_DEADLINE, sink.send(frame)).await.is_err() {
                                warn!(event = "session_write_timeout", probe_id = %probe_id, "write deadline exceeded");
                                break;
                            }
                        }
                    }
                }
                _ = ping_ticker.tick() => {
                    if tokio::time::timeout(WRITE_DEADLINE, sink.send(Message::Ping(Vec::new()))).await.is_err() {
                        warn!(event = "session_ping_timeout", probe_id = %probe_id, "ping write deadline exceeded");
                        break;
                    }
                }
            }
        }
    });

    let read_loop = read_loop(probe_id, &mut stream, &state, &session_handle);

    tokio::select! {
        () = read_loop => {}
        _ = shutdown.changed() => {
            info!(event = "session_shutdown_cancel", probe_id = %probe_id, "root shutdown signal, closing session");
        }
        _ = session_handle.closed() => {
            info!(event = "session_closed_externally", probe_id = %probe_id, "session closed by displacement or liveness eviction");
        }
    }

    session_handle.close("read_loop_exited");
    write_task.abort();
    state.sessions.unregister(probe_id, &session_handle);
}

/// Reads frames until the session's registered probe sends a `register`
/// frame or the initial read deadline elapses. Frames received before
/// registration other than `register` are a protocol violation and close
/// the session.
///
/// Only this pre-registration read carries a fixed deadline. Once
/// registered, liveness is the supervisor's job: `read_loop` blocks
/// indefinitely on the socket and is torn down either by the peer closing
/// it or by [`SessionHandle::closed`] firing from a supervisor eviction or
/// a displacing registration.
async fn await_registration(
    stream: &mut futures_util::stream::SplitStream<WebSocket>,
    state: &AppState,
) -> Option<Uuid> {
    let message = match tokio::time::timeout(INITIAL_READ_DEADLINE, stream.next()).await {
        Ok(Some(Ok(message))) => message,
        Ok(Some(Err(error))) => {
            info!(event = "session_accept_error", error = %error, "read error before registration");
            return None;
        }
        Ok(None) => {
            info!(event = "session_accept_closed", "peer closed before registering");
            return None;
        }
        Err(_) => {
            info!(event = "session_accept_timeout", "no register frame within read deadline");
            return None;
        }
    };

    let Message::Text(text) = message else {
        warn!(event = "session_accept_non_text", "first frame was not text, closing");
        return None;
    };

    let frame: InboundFrame = match serde_json::from_str(&text) {
        Ok(frame) => frame,
        Err(error) => {
            warn!(event = "session_accept_decode_error", error = %error, "malformed envelope before registration");
            return None;
        }
    };

    if frame.frame_type != warden_domain_models::FrameType::Register {
        warn!(event = "session_accept_protocol_violation", "first frame was not register, closing");
        return None;
    }

    crate::ingest::handler::handle_register(state, &frame.data, now_ms()).await
}

async fn read_loop(
    probe_id: Uuid,
    stream: &mut futures_util::stream::SplitStream<WebSocket>,
    state: &AppState,
    session_handle: &SessionHandle,
) {
    session_handle.touch();

    loop {
        match stream.next().await {
            Some(Ok(Message::Pong(_))) => {
                session_handle.touch();
            }
            Some(Ok(Message::Close(_))) => {
                info!(event = "session_closed_by_peer", probe_id = %probe_id, "peer sent close frame");
                return;
            }
            Some(Ok(Message::Text(text))) => {
                session_handle.touch();
                match serde_json::from_str::<InboundFrame>(&text) {
                    Ok(frame) => dispatch_frame(state, probe_id, frame).await,
                    Err(error) => {
                        debug!(event = "frame_decode_error", probe_id = %probe_id, error = %error, "skipping malformed frame");
                    }
                }
            }
            Some(Ok(_)) => {
                // Binary/other frame kinds are not part of the protocol; touch
                // liveness and otherwise ignore.
                session_handle.touch();
            }
            Some(Err(error)) => {
                info!(event = "session_read_error", probe_id = %probe_id, error = %error, "read error, terminating session");
                return;
            }
            None => {
                info!(event = "session_read_eof", probe_id = %probe_id, "peer closed the socket");
                return;
            }
        }
    }
}
