//! WebSocket transport for the `newNotification` subscription.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, warn};

use crate::errors::NotifyError;
use crate::services::session::{Session, SessionState};
use crate::state::app::AppState;

/// Missed pong rounds after which the peer counts as gone.
const MAX_MISSED_PONGS: u32 = 2;

/// GET /notifications/subscribe (WebSocket upgrade)
///
/// Each text frame sent to the client is one `{"label": "..."}` payload.
pub async fn new_notification(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let ping_every = Duration::from_secs(state.config.ws_ping_interval_secs.max(1));

    // Registered before the 101 response goes out, so anything pushed after the
    // client sees the handshake complete is delivered. If the upgrade never
    // happens the closure is dropped and the session unsubscribes itself.
    let session = state.gateway.new_notification();

    ws.on_upgrade(move |socket| handle_socket(socket, session, ping_every))
}

/// True once no pong has been seen for `MAX_MISSED_PONGS` ping intervals.
fn peer_unresponsive(last_pong: Instant, now: Instant, ping_every: Duration) -> bool {
    now.saturating_duration_since(last_pong) > ping_every * MAX_MISSED_PONGS
}

async fn handle_socket(socket: WebSocket, mut session: Session, ping_every: Duration) {
    let subscriber = session.id();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let last_pong = Arc::new(Mutex::new(Instant::now()));

    debug!(subscriber = %subscriber, "subscription socket opened");

    // Client -> server: pongs and the peer going away.
    let canceller = session.canceller();
    let reader_pong = last_pong.clone();
    let reader = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Pong(_)) => *reader_pong.lock() = Instant::now(),
                Ok(_) => {}
                Err(e) => {
                    debug!(subscriber = %subscriber, error = %e, "subscription socket error");
                    break;
                }
            }
        }
        debug!(
            subscriber = %subscriber,
            reason = %NotifyError::TransportDisconnected,
            "cancelling subscription"
        );
        canceller.cancel();
    });

    let mut ping_interval = interval(ping_every);
    // Skip the first immediate tick
    ping_interval.tick().await;

    loop {
        tokio::select! {
            event = session.next() => {
                let Some(event) = event else {
                    break;
                };
                match serde_json::to_string(&*event) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json)).await.is_err() {
                            debug!(subscriber = %subscriber, "send failed, client disconnected");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(subscriber = %subscriber, "Failed to serialize notification: {}", e);
                    }
                }
            }

            _ = ping_interval.tick() => {
                let last = *last_pong.lock();
                if peer_unresponsive(last, Instant::now(), ping_every) {
                    debug!(subscriber = %subscriber, "no pong from client, dropping subscription");
                    break;
                }
                if ws_sender.send(Message::Ping(Vec::new())).await.is_err() {
                    debug!(subscriber = %subscriber, "ping failed, client disconnected");
                    break;
                }
            }
        }
    }

    let closed_by_broker = session.state() == SessionState::ClosedByBroker;
    session.cancel();
    reader.abort();

    if closed_by_broker {
        // Server-side close (shutdown): tell the client instead of just dropping the socket.
        let _ = ws_sender.send(Message::Close(None)).await;
    }

    debug!(subscriber = %subscriber, "subscription socket closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_within_window_keeps_peer() {
        let start = Instant::now();
        let every = Duration::from_secs(10);
        assert!(!peer_unresponsive(start, start, every));
        assert!(!peer_unresponsive(start, start + every * 2, every));
    }

    #[test]
    fn missing_pongs_mark_peer_unresponsive() {
        let start = Instant::now();
        let every = Duration::from_secs(10);
        assert!(peer_unresponsive(start, start + every * 2 + Duration::from_millis(1), every));
    }

    #[test]
    fn clock_before_last_pong_is_not_unresponsive() {
        let now = Instant::now();
        let later = now + Duration::from_secs(5);
        assert!(!peer_unresponsive(later, now, Duration::from_secs(1)));
    }
}
