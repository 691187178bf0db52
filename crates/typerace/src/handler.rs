//! Per-connection handler: frame decoding and event forwarding.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow, after the WebSocket upgrade:
//!   1. Attach an outbound channel to the hub under the connection's id
//!   2. Spawn a writer that encodes hub events onto the socket
//!   3. Loop: receive frames, decode client events, forward to the hub
//!   4. On close, timeout, or error, detach so the racer is removed
//!
//! The writer also ends when the hub gives up on a client that stopped
//! reading. The read loop then stops too and the socket is closed.

use std::sync::Arc;

use tokio::sync::mpsc;
use typerace_protocol::{ClientEvent, Codec, PlayerId, ServerEvent};
use typerace_race::Command;
use typerace_transport::{Connection, Frame, WebSocketConnection};

use crate::TyperaceError;
use crate::hub::HubHandle;
use crate::server::ServerState;

/// Drop guard that detaches a player from the hub when the handler exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the detach
/// is sent from a fire-and-forget task.
struct DetachGuard {
    player_id: PlayerId,
    hub: HubHandle,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            let _ = hub.detach(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TyperaceError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let player_id = PlayerId::from(conn.id());
    tracing::debug!(%player_id, peer = %conn.peer_addr(), "handling new connection");

    let (tx, rx) = mpsc::channel(state.config.outbound_buffer.max(1));
    state.hub.attach(player_id, tx).await?;
    let guard = DetachGuard {
        player_id,
        hub: state.hub.clone(),
    };

    let mut writer = tokio::spawn(write_events(
        Arc::clone(&conn),
        state.codec.clone(),
        player_id,
        rx,
    ));

    let mut writer_done = false;
    loop {
        let received = tokio::select! {
            received = tokio::time::timeout(state.config.idle_timeout, conn.recv()) => received,
            _ = &mut writer => {
                tracing::info!(%player_id, "outbound stream ended, closing connection");
                writer_done = true;
                break;
            }
        };

        let data = match received {
            Ok(Ok(Some(Frame::Data(data)))) => data,
            // Pings count as activity; restarting the loop resets the timer.
            Ok(Ok(Some(Frame::Keepalive))) => continue,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection timed out");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "ignoring undecodable frame");
                continue;
            }
        };

        state.hub.dispatch(player_id, Command::from(event)).await?;
    }

    // The writer stops once the hub drops this player's sender.
    drop(guard);
    if !writer_done {
        let _ = writer.await;
    }
    let _ = conn.close().await;
    Ok(())
}

/// Drains the player's outbound channel onto the socket.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    codec: C,
    player_id: PlayerId,
    mut rx: mpsc::Receiver<ServerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%player_id, event = event.name(), error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%player_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
