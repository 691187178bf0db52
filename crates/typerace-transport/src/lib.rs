//! Transport layer for Typerace.
//!
//! Accepting a client happens in two steps. [`Transport::accept`] hands back
//! a raw [`Incoming`] as soon as a peer connects; [`Incoming::upgrade`] then
//! runs the protocol handshake inside the connection's own task, so one slow
//! or silent client never holds up the accept loop. The upgraded
//! [`Connection`] is a framed, bidirectional pipe of byte payloads.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, PendingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a connection. Ids handed out by [`ConnectionId::next`] are
/// never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a fresh id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One successful read from a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An application payload.
    Data(Vec<u8>),
    /// A protocol-level ping or pong. Carries nothing for the application
    /// but shows the peer is still there.
    Keepalive,
}

/// A listener producing not-yet-upgraded peers.
pub trait Transport: Send + Sync + 'static {
    type Incoming: Incoming<Error = Self::Error>;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer. Does no protocol work.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;
}

/// A peer that has connected but not yet completed the handshake.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Completes the protocol handshake.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single framed connection.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// a connection is read by its handler loop while race broadcasts are
/// written to it from the outbound task.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next inbound frame. `Ok(None)` once the peer has closed.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    fn peer_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_next_connection_ids_are_distinct_and_increasing() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(b > a);
        assert_ne!(a.into_inner(), 0);
    }
}
