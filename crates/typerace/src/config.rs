//! Server settings.

use std::time::Duration;

/// Network-side settings for a [`TyperaceServer`](crate::TyperaceServer).
///
/// Race rules live in [`RaceConfig`](typerace_race::RaceConfig); this only
/// covers the listener and connection handling.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long, not even a ping, is
    /// dropped, which removes its racer.
    pub idle_timeout: Duration,

    /// Time a new peer gets to complete the WebSocket upgrade.
    pub handshake_timeout: Duration,

    /// Events that may wait for one slow client. A client that falls
    /// this far behind is disconnected.
    pub outbound_buffer: usize,

    /// Capacity of the dispatcher's command queue. Connection tasks wait
    /// when it is full.
    pub hub_channel_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            idle_timeout: Duration::from_secs(300),
            handshake_timeout: Duration::from_secs(10),
            outbound_buffer: 256,
            hub_channel_size: 256,
        }
    }
}
