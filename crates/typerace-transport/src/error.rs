use std::io;
use std::time::Duration;

/// Errors from listening, upgrading, and moving frames.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bind failed: {0}")]
    BindFailed(#[source] io::Error),

    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),

    /// The peer connected but did not speak the protocol.
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[source] io::Error),

    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    /// Writing to a socket that has already been closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),
}
