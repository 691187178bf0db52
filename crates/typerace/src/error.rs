//! Unified error type for the Typerace server.

use typerace_protocol::ProtocolError;
use typerace_race::RaceError;
use typerace_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// The `#[from]` conversions let `?` lift layer errors into this type.
#[derive(Debug, thiserror::Error)]
pub enum TyperaceError {
    /// Connection, send, or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Encode or decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Rejected race configuration.
    #[error(transparent)]
    Race(#[from] RaceError),

    /// The dispatcher task has stopped.
    #[error("race dispatcher is unavailable")]
    HubUnavailable,
}
