//! Error types for the race layer.

use typerace_protocol::{PlayerId, RoomId};

/// Why a race operation was refused.
///
/// None of these reach the client: the dispatcher logs them and carries
/// on, so a stray event from a confused client is simply dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaceError {
    /// The room does not exist (never did, or emptied and was removed).
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The room has no free slot.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player is already racing in a room.
    #[error("player {0} already in room {1}")]
    AlreadyJoined(PlayerId, RoomId),

    /// The player is not in any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// Settings that cannot produce a playable race.
    #[error("invalid race configuration: {0}")]
    InvalidConfig(String),
}
