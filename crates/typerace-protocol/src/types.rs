//! Event and identifier types for the Typerace wire format.
//!
//! Field names on the wire are camelCase and event names snake_case, the
//! shape browser clients of the race already speak.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use typerace_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a racer. One per connection: the server derives it from the
/// transport's [`ConnectionId`], there is no login.
///
/// Serialized as a plain number, so in a `players_update` map the keys
/// read `"7"`, `"8"`, ...
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// Identifies a live room. Short and opaque; only unique among rooms that
/// currently exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// Clients compare `start_timer` against their own `Date.now()`, so this is
/// deliberately wall time and not a monotonic `Instant`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Reads the system clock. A clock before 1970 reads as 0.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`; zero if `earlier` is later.
    pub fn since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who an outbound event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Only this racer.
    Player(PlayerId),
    /// Every racer currently in the room.
    Room(RoomId),
}

// ---------------------------------------------------------------------------
// Player snapshot
// ---------------------------------------------------------------------------

/// One racer as seen by every client in the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub username: String,
    /// Fraction of the passage typed, in `[0, 1]`.
    pub progress: f64,
    pub typed_text: String,
    pub finished: bool,
    pub start_typing_time: Option<Timestamp>,
    pub wpm: u32,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events a client sends.
///
/// ```text
/// {"event":"join","data":{"username":"ann"}}
/// {"event":"join","data":{"username":"ann","roomId":"k3x9qa"}}
/// {"event":"progress","data":{"typedText":"Typing R"}}
/// {"event":"restart","data":"k3x9qa"}
/// {"event":"leave"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Enter a race. With `room_id`, that room; otherwise matchmaking.
    Join {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
    },

    /// The racer's whole input buffer after a keystroke.
    Progress { typed_text: String },

    /// Reset the race in the given room.
    Restart(RoomId),

    /// Leave the current room without closing the connection.
    Leave,
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Tells a joiner which room it landed in.
    RoomJoined { room_id: RoomId },

    /// The passage to type.
    Text(String),

    /// Every racer in the room, keyed by player id.
    PlayersUpdate(BTreeMap<PlayerId, PlayerSnapshot>),

    /// The race clock started at this instant.
    StartTimer(Timestamp),

    /// Whether the sender's buffer is still a prefix of the passage.
    TypingFeedback { is_correct: bool },

    /// A racer completed the passage.
    GameFinished { winner: String, wpm: u32 },

    /// The race was reset; a new `text` and `start_timer` accompany it.
    Restart,
}

impl ServerEvent {
    /// The wire name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomJoined { .. } => "room_joined",
            Self::Text(_) => "text",
            Self::PlayersUpdate(_) => "players_update",
            Self::StartTimer(_) => "start_timer",
            Self::TypingFeedback { .. } => "typing_feedback",
            Self::GameFinished { .. } => "game_finished",
            Self::Restart => "restart",
        }
    }
}

#[cfg(test)]
mod tests {
    //! The browser client matches on these exact JSON shapes.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
    }

    #[test]
    fn test_player_id_from_connection_id() {
        assert_eq!(PlayerId::from(ConnectionId::new(9)), PlayerId(9));
        assert_eq!(PlayerId(9).to_string(), "P-9");
    }

    #[test]
    fn test_room_id_serializes_as_plain_string() {
        let id = RoomId::new("k3x9qa");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("k3x9qa"));
        assert_eq!(id.to_string(), "k3x9qa");
    }

    #[test]
    fn test_timestamp_since_saturates() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(61_000);
        assert_eq!(b.since(a), Duration::from_secs(60));
        assert_eq!(a.since(b), Duration::ZERO);
        assert_eq!(a + Duration::from_millis(500), Timestamp::from_millis(1_500));
    }

    #[test]
    fn test_timestamp_now_is_after_2020() {
        assert!(Timestamp::now().as_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_join_without_room_id() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "join", "data": {"username": "ann"}}))
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::Join {
                username: "ann".into(),
                room_id: None
            }
        );
    }

    #[test]
    fn test_join_with_room_id_uses_camel_case() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "join",
            "data": {"username": "ann", "roomId": "abc123"}
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Join {
                username: "ann".into(),
                room_id: Some(RoomId::new("abc123")),
            }
        );
    }

    #[test]
    fn test_progress_uses_typed_text_field() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "progress",
            "data": {"typedText": "Typ"}
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Progress {
                typed_text: "Typ".into()
            }
        );
    }

    #[test]
    fn test_restart_carries_bare_room_id() {
        let event: ClientEvent =
            serde_json::from_value(json!({"event": "restart", "data": "abc123"})).unwrap();
        assert_eq!(event, ClientEvent::Restart(RoomId::new("abc123")));
    }

    #[test]
    fn test_leave_has_no_data() {
        let event: ClientEvent = serde_json::from_value(json!({"event": "leave"})).unwrap();
        assert_eq!(event, ClientEvent::Leave);
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_value(json!({"event": "chat", "data": "hi"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_players_update_json_shape() {
        let mut players = BTreeMap::new();
        players.insert(
            PlayerId(7),
            PlayerSnapshot {
                username: "ann".into(),
                progress: 0.5,
                typed_text: "ab".into(),
                finished: false,
                start_typing_time: Some(Timestamp::from_millis(10)),
                wpm: 30,
            },
        );
        let value = serde_json::to_value(ServerEvent::PlayersUpdate(players)).unwrap();

        assert_eq!(value["event"], "players_update");
        let ann = &value["data"]["7"];
        assert_eq!(ann["username"], "ann");
        assert_eq!(ann["progress"], 0.5);
        assert_eq!(ann["typedText"], "ab");
        assert_eq!(ann["finished"], false);
        assert_eq!(ann["startTypingTime"], 10);
        assert_eq!(ann["wpm"], 30);
    }

    #[test]
    fn test_typing_feedback_json_shape() {
        let value =
            serde_json::to_value(ServerEvent::TypingFeedback { is_correct: false }).unwrap();
        assert_eq!(value, json!({"event": "typing_feedback", "data": {"isCorrect": false}}));
    }

    #[test]
    fn test_game_finished_json_shape() {
        let value = serde_json::to_value(ServerEvent::GameFinished {
            winner: "ann".into(),
            wpm: 71,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "game_finished", "data": {"winner": "ann", "wpm": 71}})
        );
    }

    #[test]
    fn test_start_timer_and_room_joined_json_shape() {
        let value =
            serde_json::to_value(ServerEvent::StartTimer(Timestamp::from_millis(1234))).unwrap();
        assert_eq!(value, json!({"event": "start_timer", "data": 1234}));

        let value = serde_json::to_value(ServerEvent::RoomJoined {
            room_id: RoomId::new("abc123"),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"event": "room_joined", "data": {"roomId": "abc123"}})
        );
    }

    #[test]
    fn test_server_event_name_matches_wire_tag() {
        let events = [
            ServerEvent::Text("x".into()),
            ServerEvent::Restart,
            ServerEvent::TypingFeedback { is_correct: true },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }
}
