//! The room registry: matchmaking, race transitions, and room cleanup.
//!
//! Every operation is a plain state transition that returns the events it
//! produced as [`Effect`]s. Nothing here touches a socket or reads the
//! clock; the caller passes `now` in and delivers the effects afterwards.

use std::collections::HashMap;

use rand::Rng;
use typerace_protocol::{ClientEvent, PlayerId, Recipient, RoomId, ServerEvent, Timestamp};

use crate::room::Room;
use crate::{FinishPolicy, FixedPassage, PassageSource, RaceConfig, RaceError};

/// Characters used in generated room ids.
const ROOM_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of generated room ids.
const ROOM_ID_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Commands and effects
// ---------------------------------------------------------------------------

/// Everything that can happen to a connection, as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join {
        username: String,
        room_id: Option<RoomId>,
    },
    Progress {
        typed_text: String,
    },
    Restart {
        room_id: RoomId,
    },
    Leave,
    /// The transport reported the connection closed.
    Disconnect,
}

impl From<ClientEvent> for Command {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::Join { username, room_id } => Self::Join { username, room_id },
            ClientEvent::Progress { typed_text } => Self::Progress { typed_text },
            ClientEvent::Restart(room_id) => Self::Restart { room_id },
            ClientEvent::Leave => Self::Leave,
        }
    }
}

/// One outbound event and the players it must reach.
///
/// `audience` is resolved when the effect is produced, so a broadcast
/// still reaches the right players after the room itself is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub recipient: Recipient,
    pub audience: Vec<PlayerId>,
    pub event: ServerEvent,
}

pub type Effects = Vec<Effect>;

fn to_player(player_id: PlayerId, event: ServerEvent) -> Effect {
    Effect {
        recipient: Recipient::Player(player_id),
        audience: vec![player_id],
        event,
    }
}

fn to_room(room: &Room, event: ServerEvent) -> Effect {
    Effect {
        recipient: Recipient::Room(room.id().clone()),
        audience: room.members(),
        event,
    }
}

// ---------------------------------------------------------------------------
// RaceRegistry
// ---------------------------------------------------------------------------

/// Owns every live room and knows which room each player is in.
///
/// Not thread-safe by itself; the server keeps it inside a single
/// dispatcher task and feeds it one command at a time.
pub struct RaceRegistry<S: PassageSource = FixedPassage> {
    config: RaceConfig,
    passages: S,

    rooms: HashMap<RoomId, Room>,

    /// Live room ids in creation order; matchmaking scans this.
    order: Vec<RoomId>,

    /// A player is in at most one room at a time.
    player_rooms: HashMap<PlayerId, RoomId>,
}

impl RaceRegistry<FixedPassage> {
    /// A registry serving the built-in passage.
    pub fn new(config: RaceConfig) -> Self {
        Self::with_passages(config, FixedPassage::default())
    }
}

impl<S: PassageSource> RaceRegistry<S> {
    pub fn with_passages(config: RaceConfig, passages: S) -> Self {
        Self {
            config,
            passages,
            rooms: HashMap::new(),
            order: Vec::new(),
            player_rooms: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// Applies one command and returns what to send.
    ///
    /// Refused commands are logged and produce no effects: the client
    /// never hears about them.
    pub fn dispatch(
        &mut self,
        player_id: PlayerId,
        command: Command,
        now: Timestamp,
    ) -> Effects {
        let result = match command {
            Command::Join { username, room_id } => {
                self.join(player_id, username, room_id, now).map(|(_, fx)| fx)
            }
            Command::Progress { typed_text } => {
                self.record_progress(player_id, typed_text, now)
            }
            Command::Restart { room_id } => self.restart(&room_id, now),
            Command::Leave | Command::Disconnect => self.leave(player_id),
        };

        result.unwrap_or_else(|e| {
            tracing::debug!(%player_id, error = %e, "ignoring refused command");
            Vec::new()
        })
    }

    /// Seats a player, either in `room_id` or wherever matchmaking finds
    /// a free slot, creating a room if needed.
    pub fn join(
        &mut self,
        player_id: PlayerId,
        username: String,
        room_id: Option<RoomId>,
        now: Timestamp,
    ) -> Result<(RoomId, Effects), RaceError> {
        if let Some(current) = self.player_rooms.get(&player_id) {
            return Err(RaceError::AlreadyJoined(player_id, current.clone()));
        }

        let room_id = match room_id {
            Some(room_id) => {
                let room = self
                    .rooms
                    .get(&room_id)
                    .ok_or_else(|| RaceError::RoomNotFound(room_id.clone()))?;
                if room.player_count() >= self.config.capacity {
                    return Err(RaceError::RoomFull(room_id));
                }
                room_id
            }
            None => match self.find_open_room() {
                Some(room_id) => room_id,
                None => self.create_room(),
            },
        };

        let threshold = self.config.start_threshold;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| RaceError::RoomNotFound(room_id.clone()))?;

        room.add_player(player_id, username);
        self.player_rooms.insert(player_id, room_id.clone());
        tracing::info!(
            %room_id,
            %player_id,
            players = room.player_count(),
            "player joined"
        );

        let mut effects = vec![
            to_player(
                player_id,
                ServerEvent::RoomJoined {
                    room_id: room_id.clone(),
                },
            ),
            to_player(player_id, ServerEvent::Text(room.passage().to_string())),
            to_room(room, ServerEvent::PlayersUpdate(room.snapshot())),
        ];

        if let Some(started) = room.start_if_ready(threshold, now) {
            tracing::info!(%room_id, players = room.player_count(), "race started");
            effects.push(to_room(room, ServerEvent::StartTimer(started)));
        }

        Ok((room_id, effects))
    }

    /// Removes a player from their room, deleting the room once empty.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<Effects, RaceError> {
        let room_id = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RaceError::NotInRoom(player_id))?;

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Err(RaceError::RoomNotFound(room_id));
        };
        room.remove_player(&player_id);
        tracing::info!(
            %room_id,
            %player_id,
            players = room.player_count(),
            "player left"
        );

        if room.is_empty() {
            self.remove_room(&room_id);
            return Ok(Vec::new());
        }

        Ok(vec![to_room(room, ServerEvent::PlayersUpdate(room.snapshot()))])
    }

    /// Applies a racer's current input buffer.
    pub fn record_progress(
        &mut self,
        player_id: PlayerId,
        typed_text: String,
        now: Timestamp,
    ) -> Result<Effects, RaceError> {
        let room_id = self
            .player_rooms
            .get(&player_id)
            .ok_or(RaceError::NotInRoom(player_id))?;
        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RaceError::RoomNotFound(room_id.clone()))?;

        let already_won = room.winner().is_some();
        let (outcome, player) = room
            .apply_input(player_id, typed_text, self.config.typing_clock, now)
            .ok_or(RaceError::NotInRoom(player_id))?;
        let finish = outcome
            .newly_finished
            .then(|| (player.username.clone(), player.wpm));

        let mut effects = vec![
            to_player(
                player_id,
                ServerEvent::TypingFeedback {
                    is_correct: outcome.on_track,
                },
            ),
            to_room(room, ServerEvent::PlayersUpdate(room.snapshot())),
        ];

        if let Some((winner, wpm)) = finish {
            tracing::info!(
                room_id = %room.id(),
                %player_id,
                wpm,
                place = room.finish_order().len(),
                "racer finished"
            );
            let announce = match self.config.finish_policy {
                FinishPolicy::EveryFinisher => true,
                FinishPolicy::FirstOnly => !already_won,
            };
            if announce {
                effects.push(to_room(room, ServerEvent::GameFinished { winner, wpm }));
            }
        }

        Ok(effects)
    }

    /// Starts a new race epoch in `room_id` with the clock at `now`,
    /// whatever the player count.
    pub fn restart(&mut self, room_id: &RoomId, now: Timestamp) -> Result<Effects, RaceError> {
        if !self.rooms.contains_key(room_id) {
            return Err(RaceError::RoomNotFound(room_id.clone()));
        }
        let passage = self
            .config
            .redraw_on_restart
            .then(|| self.passages.next_passage());

        let room = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| RaceError::RoomNotFound(room_id.clone()))?;
        room.restart(passage, now);
        tracing::info!(%room_id, players = room.player_count(), "race restarted");

        Ok(vec![
            to_room(room, ServerEvent::Text(room.passage().to_string())),
            to_room(room, ServerEvent::Restart),
            to_room(room, ServerEvent::PlayersUpdate(room.snapshot())),
            to_room(room, ServerEvent::StartTimer(now)),
        ])
    }

    /// Looks up a live room.
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// The room a player is in, if any.
    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomId> {
        self.player_rooms.get(player_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Live room ids in creation order.
    pub fn room_ids(&self) -> &[RoomId] {
        &self.order
    }

    fn find_open_room(&self) -> Option<RoomId> {
        self.order
            .iter()
            .find(|id| {
                self.rooms
                    .get(*id)
                    .is_some_and(|room| room.player_count() < self.config.capacity)
            })
            .cloned()
    }

    fn create_room(&mut self) -> RoomId {
        let room_id = loop {
            let candidate = generate_room_id();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let passage = self.passages.next_passage();
        self.rooms
            .insert(room_id.clone(), Room::new(room_id.clone(), passage));
        self.order.push(room_id.clone());
        tracing::info!(%room_id, "room created");
        room_id
    }

    fn remove_room(&mut self, room_id: &RoomId) {
        self.rooms.remove(room_id);
        self.order.retain(|id| id != room_id);
        tracing::info!(%room_id, "room destroyed");
    }
}

impl Default for RaceRegistry<FixedPassage> {
    fn default() -> Self {
        Self::new(RaceConfig::default())
    }
}

/// A random lowercase base-36 id.
fn generate_room_id() -> RoomId {
    let mut rng = rand::rng();
    let id: String = (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect();
    RoomId::new(id)
}
