//! The dispatcher: one Tokio task that owns the race registry.
//!
//! Connection handlers never touch race state. They send [`HubCommand`]s
//! down a channel, and the hub applies them one at a time, reads the clock
//! once per command, and fans the resulting effects out to each player's
//! outbound channel. No two commands ever interleave, so the registry
//! needs no lock.

use std::collections::HashMap;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use typerace_protocol::{PlayerId, ServerEvent, Timestamp};
use typerace_race::{Command, Effects, PassageSource, RaceRegistry};

use crate::TyperaceError;

/// Bounded queue of outbound events for one connection.
pub type PlayerSender = mpsc::Sender<ServerEvent>;

/// Commands accepted by the hub task.
pub(crate) enum HubCommand {
    /// Register a connection's outbound channel.
    Attach {
        player_id: PlayerId,
        sender: PlayerSender,
    },

    /// Apply a client event.
    Dispatch {
        player_id: PlayerId,
        command: Command,
    },

    /// The connection closed: remove the racer and its channel.
    Detach { player_id: PlayerId },

    /// Report current counts.
    Stats { reply: oneshot::Sender<HubStats> },
}

/// A point-in-time view of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Live rooms.
    pub rooms: usize,
    /// Attached connections, in a room or not.
    pub connections: usize,
}

/// Handle to the running hub. Cheap to clone.
#[derive(Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn attach(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), TyperaceError> {
        self.send(HubCommand::Attach { player_id, sender }).await
    }

    pub async fn dispatch(
        &self,
        player_id: PlayerId,
        command: Command,
    ) -> Result<(), TyperaceError> {
        self.send(HubCommand::Dispatch { player_id, command }).await
    }

    pub async fn detach(&self, player_id: PlayerId) -> Result<(), TyperaceError> {
        self.send(HubCommand::Detach { player_id }).await
    }

    pub async fn stats(&self) -> Result<HubStats, TyperaceError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| TyperaceError::HubUnavailable)
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), TyperaceError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| TyperaceError::HubUnavailable)
    }
}

struct Hub<S: PassageSource> {
    registry: RaceRegistry<S>,
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<HubCommand>,
}

impl<S: PassageSource> Hub<S> {
    async fn run(mut self) {
        tracing::info!("race dispatcher started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Attach { player_id, sender } => {
                    self.senders.insert(player_id, sender);
                    tracing::debug!(%player_id, "connection attached");
                }
                HubCommand::Dispatch { player_id, command } => {
                    let effects =
                        self.registry.dispatch(player_id, command, Timestamp::now());
                    self.deliver(effects);
                }
                HubCommand::Detach { player_id } => {
                    self.disconnect(player_id);
                    self.senders.remove(&player_id);
                    tracing::debug!(%player_id, "connection detached");
                }
                HubCommand::Stats { reply } => {
                    let _ = reply.send(HubStats {
                        rooms: self.registry.room_count(),
                        connections: self.senders.len(),
                    });
                }
            }
        }

        tracing::info!("race dispatcher stopped");
    }

    fn disconnect(&mut self, player_id: PlayerId) {
        let effects = self
            .registry
            .dispatch(player_id, Command::Disconnect, Timestamp::now());
        self.deliver(effects);
    }

    fn deliver(&mut self, effects: Effects) {
        let mut lagging = Vec::new();
        for effect in effects {
            tracing::trace!(
                event = effect.event.name(),
                recipients = effect.audience.len(),
                "delivering"
            );
            for player_id in &effect.audience {
                if !self.send_to(*player_id, effect.event.clone()) {
                    lagging.push(*player_id);
                }
            }
        }
        for player_id in lagging {
            self.drop_lagging(player_id);
        }
    }

    /// `false` only when the player's queue is full. A closed or missing
    /// queue means the connection is already going away.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) -> bool {
        match self.senders.get(&player_id) {
            Some(sender) => !matches!(sender.try_send(event), Err(TrySendError::Full(_))),
            None => true,
        }
    }

    /// Drops a client that stopped reading. Removing its sender closes the
    /// queue, which ends the connection's writer and then the connection.
    fn drop_lagging(&mut self, player_id: PlayerId) {
        if self.senders.remove(&player_id).is_none() {
            return;
        }
        tracing::debug!(%player_id, "outbound queue full, dropping client");
        self.disconnect(player_id);
    }
}

/// Spawns the hub task around `registry` and returns a handle to it.
///
/// `channel_size` bounds the command queue.
pub(crate) fn spawn_hub<S: PassageSource>(
    registry: RaceRegistry<S>,
    channel_size: usize,
) -> HubHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));
    let hub = Hub {
        registry,
        senders: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(hub.run());
    HubHandle { sender: tx }
}
