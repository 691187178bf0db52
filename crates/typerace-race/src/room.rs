//! A single race: its passage, its racers, and the per-keystroke rules.

use std::collections::{BTreeMap, HashMap};

use typerace_protocol::{PlayerId, PlayerSnapshot, RoomId, Timestamp};

use crate::TypingClock;

// ---------------------------------------------------------------------------
// Scoring helpers
// ---------------------------------------------------------------------------

/// Whether `typed` matches the passage position by position so far.
///
/// Equivalent to truncating the passage to the typed length and comparing;
/// a buffer longer than the passage is never correct.
pub fn is_on_track(passage: &str, typed: &str) -> bool {
    passage.starts_with(typed)
}

/// Typed length over passage length in characters, clamped to 1.
pub fn progress_of(passage: &str, typed: &str) -> f64 {
    let total = passage.chars().count();
    if total == 0 {
        return 1.0;
    }
    (typed.chars().count() as f64 / total as f64).min(1.0)
}

/// Whole words per minute since `started`, floored.
///
/// Words are whitespace-separated tokens of the buffer. No clock, or no
/// time elapsed yet, reads as 0.
pub fn words_per_minute(
    typed: &str,
    started: Option<Timestamp>,
    now: Timestamp,
) -> u32 {
    let Some(started) = started else {
        return 0;
    };
    let minutes = now.since(started).as_secs_f64() / 60.0;
    if minutes <= 0.0 {
        return 0;
    }
    let words = typed.split_whitespace().count();
    (words as f64 / minutes).floor() as u32
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// One racer's state within a room.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub username: String,
    pub progress: f64,
    pub typed_text: String,
    pub finished: bool,
    pub start_typing_time: Option<Timestamp>,
    pub wpm: u32,
}

/// What a single progress update produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOutcome {
    /// The buffer is still a prefix of the passage.
    pub on_track: bool,
    /// This update completed the passage for the first time this epoch.
    pub newly_finished: bool,
}

impl PlayerState {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            progress: 0.0,
            typed_text: String::new(),
            finished: false,
            start_typing_time: None,
            wpm: 0,
        }
    }

    /// Clears everything but the username.
    pub fn reset(&mut self) {
        self.progress = 0.0;
        self.typed_text.clear();
        self.finished = false;
        self.start_typing_time = None;
        self.wpm = 0;
    }

    /// Applies a new input buffer against `passage`.
    pub fn apply_input(
        &mut self,
        passage: &str,
        typed: String,
        clock: TypingClock,
        now: Timestamp,
    ) -> InputOutcome {
        if self.start_typing_time.is_none() && clock.starts_on(&typed) {
            self.start_typing_time = Some(now);
        }

        let on_track = is_on_track(passage, &typed);
        self.progress = progress_of(passage, &typed);
        self.wpm = words_per_minute(&typed, self.start_typing_time, now);
        self.typed_text = typed;

        let newly_finished = !self.finished && self.typed_text == passage;
        if newly_finished {
            self.finished = true;
        }

        InputOutcome {
            on_track,
            newly_finished,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            username: self.username.clone(),
            progress: self.progress,
            typed_text: self.typed_text.clone(),
            finished: self.finished,
            start_typing_time: self.start_typing_time,
            wpm: self.wpm,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A live race instance. Owned by the [`RaceRegistry`](crate::RaceRegistry);
/// callers only ever see it by reference.
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    passage: String,
    players: HashMap<PlayerId, PlayerState>,
    start_time: Option<Timestamp>,
    /// Racers in the order they completed the passage this epoch.
    finish_order: Vec<PlayerId>,
}

impl Room {
    pub(crate) fn new(id: RoomId, passage: String) -> Self {
        Self {
            id,
            passage,
            players: HashMap::new(),
            start_time: None,
            finish_order: Vec::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn passage(&self) -> &str {
        &self.passage
    }

    /// When the race clock started, if it has.
    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.players.contains_key(player_id)
    }

    /// Member ids in ascending order.
    pub fn members(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self.players.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Completion order for the current epoch.
    pub fn finish_order(&self) -> &[PlayerId] {
        &self.finish_order
    }

    /// The first racer to complete the current epoch.
    pub fn winner(&self) -> Option<PlayerId> {
        self.finish_order.first().copied()
    }

    /// The `players_update` payload.
    pub fn snapshot(&self) -> BTreeMap<PlayerId, PlayerSnapshot> {
        self.players
            .iter()
            .map(|(id, player)| (*id, player.snapshot()))
            .collect()
    }

    pub(crate) fn add_player(&mut self, player_id: PlayerId, username: String) {
        self.players.insert(player_id, PlayerState::new(username));
    }

    /// Removes a racer. A departed finisher also leaves the finish order,
    /// so `winner()` only ever names someone still in the room.
    pub(crate) fn remove_player(&mut self, player_id: &PlayerId) -> Option<PlayerState> {
        self.finish_order.retain(|id| id != player_id);
        self.players.remove(player_id)
    }

    /// Stamps the race clock if `threshold` racers are present and it has
    /// not started. Returns the new start time when it did.
    pub(crate) fn start_if_ready(
        &mut self,
        threshold: usize,
        now: Timestamp,
    ) -> Option<Timestamp> {
        if self.start_time.is_some() || self.players.len() < threshold {
            return None;
        }
        self.start_time = Some(now);
        self.start_time
    }

    /// Applies one progress update. `None` if the player is not here.
    pub(crate) fn apply_input(
        &mut self,
        player_id: PlayerId,
        typed: String,
        clock: TypingClock,
        now: Timestamp,
    ) -> Option<(InputOutcome, &PlayerState)> {
        let player = self.players.get_mut(&player_id)?;
        let outcome = player.apply_input(&self.passage, typed, clock, now);
        if outcome.newly_finished {
            self.finish_order.push(player_id);
        }
        Some((outcome, &*player))
    }

    /// Starts a new epoch: every racer reset, finish order cleared, clock
    /// restarted at `now`, and the passage replaced if one is given.
    pub(crate) fn restart(&mut self, passage: Option<String>, now: Timestamp) {
        for player in self.players.values_mut() {
            player.reset();
        }
        if let Some(passage) = passage {
            self.passage = passage;
        }
        self.finish_order.clear();
        self.start_time = Some(now);
    }
}
