//! Race configuration.

use serde::{Deserialize, Serialize};

use crate::RaceError;

// ---------------------------------------------------------------------------
// RaceConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Maximum racers per room. Matchmaking never fills a room past this.
    pub capacity: usize,

    /// Player count at which a waiting room starts its race clock.
    pub start_threshold: usize,

    /// Which keystroke starts a racer's personal WPM clock.
    pub typing_clock: TypingClock,

    /// Which finishers announce `game_finished` to the room.
    pub finish_policy: FinishPolicy,

    /// Draw a fresh passage when a room restarts.
    pub redraw_on_restart: bool,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            start_threshold: 2,
            typing_clock: TypingClock::FirstInput,
            finish_policy: FinishPolicy::EveryFinisher,
            redraw_on_restart: true,
        }
    }
}

impl RaceConfig {
    /// Rejects settings under which no race could ever be run.
    pub fn validate(&self) -> Result<(), RaceError> {
        if self.capacity == 0 {
            return Err(RaceError::InvalidConfig(
                "capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TypingClock
// ---------------------------------------------------------------------------

/// When a racer's `start_typing_time` is stamped.
///
/// Either way it is stamped at most once per race epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingClock {
    /// The first update whose buffer is non-empty.
    #[default]
    FirstInput,

    /// Only an update whose buffer is exactly one character. A client
    /// that pastes or batches keystrokes never starts the clock and
    /// reports 0 WPM.
    SingleCharacter,
}

impl TypingClock {
    /// Whether this buffer starts a clock that is not yet running.
    pub fn starts_on(self, typed: &str) -> bool {
        match self {
            Self::FirstInput => !typed.is_empty(),
            Self::SingleCharacter => typed.chars().count() == 1,
        }
    }
}

// ---------------------------------------------------------------------------
// FinishPolicy
// ---------------------------------------------------------------------------

/// Which completions are broadcast as `game_finished`.
///
/// Every racer who completes the passage is marked finished regardless;
/// this only controls the announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishPolicy {
    /// Each racer's completion is announced, in dispatch order.
    #[default]
    EveryFinisher,

    /// Only the first completion of the race epoch is announced.
    FirstOnly,
}
