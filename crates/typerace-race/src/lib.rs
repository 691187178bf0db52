//! Room lifecycle and race state for Typerace.
//!
//! [`RaceRegistry`] is the single owner of every room. It matchmakes
//! joining players into rooms below capacity, starts the race clock when a
//! room fills to its start threshold, scores every keystroke, detects
//! finishers, restarts races, and deletes rooms the moment they empty.
//!
//! Each operation returns the [`Effect`]s it produced instead of sending
//! anything, so the whole state machine runs without a network.
//!
//! # Key types
//!
//! - [`RaceRegistry`]: rooms, matchmaking, and transitions
//! - [`Room`] / [`PlayerState`]: one race and one racer
//! - [`Command`] / [`Effect`]: what goes in, what comes out
//! - [`RaceConfig`]: capacity, start threshold, and policy knobs
//! - [`PassageSource`]: where race text comes from

mod config;
mod error;
mod passage;
mod registry;
mod room;

pub use config::{FinishPolicy, RaceConfig, TypingClock};
pub use error::RaceError;
pub use passage::{DEFAULT_PASSAGE, FixedPassage, PassagePool, PassageSource};
pub use registry::{Command, Effect, Effects, RaceRegistry};
pub use room::{
    InputOutcome, PlayerState, Room, is_on_track, progress_of, words_per_minute,
};
