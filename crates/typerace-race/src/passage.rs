//! Where race passages come from.
//!
//! A registry draws a passage when it creates a room and, if configured,
//! again on every restart. Content is not the race layer's concern; it
//! only needs something that implements [`PassageSource`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::RaceError;

/// The passage served when no other source is configured.
pub const DEFAULT_PASSAGE: &str = "Typing Race is a real-time multiplayer game where users compete by typing the given text as fast and accurately as possible.";

/// Supplies the text for the next race.
///
/// `Send + 'static` because the registry, and with it its source, lives
/// inside the dispatcher task for the life of the server.
pub trait PassageSource: Send + 'static {
    /// Returns the passage for a new race. Must not be empty.
    fn next_passage(&mut self) -> String;
}

/// Always the same passage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPassage(String);

impl FixedPassage {
    pub fn new(text: impl Into<String>) -> Result<Self, RaceError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RaceError::InvalidConfig("passage is empty".into()));
        }
        Ok(Self(text))
    }
}

impl Default for FixedPassage {
    fn default() -> Self {
        Self(DEFAULT_PASSAGE.to_string())
    }
}

impl PassageSource for FixedPassage {
    fn next_passage(&mut self) -> String {
        self.0.clone()
    }
}

/// Draws uniformly at random from a fixed list; repeats are possible.
#[derive(Debug, Clone)]
pub struct PassagePool {
    passages: Vec<String>,
    rng: StdRng,
}

impl PassagePool {
    /// Builds a pool seeded from the operating system.
    pub fn new(passages: Vec<String>) -> Result<Self, RaceError> {
        Self::with_rng(passages, StdRng::from_os_rng())
    }

    /// Builds a pool with a fixed seed, for reproducible draws.
    pub fn seeded(passages: Vec<String>, seed: u64) -> Result<Self, RaceError> {
        Self::with_rng(passages, StdRng::seed_from_u64(seed))
    }

    /// Splits `contents` into one passage per non-blank line.
    pub fn from_lines(contents: &str) -> Result<Self, RaceError> {
        let passages = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(passages)
    }

    fn with_rng(passages: Vec<String>, rng: StdRng) -> Result<Self, RaceError> {
        if passages.is_empty() {
            return Err(RaceError::InvalidConfig("passage pool is empty".into()));
        }
        if passages.iter().any(|p| p.trim().is_empty()) {
            return Err(RaceError::InvalidConfig(
                "passage pool contains an empty passage".into(),
            ));
        }
        Ok(Self { passages, rng })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

impl PassageSource for PassagePool {
    fn next_passage(&mut self) -> String {
        // `with_rng` guarantees at least one passage.
        self.passages
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_PASSAGE.to_string())
    }
}
