//! Scalar task values.
//!
//! Star ratings are a validated [`Stars`] value that cannot leave the 1..=3
//! range, not even through deserialization. [`TaskState`] has a stable
//! storage key so replicas agree on how a state is written down.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest star rating a task can carry.
pub const MIN_STARS: u8 = 1;

/// Highest star rating a task can carry.
pub const MAX_STARS: u8 = 3;

/// Workflow state of a task on the board.
///
/// Every state can move directly to every other state; there is no
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskState {
    /// Not started. Every task begins here.
    #[default]
    Backlog,
    /// Actively being worked on.
    InProgress,
    /// Finished.
    Done,
}

impl TaskState {
    /// All states in board column order.
    pub const ALL: [Self; 3] = [Self::Backlog, Self::InProgress, Self::Done];

    /// Human-readable column label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Stable key used when the state is stored in a document.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parses a key written by [`key`](Self::key).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// States reachable from this one in a single transition.
    pub fn transitions(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |s| *s != self)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Star count outside the allowed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stars must be between 1 and 3, got {0}")]
pub struct InvalidStars(pub u8);

/// A star rating in `1..=3`, fixed at task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stars(u8);

impl Stars {
    /// Returns the rating as a plain number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Stars {
    fn default() -> Self {
        Self(MIN_STARS)
    }
}

impl TryFrom<u8> for Stars {
    type Error = InvalidStars;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (MIN_STARS..=MAX_STARS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidStars(value))
        }
    }
}

impl From<Stars> for u8 {
    fn from(stars: Stars) -> Self {
        stars.0
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
