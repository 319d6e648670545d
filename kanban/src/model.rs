//! Task entity model: the read-only task record and creation validation.
//!
//! A [`Task`] is what a snapshot hands out. It has accessors only; the
//! immutable fields (`id`, `author`, `stars`) cannot be changed once the
//! task exists, and the mutable ones change only through the mutation
//! protocol. New tasks start life as a validated [`TaskDraft`].

use kanban_proto::ids::TaskId;
use kanban_proto::task::{Stars, TaskState};
use serde::Serialize;
use thiserror::Error;

/// Creation input rejected before any document mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The author name is empty after trimming.
    #[error("please fill in your name")]
    EmptyAuthor,
    /// The task title is empty after trimming.
    #[error("please fill in the task title")]
    EmptyTitle,
    /// The star rating is outside 1..=3.
    #[error("stars must be between 1 and 3, got {0}")]
    StarsOutOfRange(u8),
    /// The document store did not record the new task.
    #[error("the task could not be added to the board")]
    NotRecorded,
}

/// Validated input for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    author: String,
    title: String,
    stars: Stars,
}

impl TaskDraft {
    /// Validates raw creation input.
    ///
    /// Author and title are checked after trimming but stored as entered.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyAuthor`] or
    /// [`ValidationError::EmptyTitle`] for blank text, and
    /// [`ValidationError::StarsOutOfRange`] when `stars` is not 1, 2 or 3.
    pub fn new(author: &str, title: &str, stars: u8) -> Result<Self, ValidationError> {
        if author.trim().is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let stars = Stars::try_from(stars).map_err(|e| ValidationError::StarsOutOfRange(e.0))?;
        Ok(Self {
            author: author.to_string(),
            title: title.to_string(),
            stars,
        })
    }

    /// Author name, as entered.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Initial title, as entered.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Validated star rating.
    #[must_use]
    pub const fn stars(&self) -> Stars {
        self.stars
    }
}

/// A task as seen in a snapshot of the merged document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) author: String,
    pub(crate) title: String,
    pub(crate) state: TaskState,
    pub(crate) stars: Stars,
    pub(crate) removed: bool,
}

impl Task {
    /// Identifier assigned by the creating replica.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Name of the person who created the task. Never changes.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Current merged title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Current workflow state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Star rating fixed at creation.
    #[must_use]
    pub const fn stars(&self) -> Stars {
        self.stars
    }

    /// Whether the task has been soft-deleted.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed
    }
}

/// The ordered task sequence, newest first.
///
/// Removed tasks stay in the sequence; views filter them out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskList {
    /// Tasks in board order.
    pub tasks: Vec<Task>,
}

impl TaskList {
    /// Finds a task by id.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == *id)
    }

    /// Number of tasks in the sequence, removed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the sequence holds no tasks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over tasks that have not been removed.
    pub fn live(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.removed)
    }
}
