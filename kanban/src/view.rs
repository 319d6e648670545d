//! View projection: per-column task lists derived from a snapshot.
//!
//! Everything here is a pure function of a [`TaskList`]. Nothing mutates
//! the snapshot, so projections can be recomputed on every change
//! notification.

use kanban_proto::ids::TaskId;
use kanban_proto::task::TaskState;

use crate::model::{Task, TaskList};

/// Visible tasks in `state`, in sequence order.
#[must_use]
pub fn by_state(doc: &TaskList, state: TaskState) -> Vec<&Task> {
    doc.live().filter(|t| t.state() == state).collect()
}

/// One board column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<'a> {
    /// State every task in the column is in.
    pub state: TaskState,
    /// Visible tasks, in board order.
    pub tasks: Vec<&'a Task>,
}

/// All columns in board order: Backlog, In Progress, Done.
#[must_use]
pub fn columns(doc: &TaskList) -> Vec<Column<'_>> {
    TaskState::ALL
        .into_iter()
        .map(|state| Column {
            state,
            tasks: by_state(doc, state),
        })
        .collect()
}

/// Display data for one task card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCard {
    /// Task the card shows.
    pub id: TaskId,
    /// "<author>'s task".
    pub heading: String,
    /// Current title.
    pub title: String,
    /// One star glyph per star.
    pub stars: String,
    /// Finished tasks are drawn struck through.
    pub struck: bool,
    /// States the card offers to move to.
    pub moves: Vec<TaskState>,
}

impl From<&Task> for TaskCard {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().clone(),
            heading: format!("{}'s task", task.author()),
            title: task.title().to_string(),
            stars: "⭐".repeat(usize::from(task.stars().get())),
            struck: task.state() == TaskState::Done,
            moves: task.state().transitions().collect(),
        }
    }
}
