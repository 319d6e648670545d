//! Mutation protocol: the operations users perform on the board.
//!
//! [`TaskBoard`] is the application-layer interface over an injected
//! [`DocumentStore`]. Each operation is one transaction. Operations that
//! target a task no longer in the local snapshot are silent no-ops: a
//! concurrently merged change makes that an expected race, not an error.

use std::sync::Arc;

use kanban_proto::ids::TaskId;
use kanban_proto::task::TaskState;

use crate::model::{Task, TaskDraft, TaskList, ValidationError};
use crate::store::{ChangeHandler, DocumentStore, SubscriptionId};
use crate::text::diff;
use crate::view;

/// Fresh ids tried before giving up on an insert.
const MAX_ID_ATTEMPTS: usize = 3;

/// The shared board as seen by one user session.
pub struct TaskBoard<S> {
    store: Arc<S>,
}

impl<S> Clone for TaskBoard<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> TaskBoard<S> {
    /// Creates a board over the given document store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying document store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Creates a task at the top of the board, in `Backlog`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the author or title is blank or the
    /// star rating is outside 1..=3, and [`ValidationError::NotRecorded`]
    /// if the store refused the insert. Nothing is written in either case.
    pub fn create_task(&self, author: &str, title: &str, stars: u8) -> Result<TaskId, ValidationError> {
        let draft = TaskDraft::new(author, title, stars)?;
        let id = self.store.mutate(|txn| {
            for _ in 0..MAX_ID_ATTEMPTS {
                let id = TaskId::new();
                if txn.insert_task(&id, &draft) {
                    return Some(id);
                }
                tracing::warn!(task = %id, "task insert not recorded, retrying with a new id");
            }
            None
        });
        let Some(id) = id else {
            return Err(ValidationError::NotRecorded);
        };
        tracing::info!(task = %id, stars, "task created");
        Ok(id)
    }

    /// Moves a task to `state`. Returns `false` if nothing was recorded:
    /// the task is unknown or already in that state.
    pub fn change_state(&self, id: &TaskId, state: TaskState) -> bool {
        let changed = self.store.mutate(|txn| txn.set_state(id, state));
        if !changed {
            tracing::debug!(task = %id, %state, "state change was a no-op");
        }
        changed
    }

    /// Soft-deletes a task. Returns `false` if the task is unknown or
    /// already removed.
    pub fn remove_task(&self, id: &TaskId) -> bool {
        let changed = self.store.mutate(|txn| txn.mark_removed(id));
        if !changed {
            tracing::debug!(task = %id, "remove was a no-op");
        }
        changed
    }

    /// Edits a task's title to read `new_title`.
    ///
    /// Only the differing middle section is spliced, so concurrent edits
    /// elsewhere in the same title survive the merge. Returns `false` if
    /// the task is unknown or the title is unchanged.
    pub fn retitle_task(&self, id: &TaskId, new_title: &str) -> bool {
        self.store.mutate(|txn| {
            let Some(current) = txn.find(id) else {
                tracing::debug!(task = %id, "retitle of unknown task ignored");
                return false;
            };
            diff(current.title(), new_title).is_some_and(|splice| txn.splice_title(id, &splice))
        })
    }

    /// Current merged document.
    #[must_use]
    pub fn snapshot(&self) -> TaskList {
        self.store.snapshot()
    }

    /// Visible tasks in one column, in board order.
    #[must_use]
    pub fn column(&self, state: TaskState) -> Vec<Task> {
        view::by_state(&self.store.snapshot(), state)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Registers a handler for merged document updates.
    pub fn on_change(&self, handler: ChangeHandler) -> SubscriptionId {
        self.store.subscribe(handler)
    }
}
