//! Document store boundary for the replicated board.
//!
//! Defines the [`DocumentStore`] trait that the mutation protocol and views
//! are written against, and the [`BoardTxn`] handle a mutation receives.
//! The concrete store is [`replica::Replica`], a loro document per replica
//! that records local commits, imports remote updates and notifies
//! subscribers.

mod doc;
pub mod replica;

use std::fmt;

use kanban_proto::ids::TaskId;
use kanban_proto::task::TaskState;

use crate::model::{Task, TaskDraft, TaskList};
use crate::text::Splice;

pub use replica::Replica;

/// Where a document change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Recorded by this replica through [`DocumentStore::mutate`].
    Local,
    /// Merged in from another replica.
    Remote,
}

impl fmt::Display for ChangeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Failures moving updates in or out of the merge engine.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Remote bytes were not a valid update or version vector.
    #[error("failed to import update: {0}")]
    Import(String),

    /// The engine could not export the requested updates.
    #[error("failed to export updates: {0}")]
    Export(String),
}

/// Handle returned by [`DocumentStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Callback invoked with the merged snapshot after every document change.
pub type ChangeHandler = Box<dyn Fn(&TaskList, ChangeOrigin) + Send + Sync>;

/// Operations available inside one atomic mutation.
///
/// Every method that targets a task returns `false` and records nothing
/// when the task is not in the document.
pub trait BoardTxn {
    /// All tasks as of this point in the transaction.
    fn tasks(&self) -> Vec<Task>;

    /// Looks up one task.
    fn find(&self, id: &TaskId) -> Option<Task>;

    /// Inserts a new task at the head of the sequence, in `Backlog`.
    ///
    /// Returns `false` if `id` is already taken.
    fn insert_task(&mut self, id: &TaskId, draft: &TaskDraft) -> bool;

    /// Writes the task's workflow state. Writing the current value records
    /// nothing.
    fn set_state(&mut self, id: &TaskId, state: TaskState) -> bool;

    /// Soft-deletes the task. Already-removed tasks record nothing.
    fn mark_removed(&mut self, id: &TaskId) -> bool;

    /// Applies a character-level splice to the task's title.
    fn splice_title(&mut self, id: &TaskId, splice: &Splice) -> bool;
}

/// A replicated board document.
///
/// Implementations resolve all conflicts themselves; nothing here fails
/// because two replicas disagreed.
pub trait DocumentStore: Send + Sync {
    /// Returns the current merged view. Never waits on synchronization and
    /// may lag behind in-flight remote changes.
    fn snapshot(&self) -> TaskList;

    /// Runs `f` as one atomic local change.
    ///
    /// `f` starts from a consistent view of the document. Whatever it
    /// records becomes a single unit of history, is queued for propagation
    /// and triggers local subscribers. A closure that records nothing
    /// produces no change and no notification.
    fn mutate<R>(&self, f: impl FnOnce(&mut dyn BoardTxn) -> R) -> R;

    /// Registers a handler called after every local or remote change.
    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId;

    /// Removes a handler. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
