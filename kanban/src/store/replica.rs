//! In-memory replica of the board document.
//!
//! A [`Replica`] owns one loro document. Each local mutation is one loro
//! commit and leaves as one update blob on the propagation queue. Remote
//! updates are imported as they arrive; loro holds back any whose causal
//! predecessors are missing and applies them once those show up, and
//! importing something already seen changes nothing.
//!
//! Concurrent writes to the same scalar (`state`) resolve last-writer-wins
//! with loro's rule: the higher Lamport timestamp wins, and equal
//! timestamps go to the higher peer id. A replica's peer id is derived from
//! its [`ReplicaId`] by [`peer_id_for`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use kanban_proto::ids::{ReplicaId, TaskId};
use kanban_proto::task::TaskState;
use loro::{ExportMode, LoroDoc, LoroError, VersionVector};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{BoardTxn, ChangeHandler, ChangeOrigin, DocumentStore, StoreError, SubscriptionId, doc};
use crate::model::{Task, TaskDraft, TaskList};
use crate::text::Splice;

type SharedHandler = Arc<dyn Fn(&TaskList, ChangeOrigin) + Send + Sync>;

/// Loro peer id for a replica id. Same name, same peer id, everywhere.
#[must_use]
pub fn peer_id_for(id: &ReplicaId) -> u64 {
    let (high, _) = Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_str().as_bytes()).as_u64_pair();
    // loro rejects u64::MAX
    high >> 1
}

fn written(task: &TaskId, result: Result<(), LoroError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(%task, error = %e, "document write failed");
            false
        }
    }
}

/// Transaction handle passed to [`DocumentStore::mutate`].
struct ReplicaTxn<'a> {
    doc: &'a LoroDoc,
}

impl BoardTxn for ReplicaTxn<'_> {
    fn tasks(&self) -> Vec<Task> {
        doc::snapshot(self.doc).tasks
    }

    fn find(&self, id: &TaskId) -> Option<Task> {
        doc::find(self.doc, id).map(|(_, task)| task)
    }

    fn insert_task(&mut self, id: &TaskId, draft: &TaskDraft) -> bool {
        if doc::find(self.doc, id).is_some() {
            return false;
        }
        written(id, doc::insert_task(self.doc, id, draft))
    }

    fn set_state(&mut self, id: &TaskId, state: TaskState) -> bool {
        match doc::find(self.doc, id) {
            Some((map, task)) if task.state() != state => written(id, doc::set_state(&map, state)),
            _ => false,
        }
    }

    fn mark_removed(&mut self, id: &TaskId) -> bool {
        match doc::find(self.doc, id) {
            Some((map, task)) if !task.is_removed() => written(id, doc::mark_removed(&map)),
            _ => false,
        }
    }

    fn splice_title(&mut self, id: &TaskId, splice: &Splice) -> bool {
        let Some((map, _)) = doc::find(self.doc, id) else {
            return false;
        };
        doc::splice_title(&map, splice).unwrap_or_else(|e| {
            tracing::warn!(task = %id, error = %e, "title splice failed");
            false
        })
    }
}

/// One replica of the shared board.
///
/// Created once per session and shared behind an [`Arc`]. All access goes
/// through short critical sections on an internal lock; subscriber
/// callbacks run after the lock is released, so they may read the replica.
pub struct Replica {
    id: ReplicaId,
    doc: Mutex<LoroDoc>,
    subscribers: Mutex<Vec<(SubscriptionId, SharedHandler)>>,
    next_subscription: AtomicU64,
    outbound: Mutex<Vec<mpsc::UnboundedSender<Vec<u8>>>>,
}

impl Replica {
    /// Creates an empty replica.
    ///
    /// Two live replicas must not share an id: the engine would treat their
    /// edits as one history.
    #[must_use]
    pub fn new(id: ReplicaId) -> Self {
        let doc = LoroDoc::new();
        if let Err(e) = doc.set_peer_id(peer_id_for(&id)) {
            tracing::warn!(replica = %id, error = %e, "keeping random peer id");
        }
        Self {
            id,
            doc: Mutex::new(doc),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// This replica's identity.
    #[must_use]
    pub const fn id(&self) -> &ReplicaId {
        &self.id
    }

    /// Peer id the engine stamps this replica's operations with.
    #[must_use]
    pub fn peer_id(&self) -> u64 {
        self.doc.lock().peer_id()
    }

    /// Version vector of everything applied so far.
    #[must_use]
    pub fn version(&self) -> VersionVector {
        self.doc.lock().oplog_vv()
    }

    /// Every applied operation the holder of `have` has not seen, as one
    /// update blob.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Export`] if the engine cannot encode the
    /// updates.
    pub fn updates_since(&self, have: &VersionVector) -> Result<Vec<u8>, StoreError> {
        self.doc
            .lock()
            .export(ExportMode::updates(have))
            .map_err(|e| StoreError::Export(e.to_string()))
    }

    /// Merges a remote update blob. Returns whether the document changed.
    ///
    /// Operations already applied are skipped. Operations whose causal
    /// predecessors are missing wait inside the engine until a later call
    /// supplies them; until then this returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Import`] if `update` is not a valid update.
    pub fn apply_remote(&self, update: &[u8]) -> Result<bool, StoreError> {
        let changed = {
            let doc = self.doc.lock();
            let before = doc.oplog_vv();
            doc.import(update)
                .map_err(|e| StoreError::Import(e.to_string()))?;
            doc.oplog_vv() != before
        };
        if changed {
            tracing::debug!(replica = %self.id, bytes = update.len(), "merged remote update");
            self.notify(ChangeOrigin::Remote);
        }
        Ok(changed)
    }

    /// Subscribes to locally committed updates, the propagation queue.
    ///
    /// Every change committed after this call is delivered in commit order,
    /// one update blob per change.
    pub fn local_updates(&self) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound.lock().push(tx);
        rx
    }

    fn publish(&self, update: &[u8]) {
        self.outbound
            .lock()
            .retain(|tx| tx.send(update.to_vec()).is_ok());
    }

    fn notify(&self, origin: ChangeOrigin) {
        let handlers: Vec<SharedHandler> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        if handlers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for handler in handlers {
            handler(&snapshot, origin);
        }
    }
}

impl DocumentStore for Replica {
    fn snapshot(&self) -> TaskList {
        doc::snapshot(&self.doc.lock())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut dyn BoardTxn) -> R) -> R {
        let (out, committed) = {
            let doc = self.doc.lock();
            let before = doc.oplog_vv();
            let mut txn = ReplicaTxn { doc: &doc };
            let out = f(&mut txn);
            doc.commit();
            let committed = doc.oplog_vv() != before;
            if committed {
                match doc.export(ExportMode::updates(&before)) {
                    Ok(update) => {
                        tracing::debug!(replica = %self.id, bytes = update.len(), "committed local change");
                        // Published under the document lock so queues see commit order.
                        self.publish(&update);
                    }
                    Err(e) => {
                        tracing::warn!(replica = %self.id, error = %e, "failed to export local change");
                    }
                }
            }
            (out, committed)
        };
        if committed {
            self.notify(ChangeOrigin::Local);
        }
        out
    }

    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::from(handler)));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }
}
