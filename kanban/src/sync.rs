//! Update exchange between replicas.
//!
//! [`sync_pair`] exchanges missing updates directly between two replicas in
//! the same process. [`SyncPeer`] runs the same exchange over a [`Link`]:
//! it sends its version vector when the link comes up, so the other side
//! can answer with everything it is missing, then forwards each local
//! change as it is committed. Links are point to point, so every pair of
//! replicas that should converge needs its own link.

use std::sync::Arc;

use kanban_proto::codec::{self, CodecError};
use kanban_proto::message::SyncMessage;
use loro::VersionVector;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::{Replica, StoreError};

/// Errors raised while exchanging updates.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The other end of the link has gone away.
    #[error("sync link closed")]
    LinkClosed,

    /// A message could not be encoded.
    #[error("sync codec error: {0}")]
    Codec(#[from] CodecError),

    /// The replica could not export or import updates.
    #[error("sync store error: {0}")]
    Store(#[from] StoreError),
}

/// Exchanges missing updates between two replicas in both directions.
///
/// Returns how many of the two replicas changed.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if either replica fails to export or import.
pub fn sync_pair(a: &Replica, b: &Replica) -> Result<usize, SyncError> {
    let to_b = a.updates_since(&b.version())?;
    let to_a = b.updates_since(&a.version())?;
    let changed_b = b.apply_remote(&to_b)?;
    let changed_a = a.apply_remote(&to_a)?;
    Ok(usize::from(changed_a) + usize::from(changed_b))
}

/// In-process bidirectional byte link between two sync peers.
///
/// Created via [`Link::pair`]; frames sent on one end arrive on the other.
/// Each frame is one postcard-encoded [`SyncMessage`].
pub struct Link {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Link {
    /// Creates two connected link ends.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (Self { tx: tx_b, rx: rx_a }, Self { tx: tx_a, rx: rx_b })
    }

    /// Encodes and sends a message.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Codec`] if encoding fails and
    /// [`SyncError::LinkClosed`] if the other end is gone.
    pub fn send(&self, msg: &SyncMessage) -> Result<(), SyncError> {
        let frame = codec::encode(msg)?;
        self.send_frame(frame)
    }

    /// Sends a raw frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LinkClosed`] if the other end is gone.
    pub fn send_frame(&self, frame: Vec<u8>) -> Result<(), SyncError> {
        self.tx.send(frame).map_err(|_| SyncError::LinkClosed)
    }

    /// Waits for the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LinkClosed`] once the other end is gone and all
    /// buffered frames have been read.
    pub async fn recv(&mut self) -> Result<Vec<u8>, SyncError> {
        self.rx.recv().await.ok_or(SyncError::LinkClosed)
    }
}

/// Keeps one replica in sync with the replica at the other end of a link.
pub struct SyncPeer {
    replica: Arc<Replica>,
    link: Link,
    local: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl SyncPeer {
    /// Attaches to the replica's propagation queue. Changes committed from
    /// now on are forwarded once [`run`](Self::run) is polled; earlier ones
    /// are covered by the catch-up request.
    #[must_use]
    pub fn new(replica: Arc<Replica>, link: Link) -> Self {
        let local = replica.local_updates();
        Self {
            replica,
            link,
            local,
        }
    }

    /// Runs until the link closes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Codec`] if an outgoing message cannot be
    /// encoded, or [`SyncError::Store`] if the replica cannot export a
    /// catch-up reply. A closed link ends the loop normally.
    pub async fn run(mut self) -> Result<(), SyncError> {
        let replica_id = self.replica.id().clone();
        tracing::info!(replica = %replica_id, "sync started");

        let request = SyncMessage::RequestUpdates {
            replica: replica_id.clone(),
            have: self.replica.version().encode(),
        };
        let result = match self.link.send(&request) {
            Ok(()) => self.pump().await,
            Err(e) => Err(e),
        };

        tracing::info!(replica = %replica_id, "sync stopped");
        match result {
            Err(SyncError::LinkClosed) => Ok(()),
            other => other,
        }
    }

    async fn pump(&mut self) -> Result<(), SyncError> {
        loop {
            tokio::select! {
                Some(data) = self.local.recv() => {
                    self.link.send(&SyncMessage::Updates { data })?;
                }
                frame = self.link.recv() => {
                    self.handle(&frame?)?;
                }
            }
        }
    }

    fn handle(&self, frame: &[u8]) -> Result<(), SyncError> {
        let msg = match codec::decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(replica = %self.replica.id(), error = %e, "dropping undecodable sync frame");
                return Ok(());
            }
        };
        tracing::trace!(replica = %self.replica.id(), kind = msg.kind(), "sync frame");
        match msg {
            SyncMessage::Updates { data } => match self.replica.apply_remote(&data) {
                Ok(changed) => {
                    tracing::debug!(replica = %self.replica.id(), bytes = data.len(), changed, "merged remote updates");
                }
                Err(e) => {
                    tracing::warn!(replica = %self.replica.id(), error = %e, "dropping unusable update");
                }
            },
            SyncMessage::RequestUpdates { replica, have } => match VersionVector::decode(&have) {
                Ok(have) => {
                    let data = self.replica.updates_since(&have)?;
                    tracing::debug!(replica = %self.replica.id(), from = %replica, bytes = data.len(), "answering catch-up request");
                    self.link.send(&SyncMessage::Updates { data })?;
                }
                Err(e) => {
                    tracing::warn!(replica = %self.replica.id(), from = %replica, error = %e, "ignoring request with bad version vector");
                }
            },
        }
        Ok(())
    }
}

/// Links two replicas and spawns a sync peer for each on the current
/// tokio runtime.
pub fn connect(
    a: Arc<Replica>,
    b: Arc<Replica>,
) -> (
    JoinHandle<Result<(), SyncError>>,
    JoinHandle<Result<(), SyncError>>,
) {
    let (link_a, link_b) = Link::pair();
    let peer_a = SyncPeer::new(a, link_a);
    let peer_b = SyncPeer::new(b, link_b);
    (tokio::spawn(peer_a.run()), tokio::spawn(peer_b.run()))
}
