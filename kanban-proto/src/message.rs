//! Sync messages exchanged between replicas.
//!
//! Document contents travel as opaque update blobs produced by the merge
//! engine. This crate only frames them; it never looks inside.

use serde::{Deserialize, Serialize};

use crate::ids::ReplicaId;

/// Sync protocol messages exchanged between replicas.
///
/// These messages are postcard-encoded by [`crate::codec`]. Live updates
/// and catch-up replies both travel as [`SyncMessage::Updates`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Document updates the receiver may not have seen yet.
    ///
    /// Importing the same update twice is harmless, and updates whose
    /// causal predecessors are missing are held back by the receiver.
    Updates {
        /// Encoded engine updates.
        data: Vec<u8>,
    },
    /// Ask the peer for everything not covered by `have`.
    ///
    /// Sent when a link comes up.
    RequestUpdates {
        /// Replica asking, for logging on the other side.
        replica: ReplicaId,
        /// Encoded version vector of the requesting replica.
        have: Vec<u8>,
    },
}

impl SyncMessage {
    /// Short name of the message kind, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Updates { .. } => "updates",
            Self::RequestUpdates { .. } => "request_updates",
        }
    }
}
