//! Property-based tests for the wire types.
//!
//! Uses proptest to verify:
//! 1. Any `SyncMessage` survives encode → decode.
//! 2. Random bytes never cause a panic in `decode` (returns `Err` gracefully).
//! 3. `Stars` deserializes exactly the values 1..=3.
//! 4. `ReplicaId` accepts every non-blank name and nothing else.
//! 5. `TaskState` keys parse back to the same state.

#![allow(clippy::unwrap_used)]

use kanban_proto::codec;
use kanban_proto::ids::{ReplicaId, TaskId};
use kanban_proto::message::SyncMessage;
use kanban_proto::task::{MAX_STARS, MIN_STARS, Stars, TaskState};
use proptest::prelude::*;
use uuid::Uuid;

// --- Strategies ---

fn arb_replica_id() -> impl Strategy<Value = ReplicaId> {
    "[a-z0-9-]{1,32}".prop_map(|s| ReplicaId::new(s).unwrap())
}

fn arb_sync_message() -> impl Strategy<Value = SyncMessage> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..512).prop_map(|data| SyncMessage::Updates { data }),
        (arb_replica_id(), prop::collection::vec(any::<u8>(), 0..64))
            .prop_map(|(replica, have)| SyncMessage::RequestUpdates { replica, have }),
    ]
}

fn arb_state() -> impl Strategy<Value = TaskState> {
    prop_oneof![
        Just(TaskState::Backlog),
        Just(TaskState::InProgress),
        Just(TaskState::Done),
    ]
}

// --- Properties ---

proptest! {
    #[test]
    fn sync_message_round_trip(msg in arb_sync_message()) {
        let bytes = codec::encode(&msg).unwrap();
        let decoded = codec::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, msg);
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = codec::decode(&bytes);
    }

    #[test]
    fn stars_deserialize_only_in_range(n in any::<u8>()) {
        let bytes = postcard::to_allocvec(&n).unwrap();
        let result: Result<Stars, _> = postcard::from_bytes(&bytes);
        prop_assert_eq!(result.is_ok(), (MIN_STARS..=MAX_STARS).contains(&n));
    }

    #[test]
    fn replica_id_rejects_only_blank_names(name in "[ \t]{0,4}|[ \t]{0,2}[a-z][a-z ]{0,8}") {
        let blank = name.trim().is_empty();
        prop_assert_eq!(ReplicaId::new(name).is_err(), blank);
    }

    #[test]
    fn task_id_parses_display_form(n in any::<u128>()) {
        let id = TaskId::from_uuid(Uuid::from_u128(n));
        prop_assert_eq!(id.to_string().parse::<TaskId>().unwrap(), id);
    }

    #[test]
    fn state_key_round_trip(state in arb_state()) {
        prop_assert_eq!(TaskState::from_key(state.key()), Some(state));
    }
}
