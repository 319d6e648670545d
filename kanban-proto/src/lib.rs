//! Shared replication protocol definitions for the kanban board.

pub mod codec;
pub mod ids;
pub mod message;
pub mod task;
