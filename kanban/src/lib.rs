//! Collaborative kanban board over a replicated, mergeable task list.
//!
//! Users create tasks, move them between Backlog, In Progress and Done,
//! edit titles and soft-delete tasks. Every replica keeps its own copy of
//! the board and converges with the others without coordination.

pub mod config;
pub mod model;
pub mod protocol;
pub mod store;
pub mod sync;
pub mod text;
pub mod view;
