//! Core persistence logic for todo trees.
//! Saves nested todos leaves-first into a flat record store and rebuilds
//! them level by level under a depth limit.

pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use graph::{
    build_adjacency, leaves_to_root, traverse, Adjacency, GraphError, MaxDepth, Traversal, Visit,
};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings};
pub use model::todo::{
    ChildSlot, NewTodo, NodeHandle, TodoGraph, TodoId, TodoNode, TodoRecord, TodoValidationError,
};
pub use model::todo_json::{graph_from_json, graph_to_json};
pub use repo::todo_repo::{SqliteTodoRepository, TodoRepoError, TodoRepoResult, TodoRepository};
pub use service::error::TreeError;
pub use service::persist::{save_tree, SavedTree};
pub use service::populate::{populate_node, populate_tree, PopulatedTree};
pub use service::todo_service::{TodoService, TodoServiceError};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
