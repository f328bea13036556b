//! Errors shared by the tree persistence and population operations.

use crate::model::todo::{NodeHandle, TodoValidationError};
use crate::repo::todo_repo::TodoRepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure of a save or populate operation.
///
/// Every variant names the node index, handle or depth it originated from,
/// so callers can map it without inspecting messages.
#[derive(Debug)]
pub enum TreeError {
    /// Input graph is malformed; raised before any store call.
    MalformedNode(TodoValidationError),
    /// Child links form a cycle; raised before any store call.
    CycleDetected { index: usize, node: NodeHandle },
    /// Store rejected the write of node `index`. Earlier writes are kept.
    StoreWrite {
        index: usize,
        node: NodeHandle,
        source: TodoRepoError,
    },
    /// Store failed while resolving the level at `depth`.
    StoreRead { depth: usize, source: TodoRepoError },
    /// Node `index` reached the write step with a child id still missing.
    UnresolvedChild { index: usize },
}

impl TreeError {
    /// Stable machine-readable code, also used as the log `error_code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedNode(_) => "malformed_node",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::StoreWrite { .. } => "store_write_failed",
            Self::StoreRead { .. } => "store_read_failed",
            Self::UnresolvedChild { .. } => "unresolved_child",
        }
    }
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedNode(err) => write!(f, "malformed todo: {err}"),
            Self::CycleDetected { index, node } => {
                write!(f, "todo {node} (index {index}) is part of a cycle")
            }
            Self::StoreWrite {
                index,
                node,
                source,
            } => write!(f, "failed to store todo {node} (index {index}): {source}"),
            Self::StoreRead { depth, source } => {
                write!(f, "failed to load todos at depth {depth}: {source}")
            }
            Self::UnresolvedChild { index } => {
                write!(f, "todo at index {index} has a child without stored id")
            }
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedNode(err) => Some(err),
            Self::StoreWrite { source, .. } | Self::StoreRead { source, .. } => Some(source),
            Self::CycleDetected { .. } | Self::UnresolvedChild { .. } => None,
        }
    }
}

impl From<TodoValidationError> for TreeError {
    fn from(value: TodoValidationError) -> Self {
        Self::MalformedNode(value)
    }
}
