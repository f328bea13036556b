//! Todo domain model.
//!
//! # Responsibility
//! - Define the in-memory todo graph handed to persistence and returned by
//!   population.
//! - Define the flat record shape exchanged with the record store.
//!
//! # Invariants
//! - Node identity is the arena handle, never field equality: two nodes with
//!   identical fields are distinct vertices.
//! - A child slot is either an in-memory node of the same graph or the id of
//!   an already stored record.
//! - Handles are only meaningful for the graph that issued them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier generated by the store when a todo record is inserted.
pub type TodoId = Uuid;

/// Opaque identity of one node inside a [`TodoGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Arena slot of this handle.
    pub fn slot(self) -> usize {
        self.0
    }
}

impl Display for NodeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One position in a node's ordered child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSlot {
    /// Child that still lives in memory (owned by the graph).
    Node(NodeHandle),
    /// Child that is already persisted and referenced by id only.
    Stored(TodoId),
}

/// In-memory todo node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoNode {
    pub description: String,
    pub done: bool,
    /// Marks top-level trees listed by [`crate::TodoService::list_root_trees`].
    pub is_root: bool,
    pub children: Vec<ChildSlot>,
    /// Id of the record this node was materialized from, if any.
    pub stored_id: Option<TodoId>,
}

impl TodoNode {
    /// Creates an open, non-root todo without children.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: false,
            is_root: false,
            children: Vec::new(),
            stored_id: None,
        }
    }

    /// Builds a node from a stored record; children stay unresolved.
    pub fn from_record(record: TodoRecord) -> Self {
        Self {
            description: record.description,
            done: record.done,
            is_root: record.is_root,
            children: record.children.into_iter().map(ChildSlot::Stored).collect(),
            stored_id: Some(record.id),
        }
    }

    /// In-memory children in child-list order, duplicates included.
    pub fn child_handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.children.iter().filter_map(|slot| match slot {
            ChildSlot::Node(handle) => Some(*handle),
            ChildSlot::Stored(_) => None,
        })
    }

    /// Returns whether any child is still an unresolved id.
    pub fn has_unresolved_children(&self) -> bool {
        self.children
            .iter()
            .any(|slot| matches!(slot, ChildSlot::Stored(_)))
    }
}

/// Arena holding every node of one in-memory todo graph.
///
/// Several parents may point at the same handle (shared subtree). Nothing
/// stops a caller from linking a cycle; persistence rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoGraph {
    nodes: Vec<TodoNode>,
}

impl TodoGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a node into the arena and returns its identity.
    pub fn add_node(&mut self, node: TodoNode) -> NodeHandle {
        self.nodes.push(node);
        NodeHandle(self.nodes.len() - 1)
    }

    /// Shorthand for adding an open, non-root todo.
    pub fn add_todo(&mut self, description: impl Into<String>) -> NodeHandle {
        self.add_node(TodoNode::new(description))
    }

    /// Appends `child` to the child list of `parent`.
    pub fn push_child(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
    ) -> Result<(), TodoValidationError> {
        if !self.contains(child) {
            return Err(TodoValidationError::UnknownNode(child));
        }
        self.node_mut(parent)
            .ok_or(TodoValidationError::UnknownNode(parent))?
            .children
            .push(ChildSlot::Node(child));
        Ok(())
    }

    /// Appends a reference to an already stored record to `parent`.
    pub fn push_stored_child(
        &mut self,
        parent: NodeHandle,
        child: TodoId,
    ) -> Result<(), TodoValidationError> {
        self.node_mut(parent)
            .ok_or(TodoValidationError::UnknownNode(parent))?
            .children
            .push(ChildSlot::Stored(child));
        Ok(())
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&TodoNode> {
        self.nodes.get(handle.0)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut TodoNode> {
        self.nodes.get_mut(handle.0)
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        handle.0 < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every handle issued by this graph, in creation order.
    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> {
        (0..self.nodes.len()).map(NodeHandle)
    }

    /// In-memory children of `handle`; empty for unknown handles.
    pub fn child_handles(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.node(handle)
            .map(|node| node.child_handles().collect())
            .unwrap_or_default()
    }

    /// Checks that `root` and every node reachable from it exist.
    ///
    /// Runs before any store call so a malformed graph fails without writes.
    pub fn validate_from(&self, root: NodeHandle) -> Result<(), TodoValidationError> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            if !seen.insert(handle) {
                continue;
            }
            let node = self
                .node(handle)
                .ok_or(TodoValidationError::UnknownNode(handle))?;
            stack.extend(node.child_handles());
        }
        Ok(())
    }
}

/// Flat record handed to the store's insert primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub description: String,
    pub done: bool,
    pub is_root: bool,
    /// Ids of already stored children, in child-list order.
    pub children: Vec<TodoId>,
}

/// Stored todo record.
///
/// Serializes flat: `{"id", "description", "done", "is_root", "children"}`
/// with children as id strings. This is the shape `todotree record` prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub id: TodoId,
    pub description: String,
    pub done: bool,
    pub is_root: bool,
    pub children: Vec<TodoId>,
}

impl TodoRecord {
    /// Attaches a generated id to an inserted record.
    pub fn from_new(id: TodoId, todo: NewTodo) -> Self {
        Self {
            id,
            description: todo.description,
            done: todo.done,
            is_root: todo.is_root,
            children: todo.children,
        }
    }
}

/// Malformed todo input, detected before any store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    /// Handle does not belong to the graph.
    UnknownNode(NodeHandle),
    /// Value at `path` is not a todo object.
    NotATodo { path: String },
    /// Todo at `path` has no string `description`.
    MissingDescription { path: String },
    /// Field has the wrong JSON type.
    InvalidField { path: String, field: &'static str },
    /// Child reference is neither a todo object nor a valid id.
    InvalidReference { path: String, value: String },
    /// Export reached a node that is already on the current path.
    Cyclic(NodeHandle),
    /// Writing the tree would make stored todo `id` its own descendant.
    CyclicReference(TodoId),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNode(handle) => write!(f, "todo node {handle} is not part of the graph"),
            Self::NotATodo { path } => write!(f, "invalid todo at {path}"),
            Self::MissingDescription { path } => {
                write!(f, "todo at {path} requires a string `description`")
            }
            Self::InvalidField { path, field } => {
                write!(f, "todo at {path} has invalid `{field}`")
            }
            Self::InvalidReference { path, value } => {
                write!(f, "invalid child reference `{value}` at {path}")
            }
            Self::Cyclic(handle) => write!(f, "todo node {handle} is its own descendant"),
            Self::CyclicReference(id) => {
                write!(f, "todo {id} would become its own descendant")
            }
        }
    }
}

impl Error for TodoValidationError {}
