//! Todo tree use-case service.
//!
//! # Responsibility
//! - Offer the create/get/list/replace/delete use cases callers build on.
//! - Translate store and tree failures into semantic service errors.
//!
//! # Invariants
//! - Created trees are flagged `is_root` and returned fully populated.
//! - Replacing a tree rewrites the root record in place. Nested nodes that
//!   carry a stored id are rewritten too; the rest are inserted first.
//! - A replacement that would make any record its own descendant, through
//!   in-memory nodes or stored child ids, is refused before the first write.

use crate::graph::{build_adjacency, leaves_to_root, traverse, GraphError, MaxDepth};
use crate::model::todo::{
    ChildSlot, NodeHandle, TodoGraph, TodoId, TodoRecord, TodoValidationError,
};
use crate::repo::todo_repo::{TodoRepoError, TodoRepository};
use crate::service::error::TreeError;
use crate::service::persist::{save_tree, save_with_mode, WriteMode};
use crate::service::populate::{populate_tree, PopulatedTree};
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from todo service operations.
#[derive(Debug)]
pub enum TodoServiceError {
    /// Input tree is malformed.
    InvalidTodo(TodoValidationError),
    /// Target todo does not exist.
    TodoNotFound(TodoId),
    /// Save/populate failure other than a missing record.
    Tree(TreeError),
    /// Repository-level failure.
    Repo(TodoRepoError),
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTodo(err) => write!(f, "invalid todo: {err}"),
            Self::TodoNotFound(id) => write!(f, "there is no todo with id {id}"),
            Self::Tree(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTodo(err) => Some(err),
            Self::Tree(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::TodoNotFound(_) => None,
        }
    }
}

impl From<TreeError> for TodoServiceError {
    fn from(value: TreeError) -> Self {
        match value {
            TreeError::MalformedNode(err) => Self::InvalidTodo(err),
            TreeError::StoreRead {
                source: TodoRepoError::NotFound(id),
                ..
            } => Self::TodoNotFound(id),
            other => Self::Tree(other),
        }
    }
}

impl From<TodoRepoError> for TodoServiceError {
    fn from(value: TodoRepoError) -> Self {
        match value {
            TodoRepoError::NotFound(id) => Self::TodoNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Todo tree service facade.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Persists the graph below `root` as-is and returns the root id.
    pub fn save_tree(
        &self,
        graph: &TodoGraph,
        root: NodeHandle,
    ) -> Result<TodoId, TodoServiceError> {
        Ok(save_tree(&self.repo, graph, root)?.root_id)
    }

    /// Saves the graph as a new top-level tree and reads it back populated.
    pub fn create_root_tree(
        &self,
        mut graph: TodoGraph,
        root: NodeHandle,
    ) -> Result<PopulatedTree, TodoServiceError> {
        graph
            .node_mut(root)
            .ok_or(TodoValidationError::UnknownNode(root))
            .map_err(TodoServiceError::InvalidTodo)?
            .is_root = true;
        let root_id = save_tree(&self.repo, &graph, root)?.root_id;
        self.get_tree(root_id, MaxDepth::UNBOUNDED)
    }

    /// Loads one tree populated up to `max_depth`.
    pub fn get_tree(
        &self,
        id: TodoId,
        max_depth: MaxDepth,
    ) -> Result<PopulatedTree, TodoServiceError> {
        populate_tree(&self.repo, id, max_depth).map_err(Into::into)
    }

    /// Loads the flat stored record `id`; children stay ids.
    pub fn get_record(&self, id: TodoId) -> Result<TodoRecord, TodoServiceError> {
        self.find(id)?.ok_or(TodoServiceError::TodoNotFound(id))
    }

    /// Loads every top-level tree, oldest first.
    pub fn list_root_trees(
        &self,
        max_depth: MaxDepth,
    ) -> Result<Vec<PopulatedTree>, TodoServiceError> {
        self.repo
            .list_root_ids()?
            .into_iter()
            .map(|id| self.get_tree(id, max_depth))
            .collect()
    }

    /// Replaces record `id` with the graph below `root`.
    ///
    /// When `id` is unknown the graph is stored as a new top-level tree
    /// under a generated id instead.
    pub fn put_tree(
        &self,
        id: TodoId,
        graph: TodoGraph,
        root: NodeHandle,
    ) -> Result<PopulatedTree, TodoServiceError> {
        match self.find(id)? {
            Some(existing) => self.replace_tree(existing, graph, root),
            None => {
                info!("event=tree_put module=service status=created requested_id={id}");
                self.create_root_tree(graph, root)
            }
        }
    }

    /// Replaces record `id` with the graph below `root`; `id` must exist.
    pub fn update_tree(
        &self,
        id: TodoId,
        graph: TodoGraph,
        root: NodeHandle,
    ) -> Result<PopulatedTree, TodoServiceError> {
        let existing = self.get_record(id)?;
        self.replace_tree(existing, graph, root)
    }

    /// Deletes a top-level tree and every descendant no longer referenced.
    pub fn delete_tree(&self, id: TodoId) -> Result<(), TodoServiceError> {
        self.repo.delete_tree(id)?;
        info!("event=tree_delete module=service status=ok id={id}");
        Ok(())
    }

    fn find(&self, id: TodoId) -> Result<Option<TodoRecord>, TodoServiceError> {
        match self.repo.fetch_todos(&[id]) {
            Ok(mut records) => Ok(records.pop()),
            Err(TodoRepoError::NotFound(_)) => Ok(None),
            Err(err) => Err(TodoServiceError::Repo(err)),
        }
    }

    /// Rewrites `existing` in place. Nested nodes that carry a stored id
    /// overwrite their record; records dropped from the tree stay stored.
    fn replace_tree(
        &self,
        existing: TodoRecord,
        mut graph: TodoGraph,
        root: NodeHandle,
    ) -> Result<PopulatedTree, TodoServiceError> {
        let id = existing.id;
        let root_node = graph
            .node_mut(root)
            .ok_or(TodoServiceError::InvalidTodo(TodoValidationError::UnknownNode(root)))?;
        root_node.is_root |= existing.is_root;
        root_node.stored_id = Some(id);

        if let Err(err) = self.ensure_no_cycle_after_replace(&graph, root) {
            error!("event=tree_replace module=service status=rejected id={id} error={err}");
            return Err(err);
        }

        let saved = save_with_mode(&self.repo, &graph, root, WriteMode::ReplaceStored)?;
        info!(
            "event=tree_replace module=service status=ok id={id} nodes={}",
            saved.len()
        );
        self.get_tree(id, MaxDepth::UNBOUNDED)
    }

    /// Walks the tree as the store will see it after the replacement.
    ///
    /// A node carrying a stored id stands for that record, so its old stored
    /// children are ignored. Any other stored child is followed through the
    /// store. A cycle anywhere in that view would leave a record that can
    /// never be exported or deleted.
    fn ensure_no_cycle_after_replace(
        &self,
        graph: &TodoGraph,
        root: NodeHandle,
    ) -> Result<(), TodoServiceError> {
        let mut rewritten: HashMap<TodoId, Vec<NodeHandle>> = HashMap::new();
        for visit in traverse(root, |handle| graph.child_handles(handle)) {
            if let Some(id) = graph.node(visit.node).and_then(|node| node.stored_id) {
                rewritten.entry(id).or_default().push(visit.node);
            }
        }

        let mut read_failure = None;
        let adjacency = build_adjacency(vertex_of(graph, root), |vertex| match vertex {
            Vertex::Node(handle) => child_vertices(graph, &[handle]),
            Vertex::Record(id) => match rewritten.get(&id) {
                Some(handles) => child_vertices(graph, handles),
                None if read_failure.is_some() => Vec::new(),
                None => match self.repo.fetch_todos(&[id]) {
                    Ok(records) => records
                        .into_iter()
                        .flat_map(|record| record.children)
                        .map(Vertex::Record)
                        .collect(),
                    Err(err) => {
                        read_failure = Some(err);
                        Vec::new()
                    }
                },
            },
        });
        if let Some(err) = read_failure {
            return Err(err.into());
        }

        match leaves_to_root(&adjacency, adjacency.nodes()) {
            Ok(_) => Ok(()),
            Err(GraphError::CycleDetected { index }) => {
                let err = match adjacency.node_of(index) {
                    Some(Vertex::Node(handle)) => TodoValidationError::Cyclic(handle),
                    Some(Vertex::Record(id)) => TodoValidationError::CyclicReference(id),
                    None => TodoValidationError::Cyclic(root),
                };
                Err(TodoServiceError::InvalidTodo(err))
            }
        }
    }
}

/// Vertex of the post-replacement view: a stored record or a node that
/// will become a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Vertex {
    Node(NodeHandle),
    Record(TodoId),
}

fn vertex_of(graph: &TodoGraph, handle: NodeHandle) -> Vertex {
    match graph.node(handle).and_then(|node| node.stored_id) {
        Some(id) => Vertex::Record(id),
        None => Vertex::Node(handle),
    }
}

/// Children of every node in `handles`, which all stand for one vertex.
fn child_vertices(graph: &TodoGraph, handles: &[NodeHandle]) -> Vec<Vertex> {
    handles
        .iter()
        .filter_map(|&handle| graph.node(handle))
        .flat_map(|node| node.children.iter())
        .map(|slot| match *slot {
            ChildSlot::Node(child) => vertex_of(graph, child),
            ChildSlot::Stored(id) => Vertex::Record(id),
        })
        .collect()
}
