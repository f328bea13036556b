//! Leaves-first persistence of an in-memory todo graph.
//!
//! # Responsibility
//! - Turn a node graph into flat records, children before parents.
//! - Feed every generated id back into the pending child lists of the
//!   parents that reference the node.
//!
//! # Invariants
//! - Malformed input and cycles fail before the first store call.
//! - Exactly one write (insert or replace) per reachable node; a shared
//!   node is written once.
//! - A parent is written only after all of its in-memory children.
//! - No rollback: a failed write leaves earlier records in the store.

use crate::graph::{build_adjacency, leaves_to_root, traverse, Adjacency, GraphError};
use crate::model::todo::{
    ChildSlot, NewTodo, NodeHandle, TodoGraph, TodoId, TodoRecord, TodoValidationError,
};
use crate::repo::todo_repo::{TodoRepoError, TodoRepoResult, TodoRepository};
use crate::service::error::TreeError;
use log::{debug, error, info};
use std::collections::HashMap;
use std::time::Instant;

/// Outcome of one save: the root id plus the id given to every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTree {
    pub root_id: TodoId,
    ids: HashMap<NodeHandle, TodoId>,
}

impl SavedTree {
    /// Id stored for `handle` during this save.
    pub fn id_of(&self, handle: NodeHandle) -> Option<TodoId> {
        self.ids.get(&handle).copied()
    }

    /// Number of records written.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// How nodes reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Every node becomes a new record.
    InsertAll,
    /// Nodes carrying a `stored_id` overwrite that record; the rest, and
    /// stored ids the store no longer knows, are inserted.
    ReplaceStored,
}

/// Persists every node reachable from `root` and returns the generated ids.
///
/// Saving the same graph twice creates two independent record sets.
pub fn save_tree<R>(repo: &R, graph: &TodoGraph, root: NodeHandle) -> Result<SavedTree, TreeError>
where
    R: TodoRepository + ?Sized,
{
    save_with_mode(repo, graph, root, WriteMode::InsertAll)
}

pub(crate) fn save_with_mode<R>(
    repo: &R,
    graph: &TodoGraph,
    root: NodeHandle,
    mode: WriteMode,
) -> Result<SavedTree, TreeError>
where
    R: TodoRepository + ?Sized,
{
    let started_at = Instant::now();
    let result = run_save(repo, graph, root, mode);
    match &result {
        Ok(saved) => info!(
            "event=tree_save module=persist status=ok nodes={} root_id={} duration_ms={}",
            saved.len(),
            saved.root_id,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=tree_save module=persist status=error duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
    result
}

fn run_save<R>(
    repo: &R,
    graph: &TodoGraph,
    root: NodeHandle,
    mode: WriteMode,
) -> Result<SavedTree, TreeError>
where
    R: TodoRepository + ?Sized,
{
    graph.validate_from(root)?;

    let children = |handle: NodeHandle| graph.child_handles(handle);
    let adjacency = build_adjacency(root, children);
    let level_order: Vec<NodeHandle> = traverse(root, children).map(|visit| visit.node).collect();
    let order = leaves_to_root(&adjacency, &level_order).map_err(|err| match err {
        GraphError::CycleDetected { index } => TreeError::CycleDetected {
            index,
            node: adjacency.nodes()[index],
        },
    })?;

    let mut pending = PendingChildIds::new(graph, &adjacency);
    let mut ids = HashMap::with_capacity(order.len());

    for index in order {
        let handle = adjacency.nodes()[index];
        let node = graph
            .node(handle)
            .ok_or(TodoValidationError::UnknownNode(handle))?;
        let todo = NewTodo {
            description: node.description.clone(),
            done: node.done,
            is_root: node.is_root,
            children: pending.take(index)?,
        };

        let id = match (mode, node.stored_id) {
            (WriteMode::ReplaceStored, Some(id)) => replace_or_insert(repo, id, todo),
            _ => repo.insert_todo(&todo),
        }
        .map_err(|source| TreeError::StoreWrite {
            index,
            node: handle,
            source,
        })?;
        debug!("event=todo_write module=persist status=ok index={index} node={handle} id={id}");

        pending.resolve(graph, &adjacency, index, id);
        ids.insert(handle, id);
    }

    let root_id = written_root_id(&adjacency, &ids, root)?;
    Ok(SavedTree { root_id, ids })
}

/// Id written for `root`. A root that never got written was never ready,
/// which only a cycle through it can cause.
fn written_root_id(
    adjacency: &Adjacency<NodeHandle>,
    ids: &HashMap<NodeHandle, TodoId>,
    root: NodeHandle,
) -> Result<TodoId, TreeError> {
    ids.get(&root).copied().ok_or_else(|| TreeError::CycleDetected {
        index: adjacency.index_of(&root).unwrap_or_default(),
        node: root,
    })
}

fn replace_or_insert<R>(repo: &R, id: TodoId, todo: NewTodo) -> TodoRepoResult<TodoId>
where
    R: TodoRepository + ?Sized,
{
    let record = TodoRecord::from_new(id, todo);
    match repo.replace_todo(&record) {
        Ok(()) => Ok(id),
        Err(TodoRepoError::NotFound(_)) => {
            debug!("event=todo_write module=persist status=fallback stale_id={id}");
            repo.insert_todo(&NewTodo {
                description: record.description,
                done: record.done,
                is_root: record.is_root,
                children: record.children,
            })
        }
        Err(err) => Err(err),
    }
}

/// Per-save child id slots keyed by node index.
///
/// Each node gets one slot per child-list position. Slots of children that
/// are already stored start filled; the rest are filled as children are
/// written, so the final list keeps the original child order.
struct PendingChildIds {
    slots: HashMap<usize, Vec<Option<TodoId>>>,
}

impl PendingChildIds {
    fn new(graph: &TodoGraph, adjacency: &Adjacency<NodeHandle>) -> Self {
        let slots = adjacency
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, &handle)| {
                let slots = graph
                    .node(handle)
                    .map(|node| {
                        node.children
                            .iter()
                            .map(|slot| match slot {
                                ChildSlot::Stored(id) => Some(*id),
                                ChildSlot::Node(_) => None,
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                (index, slots)
            })
            .collect();
        Self { slots }
    }

    /// Writes `id` into every slot of every parent that points at `index`.
    fn resolve(
        &mut self,
        graph: &TodoGraph,
        adjacency: &Adjacency<NodeHandle>,
        index: usize,
        id: TodoId,
    ) {
        let child = ChildSlot::Node(adjacency.nodes()[index]);
        for &parent in adjacency.in_vertices(index) {
            let (Some(parent_node), Some(parent_slots)) = (
                graph.node(adjacency.nodes()[parent]),
                self.slots.get_mut(&parent),
            ) else {
                continue;
            };
            for (slot, pending) in parent_node.children.iter().zip(parent_slots.iter_mut()) {
                if *slot == child {
                    *pending = Some(id);
                }
            }
        }
    }

    /// Removes the slots of `index`; every one must be filled by now.
    fn take(&mut self, index: usize) -> Result<Vec<TodoId>, TreeError> {
        self.slots
            .remove(&index)
            .unwrap_or_default()
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(TreeError::UnresolvedChild { index })
    }
}
