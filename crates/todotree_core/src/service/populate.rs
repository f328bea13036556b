//! Depth-bounded reconstruction of stored todo trees.
//!
//! # Responsibility
//! - Replace id-only child slots with materialized nodes, one level at a
//!   time, up to a depth limit.
//!
//! # Invariants
//! - At most one store fetch per expanded level; levels are fetched in
//!   order.
//! - Nodes at depth `>= limit` keep their unresolved child ids.
//! - A record referenced by several parents becomes one shared node.

use crate::graph::MaxDepth;
use crate::model::todo::{ChildSlot, NodeHandle, TodoGraph, TodoId, TodoNode, TodoValidationError};
use crate::model::todo_json::graph_to_json;
use crate::repo::todo_repo::{TodoRepoError, TodoRepository};
use crate::service::error::TreeError;
use log::{debug, error};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Graph materialized from the store together with its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedTree {
    pub graph: TodoGraph,
    pub root: NodeHandle,
}

impl PopulatedTree {
    pub fn root_node(&self) -> Option<&TodoNode> {
        self.graph.node(self.root)
    }

    /// Id of the stored root record.
    pub fn root_id(&self) -> Option<TodoId> {
        self.root_node().and_then(|node| node.stored_id)
    }

    /// Nested JSON in the payload shape accepted by
    /// [`crate::graph_from_json`].
    pub fn to_json(&self) -> Result<Value, TodoValidationError> {
        graph_to_json(&self.graph, self.root)
    }
}

/// Loads record `id` and materializes its descendants up to `max_depth`.
///
/// Issues one fetch for the root record plus one per expanded level.
pub fn populate_tree<R>(repo: &R, id: TodoId, max_depth: MaxDepth) -> Result<PopulatedTree, TreeError>
where
    R: TodoRepository + ?Sized,
{
    let record = repo
        .fetch_todos(&[id])
        .and_then(|records| {
            records
                .into_iter()
                .find(|record| record.id == id)
                .ok_or(TodoRepoError::NotFound(id))
        })
        .map_err(|source| TreeError::StoreRead { depth: 0, source })?;

    let mut graph = TodoGraph::new();
    let root = graph.add_node(TodoNode::from_record(record));
    populate_node(repo, &mut graph, root, max_depth)?;
    Ok(PopulatedTree { graph, root })
}

/// Resolves the stored children below an in-memory node, level by level.
///
/// `root` may already carry in-memory children; those are walked without
/// fetching and their own id-only children are resolved like any other.
pub fn populate_node<R>(
    repo: &R,
    graph: &mut TodoGraph,
    root: NodeHandle,
    max_depth: MaxDepth,
) -> Result<(), TreeError>
where
    R: TodoRepository + ?Sized,
{
    graph.validate_from(root)?;

    let started_at = Instant::now();
    let mut materialized: HashMap<TodoId, NodeHandle> = graph
        .handles()
        .filter_map(|handle| {
            graph
                .node(handle)
                .and_then(|node| node.stored_id)
                .map(|id| (id, handle))
        })
        .collect();
    let mut expanded = HashSet::from([root]);
    let mut level = vec![root];
    let mut depth = 0;
    let mut fetches = 0;

    while !level.is_empty() && max_depth.expands(depth) {
        let wanted = unresolved_ids(graph, &level, &materialized);
        if !wanted.is_empty() {
            let records = repo.fetch_todos(&wanted).map_err(|source| {
                let err = TreeError::StoreRead { depth, source };
                error!(
                    "event=tree_populate module=populate status=error depth={depth} error_code={} error={err}",
                    err.code()
                );
                err
            })?;
            fetches += 1;
            for record in records {
                let id = record.id;
                let handle = graph.add_node(TodoNode::from_record(record));
                materialized.insert(id, handle);
            }
            if let Some(missing) = wanted.iter().find(|id| !materialized.contains_key(*id)) {
                return Err(TreeError::StoreRead {
                    depth,
                    source: TodoRepoError::NotFound(*missing),
                });
            }
        }

        let mut next = Vec::new();
        for &parent in &level {
            let Some(node) = graph.node_mut(parent) else {
                continue;
            };
            for slot in node.children.iter_mut() {
                if let ChildSlot::Stored(id) = *slot {
                    if let Some(&handle) = materialized.get(&id) {
                        *slot = ChildSlot::Node(handle);
                    }
                }
                if let ChildSlot::Node(child) = *slot {
                    if expanded.insert(child) {
                        next.push(child);
                    }
                }
            }
        }

        level = next;
        depth += 1;
    }

    debug!(
        "event=tree_populate module=populate status=ok levels={depth} fetches={fetches} nodes={} max_depth={} duration_ms={}",
        expanded.len(),
        if max_depth.is_unbounded() {
            "unbounded".to_string()
        } else {
            max_depth.limit().to_string()
        },
        started_at.elapsed().as_millis()
    );
    Ok(())
}

/// Stored child ids of `level` that are not in memory yet, first seen first.
fn unresolved_ids(
    graph: &TodoGraph,
    level: &[NodeHandle],
    materialized: &HashMap<TodoId, NodeHandle>,
) -> Vec<TodoId> {
    let mut seen = HashSet::new();
    level
        .iter()
        .filter_map(|&handle| graph.node(handle))
        .flat_map(|node| node.children.iter())
        .filter_map(|slot| match slot {
            ChildSlot::Stored(id) if !materialized.contains_key(id) => Some(*id),
            _ => None,
        })
        .filter(|id| seen.insert(*id))
        .collect()
}
