//! JSON payload codec for todo trees.
//!
//! Payload shape:
//! `{"description": str, "done"?: bool, "isRoot"?: bool, "_id"?: uuid,
//! "subTodos"?: [todo | uuid]}`.
//!
//! # Invariants
//! - Intake never touches the store; malformed input fails with a
//!   path-annotated [`TodoValidationError`].
//! - Every nested object becomes a distinct node; JSON cannot express sharing.

use crate::model::todo::{ChildSlot, NodeHandle, TodoGraph, TodoNode, TodoValidationError};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

const DESCRIPTION: &str = "description";
const DONE: &str = "done";
const IS_ROOT: &str = "isRoot";
const ID: &str = "_id";
const SUB_TODOS: &str = "subTodos";

/// Builds a graph from one JSON todo and returns it with the root handle.
///
/// Children are added before their parent, so handles follow post-order.
pub fn graph_from_json(value: &Value) -> Result<(TodoGraph, NodeHandle), TodoValidationError> {
    let mut graph = TodoGraph::new();
    let mut stack = vec![ReadFrame::open(value, "$".to_string())?];
    let mut root = None;

    while let Some(mut frame) = stack.pop() {
        let items = frame.items;
        if let Some(child) = items.get(frame.next) {
            let child_path = format!("{}.{SUB_TODOS}[{}]", frame.path, frame.next);
            frame.next += 1;
            if child.is_object() {
                let child_frame = ReadFrame::open(child, child_path)?;
                stack.push(frame);
                stack.push(child_frame);
            } else {
                frame
                    .slots
                    .push(ChildSlot::Stored(read_id(child, &child_path)?));
                stack.push(frame);
            }
            continue;
        }

        let mut node = frame.node;
        node.children = frame.slots;
        let handle = graph.add_node(node);
        match stack.last_mut() {
            Some(parent) => parent.slots.push(ChildSlot::Node(handle)),
            None => root = Some(handle),
        }
    }

    let root = root.ok_or_else(|| TodoValidationError::NotATodo {
        path: "$".to_string(),
    })?;
    Ok((graph, root))
}

/// One payload object whose `subTodos` are still being read.
struct ReadFrame<'a> {
    node: TodoNode,
    path: String,
    items: &'a [Value],
    next: usize,
    slots: Vec<ChildSlot>,
}

impl<'a> ReadFrame<'a> {
    fn open(value: &'a Value, path: String) -> Result<Self, TodoValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| TodoValidationError::NotATodo { path: path.clone() })?;

        let description = object
            .get(DESCRIPTION)
            .and_then(Value::as_str)
            .ok_or_else(|| TodoValidationError::MissingDescription { path: path.clone() })?;

        let mut node = TodoNode::new(description);
        node.done = read_flag(object, DONE, &path)?;
        node.is_root = read_flag(object, IS_ROOT, &path)?;
        node.stored_id = match object.get(ID) {
            None | Some(Value::Null) => None,
            Some(raw) => Some(read_id(raw, &format!("{path}.{ID}"))?),
        };

        let items = match object.get(SUB_TODOS) {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(TodoValidationError::InvalidField {
                    path,
                    field: SUB_TODOS,
                })
            }
        };

        Ok(Self {
            node,
            path,
            items,
            next: 0,
            slots: Vec::with_capacity(items.len()),
        })
    }
}

fn read_flag(
    object: &Map<String, Value>,
    field: &'static str,
    path: &str,
) -> Result<bool, TodoValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(TodoValidationError::InvalidField {
            path: path.to_string(),
            field,
        }),
    }
}

fn read_id(value: &Value, path: &str) -> Result<Uuid, TodoValidationError> {
    let invalid = || TodoValidationError::InvalidReference {
        path: path.to_string(),
        value: value.to_string(),
    };
    let text = value.as_str().ok_or_else(invalid)?;
    Uuid::parse_str(text).map_err(|_| invalid())
}

/// Exports the subtree under `root` as nested JSON.
///
/// Unresolved children become id strings. JSON has no sharing, so a shared
/// node is written once per parent that references it.
pub fn graph_to_json(graph: &TodoGraph, root: NodeHandle) -> Result<Value, TodoValidationError> {
    let mut on_path = HashSet::new();
    let mut stack = vec![WriteFrame::open(graph, root, &mut on_path)?];

    while let Some(mut frame) = stack.pop() {
        if let Some(&slot) = frame.node.children.get(frame.next) {
            frame.next += 1;
            match slot {
                ChildSlot::Node(child) => {
                    let child_frame = WriteFrame::open(graph, child, &mut on_path)?;
                    stack.push(frame);
                    stack.push(child_frame);
                }
                ChildSlot::Stored(id) => {
                    frame.children.push(Value::String(id.to_string()));
                    stack.push(frame);
                }
            }
            continue;
        }

        on_path.remove(&frame.handle);
        let value = frame.finish();
        match stack.last_mut() {
            Some(parent) => parent.children.push(value),
            None => return Ok(value),
        }
    }

    Err(TodoValidationError::UnknownNode(root))
}

/// One node whose children are still being exported.
struct WriteFrame<'g> {
    handle: NodeHandle,
    node: &'g TodoNode,
    next: usize,
    children: Vec<Value>,
}

impl<'g> WriteFrame<'g> {
    fn open(
        graph: &'g TodoGraph,
        handle: NodeHandle,
        on_path: &mut HashSet<NodeHandle>,
    ) -> Result<Self, TodoValidationError> {
        let node = graph
            .node(handle)
            .ok_or(TodoValidationError::UnknownNode(handle))?;
        if !on_path.insert(handle) {
            return Err(TodoValidationError::Cyclic(handle));
        }
        Ok(Self {
            handle,
            node,
            next: 0,
            children: Vec::with_capacity(node.children.len()),
        })
    }

    fn finish(self) -> Value {
        let mut object = Map::new();
        if let Some(id) = self.node.stored_id {
            object.insert(ID.to_string(), Value::String(id.to_string()));
        }
        object.insert(
            DESCRIPTION.to_string(),
            Value::String(self.node.description.clone()),
        );
        object.insert(DONE.to_string(), Value::Bool(self.node.done));
        object.insert(IS_ROOT.to_string(), Value::Bool(self.node.is_root));
        object.insert(SUB_TODOS.to_string(), Value::Array(self.children));
        Value::Object(object)
    }
}
