//! Todo domain model.
//!
//! # Responsibility
//! - Define the in-memory todo graph and the flat stored record shape.
//! - Convert between the JSON payload shape and the graph.
//!
//! # Invariants
//! - Node identity is arena-handle based.
//! - Stored ids are generated by the store and never reassigned.

pub mod todo;
pub mod todo_json;
