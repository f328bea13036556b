//! Core tree operations and use-case services.
//!
//! # Responsibility
//! - Persist in-memory todo graphs leaves-first (`persist`).
//! - Rebuild stored trees level by level under a depth limit (`populate`).
//! - Orchestrate both into use-case level APIs (`todo_service`).
//!
//! # Invariants
//! - Store calls of one operation are strictly sequential.
//! - Operation state (indices, pending child ids) never outlives the call.

pub mod error;
pub mod persist;
pub mod populate;
pub mod todo_service;
