//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the flat record store contract the tree algorithms consume.
//! - Isolate SQLite query details from tree orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `StillReferenced`)
//!   in addition to DB transport errors.

pub mod todo_repo;
