//! Index-based graph algorithms over child links.
//!
//! # Responsibility
//! - Assign dense indices to reachable nodes and record forward/backward
//!   edges (`adjacency`).
//! - Produce level-order visits, optionally depth-bounded (`traversal`).
//! - Derive a children-before-parents processing order (`order`).
//!
//! # Invariants
//! - Algorithms are generic over a copyable node key and a child accessor;
//!   node identity is key equality, never node content.
//! - Every walk tracks visited keys, so cyclic links never loop forever.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod adjacency;
pub mod order;
pub mod traversal;

pub use adjacency::{build_adjacency, Adjacency};
pub use order::leaves_to_root;
pub use traversal::{traverse, MaxDepth, Traversal, Visit};

/// Errors from graph ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node at `index` waits on a cycle of child links and can never be
    /// ordered after all of its children.
    CycleDetected { index: usize },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected { index } => {
                write!(f, "child links form a cycle through node index {index}")
            }
        }
    }
}

impl Error for GraphError {}
