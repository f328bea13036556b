//! Lazy level-order traversal.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Depth limit for bounded walks.
///
/// Nodes at depth `>= limit` are visited but not expanded. The unbounded
/// limit is a sentinel value, so the depth check is a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxDepth(usize);

impl MaxDepth {
    pub const UNBOUNDED: Self = Self(usize::MAX);

    pub const fn new(limit: usize) -> Self {
        Self(limit)
    }

    pub const fn limit(self) -> usize {
        self.0
    }

    pub const fn is_unbounded(self) -> bool {
        self.0 == usize::MAX
    }

    /// Returns whether a node at `depth` may have its children expanded.
    pub const fn expands(self, depth: usize) -> bool {
        depth < self.0
    }
}

impl Default for MaxDepth {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl From<Option<usize>> for MaxDepth {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Self::UNBOUNDED, Self::new)
    }
}

/// One traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit<K> {
    pub node: K,
    pub depth: usize,
}

/// Level-order iterator over the nodes reachable from a root.
///
/// Each node is produced once, at the depth it was first discovered.
/// Children are pulled from the accessor only when a node is yielded.
pub struct Traversal<K, F> {
    root: K,
    children: F,
    max_depth: MaxDepth,
    queue: VecDeque<Visit<K>>,
    seen: HashSet<K>,
}

/// Starts an unbounded level-order walk from `root`.
pub fn traverse<K, F, I>(root: K, children: F) -> Traversal<K, F>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
{
    let mut traversal = Traversal {
        root,
        children,
        max_depth: MaxDepth::UNBOUNDED,
        queue: VecDeque::new(),
        seen: HashSet::new(),
    };
    traversal.restart();
    traversal
}

impl<K, F, I> Traversal<K, F>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
{
    /// Limits expansion depth and restarts the walk from the root.
    pub fn with_max_depth(mut self, max_depth: MaxDepth) -> Self {
        self.max_depth = max_depth;
        self.restart();
        self
    }

    /// Resets the walk so the next item is the root again.
    pub fn restart(&mut self) {
        self.queue.clear();
        self.seen.clear();
        self.seen.insert(self.root);
        self.queue.push_back(Visit {
            node: self.root,
            depth: 0,
        });
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.max_depth
    }
}

impl<K, F, I> Iterator for Traversal<K, F>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
{
    type Item = Visit<K>;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.queue.pop_front()?;
        if self.max_depth.expands(visit.depth) {
            for child in (self.children)(visit.node) {
                if self.seen.insert(child) {
                    self.queue.push_back(Visit {
                        node: child,
                        depth: visit.depth + 1,
                    });
                }
            }
        }
        Some(visit)
    }
}
