//! Dense indexing and adjacency lists over a child-linked node set.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Index assignment plus forward/backward edge lists for one node set.
///
/// Valid only for the operation that built it.
#[derive(Debug, Clone)]
pub struct Adjacency<K> {
    index_of: HashMap<K, usize>,
    node_of: Vec<K>,
    out_vertices: Vec<Vec<usize>>,
    in_vertices: Vec<Vec<usize>>,
}

impl<K: Copy + Eq + Hash> Adjacency<K> {
    /// Index assigned to `node`, if it is reachable from the root.
    pub fn index_of(&self, node: &K) -> Option<usize> {
        self.index_of.get(node).copied()
    }

    pub fn node_of(&self, index: usize) -> Option<K> {
        self.node_of.get(index).copied()
    }

    /// Nodes in index order. Index order is BFS discovery order.
    pub fn nodes(&self) -> &[K] {
        &self.node_of
    }

    /// Child indices of `index` in child-list order.
    pub fn out_vertices(&self, index: usize) -> &[usize] {
        self.out_vertices
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parent indices of `index`, one per distinct parent, in discovery order.
    pub fn in_vertices(&self, index: usize) -> &[usize] {
        self.in_vertices
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn all_out_vertices(&self) -> &[Vec<usize>] {
        &self.out_vertices
    }

    pub fn all_in_vertices(&self) -> &[Vec<usize>] {
        &self.in_vertices
    }

    pub fn len(&self) -> usize {
        self.node_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_of.is_empty()
    }
}

/// Walks every node reachable from `root` breadth-first and indexes it.
///
/// A node reachable through several parents gets one index; every parent
/// edge is recorded. A child listed twice by the same parent appears twice
/// in that parent's out-list but adds only one in-edge.
pub fn build_adjacency<K, F, I>(root: K, mut children: F) -> Adjacency<K>
where
    K: Copy + Eq + Hash,
    F: FnMut(K) -> I,
    I: IntoIterator<Item = K>,
{
    let mut adjacency = Adjacency {
        index_of: HashMap::new(),
        node_of: Vec::new(),
        out_vertices: Vec::new(),
        in_vertices: Vec::new(),
    };
    let mut queue = VecDeque::new();
    queue.push_back(discover(&mut adjacency, root));

    while let Some(parent) = queue.pop_front() {
        let parent_node = adjacency.node_of[parent];
        for child_node in children(parent_node) {
            let child = match adjacency.index_of.get(&child_node) {
                Some(&known) => known,
                None => {
                    let index = discover(&mut adjacency, child_node);
                    queue.push_back(index);
                    index
                }
            };
            adjacency.out_vertices[parent].push(child);
            if !adjacency.in_vertices[child].contains(&parent) {
                adjacency.in_vertices[child].push(parent);
            }
        }
    }

    adjacency
}

fn discover<K: Copy + Eq + Hash>(adjacency: &mut Adjacency<K>, node: K) -> usize {
    let index = adjacency.node_of.len();
    adjacency.index_of.insert(node, index);
    adjacency.node_of.push(node);
    adjacency.out_vertices.push(Vec::new());
    adjacency.in_vertices.push(Vec::new());
    index
}
