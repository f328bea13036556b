//! Children-before-parents ordering.

use crate::graph::{Adjacency, GraphError};
use std::collections::{BinaryHeap, HashSet};
use std::hash::Hash;

/// Orders every indexed node so each child precedes all of its parents.
///
/// Nodes are taken in reverse `level_order`; a node whose children are not
/// all placed yet is deferred until they are. When reverse level order is
/// already safe (every edge points to a later-discovered node) the result
/// is exactly that order.
///
/// # Errors
/// - [`GraphError::CycleDetected`] when some nodes can never become ready.
pub fn leaves_to_root<K>(
    adjacency: &Adjacency<K>,
    level_order: &[K],
) -> Result<Vec<usize>, GraphError>
where
    K: Copy + Eq + Hash,
{
    let count = adjacency.len();

    let mut rank: Vec<usize> = (0..count).collect();
    for (position, node) in level_order.iter().enumerate() {
        if let Some(index) = adjacency.index_of(node) {
            rank[index] = position;
        }
    }

    let mut waiting_on: Vec<usize> = (0..count)
        .map(|index| {
            adjacency
                .out_vertices(index)
                .iter()
                .collect::<HashSet<_>>()
                .len()
        })
        .collect();

    let mut ready: BinaryHeap<(usize, usize)> = (0..count)
        .filter(|&index| waiting_on[index] == 0)
        .map(|index| (rank[index], index))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some((_, index)) = ready.pop() {
        order.push(index);
        for &parent in adjacency.in_vertices(index) {
            waiting_on[parent] -= 1;
            if waiting_on[parent] == 0 {
                ready.push((rank[parent], parent));
            }
        }
    }

    if order.len() < count {
        let blocked = (0..count)
            .filter(|&index| waiting_on[index] > 0)
            .max_by_key(|&index| rank[index])
            .unwrap_or(0);
        return Err(GraphError::CycleDetected { index: blocked });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::leaves_to_root;
    use crate::graph::{build_adjacency, traverse, GraphError};

    fn children(node: char) -> Vec<char> {
        match node {
            'r' => vec!['a', 'b'],
            'b' => vec!['a'],
            _ => vec![],
        }
    }

    #[test]
    fn defers_parent_whose_child_was_discovered_earlier() {
        let adjacency = build_adjacency('r', children);
        let level: Vec<char> = traverse('r', children).map(|visit| visit.node).collect();

        let order = leaves_to_root(&adjacency, &level).unwrap();
        let names: Vec<char> = order
            .iter()
            .map(|&index| adjacency.node_of(index).unwrap())
            .collect();
        assert_eq!(names, vec!['a', 'b', 'r']);
    }

    #[test]
    fn plain_tree_is_reverse_level_order() {
        let tree = |node: u8| match node {
            0 => vec![1, 2],
            2 => vec![3, 4],
            _ => vec![],
        };
        let adjacency = build_adjacency(0_u8, tree);
        let level: Vec<u8> = traverse(0_u8, tree).map(|visit| visit.node).collect();

        assert_eq!(leaves_to_root(&adjacency, &level).unwrap(), vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn cycle_is_reported() {
        let ring = |node: u8| vec![(node + 1) % 3];
        let adjacency = build_adjacency(0_u8, ring);
        let level: Vec<u8> = traverse(0_u8, ring).map(|visit| visit.node).collect();

        assert!(matches!(
            leaves_to_root(&adjacency, &level),
            Err(GraphError::CycleDetected { .. })
        ));
    }
}
