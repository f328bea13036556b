mod common;

use common::{recording, setup};
use todotree_core::{
    populate_node, populate_tree, save_tree, ChildSlot, MaxDepth, NodeHandle, TodoGraph,
    TodoRepoError, TodoRepository, TreeError,
};
use uuid::Uuid;

fn chain(graph: &mut TodoGraph, names: &[&str]) -> Vec<NodeHandle> {
    let handles: Vec<_> = names.iter().map(|name| graph.add_todo(*name)).collect();
    for pair in handles.windows(2) {
        graph.push_child(pair[0], pair[1]).unwrap();
    }
    handles
}

fn resolved_child(graph: &TodoGraph, parent: NodeHandle, position: usize) -> NodeHandle {
    match graph.node(parent).unwrap().children[position] {
        ChildSlot::Node(handle) => handle,
        ChildSlot::Stored(id) => panic!("child {position} still unresolved: {id}"),
    }
}

#[test]
fn depth_limit_resolves_only_the_first_level() {
    let conn = setup();
    let repo = recording(&conn);
    let mut source = TodoGraph::new();
    let nodes = chain(&mut source, &["root", "child", "grandchild"]);
    let saved = save_tree(&repo, &source, nodes[0]).unwrap();

    let tree = populate_tree(&repo, saved.root_id, MaxDepth::new(1)).unwrap();

    let child = resolved_child(&tree.graph, tree.root, 0);
    let child_node = tree.graph.node(child).unwrap();
    assert_eq!(child_node.description, "child");
    assert_eq!(
        child_node.children,
        vec![ChildSlot::Stored(saved.id_of(nodes[2]).unwrap())]
    );
    assert!(child_node.has_unresolved_children());
}

#[test]
fn zero_depth_leaves_root_children_unresolved() {
    let conn = setup();
    let repo = recording(&conn);
    let mut source = TodoGraph::new();
    let nodes = chain(&mut source, &["root", "child"]);
    let saved = save_tree(&repo, &source, nodes[0]).unwrap();
    repo.clear();

    let tree = populate_tree(&repo, saved.root_id, MaxDepth::new(0)).unwrap();

    assert_eq!(tree.graph.len(), 1);
    assert!(tree.root_node().unwrap().has_unresolved_children());
    assert_eq!(repo.fetches(), vec![vec![saved.root_id]]);
}

#[test]
fn unbounded_resolves_everything_in_child_order() {
    let conn = setup();
    let repo = recording(&conn);
    let mut source = TodoGraph::new();
    let root = source.add_todo("root");
    for name in ["a", "b", "c"] {
        let child = source.add_todo(name);
        source.push_child(root, child).unwrap();
        let leaf = source.add_todo(format!("{name}-leaf"));
        source.push_child(child, leaf).unwrap();
    }
    let saved = save_tree(&repo, &source, root).unwrap();

    let tree = populate_tree(&repo, saved.root_id, MaxDepth::UNBOUNDED).unwrap();

    assert_eq!(tree.graph.len(), 7);
    assert!(tree
        .graph
        .handles()
        .all(|handle| !tree.graph.node(handle).unwrap().has_unresolved_children()));
    let names: Vec<_> = (0..3)
        .map(|position| {
            let child = resolved_child(&tree.graph, tree.root, position);
            tree.graph.node(child).unwrap().description.clone()
        })
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(tree.root_id(), Some(saved.root_id));
}

#[test]
fn issues_one_fetch_per_expanded_level() {
    let conn = setup();
    let repo = recording(&conn);
    let mut source = TodoGraph::new();
    let root = source.add_todo("root");
    let a = source.add_todo("a");
    let b = source.add_todo("b");
    source.push_child(root, a).unwrap();
    source.push_child(root, b).unwrap();
    let c = source.add_todo("c");
    let d = source.add_todo("d");
    source.push_child(a, c).unwrap();
    source.push_child(b, d).unwrap();
    let saved = save_tree(&repo, &source, root).unwrap();
    repo.clear();

    populate_tree(&repo, saved.root_id, MaxDepth::UNBOUNDED).unwrap();

    let id = |handle| saved.id_of(handle).unwrap();
    assert_eq!(
        repo.fetches(),
        vec![vec![id(root)], vec![id(a), id(b)], vec![id(c), id(d)]]
    );
}

#[test]
fn shared_record_becomes_one_node() {
    let conn = setup();
    let repo = recording(&conn);
    let mut source = TodoGraph::new();
    let root = source.add_todo("root");
    let left = source.add_todo("left");
    let right = source.add_todo("right");
    let shared = source.add_todo("shared");
    source.push_child(root, left).unwrap();
    source.push_child(root, right).unwrap();
    source.push_child(left, shared).unwrap();
    source.push_child(right, shared).unwrap();
    let saved = save_tree(&repo, &source, root).unwrap();

    let tree = populate_tree(&repo, saved.root_id, MaxDepth::UNBOUNDED).unwrap();

    assert_eq!(tree.graph.len(), 4);
    let left_node = resolved_child(&tree.graph, tree.root, 0);
    let right_node = resolved_child(&tree.graph, tree.root, 1);
    assert_eq!(
        resolved_child(&tree.graph, left_node, 0),
        resolved_child(&tree.graph, right_node, 0)
    );
}

#[test]
fn missing_root_is_a_read_error() {
    let conn = setup();
    let repo = recording(&conn);
    let missing = Uuid::new_v4();

    let err = populate_tree(&repo, missing, MaxDepth::UNBOUNDED).unwrap_err();

    assert!(matches!(
        err,
        TreeError::StoreRead {
            depth: 0,
            source: TodoRepoError::NotFound(id),
        } if id == missing
    ));
    assert_eq!(err.code(), "store_read_failed");
}

#[test]
fn dangling_child_id_fails_at_its_level() {
    let conn = setup();
    let repo = recording(&conn);
    let mut graph = TodoGraph::new();
    let root = graph.add_todo("root");
    let child = graph.add_todo("child");
    graph.push_child(root, child).unwrap();
    let dangling = Uuid::new_v4();
    graph.push_stored_child(child, dangling).unwrap();

    let err = populate_node(&repo, &mut graph, root, MaxDepth::UNBOUNDED).unwrap_err();

    assert!(matches!(
        err,
        TreeError::StoreRead {
            depth: 1,
            source: TodoRepoError::NotFound(id),
        } if id == dangling
    ));
}

#[test]
fn partially_built_node_resolves_below_in_memory_children() {
    let conn = setup();
    let repo = recording(&conn);
    let leaf = repo
        .insert_todo(&todotree_core::NewTodo {
            description: "stored leaf".to_string(),
            done: true,
            is_root: false,
            children: vec![],
        })
        .unwrap();
    repo.clear();

    let mut graph = TodoGraph::new();
    let root = graph.add_todo("draft root");
    let draft = graph.add_todo("draft child");
    graph.push_child(root, draft).unwrap();
    graph.push_stored_child(draft, leaf).unwrap();

    populate_node(&repo, &mut graph, root, MaxDepth::UNBOUNDED).unwrap();

    let resolved = resolved_child(&graph, draft, 0);
    let node = graph.node(resolved).unwrap();
    assert_eq!(node.description, "stored leaf");
    assert!(node.done);
    assert_eq!(repo.fetches(), vec![vec![leaf]]);
}
