use todotree_core::{ChildSlot, TodoGraph, TodoNode, TodoRecord};
use uuid::Uuid;

#[test]
fn record_serialization_uses_expected_wire_fields() {
    let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let child = Uuid::parse_str("66666666-7777-4888-9999-aaaaaaaaaaaa").unwrap();
    let record = TodoRecord {
        id,
        description: "water plants".to_string(),
        done: true,
        is_root: false,
        children: vec![child],
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["description"], "water plants");
    assert_eq!(json["done"], true);
    assert_eq!(json["is_root"], false);
    assert_eq!(json["children"], serde_json::json!([child.to_string()]));

    let decoded: TodoRecord = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn node_from_record_keeps_children_unresolved_in_order() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let record = TodoRecord {
        id: Uuid::new_v4(),
        description: "parent".to_string(),
        done: false,
        is_root: true,
        children: vec![first, second],
    };
    let id = record.id;

    let node = TodoNode::from_record(record);

    assert_eq!(node.stored_id, Some(id));
    assert!(node.is_root);
    assert!(node.has_unresolved_children());
    assert_eq!(
        node.children,
        vec![ChildSlot::Stored(first), ChildSlot::Stored(second)]
    );
}

#[test]
fn identical_nodes_get_distinct_handles() {
    let mut graph = TodoGraph::new();

    let a = graph.add_todo("same");
    let b = graph.add_todo("same");

    assert_ne!(a, b);
    assert_eq!(graph.node(a), graph.node(b));
    assert_eq!(graph.len(), 2);
}
