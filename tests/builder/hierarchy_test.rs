use cubewright::builder::views::build_hierarchy;

fn row(reference: &str, parent: Option<&str>, description: &str) -> (String, Option<String>, String) {
    (
        reference.to_string(),
        parent.map(String::from),
        description.to_string(),
    )
}

#[test]
fn test_chain_attaches_children_to_named_parents() {
    // [{ref:"a",h:null},{ref:"b",h:"a"},{ref:"c",h:"b"}] yields one root
    // a with child b, b with child c.
    let rows = vec![
        row("a", None, "Root"),
        row("b", Some("a"), "Middle"),
        row("c", Some("b"), "Leaf"),
    ];
    let tree = build_hierarchy(&rows);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].reference, "a");
    assert_eq!(tree[0].children.len(), 1);
    assert_eq!(tree[0].children[0].reference, "b");
    assert_eq!(tree[0].children[0].children.len(), 1);
    assert_eq!(tree[0].children[0].children[0].reference, "c");
}

#[test]
fn test_forest_preserves_input_order() {
    let rows = vec![
        row("wales", None, "Wales"),
        row("england", None, "England"),
        row("cardiff", Some("wales"), "Cardiff"),
        row("swansea", Some("wales"), "Swansea"),
    ];
    let tree = build_hierarchy(&rows);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].reference, "wales");
    assert_eq!(tree[1].reference, "england");
    let children: Vec<&str> = tree[0].children.iter().map(|c| c.reference.as_str()).collect();
    assert_eq!(children, vec!["cardiff", "swansea"]);
}

#[test]
fn test_missing_parent_promotes_to_root() {
    let rows = vec![row("orphan", Some("nowhere"), "Orphan")];
    let tree = build_hierarchy(&rows);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].reference, "orphan");
}

#[test]
fn test_descriptions_carried() {
    let rows = vec![row("a", None, "All ages")];
    let tree = build_hierarchy(&rows);
    assert_eq!(tree[0].description, "All ages");
}

#[test]
fn test_empty_input() {
    assert!(build_hierarchy(&[]).is_empty());
}

#[test]
fn test_serializes_without_empty_children() {
    let rows = vec![row("a", None, "Root"), row("b", Some("a"), "Leaf")];
    let tree = build_hierarchy(&rows);
    let json = serde_json::to_string(&tree).unwrap();
    // Leaf nodes skip the children key entirely
    assert!(json.contains("\"reference\":\"b\""));
    assert!(!json.contains("\"children\":[]"));
}
