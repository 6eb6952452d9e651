//! Reconstruction properties over multi-level flattened trees.

use magpie::worker::protocol::FlatObject;
use magpie::{rebuild, Category, CollectionError, DocNode};

/// A package with one class (two methods, one attribute) and one function.
const PACKAGE: &str = r#"{
    "path": "pkg",
    "category": "module",
    "name": "pkg",
    "children": {
        "pkg.Foo": {
            "path": "pkg.Foo",
            "category": "class",
            "children": {
                "pkg.Foo.first": {
                    "path": "pkg.Foo.first",
                    "category": "method",
                    "children": {},
                    "attributes": [], "classes": [], "functions": [],
                    "methods": [], "modules": []
                },
                "pkg.Foo.second": {
                    "path": "pkg.Foo.second",
                    "category": "method",
                    "children": {},
                    "attributes": [], "classes": [], "functions": [],
                    "methods": [], "modules": []
                },
                "pkg.Foo.value": {
                    "path": "pkg.Foo.value",
                    "category": "attribute",
                    "children": {},
                    "attributes": [], "classes": [], "functions": [],
                    "methods": [], "modules": []
                }
            },
            "attributes": ["pkg.Foo.value"],
            "classes": [],
            "functions": [],
            "methods": ["pkg.Foo.first", "pkg.Foo.second"],
            "modules": []
        },
        "pkg.util": {
            "path": "pkg.util",
            "category": "function",
            "children": {},
            "attributes": [], "classes": [], "functions": [],
            "methods": [], "modules": []
        }
    },
    "attributes": [],
    "classes": ["pkg.Foo"],
    "functions": ["pkg.util"],
    "methods": [],
    "modules": []
}"#;

fn package() -> FlatObject {
    serde_json::from_str(PACKAGE).expect("fixture must parse")
}

#[test]
fn every_flattened_entry_becomes_exactly_one_node() {
    // 5 children entries across the whole tree, plus the root.
    let node = rebuild(package()).unwrap();
    assert_eq!(node.count(), 6);
}

#[test]
fn category_views_share_identity_with_children() {
    let node = rebuild(package()).unwrap();

    let classes: Vec<&DocNode> = node.classes().collect();
    assert_eq!(classes.len(), 1);
    assert!(std::ptr::eq(classes[0], &node.children[0]));

    let functions: Vec<&DocNode> = node.functions().collect();
    assert!(std::ptr::eq(functions[0], &node.children[1]));

    // The same holds one level down.
    let foo = classes[0];
    let methods: Vec<&DocNode> = foo.methods().collect();
    assert!(std::ptr::eq(methods[0], &foo.children[0]));
    assert!(std::ptr::eq(methods[1], &foo.children[1]));
}

#[test]
fn children_keep_wire_emission_order() {
    let node = rebuild(package()).unwrap();
    let paths: Vec<&str> = node.children.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, ["pkg.Foo", "pkg.util"]);

    let foo = &node.children[0];
    let paths: Vec<&str> = foo.children.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, ["pkg.Foo.first", "pkg.Foo.second", "pkg.Foo.value"]);
}

#[test]
fn category_lists_keep_their_own_order() {
    let node = rebuild(package()).unwrap();
    let foo = &node.children[0];

    let methods: Vec<&str> = foo.methods().map(|m| m.path.as_str()).collect();
    assert_eq!(methods, ["pkg.Foo.first", "pkg.Foo.second"]);

    let attributes: Vec<&str> = foo.attributes().map(|a| a.path.as_str()).collect();
    assert_eq!(attributes, ["pkg.Foo.value"]);

    assert_eq!(foo.indices(Category::Method), &[0, 1]);
    assert_eq!(foo.indices(Category::Attribute), &[2]);
}

#[test]
fn categories_recurse_to_every_descendant() {
    let node = rebuild(package()).unwrap();
    for child in &node.children {
        // Leaves were rebuilt too: their category views resolve (emptily).
        for category in [
            Category::Attribute,
            Category::Class,
            Category::Function,
            Category::Method,
            Category::Module,
        ] {
            let _ = child.members(category).count();
        }
    }
    assert_eq!(node.children[1].count(), 1);
}

#[test]
fn missing_reference_in_a_nested_node_is_fatal() {
    let broken = PACKAGE.replace(r#""methods": ["pkg.Foo.first", "pkg.Foo.second"]"#,
        r#""methods": ["pkg.Foo.first", "pkg.Foo.gone"]"#);
    let err = rebuild(serde_json::from_str(&broken).unwrap()).unwrap_err();
    match err {
        CollectionError::MissingChild { parent, path } => {
            assert_eq!(parent, "pkg.Foo");
            assert_eq!(path, "pkg.Foo.gone");
        }
        other => panic!("expected MissingChild, got {other:?}"),
    }
}

#[test]
fn extra_fields_ride_along_at_every_level() {
    let node = rebuild(package()).unwrap();
    assert_eq!(node.extra["name"], "pkg");
}
