//! Tests for Key
//!
//! These tests verify:
//! - Normalization and its idempotence
//! - Namespace navigation (parent, child, ancestors)
//! - The `Type:value` namespace convention
//! - Ordering and conversions

use std::collections::HashSet;

use atlasds::key::{clean, Key};

// =============================================================================
// Normalization Tests
// =============================================================================

#[test]
fn test_normalize_basics() {
    assert_eq!(Key::new("").as_str(), "/");
    assert_eq!(Key::new("a/b").as_str(), "/a/b");
    assert_eq!(Key::new("/a/b/").as_str(), "/a/b");
    assert_eq!(Key::new("//a///b").as_str(), "/a/b");
    assert_eq!(Key::new("/a/./b/../c").as_str(), "/a/c");
    assert_eq!(Key::new("/..").as_str(), "/");
}

#[test]
fn test_normalize_is_idempotent() {
    let inputs = [
        "",
        "/",
        "a",
        "a/b/c",
        "/a/../../b",
        "./x/./y/",
        "//deep//path//",
        "/Comedy/MontyPython/Actor:JohnCleese",
        "/héllo/wörld",
        "...",
        "/a/.../b",
    ];
    for s in inputs {
        let once = clean(s);
        assert_eq!(clean(&once), once, "clean not idempotent for {:?}", s);
    }
}

#[test]
fn test_equality_uses_normal_form() {
    assert_eq!(Key::new("a/b"), Key::new("/a/b/"));
    assert_ne!(Key::new("/a/b"), Key::new("/a/c"));

    let set: HashSet<Key> = ["/x", "x", "/x/"].iter().map(|s| Key::new(s)).collect();
    assert_eq!(set.len(), 1);
}

// =============================================================================
// Namespace Tests
// =============================================================================

#[test]
fn test_list_and_parent() {
    let key = Key::new("/a/b/c");

    assert_eq!(key.list(), vec!["a", "b", "c"]);
    assert_eq!(key.namespaces(), key.list());
    assert_eq!(key.parent(), Key::new("/a/b"));
    assert_eq!(Key::new("/a").parent(), Key::root());
    assert_eq!(Key::root().parent(), Key::root());
    assert!(Key::root().list().is_empty());
}

#[test]
fn test_ancestors() {
    assert_eq!(
        Key::new("/a/b/c").ancestors(),
        vec![Key::new("/a"), Key::new("/a/b")]
    );
    assert!(Key::new("/a").ancestors().is_empty());
}

#[test]
fn test_child() {
    assert_eq!(Key::new("/a").child(&Key::new("/b/c")), Key::new("/a/b/c"));
    assert_eq!(Key::root().child(&Key::new("/b")), Key::new("/b"));
    assert_eq!(Key::new("/a").child(&Key::root()), Key::new("/a"));
}

#[test]
fn test_ancestry_is_segment_aware() {
    let a = Key::new("/a");

    assert!(a.is_ancestor_of(&Key::new("/a/b")));
    assert!(!a.is_ancestor_of(&Key::new("/ab")));
    assert!(!a.is_ancestor_of(&a));
    assert!(Key::new("/a/b/c").is_descendant_of(&a));
    assert!(Key::root().is_ancestor_of(&a));
}

#[test]
fn test_top_level_and_root() {
    assert!(Key::new("/a").is_top_level());
    assert!(!Key::new("/a/b").is_top_level());
    assert!(Key::root().is_root());
    assert!(!Key::new("/a").is_root());
}

#[test]
fn test_reverse_and_flattened() {
    let key = Key::new("/a/bc/d");

    assert_eq!(key.reverse(), Key::new("/d/bc/a"));
    assert_eq!(key.flattened(), "abcd");
    assert_eq!(key.base_namespace(), "d");
}

// =============================================================================
// Typed Namespace Tests
// =============================================================================

#[test]
fn test_type_and_name() {
    let key = Key::new("/Comedy/MontyPython/Actor:JohnCleese");

    assert_eq!(key.type_(), "Actor");
    assert_eq!(key.name(), "JohnCleese");
    assert_eq!(key.path(), Key::new("/Comedy/MontyPython/Actor"));
}

#[test]
fn test_untyped_namespace() {
    let key = Key::new("/a/plain");

    assert_eq!(key.type_(), "");
    assert_eq!(key.name(), "plain");
}

#[test]
fn test_instance() {
    let actor = Key::new("/Comedy/MontyPython/Actor");

    assert_eq!(
        actor.instance("JohnCleese"),
        Key::new("/Comedy/MontyPython/Actor:JohnCleese")
    );
}

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_display_from_str() {
    let key: Key = "a/b".parse().unwrap();

    assert_eq!(key.to_string(), "/a/b");
    assert_eq!(format!("{:?}", key), "Key(/a/b)");
    assert_eq!(Key::from(String::from("x")), Key::from("/x"));
    assert_eq!(Key::default(), Key::root());
}

#[test]
fn test_ordering_is_string_order() {
    let mut keys = vec![Key::new("/b"), Key::new("/a/z"), Key::new("/a")];
    keys.sort();

    assert_eq!(keys, vec![Key::new("/a"), Key::new("/a/z"), Key::new("/b")]);
}

#[test]
fn test_random_keys() {
    let a = Key::random();
    let b = Key::random();

    assert_ne!(a, b);
    assert!(a.is_top_level());
    assert_eq!(a.base_namespace().len(), 32);
}

#[test]
fn test_with_namespaces() {
    assert_eq!(Key::with_namespaces(&["a", "b"]), Key::new("/a/b"));
    let empty: [&str; 0] = [];
    assert_eq!(Key::with_namespaces(&empty), Key::root());
}
