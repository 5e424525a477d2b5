use trellis_engine::{Scope, Value};

fn user(name: &str) -> Value {
    Value::object([("name", Value::from(name))])
}

#[test]
fn resolves_keys_and_dotted_paths() {
    let scope = Scope::root(Value::object([("user", user("ada"))]));
    assert_eq!(scope.resolve("user.name"), Value::from("ada"));
    assert_eq!(scope.resolve("user"), user("ada"));
    assert_eq!(scope.resolve("missing"), Value::Null);
    assert_eq!(scope.resolve("user.age"), Value::Null);
}

#[test]
fn dot_yields_the_innermost_frame() {
    let root = Scope::root(Value::from("outer"));
    assert_eq!(root.resolve("."), Value::from("outer"));
    let child = root.child(Value::from("inner"));
    assert_eq!(child.resolve("."), Value::from("inner"));
}

#[test]
fn child_frames_shadow_by_first_segment() {
    let root = Scope::root(Value::object([("user", user("outer"))]));
    let child = root.child(Value::object([(
        "user",
        Value::object([("id", Value::from(7))]),
    )]));
    // The inner frame owns `user`, so a miss on the rest of the path
    // must not fall back to the outer `user`.
    assert_eq!(child.resolve("user.name"), Value::Null);
    assert_eq!(child.resolve("user.id"), Value::from(7));
}

#[test]
fn unshadowed_names_stay_visible_through_the_chain() {
    let root = Scope::root(Value::object([("title", Value::from("T"))]));
    let child = root.child(Value::object([("item", Value::from(1))]));
    let grandchild = child.child(Value::object([("inner", Value::from(2))]));
    assert_eq!(grandchild.resolve("title"), Value::from("T"));
    assert_eq!(grandchild.resolve("item"), Value::from(1));
    assert_eq!(grandchild.resolve("inner"), Value::from(2));
}

#[test]
fn numeric_segments_index_lists() {
    let scope = Scope::root(Value::object([(
        "items",
        Value::list([Value::from("a"), Value::from("b")]),
    )]));
    assert_eq!(scope.resolve("items.1"), Value::from("b"));
    assert_eq!(scope.resolve("items.2"), Value::Null);
}

#[test]
fn blank_paths_resolve_to_null() {
    let scope = Scope::root(user("ada"));
    assert_eq!(scope.resolve(""), Value::Null);
    assert_eq!(scope.resolve("   "), Value::Null);
    assert_eq!(scope.resolve(" name "), Value::from("ada"));
}

#[test]
fn scalars_have_no_members() {
    let scope = Scope::root(Value::object([("n", Value::from(3))]));
    assert_eq!(scope.resolve("n.anything"), Value::Null);
}
