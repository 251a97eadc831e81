use super::run;
use serde_json::json;

#[test]
fn identity_returns_the_input() {
    let data = json!({"a": 1});
    assert_eq!(run(".", &data).unwrap(), vec![data.clone()]);
}

#[test]
fn field_paths_descend_objects() {
    let data = json!({"a": {"b": {"c": 42}}});
    assert_eq!(run(".a.b.c", &data).unwrap(), vec![json!(42)]);
    assert_eq!(run(".a.missing", &data).unwrap(), vec![json!(null)]);
}

#[test]
fn iteration_fans_out_arrays_and_object_values() {
    let data = json!({"users": [{"name": "Alice"}, {"name": "Bob"}]});
    assert_eq!(
        run(".users[].name", &data).unwrap(),
        vec![json!("Alice"), json!("Bob")]
    );
    let map = json!({"a": 1, "b": 2});
    assert_eq!(run(".[]", &map).unwrap(), vec![json!(1), json!(2)]);
}

#[test]
fn indexes_support_negative_offsets_and_out_of_bounds() {
    let data = json!([10, 20, 30]);
    assert_eq!(run(".[0]", &data).unwrap(), vec![json!(10)]);
    assert_eq!(run(".[-1]", &data).unwrap(), vec![json!(30)]);
    assert_eq!(run(".[9]", &data).unwrap(), vec![json!(null)]);
}

#[test]
fn pipes_chain_segments() {
    let data = json!({"users": [{"name": "Alice"}, {"name": "Bob"}]});
    assert_eq!(
        run(".users | .[] | .name", &data).unwrap(),
        vec![json!("Alice"), json!("Bob")]
    );
}

#[test]
fn field_on_scalar_errors_unless_optional() {
    let data = json!({"n": 5});
    assert!(run(".n.x", &data).is_err());
    assert_eq!(run(".n.x?", &data).unwrap(), Vec::<serde_json::Value>::new());
}

#[test]
fn malformed_queries_are_rejected() {
    let data = json!({});
    assert!(run("users", &data).is_err());
    assert!(run(".[1", &data).is_err());
    assert!(run(".a b", &data).is_err());
}
