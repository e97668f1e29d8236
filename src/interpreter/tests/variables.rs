//! Variable resolution, the reserved axis aliases, and lookup failures.

use std::collections::HashMap;

use maplit::hashmap;
use serde_json::json;

use super::{calc, var, Harness};
use crate::error::ErrorKind;
use crate::interpreter::{Context, Variable};
use crate::robot::Axis;

#[test]
fn test_resolve_all_is_last_declaration_wins() {
    let declared = vec![
        Variable::new("a", "1"),
        Variable::new("b", "2"),
        Variable::new("a", "3"),
    ];

    let table = Context::resolve_all(&declared);
    let values: HashMap<String, String> = table
        .iter()
        .map(|(name, v)| (name.clone(), v.raw_value().to_string()))
        .collect();

    assert_eq!(
        values,
        hashmap! {
            "a".to_string() => "3".to_string(),
            "b".to_string() => "2".to_string(),
        }
    );
}

#[test]
fn test_axis_aliases_track_the_robot() {
    let h = Harness::new();
    let (_, ctx) = h.run(json!([]));

    assert_eq!(ctx.int_value("X").unwrap(), 0);
    h.robot.move_axis(Axis::X, 7).unwrap();
    assert_eq!(ctx.int_value("X").unwrap(), 7);
    h.robot.move_axis(Axis::Z, -4).unwrap();
    assert_eq!(ctx.int_value("Z").unwrap(), -4);
}

#[test]
fn test_axis_alias_cannot_be_assigned() {
    let h = Harness::new();
    // A calc block targeting the reserved X alias.
    let doc = json!([calc("block-calc-1", "{", ("X", 0), ("a", 1), ("b", 2))]);

    let err = h.run_err(doc);
    assert_eq!(err.block_id.as_deref(), Some("block-calc-1"));
    assert!(matches!(err.kind, ErrorKind::Internal { .. }));
}

#[test]
fn test_undeclared_name_fails_lookup() {
    let h = Harness::new();
    let (_, ctx) = h.run(json!([]));

    let err = ctx.int_value("nope").unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::UndefinedVariable { ref name } if name == "nope"
    ));
}

#[test]
fn test_child_declaration_is_shadowed_by_parent() {
    let h = Harness::new();
    // Child blocks register their variables first; the parent's later
    // declaration of the same name wins in the flattened table.
    let doc = json!([
        {"id": "b1", "type": "block-controll", "text": "repeat n times",
         "variables": [var("n", 2)],
         "children": [
            {"id": "block-print-2", "type": "block-debug", "text": "print",
             "variables": [var("n", 99)]}
         ]}
    ]);

    let (result, ctx) = h.run(doc);
    result.unwrap();
    assert_eq!(ctx.int_value("n").unwrap(), 2);
}
