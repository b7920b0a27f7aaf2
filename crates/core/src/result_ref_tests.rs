// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn merge_keeps_unrelated_keys() {
    let mut acc = ResultRef::new();
    acc.insert("geocode", json!({"success_count": 9}));

    let mut partial = ResultRef::new();
    partial.insert("matrix_artifact_path", json!("/tmp/a.json"));
    acc.merge(partial);

    assert_eq!(acc.len(), 2);
    assert_eq!(acc.get("geocode").unwrap()["success_count"], 9);
}

#[test]
fn remerging_same_keys_is_idempotent() {
    let mut acc = ResultRef::new();
    let partial: ResultRef = [("plan_id".to_string(), json!("pln-1"))].into_iter().collect();
    acc.merge(partial.clone());
    acc.merge(partial);
    assert_eq!(acc.len(), 1);
    assert_eq!(acc.get("plan_id").unwrap(), "pln-1");
}

#[test]
fn merge_overwrites_only_carried_keys() {
    let mut acc = ResultRef::new();
    acc.insert("a", json!(1));
    acc.insert("b", json!(2));

    let mut partial = ResultRef::new();
    partial.insert("b", json!(3));
    acc.merge(partial);

    assert_eq!(acc.get("a").unwrap(), 1);
    assert_eq!(acc.get("b").unwrap(), 3);
}

#[test]
fn serde_preserves_insertion_order() {
    let mut acc = ResultRef::new();
    acc.insert("z", json!(1));
    acc.insert("a", json!(2));
    let json = serde_json::to_string(&acc).unwrap();
    assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
}
