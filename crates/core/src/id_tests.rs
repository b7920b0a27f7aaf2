// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::JobId;

#[test]
fn short_truncates() {
    assert_eq!(short("abcdef", 3), "abc");
    assert_eq!(short("ab", 3), "ab");
}

#[test]
fn generated_ids_carry_prefix_and_are_unique() {
    let a = JobId::new();
    let b = JobId::new();
    assert!(a.as_str().starts_with("job-"));
    assert_ne!(a, b);
}

#[test]
fn id_suffix_strips_prefix() {
    let id = JobId::from_string("job-abc123");
    assert_eq!(id.suffix(), "abc123");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn id_serde_is_transparent() {
    let id = JobId::from_string("job-xyz");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"job-xyz\"");
    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}
