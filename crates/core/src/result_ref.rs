// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Merge-only result accumulator carried across pipeline steps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Step outputs accumulated on the job. Each step contributes its own keys;
/// merging never clobbers keys written by other steps, so a duplicate
/// completion replays the same keys instead of corrupting siblings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRef(IndexMap<String, Value>);

impl ResultRef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a partial result in, overwriting only the keys it carries.
    pub fn merge(&mut self, partial: ResultRef) {
        for (key, value) in partial.0 {
            self.0.insert(key, value);
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl FromIterator<(String, Value)> for ResultRef {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "result_ref_tests.rs"]
mod tests;
