// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration cache behind a trait so a shared KV can replace the in-process map.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key/value cache for resolved durations and provider base routes.
///
/// Values are JSON so heterogeneous entries (base routes, predictions,
/// provider tokens) share one store, matching what a Redis deployment holds.
pub trait EtaCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>);
    fn delete(&self, key: &str);
}

/// In-process cache with per-entry TTL.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Option<Instant>, Value)>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl EtaCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        let (expires_at, value) = entries.get(key)?;
        if let Some(expires_at) = expires_at {
            if *expires_at < Instant::now() {
                entries.remove(key);
                return None;
            }
        }
        Some(value.clone())
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .insert(key.to_string(), (expires_at, value));
    }

    fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
