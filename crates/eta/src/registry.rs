// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Model artifact registry and canary rollout policy.
//!
//! Artifacts are JSON files named `model_<version>.json` in one directory.
//! The rollout record decides which version serves a given prediction:
//! a weighted random draw sends `canary_percent` of traffic to the canary.

use crate::model::{LinearModel, ModelError};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Active/canary version split. Stored by ML ops tooling; read-only here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollout {
    pub active_version: Option<String>,
    pub canary_version: Option<String>,
    #[serde(default)]
    pub canary_percent: u8,
    #[serde(default)]
    pub enabled: bool,
}

impl Rollout {
    /// Pick the version serving this prediction, if any is resolvable.
    pub fn resolve_version(&self, rng: &mut impl Rng) -> Option<String> {
        let active = self.active_version.as_deref()?;
        if self.enabled {
            if let Some(canary) = self.canary_version.as_deref() {
                let percent = self.canary_percent.min(100);
                if percent > 0 && rng.gen_range(0..100) < percent {
                    return Some(canary.to_string());
                }
            }
        }
        Some(active.to_string())
    }
}

/// Loads and caches model artifacts from a directory.
pub struct ModelRegistry {
    artifact_dir: Option<PathBuf>,
    rollout: Mutex<Rollout>,
    loaded: Mutex<HashMap<String, LinearModel>>,
}

impl ModelRegistry {
    pub fn new(artifact_dir: Option<PathBuf>) -> Self {
        let rollout = artifact_dir
            .as_deref()
            .map(Self::read_rollout)
            .unwrap_or_default();
        Self {
            artifact_dir,
            rollout: Mutex::new(rollout),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    fn read_rollout(dir: &Path) -> Rollout {
        let path = dir.join("rollout.json");
        match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            Err(_) => Rollout::default(),
        }
    }

    pub fn rollout(&self) -> Rollout {
        self.rollout.lock().clone()
    }

    pub fn set_rollout(&self, rollout: Rollout) {
        *self.rollout.lock() = rollout;
    }

    /// Versions present on disk, sorted ascending.
    pub fn list_versions(&self) -> Vec<String> {
        let Some(dir) = self.artifact_dir.as_deref() else {
            return Vec::new();
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut versions: Vec<String> = entries
            .filter_map(|entry| {
                let name = entry.ok()?.file_name().into_string().ok()?;
                let version = name.strip_prefix("model_")?.strip_suffix(".json")?;
                Some(version.to_string())
            })
            .collect();
        versions.sort();
        versions
    }

    /// Load a version's artifact, caching the parsed model.
    pub fn load(&self, version: &str) -> Result<LinearModel, ModelError> {
        if let Some(model) = self.loaded.lock().get(version) {
            return Ok(model.clone());
        }
        let dir = self
            .artifact_dir
            .as_deref()
            .ok_or_else(|| ModelError::NoArtifactDir)?;
        let path = dir.join(format!("model_{version}.json"));
        let raw = std::fs::read(&path).map_err(|e| ModelError::ArtifactUnavailable {
            version: version.to_string(),
            detail: e.to_string(),
        })?;
        let model: LinearModel =
            serde_json::from_slice(&raw).map_err(|e| ModelError::ArtifactUnavailable {
                version: version.to_string(),
                detail: e.to_string(),
            })?;
        model.validate()?;
        self.loaded
            .lock()
            .insert(version.to_string(), model.clone());
        Ok(model)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
