// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Matrix artifact persistence.
//!
//! Each optimize attempt writes one JSON blob keyed by (dataset, job). The
//! OPTIMIZE step may run on a different worker, so the blob is reachable two
//! ways: a local file path and an object-store reference. "The artifact was
//! never written" and "the artifact is there but corrupt" are distinct
//! failures with distinct codes, because only the former is fixed by
//! re-running BUILD_MATRIX on the same worker.

use parking_lot::Mutex;
use rp_core::{ErrorCode, JobId, OptimizationArtifact};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("matrix artifact missing: {0}")]
    Missing(String),
    #[error("matrix artifact unreadable: {0}")]
    Unreadable(String),
}

impl ArtifactError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ArtifactError::Missing(_) => ErrorCode::MatrixArtifactMissing,
            ArtifactError::Unreadable(_) => ErrorCode::MatrixArtifactLoadFailed,
        }
    }
}

/// Reference to an uploaded object, merged into the job's result_ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_path: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Object upload seam. The production implementation lives outside the core;
/// tests and the CLI use [`MemoryObjectStore`].
pub trait ObjectStore: Send + Sync {
    fn put(&self, object_path: &str, payload: Vec<u8>, content_type: &str) -> ObjectRef;
    fn get(&self, object_path: &str) -> Option<Vec<u8>>;
}

/// In-memory object store.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, object_path: &str, payload: Vec<u8>, content_type: &str) -> ObjectRef {
        let reference = ObjectRef {
            object_path: object_path.to_string(),
            content_type: content_type.to_string(),
            size_bytes: payload.len() as u64,
        };
        self.objects
            .lock()
            .insert(object_path.to_string(), (content_type.to_string(), payload));
        reference
    }

    fn get(&self, object_path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .get(object_path)
            .map(|(_, payload)| payload.clone())
    }
}

/// File-backed artifact store rooted at a directory.
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn artifact_path(&self, dataset_id: u64, job_id: &JobId) -> PathBuf {
        self.root
            .join("matrix")
            .join(format!("{dataset_id}_{job_id}.json"))
    }

    /// Serialize and write the artifact; returns the file path for result_ref.
    pub fn save(
        &self,
        dataset_id: u64,
        job_id: &JobId,
        artifact: &OptimizationArtifact,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.artifact_path(dataset_id, job_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArtifactError::Unreadable(format!("mkdir {parent:?}: {e}")))?;
        }
        let payload = serde_json::to_vec(artifact)
            .map_err(|e| ArtifactError::Unreadable(format!("serialize: {e}")))?;
        std::fs::write(&path, payload)
            .map_err(|e| ArtifactError::Unreadable(format!("write {path:?}: {e}")))?;
        Ok(path)
    }

    /// Load and validate an artifact from an explicit path.
    pub fn load(path: &Path) -> Result<OptimizationArtifact, ArtifactError> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing(format!("{}", path.display())));
            }
            Err(e) => {
                return Err(ArtifactError::Unreadable(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };
        parse_artifact(&raw).map_err(|detail| {
            ArtifactError::Unreadable(format!("{}: {detail}", path.display()))
        })
    }
}

fn parse_artifact(raw: &[u8]) -> Result<OptimizationArtifact, String> {
    let artifact: OptimizationArtifact =
        serde_json::from_slice(raw).map_err(|e| format!("parse: {e}"))?;
    artifact.validate()?;
    Ok(artifact)
}

/// Where a previously-built artifact may be found, in resolution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactLocator {
    pub object_path: Option<String>,
    pub file_path: Option<String>,
}

impl ArtifactLocator {
    pub fn is_empty(&self) -> bool {
        self.object_path.is_none() && self.file_path.is_none()
    }
}

/// Resolves an artifact through object storage first, then the file path.
///
/// Every failed attempt is recorded so the job's error detail can show the
/// full trail rather than just the last failure.
pub struct ArtifactResolver {
    objects: Arc<dyn ObjectStore>,
}

impl ArtifactResolver {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    pub fn resolve(&self, locator: &ArtifactLocator) -> Result<OptimizationArtifact, ArtifactError> {
        if locator.is_empty() {
            return Err(ArtifactError::Missing(
                "no artifact reference recorded".to_string(),
            ));
        }

        let mut attempts: Vec<String> = Vec::new();

        if let Some(object_path) = locator.object_path.as_deref() {
            match self.objects.get(object_path) {
                Some(raw) => match parse_artifact(&raw) {
                    Ok(artifact) => return Ok(artifact),
                    Err(detail) => {
                        attempts.push(format!("object_path_read_failed:{object_path}:{detail}"))
                    }
                },
                None => attempts.push(format!("object_path_not_found:{object_path}")),
            }
        }

        if let Some(file_path) = locator.file_path.as_deref() {
            match FileArtifactStore::load(Path::new(file_path)) {
                Ok(artifact) => return Ok(artifact),
                Err(ArtifactError::Missing(detail)) => {
                    attempts.push(format!("file_path_not_found:{detail}"))
                }
                Err(ArtifactError::Unreadable(detail)) => {
                    attempts.push(format!("file_path_read_failed:{detail}"))
                }
            }
        }

        // Every recorded reference pointed at nothing: the artifact is gone,
        // not corrupt.
        if attempts.iter().all(|a| a.contains("not_found")) {
            return Err(ArtifactError::Missing(attempts.join("; ")));
        }
        Err(ArtifactError::Unreadable(attempts.join("; ")))
    }
}

#[cfg(test)]
#[path = "artifact_store_tests.rs"]
mod tests;
