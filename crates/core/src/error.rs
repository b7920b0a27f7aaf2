// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the pipeline, stores, and step units.
//!
//! Infeasible solves are deliberately NOT part of this taxonomy; they are a
//! first-class plan outcome, not a failure.

use serde::{Deserialize, Serialize};

/// Stable machine-readable error codes surfaced on failed jobs and steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    /// Bad request shape; fails fast, never retried.
    ValidationError,
    /// Transient provider/network failure; retried with backoff, falls back
    /// to the next estimation tier where one exists.
    RoutingError,
    NoGeocodedStops,
    MatrixArtifactMissing,
    MatrixArtifactLoadFailed,
    PlanNotReady,
    QueueEnqueueFailed,
    /// Catch-all for unclassified unit failures.
    StepExecutionFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RoutingError => "ROUTING_ERROR",
            ErrorCode::NoGeocodedStops => "NO_GEOCODED_STOPS",
            ErrorCode::MatrixArtifactMissing => "MATRIX_ARTIFACT_MISSING",
            ErrorCode::MatrixArtifactLoadFailed => "MATRIX_ARTIFACT_LOAD_FAILED",
            ErrorCode::PlanNotReady => "PLAN_NOT_READY",
            ErrorCode::QueueEnqueueFailed => "QUEUE_ENQUEUE_FAILED",
            ErrorCode::StepExecutionFailed => "STEP_EXECUTION_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human/structured failure detail stored alongside an [`ErrorCode`].
///
/// Structured payloads are flattened to a JSON string so the job row stays a
/// flat record; consumers that need structure re-parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDetail(pub String);

impl ErrorDetail {
    pub const MAX_LEN: usize = 2000;

    pub fn text(detail: impl Into<String>) -> Self {
        let mut s: String = detail.into();
        s.truncate(Self::MAX_LEN);
        Self(s)
    }

    pub fn structured(value: &serde_json::Value) -> Self {
        Self::text(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
