// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable matrix artifact handed from BUILD_MATRIX to OPTIMIZE.
//!
//! The artifact is serialized as JSON and persisted so the solve can run on a
//! different worker, possibly after redelivery, without recomputation.

use crate::geo::TimeWindow;
use crate::stop::StopId;
use serde::{Deserialize, Serialize};

/// Bumped whenever the serialized layout changes; loads reject mismatches
/// instead of guessing.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// Which estimation tier produced the duration matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatrixStrategy {
    /// Provider base durations only; no model version resolved.
    Onemap,
    /// ML model predictions over provider base durations.
    MlBaseline,
    /// ML baseline with the multiplicative uplift correction applied.
    MlUplift,
}

crate::simple_display! {
    MatrixStrategy {
        Onemap => "ONEMAP",
        MlBaseline => "ML_BASELINE",
        MlUplift => "ML_UPLIFT",
    }
}

/// Duration source reported for a full optimize attempt. Extends
/// [`MatrixStrategy`] with the post-solve live traffic override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtaSource {
    Onemap,
    MlBaseline,
    MlUplift,
    GoogleTraffic,
}

crate::simple_display! {
    EtaSource {
        Onemap => "onemap",
        MlBaseline => "ml_baseline",
        MlUplift => "ml_uplift",
        GoogleTraffic => "google_traffic",
    }
}

impl From<MatrixStrategy> for EtaSource {
    fn from(strategy: MatrixStrategy) -> Self {
        match strategy {
            MatrixStrategy::Onemap => EtaSource::Onemap,
            MatrixStrategy::MlBaseline => EtaSource::MlBaseline,
            MatrixStrategy::MlUplift => EtaSource::MlUplift,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Depot,
    Stop,
}

/// One routable node. Index 0 is always the depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub kind: NodeKind,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<StopId>,
}

/// Snapshot of everything the solver needs for one optimize attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizationArtifact {
    pub schema_version: u32,
    pub dataset_id: u64,
    /// Ordered nodes; index 0 = depot.
    pub nodes: Vec<ArtifactNode>,
    pub time_windows: Vec<TimeWindow>,
    pub service_times_s: Vec<u32>,
    pub demands: Vec<u32>,
    pub duration_matrix_s: Vec<Vec<u32>>,
    pub distance_matrix_m: Vec<Vec<f64>>,
    pub matrix_strategy: MatrixStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Departure bucket, wall-clock `HH:MM`.
    pub depart_bucket: String,
    /// Monday = 0.
    pub day_of_week: u8,
}

impl OptimizationArtifact {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Structural sanity check applied after deserialization; a persisted
    /// artifact that fails this is unreadable, not merely stale.
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(format!(
                "unsupported artifact schema version {}",
                self.schema_version
            ));
        }
        let n = self.nodes.len();
        if n == 0 || self.nodes[0].kind != NodeKind::Depot {
            return Err("artifact must start with a depot node".to_string());
        }
        if self.time_windows.len() != n
            || self.service_times_s.len() != n
            || self.demands.len() != n
        {
            return Err("node attribute lengths disagree".to_string());
        }
        if self.duration_matrix_s.len() != n
            || self.duration_matrix_s.iter().any(|row| row.len() != n)
        {
            return Err("duration matrix is not square over nodes".to_string());
        }
        if self.distance_matrix_m.len() != n
            || self.distance_matrix_m.iter().any(|row| row.len() != n)
        {
            return Err("distance matrix is not square over nodes".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
