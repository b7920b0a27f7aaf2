// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable request payloads captured at job submission.

use crate::error::ErrorCode;
use crate::geo::{hhmm_to_seconds, LatLon, TimeWindow};
use crate::plan::PlanId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of one optimization request. Stored verbatim on the job and
/// never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizePayload {
    pub dataset_id: u64,
    pub depot_lat: f64,
    pub depot_lon: f64,
    pub num_vehicles: u32,
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Workday start, wall-clock `HH:MM`.
    pub workday_start: String,
    /// Workday end, wall-clock `HH:MM`.
    pub workday_end: String,
    #[serde(default = "default_solver_time_limit_s")]
    pub solver_time_limit_s: u32,
    #[serde(default = "default_allow_drop_visits")]
    pub allow_drop_visits: bool,
    #[serde(default)]
    pub use_live_traffic: bool,
}

fn default_solver_time_limit_s() -> u32 {
    20
}

fn default_allow_drop_visits() -> bool {
    true
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("num_vehicles must be > 0")]
    NoVehicles,
    #[error("capacity must be > 0 when provided")]
    ZeroCapacity,
    #[error("invalid workday window: {0}")]
    BadWorkday(String),
}

impl PayloadError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::ValidationError
    }
}

impl OptimizePayload {
    pub fn depot(&self) -> LatLon {
        LatLon::new(self.depot_lat, self.depot_lon)
    }

    /// Workday window in seconds since midnight.
    pub fn workday_window(&self) -> Result<TimeWindow, PayloadError> {
        let start = hhmm_to_seconds(&self.workday_start)
            .map_err(|e| PayloadError::BadWorkday(e.to_string()))?;
        let end = hhmm_to_seconds(&self.workday_end)
            .map_err(|e| PayloadError::BadWorkday(e.to_string()))?;
        if end <= start {
            return Err(PayloadError::BadWorkday(format!(
                "{} >= {}",
                self.workday_start, self.workday_end
            )));
        }
        Ok(TimeWindow::new(start, end))
    }

    /// Reject malformed requests before any step is enqueued.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.num_vehicles == 0 {
            return Err(PayloadError::NoVehicles);
        }
        if self.capacity == Some(0) {
            return Err(PayloadError::ZeroCapacity);
        }
        self.workday_window().map(|_| ())
    }
}

crate::builder! {
    pub struct OptimizePayloadBuilder => OptimizePayload {
        into {
            workday_start: String = "08:00",
            workday_end: String = "18:00",
        }
        set {
            dataset_id: u64 = 1,
            depot_lat: f64 = 1.3521,
            depot_lon: f64 = 103.8198,
            num_vehicles: u32 = 2,
            capacity: Option<u32> = None,
            solver_time_limit_s: u32 = 2,
            allow_drop_visits: bool = true,
            use_live_traffic: bool = false,
        }
    }
}

/// Typed payload per job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    Optimize(OptimizePayload),
    /// Single-shot export regeneration for an existing plan.
    ExportPdf { plan_id: PlanId },
}

impl JobPayload {
    pub fn as_optimize(&self) -> Option<&OptimizePayload> {
        match self {
            JobPayload::Optimize(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
