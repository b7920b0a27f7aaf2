// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and per-step state machine.

use crate::clock::Clock;
use crate::error::{ErrorCode, ErrorDetail};
use crate::payload::JobPayload;
use crate::result_ref::ResultRef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a job instance.
    ///
    /// Each submission gets a unique ID used to track its status, address
    /// queue messages, and reference it in logs.
    pub struct JobId("job-");
}

/// What a job does. Optimize runs the step pipeline; the other kinds are
/// single-shot units dispatched outside the step machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Optimize,
    ExportPdf,
}

crate::simple_display! {
    JobKind {
        Optimize => "OPTIMIZE",
        ExportPdf => "EXPORT_PDF",
    }
}

/// Overall job status. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

crate::simple_display! {
    JobStatus {
        Queued => "QUEUED",
        Running => "RUNNING",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
    }
}

/// The fixed, ordered pipeline steps.
pub const PIPELINE_STEPS: [StepName; 4] = [
    StepName::Geocode,
    StepName::BuildMatrix,
    StepName::Optimize,
    StepName::GenerateExports,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepName {
    Geocode,
    BuildMatrix,
    Optimize,
    GenerateExports,
}

crate::simple_display! {
    StepName {
        Geocode => "GEOCODE",
        BuildMatrix => "BUILD_MATRIX",
        Optimize => "OPTIMIZE",
        GenerateExports => "GENERATE_EXPORTS",
    }
}

impl StepName {
    /// The step enqueued after this one completes, if any.
    pub fn next(&self) -> Option<StepName> {
        match self {
            StepName::Geocode => Some(StepName::BuildMatrix),
            StepName::BuildMatrix => Some(StepName::Optimize),
            StepName::Optimize => Some(StepName::GenerateExports),
            StepName::GenerateExports => None,
        }
    }

    /// Job-level progress when this step starts.
    pub fn progress_floor(&self) -> u8 {
        match self {
            StepName::Geocode => 1,
            StepName::BuildMatrix => 26,
            StepName::Optimize => 66,
            StepName::GenerateExports => 91,
        }
    }

    /// Job-level progress when this step completes.
    pub fn progress_ceiling(&self) -> u8 {
        match self {
            StepName::Geocode => 25,
            StepName::BuildMatrix => 65,
            StepName::Optimize => 90,
            StepName::GenerateExports => 100,
        }
    }

    /// Map a unit-local 0..=100 progress value into this step's band.
    pub fn map_progress(&self, inner: u8) -> u8 {
        let inner = inner.min(100) as u32;
        let floor = self.progress_floor() as u32;
        let ceiling = self.progress_ceiling() as u32;
        (floor + inner * (ceiling - floor) / 100) as u8
    }
}

/// Status of one pipeline step. Succeeded is terminal and never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

crate::simple_display! {
    StepStatus {
        Pending => "PENDING",
        Running => "RUNNING",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
    }
}

/// Durable per-step record. At most one live lock token per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepState {
    pub status: StepStatus,
    /// Opaque worker ownership token, set only while Running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_token: Option<String>,
    /// Lease expiry in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_expires_at_ms: Option<u64>,
    pub updated_at_ms: u64,
    /// Times an expired lease was forcibly taken over by a new worker.
    #[serde(default)]
    pub stale_reclaimed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    /// Set once the injected retry drill has fired for this step.
    #[serde(default)]
    pub retry_drill_injected: bool,
}

impl StepState {
    pub fn pending(now_ms: u64) -> Self {
        Self {
            status: StepStatus::Pending,
            lock_token: None,
            lease_expires_at_ms: None,
            updated_at_ms: now_ms,
            stale_reclaimed: 0,
            error_code: None,
            error_detail: None,
            retry_drill_injected: false,
        }
    }

    /// Whether a Running lease may be reclaimed at `now_ms`.
    ///
    /// Uses the stored expiry when present; records written before leases
    /// carried an explicit expiry fall back to `updated_at + default lease`.
    pub fn lease_expired(&self, now_ms: u64, default_lease_ms: u64) -> bool {
        match self.lease_expires_at_ms {
            Some(expires) => expires <= now_ms,
            None => self.updated_at_ms.saturating_add(default_lease_ms) <= now_ms,
        }
    }

    pub fn holds_token(&self, token: &str) -> bool {
        self.status == StepStatus::Running && self.lock_token.as_deref() == Some(token)
    }
}

/// A job instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// 0–100; non-decreasing while the job is Running.
    pub progress_pct: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepName>,
    pub message: String,
    /// Immutable request parameters.
    pub payload: JobPayload,
    /// Per-step durable state, in pipeline order.
    pub steps: IndexMap<StepName, StepState>,
    /// Merge-only output accumulated across steps.
    #[serde(default)]
    pub result_ref: ResultRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Job {
    pub const MESSAGE_MAX_LEN: usize = 512;

    /// Create a new job. Pipeline kinds start with every step Pending.
    pub fn new(kind: JobKind, payload: JobPayload, clock: &impl Clock) -> Self {
        let now = clock.epoch_ms();
        let steps = if kind == JobKind::Optimize {
            PIPELINE_STEPS
                .iter()
                .map(|step| (*step, StepState::pending(now)))
                .collect()
        } else {
            IndexMap::new()
        };
        Self {
            id: JobId::new(),
            kind,
            status: JobStatus::Queued,
            progress_pct: 0,
            current_step: None,
            message: "Queued".to_string(),
            payload,
            steps,
            result_ref: ResultRef::new(),
            error_code: None,
            error_detail: None,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn step(&self, step: StepName) -> Option<&StepState> {
        self.steps.get(&step)
    }

    /// Progress is clamped and monotonic while the job is running.
    pub fn raise_progress(&mut self, pct: u8) {
        self.progress_pct = self.progress_pct.max(pct.min(100));
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        let mut message: String = message.into();
        message.truncate(Self::MESSAGE_MAX_LEN);
        self.message = message;
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            message: String = "Queued",
        }
        set {
            kind: JobKind = JobKind::Optimize,
            status: JobStatus = JobStatus::Queued,
            progress_pct: u8 = 0,
            payload: JobPayload = JobPayload::Optimize(crate::payload::OptimizePayload::builder().build()),
            steps: IndexMap<StepName, StepState> = PIPELINE_STEPS
                .iter()
                .map(|step| (*step, StepState::pending(0)))
                .collect(),
            result_ref: ResultRef = ResultRef::new(),
        }
        option {
            current_step: StepName = None,
            error_code: ErrorCode = None,
            error_detail: ErrorDetail = None,
        }
        computed {
            id: JobId = JobId::new(),
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
