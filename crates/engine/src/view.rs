// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status read model.
//!
//! Snapshot of everything a caller polls for; the long-poll/SSE transport
//! lives in the API layer outside this system.

use rp_core::{ErrorCode, ErrorDetail, Job, JobId, JobStatus, ResultRef, StepName, StepStatus};
use rp_storage::{JobStore, JobStoreError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: StepName,
    pub status: StepStatus,
    pub stale_reclaimed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress_pct: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<StepName>,
    pub message: String,
    pub steps: Vec<StepView>,
    pub result_ref: ResultRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress_pct: job.progress_pct,
            current_step: job.current_step,
            message: job.message.clone(),
            steps: job
                .steps
                .iter()
                .map(|(step, state)| StepView {
                    step: *step,
                    status: state.status,
                    stale_reclaimed: state.stale_reclaimed,
                    error_code: state.error_code,
                })
                .collect(),
            result_ref: job.result_ref.clone(),
            error_code: job.error_code,
            error_detail: job.error_detail.clone(),
        }
    }
}

/// Poll the store until the job reaches a terminal status or the timeout
/// elapses; returns the last snapshot either way.
pub async fn watch_until_terminal(
    store: &Arc<dyn JobStore>,
    job_id: &JobId,
    timeout: Duration,
) -> Result<Job, JobStoreError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = store.get(job_id)?;
        if job.is_terminal() || tokio::time::Instant::now() >= deadline {
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
