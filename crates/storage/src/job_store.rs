// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store and step lock manager.
//!
//! The store is the single source of truth for job status. Every mutation of
//! a Running step is conditioned on the caller's lock token, which is what
//! lets the pipeline tolerate duplicate dispatch and stale workers without a
//! distributed transaction.

use parking_lot::Mutex;
use rp_core::{
    Clock, ErrorCode, ErrorDetail, Job, JobId, JobKind, JobPayload, JobStatus, ResultRef,
    StepName, StepState, StepStatus,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(JobId),
}

/// Partial job-row update. Fields left as None keep their current value.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub status: Option<JobStatus>,
    pub progress_pct: Option<u8>,
    pub current_step: Option<StepName>,
    pub message: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub error_detail: Option<ErrorDetail>,
    pub result_ref: Option<ResultRef>,
}

impl StatusUpdate {
    rp_core::setters! {
        option {
            status: JobStatus,
            progress_pct: u8,
            current_step: StepName,
            message: String,
            error_code: ErrorCode,
            error_detail: ErrorDetail,
            result_ref: ResultRef,
        }
    }
}

/// Job persistence plus the per-(job, step) lease protocol.
pub trait JobStore: Send + Sync {
    fn create_job(&self, kind: JobKind, payload: JobPayload) -> Result<Job, JobStoreError>;

    fn get(&self, job_id: &JobId) -> Result<Job, JobStoreError>;

    /// Acquire the step for `token`. Fails on a terminal job, a Succeeded
    /// step, or a Running step whose lease is still live. An expired Running
    /// lease is force-reclaimed (the anti-duplicate-worker safeguard).
    fn lock_step(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        lease: Duration,
    ) -> Result<bool, JobStoreError>;

    /// Extend the lease; true only while `token` still owns the step.
    fn touch_lease(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        lease: Duration,
    ) -> Result<bool, JobStoreError>;

    /// Whether `token` still owns the Running step. Checked immediately
    /// before persisting results to detect ownership loss mid-unit.
    fn has_lock(&self, job_id: &JobId, step: StepName, token: &str)
        -> Result<bool, JobStoreError>;

    /// Mark the step Succeeded. Silent no-op when a competing worker holds
    /// the step (that worker already advanced it, or will).
    fn complete_step(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        progress_pct: u8,
        message: &str,
    ) -> Result<(), JobStoreError>;

    /// Mark the step and the whole job Failed, same ownership check.
    fn fail_step(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        error_code: ErrorCode,
        error_detail: ErrorDetail,
    ) -> Result<(), JobStoreError>;

    fn set_status(&self, job_id: &JobId, update: StatusUpdate) -> Result<Job, JobStoreError>;

    /// Merge a partial result into `result_ref` without touching other keys.
    fn merge_result(&self, job_id: &JobId, partial: ResultRef) -> Result<(), JobStoreError>;

    /// Coarse cancellation: mark the job Cancelled. In-flight workers notice
    /// on their next ownership check. Returns false if already terminal.
    fn cancel(&self, job_id: &JobId) -> Result<bool, JobStoreError>;

    /// Record that the redelivery drill fired for this step. Returns false
    /// if it had already fired (the drill aborts at most once per step).
    fn mark_retry_drill_injected(
        &self,
        job_id: &JobId,
        step: StepName,
    ) -> Result<bool, JobStoreError>;
}

/// In-memory job store. One mutex serializes all read-modify-write cycles,
/// mirroring the row-level serialization a database deployment would get.
pub struct MemoryJobStore<C: Clock> {
    jobs: Mutex<HashMap<JobId, Job>>,
    clock: C,
    default_lease: Duration,
}

impl<C: Clock> MemoryJobStore<C> {
    pub fn new(clock: C, default_lease: Duration) -> Arc<Self> {
        Arc::new(Self {
            jobs: Mutex::new(HashMap::new()),
            clock,
            default_lease,
        })
    }

    fn with_job<T>(
        &self,
        job_id: &JobId,
        f: impl FnOnce(&mut Job, u64) -> T,
    ) -> Result<T, JobStoreError> {
        let now = self.clock.epoch_ms();
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.clone()))?;
        Ok(f(job, now))
    }

    fn lease_ms(&self, lease: Duration) -> u64 {
        lease.as_millis().max(5_000) as u64
    }
}

impl<C: Clock> JobStore for MemoryJobStore<C> {
    fn create_job(&self, kind: JobKind, payload: JobPayload) -> Result<Job, JobStoreError> {
        let job = Job::new(kind, payload, &self.clock);
        self.jobs.lock().insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn get(&self, job_id: &JobId) -> Result<Job, JobStoreError> {
        self.jobs
            .lock()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(job_id.clone()))
    }

    fn lock_step(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        lease: Duration,
    ) -> Result<bool, JobStoreError> {
        let default_lease_ms = self.lease_ms(self.default_lease);
        let lease_ms = self.lease_ms(lease);
        self.with_job(job_id, |job, now| {
            if job.is_terminal() {
                return false;
            }
            let entry = job
                .steps
                .entry(step)
                .or_insert_with(|| StepState::pending(now));
            match entry.status {
                StepStatus::Succeeded => return false,
                StepStatus::Running => {
                    if !entry.lease_expired(now, default_lease_ms) {
                        return false;
                    }
                    entry.stale_reclaimed += 1;
                    tracing::warn!(
                        job_id = %job.id,
                        step = %step,
                        stale_reclaimed = entry.stale_reclaimed,
                        "stale step lock reclaimed"
                    );
                }
                StepStatus::Pending | StepStatus::Failed => {}
            }

            entry.status = StepStatus::Running;
            entry.lock_token = Some(token.to_string());
            entry.updated_at_ms = now;
            entry.lease_expires_at_ms = Some(now + lease_ms);
            job.current_step = Some(step);
            job.updated_at_ms = now;
            true
        })
    }

    fn touch_lease(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        lease: Duration,
    ) -> Result<bool, JobStoreError> {
        let lease_ms = self.lease_ms(lease);
        self.with_job(job_id, |job, now| {
            let Some(entry) = job.steps.get_mut(&step) else {
                return false;
            };
            if !entry.holds_token(token) {
                return false;
            }
            entry.updated_at_ms = now;
            entry.lease_expires_at_ms = Some(now + lease_ms);
            job.updated_at_ms = now;
            true
        })
    }

    fn has_lock(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
    ) -> Result<bool, JobStoreError> {
        self.with_job(job_id, |job, _| {
            job.steps
                .get(&step)
                .map(|entry| entry.holds_token(token))
                .unwrap_or(false)
        })
    }

    fn complete_step(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        progress_pct: u8,
        message: &str,
    ) -> Result<(), JobStoreError> {
        self.with_job(job_id, |job, now| {
            let Some(entry) = job.steps.get_mut(&step) else {
                return;
            };
            // Another worker's live lock wins this step.
            if entry.status == StepStatus::Running && entry.lock_token.as_deref() != Some(token)
            {
                return;
            }
            entry.status = StepStatus::Succeeded;
            entry.lock_token = None;
            entry.lease_expires_at_ms = None;
            entry.updated_at_ms = now;

            job.status = JobStatus::Running;
            job.raise_progress(progress_pct);
            job.current_step = Some(step);
            job.set_message(message);
            job.updated_at_ms = now;
        })
    }

    fn fail_step(
        &self,
        job_id: &JobId,
        step: StepName,
        token: &str,
        error_code: ErrorCode,
        error_detail: ErrorDetail,
    ) -> Result<(), JobStoreError> {
        self.with_job(job_id, |job, now| {
            let Some(entry) = job.steps.get_mut(&step) else {
                return;
            };
            if entry.status == StepStatus::Running
                && entry.lock_token.is_some()
                && entry.lock_token.as_deref() != Some(token)
            {
                return;
            }
            entry.status = StepStatus::Failed;
            entry.lock_token = None;
            entry.lease_expires_at_ms = None;
            entry.updated_at_ms = now;
            entry.error_code = Some(error_code);
            entry.error_detail = Some(error_detail.clone());

            job.status = JobStatus::Failed;
            job.raise_progress(1);
            job.current_step = Some(step);
            job.set_message(error_code.as_str());
            job.error_code = Some(error_code);
            job.error_detail = Some(error_detail);
            job.updated_at_ms = now;
        })
    }

    fn set_status(&self, job_id: &JobId, update: StatusUpdate) -> Result<Job, JobStoreError> {
        self.with_job(job_id, |job, now| {
            if let Some(status) = update.status {
                job.status = status;
            }
            if let Some(pct) = update.progress_pct {
                if job.status == JobStatus::Running {
                    job.raise_progress(pct);
                } else {
                    job.progress_pct = pct.min(100);
                }
            }
            if let Some(step) = update.current_step {
                job.current_step = Some(step);
            }
            if let Some(message) = update.message {
                job.set_message(message);
            }
            if let Some(code) = update.error_code {
                job.error_code = Some(code);
            }
            if let Some(detail) = update.error_detail {
                job.error_detail = Some(detail);
            }
            if let Some(result_ref) = update.result_ref {
                job.result_ref = result_ref;
            }
            if job.status == JobStatus::Succeeded {
                job.error_code = None;
                job.error_detail = None;
            }
            job.updated_at_ms = now;
            job.clone()
        })
    }

    fn merge_result(&self, job_id: &JobId, partial: ResultRef) -> Result<(), JobStoreError> {
        self.with_job(job_id, |job, now| {
            job.result_ref.merge(partial);
            job.updated_at_ms = now;
        })
    }

    fn cancel(&self, job_id: &JobId) -> Result<bool, JobStoreError> {
        self.with_job(job_id, |job, now| {
            if job.is_terminal() {
                return false;
            }
            job.status = JobStatus::Cancelled;
            job.set_message("Cancelled");
            job.updated_at_ms = now;
            true
        })
    }

    fn mark_retry_drill_injected(
        &self,
        job_id: &JobId,
        step: StepName,
    ) -> Result<bool, JobStoreError> {
        self.with_job(job_id, |job, now| {
            let Some(entry) = job.steps.get_mut(&step) else {
                return false;
            };
            if entry.retry_drill_injected {
                return false;
            }
            entry.retry_drill_injected = true;
            entry.updated_at_ms = now;
            job.updated_at_ms = now;
            true
        })
    }
}

/// Generate a fresh opaque lock token for one dispatch attempt.
pub fn new_lock_token(step: StepName) -> String {
    format!("{}:{}", step, uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
#[path = "job_store_tests.rs"]
mod tests;
