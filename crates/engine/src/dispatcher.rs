// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline dispatcher: one state machine turn per queue message.
//!
//! Tolerates duplicate delivery, out-of-order delivery of completed steps,
//! and crashed workers holding stale locks. All of it reduces to three
//! rules: every mutation is token-conditioned, results merge idempotently,
//! and a failed lock on a Succeeded step self-heals the chain by enqueueing
//! the successor.

use crate::progress::LeaseProgress;
use crate::queue::{QueueError, TaskMessage, TaskQueue};
use crate::runtime::Runtime;
use crate::single_jobs;
use crate::units;
use rp_core::{
    Clock, Job, JobId, JobKind, JobStatus, JobPayload, OptimizePayload, StepName, StepStatus,
};
use rp_storage::{new_lock_token, JobStore, JobStoreError, StatusUpdate};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Injected redelivery drill: deliberately abandons the message so the
    /// queue delivers it again. Never recorded as a job failure.
    #[error("retry drill abort for job {job_id} step {step}")]
    RetryDrill { job_id: JobId, step: StepName },
    #[error(transparent)]
    Store(#[from] JobStoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] JobStoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct Dispatcher<C: Clock> {
    rt: Arc<Runtime<C>>,
}

impl<C: Clock> Dispatcher<C> {
    pub fn new(rt: Arc<Runtime<C>>) -> Arc<Self> {
        Arc::new(Self { rt })
    }

    pub fn runtime(&self) -> &Runtime<C> {
        &self.rt
    }

    /// Validate, create, and enqueue an optimization pipeline job.
    pub fn submit_optimize(&self, payload: OptimizePayload) -> Result<Job, SubmitError> {
        payload
            .validate()
            .map_err(|e| SubmitError::Validation(e.to_string()))?;
        let job = self
            .rt
            .store
            .create_job(JobKind::Optimize, JobPayload::Optimize(payload))?;
        let job = self.rt.store.set_status(
            &job.id,
            StatusUpdate::default()
                .status(JobStatus::Queued)
                .progress_pct(0)
                .current_step(StepName::Geocode)
                .message("Queued for geocoding"),
        )?;
        self.rt
            .queue
            .enqueue(TaskMessage::step(&job.id, StepName::Geocode))?;
        Ok(job)
    }

    /// Create and enqueue a single-shot export job for an existing plan.
    pub fn submit_export(&self, plan_id: rp_core::PlanId) -> Result<Job, SubmitError> {
        let job = self
            .rt
            .store
            .create_job(JobKind::ExportPdf, JobPayload::ExportPdf { plan_id })?;
        self.rt.queue.enqueue(TaskMessage::Job {
            job_id: job.id.clone(),
        })?;
        Ok(job)
    }

    /// Handle one queue message. Unit failures are recorded on the job and
    /// return Ok; only infrastructure problems surface as errors.
    pub fn dispatch(&self, message: &TaskMessage) -> Result<(), DispatchError> {
        match message {
            TaskMessage::PipelineStep { job_id, step } => self.process_step(job_id, *step),
            TaskMessage::Job { job_id } => single_jobs::run(&self.rt, job_id),
        }
    }

    fn process_step(&self, job_id: &JobId, step: StepName) -> Result<(), DispatchError> {
        let job = match self.rt.store.get(job_id) {
            Ok(job) => job,
            Err(JobStoreError::NotFound(_)) => {
                tracing::warn!(job_id = %job_id, step = %step, "message for unknown job dropped");
                return Ok(());
            }
        };
        if job.kind != JobKind::Optimize {
            return Ok(());
        }
        // Terminal jobs drop late messages; this is the idempotent no-op path.
        if job.is_terminal() {
            tracing::debug!(job_id = %job_id, step = %step, status = %job.status,
                "message for terminal job dropped");
            return Ok(());
        }

        let token = new_lock_token(step);
        let lease = self.rt.step_lease();
        if !self.rt.store.lock_step(job_id, step, &token, lease)? {
            return self.heal_after_lost_lock(job_id, step);
        }

        self.rt.store.set_status(
            job_id,
            StatusUpdate::default()
                .status(JobStatus::Running)
                .progress_pct(step.progress_floor())
                .current_step(step)
                .message(format!("Running {step}")),
        )?;

        self.maybe_inject_retry_drill(job_id, step)?;

        let Some(payload) = job.payload.as_optimize().cloned() else {
            self.rt.store.fail_step(
                job_id,
                step,
                &token,
                rp_core::ErrorCode::ValidationError,
                rp_core::ErrorDetail::text("pipeline job without optimize payload"),
            )?;
            return Ok(());
        };
        let result_ref = job.result_ref.clone();
        let progress = LeaseProgress::new(
            Arc::clone(&self.rt.store),
            job_id.clone(),
            step,
            token.clone(),
            lease,
        );

        let outcome = match step {
            StepName::Geocode => units::run_geocode(&self.rt, &payload, &progress),
            StepName::BuildMatrix => {
                units::run_build_matrix(&self.rt, job_id, &payload, &progress)
            }
            StepName::Optimize => units::run_optimize(&self.rt, &payload, &result_ref, &progress),
            StepName::GenerateExports => {
                units::run_generate_exports(&self.rt, &result_ref, &progress)
            }
        };

        let partial = match outcome {
            Ok(partial) => partial,
            Err(err) => {
                tracing::error!(job_id = %job_id, step = %step, code = %err.code,
                    detail = %err.detail, "step unit failed");
                self.rt
                    .store
                    .fail_step(job_id, step, &token, err.code, err.detail)?;
                return Ok(());
            }
        };

        // Ownership may have moved while the unit ran (lease expiry plus a
        // reclaiming worker). Discard rather than corrupt.
        if !self.rt.store.has_lock(job_id, step, &token)? {
            tracing::warn!(job_id = %job_id, step = %step,
                "lock lost during execution, discarding result");
            return Ok(());
        }

        self.rt.store.merge_result(job_id, partial)?;
        self.rt.store.complete_step(
            job_id,
            step,
            &token,
            step.progress_ceiling(),
            &format!("{step} complete"),
        )?;

        match step.next() {
            Some(next) => {
                self.rt.queue.enqueue(TaskMessage::step(job_id, next))?;
            }
            None => self.finalize(job_id, step)?,
        }
        Ok(())
    }

    /// Lock acquisition failed. If this step already Succeeded, the message
    /// is a duplicate or late redelivery: re-enqueue a Pending successor
    /// (self-healing the chain) or finalize a fully-completed job.
    fn heal_after_lost_lock(&self, job_id: &JobId, step: StepName) -> Result<(), DispatchError> {
        let job = self.rt.store.get(job_id)?;
        let step_status = job.step(step).map(|s| s.status);
        if step_status != Some(StepStatus::Succeeded) {
            tracing::debug!(job_id = %job_id, step = %step, "lock busy, message dropped");
            return Ok(());
        }

        match step.next() {
            Some(next) => {
                let next_pending = job
                    .step(next)
                    .map(|s| s.status == StepStatus::Pending)
                    .unwrap_or(true);
                if next_pending {
                    tracing::info!(job_id = %job_id, step = %step, next = %next,
                        "re-enqueueing pending successor after duplicate delivery");
                    self.rt.queue.enqueue(TaskMessage::step(job_id, next))?;
                }
            }
            None => {
                if job.status != JobStatus::Succeeded {
                    self.finalize(job_id, step)?;
                }
            }
        }
        Ok(())
    }

    fn finalize(&self, job_id: &JobId, final_step: StepName) -> Result<(), DispatchError> {
        let latest = self.rt.store.get(job_id)?;
        self.rt.store.set_status(
            job_id,
            StatusUpdate::default()
                .status(JobStatus::Succeeded)
                .progress_pct(100)
                .current_step(final_step)
                .message("All optimization steps completed")
                .result_ref(latest.result_ref.clone()),
        )?;

        let latency_s = self
            .rt
            .clock
            .epoch_ms()
            .saturating_sub(latest.created_at_ms)
            / 1000;
        let plan_id = latest
            .result_ref
            .get("plan_id")
            .and_then(|v| v.as_str())
            .unwrap_or("-")
            .to_string();
        tracing::info!(job_id = %job_id, plan_id = %plan_id, latency_s, "optimization pipeline complete");
        if latency_s >= self.rt.settings.optimize_latency_warn_seconds {
            tracing::warn!(job_id = %job_id, plan_id = %plan_id, latency_s,
                threshold_s = self.rt.settings.optimize_latency_warn_seconds,
                "optimization pipeline slow");
        }
        Ok(())
    }

    /// When armed for this step, abort after marking the drill so redelivery
    /// behavior can be validated end to end. Fires at most once per step.
    fn maybe_inject_retry_drill(&self, job_id: &JobId, step: StepName) -> Result<(), DispatchError> {
        let armed = self
            .rt
            .settings
            .retry_drill_step
            .as_deref()
            .map(|configured| configured == step.to_string())
            .unwrap_or(false);
        if !armed {
            return Ok(());
        }
        if !self.rt.store.mark_retry_drill_injected(job_id, step)? {
            return Ok(());
        }
        let delay_ms = self.rt.settings.retry_drill_delay_ms;
        if delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(delay_ms));
        }
        Err(DispatchError::RetryDrill {
            job_id: job_id.clone(),
            step,
        })
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
