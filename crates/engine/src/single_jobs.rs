// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-shot jobs (`kind = "job"` messages), handled outside the step
//! state machine: no locks, no step chain, one unit of work per message.

use crate::collab::Exporter;
use crate::dispatcher::DispatchError;
use crate::runtime::Runtime;
use rp_core::{Clock, JobId, JobPayload, JobStatus, NullProgress};
use rp_storage::{JobStore, JobStoreError, PlanStore, StatusUpdate};

pub(crate) fn run<C: Clock>(rt: &Runtime<C>, job_id: &JobId) -> Result<(), DispatchError> {
    let job = match rt.store.get(job_id) {
        Ok(job) => job,
        Err(JobStoreError::NotFound(_)) => {
            tracing::warn!(job_id = %job_id, "single-shot message for unknown job dropped");
            return Ok(());
        }
    };
    if job.is_terminal() {
        return Ok(());
    }

    let JobPayload::ExportPdf { plan_id } = &job.payload else {
        // Pipeline payloads are only ever driven by step messages.
        tracing::warn!(job_id = %job_id, kind = %job.kind, "unsupported single-shot job dropped");
        return Ok(());
    };

    rt.store.set_status(
        job_id,
        StatusUpdate::default()
            .status(JobStatus::Running)
            .progress_pct(10)
            .message("Generating export artifacts"),
    )?;

    let outcome = rt
        .plans
        .get(plan_id)
        .map_err(crate::error::UnitError::from)
        .and_then(|plan| rt.exporter.export(&plan, &NullProgress));

    match outcome {
        Ok(partial) => {
            rt.store.merge_result(job_id, partial)?;
            rt.store.set_status(
                job_id,
                StatusUpdate::default()
                    .status(JobStatus::Succeeded)
                    .progress_pct(100)
                    .message("Export artifacts ready"),
            )?;
        }
        Err(err) => {
            rt.store.set_status(
                job_id,
                StatusUpdate::default()
                    .status(JobStatus::Failed)
                    .message(err.code.as_str())
                    .error_code(err.code)
                    .error_detail(err.detail),
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "single_jobs_tests.rs"]
mod tests;
