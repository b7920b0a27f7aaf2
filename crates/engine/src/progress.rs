// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress reporting bound to a step lease.
//!
//! Every report renews the lease, so a long unit that keeps reporting keeps
//! its ownership; one that stalls past the lease can be taken over. A report
//! after ownership loss writes nothing.

use rp_core::{JobId, JobStatus, ProgressReporter, StepName};
use rp_storage::{JobStore, StatusUpdate};
use std::sync::Arc;
use std::time::Duration;

pub struct LeaseProgress {
    store: Arc<dyn JobStore>,
    job_id: JobId,
    step: StepName,
    lock_token: String,
    lease: Duration,
}

impl LeaseProgress {
    pub fn new(
        store: Arc<dyn JobStore>,
        job_id: JobId,
        step: StepName,
        lock_token: String,
        lease: Duration,
    ) -> Self {
        Self {
            store,
            job_id,
            step,
            lock_token,
            lease,
        }
    }
}

impl ProgressReporter for LeaseProgress {
    fn report(&self, pct: u8, message: &str) {
        let touched = match self.store.touch_lease(
            &self.job_id,
            self.step,
            &self.lock_token,
            self.lease,
        ) {
            Ok(touched) => touched,
            Err(err) => {
                tracing::debug!(job_id = %self.job_id, step = %self.step, error = %err,
                    "progress write skipped");
                return;
            }
        };
        // Ownership lost since the unit started; stop writing progress.
        if !touched {
            return;
        }

        let update = StatusUpdate::default()
            .status(JobStatus::Running)
            .progress_pct(self.step.map_progress(pct))
            .current_step(self.step)
            .message(message);
        if let Err(err) = self.store.set_status(&self.job_id, update) {
            tracing::debug!(job_id = %self.job_id, step = %self.step, error = %err,
                "progress write skipped");
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
