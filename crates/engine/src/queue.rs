// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task queue seam.
//!
//! The pipeline only assumes at-least-once, possibly out-of-order delivery.
//! [`InProcessQueue`] is the in-process implementation used by tests and the
//! CLI; a distributed deployment substitutes its own behind the same trait.

use async_trait::async_trait;
use parking_lot::Mutex;
use rp_core::{JobId, StepName};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

/// Queue payload. The wire form is JSON:
/// `{"kind": "pipeline_step", "job_id": "...", "step": "GEOCODE"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskMessage {
    PipelineStep { job_id: JobId, step: StepName },
    /// Single-shot job dispatched outside the step state machine.
    Job { job_id: JobId },
}

impl TaskMessage {
    pub fn job_id(&self) -> &JobId {
        match self {
            TaskMessage::PipelineStep { job_id, .. } => job_id,
            TaskMessage::Job { job_id } => job_id,
        }
    }

    pub fn step(job_id: &JobId, step: StepName) -> Self {
        TaskMessage::PipelineStep {
            job_id: job_id.clone(),
            step,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, message: TaskMessage) -> Result<(), QueueError>;

    /// Wait for the next message; None once the queue is closed and drained.
    async fn pop(&self) -> Option<TaskMessage>;
}

/// In-process FIFO queue.
///
/// Redelivery is modelled by consumers re-enqueueing a message they could
/// not finish, which is exactly how the retry drill exercises the pipeline.
pub struct InProcessQueue {
    items: Mutex<VecDeque<TaskMessage>>,
    notify: Notify,
    closed: Mutex<bool>,
}

impl InProcessQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: Mutex::new(false),
        })
    }

    /// Non-blocking pop for synchronous drivers (tests, inline CLI mode).
    pub fn try_pop(&self) -> Option<TaskMessage> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Stop accepting work; pending messages still drain.
    pub fn close(&self) {
        *self.closed.lock() = true;
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl TaskQueue for InProcessQueue {
    fn enqueue(&self, message: TaskMessage) -> Result<(), QueueError> {
        if *self.closed.lock() {
            return Err(QueueError::Closed);
        }
        self.items.lock().push_back(message);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Option<TaskMessage> {
        loop {
            {
                let mut items = self.items.lock();
                if let Some(message) = items.pop_front() {
                    // Re-arm the next waiter: notify_one permits don't stack.
                    if !items.is_empty() {
                        self.notify.notify_one();
                    }
                    return Some(message);
                }
            }
            if *self.closed.lock() {
                return None;
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
