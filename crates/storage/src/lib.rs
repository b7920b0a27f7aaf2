// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rp-storage: durable state for the RoutePilot pipeline.
//!
//! Three stores, all behind traits so a database-backed deployment can swap
//! in without touching the engine: the job store (job rows + per-step lock
//! manager), the matrix artifact store (file path and object reference), and
//! the plan store.

pub mod artifact_store;
pub mod job_store;
pub mod plan_store;

pub use artifact_store::{
    ArtifactError, ArtifactLocator, ArtifactResolver, FileArtifactStore, MemoryObjectStore,
    ObjectRef, ObjectStore,
};
pub use job_store::{new_lock_token, JobStore, JobStoreError, MemoryJobStore, StatusUpdate};
pub use plan_store::{MemoryPlanStore, PlanStore, PlanStoreError, RouteTotals};
