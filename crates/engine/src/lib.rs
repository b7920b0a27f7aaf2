// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rp-engine: the optimization job pipeline.
//!
//! A pool of workers consumes step messages from an at-least-once queue and
//! drives each job through GEOCODE → BUILD_MATRIX → OPTIMIZE →
//! GENERATE_EXPORTS. Correctness under duplicate and out-of-order redelivery
//! comes entirely from the step lock manager's lease protocol plus
//! merge-only result accumulation; there is no distributed transaction.

pub mod collab;
pub mod dispatcher;
pub mod error;
pub mod persist;
pub mod progress;
pub mod queue;
pub mod resequence;
pub mod runtime;
pub mod single_jobs;
pub mod units;
pub mod view;

pub use collab::{Exporter, GeocodeSummary, Geocoder, MemoryDatasets, ObjectStoreExporter, StopSource};
pub use dispatcher::{DispatchError, Dispatcher, SubmitError};
pub use error::UnitError;
pub use persist::{PlanPersister, PersistedPlan};
pub use progress::LeaseProgress;
pub use queue::{InProcessQueue, QueueError, TaskMessage, TaskQueue};
pub use resequence::{
    ResequenceError, ResequenceOutcome, ResequenceRequest, Resequencer, Violation, ViolationKind,
};
pub use runtime::{hermetic_runtime, Runtime, RuntimeDeps, WorkerPool};
pub use view::{watch_until_terminal, JobView, StepView};
