// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rp-core: Core library for the RoutePilot delivery route planner

pub mod macros;

pub mod artifact;
pub mod clock;
pub mod error;
pub mod geo;
pub mod id;
pub mod job;
pub mod payload;
pub mod plan;
pub mod progress;
pub mod result_ref;
pub mod settings;
pub mod stop;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use artifact::{
    ArtifactNode, EtaSource, MatrixStrategy, NodeKind, OptimizationArtifact,
    ARTIFACT_SCHEMA_VERSION,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ErrorCode, ErrorDetail};
pub use geo::{bearing_deg, haversine_m, hhmm_to_seconds, seconds_to_hhmm, LatLon, TimeWindow};
pub use id::short;
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{
    Job, JobId, JobKind, JobStatus, StepName, StepState, StepStatus, PIPELINE_STEPS,
};
pub use payload::JobPayload;
#[cfg(any(test, feature = "test-support"))]
pub use payload::OptimizePayloadBuilder;
pub use payload::OptimizePayload;
pub use plan::{Plan, PlanId, PlanStatus, Route, RouteId, RouteStop};
#[cfg(any(test, feature = "test-support"))]
pub use progress::RecordingProgress;
pub use progress::{NullProgress, ProgressReporter};
pub use result_ref::ResultRef;
pub use settings::Settings;
#[cfg(any(test, feature = "test-support"))]
pub use stop::StopBuilder;
pub use stop::{GeocodeStatus, Stop, StopId};
