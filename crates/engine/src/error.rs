// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit failure carrying its taxonomy code.

use rp_core::{ErrorCode, ErrorDetail};
use thiserror::Error;

/// A step unit failed. The dispatcher converts this into `fail_step`;
/// units never write failure state themselves.
#[derive(Debug, Error)]
#[error("{code}: {detail}")]
pub struct UnitError {
    pub code: ErrorCode,
    pub detail: ErrorDetail,
}

impl UnitError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: ErrorDetail::text(detail),
        }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, detail)
    }

    pub fn routing(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::RoutingError, detail)
    }

    /// Catch-all for unclassified unit failures.
    pub fn execution(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::StepExecutionFailed, detail)
    }
}

impl From<rp_storage::ArtifactError> for UnitError {
    fn from(err: rp_storage::ArtifactError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<rp_storage::JobStoreError> for UnitError {
    fn from(err: rp_storage::JobStoreError) -> Self {
        Self::new(ErrorCode::NotFound, err.to_string())
    }
}

impl From<rp_storage::PlanStoreError> for UnitError {
    fn from(err: rp_storage::PlanStoreError) -> Self {
        Self::new(ErrorCode::PlanNotReady, err.to_string())
    }
}

impl From<rp_eta::MatrixError> for UnitError {
    fn from(err: rp_eta::MatrixError) -> Self {
        match err {
            rp_eta::MatrixError::NoRoutableStops => {
                Self::new(ErrorCode::NoGeocodedStops, err.to_string())
            }
            rp_eta::MatrixError::Pair { .. } => Self::routing(err.to_string()),
        }
    }
}

impl From<rp_solver::SolveError> for UnitError {
    fn from(err: rp_solver::SolveError) -> Self {
        Self::validation(err.to_string())
    }
}
