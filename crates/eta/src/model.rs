// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration model serving.
//!
//! The serving contract is a linear form over [`crate::features`] columns;
//! training happens elsewhere and publishes artifacts into the registry
//! directory. Any load or shape problem makes the cascade fall through to
//! the baseline heuristic rather than failing the build.

use crate::features::FEATURE_COLUMNS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model artifact directory configured")]
    NoArtifactDir,
    #[error("model {version} unavailable: {detail}")]
    ArtifactUnavailable { version: String, detail: String },
    #[error("model {version} has {got} coefficients, expected {expected}")]
    BadShape {
        version: String,
        got: usize,
        expected: usize,
    },
}

/// A published duration model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub version: String,
    pub intercept: f64,
    /// One weight per feature column, in column order.
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.len() != FEATURE_COLUMNS.len() {
            return Err(ModelError::BadShape {
                version: self.version.clone(),
                got: self.coefficients.len(),
                expected: FEATURE_COLUMNS.len(),
            });
        }
        Ok(())
    }

    /// Predicted duration in seconds, floored at one second.
    pub fn predict(&self, features: &[f64; 10]) -> f64 {
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum();
        (self.intercept + dot).max(1.0)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
