// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multiplicative uplift correction.
//!
//! A secondary regression predicts a congestion factor applied on top of the
//! duration model or the baseline. Factors are clamped to keep a misbehaving
//! artifact from producing absurd travel times.

use crate::features::FEATURE_COLUMNS;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FACTOR_MIN: f64 = 0.7;
pub const FACTOR_MAX: f64 = 2.5;

pub fn clamp_factor(factor: f64) -> f64 {
    factor.clamp(FACTOR_MIN, FACTOR_MAX)
}

/// Published uplift artifact: linear form over the shared feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftModel {
    pub version: String,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl UpliftModel {
    pub fn predict_factor(&self, features: &[f64; 10]) -> f64 {
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(w, x)| w * x)
            .sum();
        clamp_factor(self.intercept + dot)
    }
}

/// Uplift tier: disabled by feature flag, or silently absent when no
/// artifact has been published yet.
pub struct UpliftService {
    enabled: bool,
    artifact: Option<UpliftModel>,
}

impl UpliftService {
    /// Load `uplift.json` from the artifact directory when the flag is on.
    pub fn load(enabled: bool, artifact_dir: Option<&Path>) -> Self {
        let artifact = if enabled {
            artifact_dir.and_then(|dir| {
                let raw = std::fs::read(dir.join("uplift.json")).ok()?;
                let model: UpliftModel = serde_json::from_slice(&raw).ok()?;
                (model.coefficients.len() == FEATURE_COLUMNS.len()).then_some(model)
            })
        } else {
            None
        };
        Self { enabled, artifact }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            artifact: None,
        }
    }

    /// Enabled service with an already-parsed artifact (tests, tooling).
    pub fn with_artifact(model: UpliftModel) -> Self {
        Self {
            enabled: true,
            artifact: Some(model),
        }
    }

    pub fn available(&self) -> bool {
        self.enabled && self.artifact.is_some()
    }

    pub fn model_version(&self) -> Option<&str> {
        self.artifact.as_ref().map(|m| m.version.as_str())
    }

    pub fn factor(&self, features: &[f64; 10]) -> Option<f64> {
        if !self.enabled {
            return None;
        }
        Some(self.artifact.as_ref()?.predict_factor(features))
    }
}

#[cfg(test)]
#[path = "uplift_tests.rs"]
mod tests;
