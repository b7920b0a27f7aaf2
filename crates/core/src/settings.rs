// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide settings, loaded once at startup and passed by reference.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tunables for the pipeline, estimation cascade, and providers.
///
/// Loaded from a TOML file with environment overrides for the handful of
/// knobs that vary per deployment. Everything has a workable default so
/// tests and the CLI run with no config file at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Step lease duration granted by `lock_step`; floor of 5s is enforced.
    pub step_lease_seconds: u64,
    /// Completed pipelines slower than this log a warning.
    pub optimize_latency_warn_seconds: u64,
    /// Arm the injected redelivery drill for this step name (uppercase).
    pub retry_drill_step: Option<String>,
    pub retry_drill_delay_ms: u64,
    pub feature_ml_uplift: bool,
    pub feature_live_traffic: bool,
    /// Directory holding ML model artifacts; None disables the model tier.
    pub model_artifact_dir: Option<PathBuf>,
    /// Outbound provider requests per second (token bucket refill rate).
    pub provider_rate_per_sec: f64,
    pub provider_burst: u32,
    pub provider_max_attempts: u32,
    pub provider_backoff_base_ms: u64,
    pub provider_backoff_cap_ms: u64,
    /// Duration cache TTL.
    pub eta_cache_ttl_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step_lease_seconds: 120,
            optimize_latency_warn_seconds: 900,
            retry_drill_step: None,
            retry_drill_delay_ms: 0,
            feature_ml_uplift: false,
            feature_live_traffic: false,
            model_artifact_dir: None,
            provider_rate_per_sec: 10.0,
            provider_burst: 20,
            provider_max_attempts: 4,
            provider_backoff_base_ms: 250,
            provider_backoff_cap_ms: 5_000,
            eta_cache_ttl_seconds: 24 * 3600,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    /// Effective lease in milliseconds, with the 5s floor applied.
    pub fn step_lease_ms(&self) -> u64 {
        self.step_lease_seconds.max(5) * 1000
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&raw)?;
        settings.apply_env();
        Ok(settings)
    }

    /// Overrides for deployment-varying knobs: `RP_STEP_LEASE_SECONDS`,
    /// `RP_MODEL_ARTIFACT_DIR`, `RP_RETRY_DRILL_STEP`.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("RP_STEP_LEASE_SECONDS") {
            if let Ok(parsed) = value.parse() {
                self.step_lease_seconds = parsed;
            }
        }
        if let Ok(value) = std::env::var("RP_MODEL_ARTIFACT_DIR") {
            if !value.is_empty() {
                self.model_artifact_dir = Some(PathBuf::from(value));
            }
        }
        if let Ok(value) = std::env::var("RP_RETRY_DRILL_STEP") {
            let trimmed = value.trim().to_uppercase();
            self.retry_drill_step = (!trimmed.is_empty()).then_some(trimmed);
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
