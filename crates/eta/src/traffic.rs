// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live traffic override for an already-sequenced route.
//!
//! Distinct from per-pair matrix estimation: this runs after the solve (or
//! during a resequence preview) to refresh the legs of one ordered route.
//! Failures fall back to the cascade's durations; the caller records which
//! source actually served.

use crate::provider::ProviderError;
use rp_core::LatLon;

/// Per-leg durations for an ordered waypoint sequence.
pub trait LiveTrafficProvider: Send + Sync {
    fn enabled(&self) -> bool;

    /// One duration per consecutive waypoint pair, traffic-aware.
    /// `departure_s` is seconds since midnight at the first waypoint.
    fn segment_times(
        &self,
        waypoints: &[LatLon],
        departure_s: u32,
    ) -> Result<Vec<u32>, ProviderError>;
}

/// Stand-in when no traffic provider is configured.
#[derive(Default)]
pub struct DisabledTraffic;

impl LiveTrafficProvider for DisabledTraffic {
    fn enabled(&self) -> bool {
        false
    }

    fn segment_times(
        &self,
        _waypoints: &[LatLon],
        _departure_s: u32,
    ) -> Result<Vec<u32>, ProviderError> {
        Err(ProviderError::permanent("traffic", "provider disabled"))
    }
}

/// Deterministic traffic provider: straight-line legs scaled by a fixed
/// factor. Used by tests and the CLI demo.
pub struct FixedFactorTraffic {
    pub factor: f64,
    pub speed_mps: f64,
}

impl FixedFactorTraffic {
    pub fn new(factor: f64) -> Self {
        Self {
            factor,
            speed_mps: crate::provider::HaversineProvider::DEFAULT_SPEED_MPS,
        }
    }
}

impl LiveTrafficProvider for FixedFactorTraffic {
    fn enabled(&self) -> bool {
        true
    }

    fn segment_times(
        &self,
        waypoints: &[LatLon],
        _departure_s: u32,
    ) -> Result<Vec<u32>, ProviderError> {
        if waypoints.len() < 2 {
            return Err(ProviderError::permanent("traffic", "need at least 2 waypoints"));
        }
        Ok(waypoints
            .windows(2)
            .map(|pair| {
                let base = rp_core::haversine_m(pair[0], pair[1]) / self.speed_mps;
                (base * self.factor).max(1.0) as u32
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "traffic_tests.rs"]
mod tests;
