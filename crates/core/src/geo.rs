// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinate and time-of-day primitives shared across the planner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Round to 5 decimal places (~1m), the granularity used for cache keys.
    pub fn rounded(&self) -> Self {
        Self {
            lat: round5(self.lat),
            lon: round5(self.lon),
        }
    }
}

fn round5(v: f64) -> f64 {
    (v * 100_000.0).round() / 100_000.0
}

/// Great-circle distance in meters.
pub fn haversine_m(origin: LatLon, dest: LatLon) -> f64 {
    let p = std::f64::consts::PI / 180.0;
    let dlat = (dest.lat - origin.lat) * p;
    let dlon = (dest.lon - origin.lon) * p;
    let a = (dlat / 2.0).sin().powi(2)
        + (origin.lat * p).cos() * (dest.lat * p).cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

/// Initial bearing from origin to dest, degrees in [0, 360).
pub fn bearing_deg(origin: LatLon, dest: LatLon) -> f64 {
    let lat1 = origin.lat.to_radians();
    let lat2 = dest.lat.to_radians();
    let dlon = (dest.lon - origin.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Inclusive arrival window in seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_s: u32,
    pub end_s: u32,
}

impl TimeWindow {
    pub fn new(start_s: u32, end_s: u32) -> Self {
        Self { start_s, end_s }
    }

    pub fn contains(&self, t: u32) -> bool {
        self.start_s <= t && t <= self.end_s
    }

    /// True when the two windows share no instant.
    pub fn disjoint_from(&self, other: &TimeWindow) -> bool {
        self.end_s < other.start_s || self.start_s > other.end_s
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("invalid HH:MM value: {0}")]
    InvalidHhmm(String),
}

/// Parse a wall-clock `HH:MM` string into seconds since midnight.
pub fn hhmm_to_seconds(value: &str) -> Result<u32, TimeParseError> {
    let mut parts = value.split(':');
    let (Some(hh), Some(mm), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TimeParseError::InvalidHhmm(value.to_string()));
    };
    let hours: u32 = hh
        .parse()
        .map_err(|_| TimeParseError::InvalidHhmm(value.to_string()))?;
    let minutes: u32 = mm
        .parse()
        .map_err(|_| TimeParseError::InvalidHhmm(value.to_string()))?;
    if hours > 23 || minutes > 59 {
        return Err(TimeParseError::InvalidHhmm(value.to_string()));
    }
    Ok(hours * 3600 + minutes * 60)
}

/// Format seconds since midnight as `HH:MM`.
pub fn seconds_to_hhmm(seconds: u32) -> String {
    format!("{:02}:{:02}", (seconds / 3600) % 24, (seconds % 3600) / 60)
}

#[cfg(test)]
#[path = "geo_tests.rs"]
mod tests;
