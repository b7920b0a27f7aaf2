// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature vector shared by the duration model and the uplift model.
//!
//! The column order is part of the model artifact contract: artifacts store
//! one coefficient per column, in this order.

use rp_core::{bearing_deg, LatLon};

pub const FEATURE_COLUMNS: [&str; 10] = [
    "base_duration_s",
    "distance_m",
    "hour",
    "day_of_week",
    "is_peak_hour",
    "is_weekend",
    "distance_per_base_s",
    "lat_diff",
    "lon_diff",
    "bearing_deg",
];

pub fn is_peak_hour(hour: u8) -> bool {
    matches!(hour, 7..=9 | 17..=20)
}

/// Build the model input row for one ordered pair at a departure time.
pub fn build_features(
    base_duration_s: f64,
    distance_m: f64,
    hour: u8,
    day_of_week: u8,
    origin: LatLon,
    dest: LatLon,
) -> [f64; 10] {
    let base = base_duration_s.max(1.0);
    let distance = distance_m.max(0.0);
    [
        base,
        distance,
        hour as f64,
        day_of_week as f64,
        if is_peak_hour(hour) { 1.0 } else { 0.0 },
        if day_of_week >= 5 { 1.0 } else { 0.0 },
        distance / base,
        dest.lat - origin.lat,
        dest.lon - origin.lon,
        bearing_deg(origin, dest),
    ]
}

#[cfg(test)]
#[path = "features_tests.rs"]
mod tests;
