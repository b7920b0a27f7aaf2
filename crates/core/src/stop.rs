// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery stops as produced by upload + geocoding.

use crate::geo::{LatLon, TimeWindow};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a delivery stop.
    pub struct StopId("stp-");
}

/// Geocoding outcome for a stop. Only Success/Manual stops are routable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeocodeStatus {
    Pending,
    Success,
    Failed,
    /// Coordinates pinned by hand after a failed geocode.
    Manual,
}

crate::simple_display! {
    GeocodeStatus {
        Pending => "PENDING",
        Success => "SUCCESS",
        Failed => "FAILED",
        Manual => "MANUAL",
    }
}

/// One delivery stop within a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    /// Caller-supplied reference (order number, door code, ...).
    pub stop_ref: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Arrival window, wall-clock `HH:MM`; both or neither.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tw_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tw_end: Option<String>,
    #[serde(default)]
    pub service_time_min: u32,
    #[serde(default)]
    pub demand: u32,
    pub geocode_status: GeocodeStatus,
}

impl Stop {
    pub fn is_routable(&self) -> bool {
        matches!(
            self.geocode_status,
            GeocodeStatus::Success | GeocodeStatus::Manual
        ) && self.lat.is_some()
            && self.lon.is_some()
    }

    pub fn position(&self) -> Option<LatLon> {
        Some(LatLon::new(self.lat?, self.lon?))
    }

    /// Parsed arrival window, if the stop constrains one.
    pub fn window(&self) -> Option<TimeWindow> {
        let start = crate::geo::hhmm_to_seconds(self.tw_start.as_deref()?).ok()?;
        let end = crate::geo::hhmm_to_seconds(self.tw_end.as_deref()?).ok()?;
        Some(TimeWindow::new(start, end))
    }
}

crate::builder! {
    pub struct StopBuilder => Stop {
        into {
            stop_ref: String = "S1",
            address: String = "1 Example Way",
        }
        set {
            lat: Option<f64> = Some(1.3000),
            lon: Option<f64> = Some(103.8000),
            service_time_min: u32 = 0,
            demand: u32 = 0,
            geocode_status: GeocodeStatus = GeocodeStatus::Success,
        }
        option {
            tw_start: String = None,
            tw_end: String = None,
        }
        computed {
            id: StopId = StopId::new(),
        }
    }
}

#[cfg(test)]
#[path = "stop_tests.rs"]
mod tests;
