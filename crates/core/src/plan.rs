// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable route plan records produced from a solver result.

use crate::artifact::EtaSource;
use crate::geo::{LatLon, TimeWindow};
use crate::stop::StopId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a route plan.
    pub struct PlanId("pln-");
}

crate::define_id! {
    /// Unique identifier for one vehicle's route within a plan.
    pub struct RouteId("rte-");
}

/// Plan outcome. Infeasible plans are a normal result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Every stop served.
    Success,
    /// Solved, but some stops were dropped.
    Partial,
    /// No assignment satisfies the hard constraints.
    Infeasible,
}

crate::simple_display! {
    PlanStatus {
        Success => "SUCCESS",
        Partial => "PARTIAL",
        Infeasible => "INFEASIBLE",
    }
}

/// One visit on a vehicle's route. `stop_id` is None for the depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub sequence_idx: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<StopId>,
    /// Arrival in seconds since midnight.
    pub arrival_s: u32,
    /// Slack absorbed waiting for the arrival window to open.
    pub wait_s: u32,
    pub service_start_s: u32,
    pub service_end_s: u32,
    pub window: TimeWindow,
    pub eta_iso: String,
    pub service_start_iso: String,
    pub service_end_iso: String,
}

/// One vehicle's ordered visits plus the time decomposition
/// `duration = travel + service + waiting`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub vehicle_idx: u32,
    pub travel_time_s: u32,
    pub service_time_s: u32,
    pub waiting_time_s: u32,
    pub duration_s: u32,
    pub distance_m: f64,
    pub stops: Vec<RouteStop>,
}

impl Route {
    pub fn stop_count(&self) -> usize {
        // Depot bookends the route on both sides.
        self.stops.len().saturating_sub(2)
    }
}

/// The durable output of one optimize attempt. Append-only, except that
/// resequencing may replace a single route's stops under an explicit apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub dataset_id: u64,
    pub depot: LatLon,
    pub num_vehicles: u32,
    /// Vehicle operating window, seconds since midnight.
    pub workday: TimeWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infeasibility_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub eta_source: EtaSource,
    /// Longest route duration across all vehicles.
    pub makespan_s: u32,
    pub unserved_stop_ids: Vec<StopId>,
    pub routes: Vec<Route>,
    pub created_at_ms: u64,
}

impl Plan {
    pub fn feasible(&self) -> bool {
        self.status != PlanStatus::Infeasible
    }

    pub fn route(&self, route_id: &RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| &r.id == route_id)
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
