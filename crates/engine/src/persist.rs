// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Converts a solver result into durable plan rows.
//!
//! Each route's duration decomposes as travel + service + waiting, where
//! waiting is the slack absorbed by arriving before a window opens. The same
//! computation serves the resequencer, so both paths agree on the numbers.

use crate::error::UnitError;
use rp_core::{
    seconds_to_hhmm, EtaSource, LatLon, OptimizationArtifact, OptimizePayload, Plan, PlanId,
    PlanStatus, Route, RouteId, RouteStop, StopId, TimeWindow,
};
use rp_solver::SolverResult;
use rp_storage::PlanStore;
use serde_json::json;
use std::sync::Arc;

/// A stored plan plus the partial result merged into the job.
#[derive(Debug, Clone)]
pub struct PersistedPlan {
    pub plan: Plan,
    pub partial: rp_core::ResultRef,
}

pub struct PlanPersister {
    plans: Arc<dyn PlanStore>,
}

/// Remediation hints per infeasibility category.
pub fn suggestions_for(reason: &str) -> Vec<String> {
    let hints: &[&str] = match reason {
        "capacity exceeded" => &[
            "add vehicles",
            "increase vehicle capacity",
            "reduce stops or demands",
        ],
        "time window conflict" => &["relax stop time windows", "extend workday", "add vehicles"],
        _ => &["add vehicles", "relax time windows", "reduce stops"],
    };
    hints.iter().map(|s| s.to_string()).collect()
}

/// Timeline for one ordered node sequence, tolerant of window overruns
/// (used for live-traffic refreshes where lateness is reported, not fatal).
pub(crate) struct Timeline {
    pub arrivals: Vec<u32>,
    pub waits: Vec<u32>,
    pub travel_s: u32,
    pub service_s: u32,
}

pub(crate) fn replay_timeline(
    seq: &[usize],
    leg_durations: &[u32],
    artifact_windows: &[TimeWindow],
    service_times_s: &[u32],
    workday_start: u32,
) -> Timeline {
    let mut arrivals = Vec::with_capacity(seq.len());
    let mut waits = Vec::with_capacity(seq.len());
    let mut travel_s = 0;
    let mut service_s = 0;

    let mut clock = workday_start.max(artifact_windows[seq[0]].start_s);
    arrivals.push(clock);
    waits.push(0);

    for (leg_idx, pair) in seq.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        let service = service_times_s[from];
        let travel = leg_durations[leg_idx];
        let raw = clock + service + travel;
        let arrival = raw.max(artifact_windows[to].start_s);

        travel_s += travel;
        service_s += service;
        waits.push(arrival - raw);
        arrivals.push(arrival);
        clock = arrival;
    }

    Timeline {
        arrivals,
        waits,
        travel_s,
        service_s,
    }
}

/// ISO timestamp for a seconds-since-midnight instant on the plan's date.
pub(crate) fn seconds_to_iso(now_ms: u64, seconds: u32) -> String {
    let date = chrono::DateTime::from_timestamp_millis(now_ms as i64)
        .map(|dt| dt.date_naive())
        .unwrap_or_default();
    let base = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    (base + chrono::Duration::seconds(seconds as i64))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

impl PlanPersister {
    pub fn new(plans: Arc<dyn PlanStore>) -> Self {
        Self { plans }
    }

    /// Persist an infeasible outcome as a first-class plan.
    pub fn persist_infeasible(
        &self,
        artifact: &OptimizationArtifact,
        payload: &OptimizePayload,
        workday: TimeWindow,
        reason: &str,
        eta_source: EtaSource,
        now_ms: u64,
    ) -> PersistedPlan {
        let suggestions = suggestions_for(reason);
        let plan = Plan {
            id: PlanId::new(),
            dataset_id: artifact.dataset_id,
            depot: LatLon::new(payload.depot_lat, payload.depot_lon),
            num_vehicles: payload.num_vehicles,
            workday,
            capacity: payload.capacity,
            status: PlanStatus::Infeasible,
            objective: None,
            infeasibility_reason: Some(reason.to_string()),
            suggestions: suggestions.clone(),
            eta_source,
            makespan_s: 0,
            unserved_stop_ids: Vec::new(),
            routes: Vec::new(),
            created_at_ms: now_ms,
        };
        let plan_id = self.plans.insert(plan.clone());

        let mut partial = rp_core::ResultRef::new();
        partial.insert(
            "optimize",
            json!({
                "plan_id": plan_id,
                "feasible": false,
                "status": "INFEASIBLE",
                "infeasibility_reason": reason,
                "suggestions": suggestions,
                "eta_source": eta_source.to_string(),
            }),
        );
        partial.insert("plan_id", json!(plan_id));
        PersistedPlan { plan, partial }
    }

    /// Persist a feasible solve. `traffic_legs`, when present, carries one
    /// refreshed duration per leg per route (live traffic override).
    pub fn persist(
        &self,
        artifact: &OptimizationArtifact,
        result: &SolverResult,
        payload: &OptimizePayload,
        workday: TimeWindow,
        eta_source: EtaSource,
        traffic_legs: Option<&[Vec<u32>]>,
        now_ms: u64,
    ) -> Result<PersistedPlan, UnitError> {
        let mut routes = Vec::with_capacity(result.routes.len());
        let mut route_summaries = Vec::with_capacity(result.routes.len());

        for (vehicle_idx, seq) in result.routes.iter().enumerate() {
            let leg_durations: Vec<u32> = match traffic_legs.and_then(|legs| legs.get(vehicle_idx))
            {
                Some(override_legs) if override_legs.len() + 1 == seq.len() => {
                    override_legs.clone()
                }
                _ => seq
                    .windows(2)
                    .map(|pair| artifact.duration_matrix_s[pair[0]][pair[1]])
                    .collect(),
            };
            let timeline = replay_timeline(
                seq,
                &leg_durations,
                &artifact.time_windows,
                &artifact.service_times_s,
                workday.start_s,
            );

            let distance_m: f64 = seq
                .windows(2)
                .map(|pair| artifact.distance_matrix_m[pair[0]][pair[1]])
                .sum();
            let waiting_time_s = timeline.waits.iter().sum::<u32>();
            let duration_s = timeline.travel_s + timeline.service_s + waiting_time_s;

            let stops = seq
                .iter()
                .enumerate()
                .map(|(position, &node)| {
                    let arrival = timeline.arrivals[position];
                    let service_end = arrival + artifact.service_times_s[node];
                    RouteStop {
                        sequence_idx: position as u32,
                        stop_id: artifact.nodes[node].stop_id.clone(),
                        arrival_s: arrival,
                        wait_s: timeline.waits[position],
                        service_start_s: arrival,
                        service_end_s: service_end,
                        window: artifact.time_windows[node],
                        eta_iso: seconds_to_iso(now_ms, arrival),
                        service_start_iso: seconds_to_iso(now_ms, arrival),
                        service_end_iso: seconds_to_iso(now_ms, service_end),
                    }
                })
                .collect::<Vec<_>>();

            let route = Route {
                id: RouteId::new(),
                vehicle_idx: vehicle_idx as u32,
                travel_time_s: timeline.travel_s,
                service_time_s: timeline.service_s,
                waiting_time_s,
                duration_s,
                distance_m,
                stops,
            };
            route_summaries.push(json!({
                "vehicle_idx": vehicle_idx,
                "total_distance_m": (distance_m * 100.0).round() / 100.0,
                "total_duration_s": duration_s,
                "stop_count": route.stop_count(),
            }));
            routes.push(route);
        }

        let unserved_stop_ids: Vec<StopId> = result
            .unserved
            .iter()
            .filter_map(|&node| artifact.nodes.get(node)?.stop_id.clone())
            .collect();
        let status = if unserved_stop_ids.is_empty() {
            PlanStatus::Success
        } else {
            PlanStatus::Partial
        };
        let makespan_s = routes.iter().map(|r| r.duration_s).max().unwrap_or(0);

        let plan = Plan {
            id: PlanId::new(),
            dataset_id: artifact.dataset_id,
            depot: LatLon::new(payload.depot_lat, payload.depot_lon),
            num_vehicles: payload.num_vehicles,
            workday,
            capacity: payload.capacity,
            status,
            objective: Some(result.objective),
            infeasibility_reason: None,
            suggestions: Vec::new(),
            eta_source,
            makespan_s,
            unserved_stop_ids: unserved_stop_ids.clone(),
            routes,
            created_at_ms: now_ms,
        };
        let plan_id = self.plans.insert(plan.clone());

        tracing::info!(
            plan_id = %plan_id,
            dataset_id = artifact.dataset_id,
            status = %status,
            makespan = %seconds_to_hhmm(workday.start_s + makespan_s),
            unserved = unserved_stop_ids.len(),
            "plan persisted"
        );

        let mut partial = rp_core::ResultRef::new();
        partial.insert(
            "optimize",
            json!({
                "plan_id": plan_id,
                "feasible": true,
                "status": status.to_string(),
                "objective_value": result.objective,
                "eta_source": eta_source.to_string(),
                "route_summary": route_summaries,
                "unserved_stop_ids": unserved_stop_ids,
            }),
        );
        partial.insert("plan_id", json!(plan_id));
        Ok(PersistedPlan { plan, partial })
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
