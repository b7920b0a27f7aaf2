// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive route resequencing.
//!
//! Takes an explicit stop order for one route, recomputes the timing
//! decomposition (optionally against live traffic), and reports window,
//! capacity, and workday violations. Nothing is written unless the caller
//! sets `apply`; on apply the route's stops are replaced atomically and the
//! plan makespan recomputed.

use crate::collab::StopSource;
use crate::error::UnitError;
use crate::persist::{replay_timeline, seconds_to_iso};
use rp_core::{
    Clock, EtaSource, LatLon, Plan, PlanId, RouteId, RouteStop, Stop, StopId, TimeWindow,
};
use rp_eta::{EtaCascade, LiveTrafficProvider};
use rp_storage::{PlanStore, PlanStoreError, RouteTotals};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResequenceError {
    #[error(transparent)]
    Plan(#[from] PlanStoreError),
    #[error("invalid stop order: {0}")]
    InvalidOrder(String),
    #[error(transparent)]
    Unit(#[from] UnitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    TimeWindow,
    Capacity,
    Workday,
}

rp_core::simple_display! {
    ViolationKind {
        TimeWindow => "time_window",
        Capacity => "capacity",
        Workday => "workday",
    }
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub kind: ViolationKind,
    pub stop_id: Option<StopId>,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct ResequenceRequest {
    pub plan_id: PlanId,
    pub route_id: RouteId,
    pub ordered_stop_ids: Vec<StopId>,
    pub apply: bool,
    pub use_live_traffic: bool,
}

/// Preview (or applied result) of one resequencing.
#[derive(Debug, Clone)]
pub struct ResequenceOutcome {
    pub stops: Vec<RouteStop>,
    pub totals: RouteTotals,
    pub violations: Vec<Violation>,
    pub eta_source: EtaSource,
    /// Plan makespan as it would be after applying.
    pub projected_makespan_s: u32,
    pub applied: bool,
}

pub struct Resequencer<C: Clock> {
    plans: Arc<dyn PlanStore>,
    stop_source: Arc<dyn StopSource>,
    cascade: Arc<EtaCascade>,
    traffic: Arc<dyn LiveTrafficProvider>,
    clock: C,
}

impl<C: Clock> Resequencer<C> {
    pub fn new(
        plans: Arc<dyn PlanStore>,
        stop_source: Arc<dyn StopSource>,
        cascade: Arc<EtaCascade>,
        traffic: Arc<dyn LiveTrafficProvider>,
        clock: C,
    ) -> Self {
        Self {
            plans,
            stop_source,
            cascade,
            traffic,
            clock,
        }
    }

    pub fn resequence(
        &self,
        request: &ResequenceRequest,
    ) -> Result<ResequenceOutcome, ResequenceError> {
        let plan = self.plans.get(&request.plan_id)?;
        let route = plan
            .route(&request.route_id)
            .ok_or_else(|| PlanStoreError::RouteNotFound {
                plan_id: request.plan_id.clone(),
                route_id: request.route_id.clone(),
            })?;

        let mut current_ids: Vec<StopId> = route
            .stops
            .iter()
            .filter_map(|s| s.stop_id.clone())
            .collect();
        let mut requested = request.ordered_stop_ids.clone();
        current_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        requested.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        if current_ids != requested {
            return Err(ResequenceError::InvalidOrder(
                "ordered_stop_ids must be a permutation of the route's stops".to_string(),
            ));
        }

        let dataset_stops = self.stop_source.stops(plan.dataset_id)?;
        let ordered: Vec<Stop> = request
            .ordered_stop_ids
            .iter()
            .map(|id| {
                dataset_stops
                    .iter()
                    .find(|s| &s.id == id)
                    .cloned()
                    .ok_or_else(|| {
                        ResequenceError::InvalidOrder(format!("stop {id} not in dataset"))
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut waypoints = vec![plan.depot];
        for stop in &ordered {
            waypoints.push(stop.position().ok_or_else(|| {
                ResequenceError::InvalidOrder(format!("stop {} has no coordinates", stop.id))
            })?);
        }
        waypoints.push(plan.depot);

        let (leg_durations, leg_distances, eta_source) =
            self.leg_estimates(&waypoints, &plan, request.use_live_traffic)?;

        // Node-local attribute tables for the replay: 0 = depot bookend.
        let n = ordered.len() + 2;
        let mut windows = vec![plan.workday; n];
        let mut service = vec![0u32; n];
        for (idx, stop) in ordered.iter().enumerate() {
            windows[idx + 1] = stop.window().unwrap_or(plan.workday);
            service[idx + 1] = stop.service_time_min * 60;
        }
        let seq: Vec<usize> = (0..n).collect();
        let timeline = replay_timeline(&seq, &leg_durations, &windows, &service, plan.workday.start_s);

        let now_ms = self.clock.epoch_ms();
        let mut stops = Vec::with_capacity(n);
        for position in 0..n {
            let arrival = timeline.arrivals[position];
            let service_end = arrival + service[position];
            let stop_id = if position == 0 || position == n - 1 {
                None
            } else {
                Some(ordered[position - 1].id.clone())
            };
            stops.push(RouteStop {
                sequence_idx: position as u32,
                stop_id,
                arrival_s: arrival,
                wait_s: timeline.waits[position],
                service_start_s: arrival,
                service_end_s: service_end,
                window: windows[position],
                eta_iso: seconds_to_iso(now_ms, arrival),
                service_start_iso: seconds_to_iso(now_ms, arrival),
                service_end_iso: seconds_to_iso(now_ms, service_end),
            });
        }

        let violations = self.violations(&plan, &ordered, &stops, &windows);

        let waiting_time_s = timeline.waits.iter().sum::<u32>();
        let totals = RouteTotals {
            travel_time_s: timeline.travel_s,
            service_time_s: timeline.service_s,
            waiting_time_s,
            duration_s: timeline.travel_s + timeline.service_s + waiting_time_s,
            distance_m: leg_distances.iter().sum(),
        };

        let projected_makespan_s = plan
            .routes
            .iter()
            .map(|r| {
                if r.id == request.route_id {
                    totals.duration_s
                } else {
                    r.duration_s
                }
            })
            .max()
            .unwrap_or(totals.duration_s);

        let applied = if request.apply {
            self.plans.replace_route_stops(
                &request.plan_id,
                &request.route_id,
                stops.clone(),
                totals,
            )?;
            true
        } else {
            false
        };

        Ok(ResequenceOutcome {
            stops,
            totals,
            violations,
            eta_source,
            projected_makespan_s,
            applied,
        })
    }

    /// Per-leg durations/distances: live traffic when requested and enabled,
    /// with graceful fallback to the cascade.
    fn leg_estimates(
        &self,
        waypoints: &[LatLon],
        plan: &Plan,
        use_live_traffic: bool,
    ) -> Result<(Vec<u32>, Vec<f64>, EtaSource), ResequenceError> {
        let bucket = rp_core::seconds_to_hhmm(plan.workday.start_s);
        let session = self.cascade.session(&bucket, 0);

        let mut distances = Vec::with_capacity(waypoints.len() - 1);
        let mut cascade_durations = Vec::with_capacity(waypoints.len() - 1);
        for pair in waypoints.windows(2) {
            let eta = session
                .resolve(pair[0], pair[1])
                .map_err(|e| UnitError::routing(e.to_string()))?;
            distances.push(eta.distance_m);
            cascade_durations.push(eta.duration_s);
        }

        if use_live_traffic && self.traffic.enabled() {
            match self.traffic.segment_times(waypoints, plan.workday.start_s) {
                Ok(durations) if durations.len() == waypoints.len() - 1 => {
                    return Ok((durations, distances, EtaSource::GoogleTraffic));
                }
                Ok(_) => {
                    tracing::warn!("traffic legs mismatched waypoint count, using cascade");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "live traffic unavailable, using cascade");
                }
            }
        }
        Ok((
            cascade_durations,
            distances,
            EtaSource::from(session.strategy()),
        ))
    }

    fn violations(
        &self,
        plan: &Plan,
        ordered: &[Stop],
        stops: &[RouteStop],
        windows: &[TimeWindow],
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (position, stop_row) in stops.iter().enumerate() {
            // Depot bookends are covered by the workday check below.
            if stop_row.stop_id.is_none() {
                continue;
            }
            // Raw arrival (before window wait) must land within the window.
            let raw = stop_row.arrival_s - stop_row.wait_s;
            if raw > windows[position].end_s {
                violations.push(Violation {
                    kind: ViolationKind::TimeWindow,
                    stop_id: stop_row.stop_id.clone(),
                    detail: format!(
                        "arrival {} after window close {}",
                        rp_core::seconds_to_hhmm(raw),
                        rp_core::seconds_to_hhmm(windows[position].end_s)
                    ),
                });
            }
        }

        if let Some(last) = stops.last() {
            if last.arrival_s > plan.workday.end_s {
                violations.push(Violation {
                    kind: ViolationKind::Workday,
                    stop_id: None,
                    detail: format!(
                        "returns at {} after workday end {}",
                        rp_core::seconds_to_hhmm(last.arrival_s),
                        rp_core::seconds_to_hhmm(plan.workday.end_s)
                    ),
                });
            }
        }

        if let Some(capacity) = plan.capacity {
            let total_demand: u64 = ordered.iter().map(|s| s.demand as u64).sum();
            if total_demand > capacity as u64 {
                violations.push(Violation {
                    kind: ViolationKind::Capacity,
                    stop_id: None,
                    detail: format!("route demand {total_demand} exceeds capacity {capacity}"),
                });
            }
        }

        violations
    }
}

#[cfg(test)]
#[path = "resequence_tests.rs"]
mod tests;
