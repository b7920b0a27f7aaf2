// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route timing propagation.
//!
//! Arrival at each node is travel from the predecessor's service completion,
//! pushed forward to the window open (the slack is waiting time). A route is
//! feasible when every raw arrival lands on or before its window close and
//! the vehicle returns to the depot within the workday.

use rp_core::TimeWindow;

/// Node attributes shared by every timing evaluation of one instance.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleContext<'a> {
    pub duration_matrix: &'a [Vec<u32>],
    pub time_windows: &'a [TimeWindow],
    pub service_times_s: &'a [u32],
    pub workday: TimeWindow,
}

/// Feasible timing for one ordered node sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSchedule {
    /// Arrival seconds per sequence position.
    pub arrivals: Vec<u32>,
    /// Waiting seconds per sequence position (window-open slack).
    pub waits: Vec<u32>,
    /// Sum of leg travel seconds.
    pub travel_s: u32,
    /// Sum of service seconds over visited nodes.
    pub service_s: u32,
    /// Arc cost: travel plus the service component folded per leg.
    pub cost: i64,
}

impl RouteSchedule {
    pub fn wait_s(&self) -> u32 {
        self.waits.iter().sum()
    }

    /// Route duration from workday start to final arrival.
    pub fn duration_s(&self, workday_start: u32) -> u32 {
        self.arrivals
            .last()
            .map(|&end| end.saturating_sub(workday_start))
            .unwrap_or(0)
    }
}

/// Evaluate one sequence (depot bookends expected). Returns None when any
/// window or the workday close is violated.
pub fn evaluate_route(seq: &[usize], ctx: &ScheduleContext<'_>) -> Option<RouteSchedule> {
    if seq.len() < 2 {
        return None;
    }

    let mut arrivals = Vec::with_capacity(seq.len());
    let mut waits = Vec::with_capacity(seq.len());
    let mut travel_s: u32 = 0;
    let mut service_s: u32 = 0;
    let mut cost: i64 = 0;

    // The vehicle leaves the depot no earlier than the workday start.
    let mut clock = ctx.workday.start_s.max(ctx.time_windows[seq[0]].start_s);
    arrivals.push(clock);
    waits.push(0);

    for pair in seq.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let service = ctx.service_times_s[from];
        let travel = ctx.duration_matrix[from][to];
        let raw_arrival = clock + service + travel;

        let window = &ctx.time_windows[to];
        if raw_arrival > window.end_s {
            return None;
        }
        let arrival = raw_arrival.max(window.start_s);

        travel_s += travel;
        service_s += service;
        cost += (travel + service) as i64;
        waits.push(arrival - raw_arrival);
        arrivals.push(arrival);
        clock = arrival;
    }

    // Return to depot must close out within the workday.
    if arrivals.last().copied().unwrap_or(0) > ctx.workday.end_s {
        return None;
    }

    Some(RouteSchedule {
        arrivals,
        waits,
        travel_s,
        service_s,
        cost,
    })
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
