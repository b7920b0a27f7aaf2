// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rp_core::TimeWindow;
use std::time::Duration;
use yare::parameterized;

const H: u32 = 3600;
const WORKDAY: TimeWindow = TimeWindow {
    start_s: 8 * H,
    end_s: 18 * H,
};

/// Symmetric matrix where travel between any two distinct nodes is `leg`.
fn uniform_matrix(n: usize, leg: u32) -> Vec<Vec<u32>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 0 } else { leg }).collect())
        .collect()
}

struct Instance {
    matrix: Vec<Vec<u32>>,
    windows: Vec<TimeWindow>,
    service: Vec<u32>,
    demands: Vec<u32>,
}

impl Instance {
    fn uniform(n: usize, leg: u32) -> Self {
        Self {
            matrix: uniform_matrix(n, leg),
            windows: vec![WORKDAY; n],
            service: vec![0; n],
            demands: vec![0; n],
        }
    }

    fn request(&self, num_vehicles: u32, capacity: Option<u32>) -> SolveRequest<'_> {
        SolveRequest {
            duration_matrix: &self.matrix,
            time_windows: &self.windows,
            service_times_s: &self.service,
            num_vehicles,
            depot: 0,
            workday: WORKDAY,
            demands: capacity.is_some().then_some(&self.demands[..]),
            capacity,
            time_limit: Duration::from_millis(200),
            allow_drop_visits: false,
            seed: Some(7),
        }
    }
}

#[test]
fn serves_all_stops_when_unconstrained() {
    let instance = Instance::uniform(5, 600);
    let result = solve(&instance.request(2, None)).unwrap();

    assert!(result.feasible);
    assert!(result.unserved.is_empty());
    assert_eq!(result.served_count(), 4);
    // Every route starts and ends at the depot.
    for route in &result.routes {
        assert_eq!(*route.first().unwrap(), 0);
        assert_eq!(*route.last().unwrap(), 0);
    }
    // Arrivals align with routes.
    for (route, arrivals) in result.routes.iter().zip(&result.arrivals) {
        assert_eq!(route.len(), arrivals.len());
        assert!(arrivals.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn capacity_overflow_short_circuits_without_search() {
    let mut instance = Instance::uniform(4, 600);
    instance.demands = vec![0, 2, 2, 2];
    let result = solve(&instance.request(1, Some(3))).unwrap();

    assert!(!result.feasible);
    assert_eq!(result.reason.as_deref(), Some("capacity exceeded"));
    assert_eq!(result.stats.restarts, 0, "search must not run");
    assert!(result.routes.is_empty());
}

#[test]
fn capacity_drops_excess_stops_when_allowed() {
    // 3 stops of demand 1, one vehicle of capacity 2.
    let mut instance = Instance::uniform(4, 600);
    instance.demands = vec![0, 1, 1, 1];
    let mut request = instance.request(1, Some(2));
    request.allow_drop_visits = true;
    let result = solve(&request).unwrap();

    assert!(result.feasible);
    assert_eq!(result.unserved.len(), 1, "exactly one stop dropped");
    assert_eq!(result.served_count(), 2);
    // Dropped stop charged the fixed penalty.
    assert!(result.objective >= DROP_PENALTY);
}

#[test]
fn windows_outside_workday_are_infeasible_without_drops() {
    let mut instance = Instance::uniform(3, 600);
    // Both stops open only before the workday starts.
    instance.windows[1] = TimeWindow::new(5 * H, 6 * H);
    instance.windows[2] = TimeWindow::new(4 * H, 5 * H - 600);
    let result = solve(&instance.request(1, None)).unwrap();

    assert!(!result.feasible);
    assert_eq!(result.reason.as_deref(), Some("time window conflict"));
}

#[test]
fn windows_outside_workday_are_dropped_when_allowed() {
    let mut instance = Instance::uniform(3, 600);
    instance.windows[1] = TimeWindow::new(5 * H, 6 * H);
    let mut request = instance.request(1, None);
    request.allow_drop_visits = true;
    let result = solve(&request).unwrap();

    assert!(result.feasible);
    assert_eq!(result.unserved, vec![1]);
    assert_eq!(result.served_count(), 1);
}

#[test]
fn tight_windows_force_sequencing() {
    // Stop 2 opens late, stop 1 closes early: only 1-then-2 works.
    let mut instance = Instance::uniform(3, 600);
    instance.windows[1] = TimeWindow::new(8 * H, 9 * H);
    instance.windows[2] = TimeWindow::new(10 * H, 18 * H);
    let result = solve(&instance.request(1, None)).unwrap();

    assert!(result.feasible);
    let route = result
        .routes
        .iter()
        .find(|route| route.len() > 2)
        .unwrap();
    assert_eq!(route[1], 1);
    assert_eq!(route[2], 2);
    // Arrival at stop 2 waits for its 10:00 open.
    let arrivals = &result.arrivals[result
        .routes
        .iter()
        .position(|r| r.len() > 2)
        .unwrap()];
    assert_eq!(arrivals[2], 10 * H);
}

#[test]
fn respects_vehicle_count() {
    let instance = Instance::uniform(7, 600);
    let result = solve(&instance.request(3, None)).unwrap();
    assert!(result.feasible);
    assert_eq!(result.routes.len(), 3);
    assert_eq!(result.served_count(), 6);
}

#[parameterized(
    before_workday = { 5 * H, 6 * H, true },
    after_workday = { 19 * H, 20 * H, true },
    overlapping_start = { 7 * H, 9 * H, false },
    inside = { 10 * H, 11 * H, false },
)]
fn unservable_window_detection(start: u32, end: u32, unservable: bool) {
    let mut instance = Instance::uniform(2, 600);
    instance.windows[1] = TimeWindow::new(start, end);
    let request = instance.request(1, None);
    let expected: Vec<usize> = if unservable { vec![1] } else { vec![] };
    assert_eq!(request.unservable_nodes(), expected);
}

#[test]
fn single_node_instance_is_trivially_feasible() {
    let instance = Instance::uniform(1, 0);
    let result = solve(&instance.request(1, None)).unwrap();
    assert!(result.feasible);
    assert!(result.unserved.is_empty());
    assert_eq!(result.served_count(), 0);
}

#[test]
fn malformed_instance_is_rejected() {
    let instance = Instance::uniform(3, 600);
    let mut request = instance.request(1, None);
    let short_windows = vec![WORKDAY; 2];
    request.time_windows = &short_windows;
    assert!(matches!(solve(&request), Err(SolveError::BadShape(_))));
}

#[test]
fn repeated_runs_preserve_feasibility() {
    let mut instance = Instance::uniform(6, 900);
    instance.windows[3] = TimeWindow::new(9 * H, 12 * H);
    instance.service = vec![0, 300, 300, 300, 300, 300];
    for seed in 0..5 {
        let mut request = instance.request(2, None);
        request.seed = Some(seed);
        let result = solve(&request).unwrap();
        assert!(result.feasible, "seed {seed}");
        assert!(result.unserved.is_empty(), "seed {seed}");
    }
}

#[test]
fn improvement_search_beats_or_matches_worst_construction() {
    // Asymmetric-ish instance: near/far stops; relocate should converge to a
    // total cost no worse than serving stops in input order.
    let matrix = vec![
        vec![0, 300, 2400, 300],
        vec![300, 0, 2400, 500],
        vec![2400, 2400, 0, 2400],
        vec![300, 500, 2400, 0],
    ];
    let instance = Instance {
        matrix,
        windows: vec![WORKDAY; 4],
        service: vec![0; 4],
        demands: vec![0; 4],
    };
    let result = solve(&instance.request(1, None)).unwrap();
    assert!(result.feasible);

    // Naive order 1,2,3: 300 + 2400 + 2400 + 300 = 5400.
    assert!(result.objective <= 5400, "objective {}", result.objective);
}
