// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::{harness, payload, DATASET};
use rp_core::{JobStatus, PlanStatus, StopBuilder};
use rp_storage::{JobStore, PlanStore};

#[test]
fn overloaded_vehicle_with_drops_yields_partial_plan() {
    let h = harness();
    // 3 stops of demand 1 against one vehicle of capacity 2.
    let stops = rp_core::test_support::grid_stops(3)
        .into_iter()
        .map(|mut stop| {
            stop.demand = 1;
            stop
        })
        .collect();
    h.seed(stops);
    h.submit(
        payload()
            .num_vehicles(1)
            .capacity(Some(2))
            .allow_drop_visits(true)
            .build(),
    );
    h.drain();

    let plan = h
        .dispatcher
        .runtime()
        .plans
        .latest_for_dataset(DATASET)
        .expect("plan");
    assert_eq!(plan.status, PlanStatus::Partial);
    assert_eq!(plan.unserved_stop_ids.len(), 1, "exactly one stop dropped");
    assert_eq!(
        plan.routes.iter().map(|r| r.stop_count()).sum::<usize>(),
        2
    );
}

#[test]
fn windows_outside_workday_yield_infeasible_plan_not_a_failed_job() {
    let h = harness();
    // Both stops only accept deliveries outside the 08:00-18:00 workday,
    // in windows that also do not overlap each other.
    h.seed(vec![
        StopBuilder::default()
            .stop_ref("N1")
            .tw_start("04:00")
            .tw_end("05:00")
            .build(),
        StopBuilder::default()
            .stop_ref("N2")
            .tw_start("19:00")
            .tw_end("20:00")
            .build(),
    ]);
    let job = h.submit(payload().num_vehicles(1).allow_drop_visits(false).build());
    h.drain();

    // The system did not break: the job completes and carries the outcome.
    let job_row = h.dispatcher.runtime().store.get(&job.id).expect("row");
    assert_eq!(job_row.status, JobStatus::Succeeded);
    assert!(job_row.error_code.is_none());
    let optimize = job_row.result_ref.get("optimize").expect("optimize");
    assert_eq!(optimize["feasible"], false);
    assert_eq!(optimize["infeasibility_reason"], "time window conflict");

    let plan = h
        .dispatcher
        .runtime()
        .plans
        .latest_for_dataset(DATASET)
        .expect("plan");
    assert_eq!(plan.status, PlanStatus::Infeasible);
    assert_eq!(
        plan.infeasibility_reason.as_deref(),
        Some("time window conflict")
    );
    assert!(!plan.suggestions.is_empty());

    // Exports are skipped for infeasible plans, with a recorded reason.
    assert_eq!(job_row.result_ref.get("exports_skipped").expect("key"), true);
    assert_eq!(job_row.result_ref.get("reason").expect("key"), "plan_infeasible");
}

#[test]
fn demand_over_fleet_capacity_short_circuits_to_infeasible() {
    let h = harness();
    let stops = rp_core::test_support::grid_stops(4)
        .into_iter()
        .map(|mut stop| {
            stop.demand = 5;
            stop
        })
        .collect();
    h.seed(stops);
    h.submit(
        payload()
            .num_vehicles(2)
            .capacity(Some(4))
            .allow_drop_visits(false)
            .build(),
    );
    h.drain();

    let plan = h
        .dispatcher
        .runtime()
        .plans
        .latest_for_dataset(DATASET)
        .expect("plan");
    assert_eq!(plan.status, PlanStatus::Infeasible);
    assert_eq!(plan.infeasibility_reason.as_deref(), Some("capacity exceeded"));
    assert!(plan
        .suggestions
        .iter()
        .any(|s| s == "increase vehicle capacity"));
}
