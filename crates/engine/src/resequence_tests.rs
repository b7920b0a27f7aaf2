// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::collab::MemoryDatasets;
use crate::persist::PlanPersister;
use rp_core::{FakeClock, NullProgress, OptimizePayload, StopBuilder};
use rp_eta::{
    EtaCascade, FixedFactorTraffic, HaversineProvider, MatrixBuilder, MatrixRequest, MemoryCache,
    ModelRegistry, RetryPolicy, RetryingProvider, TokenBucket, UpliftService,
};
use rp_storage::MemoryPlanStore;
use std::time::Duration;

const H: u32 = 3600;

struct Fixture {
    plans: Arc<MemoryPlanStore>,
    datasets: Arc<MemoryDatasets>,
    cascade: Arc<EtaCascade>,
    plan: Plan,
    route_id: RouteId,
    stop_ids: Vec<StopId>,
}

fn cascade() -> Arc<EtaCascade> {
    Arc::new(EtaCascade::new(
        MemoryCache::new(),
        RetryingProvider::new(
            Arc::new(HaversineProvider::new()),
            TokenBucket::new(10_000, 1_000_000.0),
            RetryPolicy::default(),
        ),
        Arc::new(ModelRegistry::new(None)),
        Arc::new(UpliftService::disabled()),
        Duration::from_secs(3600),
    ))
}

/// Build a real plan by running matrix build + solve + persist over three
/// stops, so resequencing operates on representative rows.
fn fixture(windowed: bool) -> Fixture {
    let datasets = MemoryDatasets::new();
    let mut stops = vec![
        StopBuilder::default().stop_ref("A").lat(Some(1.31)).lon(Some(103.81)).build(),
        StopBuilder::default().stop_ref("B").lat(Some(1.33)).lon(Some(103.83)).build(),
        StopBuilder::default().stop_ref("C").lat(Some(1.35)).lon(Some(103.85)).build(),
    ];
    if windowed {
        // Stop A only accepts early arrivals; visiting it late violates.
        stops[0].tw_start = Some("08:00".to_string());
        stops[0].tw_end = Some("08:15".to_string());
    }
    let stop_ids: Vec<StopId> = stops.iter().map(|s| s.id.clone()).collect();
    datasets.put_dataset(7, stops.clone());

    let cascade = cascade();
    let builder = MatrixBuilder::new(Arc::clone(&cascade));
    let payload = OptimizePayload::builder().dataset_id(7).num_vehicles(1).build();
    let workday = payload.workday_window().unwrap();
    let artifact = builder
        .build(
            &MatrixRequest {
                dataset_id: 7,
                depot: payload.depot(),
                stops,
                workday,
                depart_bucket: "08:00".to_string(),
                day_of_week: 0,
            },
            &NullProgress,
        )
        .unwrap();

    let result = rp_solver::solve(&rp_solver::SolveRequest {
        duration_matrix: &artifact.duration_matrix_s,
        time_windows: &artifact.time_windows,
        service_times_s: &artifact.service_times_s,
        num_vehicles: 1,
        depot: 0,
        workday,
        demands: None,
        capacity: None,
        time_limit: Duration::from_millis(100),
        allow_drop_visits: false,
        seed: Some(3),
    })
    .unwrap();
    assert!(result.feasible);

    let plans = MemoryPlanStore::new();
    let persisted = PlanPersister::new(plans.clone())
        .persist(
            &artifact,
            &result,
            &payload,
            workday,
            rp_core::EtaSource::Onemap,
            None,
            1_000_000,
        )
        .unwrap();
    let route_id = persisted.plan.routes[0].id.clone();

    Fixture {
        plans,
        datasets,
        cascade,
        plan: persisted.plan,
        route_id,
        stop_ids,
    }
}

fn resequencer(fixture: &Fixture, traffic_factor: Option<f64>) -> Resequencer<FakeClock> {
    let traffic: Arc<dyn rp_eta::LiveTrafficProvider> = match traffic_factor {
        Some(factor) => Arc::new(FixedFactorTraffic::new(factor)),
        None => Arc::new(rp_eta::DisabledTraffic),
    };
    Resequencer::new(
        fixture.plans.clone(),
        fixture.datasets.clone(),
        Arc::clone(&fixture.cascade),
        traffic,
        FakeClock::new(),
    )
}

fn served_order(fixture: &Fixture) -> Vec<StopId> {
    fixture
        .plans
        .get(&fixture.plan.id)
        .unwrap()
        .route(&fixture.route_id)
        .unwrap()
        .stops
        .iter()
        .filter_map(|s| s.stop_id.clone())
        .collect()
}

#[test]
fn preview_reports_without_mutating() {
    let fixture = fixture(false);
    let before = served_order(&fixture);
    let mut reversed = before.clone();
    reversed.reverse();

    let outcome = resequencer(&fixture, None)
        .resequence(&ResequenceRequest {
            plan_id: fixture.plan.id.clone(),
            route_id: fixture.route_id.clone(),
            ordered_stop_ids: reversed.clone(),
            apply: false,
            use_live_traffic: false,
        })
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(
        outcome.totals.duration_s,
        outcome.totals.travel_time_s + outcome.totals.service_time_s + outcome.totals.waiting_time_s
    );
    // The stored route is untouched.
    assert_eq!(served_order(&fixture), before);
}

#[test]
fn apply_replaces_route_and_recomputes_makespan() {
    let fixture = fixture(false);
    let mut reversed = served_order(&fixture);
    reversed.reverse();

    let outcome = resequencer(&fixture, None)
        .resequence(&ResequenceRequest {
            plan_id: fixture.plan.id.clone(),
            route_id: fixture.route_id.clone(),
            ordered_stop_ids: reversed.clone(),
            apply: true,
            use_live_traffic: false,
        })
        .unwrap();

    assert!(outcome.applied);
    assert_eq!(served_order(&fixture), reversed);
    let plan = fixture.plans.get(&fixture.plan.id).unwrap();
    assert_eq!(plan.makespan_s, outcome.projected_makespan_s);
    assert_eq!(plan.route(&fixture.route_id).unwrap().duration_s, outcome.totals.duration_s);
}

#[test]
fn non_permutation_is_rejected() {
    let fixture = fixture(false);
    let err = resequencer(&fixture, None)
        .resequence(&ResequenceRequest {
            plan_id: fixture.plan.id.clone(),
            route_id: fixture.route_id.clone(),
            ordered_stop_ids: vec![fixture.stop_ids[0].clone()],
            apply: false,
            use_live_traffic: false,
        })
        .unwrap_err();
    assert!(matches!(err, ResequenceError::InvalidOrder(_)));
}

#[test]
fn late_visit_reports_time_window_violation() {
    let fixture = fixture(true);
    // Force the windowed stop (A) to be served last.
    let mut order = served_order(&fixture);
    let a_position = order
        .iter()
        .position(|id| id == &fixture.stop_ids[0])
        .unwrap();
    let a = order.remove(a_position);
    order.push(a);

    let outcome = resequencer(&fixture, None)
        .resequence(&ResequenceRequest {
            plan_id: fixture.plan.id.clone(),
            route_id: fixture.route_id.clone(),
            ordered_stop_ids: order,
            apply: false,
            use_live_traffic: false,
        })
        .unwrap();

    assert!(outcome
        .violations
        .iter()
        .any(|v| v.kind == ViolationKind::TimeWindow && v.stop_id == Some(fixture.stop_ids[0].clone())));
}

#[test]
fn live_traffic_tags_source_with_fallback_to_cascade() {
    let fixture = fixture(false);
    let order = served_order(&fixture);

    let with_traffic = resequencer(&fixture, Some(1.4))
        .resequence(&ResequenceRequest {
            plan_id: fixture.plan.id.clone(),
            route_id: fixture.route_id.clone(),
            ordered_stop_ids: order.clone(),
            apply: false,
            use_live_traffic: true,
        })
        .unwrap();
    assert_eq!(with_traffic.eta_source, rp_core::EtaSource::GoogleTraffic);

    // Disabled provider: request live traffic, get the cascade's source.
    let without = resequencer(&fixture, None)
        .resequence(&ResequenceRequest {
            plan_id: fixture.plan.id.clone(),
            route_id: fixture.route_id.clone(),
            ordered_stop_ids: order,
            apply: false,
            use_live_traffic: true,
        })
        .unwrap();
    assert_eq!(without.eta_source, rp_core::EtaSource::Onemap);
}
