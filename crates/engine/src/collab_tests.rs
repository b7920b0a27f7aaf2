// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rp_core::{NullProgress, StopBuilder};
use rp_storage::MemoryObjectStore;

#[test]
fn geocode_marks_statuses_and_counts() {
    let datasets = MemoryDatasets::new();
    let mut stops = rp_core::test_support::grid_stops(2);
    stops.push(StopBuilder::default().lat(None).lon(None).build());
    datasets.put_dataset(1, stops);

    let summary = datasets.geocode(1, &NullProgress).unwrap();
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.failed_count, 1);

    let stops = datasets.stops(1).unwrap();
    assert_eq!(
        stops.iter().filter(|s| s.geocode_status == GeocodeStatus::Success).count(),
        2
    );
    assert_eq!(
        stops.iter().filter(|s| s.geocode_status == GeocodeStatus::Failed).count(),
        1
    );
    assert_eq!(datasets.geocode_calls(), 1);
}

#[test]
fn missing_dataset_is_a_validation_failure() {
    let datasets = MemoryDatasets::new();
    let err = datasets.geocode(99, &NullProgress).unwrap_err();
    assert_eq!(err.code, rp_core::ErrorCode::ValidationError);
    assert!(datasets.stops(99).is_err());
}

#[test]
fn exporter_writes_maps_and_driver_pack() {
    let objects = MemoryObjectStore::new();
    let exporter = ObjectStoreExporter::new(objects.clone());

    // Minimal plan with one route.
    let plan = sample_plan();
    let partial = exporter.export(&plan, &NullProgress).unwrap();

    let maps = partial.get("maps").unwrap().as_array().unwrap().clone();
    assert_eq!(maps.len(), 1);
    let map_path = maps[0]["object_path"].as_str().unwrap();
    assert!(objects.get(map_path).is_some());

    let pack_path = partial.get("driver_pack").unwrap()["object_path"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(pack_path.starts_with("driver_packs/"));
    assert!(objects.get(&pack_path).is_some());
}

fn sample_plan() -> Plan {
    use rp_core::{EtaSource, LatLon, PlanId, PlanStatus, Route, RouteId, TimeWindow};
    Plan {
        id: PlanId::new(),
        dataset_id: 1,
        depot: LatLon::new(1.3, 103.8),
        num_vehicles: 1,
        workday: TimeWindow::new(8 * 3600, 18 * 3600),
        capacity: None,
        status: PlanStatus::Success,
        objective: Some(100),
        infeasibility_reason: None,
        suggestions: vec![],
        eta_source: EtaSource::Onemap,
        makespan_s: 600,
        unserved_stop_ids: vec![],
        routes: vec![Route {
            id: RouteId::new(),
            vehicle_idx: 0,
            travel_time_s: 600,
            service_time_s: 0,
            waiting_time_s: 0,
            duration_s: 600,
            distance_m: 5000.0,
            stops: vec![],
        }],
        created_at_ms: 0,
    }
}
