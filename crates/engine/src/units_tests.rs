// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runtime::hermetic_runtime;
use rp_core::{ErrorCode, FakeClock, NullProgress, OptimizePayload as Payload, Settings};
use rp_eta::{DisabledTraffic, FixedFactorTraffic, HaversineProvider};
use serde_json::json;

fn runtime_with_traffic(
    traffic: Arc<dyn rp_eta::LiveTrafficProvider>,
) -> (
    Arc<Runtime<FakeClock>>,
    Arc<crate::collab::MemoryDatasets>,
    tempfile::TempDir,
) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        feature_live_traffic: true,
        ..Settings::default()
    };
    let (rt, datasets, _queue) = hermetic_runtime(
        settings,
        dir.path(),
        Arc::new(HaversineProvider::new()),
        traffic,
        FakeClock::new(),
    );
    (rt, datasets, dir)
}

fn runtime() -> (
    Arc<Runtime<FakeClock>>,
    Arc<crate::collab::MemoryDatasets>,
    tempfile::TempDir,
) {
    runtime_with_traffic(Arc::new(DisabledTraffic))
}

fn built_result_ref(
    rt: &Runtime<FakeClock>,
    datasets: &crate::collab::MemoryDatasets,
    payload: &Payload,
) -> ResultRef {
    datasets.put_dataset(payload.dataset_id, rp_core::test_support::grid_stops(3));
    datasets.geocode(payload.dataset_id, &NullProgress).unwrap();
    run_build_matrix(rt, &JobId::new(), payload, &NullProgress).unwrap()
}

#[test]
fn build_matrix_persists_both_reference_forms() {
    let (rt, datasets, _dir) = runtime();
    let payload = Payload::builder().dataset_id(3).build();
    let partial = built_result_ref(&rt, &datasets, &payload);

    let file_path = partial.get("matrix_artifact_path").unwrap().as_str().unwrap();
    assert!(std::path::Path::new(file_path).exists());
    let object_path = partial.get("matrix_artifact_ref").unwrap()["object_path"]
        .as_str()
        .unwrap();
    assert!(rt.objects.get(object_path).is_some());
    assert_eq!(partial.get("matrix_strategy").unwrap(), "ONEMAP");
}

#[test]
fn optimize_without_any_artifact_reference_is_missing() {
    let (rt, _datasets, _dir) = runtime();
    let payload = Payload::builder().build();
    let err = run_optimize(&rt, &payload, &ResultRef::new(), &NullProgress).unwrap_err();
    assert_eq!(err.code, ErrorCode::MatrixArtifactMissing);
}

#[test]
fn optimize_with_corrupt_artifact_is_unreadable() {
    let (rt, _datasets, _dir) = runtime();
    rt.objects
        .put("matrix/bad.json", b"{ nope".to_vec(), "application/json");
    let mut result_ref = ResultRef::new();
    result_ref.insert("matrix_artifact_ref", json!({"object_path": "matrix/bad.json"}));

    let payload = Payload::builder().build();
    let err = run_optimize(&rt, &payload, &result_ref, &NullProgress).unwrap_err();
    assert_eq!(err.code, ErrorCode::MatrixArtifactLoadFailed);
}

#[test]
fn optimize_prefers_object_ref_and_falls_back_to_file() {
    let (rt, datasets, _dir) = runtime();
    let payload = Payload::builder().dataset_id(3).build();
    let mut partial = built_result_ref(&rt, &datasets, &payload);

    // Point the object ref at a missing blob; the file path still resolves.
    partial.insert("matrix_artifact_ref", json!({"object_path": "matrix/gone.json"}));
    let out = run_optimize(&rt, &payload, &partial, &NullProgress).unwrap();
    assert_eq!(out.get("optimize").unwrap()["feasible"], true);
}

#[test]
fn optimize_solves_and_persists_plan() {
    let (rt, datasets, _dir) = runtime();
    let payload = Payload::builder().dataset_id(3).build();
    let partial = built_result_ref(&rt, &datasets, &payload);

    let out = run_optimize(&rt, &payload, &partial, &NullProgress).unwrap();
    let optimize = out.get("optimize").unwrap();
    assert_eq!(optimize["feasible"], true);
    assert_eq!(optimize["status"], "SUCCESS");
    assert_eq!(optimize["eta_source"], "onemap");
    let plan_id = out.get("plan_id").unwrap().as_str().unwrap();
    assert!(rt.plans.get(&rp_core::PlanId::from_string(plan_id)).is_ok());
}

#[test]
fn optimize_with_live_traffic_tags_source() {
    let (rt, datasets, _dir) = runtime_with_traffic(Arc::new(FixedFactorTraffic::new(1.3)));
    let payload = Payload::builder().dataset_id(3).use_live_traffic(true).build();
    let partial = built_result_ref(&rt, &datasets, &payload);

    let out = run_optimize(&rt, &payload, &partial, &NullProgress).unwrap();
    assert_eq!(out.get("optimize").unwrap()["eta_source"], "google_traffic");
}

#[test]
fn generate_exports_skips_infeasible_plans() {
    let (rt, _datasets, _dir) = runtime();
    let mut result_ref = ResultRef::new();
    result_ref.insert("optimize", json!({"feasible": false, "plan_id": "pln-x"}));

    let out = run_generate_exports(&rt, &result_ref, &NullProgress).unwrap();
    assert_eq!(out.get("exports_skipped").unwrap(), true);
    assert_eq!(out.get("reason").unwrap(), "plan_infeasible");
}

#[test]
fn generate_exports_without_plan_id_is_not_ready() {
    let (rt, _datasets, _dir) = runtime();
    let err = run_generate_exports(&rt, &ResultRef::new(), &NullProgress).unwrap_err();
    assert_eq!(err.code, ErrorCode::PlanNotReady);
}

#[test]
fn geocode_unit_reports_summary() {
    let (rt, datasets, _dir) = runtime();
    datasets.put_dataset(9, rp_core::test_support::grid_stops(2));
    let payload = Payload::builder().dataset_id(9).build();

    let partial = run_geocode(&rt, &payload, &NullProgress).unwrap();
    assert_eq!(partial.get("geocode").unwrap()["success_count"], 2);
    assert_eq!(partial.get("geocode").unwrap()["failed_count"], 0);
}
