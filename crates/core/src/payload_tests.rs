// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::ErrorCode;

#[test]
fn default_builder_payload_is_valid() {
    let payload = OptimizePayload::builder().build();
    assert!(payload.validate().is_ok());
    let window = payload.workday_window().unwrap();
    assert_eq!(window.start_s, 8 * 3600);
    assert_eq!(window.end_s, 18 * 3600);
}

#[test]
fn zero_vehicles_rejected() {
    let payload = OptimizePayload::builder().num_vehicles(0).build();
    assert_eq!(payload.validate(), Err(PayloadError::NoVehicles));
    assert_eq!(PayloadError::NoVehicles.code(), ErrorCode::ValidationError);
}

#[test]
fn zero_capacity_rejected() {
    let payload = OptimizePayload::builder().capacity(Some(0)).build();
    assert_eq!(payload.validate(), Err(PayloadError::ZeroCapacity));
}

#[test]
fn inverted_workday_rejected() {
    let payload = OptimizePayload::builder()
        .workday_start("18:00")
        .workday_end("08:00")
        .build();
    assert!(matches!(
        payload.validate(),
        Err(PayloadError::BadWorkday(_))
    ));
}

#[test]
fn payload_deserializes_with_defaults() {
    let raw = r#"{
        "dataset_id": 7,
        "depot_lat": 1.3,
        "depot_lon": 103.8,
        "num_vehicles": 3,
        "workday_start": "09:00",
        "workday_end": "17:00"
    }"#;
    let payload: OptimizePayload = serde_json::from_str(raw).unwrap();
    assert_eq!(payload.solver_time_limit_s, 20);
    assert!(payload.allow_drop_visits);
    assert!(!payload.use_live_traffic);
    assert!(payload.capacity.is_none());
}

#[test]
fn payload_rejects_unknown_fields() {
    let raw = r#"{
        "dataset_id": 7,
        "depot_lat": 1.3,
        "depot_lon": 103.8,
        "num_vehicles": 3,
        "workday_start": "09:00",
        "workday_end": "17:00",
        "surprise": true
    }"#;
    assert!(serde_json::from_str::<OptimizePayload>(raw).is_err());
}

#[test]
fn job_payload_tagging() {
    let payload = JobPayload::Optimize(OptimizePayload::builder().build());
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["kind"], "optimize");
    assert!(payload.as_optimize().is_some());
}
