// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step unit functions.
//!
//! Units do the work of one pipeline step and return the partial result to
//! merge into the job. They never touch step state or locks: ownership
//! checks and failure bookkeeping belong to the dispatcher.

use crate::collab::{Exporter, Geocoder, StopSource};
use crate::error::UnitError;
use crate::persist::PlanPersister;
use crate::runtime::Runtime;
use rp_core::{
    Clock, EtaSource, JobId, OptimizePayload, PlanId, ProgressReporter, ResultRef, TimeWindow,
};
use rp_eta::{LiveTrafficProvider, MatrixRequest};
use rp_solver::{SolveRequest, SolverResult};
use rp_storage::{ArtifactLocator, ObjectStore, PlanStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Monday = 0, matching the artifact's day_of_week field.
fn day_of_week<C: Clock>(clock: &C) -> u8 {
    chrono::DateTime::from_timestamp_millis(clock.epoch_ms() as i64)
        .map(|dt| chrono::Datelike::weekday(&dt).num_days_from_monday() as u8)
        .unwrap_or(0)
}

pub(crate) fn run_geocode<C: Clock>(
    rt: &Runtime<C>,
    payload: &OptimizePayload,
    progress: &dyn ProgressReporter,
) -> Result<ResultRef, UnitError> {
    let summary = rt.geocoder.geocode(payload.dataset_id, progress)?;
    let mut partial = ResultRef::new();
    partial.insert(
        "geocode",
        json!({
            "success_count": summary.success_count,
            "failed_count": summary.failed_count,
        }),
    );
    Ok(partial)
}

pub(crate) fn run_build_matrix<C: Clock>(
    rt: &Runtime<C>,
    job_id: &JobId,
    payload: &OptimizePayload,
    progress: &dyn ProgressReporter,
) -> Result<ResultRef, UnitError> {
    let workday = payload
        .workday_window()
        .map_err(|e| UnitError::validation(e.to_string()))?;
    let stops = rt.stop_source.stops(payload.dataset_id)?;

    let request = MatrixRequest {
        dataset_id: payload.dataset_id,
        depot: payload.depot(),
        stops,
        workday,
        depart_bucket: payload.workday_start.clone(),
        day_of_week: day_of_week(&rt.clock),
    };
    let artifact = rt.matrix.build(&request, progress)?;

    let path = rt
        .artifacts
        .save(payload.dataset_id, job_id, &artifact)?;
    let payload_bytes = serde_json::to_vec(&artifact)
        .map_err(|e| UnitError::execution(format!("artifact serialize: {e}")))?;
    let object_ref = rt.objects.put(
        &format!("matrix/{job_id}.json"),
        payload_bytes,
        "application/json",
    );

    let mut partial = ResultRef::new();
    partial.insert("matrix_artifact_path", json!(path.display().to_string()));
    partial.insert(
        "matrix_artifact_ref",
        json!({
            "object_path": object_ref.object_path,
            "size_bytes": object_ref.size_bytes,
        }),
    );
    partial.insert("matrix_strategy", json!(artifact.matrix_strategy));
    partial.insert("model_version", json!(artifact.model_version));
    Ok(partial)
}

fn locator_from_result(result_ref: &ResultRef) -> ArtifactLocator {
    let object_path = result_ref
        .get("matrix_artifact_ref")
        .and_then(|r| r.get("object_path"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let file_path = result_ref
        .get("matrix_artifact_path")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    ArtifactLocator {
        object_path,
        file_path,
    }
}

pub(crate) fn run_optimize<C: Clock>(
    rt: &Runtime<C>,
    payload: &OptimizePayload,
    result_ref: &ResultRef,
    progress: &dyn ProgressReporter,
) -> Result<ResultRef, UnitError> {
    payload
        .validate()
        .map_err(|e| UnitError::validation(e.to_string()))?;
    let workday = payload
        .workday_window()
        .map_err(|e| UnitError::validation(e.to_string()))?;

    progress.report(5, "Loading travel matrix artifact");
    let artifact = rt.resolver.resolve(&locator_from_result(result_ref))?;
    artifact
        .validate()
        .map_err(|detail| UnitError::new(rp_core::ErrorCode::MatrixArtifactLoadFailed, detail))?;

    progress.report(15, "Solving vehicle routes");
    let demands = payload.capacity.map(|_| &artifact.demands[..]);
    let result = rp_solver::solve(&SolveRequest {
        duration_matrix: &artifact.duration_matrix_s,
        time_windows: &artifact.time_windows,
        service_times_s: &artifact.service_times_s,
        num_vehicles: payload.num_vehicles,
        depot: 0,
        workday,
        demands,
        capacity: payload.capacity,
        time_limit: Duration::from_secs(payload.solver_time_limit_s as u64),
        allow_drop_visits: payload.allow_drop_visits,
        seed: None,
    })?;

    let persister = PlanPersister::new(Arc::clone(&rt.plans));
    let now_ms = rt.clock.epoch_ms();

    if !result.feasible {
        let reason = result.reason.as_deref().unwrap_or("other constraint");
        let persisted = persister.persist_infeasible(
            &artifact,
            payload,
            workday,
            reason,
            EtaSource::from(artifact.matrix_strategy),
            now_ms,
        );
        progress.report(100, "No feasible plan under the given constraints");
        return Ok(persisted.partial);
    }

    let (traffic_legs, eta_source) = live_traffic_legs(rt, payload, &artifact, &result, workday);
    progress.report(80, "Persisting route plan");
    let persisted = persister.persist(
        &artifact,
        &result,
        payload,
        workday,
        eta_source,
        traffic_legs.as_deref(),
        now_ms,
    )?;
    progress.report(100, "Route plan ready");
    Ok(persisted.partial)
}

/// Post-solve live traffic refresh (tier 5 of the cascade). Failures fall
/// back to the matrix durations; the returned source reflects what served.
fn live_traffic_legs<C: Clock>(
    rt: &Runtime<C>,
    payload: &OptimizePayload,
    artifact: &rp_core::OptimizationArtifact,
    result: &SolverResult,
    workday: TimeWindow,
) -> (Option<Vec<Vec<u32>>>, EtaSource) {
    let matrix_source = EtaSource::from(artifact.matrix_strategy);
    if !payload.use_live_traffic || !rt.settings.feature_live_traffic || !rt.traffic.enabled() {
        return (None, matrix_source);
    }

    let mut per_route = Vec::with_capacity(result.routes.len());
    for seq in &result.routes {
        let waypoints: Vec<rp_core::LatLon> = seq
            .iter()
            .map(|&node| {
                let node = &artifact.nodes[node];
                rp_core::LatLon::new(node.lat, node.lon)
            })
            .collect();
        if waypoints.len() < 2 {
            per_route.push(Vec::new());
            continue;
        }
        match rt.traffic.segment_times(&waypoints, workday.start_s) {
            Ok(legs) if legs.len() + 1 == waypoints.len() => per_route.push(legs),
            Ok(_) | Err(_) => {
                tracing::warn!(
                    "live traffic refresh unavailable, keeping matrix durations"
                );
                return (None, matrix_source);
            }
        }
    }
    (Some(per_route), EtaSource::GoogleTraffic)
}

pub(crate) fn run_generate_exports<C: Clock>(
    rt: &Runtime<C>,
    result_ref: &ResultRef,
    progress: &dyn ProgressReporter,
) -> Result<ResultRef, UnitError> {
    let optimize = result_ref.get("optimize");
    if optimize
        .and_then(|o| o.get("feasible"))
        .and_then(|v| v.as_bool())
        == Some(false)
    {
        let mut partial = ResultRef::new();
        partial.insert("exports_skipped", json!(true));
        partial.insert("reason", json!("plan_infeasible"));
        return Ok(partial);
    }

    let plan_id = optimize
        .and_then(|o| o.get("plan_id"))
        .or_else(|| result_ref.get("plan_id"))
        .and_then(|v| v.as_str())
        .map(PlanId::from_string)
        .ok_or_else(|| {
            UnitError::new(
                rp_core::ErrorCode::PlanNotReady,
                "no plan_id found for export generation",
            )
        })?;

    let plan = rt.plans.get(&plan_id)?;
    rt.exporter.export(&plan, progress)
}

#[cfg(test)]
#[path = "units_tests.rs"]
mod tests;
