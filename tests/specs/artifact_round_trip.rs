// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rp_core::{NullProgress, OptimizePayload, TimeWindow};
use rp_eta::{
    EtaCascade, HaversineProvider, MatrixBuilder, MatrixRequest, MemoryCache, ModelRegistry,
    RetryPolicy, RetryingProvider, TokenBucket, UpliftService,
};
use rp_solver::{solve, SolveRequest};
use rp_storage::FileArtifactStore;
use std::sync::Arc;
use std::time::Duration;

fn solve_request<'a>(
    artifact: &'a rp_core::OptimizationArtifact,
    workday: TimeWindow,
) -> SolveRequest<'a> {
    SolveRequest {
        duration_matrix: &artifact.duration_matrix_s,
        time_windows: &artifact.time_windows,
        service_times_s: &artifact.service_times_s,
        num_vehicles: 2,
        depot: 0,
        workday,
        demands: Some(&artifact.demands),
        capacity: Some(10),
        time_limit: Duration::from_millis(200),
        allow_drop_visits: true,
        seed: Some(11),
    }
}

/// A serialized-then-reloaded artifact must solve to the same feasibility
/// outcome as the in-memory original (cross-worker resume guarantee).
#[test]
fn reloaded_artifact_solves_to_same_outcome() {
    let cascade = Arc::new(EtaCascade::new(
        MemoryCache::new(),
        RetryingProvider::new(
            Arc::new(HaversineProvider::new()),
            TokenBucket::new(10_000, 1_000_000.0),
            RetryPolicy::default(),
        ),
        Arc::new(ModelRegistry::new(None)),
        Arc::new(UpliftService::disabled()),
        Duration::from_secs(3600),
    ));
    let payload = OptimizePayload::builder().build();
    let workday = payload.workday_window().expect("workday");

    let artifact = MatrixBuilder::new(cascade)
        .build(
            &MatrixRequest {
                dataset_id: 1,
                depot: payload.depot(),
                stops: rp_core::test_support::grid_stops(6),
                workday,
                depart_bucket: "08:00".to_string(),
                day_of_week: 3,
            },
            &NullProgress,
        )
        .expect("matrix build");

    let direct = solve(&solve_request(&artifact, workday)).expect("direct solve");

    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileArtifactStore::new(dir.path());
    let path = store
        .save(1, &rp_core::JobId::new(), &artifact)
        .expect("save");
    let reloaded = FileArtifactStore::load(&path).expect("load");
    assert_eq!(reloaded, artifact);

    let replayed = solve(&solve_request(&reloaded, workday)).expect("replayed solve");

    assert_eq!(direct.feasible, replayed.feasible);
    assert_eq!(direct.unserved.len(), replayed.unserved.len());
    assert_eq!(direct.served_count(), replayed.served_count());
}
