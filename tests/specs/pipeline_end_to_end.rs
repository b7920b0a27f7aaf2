// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::support::{harness, payload, DATASET};
use rp_core::{JobStatus, PlanStatus, StepName, PIPELINE_STEPS};
use rp_engine::{watch_until_terminal, TaskMessage, TaskQueue, WorkerPool};
use rp_storage::{JobStore, PlanStore};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_pool_runs_pipeline_to_success_with_monotonic_progress() {
    let h = harness();
    h.seed(rp_core::test_support::grid_stops(5));
    let job = h.submit(payload().num_vehicles(2).build());

    let pool = WorkerPool::spawn(Arc::clone(&h.dispatcher), h.queue.clone(), 3);

    // Sample progress while the pipeline runs; it must never decrease
    // while the job is running.
    let store = Arc::clone(&h.dispatcher.runtime().store);
    let mut samples = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        let row = store.get(&job.id).expect("job row");
        if row.status == JobStatus::Running {
            samples.push(row.progress_pct);
        }
        if row.is_terminal() || tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let job_row = watch_until_terminal(&store, &job.id, Duration::from_secs(30))
        .await
        .expect("watch");
    h.queue.close();
    pool.shutdown().await;

    assert_eq!(job_row.status, JobStatus::Succeeded);
    assert_eq!(job_row.progress_pct, 100);
    assert!(
        samples.windows(2).all(|w| w[0] <= w[1]),
        "progress regressed: {samples:?}"
    );
    for step in PIPELINE_STEPS {
        assert_eq!(
            job_row.steps[&step].status,
            rp_core::StepStatus::Succeeded,
            "{step}"
        );
    }

    let plan = h
        .dispatcher
        .runtime()
        .plans
        .latest_for_dataset(DATASET)
        .expect("plan");
    assert_eq!(plan.status, PlanStatus::Success);
    assert_eq!(plan.routes.iter().map(|r| r.stop_count()).sum::<usize>(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_delivery_does_not_corrupt_the_job() {
    let h = harness();
    h.seed(rp_core::test_support::grid_stops(4));
    let job = h.submit(payload().build());

    // At-least-once: the same GEOCODE message is delivered twice.
    h.queue
        .enqueue(TaskMessage::step(&job.id, StepName::Geocode))
        .expect("duplicate enqueue");

    let pool = WorkerPool::spawn(Arc::clone(&h.dispatcher), h.queue.clone(), 3);
    let store = Arc::clone(&h.dispatcher.runtime().store);
    let job_row = watch_until_terminal(&store, &job.id, Duration::from_secs(30))
        .await
        .expect("watch");
    h.queue.close();
    pool.shutdown().await;

    assert_eq!(job_row.status, JobStatus::Succeeded);
    // The unit ran once per step despite the duplicates.
    assert_eq!(h.datasets.geocode_calls(), 1);
    assert_eq!(
        job_row.result_ref.get("geocode").expect("geocode key")["success_count"],
        4
    );
}

#[test]
fn redelivery_after_success_is_a_noop() {
    let h = harness();
    h.seed(rp_core::test_support::grid_stops(3));
    let job = h.submit(payload().build());
    h.drain();

    let store = &h.dispatcher.runtime().store;
    let before = store.get(&job.id).expect("row");
    assert_eq!(before.status, JobStatus::Succeeded);

    for step in PIPELINE_STEPS {
        h.dispatcher
            .dispatch(&TaskMessage::step(&job.id, step))
            .expect("redelivery dispatch");
    }
    h.drain();

    let after = store.get(&job.id).expect("row");
    assert_eq!(after.status, JobStatus::Succeeded);
    assert_eq!(after.result_ref, before.result_ref, "no duplicated keys");
    assert_eq!(h.datasets.geocode_calls(), 1);
}
