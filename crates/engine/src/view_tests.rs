// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rp_core::{FakeClock, JobKind, JobPayload, OptimizePayload};
use rp_storage::{MemoryJobStore, StatusUpdate};

fn store_with_job() -> (Arc<dyn JobStore>, JobId) {
    let store: Arc<dyn JobStore> =
        MemoryJobStore::new(FakeClock::new(), Duration::from_secs(60));
    let job = store
        .create_job(
            JobKind::Optimize,
            JobPayload::Optimize(OptimizePayload::builder().build()),
        )
        .unwrap();
    (store, job.id)
}

#[test]
fn view_snapshots_job_row() {
    let (store, job_id) = store_with_job();
    store
        .set_status(
            &job_id,
            StatusUpdate::default()
                .status(JobStatus::Running)
                .progress_pct(30)
                .current_step(StepName::BuildMatrix)
                .message("Running BUILD_MATRIX"),
        )
        .unwrap();

    let view = JobView::from(&store.get(&job_id).unwrap());
    assert_eq!(view.status, JobStatus::Running);
    assert_eq!(view.progress_pct, 30);
    assert_eq!(view.current_step, Some(StepName::BuildMatrix));
    assert_eq!(view.steps.len(), rp_core::PIPELINE_STEPS.len());
    assert!(view.error_code.is_none());

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["status"], "RUNNING");
    assert_eq!(json["steps"][1]["step"], "BUILD_MATRIX");
}

#[tokio::test]
async fn watch_returns_when_terminal() {
    let (store, job_id) = store_with_job();
    let watcher = {
        let store = Arc::clone(&store);
        let job_id = job_id.clone();
        tokio::spawn(async move {
            watch_until_terminal(&store, &job_id, Duration::from_secs(5)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    store
        .set_status(&job_id, StatusUpdate::default().status(JobStatus::Succeeded))
        .unwrap();

    let job = watcher.await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
}

#[tokio::test]
async fn watch_times_out_with_last_snapshot() {
    let (store, job_id) = store_with_job();
    let job = watch_until_terminal(&store, &job_id, Duration::from_millis(60))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Queued);
}
