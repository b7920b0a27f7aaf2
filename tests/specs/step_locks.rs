// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use rp_core::{FakeClock, JobKind, JobPayload, OptimizePayload, StepName};
use rp_storage::{JobStore, MemoryJobStore};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const LEASE: Duration = Duration::from_secs(60);

fn store_with_job() -> (Arc<MemoryJobStore<FakeClock>>, FakeClock, rp_core::JobId) {
    let clock = FakeClock::new();
    let store = MemoryJobStore::new(clock.clone(), LEASE);
    let job = store
        .create_job(
            JobKind::Optimize,
            JobPayload::Optimize(OptimizePayload::builder().build()),
        )
        .expect("create");
    (store, clock, job.id)
}

/// Two workers racing from a barrier: exactly one acquires the step.
#[test]
fn concurrent_lock_race_has_exactly_one_winner() {
    let (store, _clock, job_id) = store_with_job();
    let barrier = Arc::new(Barrier::new(2));

    let contenders: Vec<_> = (0..2)
        .map(|idx| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let job_id = job_id.clone();
            std::thread::spawn(move || {
                barrier.wait();
                store
                    .lock_step(&job_id, StepName::Geocode, &format!("worker-{idx}"), LEASE)
                    .expect("lock call")
            })
        })
        .collect();

    let wins: usize = contenders
        .into_iter()
        .map(|handle| handle.join().expect("join") as usize)
        .sum();
    assert_eq!(wins, 1);
}

/// A lease granted for L seconds cannot be reclaimed before L elapses.
#[test]
fn lease_is_not_reclaimable_before_expiry() {
    let (store, clock, job_id) = store_with_job();
    assert!(store
        .lock_step(&job_id, StepName::Geocode, "holder", LEASE)
        .expect("lock"));

    clock.advance(LEASE - Duration::from_secs(1));
    assert!(
        !store
            .lock_step(&job_id, StepName::Geocode, "contender", LEASE)
            .expect("lock call"),
        "reclaim before expiry must fail"
    );

    clock.advance(Duration::from_secs(1));
    assert!(
        store
            .lock_step(&job_id, StepName::Geocode, "contender", LEASE)
            .expect("lock call"),
        "reclaim at expiry must succeed"
    );

    let row = store.get(&job_id).expect("row");
    assert_eq!(row.steps[&StepName::Geocode].stale_reclaimed, 1);
}
