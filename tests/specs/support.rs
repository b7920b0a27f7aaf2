// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for end-to-end specs: a hermetic runtime over in-memory
//! stores, the offline routing provider, and a controllable clock.

use rp_core::{FakeClock, OptimizePayload, Settings, Stop};
use rp_engine::{hermetic_runtime, Dispatcher, InProcessQueue, MemoryDatasets};
use rp_eta::{DisabledTraffic, HaversineProvider};
use std::sync::Arc;

pub const DATASET: u64 = 1;

pub struct Harness {
    pub dispatcher: Arc<Dispatcher<FakeClock>>,
    pub datasets: Arc<MemoryDatasets>,
    pub queue: Arc<InProcessQueue>,
    _artifacts: tempfile::TempDir,
}

pub fn harness() -> Harness {
    let artifacts = tempfile::tempdir().expect("tempdir");
    let (runtime, datasets, queue) = hermetic_runtime(
        Settings::default(),
        artifacts.path(),
        Arc::new(HaversineProvider::new()),
        Arc::new(DisabledTraffic),
        FakeClock::new(),
    );
    Harness {
        dispatcher: Dispatcher::new(runtime),
        datasets,
        queue,
        _artifacts: artifacts,
    }
}

impl Harness {
    /// Drive queued messages to completion on the current thread.
    pub fn drain(&self) {
        while let Some(message) = self.queue.try_pop() {
            self.dispatcher
                .dispatch(&message)
                .expect("dispatch should not error");
        }
    }

    pub fn seed(&self, stops: Vec<Stop>) {
        self.datasets.put_dataset(DATASET, stops);
    }

    pub fn submit(&self, payload: OptimizePayload) -> rp_core::Job {
        self.dispatcher.submit_optimize(payload).expect("submit")
    }
}

/// Payload preset pointing at the harness dataset.
pub fn payload() -> rp_core::OptimizePayloadBuilder {
    OptimizePayload::builder().dataset_id(DATASET)
}
