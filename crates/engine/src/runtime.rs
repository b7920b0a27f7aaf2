// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-lifetime wiring.
//!
//! Every shared collaborator (cache, model registry, routing provider, job
//! store, queue) is constructed once at startup and passed by reference into
//! the dispatcher and units. Nothing reaches for hidden globals, so tests
//! assemble a hermetic runtime in a few lines.

use crate::collab::{Exporter, Geocoder, MemoryDatasets, ObjectStoreExporter, StopSource};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::queue::{InProcessQueue, TaskQueue};
use rp_core::{Clock, Settings};
use rp_eta::{
    EtaCascade, LiveTrafficProvider, MatrixBuilder, MemoryCache, ModelRegistry, RetryPolicy,
    RetryingProvider, RouteProvider, TokenBucket, UpliftService,
};
use rp_storage::{
    ArtifactResolver, FileArtifactStore, JobStore, MemoryJobStore, MemoryObjectStore,
    MemoryPlanStore, ObjectStore, PlanStore,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Constructor dependencies for [`Runtime`].
pub struct RuntimeDeps {
    pub settings: Settings,
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub artifacts: FileArtifactStore,
    pub objects: Arc<dyn ObjectStore>,
    pub plans: Arc<dyn PlanStore>,
    pub cascade: Arc<EtaCascade>,
    pub geocoder: Arc<dyn Geocoder>,
    pub stop_source: Arc<dyn StopSource>,
    pub exporter: Arc<dyn Exporter>,
    pub traffic: Arc<dyn LiveTrafficProvider>,
}

/// Shared, process-lifetime service container.
pub struct Runtime<C: Clock> {
    pub settings: Settings,
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn TaskQueue>,
    pub artifacts: FileArtifactStore,
    pub objects: Arc<dyn ObjectStore>,
    pub plans: Arc<dyn PlanStore>,
    pub cascade: Arc<EtaCascade>,
    pub matrix: MatrixBuilder,
    pub resolver: ArtifactResolver,
    pub geocoder: Arc<dyn Geocoder>,
    pub stop_source: Arc<dyn StopSource>,
    pub exporter: Arc<dyn Exporter>,
    pub traffic: Arc<dyn LiveTrafficProvider>,
    pub clock: C,
}

impl<C: Clock> Runtime<C> {
    pub fn new(deps: RuntimeDeps, clock: C) -> Arc<Self> {
        Arc::new(Self {
            matrix: MatrixBuilder::new(Arc::clone(&deps.cascade)),
            resolver: ArtifactResolver::new(Arc::clone(&deps.objects)),
            settings: deps.settings,
            store: deps.store,
            queue: deps.queue,
            artifacts: deps.artifacts,
            objects: deps.objects,
            plans: deps.plans,
            cascade: deps.cascade,
            geocoder: deps.geocoder,
            stop_source: deps.stop_source,
            exporter: deps.exporter,
            traffic: deps.traffic,
            clock,
        })
    }

    pub fn step_lease(&self) -> Duration {
        Duration::from_millis(self.settings.step_lease_ms())
    }
}

/// Fully in-memory runtime over the given routing provider: memory stores,
/// in-process queue, object-store exporter. Returns the dataset fixture and
/// queue alongside so callers can seed stops and drive messages directly.
pub fn hermetic_runtime<C: Clock>(
    settings: Settings,
    artifact_root: &Path,
    provider: Arc<dyn RouteProvider>,
    traffic: Arc<dyn LiveTrafficProvider>,
    clock: C,
) -> (Arc<Runtime<C>>, Arc<MemoryDatasets>, Arc<InProcessQueue>) {
    let datasets = MemoryDatasets::new();
    let queue = InProcessQueue::new();
    let objects = MemoryObjectStore::new();
    let registry = Arc::new(ModelRegistry::new(settings.model_artifact_dir.clone()));
    let uplift = Arc::new(UpliftService::load(
        settings.feature_ml_uplift,
        settings.model_artifact_dir.as_deref(),
    ));
    let cascade = Arc::new(EtaCascade::new(
        MemoryCache::new(),
        RetryingProvider::new(
            provider,
            TokenBucket::new(settings.provider_burst, settings.provider_rate_per_sec),
            RetryPolicy::from_settings(&settings),
        ),
        registry,
        uplift,
        Duration::from_secs(settings.eta_cache_ttl_seconds),
    ));
    let store: Arc<dyn JobStore> = MemoryJobStore::new(
        clock.clone(),
        Duration::from_millis(settings.step_lease_ms()),
    );

    let runtime = Runtime::new(
        RuntimeDeps {
            settings,
            store,
            queue: queue.clone(),
            artifacts: FileArtifactStore::new(artifact_root),
            objects: objects.clone(),
            plans: MemoryPlanStore::new(),
            cascade,
            geocoder: datasets.clone(),
            stop_source: datasets.clone(),
            exporter: Arc::new(ObjectStoreExporter::new(objects)),
            traffic,
        },
        clock,
    );
    (runtime, datasets, queue)
}

/// Async worker pool draining the queue. Dispatch runs on the blocking pool
/// since units (matrix build, solve) are CPU-bound and synchronous.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn<C: Clock>(
        dispatcher: Arc<Dispatcher<C>>,
        queue: Arc<dyn TaskQueue>,
        workers: usize,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..workers.max(1))
            .map(|worker_idx| {
                let dispatcher = Arc::clone(&dispatcher);
                let queue = Arc::clone(&queue);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    loop {
                        let message = tokio::select! {
                            _ = cancel.cancelled() => break,
                            message = queue.pop() => message,
                        };
                        let Some(message) = message else { break };

                        let dispatch_message = message.clone();
                        let dispatch = Arc::clone(&dispatcher);
                        let outcome = tokio::task::spawn_blocking(move || {
                            dispatch.dispatch(&dispatch_message)
                        })
                        .await;

                        match outcome {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) if err.redeliverable() => {
                                // At-least-once: the message goes back on the
                                // queue for another delivery attempt.
                                tracing::warn!(worker_idx, error = %err, "redelivering task");
                                if queue.enqueue(message).is_err() {
                                    break;
                                }
                            }
                            Ok(Err(err)) => {
                                tracing::error!(worker_idx, error = %err, "task dropped");
                            }
                            Err(join_err) => {
                                tracing::error!(worker_idx, error = %join_err, "dispatch panicked");
                            }
                        }
                    }
                })
            })
            .collect();
        Self { cancel, handles }
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

impl DispatchError {
    /// True when the error means the queue should deliver the message again.
    pub fn redeliverable(&self) -> bool {
        matches!(self, DispatchError::RetryDrill { .. })
    }
}
