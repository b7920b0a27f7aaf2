// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborators consumed behind traits.
//!
//! Geocoding, stop storage, and export rendering are real services in
//! production; the in-memory implementations here keep the pipeline fully
//! exercisable in tests and the CLI demo.

use crate::error::UnitError;
use parking_lot::Mutex;
use rp_core::{GeocodeStatus, Plan, ProgressReporter, ResultRef, Stop};
use rp_storage::ObjectStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of geocoding one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeSummary {
    pub success_count: u32,
    pub failed_count: u32,
}

/// Resolves stop addresses to coordinates.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        dataset_id: u64,
        progress: &dyn ProgressReporter,
    ) -> Result<GeocodeSummary, UnitError>;
}

/// Read access to a dataset's stops.
pub trait StopSource: Send + Sync {
    fn stops(&self, dataset_id: u64) -> Result<Vec<Stop>, UnitError>;
}

/// Produces export artifacts for a completed plan; the returned partial is
/// merged into the job's result_ref.
pub trait Exporter: Send + Sync {
    fn export(
        &self,
        plan: &Plan,
        progress: &dyn ProgressReporter,
    ) -> Result<ResultRef, UnitError>;
}

/// In-memory datasets doubling as geocoder and stop source.
///
/// "Geocoding" marks stops that already carry coordinates as Success and the
/// rest as Failed, which is all the pipeline observes from the real service.
#[derive(Default)]
pub struct MemoryDatasets {
    datasets: Mutex<HashMap<u64, Vec<Stop>>>,
    geocode_calls: Mutex<u32>,
}

impl MemoryDatasets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put_dataset(&self, dataset_id: u64, stops: Vec<Stop>) {
        self.datasets.lock().insert(dataset_id, stops);
    }

    /// How many times `geocode` ran; used to prove redelivery idempotence.
    pub fn geocode_calls(&self) -> u32 {
        *self.geocode_calls.lock()
    }
}

impl Geocoder for MemoryDatasets {
    fn geocode(
        &self,
        dataset_id: u64,
        progress: &dyn ProgressReporter,
    ) -> Result<GeocodeSummary, UnitError> {
        *self.geocode_calls.lock() += 1;
        let mut datasets = self.datasets.lock();
        let stops = datasets
            .get_mut(&dataset_id)
            .ok_or_else(|| UnitError::validation(format!("dataset {dataset_id} not found")))?;

        let total = stops.len().max(1);
        let mut summary = GeocodeSummary {
            success_count: 0,
            failed_count: 0,
        };
        for (idx, stop) in stops.iter_mut().enumerate() {
            if stop.geocode_status == GeocodeStatus::Manual {
                summary.success_count += 1;
            } else if stop.lat.is_some() && stop.lon.is_some() {
                stop.geocode_status = GeocodeStatus::Success;
                summary.success_count += 1;
            } else {
                stop.geocode_status = GeocodeStatus::Failed;
                summary.failed_count += 1;
            }
            progress.report(
                ((idx + 1) * 100 / total) as u8,
                &format!("Geocoded {}/{total} stops", idx + 1),
            );
        }
        Ok(summary)
    }
}

impl StopSource for MemoryDatasets {
    fn stops(&self, dataset_id: u64) -> Result<Vec<Stop>, UnitError> {
        self.datasets
            .lock()
            .get(&dataset_id)
            .cloned()
            .ok_or_else(|| UnitError::validation(format!("dataset {dataset_id} not found")))
    }
}

/// Exporter writing per-route map images and a driver pack into the object
/// store; the actual rendering lives outside this system.
pub struct ObjectStoreExporter {
    objects: Arc<dyn ObjectStore>,
}

impl ObjectStoreExporter {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }
}

impl Exporter for ObjectStoreExporter {
    fn export(
        &self,
        plan: &Plan,
        progress: &dyn ProgressReporter,
    ) -> Result<ResultRef, UnitError> {
        let total_routes = plan.routes.len().max(1);
        let mut maps = Vec::with_capacity(plan.routes.len());
        for (idx, route) in plan.routes.iter().enumerate() {
            progress.report(
                ((idx * 70) / total_routes) as u8,
                &format!("Rendering map image for vehicle {}", route.vehicle_idx),
            );
            let object_path = format!("maps/{}/{}.png", plan.id, route.id);
            let reference =
                self.objects
                    .put(&object_path, render_placeholder(route.stops.len()), "image/png");
            maps.push(json!({
                "route_id": route.id,
                "vehicle_idx": route.vehicle_idx,
                "object_path": reference.object_path,
                "size_bytes": reference.size_bytes,
            }));
        }

        progress.report(80, "Generating driver pack PDF");
        let pack_path = format!("driver_packs/{}/driver_pack.pdf", plan.id);
        let pack = self.objects.put(
            &pack_path,
            render_placeholder(plan.routes.len()),
            "application/pdf",
        );
        progress.report(100, "Export artifacts ready");

        let mut partial = ResultRef::new();
        partial.insert("maps", json!(maps));
        partial.insert(
            "driver_pack",
            json!({"object_path": pack.object_path, "size_bytes": pack.size_bytes}),
        );
        Ok(partial)
    }
}

fn render_placeholder(seed: usize) -> Vec<u8> {
    format!("rendered:{seed}").into_bytes()
}

#[cfg(test)]
#[path = "collab_tests.rs"]
mod tests;
