// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the full node-to-node duration/distance matrices for one
//! optimization request.
//!
//! Pair lookups are independent (shared caches, disjoint matrix cells), so
//! they run on the rayon pool. Progress is emitted in pair-count increments;
//! the engine turns those reports into lease-touch heartbeats. A single
//! unrecoverable pair error fails the whole build: a partial matrix is not
//! usable by the solver.

use crate::cascade::{CascadeError, EtaCascade};
use rp_core::artifact::{ArtifactNode, NodeKind};
use rp_core::{
    LatLon, OptimizationArtifact, ProgressReporter, Stop, TimeWindow, ARTIFACT_SCHEMA_VERSION,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("no geocoded stops available for optimization")]
    NoRoutableStops,
    #[error("failed to estimate pair ({from}, {to}): {source}")]
    Pair {
        from: usize,
        to: usize,
        source: CascadeError,
    },
}

/// Inputs for one matrix build.
#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub dataset_id: u64,
    pub depot: LatLon,
    pub stops: Vec<Stop>,
    pub workday: TimeWindow,
    /// Departure bucket, wall-clock `HH:MM` (the workday start).
    pub depart_bucket: String,
    /// Monday = 0.
    pub day_of_week: u8,
}

pub struct MatrixBuilder {
    cascade: Arc<EtaCascade>,
}

impl MatrixBuilder {
    pub fn new(cascade: Arc<EtaCascade>) -> Self {
        Self { cascade }
    }

    pub fn build(
        &self,
        request: &MatrixRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<OptimizationArtifact, MatrixError> {
        let routable: Vec<&Stop> = request.stops.iter().filter(|s| s.is_routable()).collect();
        if routable.is_empty() {
            return Err(MatrixError::NoRoutableStops);
        }

        let mut nodes = vec![ArtifactNode {
            kind: NodeKind::Depot,
            lat: request.depot.lat,
            lon: request.depot.lon,
            stop_id: None,
        }];
        let mut time_windows = vec![request.workday];
        let mut service_times_s = vec![0u32];
        let mut demands = vec![0u32];

        for stop in &routable {
            let Some(position) = stop.position() else {
                continue;
            };
            nodes.push(ArtifactNode {
                kind: NodeKind::Stop,
                lat: position.lat,
                lon: position.lon,
                stop_id: Some(stop.id.clone()),
            });
            time_windows.push(stop.window().unwrap_or(request.workday));
            service_times_s.push(stop.service_time_min * 60);
            demands.push(stop.demand);
        }

        let n = nodes.len();
        let session = self
            .cascade
            .session(&request.depart_bucket, request.day_of_week);

        progress.report(0, "Computing travel matrix");

        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (0..n).filter(move |j| *j != i).map(move |j| (i, j)))
            .collect();
        let total = pairs.len().max(1);
        // Heartbeat roughly every 5% of pairs.
        let report_every = (total / 20).max(1);
        let done = AtomicUsize::new(0);

        let positions: Vec<LatLon> = nodes.iter().map(|node| LatLon::new(node.lat, node.lon)).collect();
        let resolved = pairs
            .par_iter()
            .map(|&(i, j)| {
                let eta = session
                    .resolve(positions[i], positions[j])
                    .map_err(|source| MatrixError::Pair {
                        from: i,
                        to: j,
                        source,
                    })?;
                let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                if count % report_every == 0 {
                    let pct = (count * 100 / total).min(99) as u8;
                    progress.report(pct, &format!("Estimated {count}/{total} pairs"));
                }
                Ok((i, j, eta))
            })
            .collect::<Result<Vec<_>, MatrixError>>()?;

        let mut duration_matrix_s = vec![vec![0u32; n]; n];
        let mut distance_matrix_m = vec![vec![0f64; n]; n];
        for (i, j, eta) in resolved {
            duration_matrix_s[i][j] = eta.duration_s.max(1);
            distance_matrix_m[i][j] = eta.distance_m;
        }

        progress.report(100, "Travel matrix ready");

        Ok(OptimizationArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            dataset_id: request.dataset_id,
            nodes,
            time_windows,
            service_times_s,
            demands,
            duration_matrix_s,
            distance_matrix_m,
            matrix_strategy: session.strategy(),
            model_version: session.model_version().map(str::to_string),
            depart_bucket: request.depart_bucket.clone(),
            day_of_week: request.day_of_week,
        })
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
