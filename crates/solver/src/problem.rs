// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Solve request and pre-search feasibility screens.

use rp_core::TimeWindow;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    #[error("malformed instance: {0}")]
    BadShape(String),
}

/// One routing instance. Matrices index nodes; node 0 conventionally the
/// depot, but any `depot` index is accepted.
#[derive(Debug, Clone)]
pub struct SolveRequest<'a> {
    pub duration_matrix: &'a [Vec<u32>],
    pub time_windows: &'a [TimeWindow],
    pub service_times_s: &'a [u32],
    pub num_vehicles: u32,
    pub depot: usize,
    pub workday: TimeWindow,
    pub demands: Option<&'a [u32]>,
    pub capacity: Option<u32>,
    pub time_limit: Duration,
    pub allow_drop_visits: bool,
    /// Fixed seed for reproducible tests; None draws from entropy.
    pub seed: Option<u64>,
}

impl SolveRequest<'_> {
    pub fn node_count(&self) -> usize {
        self.duration_matrix.len()
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        let n = self.node_count();
        if n == 0 {
            return Err(SolveError::BadShape("empty duration matrix".to_string()));
        }
        if self.duration_matrix.iter().any(|row| row.len() != n) {
            return Err(SolveError::BadShape("duration matrix not square".to_string()));
        }
        if self.time_windows.len() != n || self.service_times_s.len() != n {
            return Err(SolveError::BadShape(
                "node attribute lengths disagree".to_string(),
            ));
        }
        if let Some(demands) = self.demands {
            if demands.len() != n {
                return Err(SolveError::BadShape("demand length disagrees".to_string()));
            }
        }
        if self.depot >= n {
            return Err(SolveError::BadShape(format!(
                "depot index {} out of range",
                self.depot
            )));
        }
        if self.num_vehicles == 0 {
            return Err(SolveError::BadShape("no vehicles".to_string()));
        }
        Ok(())
    }

    /// Necessary-condition screen: total demand vs fleet capacity.
    pub fn capacity_exceeded(&self) -> Option<&'static str> {
        let (Some(demands), Some(capacity)) = (self.demands, self.capacity) else {
            return None;
        };
        let total: u64 = demands.iter().map(|&d| d as u64).sum();
        let fleet = capacity as u64 * self.num_vehicles as u64;
        (total > fleet).then_some("capacity exceeded")
    }

    /// Nodes that can never be served: their window shares no instant with
    /// the workday, or closes before they can possibly be reached.
    pub fn unservable_nodes(&self) -> Vec<usize> {
        (0..self.node_count())
            .filter(|&node| node != self.depot)
            .filter(|&node| {
                let window = &self.time_windows[node];
                window.disjoint_from(&self.workday)
                    || window.end_s < self.workday.start_s
                    || window.start_s > self.workday.end_s
            })
            .collect()
    }
}
