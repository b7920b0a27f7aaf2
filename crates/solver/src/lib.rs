// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rp-solver: capacitated vehicle routing with time windows.
//!
//! A time-bounded heuristic: cheapest-insertion construction over randomized
//! restarts, improved by relocate and 2-opt moves until the wall-clock budget
//! runs out. Repeated runs on the same input are feasibility-preserving but
//! not bit-identical. Exact optimality is out of scope by design.

pub mod problem;
pub mod result;
pub mod schedule;
mod search;

pub use problem::{SolveError, SolveRequest};
pub use result::{SolveStats, SolverResult};
pub use schedule::{evaluate_route, RouteSchedule, ScheduleContext};

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Fixed cost charged for excluding a stop instead of violating a hard
/// constraint, when drops are allowed.
pub const DROP_PENALTY: i64 = 100_000;

/// Solve one routing instance within the request's time budget.
pub fn solve(request: &SolveRequest<'_>) -> Result<SolverResult, SolveError> {
    request.validate()?;

    // Cheap necessary-condition check: with drops disallowed, total demand
    // cannot exceed fleet capacity. Refusing here skips the search entirely.
    // When drops are allowed, excess demand is resolved by dropping stops.
    if !request.allow_drop_visits {
        if let Some(reason) = request.capacity_exceeded() {
            return Ok(SolverResult::infeasible(reason));
        }
    }

    // Stops whose own window cannot meet the workday are unservable; with
    // drops disallowed that makes the whole instance infeasible.
    let unservable = request.unservable_nodes();
    if !request.allow_drop_visits && !unservable.is_empty() {
        return Ok(SolverResult::infeasible("time window conflict"));
    }

    let mut rng = match request.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };
    let outcome = search::run(request, &unservable, &mut rng);

    match outcome {
        Some(result) => Ok(result),
        None => Ok(SolverResult::infeasible("other constraint")),
    }
}

#[cfg(test)]
#[path = "solver_tests.rs"]
mod tests;
