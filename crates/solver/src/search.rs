// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Construction and improvement search.
//!
//! Cheapest insertion builds an initial solution; relocate and 2-opt moves
//! improve it; randomized restarts explore different construction orders
//! until the wall-clock budget is spent. The best feasible solution wins.

use crate::problem::SolveRequest;
use crate::result::{SolveStats, SolverResult};
use crate::schedule::{evaluate_route, ScheduleContext};
use crate::DROP_PENALTY;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::time::Instant;

const MAX_RESTARTS: u32 = 50;

struct Solution {
    routes: Vec<Vec<usize>>,
    dropped: Vec<usize>,
    objective: i64,
}

pub(crate) fn run(
    request: &SolveRequest<'_>,
    unservable: &[usize],
    rng: &mut SmallRng,
) -> Option<SolverResult> {
    let started = Instant::now();
    let deadline = started + request.time_limit;
    let ctx = ScheduleContext {
        duration_matrix: request.duration_matrix,
        time_windows: request.time_windows,
        service_times_s: request.service_times_s,
        workday: request.workday,
    };

    let mut candidates: Vec<usize> = (0..request.node_count())
        .filter(|&node| node != request.depot && !unservable.contains(&node))
        .collect();
    // First restart is deterministic: serve tight windows first.
    candidates.sort_by_key(|&node| request.time_windows[node].start_s);

    let mut best: Option<Solution> = None;
    let mut stats = SolveStats::default();

    loop {
        stats.restarts += 1;
        let mut solution = construct(request, &ctx, &candidates);
        stats.improvements += improve(request, &ctx, &mut solution, deadline);
        solution.objective = objective(&ctx, &solution);

        let better = best
            .as_ref()
            .map(|b| solution.objective < b.objective)
            .unwrap_or(true);
        if better {
            best = Some(solution);
        }

        if stats.restarts >= MAX_RESTARTS || Instant::now() >= deadline {
            break;
        }
        candidates.shuffle(rng);
    }

    stats.elapsed_ms = started.elapsed().as_millis() as u64;
    let best = best?;

    if !request.allow_drop_visits && !best.dropped.is_empty() {
        return None;
    }

    let mut unserved: Vec<usize> = unservable.to_vec();
    unserved.extend(&best.dropped);
    unserved.sort_unstable();

    let mut routes = Vec::with_capacity(best.routes.len());
    let mut arrivals = Vec::with_capacity(best.routes.len());
    for seq in &best.routes {
        let schedule = evaluate_route(seq, &ctx)?;
        routes.push(seq.clone());
        arrivals.push(schedule.arrivals);
    }

    tracing::debug!(
        objective = best.objective,
        restarts = stats.restarts,
        improvements = stats.improvements,
        elapsed_ms = stats.elapsed_ms,
        unserved = unserved.len(),
        "solve finished"
    );

    Some(SolverResult {
        feasible: true,
        routes,
        arrivals,
        objective: best.objective,
        unserved,
        reason: None,
        stats,
    })
}

fn route_demand(request: &SolveRequest<'_>, seq: &[usize]) -> u64 {
    let Some(demands) = request.demands else {
        return 0;
    };
    seq.iter().map(|&node| demands[node] as u64).sum()
}

fn fits_capacity(request: &SolveRequest<'_>, seq: &[usize], node: usize) -> bool {
    let (Some(demands), Some(capacity)) = (request.demands, request.capacity) else {
        return true;
    };
    route_demand(request, seq) + demands[node] as u64 <= capacity as u64
}

/// Cheapest-insertion construction over the given stop order.
fn construct(
    request: &SolveRequest<'_>,
    ctx: &ScheduleContext<'_>,
    order: &[usize],
) -> Solution {
    let depot = request.depot;
    let mut routes: Vec<Vec<usize>> = (0..request.num_vehicles)
        .map(|_| vec![depot, depot])
        .collect();
    let mut costs: Vec<i64> = routes
        .iter()
        .map(|seq| evaluate_route(seq, ctx).map(|s| s.cost).unwrap_or(0))
        .collect();
    let mut dropped = Vec::new();

    for &node in order {
        let mut cheapest: Option<(usize, usize, i64)> = None;
        for (route_idx, seq) in routes.iter().enumerate() {
            if !fits_capacity(request, seq, node) {
                continue;
            }
            for position in 1..seq.len() {
                let mut trial = seq.clone();
                trial.insert(position, node);
                if let Some(schedule) = evaluate_route(&trial, ctx) {
                    let delta = schedule.cost - costs[route_idx];
                    if cheapest.map(|(_, _, best)| delta < best).unwrap_or(true) {
                        cheapest = Some((route_idx, position, delta));
                    }
                }
            }
        }
        match cheapest {
            Some((route_idx, position, _)) => {
                routes[route_idx].insert(position, node);
                costs[route_idx] = evaluate_route(&routes[route_idx], ctx)
                    .map(|s| s.cost)
                    .unwrap_or(costs[route_idx]);
            }
            None => dropped.push(node),
        }
    }

    Solution {
        routes,
        dropped,
        objective: 0,
    }
}

/// First-improvement relocate + intra-route 2-opt until stable or out of time.
fn improve(
    request: &SolveRequest<'_>,
    ctx: &ScheduleContext<'_>,
    solution: &mut Solution,
    deadline: Instant,
) -> u32 {
    let mut accepted = 0;
    loop {
        if Instant::now() >= deadline {
            break;
        }
        let moved = relocate_once(request, ctx, solution) || two_opt_once(ctx, solution);
        if !moved {
            break;
        }
        accepted += 1;
    }
    accepted
}

fn route_cost(ctx: &ScheduleContext<'_>, seq: &[usize]) -> Option<i64> {
    evaluate_route(seq, ctx).map(|s| s.cost)
}

fn relocate_once(
    request: &SolveRequest<'_>,
    ctx: &ScheduleContext<'_>,
    solution: &mut Solution,
) -> bool {
    for from_idx in 0..solution.routes.len() {
        for pos in 1..solution.routes[from_idx].len().saturating_sub(1) {
            let node = solution.routes[from_idx][pos];
            let mut source = solution.routes[from_idx].clone();
            source.remove(pos);
            let Some(source_cost) = route_cost(ctx, &source) else {
                continue;
            };
            let old_source_cost = match route_cost(ctx, &solution.routes[from_idx]) {
                Some(cost) => cost,
                None => continue,
            };

            for to_idx in 0..solution.routes.len() {
                let target_base = if to_idx == from_idx {
                    &source
                } else {
                    &solution.routes[to_idx]
                };
                if to_idx != from_idx && !fits_capacity(request, target_base, node) {
                    continue;
                }
                let old_target_cost = if to_idx == from_idx {
                    source_cost
                } else {
                    match route_cost(ctx, target_base) {
                        Some(cost) => cost,
                        None => continue,
                    }
                };

                for insert_at in 1..target_base.len() {
                    if to_idx == from_idx && insert_at == pos {
                        continue;
                    }
                    let mut trial = target_base.clone();
                    trial.insert(insert_at, node);
                    let Some(new_target_cost) = route_cost(ctx, &trial) else {
                        continue;
                    };
                    let (old_total, new_total) = if to_idx == from_idx {
                        (old_source_cost, new_target_cost)
                    } else {
                        (
                            old_source_cost + old_target_cost,
                            source_cost + new_target_cost,
                        )
                    };
                    if new_total < old_total {
                        if to_idx == from_idx {
                            solution.routes[from_idx] = trial;
                        } else {
                            solution.routes[from_idx] = source;
                            solution.routes[to_idx] = trial;
                        }
                        return true;
                    }
                }
            }
        }
    }
    false
}

fn two_opt_once(ctx: &ScheduleContext<'_>, solution: &mut Solution) -> bool {
    for route_idx in 0..solution.routes.len() {
        let seq = &solution.routes[route_idx];
        let len = seq.len();
        if len < 5 {
            continue;
        }
        let Some(current_cost) = route_cost(ctx, seq) else {
            continue;
        };
        for i in 1..len - 2 {
            for j in i + 1..len - 1 {
                let mut trial = seq.clone();
                trial[i..=j].reverse();
                if let Some(new_cost) = route_cost(ctx, &trial) {
                    if new_cost < current_cost {
                        solution.routes[route_idx] = trial;
                        return true;
                    }
                }
            }
        }
    }
    false
}

fn objective(ctx: &ScheduleContext<'_>, solution: &Solution) -> i64 {
    let route_costs: i64 = solution
        .routes
        .iter()
        .filter_map(|seq| route_cost(ctx, seq))
        .sum();
    route_costs + DROP_PENALTY * solution.dropped.len() as i64
}
