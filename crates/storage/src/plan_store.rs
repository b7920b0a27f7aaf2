// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan persistence.
//!
//! Plans are append-only: the single mutation allowed is a resequence apply,
//! which atomically replaces one route's stops and recomputes the plan-level
//! makespan while the store lock is held.

use parking_lot::Mutex;
use rp_core::{Plan, PlanId, RouteId, RouteStop};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanStoreError {
    #[error("plan {0} not found")]
    PlanNotFound(PlanId),
    #[error("route {route_id} not found in plan {plan_id}")]
    RouteNotFound { plan_id: PlanId, route_id: RouteId },
}

/// Recomputed aggregate fields accompanying a route-stop replacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteTotals {
    pub travel_time_s: u32,
    pub service_time_s: u32,
    pub waiting_time_s: u32,
    pub duration_s: u32,
    pub distance_m: f64,
}

pub trait PlanStore: Send + Sync {
    fn insert(&self, plan: Plan) -> PlanId;

    fn get(&self, plan_id: &PlanId) -> Result<Plan, PlanStoreError>;

    /// Most recent plan for a dataset, if any.
    fn latest_for_dataset(&self, dataset_id: u64) -> Option<Plan>;

    /// Atomically replace one route's stops and totals, then recompute the
    /// plan makespan across all routes.
    fn replace_route_stops(
        &self,
        plan_id: &PlanId,
        route_id: &RouteId,
        stops: Vec<RouteStop>,
        totals: RouteTotals,
    ) -> Result<Plan, PlanStoreError>;
}

/// In-memory plan store.
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: Mutex<HashMap<PlanId, Plan>>,
}

impl MemoryPlanStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl PlanStore for MemoryPlanStore {
    fn insert(&self, plan: Plan) -> PlanId {
        let id = plan.id.clone();
        self.plans.lock().insert(id.clone(), plan);
        id
    }

    fn get(&self, plan_id: &PlanId) -> Result<Plan, PlanStoreError> {
        self.plans
            .lock()
            .get(plan_id)
            .cloned()
            .ok_or_else(|| PlanStoreError::PlanNotFound(plan_id.clone()))
    }

    fn latest_for_dataset(&self, dataset_id: u64) -> Option<Plan> {
        self.plans
            .lock()
            .values()
            .filter(|p| p.dataset_id == dataset_id)
            .max_by_key(|p| p.created_at_ms)
            .cloned()
    }

    fn replace_route_stops(
        &self,
        plan_id: &PlanId,
        route_id: &RouteId,
        stops: Vec<RouteStop>,
        totals: RouteTotals,
    ) -> Result<Plan, PlanStoreError> {
        let mut plans = self.plans.lock();
        let plan = plans
            .get_mut(plan_id)
            .ok_or_else(|| PlanStoreError::PlanNotFound(plan_id.clone()))?;
        let route = plan
            .routes
            .iter_mut()
            .find(|r| &r.id == route_id)
            .ok_or_else(|| PlanStoreError::RouteNotFound {
                plan_id: plan_id.clone(),
                route_id: route_id.clone(),
            })?;

        route.stops = stops;
        route.travel_time_s = totals.travel_time_s;
        route.service_time_s = totals.service_time_s;
        route.waiting_time_s = totals.waiting_time_s;
        route.duration_s = totals.duration_s;
        route.distance_m = totals.distance_m;

        plan.makespan_s = plan.routes.iter().map(|r| r.duration_s).max().unwrap_or(0);
        Ok(plan.clone())
    }
}

#[cfg(test)]
#[path = "plan_store_tests.rs"]
mod tests;
