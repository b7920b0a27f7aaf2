// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The estimation cascade: cache, model, baseline floor, uplift.
//!
//! Each tier is an explicit `Result`/`Option` hop so the fallback order is
//! visible and testable. One `EtaSession` pins the model version for a whole
//! matrix build; the canary draw happens once per session, not per pair.

use crate::baseline::baseline_duration;
use crate::cache::EtaCache;
use crate::features::build_features;
use crate::model::LinearModel;
use crate::provider::{ProviderError, RetryingProvider, RouteEstimate};
use crate::registry::ModelRegistry;
use crate::uplift::UpliftService;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rp_core::{hhmm_to_seconds, LatLon, MatrixStrategy};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CascadeError {
    /// Base route unobtainable: provider failed hard and the pair cannot be
    /// estimated. The whole matrix build fails on this.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// One resolved pair duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEta {
    pub duration_s: u32,
    pub distance_m: f64,
    /// Served from cache with no provider or model work.
    pub cache_hit: bool,
}

pub struct EtaCascade {
    cache: Arc<dyn EtaCache>,
    provider: RetryingProvider,
    registry: Arc<ModelRegistry>,
    uplift: Arc<UpliftService>,
    cache_ttl: Duration,
}

impl EtaCascade {
    pub fn new(
        cache: Arc<dyn EtaCache>,
        provider: RetryingProvider,
        registry: Arc<ModelRegistry>,
        uplift: Arc<UpliftService>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            provider,
            registry,
            uplift,
            cache_ttl,
        }
    }

    /// Start a session for one departure bucket. Resolves the serving model
    /// version through the rollout policy; a failed artifact load falls
    /// through to the baseline tier instead of erroring.
    pub fn session(&self, depart_bucket: &str, day_of_week: u8) -> EtaSession<'_> {
        let hour = (hhmm_to_seconds(depart_bucket).unwrap_or(8 * 3600) / 3600) as u8;
        let mut rng = SmallRng::from_entropy();
        let rollout = self.registry.rollout();
        let model = rollout
            .resolve_version(&mut rng)
            .and_then(|version| match self.registry.load(&version) {
                Ok(model) => Some(model),
                Err(err) => {
                    tracing::warn!(version = %version, error = %err, "model load failed, using baseline");
                    None
                }
            });

        let strategy = if self.uplift.available() {
            MatrixStrategy::MlUplift
        } else if model.is_some() {
            MatrixStrategy::MlBaseline
        } else {
            MatrixStrategy::Onemap
        };

        EtaSession {
            cascade: self,
            depart_bucket: depart_bucket.to_string(),
            day_of_week,
            hour,
            model,
            strategy,
        }
    }
}

/// Cascade bound to one departure bucket and one resolved model version.
pub struct EtaSession<'a> {
    cascade: &'a EtaCascade,
    depart_bucket: String,
    day_of_week: u8,
    hour: u8,
    model: Option<LinearModel>,
    strategy: MatrixStrategy,
}

impl EtaSession<'_> {
    pub fn strategy(&self) -> MatrixStrategy {
        self.strategy
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.version.as_str())
    }

    fn version_tag(&self) -> &str {
        self.model_version().unwrap_or("baseline")
    }

    fn pair_key(&self, prefix: &str, origin: LatLon, dest: LatLon) -> String {
        let o = origin.rounded();
        let d = dest.rounded();
        format!(
            "{prefix}:{}:{}:{}:{}:{}:{}",
            o.lat, o.lon, d.lat, d.lon, self.depart_bucket, self.day_of_week
        )
    }

    /// Resolve one ordered pair.
    pub fn resolve(&self, origin: LatLon, dest: LatLon) -> Result<ResolvedEta, CascadeError> {
        if origin.rounded() == dest.rounded() {
            return Ok(ResolvedEta {
                duration_s: 0,
                distance_m: 0.0,
                cache_hit: false,
            });
        }

        // Tier 1: previously resolved duration for this key + model version.
        let eta_key = format!(
            "{}:{}",
            self.pair_key("eta", origin, dest),
            self.version_tag()
        );
        if let Some(hit) = self.cascade.cache.get(&eta_key) {
            if let (Some(duration_s), Some(distance_m)) = (
                hit.get("duration_s").and_then(|v| v.as_u64()),
                hit.get("distance_m").and_then(|v| v.as_f64()),
            ) {
                return Ok(ResolvedEta {
                    duration_s: duration_s as u32,
                    distance_m,
                    cache_hit: true,
                });
            }
        }

        let base = self.base_route(origin, dest)?;
        let features = build_features(
            base.duration_s,
            base.distance_m,
            self.hour,
            self.day_of_week,
            origin,
            dest,
        );

        // Tier 2: model inference; tier 3: baseline floor.
        let mut duration_s = match &self.model {
            Some(model) => model.predict(&features),
            None => baseline_duration(base.duration_s, self.hour),
        };

        // Tier 4: multiplicative uplift correction.
        if let Some(factor) = self.cascade.uplift.factor(&features) {
            duration_s *= factor;
        }
        let duration_s = duration_s.round().max(1.0) as u32;

        tracing::debug!(
            o_lat = origin.lat,
            o_lon = origin.lon,
            d_lat = dest.lat,
            d_lon = dest.lon,
            base_duration_s = base.duration_s,
            distance_m = base.distance_m,
            duration_s,
            strategy = %self.strategy,
            model_version = self.version_tag(),
            "eta resolved"
        );

        self.cascade.cache.set(
            &eta_key,
            json!({"duration_s": duration_s, "distance_m": base.distance_m}),
            Some(self.cascade.cache_ttl),
        );
        Ok(ResolvedEta {
            duration_s,
            distance_m: base.distance_m,
            cache_hit: false,
        })
    }

    /// Provider base route with its own cache in front.
    fn base_route(&self, origin: LatLon, dest: LatLon) -> Result<RouteEstimate, CascadeError> {
        let route_key = self.pair_key("route", origin, dest);
        if let Some(hit) = self.cascade.cache.get(&route_key) {
            if let (Some(duration_s), Some(distance_m)) = (
                hit.get("duration_s").and_then(|v| v.as_f64()),
                hit.get("distance_m").and_then(|v| v.as_f64()),
            ) {
                return Ok(RouteEstimate {
                    duration_s,
                    distance_m,
                });
            }
        }

        let estimate = self.cascade.provider.route(origin, dest)?;
        self.cascade.cache.set(
            &route_key,
            json!({"duration_s": estimate.duration_s, "distance_m": estimate.distance_m}),
            Some(self.cascade.cache_ttl),
        );
        Ok(estimate)
    }
}

#[cfg(test)]
#[path = "cascade_tests.rs"]
mod tests;
