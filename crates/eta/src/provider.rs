// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing provider seam: base distance/duration for one ordered pair.
//!
//! Outbound calls are paced by a token bucket and retried with capped
//! exponential backoff, but only for transient failures; permanent failures
//! (bad request, auth) propagate immediately.

use parking_lot::Mutex;
use rand::Rng;
use rp_core::LatLon;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Base route for an ordered pair, free of any traffic adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEstimate {
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Quota/network/5xx; worth retrying with backoff.
    Transient,
    /// The request itself is wrong; retrying cannot help.
    Permanent,
}

#[derive(Debug, Error)]
#[error("provider {provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn transient(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            kind: ProviderErrorKind::Permanent,
            message: message.into(),
        }
    }
}

/// Computes a base route for one ordered pair.
pub trait RouteProvider: Send + Sync {
    fn name(&self) -> &str;
    fn route(&self, origin: LatLon, dest: LatLon) -> Result<RouteEstimate, ProviderError>;
}

/// Offline provider: great-circle distance at a fixed urban speed.
///
/// Doubles as the mock mode used when no external routing service is
/// configured, so the whole pipeline runs hermetically.
pub struct HaversineProvider {
    speed_mps: f64,
}

impl HaversineProvider {
    /// ~32 km/h, the same base speed the training pipeline assumes.
    pub const DEFAULT_SPEED_MPS: f64 = 9.0;

    pub fn new() -> Self {
        Self {
            speed_mps: Self::DEFAULT_SPEED_MPS,
        }
    }

    pub fn with_speed(speed_mps: f64) -> Self {
        Self { speed_mps }
    }
}

impl Default for HaversineProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteProvider for HaversineProvider {
    fn name(&self) -> &str {
        "haversine"
    }

    fn route(&self, origin: LatLon, dest: LatLon) -> Result<RouteEstimate, ProviderError> {
        let distance_m = rp_core::haversine_m(origin, dest);
        Ok(RouteEstimate {
            distance_m,
            duration_s: (distance_m / self.speed_mps).max(0.0),
        })
    }
}

/// Token bucket pacing outbound provider calls.
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<(f64, Instant)>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: capacity.max(1) as f64,
            refill_per_sec: refill_per_sec.max(0.001),
            state: Mutex::new((capacity.max(1) as f64, Instant::now())),
        }
    }

    /// Time to wait before one token is available; takes the token.
    fn reserve(&self) -> Duration {
        let mut state = self.state.lock();
        let (tokens, last_refill) = *state;
        let elapsed = last_refill.elapsed().as_secs_f64();
        let tokens = (tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if tokens >= 1.0 {
            *state = (tokens - 1.0, Instant::now());
            return Duration::ZERO;
        }
        let wait = (1.0 - tokens) / self.refill_per_sec;
        *state = (tokens - 1.0, Instant::now());
        Duration::from_secs_f64(wait)
    }

    /// Block the calling worker until a token is granted.
    pub fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

/// Retry knobs, normally sourced from [`rp_core::Settings`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &rp_core::Settings) -> Self {
        Self {
            max_attempts: settings.provider_max_attempts.max(1),
            backoff_base: Duration::from_millis(settings.provider_backoff_base_ms),
            backoff_cap: Duration::from_millis(settings.provider_backoff_cap_ms.max(1)),
        }
    }

    /// Capped exponential backoff with jitter in [50%, 100%] of the slot.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.backoff_cap);
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        exp.mul_f64(jitter)
    }
}

/// Rate-limited, retrying wrapper around any [`RouteProvider`].
pub struct RetryingProvider {
    inner: Arc<dyn RouteProvider>,
    bucket: TokenBucket,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn RouteProvider>, bucket: TokenBucket, policy: RetryPolicy) -> Self {
        Self {
            inner,
            bucket,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn route(&self, origin: LatLon, dest: LatLon) -> Result<RouteEstimate, ProviderError> {
        let mut attempt = 0;
        loop {
            self.bucket.acquire();
            match self.inner.route(origin, dest) {
                Ok(estimate) => return Ok(estimate),
                Err(err) if err.kind == ProviderErrorKind::Transient => {
                    attempt += 1;
                    if attempt >= self.policy.max_attempts {
                        return Err(err);
                    }
                    let backoff = self.policy.backoff(attempt - 1);
                    tracing::warn!(
                        provider = self.inner.name(),
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient provider error, retrying"
                    );
                    std::thread::sleep(backoff);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
