// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers and proptest strategies for this crate's tests and for
//! dependent crates (behind the `test-support` feature).

use crate::geo::seconds_to_hhmm;
use crate::stop::{Stop, StopBuilder};

/// Build `n` routable stops spread on a small grid around the default depot.
pub fn grid_stops(n: usize) -> Vec<Stop> {
    (0..n)
        .map(|i| {
            StopBuilder::default()
                .stop_ref(format!("S{}", i + 1))
                .address(format!("{} Grid Street", i + 1))
                .lat(Some(1.30 + 0.01 * ((i % 5) as f64 + 1.0)))
                .lon(Some(103.80 + 0.01 * ((i / 5) as f64 + 1.0)))
                .build()
        })
        .collect()
}

/// A stop with an arrival window expressed in seconds since midnight.
pub fn windowed_stop(stop_ref: &str, start_s: u32, end_s: u32) -> Stop {
    StopBuilder::default()
        .stop_ref(stop_ref)
        .tw_start(seconds_to_hhmm(start_s))
        .tw_end(seconds_to_hhmm(end_s))
        .build()
}

#[cfg(any(test, feature = "test-support"))]
pub mod strategies {
    use proptest::prelude::*;

    /// Sequences of raw progress reports as a unit might emit them,
    /// including regressions the store must clamp away.
    pub fn progress_reports() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(0u8..=120, 1..40)
    }

    /// Plausible Singapore-ish coordinates.
    pub fn lat_lon() -> impl Strategy<Value = (f64, f64)> {
        (1.2f64..1.5, 103.6f64..104.1)
    }
}
