// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `rp plan` command: load stops, run the pipeline, print the plan.

use crate::output;
use anyhow::Context;
use clap::Args;
use rp_core::{GeocodeStatus, OptimizePayload, Settings, Stop, StopId, SystemClock};
use rp_engine::{hermetic_runtime, Dispatcher, WorkerPool};
use rp_eta::{DisabledTraffic, HaversineProvider};
use rp_storage::PlanStore;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DATASET_ID: u64 = 1;

#[derive(Args)]
pub struct PlanArgs {
    /// JSON stops file: an array of {stop_ref, address, lat, lon, ...}.
    pub stops: PathBuf,
    #[arg(long, default_value_t = 1.3521)]
    pub depot_lat: f64,
    #[arg(long, default_value_t = 103.8198)]
    pub depot_lon: f64,
    #[arg(long, default_value_t = 2)]
    pub vehicles: u32,
    #[arg(long)]
    pub capacity: Option<u32>,
    #[arg(long, default_value = "08:00")]
    pub workday_start: String,
    #[arg(long, default_value = "18:00")]
    pub workday_end: String,
    #[arg(long, default_value_t = 10)]
    pub time_limit_s: u32,
    /// Fail instead of dropping stops that cannot be served.
    #[arg(long)]
    pub no_drop_visits: bool,
    #[arg(long, default_value_t = 2)]
    pub workers: usize,
    /// Settings TOML; defaults plus environment overrides when omitted.
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Directory for matrix artifacts.
    #[arg(long, default_value = ".routepilot")]
    pub artifact_dir: PathBuf,
}

/// Stops file row. Coordinates are optional; rows without them will fail
/// geocoding and be excluded from routing.
#[derive(Deserialize)]
struct StopSpec {
    stop_ref: String,
    address: String,
    lat: Option<f64>,
    lon: Option<f64>,
    tw_start: Option<String>,
    tw_end: Option<String>,
    #[serde(default)]
    service_time_min: u32,
    #[serde(default)]
    demand: u32,
}

impl StopSpec {
    fn into_stop(self) -> Stop {
        Stop {
            id: StopId::new(),
            stop_ref: self.stop_ref,
            address: self.address,
            lat: self.lat,
            lon: self.lon,
            tw_start: self.tw_start,
            tw_end: self.tw_end,
            service_time_min: self.service_time_min,
            demand: self.demand,
            geocode_status: GeocodeStatus::Pending,
        }
    }
}

pub async fn run(args: PlanArgs) -> anyhow::Result<()> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => {
            let mut settings = Settings::default();
            settings.apply_env();
            settings
        }
    };

    let raw = std::fs::read_to_string(&args.stops)
        .with_context(|| format!("reading stops file {}", args.stops.display()))?;
    let specs: Vec<StopSpec> = serde_json::from_str(&raw).context("parsing stops file")?;
    anyhow::ensure!(!specs.is_empty(), "stops file is empty");

    let (runtime, datasets, queue) = hermetic_runtime(
        settings,
        &args.artifact_dir,
        Arc::new(HaversineProvider::new()),
        Arc::new(DisabledTraffic),
        SystemClock,
    );
    datasets.put_dataset(
        DATASET_ID,
        specs.into_iter().map(StopSpec::into_stop).collect(),
    );

    let dispatcher = Dispatcher::new(Arc::clone(&runtime));
    let job = dispatcher.submit_optimize(OptimizePayload {
        dataset_id: DATASET_ID,
        depot_lat: args.depot_lat,
        depot_lon: args.depot_lon,
        num_vehicles: args.vehicles,
        capacity: args.capacity,
        workday_start: args.workday_start.clone(),
        workday_end: args.workday_end.clone(),
        solver_time_limit_s: args.time_limit_s,
        allow_drop_visits: !args.no_drop_visits,
        use_live_traffic: false,
    })?;
    println!("submitted job {}", job.id);

    let pool = WorkerPool::spawn(Arc::clone(&dispatcher), queue.clone(), args.workers);
    let deadline = Duration::from_secs(args.time_limit_s as u64 + 60);
    let job = rp_engine::watch_until_terminal(&runtime.store, &job.id, deadline).await?;
    queue.close();
    pool.shutdown().await;

    output::print_job(&job);
    if let Some(plan) = runtime.plans.latest_for_dataset(DATASET_ID) {
        output::print_plan(&plan);
    }

    anyhow::ensure!(
        job.status == rp_core::JobStatus::Succeeded,
        "job finished with status {}",
        job.status
    );
    Ok(())
}
