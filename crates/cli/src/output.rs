// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal rendering for job and plan summaries.

use rp_core::{seconds_to_hhmm, Job, Plan};

pub fn print_job(job: &Job) {
    println!();
    println!(
        "job {}  status={}  progress={}%  step={}",
        job.id,
        job.status,
        job.progress_pct,
        job.current_step
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    if let Some(code) = job.error_code {
        println!("error: {code}");
        if let Some(detail) = &job.error_detail {
            println!("  {detail}");
        }
    }
    for (step, state) in &job.steps {
        let reclaims = if state.stale_reclaimed > 0 {
            format!("  (reclaimed x{})", state.stale_reclaimed)
        } else {
            String::new()
        };
        println!("  {:<17} {}{}", step.to_string(), state.status, reclaims);
    }
}

pub fn print_plan(plan: &Plan) {
    println!();
    println!(
        "plan {}  status={}  eta_source={}  makespan={}",
        plan.id,
        plan.status,
        plan.eta_source,
        format_duration(plan.makespan_s),
    );
    if let Some(reason) = &plan.infeasibility_reason {
        println!("infeasible: {reason}");
        for suggestion in &plan.suggestions {
            println!("  - {suggestion}");
        }
        return;
    }

    for route in &plan.routes {
        println!(
            "  vehicle {}  stops={}  travel={}  service={}  waiting={}  total={}",
            route.vehicle_idx,
            route.stop_count(),
            format_duration(route.travel_time_s),
            format_duration(route.service_time_s),
            format_duration(route.waiting_time_s),
            format_duration(route.duration_s),
        );
        for stop in &route.stops {
            let label = stop
                .stop_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "DEPOT".to_string());
            println!(
                "    {:>2}. {:<26} eta={}",
                stop.sequence_idx,
                label,
                seconds_to_hhmm(stop.arrival_s),
            );
        }
    }
    if !plan.unserved_stop_ids.is_empty() {
        println!("  unserved: {} stop(s)", plan.unserved_stop_ids.len());
    }
}

fn format_duration(seconds: u32) -> String {
    format!("{}h{:02}m", seconds / 3600, (seconds % 3600) / 60)
}
