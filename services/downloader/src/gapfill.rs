//! Gap-fill planning.
//!
//! The dataset should hold a fixed number of timesteps. When analysis data
//! does not cover the window, forecast steps of the latest run fill the
//! remaining slots, earliest lead first.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use field_common::{ForecastStep, ModelRun, Timestep};

/// Steps are never planned beyond this lead unless configured otherwise.
pub const DEFAULT_MAX_LEAD_HOURS: u32 = 240;

/// Longest lead the open-data archive publishes.
pub const MAX_FORECAST_LEAD_HOURS: u32 = 360;

const LEAD_STEP_HOURS: u32 = 6;

/// Planned steps and how far short of the target they leave the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapFillPlan {
    pub steps: Vec<ForecastStep>,
    pub shortfall: usize,
}

impl GapFillPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Number of timesteps a `delta_days` half-window should hold.
pub fn target_count(delta_days: u32) -> usize {
    (2 * delta_days as usize + 1) * 4
}

/// Plan the forecast steps of `run` needed to bring `existing` up to
/// `target_count` timesteps.
///
/// `existing` must hold only timesteps complete across every parameter
/// and no earlier than `window_start`. Leads are tried from 6 upwards in
/// steps of 6 up to `max_lead_hours`; leads whose target is off a cycle
/// boundary, before `window_start` or already present are skipped.
pub fn plan(
    run: ModelRun,
    existing: &HashSet<Timestep>,
    window_start: DateTime<Utc>,
    target_count: usize,
    max_lead_hours: u32,
) -> GapFillPlan {
    let mut covered = existing.clone();
    let mut steps = Vec::new();

    for lead in (LEAD_STEP_HOURS..=max_lead_hours).step_by(LEAD_STEP_HOURS as usize) {
        if covered.len() >= target_count {
            break;
        }

        let step = run.step(lead);
        let Some(target) = step.target() else {
            continue;
        };
        if target.instant() < window_start {
            continue;
        }
        if covered.insert(target) {
            steps.push(step);
        }
    }

    GapFillPlan {
        steps,
        shortfall: target_count.saturating_sub(covered.len()),
    }
}
