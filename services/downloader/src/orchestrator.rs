//! End-to-end acquisition sweep.
//!
//! 1. Analysis backfill: lead 0 of every cycle in `[today - delta, today]`.
//! 2. Rescan the dataset and count timesteps complete across parameters.
//! 3. Discover the latest fully published run.
//! 4. Plan forecast steps of that run to reach `(2 * delta + 1) * 4`
//!    timesteps and fetch them.
//!
//! A single failed field never stops the sweep. It is logged, counted and
//! left for the next scheduled run. Neither does a failed rescan, which
//! counts as no coverage.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use ndarray::Array2;
use tracing::{debug, info, instrument, warn};

use dataset_store::{Dataset, DatasetSummary, TimestepStore};
use field_common::{Cycle, ForecastStep, ModelRun, Timestep};

use crate::archive::{FieldSource, RunArchive};
use crate::config::{Config, ParameterConfig};
use crate::discovery::RunDiscovery;
use crate::gapfill::{self, GapFillPlan};

/// Knobs of a single sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Half-window in days.
    pub delta_days: u32,
    /// Re-download analysis fields whose file already exists. Forecast
    /// steps only ever fill missing files.
    pub force: bool,
    pub max_days_back: u32,
    pub probe_lead_hours: u32,
    pub max_lead_hours: u32,
}

impl SweepOptions {
    pub fn from_config(config: &Config, delta_days: u32, force: bool) -> Self {
        Self {
            delta_days,
            force,
            max_days_back: config.discovery.max_days_back,
            probe_lead_hours: config.discovery.probe_lead_hours,
            max_lead_hours: config.gap_fill.max_lead_hours,
        }
    }
}

/// Per-phase field counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    /// Fields fetched, encoded and committed.
    pub written: usize,
    /// Fields skipped because their file already existed.
    pub present: usize,
    /// Fields that failed to fetch, decode, encode or commit.
    pub failed: usize,
    /// Timesteps skipped because their cycle has not started yet.
    pub future: usize,
}

impl PhaseCounts {
    pub fn available(&self) -> usize {
        self.written + self.present
    }
}

/// What a sweep achieved.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub analysis: PhaseCounts,
    pub run: Option<ModelRun>,
    pub target_count: usize,
    pub plan: GapFillPlan,
    pub forecast: PhaseCounts,
    /// Timesteps in the window complete across every parameter.
    pub complete_timesteps: usize,
    pub dataset: DatasetSummary,
}

impl SweepReport {
    /// False only when no analysis field is on disk and no run was found.
    pub fn has_usable_output(&self) -> bool {
        self.analysis.available() > 0 || self.run.is_some()
    }
}

pub struct Orchestrator<'a> {
    archive: &'a dyn RunArchive,
    source: &'a dyn FieldSource,
    dataset: Dataset,
    parameters: Vec<ParameterConfig>,
    options: SweepOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        archive: &'a dyn RunArchive,
        source: &'a dyn FieldSource,
        dataset: Dataset,
        parameters: Vec<ParameterConfig>,
        options: SweepOptions,
    ) -> Self {
        Self {
            archive,
            source,
            dataset,
            parameters,
            options,
        }
    }

    fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// First instant of the window: 00z of `today - delta`.
    fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let first_day = now.date_naive() - Duration::days(self.options.delta_days as i64);
        Utc.from_utc_datetime(&first_day.and_time(NaiveTime::default()))
    }

    /// Run a full sweep as of `now`.
    #[instrument(skip(self), fields(delta_days = self.options.delta_days, force = self.options.force))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport {
            target_count: gapfill::target_count(self.options.delta_days),
            ..Default::default()
        };

        info!(
            root = %self.dataset.root().display(),
            parameters = ?self.parameter_names(),
            target_count = report.target_count,
            "Starting acquisition sweep"
        );

        self.backfill_analysis(now, &mut report.analysis).await;
        info!(
            written = report.analysis.written,
            present = report.analysis.present,
            failed = report.analysis.failed,
            future = report.analysis.future,
            "Analysis phase complete"
        );

        let window_start = self.window_start(now);
        let existing = self.complete_in_window(window_start);
        info!(complete = existing.len(), target = report.target_count, "Dataset coverage after analysis");

        let discovery = RunDiscovery::new(self.archive, self.options.probe_lead_hours);
        report.run = discovery
            .discover_latest_run(now, self.options.max_days_back)
            .await;

        match report.run {
            None => {
                warn!(
                    complete = existing.len(),
                    target = report.target_count,
                    max_days_back = self.options.max_days_back,
                    "No published run found, keeping analysis-only coverage"
                );
            }
            Some(run) => {
                report.plan = gapfill::plan(
                    run,
                    &existing,
                    window_start,
                    report.target_count,
                    self.options.max_lead_hours,
                );
                info!(
                    run = %run,
                    planned = report.plan.steps.len(),
                    shortfall = report.plan.shortfall,
                    "Planned forecast gap fill"
                );
                if report.plan.shortfall > 0 {
                    warn!(
                        shortfall = report.plan.shortfall,
                        max_lead_hours = self.options.max_lead_hours,
                        "Forecast horizon exhausted before reaching target"
                    );
                }

                for &step in &report.plan.steps {
                    let Some(target) = step.target() else {
                        continue;
                    };
                    self.acquire(step, target, false, &mut report.forecast).await;
                }
                info!(
                    written = report.forecast.written,
                    present = report.forecast.present,
                    failed = report.forecast.failed,
                    "Forecast phase complete"
                );
            }
        }

        report.complete_timesteps = self.complete_in_window(window_start).len();
        report.dataset = match self.dataset.summary(&self.parameter_names()) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Failed to summarize dataset");
                DatasetSummary::default()
            }
        };

        info!(
            complete = report.complete_timesteps,
            target = report.target_count,
            files = report.dataset.files,
            total_mb = format!("{:.1}", report.dataset.total_bytes as f64 / 1024.0 / 1024.0),
            "Acquisition sweep complete"
        );

        Ok(report)
    }

    /// Lead 0 of every cycle in the window that has already started.
    async fn backfill_analysis(&self, now: DateTime<Utc>, counts: &mut PhaseCounts) {
        let today = now.date_naive();

        for days_back in (0..=self.options.delta_days).rev() {
            let date = today - Duration::days(days_back as i64);
            for &cycle in Cycle::all() {
                let run = ModelRun::new(date, cycle);
                if run.instant() > now {
                    debug!(run = %run, "Cycle not started yet, skipping");
                    counts.future += 1;
                    continue;
                }
                self.acquire(run.step(0), run.analysis(), self.options.force, counts)
                    .await;
            }
        }
    }

    /// Timesteps at or after `start` that every parameter has. A failed
    /// scan yields the empty set.
    fn complete_in_window(&self, start: DateTime<Utc>) -> HashSet<Timestep> {
        let store = match TimestepStore::scan(&self.dataset, &self.parameter_names()) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Failed to scan dataset, assuming no coverage");
                return HashSet::new();
            }
        };

        store
            .complete()
            .into_iter()
            .filter(|ts| ts.instant() >= start)
            .collect()
    }

    /// Fetch and commit every missing parameter of `step` onto `target`, or
    /// every parameter when `overwrite` is set.
    async fn acquire(
        &self,
        step: ForecastStep,
        target: Timestep,
        overwrite: bool,
        counts: &mut PhaseCounts,
    ) {
        let wanted: Vec<ParameterConfig> = self
            .parameters
            .iter()
            .filter(|p| overwrite || !self.dataset.exists(&p.name, target))
            .cloned()
            .collect();

        counts.present += self.parameters.len() - wanted.len();
        if wanted.is_empty() {
            debug!(step = %step, target = %target, "All parameters present");
            return;
        }

        let fields = match self.source.fetch_step(step, &wanted).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(step = %step, error = %e, "Failed to fetch step");
                counts.failed += wanted.len();
                return;
            }
        };

        let returned = fields.len();
        for field in fields {
            let stored = field
                .result
                .map_err(anyhow::Error::from)
                .and_then(|raw| self.store_field(&field.parameter, target, &raw));

            match stored {
                Ok(path) => {
                    info!(
                        parameter = %field.parameter,
                        step = %step,
                        path = %path.display(),
                        "Stored field"
                    );
                    counts.written += 1;
                }
                Err(e) => {
                    warn!(
                        parameter = %field.parameter,
                        step = %step,
                        error = %format!("{:#}", e),
                        "Skipping field"
                    );
                    counts.failed += 1;
                }
            }
        }
        counts.failed += wanted.len().saturating_sub(returned);
    }

    fn store_field(&self, parameter: &str, target: Timestep, raw: &Array2<f32>) -> Result<PathBuf> {
        let grid = grid_codec::wrap(raw)?;

        let stats = grid.stats();
        debug!(
            parameter = %parameter,
            timestep = %target,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            nan_count = stats.nan_count,
            "Field statistics"
        );

        let encoded = grid_codec::encode(&grid);
        let path = self.dataset.commit(parameter, target, &encoded)?;
        Ok(path)
    }
}
