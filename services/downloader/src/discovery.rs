//! Latest-run discovery.
//!
//! A run's index can appear before all of its lead times are uploaded, so a
//! run only counts as available once a deep lead (`probe_lead_hours`) is
//! online.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use field_common::{Cycle, ModelRun};

use crate::archive::RunArchive;
use crate::error::ArchiveResult;

pub struct RunDiscovery<'a> {
    archive: &'a dyn RunArchive,
    probe_lead_hours: u32,
}

impl<'a> RunDiscovery<'a> {
    pub fn new(archive: &'a dyn RunArchive, probe_lead_hours: u32) -> Self {
        Self {
            archive,
            probe_lead_hours,
        }
    }

    /// Published cycles of `date`, earliest first.
    pub async fn list_cycles(&self, date: NaiveDate) -> ArchiveResult<Vec<Cycle>> {
        self.archive.list_cycles(date).await
    }

    pub async fn has_forecast_data(&self, date: NaiveDate, cycle: Cycle, probe_lead_hours: u32) -> bool {
        let step = ModelRun::new(date, cycle).step(probe_lead_hours);
        self.archive.has_forecast_data(step).await
    }

    /// Most recent run with its probe lead online.
    ///
    /// Dates are searched from `now`'s date back `max_days_back` days, and
    /// each date's published cycles from latest to earliest. A date whose
    /// listing fails is skipped. Runs initialized after `now` are never
    /// probed. `None` means nothing was found, which is not an error.
    #[instrument(skip(self), fields(probe_lead_hours = self.probe_lead_hours))]
    pub async fn discover_latest_run(&self, now: DateTime<Utc>, max_days_back: u32) -> Option<ModelRun> {
        let today = now.date_naive();

        for days_back in 0..=max_days_back {
            let date = today - Duration::days(days_back as i64);

            let cycles = match self.list_cycles(date).await {
                Ok(cycles) => cycles,
                Err(e) => {
                    warn!(date = %date, error = %e, "No listing for date, skipping");
                    continue;
                }
            };

            for &cycle in cycles.iter().rev() {
                let run = ModelRun::new(date, cycle);
                if run.instant() > now {
                    continue;
                }
                if self.has_forecast_data(date, cycle, self.probe_lead_hours).await {
                    info!(run = %run, "Discovered latest run");
                    return Some(run);
                }
                debug!(run = %run, "Run not fully published");
            }
        }

        None
    }
}
