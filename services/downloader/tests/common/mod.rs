//! Stub archive and field source for downloader integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use ecmwf_downloader::{
    ArchiveError, ArchiveResult, FetchedField, FieldSource, ParameterConfig, RunArchive,
};
use field_common::{Cycle, ForecastStep, ModelRun};
use test_utils::{create_constant_field, create_field_with_shape, params};

pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test instant")
}

pub fn default_parameters() -> Vec<ParameterConfig> {
    vec![
        ParameterConfig::new(params::TEMP_2M, "2t", "sfc"),
        ParameterConfig::new(params::WIND_10M_U, "10u", "sfc"),
        ParameterConfig::new(params::WIND_10M_V, "10v", "sfc"),
    ]
}

/// Archive with a fixed listing and a fixed set of published steps.
#[derive(Default)]
pub struct StubArchive {
    cycles: HashMap<NaiveDate, Vec<Cycle>>,
    unavailable: HashSet<NaiveDate>,
    published: HashSet<ForecastStep>,
    probes: Mutex<Vec<ForecastStep>>,
}

impl StubArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cycles(mut self, date: NaiveDate, cycles: &[Cycle]) -> Self {
        self.cycles.insert(date, cycles.to_vec());
        self
    }

    pub fn with_unavailable(mut self, date: NaiveDate) -> Self {
        self.unavailable.insert(date);
        self
    }

    pub fn publish(mut self, run: ModelRun, lead_hours: u32) -> Self {
        self.published.insert(run.step(lead_hours));
        self
    }

    /// Steps probed so far, in order.
    pub fn probed(&self) -> Vec<ForecastStep> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunArchive for StubArchive {
    async fn list_cycles(&self, date: NaiveDate) -> ArchiveResult<Vec<Cycle>> {
        if self.unavailable.contains(&date) {
            return Err(ArchiveError::Unavailable(format!("no listing for {date}")));
        }
        Ok(self.cycles.get(&date).cloned().unwrap_or_default())
    }

    async fn has_forecast_data(&self, step: ForecastStep) -> bool {
        self.probes.lock().unwrap().push(step);
        self.published.contains(&step)
    }
}

/// Field source returning a constant global field, with injectable failures.
pub struct StubSource {
    value: f32,
    failing_steps: HashSet<ForecastStep>,
    failing_fields: HashSet<(ForecastStep, String)>,
    bad_shape: HashSet<String>,
    calls: Mutex<Vec<(ForecastStep, Vec<String>)>>,
}

impl StubSource {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            failing_steps: HashSet::new(),
            failing_fields: HashSet::new(),
            bad_shape: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The whole step fails, as when its index cannot be fetched.
    pub fn fail_step(mut self, step: ForecastStep) -> Self {
        self.failing_steps.insert(step);
        self
    }

    pub fn fail_field(mut self, step: ForecastStep, parameter: &str) -> Self {
        self.failing_fields.insert((step, parameter.to_string()));
        self
    }

    /// Every field of `parameter` comes back with the wrong shape.
    pub fn bad_shape(mut self, parameter: &str) -> Self {
        self.bad_shape.insert(parameter.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(ForecastStep, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetched_steps(&self) -> Vec<ForecastStep> {
        self.calls().into_iter().map(|(step, _)| step).collect()
    }
}

#[async_trait]
impl FieldSource for StubSource {
    async fn fetch_step(
        &self,
        step: ForecastStep,
        parameters: &[ParameterConfig],
    ) -> ArchiveResult<Vec<FetchedField>> {
        self.calls.lock().unwrap().push((
            step,
            parameters.iter().map(|p| p.name.clone()).collect(),
        ));

        if self.failing_steps.contains(&step) {
            return Err(ArchiveError::Status {
                url: format!("stub://{step}.index"),
                status: 404,
            });
        }

        Ok(parameters
            .iter()
            .map(|p| {
                let result = if self.failing_fields.contains(&(step, p.name.clone())) {
                    Err(ArchiveError::Timeout {
                        url: format!("stub://{step}.grib2"),
                        secs: 60,
                    })
                } else if self.bad_shape.contains(&p.name) {
                    Ok(create_field_with_shape(721, 1441))
                } else {
                    Ok(create_constant_field(self.value))
                };
                FetchedField {
                    parameter: p.name.clone(),
                    result,
                }
            })
            .collect())
    }
}
