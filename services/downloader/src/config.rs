//! Downloader configuration.
//!
//! Loaded from a YAML file (default `config/ecmwf.yaml`). Every field has a
//! default, so a partial file only overrides what it names.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use field_common::{Cycle, ForecastStep};

use crate::gapfill::MAX_FORECAST_LEAD_HOURS;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Dataset root; one sub-directory per parameter.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default = "default_parameters")]
    pub parameters: Vec<ParameterConfig>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub gap_fill: GapFillConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/data")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            archive: ArchiveConfig::default(),
            parameters: default_parameters(),
            discovery: DiscoveryConfig::default(),
            gap_fill: GapFillConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Remote archive location and object naming.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// HTTP endpoint serving index and GRIB objects.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// S3 bucket used for cycle listing.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Object path without extension. Placeholders: `{date}`, `{cycle}`,
    /// `{hour}`, `{lead}`, `{stream}`.
    #[serde(default = "default_path_template")]
    pub path_template: String,
    /// Stream of the 00z and 12z runs.
    #[serde(default = "default_main_stream")]
    pub main_stream: String,
    /// Stream of the 06z and 18z runs.
    #[serde(default = "default_short_stream")]
    pub short_stream: String,
}

fn default_base_url() -> String {
    "https://ecmwf-forecasts.s3.eu-central-1.amazonaws.com".to_string()
}

fn default_bucket() -> String {
    "ecmwf-forecasts".to_string()
}

fn default_region() -> String {
    "eu-central-1".to_string()
}

fn default_path_template() -> String {
    "{date}/{cycle}/ifs/0p25/{stream}/{date}{hour}0000-{lead}h-{stream}-fc".to_string()
}

fn default_main_stream() -> String {
    "oper".to_string()
}

fn default_short_stream() -> String {
    "scda".to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bucket: default_bucket(),
            region: default_region(),
            path_template: default_path_template(),
            main_stream: default_main_stream(),
            short_stream: default_short_stream(),
        }
    }
}

impl ArchiveConfig {
    pub fn stream_for(&self, cycle: Cycle) -> &str {
        match cycle {
            Cycle::Z00 | Cycle::Z12 => &self.main_stream,
            Cycle::Z06 | Cycle::Z18 => &self.short_stream,
        }
    }

    /// Object path of a step, without extension.
    pub fn object_stem(&self, step: ForecastStep) -> String {
        self.path_template
            .replace("{date}", &step.run.date_label())
            .replace("{cycle}", step.run.cycle.label())
            .replace("{hour}", &format!("{:02}", step.run.cycle.hour()))
            .replace("{lead}", &step.lead_hours.to_string())
            .replace("{stream}", self.stream_for(step.run.cycle))
    }

    pub fn index_url(&self, step: ForecastStep) -> String {
        format!("{}/{}.index", self.base_url.trim_end_matches('/'), self.object_stem(step))
    }

    pub fn grib_url(&self, step: ForecastStep) -> String {
        format!("{}/{}.grib2", self.base_url.trim_end_matches('/'), self.object_stem(step))
    }
}

/// A stored parameter and how to find it in the archive index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParameterConfig {
    /// Dataset directory name, e.g. `temp2m`.
    pub name: String,
    /// ECMWF short name, e.g. `2t`.
    pub code: String,
    #[serde(default = "default_levtype")]
    pub levtype: String,
}

fn default_levtype() -> String {
    "sfc".to_string()
}

impl ParameterConfig {
    pub fn new(name: &str, code: &str, levtype: &str) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            levtype: levtype.to_string(),
        }
    }
}

fn default_parameters() -> Vec<ParameterConfig> {
    vec![
        ParameterConfig::new("temp2m", "2t", "sfc"),
        ParameterConfig::new("wind10m_u", "10u", "sfc"),
        ParameterConfig::new("wind10m_v", "10v", "sfc"),
    ]
}

/// Latest-run discovery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// How many days before today to search.
    #[serde(default = "default_max_days_back")]
    pub max_days_back: u32,
    /// Lead time that must be published before a run counts as available.
    #[serde(default = "default_probe_lead_hours")]
    pub probe_lead_hours: u32,
    /// Parameter probed for; the first configured parameter when unset.
    #[serde(default)]
    pub reference_parameter: Option<String>,
}

fn default_max_days_back() -> u32 {
    3
}

fn default_probe_lead_hours() -> u32 {
    144
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_days_back: default_max_days_back(),
            probe_lead_hours: default_probe_lead_hours(),
            reference_parameter: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GapFillConfig {
    #[serde(default = "default_max_lead_hours")]
    pub max_lead_hours: u32,
}

fn default_max_lead_hours() -> u32 {
    240
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            max_lead_hours: default_max_lead_hours(),
        }
    }
}

/// Per-call network time budgets, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_listing_secs")]
    pub listing_secs: u64,
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
    #[serde(default = "default_field_secs")]
    pub field_secs: u64,
}

fn default_listing_secs() -> u64 {
    30
}

fn default_probe_secs() -> u64 {
    10
}

fn default_field_secs() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            listing_secs: default_listing_secs(),
            probe_secs: default_probe_secs(),
            field_secs: default_field_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn listing(&self) -> Duration {
        Duration::from_secs(self.listing_secs)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn field(&self) -> Duration {
        Duration::from_secs(self.field_secs)
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        debug!(path = %path.display(), parameters = config.parameters.len(), "Loaded config");
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        info!(
            path = %path.display(),
            parameters = ?config.parameter_names(),
            output_dir = %config.output_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.parameters.is_empty() {
            bail!("at least one parameter must be configured");
        }

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                bail!("duplicate parameter name {:?}", parameter.name);
            }
        }

        if let Some(reference) = &self.discovery.reference_parameter {
            if !seen.contains(reference.as_str()) {
                bail!("reference parameter {:?} is not configured", reference);
            }
        }

        if self.discovery.probe_lead_hours % 6 != 0 {
            bail!(
                "probe_lead_hours must be a multiple of 6, got {}",
                self.discovery.probe_lead_hours
            );
        }

        let max_lead = self.gap_fill.max_lead_hours;
        if max_lead % 6 != 0 || max_lead > MAX_FORECAST_LEAD_HOURS {
            bail!(
                "max_lead_hours must be a multiple of 6 no greater than {}, got {}",
                MAX_FORECAST_LEAD_HOURS,
                max_lead
            );
        }

        Ok(())
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// The parameter whose presence marks a probed lead as published.
    pub fn reference_parameter(&self) -> Option<&ParameterConfig> {
        match &self.discovery.reference_parameter {
            Some(name) => self.parameters.iter().find(|p| &p.name == name),
            None => self.parameters.first(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::ModelRun;
    use test_utils::model_run;

    fn step(run: ModelRun, lead: u32) -> ForecastStep {
        run.step(lead)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.parameter_names(), vec!["temp2m", "wind10m_u", "wind10m_v"]);
        assert_eq!(config.discovery.probe_lead_hours, 144);
        assert_eq!(config.gap_fill.max_lead_hours, 240);
        assert_eq!(config.timeouts.field(), Duration::from_secs(60));
        assert_eq!(config.reference_parameter().unwrap().code, "2t");
        config.validate().unwrap();
    }

    #[test]
    fn test_object_paths() {
        let archive = ArchiveConfig::default();

        let oper = step(model_run(2025, 10, 28, Cycle::Z00), 0);
        assert_eq!(
            archive.index_url(oper),
            "https://ecmwf-forecasts.s3.eu-central-1.amazonaws.com/20251028/00z/ifs/0p25/oper/20251028000000-0h-oper-fc.index"
        );

        let scda = step(model_run(2025, 10, 28, Cycle::Z18), 48);
        assert_eq!(
            archive.grib_url(scda),
            "https://ecmwf-forecasts.s3.eu-central-1.amazonaws.com/20251028/18z/ifs/0p25/scda/20251028180000-48h-scda-fc.grib2"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
output_dir: /data/fields
parameters:
  - name: temp2m
    code: 2t
  - name: mslp
    code: msl
discovery:
  max_days_back: 5
  reference_parameter: mslp
timeouts:
  field_secs: 120
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/data/fields"));
        assert_eq!(config.parameters[1], ParameterConfig::new("mslp", "msl", "sfc"));
        assert_eq!(config.discovery.max_days_back, 5);
        assert_eq!(config.discovery.probe_lead_hours, 144);
        assert_eq!(config.reference_parameter().unwrap().name, "mslp");
        assert_eq!(config.timeouts.field_secs, 120);
        assert_eq!(config.timeouts.probe_secs, 10);
        assert_eq!(config.archive.bucket, "ecmwf-forecasts");
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let mut config = Config::default();
        config.parameters.push(ParameterConfig::new("temp2m", "2t", "sfc"));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.parameters.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.discovery.reference_parameter = Some("snow".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.discovery.probe_lead_hours = 100;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gap_fill.max_lead_hours = 250;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gap_fill.max_lead_hours = u32::MAX - 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gap_fill.max_lead_hours = MAX_FORECAST_LEAD_HOURS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = test_utils::temp_test_dir();
        let config = Config::load_or_default(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.parameters.len(), 3);
    }
}
