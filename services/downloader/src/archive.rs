//! Access to the ECMWF open-data archive.
//!
//! Two capabilities are split into traits so that discovery and the
//! orchestrator can run against stubs:
//! - [`RunArchive`]: which cycles of a date are published, and whether a
//!   given lead is already online.
//! - [`FieldSource`]: the decoded fields of one forecast step.
//!
//! Every step has a JSON-lines index next to its GRIB2 object. Each index
//! line names one message with its byte offset and length, so a parameter is
//! fetched with a single `Range` request instead of downloading the whole
//! step file.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use chrono::NaiveDate;
use ndarray::Array2;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use field_common::{Cycle, ForecastStep};

use crate::config::{ArchiveConfig, Config, ParameterConfig, TimeoutConfig};
use crate::error::{ArchiveError, ArchiveResult};

/// Run-level publication state of the archive.
#[async_trait]
pub trait RunArchive: Send + Sync {
    /// Cycles of `date` with any published content, earliest first.
    async fn list_cycles(&self, date: NaiveDate) -> ArchiveResult<Vec<Cycle>>;

    /// Whether `step` is online for the reference parameter. Any failure
    /// reads as "not published".
    async fn has_forecast_data(&self, step: ForecastStep) -> bool;
}

/// Outcome of fetching one parameter of a step.
#[derive(Debug)]
pub struct FetchedField {
    pub parameter: String,
    pub result: ArchiveResult<Array2<f32>>,
}

/// Decoded source fields.
#[async_trait]
pub trait FieldSource: Send + Sync {
    /// Fetch `parameters` of `step`. The outer error means nothing of the
    /// step could be fetched; otherwise there is one entry per parameter, in
    /// order.
    async fn fetch_step(
        &self,
        step: ForecastStep,
        parameters: &[ParameterConfig],
    ) -> ArchiveResult<Vec<FetchedField>>;
}

/// One message of a step index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexEntry {
    pub param: String,
    #[serde(default)]
    pub levtype: String,
    #[serde(rename = "_offset")]
    pub offset: u64,
    #[serde(rename = "_length")]
    pub length: u64,
}

impl IndexEntry {
    /// Inclusive HTTP byte range of the message.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.offset, self.offset + self.length - 1)
    }
}

/// Parsed index of a single step.
#[derive(Debug, Clone)]
pub struct StepIndex {
    url: String,
    entries: Vec<IndexEntry>,
}

impl StepIndex {
    pub fn parse(url: &str, text: &str) -> ArchiveResult<Self> {
        let mut entries = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: IndexEntry =
                serde_json::from_str(line).map_err(|e| ArchiveError::MalformedIndex {
                    url: url.to_string(),
                    message: format!("line {}: {}", number + 1, e),
                })?;
            if entry.length == 0 {
                return Err(ArchiveError::MalformedIndex {
                    url: url.to_string(),
                    message: format!("line {}: zero-length message", number + 1),
                });
            }
            entries.push(entry);
        }

        Ok(Self {
            url: url.to_string(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, parameter: &ParameterConfig) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.param == parameter.code && e.levtype == parameter.levtype)
    }

    fn entry_for(&self, parameter: &ParameterConfig) -> ArchiveResult<&IndexEntry> {
        self.find(parameter).ok_or_else(|| ArchiveError::MissingEntry {
            url: self.url.clone(),
            code: parameter.code.clone(),
            levtype: parameter.levtype.clone(),
        })
    }
}

/// Parse a common prefix such as `20251028/06z/` into its cycle.
pub fn parse_cycle_prefix(date_prefix: &str, common_prefix: &str) -> Option<Cycle> {
    common_prefix
        .strip_prefix(date_prefix)?
        .trim_end_matches('/')
        .parse()
        .ok()
}

/// The ECMWF open-data bucket, read through S3 listing and plain HTTPS.
pub struct EcmwfArchive {
    client: Client,
    s3: aws_sdk_s3::Client,
    archive: ArchiveConfig,
    reference: ParameterConfig,
    timeouts: TimeoutConfig,
}

impl EcmwfArchive {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        // The bucket is public; requests are sent unsigned.
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.archive.region.clone()))
            .no_credentials()
            .load()
            .await;
        let s3 = aws_sdk_s3::Client::new(&aws_config);

        let reference = config
            .reference_parameter()
            .cloned()
            .context("No reference parameter configured")?;

        Ok(Self {
            client,
            s3,
            archive: config.archive.clone(),
            reference,
            timeouts: config.timeouts.clone(),
        })
    }

    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        range: Option<&str>,
    ) -> ArchiveResult<reqwest::Response> {
        let secs = timeout.as_secs();
        let mut request = self.client.get(url).timeout(timeout);
        if let Some(range) = range {
            request = request.header(header::RANGE, range);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ArchiveError::from_reqwest(url, secs, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchiveError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn fetch_index(&self, step: ForecastStep, timeout: Duration) -> ArchiveResult<StepIndex> {
        let url = self.archive.index_url(step);
        let text = self
            .get(&url, timeout, None)
            .await?
            .text()
            .await
            .map_err(|e| ArchiveError::from_reqwest(&url, timeout.as_secs(), e))?;

        let index = StepIndex::parse(&url, &text)?;
        debug!(url = %url, entries = index.len(), "Fetched step index");
        Ok(index)
    }

    /// Download one message by byte range.
    async fn fetch_message(&self, url: &str, entry: &IndexEntry) -> ArchiveResult<Bytes> {
        let timeout = self.timeouts.field();
        let range = entry.range_header();
        let response = self.get(url, timeout, Some(&range)).await?;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(ArchiveError::Transport {
                url: url.to_string(),
                message: format!("range {} not honoured (HTTP {})", range, response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ArchiveError::from_reqwest(url, timeout.as_secs(), e))?;

        if bytes.len() as u64 != entry.length {
            return Err(ArchiveError::Transport {
                url: url.to_string(),
                message: format!("expected {} bytes, received {}", entry.length, bytes.len()),
            });
        }
        Ok(bytes)
    }

    async fn fetch_field(
        &self,
        url: &str,
        index: &StepIndex,
        parameter: &ParameterConfig,
    ) -> ArchiveResult<Array2<f32>> {
        let entry = index.entry_for(parameter)?;
        let message = self.fetch_message(url, entry).await?;
        let field = grid_codec::decode_message(&message)?;

        debug!(
            parameter = %parameter.name,
            bytes = message.len(),
            shape = ?field.dim(),
            "Fetched field"
        );
        Ok(field)
    }
}

#[async_trait]
impl RunArchive for EcmwfArchive {
    #[instrument(skip(self), fields(bucket = %self.archive.bucket))]
    async fn list_cycles(&self, date: NaiveDate) -> ArchiveResult<Vec<Cycle>> {
        let prefix = format!("{}/", date.format("%Y%m%d"));

        let request = self
            .s3
            .list_objects_v2()
            .bucket(&self.archive.bucket)
            .prefix(&prefix)
            .delimiter("/");

        let response = tokio::time::timeout(self.timeouts.listing(), request.send())
            .await
            .map_err(|_| {
                ArchiveError::Unavailable(format!(
                    "listing {} timed out after {}s",
                    prefix, self.timeouts.listing_secs
                ))
            })?
            .map_err(|e| {
                ArchiveError::Unavailable(format!(
                    "listing {} failed: {}",
                    prefix,
                    DisplayErrorContext(&e)
                ))
            })?;

        let mut cycles: Vec<Cycle> = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .filter_map(|p| parse_cycle_prefix(&prefix, p))
            .collect();
        cycles.sort();
        cycles.dedup();

        info!(prefix = %prefix, cycles = ?cycles, "Listed published cycles");
        Ok(cycles)
    }

    #[instrument(skip(self, step), fields(step = %step))]
    async fn has_forecast_data(&self, step: ForecastStep) -> bool {
        match self.fetch_index(step, self.timeouts.probe()).await {
            Ok(index) => {
                let found = index.find(&self.reference).is_some();
                debug!(
                    reference = %self.reference.name,
                    found = found,
                    "Probed step index"
                );
                found
            }
            Err(e) => {
                debug!(error = %e, "Probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl FieldSource for EcmwfArchive {
    #[instrument(skip(self, step, parameters), fields(step = %step))]
    async fn fetch_step(
        &self,
        step: ForecastStep,
        parameters: &[ParameterConfig],
    ) -> ArchiveResult<Vec<FetchedField>> {
        // One index request serves every parameter of the step.
        let index = self.fetch_index(step, self.timeouts.listing()).await?;
        let url = self.archive.grib_url(step);

        let mut fields = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let result = self.fetch_field(&url, &index, parameter).await;
            if let Err(e) = &result {
                warn!(parameter = %parameter.name, error = %e, "Failed to fetch field");
            }
            fields.push(FetchedField {
                parameter: parameter.name.clone(),
                result,
            });
        }
        Ok(fields)
    }
}
