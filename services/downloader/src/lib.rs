//! ECMWF open-data field downloader.
//!
//! Keeps a dataset of half-precision global fields covering
//! `[today - delta, today + delta]`:
//! - analysis (lead 0) fields for every cycle that has already run
//! - forecast steps of the latest fully published run for the rest
//!
//! Fields are fetched by byte range using the archive's per-step index,
//! wrapped to `(721, 1441)` and written atomically as
//! `{output_dir}/{parameter}/{YYYYMMDD}_{HH}z.bin`.

pub mod archive;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gapfill;
pub mod orchestrator;

pub use archive::{EcmwfArchive, FetchedField, FieldSource, IndexEntry, RunArchive, StepIndex};
pub use config::{Config, ParameterConfig};
pub use discovery::RunDiscovery;
pub use error::{ArchiveError, ArchiveResult};
pub use gapfill::{plan, target_count, GapFillPlan, DEFAULT_MAX_LEAD_HOURS, MAX_FORECAST_LEAD_HOURS};
pub use orchestrator::{Orchestrator, PhaseCounts, SweepOptions, SweepReport};
