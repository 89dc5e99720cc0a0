//! Storage for encoded fields.
//!
//! Provides:
//! - The on-disk dataset (`{root}/{parameter}/{YYYYMMDD}_{HH}z.bin`) with
//!   atomic commits
//! - A timestep membership view rebuilt by scanning file names

pub mod dataset;
pub mod error;
pub mod timestep_store;

pub use dataset::{Dataset, DatasetSummary};
pub use error::{StoreError, StoreResult};
pub use timestep_store::{intersect_all, TimestepStore};
