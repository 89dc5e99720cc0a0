//! Common test fixtures for dataset and scheduling tests.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use field_common::{Cycle, ModelRun, Timestep, GRID_HEIGHT, WRAPPED_WIDTH};

/// Parameter names matching the default configuration.
pub mod params {
    pub const TEMP_2M: &str = "temp2m";
    pub const WIND_10M_U: &str = "wind10m_u";
    pub const WIND_10M_V: &str = "wind10m_v";

    /// All default parameters, in configuration order.
    pub const ALL: [&str; 3] = [TEMP_2M, WIND_10M_U, WIND_10M_V];
}

/// Byte length of a stored field file.
pub const FIELD_FILE_LEN: usize = GRID_HEIGHT * WRAPPED_WIDTH * 2;

/// Shorthand for a calendar date in tests.
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Shorthand for a timestep in tests.
pub fn timestep(year: i32, month: u32, day: u32, cycle: Cycle) -> Timestep {
    Timestep::new(date(year, month, day), cycle)
}

/// Shorthand for a model run in tests.
pub fn model_run(year: i32, month: u32, day: u32, cycle: Cycle) -> ModelRun {
    ModelRun::new(date(year, month, day), cycle)
}

/// `count` consecutive timesteps starting at `first`, 6 hours apart.
pub fn consecutive_timesteps(first: Timestep, count: usize) -> Vec<Timestep> {
    (0..count)
        .filter_map(|i| Timestep::from_instant(first.instant() + chrono::Duration::hours(6 * i as i64)))
        .collect()
}

/// Writes a zero-filled field file of the correct size for `parameter` at
/// `timestep` under `root`, creating the parameter directory as needed.
pub fn write_field_file(root: &Path, parameter: &str, timestep: Timestep) -> PathBuf {
    let dir = root.join(parameter);
    fs::create_dir_all(&dir).expect("Failed to create parameter directory");
    let path = dir.join(format!("{}.bin", timestep.file_stem()));
    fs::write(&path, vec![0u8; FIELD_FILE_LEN]).expect("Failed to write field file");
    path
}

/// Writes an arbitrary file into a parameter directory.
pub fn write_stray_file(root: &Path, parameter: &str, name: &str) -> PathBuf {
    let dir = root.join(parameter);
    fs::create_dir_all(&dir).expect("Failed to create parameter directory");
    let path = dir.join(name);
    fs::write(&path, b"not a field").expect("Failed to write stray file");
    path
}
