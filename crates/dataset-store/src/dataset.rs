//! The on-disk dataset: one encoded field file per parameter and timestep.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use field_common::Timestep;

use crate::error::{StoreError, StoreResult};

/// File extension of stored fields.
pub const FIELD_EXTENSION: &str = "bin";

/// Root directory of the dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
}

/// File count and size across the dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub files: usize,
    pub total_bytes: u64,
}

impl Dataset {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every timestep of `parameter`.
    pub fn parameter_dir(&self, parameter: &str) -> StoreResult<PathBuf> {
        let valid = !parameter.is_empty()
            && parameter != "."
            && parameter != ".."
            && !parameter.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::InvalidParameter(parameter.to_string()));
        }
        Ok(self.root.join(parameter))
    }

    /// Path of the field file for `(parameter, timestep)`.
    pub fn path_for(&self, parameter: &str, timestep: Timestep) -> StoreResult<PathBuf> {
        Ok(self
            .parameter_dir(parameter)?
            .join(format!("{}.{}", timestep.file_stem(), FIELD_EXTENSION)))
    }

    pub fn exists(&self, parameter: &str, timestep: Timestep) -> bool {
        self.path_for(parameter, timestep)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Write an encoded field, replacing any previous file in one step.
    ///
    /// The bytes go to a hidden temporary file in the same directory which is
    /// then renamed over the final path, so readers never observe a partial
    /// file.
    #[instrument(skip(self, parameter, timestep, encoded), fields(parameter = %parameter, timestep = %timestep))]
    pub fn commit(&self, parameter: &str, timestep: Timestep, encoded: &[u8]) -> StoreResult<PathBuf> {
        let dir = self.parameter_dir(parameter)?;
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let final_path = self.path_for(parameter, timestep)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(&dir)
            .map_err(|e| StoreError::io(&dir, e))?;
        temp.write_all(encoded)
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(temp.path(), e))?;
        temp.persist(&final_path)
            .map_err(|e| StoreError::io(&final_path, e.error))?;

        debug!(path = %final_path.display(), bytes = encoded.len(), "Committed field");
        Ok(final_path)
    }

    /// Count stored field files across `parameters`.
    ///
    /// Files removed or unreadable while the directory is walked are left
    /// out of the count.
    pub fn summary<S: AsRef<str>>(&self, parameters: &[S]) -> StoreResult<DatasetSummary> {
        let mut summary = DatasetSummary::default();

        for parameter in parameters {
            let dir = self.parameter_dir(parameter.as_ref())?;
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Failed to read parameter directory");
                    continue;
                }
            };
            for entry in entries {
                let Ok(entry) = entry else {
                    continue;
                };
                let path = entry.path();
                let is_field = path.extension().map_or(false, |ext| ext == FIELD_EXTENSION);
                if !is_field {
                    continue;
                }
                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "Skipping vanished entry");
                        continue;
                    }
                };
                if metadata.is_file() {
                    summary.files += 1;
                    summary.total_bytes += metadata.len();
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::Cycle;
    use test_utils::{params, temp_test_dir, timestep, write_stray_file};

    #[test]
    fn test_path_layout() {
        let dataset = Dataset::new("/data/fields");
        let path = dataset
            .path_for(params::TEMP_2M, timestep(2025, 10, 28, Cycle::Z18))
            .unwrap();
        assert_eq!(path, PathBuf::from("/data/fields/temp2m/20251028_18z.bin"));
    }

    #[test]
    fn test_rejects_path_like_parameters() {
        let dataset = Dataset::new("/data/fields");
        for name in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                dataset.parameter_dir(name),
                Err(StoreError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_commit_writes_and_replaces() {
        let dir = temp_test_dir();
        let dataset = Dataset::new(dir.path());
        let ts = timestep(2025, 1, 1, Cycle::Z06);

        let path = dataset.commit(params::TEMP_2M, ts, &[1, 2, 3, 4]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
        assert!(dataset.exists(params::TEMP_2M, ts));

        dataset.commit(params::TEMP_2M, ts, &[9, 9]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![9, 9]);
    }

    #[test]
    fn test_commit_leaves_no_temporary_files() {
        let dir = temp_test_dir();
        let dataset = Dataset::new(dir.path());
        dataset
            .commit(params::WIND_10M_U, timestep(2025, 1, 1, Cycle::Z00), &[0; 16])
            .unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join(params::WIND_10M_U))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["20250101_00z.bin".to_string()]);
    }

    #[test]
    fn test_summary_counts_only_field_files() {
        let dir = temp_test_dir();
        let dataset = Dataset::new(dir.path());
        dataset
            .commit(params::TEMP_2M, timestep(2025, 1, 1, Cycle::Z00), &[0; 10])
            .unwrap();
        dataset
            .commit(params::WIND_10M_V, timestep(2025, 1, 1, Cycle::Z06), &[0; 6])
            .unwrap();
        write_stray_file(dir.path(), params::TEMP_2M, "README.txt");

        let summary = dataset.summary(&params::ALL).unwrap();
        assert_eq!(
            summary,
            DatasetSummary {
                files: 2,
                total_bytes: 16
            }
        );
    }

    #[test]
    fn test_summary_survives_unreadable_parameter_dir() {
        let dir = temp_test_dir();
        let dataset = Dataset::new(dir.path());
        dataset
            .commit(params::WIND_10M_U, timestep(2025, 1, 1, Cycle::Z00), &[0; 8])
            .unwrap();
        fs::write(dir.path().join(params::TEMP_2M), b"not a directory").unwrap();

        let summary = dataset.summary(&params::ALL).unwrap();
        assert_eq!(
            summary,
            DatasetSummary {
                files: 1,
                total_bytes: 8
            }
        );
    }
}
