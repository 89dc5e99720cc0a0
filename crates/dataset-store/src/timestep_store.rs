//! Which timesteps exist on disk, per parameter.
//!
//! The view is derived from file names and never persisted. Build a fresh
//! one with [`TimestepStore::scan`] whenever the dataset may have changed.

use std::collections::{BTreeMap, HashSet};
use std::fs;

use tracing::{debug, info, warn};

use field_common::Timestep;

use crate::dataset::{Dataset, FIELD_EXTENSION};
use crate::error::StoreResult;

/// Per-parameter sets of timesteps present in a dataset.
#[derive(Debug, Clone, Default)]
pub struct TimestepStore {
    sets: BTreeMap<String, HashSet<Timestep>>,
}

impl TimestepStore {
    /// Scan the dataset directory of every parameter. Missing or unreadable
    /// directories give an empty set; entries that cannot be read and file
    /// names that do not parse are ignored.
    pub fn scan<S: AsRef<str>>(dataset: &Dataset, parameters: &[S]) -> StoreResult<Self> {
        let mut sets = BTreeMap::new();

        for parameter in parameters {
            let parameter = parameter.as_ref();
            let dir = dataset.parameter_dir(parameter)?;
            let mut found = HashSet::new();

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => Some(entries),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Failed to read parameter directory");
                    None
                }
            };

            if let Some(entries) = entries {
                for entry in entries {
                    let path = match entry {
                        Ok(entry) => entry.path(),
                        Err(e) => {
                            warn!(path = %dir.display(), error = %e, "Skipping unreadable entry");
                            continue;
                        }
                    };
                    if !path.is_file() || path.extension().map_or(true, |ext| ext != FIELD_EXTENSION) {
                        continue;
                    }
                    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    match Timestep::parse_file_stem(stem) {
                        Ok(timestep) => {
                            found.insert(timestep);
                        }
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "Ignoring unrecognized file");
                        }
                    }
                }
            }

            debug!(parameter = %parameter, count = found.len(), "Scanned parameter directory");
            sets.insert(parameter.to_string(), found);
        }

        let store = Self { sets };
        info!(
            parameters = store.sets.len(),
            complete = store.complete().len(),
            "Scanned dataset"
        );
        Ok(store)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    pub fn existing_timesteps(&self, parameter: &str) -> HashSet<Timestep> {
        self.sets.get(parameter).cloned().unwrap_or_default()
    }

    pub fn has(&self, parameter: &str, timestep: Timestep) -> bool {
        self.sets
            .get(parameter)
            .map_or(false, |set| set.contains(&timestep))
    }

    /// Timesteps present for every parameter.
    pub fn complete(&self) -> HashSet<Timestep> {
        intersect_all(self.sets.values())
    }
}

/// Intersection of all sets. No sets at all yields the empty set.
pub fn intersect_all<'a, I>(sets: I) -> HashSet<Timestep>
where
    I: IntoIterator<Item = &'a HashSet<Timestep>>,
{
    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return HashSet::new();
    };
    iter.fold(first.clone(), |acc, set| acc.intersection(set).copied().collect())
}
