//! Geometry of the global 0.25° lat/lon grid.
//!
//! Row 0 is 90°N and row 720 is 90°S. Column 0 is 0°E; source fields stop at
//! 359.75°E (column 1439) and the canonical form repeats column 0 as column
//! 1440 so that samplers can interpolate across the antimeridian.

use serde::{Deserialize, Serialize};

/// Number of latitude rows.
pub const GRID_HEIGHT: usize = 721;
/// Number of longitude columns in a source field.
pub const SOURCE_WIDTH: usize = 1440;
/// Number of longitude columns after the wrap column is appended.
pub const WRAPPED_WIDTH: usize = SOURCE_WIDTH + 1;
/// Grid spacing in degrees.
pub const RESOLUTION_DEG: f64 = 0.25;

/// Specification of a regular global lat/lon grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of rows (latitude)
    pub height: usize,
    /// Number of source columns (longitude), excluding the wrap column
    pub width: usize,
    /// Spacing in degrees, identical in both directions
    pub resolution: f64,
    /// Latitude of row 0
    pub first_lat: f64,
}

impl GridSpec {
    /// The 0.25° global grid all fields are stored on.
    pub const fn global_0p25() -> Self {
        Self {
            height: GRID_HEIGHT,
            width: SOURCE_WIDTH,
            resolution: RESOLUTION_DEG,
            first_lat: 90.0,
        }
    }

    /// Nearest `(row, col)` for a geographic coordinate, clamped into the
    /// wrapped grid. Longitudes are normalized into `[0, 360)`.
    pub fn latlon_to_index(&self, lat: f64, lon: f64) -> (usize, usize) {
        let max_row = (self.height - 1) as f64;
        let row = ((self.first_lat - lat) / self.resolution)
            .round()
            .clamp(0.0, max_row);

        let lon_norm = lon.rem_euclid(360.0);
        let col = (lon_norm / self.resolution)
            .round()
            .clamp(0.0, self.width as f64);

        (row as usize, col as usize)
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::global_0p25()
    }
}

/// [`GridSpec::latlon_to_index`] on the global 0.25° grid.
pub fn latlon_to_index(lat: f64, lon: f64) -> (usize, usize) {
    GridSpec::global_0p25().latlon_to_index(lat, lon)
}
