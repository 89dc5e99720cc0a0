//! Synthetic global fields shaped like archive output.
//!
//! All generators return `(721, 1440)` arrays, row 0 at 90°N and column 0 at
//! 0°E, matching what the GRIB decoder hands to the codec.

use ndarray::Array2;

use field_common::{GRID_HEIGHT, SOURCE_WIDTH};

/// Creates a field with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, so
/// `field[(row, col)] == col * 1000 + row`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_field;
///
/// let field = create_test_field();
/// assert_eq!(field.dim(), (721, 1440));
/// assert_eq!(field[(0, 1)], 1000.0);
/// assert_eq!(field[(1, 0)], 1.0);
/// ```
pub fn create_test_field() -> Array2<f32> {
    Array2::from_shape_fn((GRID_HEIGHT, SOURCE_WIDTH), |(row, col)| {
        (col * 1000 + row) as f32
    })
}

/// Creates a field with every cell set to `value`.
pub fn create_constant_field(value: f32) -> Array2<f32> {
    Array2::from_elem((GRID_HEIGHT, SOURCE_WIDTH), value)
}

/// Creates a 2 m temperature-like field in Kelvin.
///
/// Warm at the equator (~300K), cold at the poles (~240K), with a small
/// longitudinal wave so that column 0 differs from column 1439.
pub fn create_temperature_field() -> Array2<f32> {
    Array2::from_shape_fn((GRID_HEIGHT, SOURCE_WIDTH), |(row, col)| {
        let lat = 90.0 - row as f32 * 0.25;
        let lon = col as f32 * 0.25;
        let base = 300.0 - 60.0 * (lat.abs() / 90.0);
        base + 3.0 * lon.to_radians().sin()
    })
}

/// Creates a field of arbitrary shape, for shape-validation tests.
pub fn create_field_with_shape(height: usize, width: usize) -> Array2<f32> {
    Array2::from_elem((height, width), 1.0)
}
