//! Wrapping and half-precision encoding of global fields.

use bytes::Bytes;
use half::f16;
use ndarray::Array2;

use field_common::{GridSpec, GRID_HEIGHT, SOURCE_WIDTH, WRAPPED_WIDTH};

use crate::error::{CodecError, Result};

/// Exact byte length of an encoded canonical grid.
pub const ENCODED_LEN: usize = GRID_HEIGHT * WRAPPED_WIDTH * 2;

/// A `(721, 1441)` field whose last column repeats the first.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGrid {
    values: Array2<f32>,
}

impl CanonicalGrid {
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.values.get((row, col)).copied()
    }

    /// Value of the grid node nearest to `(lat, lon)`.
    pub fn value_at(&self, lat: f64, lon: f64) -> f32 {
        let (row, col) = GridSpec::global_0p25().latlon_to_index(lat, lon);
        self.values[(row, col)]
    }

    /// Whether every row's wrap column matches column 0 once both are
    /// reduced to half precision.
    pub fn is_wrapped(&self) -> bool {
        self.values.rows().into_iter().all(|row| {
            f16::from_f32(row[0]).to_bits() == f16::from_f32(row[SOURCE_WIDTH]).to_bits()
        })
    }

    pub fn stats(&self) -> FieldStats {
        FieldStats::from_values(self.values.iter().copied())
    }
}

/// Summary statistics over the finite values of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub nan_count: usize,
}

impl FieldStats {
    fn from_values(values: impl Iterator<Item = f32>) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut nan_count = 0usize;

        for v in values {
            if v.is_nan() {
                nan_count += 1;
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            count += 1;
        }

        let mean = if count > 0 { sum / count as f64 } else { f64::NAN };
        Self {
            min,
            max,
            mean,
            nan_count,
        }
    }
}

/// Append column 0 as column 1440.
pub fn wrap(raw: &Array2<f32>) -> Result<CanonicalGrid> {
    let actual = raw.dim();
    if actual != (GRID_HEIGHT, SOURCE_WIDTH) {
        return Err(CodecError::Shape {
            expected: (GRID_HEIGHT, SOURCE_WIDTH),
            actual,
        });
    }

    let values = Array2::from_shape_fn((GRID_HEIGHT, WRAPPED_WIDTH), |(row, col)| {
        raw[(row, col % SOURCE_WIDTH)]
    });

    Ok(CanonicalGrid { values })
}

/// Row-major little-endian binary16 serialization.
pub fn encode(grid: &CanonicalGrid) -> Bytes {
    let mut out = Vec::with_capacity(ENCODED_LEN);
    for &v in grid.values.iter() {
        out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
    }
    Bytes::from(out)
}

/// Inverse of [`encode`]. Values come back widened to `f32`.
pub fn decode(bytes: &[u8]) -> Result<CanonicalGrid> {
    if bytes.len() != ENCODED_LEN {
        return Err(CodecError::SizeMismatch {
            expected: ENCODED_LEN,
            actual: bytes.len(),
        });
    }

    let flat: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| f16::from_le_bytes([pair[0], pair[1]]).to_f32())
        .collect();

    let values = Array2::from_shape_vec((GRID_HEIGHT, WRAPPED_WIDTH), flat).map_err(|_| {
        CodecError::SizeMismatch {
            expected: ENCODED_LEN,
            actual: bytes.len(),
        }
    })?;

    Ok(CanonicalGrid { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{create_constant_field, create_temperature_field, create_test_field};

    fn to_half(v: f32) -> f32 {
        f16::from_f32(v).to_f32()
    }

    #[test]
    fn test_wrap_rejects_wrong_shape() {
        let raw = Array2::<f32>::zeros((721, 1441));
        match wrap(&raw) {
            Err(CodecError::Shape { expected, actual }) => {
                assert_eq!(expected, (721, 1440));
                assert_eq!(actual, (721, 1441));
            }
            other => panic!("expected shape error, got {other:?}"),
        }

        let transposed = Array2::<f32>::zeros((1440, 721));
        assert!(wrap(&transposed).is_err());
    }

    #[test]
    fn test_wrap_duplicates_first_column() {
        let grid = wrap(&create_test_field()).unwrap();
        assert_eq!(grid.shape(), (721, 1441));

        let values = grid.values();
        for row in 0..721 {
            assert_eq!(values[(row, 1440)].to_bits(), values[(row, 0)].to_bits());
        }
        assert!(grid.is_wrapped());
    }

    #[test]
    fn test_wrap_keeps_source_columns() {
        let raw = create_test_field();
        let grid = wrap(&raw).unwrap();
        assert_eq!(grid.get(10, 1439), Some(raw[(10, 1439)]));
        assert_eq!(grid.get(720, 17), Some(raw[(720, 17)]));
        assert_eq!(grid.get(721, 0), None);
    }

    #[test]
    fn test_encode_length_and_determinism() {
        let grid = wrap(&create_temperature_field()).unwrap();
        let a = encode(&grid);
        let b = encode(&grid);
        assert_eq!(a.len(), 721 * 1441 * 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_is_row_major_little_endian() {
        let raw = create_test_field();
        let grid = wrap(&raw).unwrap();
        let bytes = encode(&grid);

        let offset = (3 * WRAPPED_WIDTH + 5) * 2;
        let stored = f16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        assert_eq!(stored, f16::from_f32(raw[(3, 5)]));
    }

    #[test]
    fn test_roundtrip_up_to_half_precision() {
        let grid = wrap(&create_temperature_field()).unwrap();
        let decoded = decode(&encode(&grid)).unwrap();

        let expected = grid.values().mapv(to_half);
        assert_eq!(decoded.values(), &expected);
        assert!(decoded.is_wrapped());
    }

    #[test]
    fn test_constant_field_roundtrip() {
        let grid = wrap(&create_constant_field(273.15)).unwrap();
        let stats = decode(&encode(&grid)).unwrap().stats();

        assert_eq!(stats.min, stats.max);
        assert_eq!(stats.min, to_half(273.15));
        assert_eq!(stats.nan_count, 0);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        for len in [0, ENCODED_LEN - 2, ENCODED_LEN + 2, 1440 * 721 * 2] {
            match decode(&vec![0u8; len]) {
                Err(CodecError::SizeMismatch { expected, actual }) => {
                    assert_eq!(expected, ENCODED_LEN);
                    assert_eq!(actual, len);
                }
                other => panic!("expected size mismatch for {len}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_value_at_uses_nearest_node() {
        let raw = create_test_field();
        let grid = wrap(&raw).unwrap();
        assert_eq!(grid.value_at(90.0, 0.0), raw[(0, 0)]);
        assert_eq!(grid.value_at(0.0, 360.0), raw[(360, 0)]);
        assert_eq!(grid.value_at(-45.0, 90.0), raw[(540, 360)]);
    }

    #[test]
    fn test_stats_skip_nan() {
        let mut raw = create_constant_field(10.0);
        raw[(0, 0)] = f32::NAN;
        raw[(5, 5)] = 20.0;
        let stats = wrap(&raw).unwrap().stats();
        // The NaN is counted twice: once at column 0 and once in the wrap column.
        assert_eq!(stats.nan_count, 2);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 20.0);
    }
}
