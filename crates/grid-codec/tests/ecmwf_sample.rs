//! Decodes a real archive message when one is available locally.
//!
//! Place a single-message `2t` GRIB2 file from the 0.25° open-data feed at
//! `crates/grid-codec/testdata/ecmwf_2t_0p25.grib2` (or under `TEST_DATA_DIR`).

use grid_codec::{decode, decode_message, encode, wrap};
use test_utils::require_test_file;

#[test]
fn test_decode_wrap_encode_sample() {
    let path = require_test_file!("ecmwf_2t_0p25.grib2");
    let message = std::fs::read(&path).expect("Failed to read sample");

    let raw = decode_message(&message).expect("Failed to decode sample");
    assert_eq!(raw.dim(), (721, 1440));

    let grid = wrap(&raw).expect("Sample should have the global shape");
    let stats = grid.stats();
    // 2 m temperature in Kelvin
    assert!(stats.min > 180.0 && stats.max < 340.0, "{stats:?}");

    let decoded = decode(&encode(&grid)).unwrap();
    assert!(decoded.is_wrapped());
}
