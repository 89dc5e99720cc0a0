//! Decoding of a single GRIB2 message into a 2-D field.
//!
//! The archive serves one message per parameter through a byte-range
//! request. Only the first submessage is read.

use std::io::Cursor;

use ndarray::Array2;
use tracing::debug;

use crate::error::{CodecError, Result};

/// Decode the first submessage of `message` into a `(rows, cols)` array.
///
/// The shape comes from the message's grid definition; wrapping checks it
/// against the expected global grid.
pub fn decode_message(message: &[u8]) -> Result<Array2<f32>> {
    let grib2 = grib::from_reader(Cursor::new(message))
        .map_err(|e| CodecError::grib(format!("failed to read message: {}", e)))?;

    let (_, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| CodecError::grib("message contains no submessages"))?;

    // (ni, nj): points along a parallel, points along a meridian
    let (ni, nj) = submessage
        .grid_shape()
        .map_err(|e| CodecError::grib(format!("unsupported grid definition: {}", e)))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| CodecError::grib(format!("failed to create decoder: {}", e)))?;
    let values: Vec<f32> = decoder
        .dispatch()
        .map_err(|e| CodecError::grib(format!("failed to unpack values: {}", e)))?
        .collect();

    debug!(rows = nj, cols = ni, points = values.len(), "Decoded GRIB2 submessage");

    if values.len() != ni * nj {
        return Err(CodecError::grib(format!(
            "grid definition {}x{} does not match {} decoded points",
            nj,
            ni,
            values.len()
        )));
    }

    Array2::from_shape_vec((nj, ni), values).map_err(|e| CodecError::grib(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_grib_payload() {
        let err = decode_message(b"<Error><Code>NoSuchKey</Code></Error>").unwrap_err();
        assert!(matches!(err, CodecError::Grib(_)));
    }

    #[test]
    fn test_rejects_empty_payload() {
        assert!(decode_message(&[]).is_err());
    }
}
