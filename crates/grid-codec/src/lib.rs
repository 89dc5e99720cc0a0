//! Grid normalization for global 0.25° fields.
//!
//! Source fields arrive as `(721, 1440)` arrays. They are wrapped into the
//! `(721, 1441)` canonical form and stored as row-major little-endian
//! half-precision floats. Consumers depend on this layout byte-for-byte.

pub mod codec;
pub mod error;
pub mod grib;

pub use codec::{decode, encode, wrap, CanonicalGrid, FieldStats, ENCODED_LEN};
pub use error::{CodecError, Result};
pub use grib::decode_message;
