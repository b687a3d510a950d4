//! Module: serialize
//! Responsibility: wire encoding of data tables and rows.
//! Does not own: the data table layout (see `result::DataTable`).
//! Boundary: every payload crossing the merge boundary goes through
//! [`serialize`] and [`deserialize`].

mod cbor;


use crate::error::InternalError;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error as ThisError;

/// Largest payload [`deserialize`] accepts.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("payload of {len} bytes exceeds the {max_bytes} byte limit")]
    PayloadTooLarge { len: usize, max_bytes: usize },
}

impl SerializeError {
    /// Whether the failure describes a bad payload rather than a bad value.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::PayloadTooLarge { .. })
    }
}

impl From<SerializeError> for InternalError {
    fn from(err: SerializeError) -> Self {
        if err.is_corruption() {
            Self::serialize_corruption(err.to_string())
        } else {
            Self::serialize_internal(err.to_string())
        }
    }
}

pub fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    cbor::encode(value)
}

/// Decode a payload produced by [`serialize`], bounded by
/// [`MAX_PAYLOAD_BYTES`].
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializeError> {
    deserialize_bounded(bytes, MAX_PAYLOAD_BYTES)
}

pub fn deserialize_bounded<T: DeserializeOwned>(
    bytes: &[u8],
    max_bytes: usize,
) -> Result<T, SerializeError> {
    if bytes.len() > max_bytes {
        return Err(SerializeError::PayloadTooLarge {
            len: bytes.len(),
            max_bytes,
        });
    }

    cbor::decode(bytes)
}
