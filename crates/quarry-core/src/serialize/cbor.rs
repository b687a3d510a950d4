use crate::serialize::SerializeError;
use serde::{Serialize, de::DeserializeOwned};
use std::panic::{AssertUnwindSafe, catch_unwind};

pub(super) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializeError> {
    serde_cbor::to_vec(value).map_err(|err| SerializeError::Encode(err.to_string()))
}

// A decoder panic on hostile input is reported as a decode failure.
pub(super) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializeError> {
    catch_unwind(AssertUnwindSafe(|| serde_cbor::from_slice(bytes)))
        .map_err(|_| SerializeError::Decode("decoder panicked".to_string()))?
        .map_err(|err| SerializeError::Decode(err.to_string()))
}
