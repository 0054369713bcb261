//! `MsgPack` encoding helpers shared by the RPC server and client.
//!
//! Values are always written with named fields (`to_vec_named`) because the
//! message enums are internally tagged and need map-shaped structs.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Failure to convert between a message and its `MsgPack` bytes.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("msgpack encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("msgpack decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Serializes `value` as a named `MsgPack` map.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the value cannot be represented.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Deserializes a `MsgPack` payload.
///
/// # Errors
///
/// Returns `CodecError::Decode` for truncated or mistyped input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
