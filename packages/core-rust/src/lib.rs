//! Roster core: record types, RPC message schemas, and the `MsgPack` codec.

pub mod codec;
pub mod messages;
pub mod status;
pub mod types;

pub use codec::CodecError;
pub use status::{RpcStatus, StatusCode};
pub use types::{Record, RecordDraft};
