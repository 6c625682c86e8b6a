//! Payload codec for the topic data node.
//!
//! Payloads cross the coordination service as opaque bytes. An absent
//! payload is a legal value and must round-trip as such, so the wire shape
//! is always `Option<T>` rather than a bare `T`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

pub(crate) fn encode<T: Serialize>(payload: &Option<T>) -> Result<Vec<u8>> {
    Ok(bincode::serialize(payload)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<Option<T>, bincode::Error> {
    bincode::deserialize(bytes)
}
