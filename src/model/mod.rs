//! Typed documents stored in the tree.
//!
//! Every document travels as UTF-8 JSON. Decoding a watched node goes through
//! [`decode`] so that a bad payload is reported with the path it came from.

mod input;
mod log_level_filter;
mod output;
pub use input::*;
pub use log_level_filter::*;
pub use output::*;


use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Parses the JSON payload of the node at `path`
pub fn decode<T: DeserializeOwned>(
    path: &str,
    data: &[u8],
) -> Result<T> {
    serde_json::from_slice(data).map_err(|source| Error::MalformedConfig {
        path: path.to_string(),
        source,
    })
}

/// Serializes a document into a node payload
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}
