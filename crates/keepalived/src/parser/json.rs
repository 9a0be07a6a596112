//! Decoder for the JSON dump (`keepalived.json`).

use crate::error::ParseError;
use crate::types::VRRP;
use std::io::Read;

/// Decode a JSON dump into joined instance/counter records.
///
/// Fields this crate does not model are ignored, and an out-of-range
/// numeric state is rejected.
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<VRRP>, ParseError> {
    serde_json::from_reader(reader).map_err(|e| ParseError::Json(e.to_string()))
}
