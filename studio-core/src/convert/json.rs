//! Native document JSON.

use crate::error::ParseError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parse raw bytes as document JSON.
///
/// Only syntax is checked here; schema checks belong to validation.
///
/// # Errors
///
/// Returns [`ParseError`] on malformed JSON or invalid UTF-8.
pub fn document_json_from_bytes(bytes: &[u8]) -> Result<serde_json::Value, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    Ok(serde_json::from_slice(bytes)?)
}
