//! Decoding of object payloads into warehouse rows.
//!
//! Rows are passed through to the warehouse unchecked: column names and value
//! types are whatever the source document holds, and mismatches with the
//! destination table only surface as row errors from the insert call.

use serde_json::{Map, Value};

use crate::error::Result;

/// One row, keyed by column name.
pub type Record = Map<String, Value>;

/// Rows parsed from one object, in document order.
pub type RecordBatch = Vec<Record>;

/// Decode `payload` as UTF-8 and parse it as a JSON array of objects.
pub fn parse_records(payload: &[u8]) -> Result<RecordBatch> {
    let text = std::str::from_utf8(payload)?;
    let records = serde_json::from_str(text)?;
    Ok(records)
}
