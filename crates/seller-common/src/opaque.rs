//! Opaque text encoding for nested marketplace structures
//!
//! Some upstream fields (`dimensions`, `items`, `services`, `quants`) are stored in
//! untyped text columns. They are written as compact JSON. Anything that carries no
//! data (`null`, a missing value, `[]`, `{}`) is written as [`NULL_MARKER`] so that
//! "nothing" has exactly one representation in storage.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Stored text for structures without content
pub const NULL_MARKER: &str = "null";

/// Encode a sub-structure as opaque text
pub fn encode_opaque<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    if is_blank(&value) {
        return Ok(NULL_MARKER.to_string());
    }
    Ok(serde_json::to_string(&value)?)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
