//! JSON rendering.

use ekitime_shared::{EkitimeError, Result, TrainEntry};

/// Serialize entries as a JSON array, preserving order.
pub fn to_json(entries: &[TrainEntry], pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(entries)
    } else {
        serde_json::to_string(entries)
    };
    rendered.map_err(|e| EkitimeError::Serialization(format!("json: {e}")))
}

/// Parse a JSON array previously written by [`to_json`].
pub fn from_json(text: &str) -> Result<Vec<TrainEntry>> {
    serde_json::from_str(text).map_err(|e| EkitimeError::Serialization(format!("json: {e}")))
}
