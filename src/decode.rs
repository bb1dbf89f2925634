//! Best-effort recovery of a JSON value from model output.
//!
//! The vision model is prompted for pure JSON but routinely wraps the object
//! in prose or code fences. [`decode_model_text`] always yields a value the
//! normalizer can work with; it never fails outward.

use serde_json::{json, Value};

/// Decode model output into a JSON value, repairing when needed.
///
/// 1. Strict parse of the whole text.
/// 2. Strict parse of the widest brace-delimited span (first `{` to last `}`).
/// 3. Degenerate object `{"raw_output": <text verbatim>}`, which the
///    normalizer reduces to an "Unknown" record carrying the text as notes.
pub fn decode_model_text(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return value;
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return value;
            }
        }
    }

    json!({ "raw_output": text })
}
