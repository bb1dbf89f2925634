//! Numeric estimate extraction.
//!
//! Cost estimates come back from the model as raw numbers or free-form
//! strings: `"75"`, `"50-100"`, `"1,234"`, `"about $120 USD"`.
//! [`extract_amount`] reduces any of them to a single non-negative value.
//! It never fails; anything unusable resolves to `0.0`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Digit runs with an optional fractional part.
fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"))
}

/// Extract a representative non-negative amount from an arbitrary value.
///
/// - Missing or null input yields `0.0`.
/// - A raw number yields its absolute value; negative cost estimates carry
///   no meaning here, so the sign is discarded.
/// - A string is stripped of `,` thousands separators, then scanned for
///   numeric runs. One match is taken as-is. Two or more matches are read
///   as a range like `"50-100"`: the result is the mean of the first two,
///   and anything past the second match is ignored.
/// - Any other shape is scanned via its JSON text.
pub fn extract_amount(raw: Option<&Value>) -> f64 {
    let value = match raw {
        None | Some(Value::Null) => return 0.0,
        Some(value) => value,
    };

    if let Some(n) = value.as_f64() {
        return n.abs();
    }

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let cleaned = text.replace(',', "");
    let mut values = Vec::new();
    for m in number_pattern().find_iter(&cleaned) {
        match m.as_str().parse::<f64>() {
            Ok(v) => values.push(v),
            // Cannot happen for strings the pattern accepts, but the
            // contract is total: any conversion failure resolves to 0.0.
            Err(_) => return 0.0,
        }
    }

    match values.as_slice() {
        [] => 0.0,
        [only] => *only,
        [first, second, ..] => (first + second) / 2.0,
    }
}
