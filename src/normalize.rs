//! Shape normalization of raw model responses.
//!
//! The model is prompted for a fixed JSON layout but deviates freely: keys
//! change casing, costs arrive as strings or ranges, whole answers come back
//! as prose. [`normalize`] reduces any of these shapes to a
//! [`CanonicalAnalysis`]. It is total and pure — every branch has a defined
//! fallback, the same input always yields the same output, and no field of
//! the result is ever left unset.
//!
//! Field probing is done with [`first_non_empty`]: an ordered list of
//! candidate keys where the first non-empty value wins. Null, `""`, `[]`,
//! and `{}` all count as absent.

use serde_json::{Map, Value};

use crate::models::{CanonicalAnalysis, DamageSummary};
use crate::numeric::extract_amount;

/// Reduce a raw model response to the canonical record.
pub fn normalize(raw: &Value) -> CanonicalAnalysis {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        // Not a keyed structure at all: keep the raw value as notes so
        // nothing the model said is silently dropped.
        None => return degenerate(raw),
    };

    let mut labels: Vec<String> = Vec::new();
    let mut locations: Vec<String> = Vec::new();

    let damages = first_non_empty(obj, &["damages", "damage"]).and_then(Value::as_array);

    match damages {
        Some(entries) => {
            for entry in entries {
                let part = entry.get("part").filter(|v| !is_empty(v));
                let damage_type = entry.get("damage_type").filter(|v| !is_empty(v));
                match (damage_type, part) {
                    (Some(dt), Some(p)) => {
                        labels.push(format!("{} ({})", value_to_text(dt), value_to_text(p)));
                        locations.push(value_to_text(p));
                    }
                    (Some(dt), None) => labels.push(value_to_text(dt)),
                    (None, Some(p)) => locations.push(value_to_text(p)),
                    (None, None) => {}
                }
            }
        }
        None => {
            // No damages collection: scan flat top-level fields instead.
            if let Some(field) = first_non_empty(obj, &["damage_type", "damage"]) {
                match field {
                    Value::Array(items) => labels.extend(items.iter().map(value_to_text)),
                    single => labels.push(value_to_text(single)),
                }
            }
            if let Some(field) = first_non_empty(obj, &["location", "part"]) {
                match field {
                    Value::Array(items) => locations.extend(items.iter().map(value_to_text)),
                    single => locations.push(value_to_text(single)),
                }
            }
        }
    }

    let damage_type = DamageSummary::from_labels(labels)
        .or_else(|| {
            obj.get("damage_type")
                .filter(|v| !is_empty(v))
                .map(summary_from_value)
        })
        .unwrap_or_else(|| DamageSummary::Single("Unknown".to_string()));

    let location = if locations.is_empty() {
        obj.get("location")
            .filter(|v| !is_empty(v))
            .map(value_to_text)
            .unwrap_or_default()
    } else {
        locations.join(", ")
    };

    // Costs: a nested estimate object wins; otherwise flat top-level keys.
    // Each currency is extracted independently, never derived from another.
    let nested = first_non_empty(obj, &["estimated_cost", "estimatedCosts"]);
    let (cost_usd, cost_inr, cost_yen) = match nested.and_then(Value::as_object) {
        Some(est) => (
            extract_amount(first_non_empty(est, &["usd", "USD", "dollars"])),
            extract_amount(first_non_empty(est, &["inr", "INR"])),
            extract_amount(first_non_empty(est, &["jpy", "JPY", "yen"])),
        ),
        None => (
            extract_amount(first_non_empty(obj, &["cost_usd", "costUSD", "usd"])),
            extract_amount(first_non_empty(obj, &["cost_inr", "costINR", "inr"])),
            extract_amount(first_non_empty(obj, &["cost_yen", "costJPY", "jpy"])),
        ),
    };

    // `raw_output` is populated by decode-repair when parsing fully failed.
    let notes = first_non_empty(obj, &["notes", "note", "raw_output"])
        .map(value_to_text)
        .unwrap_or_default();

    CanonicalAnalysis {
        damage_type,
        location,
        cost_inr,
        cost_usd,
        cost_yen,
        notes,
        uploaded_image: None,
    }
}

/// Record for inputs that are not keyed structures.
fn degenerate(raw: &Value) -> CanonicalAnalysis {
    CanonicalAnalysis {
        damage_type: DamageSummary::Single("Unknown".to_string()),
        location: String::new(),
        cost_inr: 0.0,
        cost_usd: 0.0,
        cost_yen: 0.0,
        notes: value_to_text(raw),
        uploaded_image: None,
    }
}

/// Checked lookup over candidate keys; the first non-empty value wins.
fn first_non_empty<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !is_empty(value))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Display text for a value. Strings pass through unquoted; anything else
/// keeps its compact JSON form.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Damage summary from a top-level fallback field, which may itself be a
/// single value or a sequence. A one-element sequence still collapses.
fn summary_from_value(value: &Value) -> DamageSummary {
    match value {
        Value::Array(items) => {
            DamageSummary::from_labels(items.iter().map(value_to_text).collect())
                .unwrap_or_else(|| DamageSummary::Single("Unknown".to_string()))
        }
        single => DamageSummary::Single(value_to_text(single)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_input_is_degenerate() {
        for raw in [json!("just text"), json!(42), json!(["a", "b"]), json!(null)] {
            let analysis = normalize(&raw);
            assert_eq!(
                analysis.damage_type,
                DamageSummary::Single("Unknown".to_string())
            );
            assert_eq!(analysis.location, "");
            assert_eq!(analysis.cost_inr, 0.0);
            assert_eq!(analysis.cost_usd, 0.0);
            assert_eq!(analysis.cost_yen, 0.0);
        }
        assert_eq!(normalize(&json!("just text")).notes, "just text");
        assert_eq!(normalize(&json!(42)).notes, "42");
    }

    #[test]
    fn test_empty_object_is_total() {
        let analysis = normalize(&json!({}));
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("Unknown".to_string())
        );
        assert_eq!(analysis.location, "");
        assert_eq!(analysis.notes, "");
        assert!(analysis.uploaded_image.is_none());
    }

    #[test]
    fn test_single_damage_collapses_to_string() {
        let raw = json!({
            "damages": [{ "part": "bumper", "damage_type": "dent" }]
        });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("dent (bumper)".to_string())
        );
        assert_eq!(analysis.location, "bumper");
    }

    #[test]
    fn test_multiple_damages_stay_a_list() {
        let raw = json!({
            "damages": [
                { "part": "front bumper", "damage_type": "dent" },
                { "part": "hood", "damage_type": "scratch" }
            ]
        });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Multiple(vec![
                "dent (front bumper)".to_string(),
                "scratch (hood)".to_string()
            ])
        );
        assert_eq!(analysis.location, "front bumper, hood");
    }

    #[test]
    fn test_entry_with_only_part_records_location_only() {
        let raw = json!({
            "damages": [{ "part": "left door" }],
            "damage_type": "scrape"
        });
        let analysis = normalize(&raw);
        // No labels were collected, so the top-level field is the fallback.
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("scrape".to_string())
        );
        assert_eq!(analysis.location, "left door");
    }

    #[test]
    fn test_entry_with_only_type_emits_bare_label() {
        let raw = json!({ "damages": [{ "damage_type": "crack" }] });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("crack".to_string())
        );
        assert_eq!(analysis.location, "");
    }

    #[test]
    fn test_damage_key_variant_accepted() {
        let raw = json!({ "damage": [{ "part": "trunk", "damage_type": "dent" }] });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("dent (trunk)".to_string())
        );
    }

    #[test]
    fn test_flat_fallback_fields() {
        let raw = json!({
            "damage_type": ["dent", "scratch"],
            "location": "rear"
        });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Multiple(vec!["dent".to_string(), "scratch".to_string()])
        );
        assert_eq!(analysis.location, "rear");
    }

    #[test]
    fn test_flat_part_key_accepted_for_location() {
        let raw = json!({ "damage": "dent", "part": ["hood", "grille"] });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("dent".to_string())
        );
        assert_eq!(analysis.location, "hood, grille");
    }

    #[test]
    fn test_empty_damages_falls_back_to_flat_fields() {
        let raw = json!({ "damages": [], "damage_type": "rust", "location": "frame" });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("rust".to_string())
        );
        assert_eq!(analysis.location, "frame");
    }

    #[test]
    fn test_nested_cost_estimates_with_ranges() {
        let raw = json!({
            "damages": [{ "part": "bumper", "damage_type": "dent" }],
            "estimated_cost": { "usd": "50-100", "inr": "4,000-6,000", "jpy": "7500" }
        });
        let analysis = normalize(&raw);
        assert_eq!(analysis.cost_usd, 75.0);
        assert_eq!(analysis.cost_inr, 5000.0);
        assert_eq!(analysis.cost_yen, 7500.0);
    }

    #[test]
    fn test_nested_cost_name_variants() {
        let raw = json!({
            "estimatedCosts": { "dollars": 80, "INR": "6,600", "yen": "11000-12000" }
        });
        let analysis = normalize(&raw);
        assert_eq!(analysis.cost_usd, 80.0);
        assert_eq!(analysis.cost_inr, 6600.0);
        assert_eq!(analysis.cost_yen, 11500.0);
    }

    #[test]
    fn test_flat_cost_keys_when_nested_absent() {
        let raw = json!({ "cost_usd": "120", "inr": 9900, "costJPY": "18,000" });
        let analysis = normalize(&raw);
        assert_eq!(analysis.cost_usd, 120.0);
        assert_eq!(analysis.cost_inr, 9900.0);
        assert_eq!(analysis.cost_yen, 18000.0);
    }

    #[test]
    fn test_flat_cost_keys_when_nested_is_not_an_object() {
        let raw = json!({ "estimated_cost": "irreparable", "usd": "30" });
        let analysis = normalize(&raw);
        // The nested key held prose, so flat keys still apply; the prose
        // string itself is not a per-currency estimate.
        assert_eq!(analysis.cost_usd, 30.0);
        assert_eq!(analysis.cost_inr, 0.0);
    }

    #[test]
    fn test_notes_fallback_order() {
        assert_eq!(normalize(&json!({ "notes": "a", "note": "b" })).notes, "a");
        assert_eq!(normalize(&json!({ "note": "b" })).notes, "b");
        assert_eq!(
            normalize(&json!({ "raw_output": "model said things" })).notes,
            "model said things"
        );
    }

    #[test]
    fn test_raw_output_object_reduces_to_unknown_with_notes() {
        let raw = json!({ "raw_output": "no json here" });
        let analysis = normalize(&raw);
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("Unknown".to_string())
        );
        assert_eq!(analysis.notes, "no json here");
    }

    #[test]
    fn test_non_object_damage_entries_are_skipped() {
        let raw = json!({ "damages": ["dent", { "damage_type": "scratch" }] });
        let analysis = normalize(&raw);
        // String entries carry no part/damage_type fields and contribute
        // nothing; only the object entry survives.
        assert_eq!(
            analysis.damage_type,
            DamageSummary::Single("scratch".to_string())
        );
    }

    #[test]
    fn test_deterministic() {
        let raw = json!({
            "damages": [{ "part": "hood", "damage_type": "dent" }],
            "estimated_cost": { "usd": "50-100" },
            "notes": "check the radiator"
        });
        let a = normalize(&raw);
        let b = normalize(&raw);
        assert_eq!(a.damage_type, b.damage_type);
        assert_eq!(a.location, b.location);
        assert_eq!(a.cost_usd, b.cost_usd);
        assert_eq!(a.notes, b.notes);
    }
}
