//! Core data models used throughout Claimsight.
//!
//! These types represent the normalized assessment that flows out of the
//! pipeline and the persisted row it becomes.

use serde::Serialize;

/// Damage labels extracted from a model response.
///
/// A single label is surfaced as a bare string on the wire; two or more
/// labels stay a list. A one-element list is never surfaced as a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DamageSummary {
    Single(String),
    Multiple(Vec<String>),
}

impl DamageSummary {
    /// Build a summary from collected labels, collapsing a single label to a
    /// bare string. Returns `None` when no labels were collected.
    pub fn from_labels(mut labels: Vec<String>) -> Option<Self> {
        match labels.len() {
            0 => None,
            1 => Some(DamageSummary::Single(labels.remove(0))),
            _ => Some(DamageSummary::Multiple(labels)),
        }
    }

    /// Flattened form used for storage: a comma-joined string.
    pub fn joined(&self) -> String {
        match self {
            DamageSummary::Single(label) => label.clone(),
            DamageSummary::Multiple(labels) => labels.join(", "),
        }
    }
}

/// The stable output contract of normalization, independent of whatever
/// shape the upstream model answered with.
///
/// Transient and request-scoped; [`AnalysisRecord`] is the durable
/// counterpart plus identity and time metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalAnalysis {
    pub damage_type: DamageSummary,
    pub location: String,
    pub cost_inr: f64,
    pub cost_usd: f64,
    pub cost_yen: f64,
    pub notes: String,
    /// Reference to the stored upload. Set only after the image has been
    /// written to the blob sink, never by the normalizer itself.
    #[serde(rename = "uploadedImage", skip_serializing_if = "Option::is_none")]
    pub uploaded_image: Option<String>,
}

/// A persisted analysis row as returned by the history reader.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub image_path: String,
    pub damage_type: String,
    pub location: String,
    pub cost_inr: f64,
    pub cost_usd: f64,
    pub cost_yen: f64,
    pub notes: String,
    pub created_at: String, // ISO8601
}
