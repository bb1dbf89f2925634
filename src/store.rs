//! Append and read access to persisted analyses.
//!
//! The storage engine owns record lifetime: the orchestrator only appends
//! via [`insert_record`] and the history reader only reads via
//! [`list_records`]. Rows are never updated.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::{AnalysisRecord, CanonicalAnalysis};

/// Append a record derived from a canonical analysis.
///
/// Damage labels are flattened to a comma-joined string for storage. The
/// creation timestamp is assigned here, at persistence time. Returns the
/// assigned row id.
pub async fn insert_record(pool: &SqlitePool, analysis: &CanonicalAnalysis) -> Result<i64> {
    let image_path = analysis.uploaded_image.clone().unwrap_or_default();
    let created_at = Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO analyses (image_path, damage_type, location, cost_inr, cost_usd, cost_yen, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&image_path)
    .bind(analysis.damage_type.joined())
    .bind(&analysis.location)
    .bind(analysis.cost_inr)
    .bind(analysis.cost_usd)
    .bind(analysis.cost_yen)
    .bind(&analysis.notes)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All persisted records, most recently created first.
///
/// The id tiebreak keeps records inserted within the same second in
/// creation order.
pub async fn list_records(pool: &SqlitePool) -> Result<Vec<AnalysisRecord>> {
    let rows = sqlx::query(
        "SELECT id, image_path, damage_type, location, cost_inr, cost_usd, cost_yen, notes, created_at \
         FROM analyses ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| AnalysisRecord {
            id: row.get("id"),
            image_path: row.get("image_path"),
            damage_type: row.get("damage_type"),
            location: row.get("location"),
            cost_inr: row.get("cost_inr"),
            cost_usd: row.get("cost_usd"),
            cost_yen: row.get("cost_yen"),
            notes: row.get("notes"),
            created_at: format_ts_iso(row.get("created_at")),
        })
        .collect())
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
