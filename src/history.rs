//! History projection of persisted analyses.
//!
//! Read-only: projects stored rows into the canonical record shape, most
//! recently created first. No pagination, no filtering. Storage failures
//! propagate as collaborator errors rather than being masked.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::models::AnalysisRecord;
use crate::store;

/// All stored analyses, most recent first. Used by both the `history` CLI
/// command and `GET /history`.
pub async fn list_history(config: &Config) -> Result<Vec<AnalysisRecord>> {
    let pool = db::connect(config).await?;
    let records = store::list_records(&pool).await;
    pool.close().await;
    records
}

/// CLI entry point — prints the history to stdout.
pub async fn run_history(config: &Config) -> Result<()> {
    let records = list_history(config).await?;

    if records.is_empty() {
        println!("No analyses recorded.");
        return Ok(());
    }

    for record in &records {
        println!("[{}] {}", record.id, record.created_at);
        println!("  damage:   {}", record.damage_type);
        if !record.location.is_empty() {
            println!("  location: {}", record.location);
        }
        println!(
            "  cost:     {:.2} INR / {:.2} USD / {:.2} JPY",
            record.cost_inr, record.cost_usd, record.cost_yen
        );
        if !record.notes.is_empty() {
            println!("  notes:    {}", record.notes);
        }
        println!("  image:    {}", record.image_path);
        println!();
    }

    Ok(())
}
