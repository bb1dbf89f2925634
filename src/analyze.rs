//! Assessment orchestration.
//!
//! Coordinates the full analyze flow: store the upload → query the vision
//! model → decode-repair its answer → normalize → persist. Format and
//! content problems in the model's answer are absorbed along the way and
//! never reach the caller. Collaborator failures (model call, blob write,
//! persistence) are caught at [`analyze_contained`] and returned as a
//! structured error payload instead of a fault; no record is written when a
//! step before persistence fails.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::decode::decode_model_text;
use crate::models::CanonicalAnalysis;
use crate::normalize::normalize;
use crate::store;
use crate::uploads::{mime_for, save_upload};
use crate::vision::{self, ModelClient};

/// Response wrapper: the payload always sits under a single `analysis` key,
/// whether it carries a report or an error marker.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: AnalysisPayload,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Report(CanonicalAnalysis),
    Failure { error: String },
}

/// Run one assessment end to end.
///
/// Returns the canonical analysis with its blob reference attached and a
/// matching record persisted. Errors here are collaborator failures only —
/// the normalization steps cannot fail.
pub async fn analyze_image(
    pool: &SqlitePool,
    config: &Config,
    client: &dyn ModelClient,
    bytes: &[u8],
    filename: &str,
) -> Result<CanonicalAnalysis> {
    let stored = save_upload(&config.uploads.dir, filename, bytes)?;
    tracing::info!(file = %stored.file_name, size = bytes.len(), "stored upload");

    let text = client
        .assess(bytes, mime_for(filename))
        .await
        .with_context(|| format!("{} model call failed", client.name()))?;

    let raw = decode_model_text(&text);
    let mut analysis = normalize(&raw);
    analysis.uploaded_image = Some(stored.reference);

    let id = store::insert_record(pool, &analysis)
        .await
        .context("Failed to persist analysis")?;
    tracing::info!(id, damage = %analysis.damage_type.joined(), "analysis persisted");

    Ok(analysis)
}

/// Containment boundary for the analyze operation: every outcome becomes a
/// structurally valid response. Callers check for the `error` marker instead
/// of handling faults.
pub async fn analyze_contained(
    pool: &SqlitePool,
    config: &Config,
    client: &dyn ModelClient,
    bytes: &[u8],
    filename: &str,
) -> AnalysisResponse {
    match analyze_image(pool, config, client, bytes, filename).await {
        Ok(analysis) => AnalysisResponse {
            analysis: AnalysisPayload::Report(analysis),
        },
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "analysis failed");
            AnalysisResponse {
                analysis: AnalysisPayload::Failure {
                    error: format!("{:#}", e),
                },
            }
        }
    }
}

/// CLI entry point — analyzes a local image file and prints the result.
pub async fn run_analyze(config: &Config, image: &Path) -> Result<()> {
    let bytes = std::fs::read(image)
        .with_context(|| format!("Failed to read image file: {}", image.display()))?;
    let filename = image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.png");

    let client = vision::create_client(&config.model)?;
    let pool = db::connect(config).await?;
    let result = analyze_image(&pool, config, client.as_ref(), &bytes, filename).await;
    pool.close().await;

    let analysis = match result {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("--- Analysis ---");
    println!("damage:     {}", analysis.damage_type.joined());
    if !analysis.location.is_empty() {
        println!("location:   {}", analysis.location);
    }
    println!("cost (INR): {:.2}", analysis.cost_inr);
    println!("cost (USD): {:.2}", analysis.cost_usd);
    println!("cost (JPY): {:.2}", analysis.cost_yen);
    if !analysis.notes.is_empty() {
        println!("notes:      {}", analysis.notes);
    }
    println!(
        "image:      {}",
        analysis.uploaded_image.as_deref().unwrap_or("")
    );

    Ok(())
}
