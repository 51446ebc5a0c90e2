//! Manual access to due summaries.

use crate::models::DueSummary;
use crate::paths::DueParams;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use mongodb::bson::Bson;
use serde_json::Value;
use service_core::error::AppError;

/// Current summary document for a due.
pub async fn get_summary(
    State(state): State<AppState>,
    Path((org_id, due_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let due = DueParams::new(org_id, due_id);
    let summary = state
        .store
        .get_summary(&due)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No summary for {}", due)))?;

    Ok(Json(Bson::Document(summary).into_relaxed_extjson()))
}

/// Run the aggregation for a due on demand and return the result.
pub async fn recompute_summary(
    State(state): State<AppState>,
    Path((org_id, due_id)): Path<(String, String)>,
) -> Result<Json<DueSummary>, AppError> {
    let due = DueParams::new(org_id, due_id);
    tracing::info!(due = %due, "Manual summary recompute requested");

    let summary = state.router.aggregation().handle(&due).await?;
    Ok(Json(summary))
}
