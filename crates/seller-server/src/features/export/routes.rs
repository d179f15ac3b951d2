//! Export routes

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use super::commands::{ExportService, ExportToSheetCommand, OverwriteSheetCommand};
use crate::api::response::ApiResponse;
use crate::error::AppError;

/// Create export routes
pub fn export_routes() -> Router<ExportService> {
    Router::new()
        .route("/to-sheet", post(export_to_sheet))
        .route("/overwrite-sheet", post(overwrite_sheet))
}

/// POST /to-sheet
#[tracing::instrument(skip(service, command), fields(sheet = %command.sheet_name))]
async fn export_to_sheet(
    State(service): State<ExportService>,
    Json(command): Json<ExportToSheetCommand>,
) -> Result<Response, AppError> {
    let updated_rows = service.export_to_sheet(command).await?;
    Ok(ApiResponse::success(json!({ "updated_rows": updated_rows })).into_response())
}

/// POST /overwrite-sheet
#[tracing::instrument(skip(service, command), fields(data_type = %command.data_type))]
async fn overwrite_sheet(
    State(service): State<ExportService>,
    Json(command): Json<OverwriteSheetCommand>,
) -> Result<Response, AppError> {
    let records = service.overwrite_sheet(command).await?;
    Ok(ApiResponse::success(json!({
        "message": "Successful export.",
        "records": records
    }))
    .into_response())
}
