//! Financial record endpoints

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get},
};
use pocketbook_core::Record;
use serde_json::Value;
use tracing::info;

use crate::routes::{AppError, SuccessResponse, json_body, parse_id};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/records", get(list_records).post(create_record))
        .route("/api/records/{id}", delete(delete_record))
}

/// GET /api/records - List every record in insertion order
async fn list_records(State(state): State<AppState>) -> Json<Vec<Value>> {
    let records = state.records.lock().await;
    Json(records.list().to_vec())
}

/// POST /api/records - Add a record
async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), AppError> {
    let body = json_body(body)?;
    let record = state.records.lock().await.create(body)?;

    info!(id = record.id, item = %record.item, amount = record.amount, "Added record");
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/records/:id - Delete a record
async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = parse_id::<Record>(&id)?;
    state.records.lock().await.delete_by_id(id)?;

    info!(id, "Deleted record");
    Ok(SuccessResponse::ok())
}
