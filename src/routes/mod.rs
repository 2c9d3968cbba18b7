pub mod events;
pub mod images;
pub mod records;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pocketbook_core::{Entity, PocketError, PocketbookConfig, collection::not_found};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

/// Build the full application: API routes, static files, CORS and request tracing.
pub fn app(state: AppState, config: &PocketbookConfig) -> Router {
    let mut api = Router::new().merge(records::router());
    if config.calendar {
        api = api.merge(events::router());
    }
    if config.images {
        api = api.merge(images::router(config.max_upload_bytes));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api.with_state(state)
        .fallback_service(ServeDir::new(config.public_path()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Acknowledgement for deletes
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(SuccessResponse { success: true })
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Convert errors to HTTP responses, picking the status from the core error kind
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<PocketError>() {
            Some(PocketError::Validation(_) | PocketError::InvalidFilename(_)) => {
                StatusCode::BAD_REQUEST
            }
            Some(PocketError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Unwrap a JSON body, turning framework rejections into validation errors.
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, PocketError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| PocketError::Validation(rejection.body_text()))
}

/// Parse an id from the URL. Anything that isn't an id cannot match an entity.
pub(crate) fn parse_id<T: Entity>(raw: &str) -> Result<u64, PocketError> {
    raw.parse().map_err(|_| not_found::<T>(raw))
}
