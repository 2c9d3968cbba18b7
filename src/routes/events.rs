//! Calendar event endpoints

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use pocketbook_core::Event;
use serde_json::Value;
use tracing::info;

use crate::routes::{AppError, SuccessResponse, json_body, parse_id};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/add-event", post(create_event))
        .route("/api/delete-event/{id}", delete(delete_event))
}

/// GET /api/events - List every event
async fn list_events(State(state): State<AppState>) -> Json<Vec<Value>> {
    let events = state.events.lock().await;
    Json(events.list().to_vec())
}

/// POST /api/add-event - Add an event
async fn create_event(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let body = json_body(body)?;
    let event = state.events.lock().await.create(body)?;

    info!(id = event.id, title = %event.title, "Added event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// DELETE /api/delete-event/:id - Delete an event
async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let id = parse_id::<Event>(&id)?;
    state.events.lock().await.delete_by_id(id)?;

    info!(id, "Deleted event");
    Ok(SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use crate::routes::test_util::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_list_events() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let (status, plain) =
            post_json(&app, "/api/add-event", json!({"title": "Dentist", "start": "2024-03-01"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(plain, json!({"id": 1, "title": "Dentist", "start": "2024-03-01"}));

        let (_, colored) = post_json(
            &app,
            "/api/add-event",
            json!({"title": "Trip", "start": "2024-04-01T09:00", "color": "#ff0000"}),
        )
        .await;
        assert_eq!(colored["id"], json!(2));
        assert_eq!(colored["color"], json!("#ff0000"));

        let (status, list) = get(&app, "/api/events").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([plain, colored]));
    }

    #[tokio::test]
    async fn test_title_and_start_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        for body in [
            json!({"start": "2024-03-01"}),
            json!({"title": "Dentist"}),
            json!({"title": "", "start": "2024-03-01"}),
            json!({}),
        ] {
            let (status, error) = post_json(&app, "/api/add-event", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(error["error"].as_str().unwrap().contains("title and start"));
        }

        let (_, list) = get(&app, "/api/events").await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_delete_event() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        post_json(&app, "/api/add-event", json!({"title": "a", "start": "2024-03-01"})).await;

        let (status, body) = delete(&app, "/api/delete-event/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, _) = delete(&app, "/api/delete-event/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = get(&app, "/api/events").await;
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn test_events_are_written_to_events_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let app = app_with(&config);

        post_json(&app, "/api/add-event", json!({"title": "a", "start": "2024-03-01"})).await;

        let content = std::fs::read_to_string(config.events_file()).unwrap();
        let on_disk: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(on_disk, json!([{"id": 1, "title": "a", "start": "2024-03-01"}]));
    }
}
