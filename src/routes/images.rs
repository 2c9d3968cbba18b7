//! Image upload endpoints

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    routing::{delete, get, post},
};
use pocketbook_core::images::public_path;
use pocketbook_core::{ImageDetails, PocketError};
use serde::Serialize;

use crate::routes::{AppError, MessageResponse};
use crate::state::AppState;

/// Multipart field the upload is read from
const IMAGE_FIELD: &str = "image";

const NO_IMAGE: &str = "Please choose an image";

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/images", get(list_images))
        .route("/api/images/details", get(image_details))
        .route("/api/delete-image/{filename}", delete(delete_image))
}

/// Description of the stored upload
#[derive(Serialize)]
pub struct UploadedFile {
    pub fieldname: String,
    pub originalname: String,
    pub mimetype: Option<String>,
    pub destination: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: UploadedFile,
    /// Public path the image is served under
    pub path: String,
}

/// POST /api/upload - Store the multipart "image" field
async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| PocketError::Validation(NO_IMAGE.into()))?;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(original_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        if bytes.is_empty() {
            break;
        }

        let mut images = state.images.lock().await;
        let meta = images.upload(&original_name, content_type.as_deref(), &bytes)?;
        let destination = images.dir().to_path_buf();
        drop(images);

        return Ok(Json(UploadResponse {
            message: "Image uploaded".to_string(),
            path: public_path(&meta.filename),
            file: UploadedFile {
                fieldname: IMAGE_FIELD.to_string(),
                originalname: meta.original_name,
                mimetype: meta.content_type,
                destination: destination.display().to_string(),
                path: destination.join(&meta.filename).display().to_string(),
                filename: meta.filename,
                size: meta.size,
            },
        }));
    }

    Err(PocketError::Validation(NO_IMAGE.into()).into())
}

fn bad_multipart(err: MultipartError) -> PocketError {
    PocketError::Validation(err.body_text())
}

/// GET /api/images - Public paths of every stored image
async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let paths = state.images.lock().await.list()?;
    Ok(Json(paths))
}

/// GET /api/images/details - Stored images with their upload metadata
async fn image_details(State(state): State<AppState>) -> Result<Json<Vec<ImageDetails>>, AppError> {
    let details = state.images.lock().await.details()?;
    Ok(Json(details))
}

/// DELETE /api/delete-image/:filename - Delete a stored image
async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.images.lock().await.delete(&filename)?;

    Ok(Json(MessageResponse {
        message: "Image deleted".to_string(),
    }))
}
