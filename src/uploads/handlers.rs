use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::BytesMut;
use tracing::{instrument, warn};

use super::services::{self, UploadedImage, MAX_IMAGE_BYTES};
use crate::{api::MessageResponse, auth::AuthUser, error::AppError, state::AppState};

/// Leaves room above the image limit so an oversized file is reported as such
/// rather than as a truncated body.
const UPLOAD_BODY_LIMIT: usize = 2 * MAX_IMAGE_BYTES;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/upload/:filename", get(get_image).delete(delete_image))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return services::too_large();
    }
    AppError::Validation(format!("invalid multipart body: {}", e.body_text()))
}

/// POST /upload (multipart, field `image`)
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadedImage>, AppError> {
    let mut mp = multipart.map_err(|e| AppError::Validation(e.body_text()))?;

    while let Some(mut field) = mp.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if let Err(e) = services::check_content_type(&content_type) {
            warn!(%content_type, "upload rejected: type");
            return Err(e);
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if buf.len() + chunk.len() > MAX_IMAGE_BYTES {
                warn!(%content_type, "upload rejected: size");
                return Err(services::too_large());
            }
            buf.extend_from_slice(&chunk);
        }

        let stored = services::store_image(&state, buf.freeze(), &content_type).await?;
        return Ok(Json(stored));
    }

    Err(AppError::Validation("no image uploaded".into()))
}

/// GET /upload/:filename, public.
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (body, mime) = services::fetch_image(&state, &filename).await?;
    Ok(([(header::CONTENT_TYPE, mime)], body))
}

#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::remove_image(&state, &filename).await?;
    Ok(Json(MessageResponse::new("image deleted")))
}
