use anyhow::Context;
use bytes::Bytes;
use rand::Rng;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::{error::AppError, state::AppState};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];
pub(crate) const IMAGE_NOT_FOUND: &str = "image not found";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub message: String,
    pub image_url: String,
    pub filename: String,
}

pub fn check_content_type(ct: &str) -> Result<(), AppError> {
    if ALLOWED_TYPES.contains(&ct) {
        return Ok(());
    }
    Err(AppError::UnsupportedMedia(format!(
        "file type not allowed; accepted types: {}",
        ALLOWED_TYPES.join(", ")
    )))
}

pub fn too_large() -> AppError {
    AppError::UnsupportedMedia("file too large (max 5MB)".into())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// `image-<unix millis>-<random>.<ext>`
fn generate_filename(ct: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let ext = ext_from_mime(ct).unwrap_or("bin");
    format!("image-{}-{}.{}", millis, suffix, ext)
}

/// Only names this service could have generated are looked up; anything with
/// path separators or `..` is treated as absent.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub fn public_url(base_url: &str, filename: &str) -> String {
    format!("{}/upload/{}", base_url.trim_end_matches('/'), filename)
}

pub async fn store_image(
    st: &AppState,
    body: Bytes,
    content_type: &str,
) -> Result<UploadedImage, AppError> {
    check_content_type(content_type)?;
    if body.is_empty() {
        return Err(AppError::Validation("no image uploaded".into()));
    }
    if body.len() > MAX_IMAGE_BYTES {
        return Err(too_large());
    }

    let filename = generate_filename(content_type);
    let size = body.len();
    st.storage
        .put(&filename, body, content_type)
        .await
        .with_context(|| format!("store image {}", filename))?;
    info!(%filename, size, "image stored");

    Ok(UploadedImage {
        message: "image uploaded".into(),
        image_url: public_url(&st.config.public_base_url, &filename),
        filename,
    })
}

/// Bytes and content type of a stored image.
pub async fn fetch_image(st: &AppState, filename: &str) -> Result<(Bytes, String), AppError> {
    if !is_safe_filename(filename) {
        return Err(AppError::NotFound(IMAGE_NOT_FOUND.into()));
    }
    let body = st
        .storage
        .get(filename)
        .await?
        .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND.into()))?;
    let mime = mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string();
    Ok((body, mime))
}

pub async fn remove_image(st: &AppState, filename: &str) -> Result<(), AppError> {
    if !is_safe_filename(filename) || !st.storage.delete(filename).await? {
        return Err(AppError::NotFound(IMAGE_NOT_FOUND.into()));
    }
    info!(%filename, "image deleted");
    Ok(())
}
