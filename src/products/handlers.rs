use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CreateProductRequest, UpdateProductRequest},
    repo_types::Product,
    services::{self, PRODUCT_NOT_FOUND},
};
use crate::{
    api::{ApiJson, MessageResponse},
    auth::AdminUser,
    error::{AppError, StoreError},
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
}

fn not_found(e: StoreError) -> AppError {
    match e {
        StoreError::NotFound => AppError::NotFound(PRODUCT_NOT_FOUND.into()),
        other => other.into(),
    }
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let new = services::validate_new(payload)?;
    let product = state.products.create(new).await?;
    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    let id = services::parse_id(&id)?;
    let changes = services::validate_changes(payload)?;
    let product = state.products.update(id, changes).await.map_err(not_found)?;
    info!(product_id = %product.id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = services::parse_id(&id)?;
    state.products.delete(id).await.map_err(not_found)?;
    info!(product_id = %id, "product deleted");
    Ok(Json(MessageResponse::new("product deleted")))
}
