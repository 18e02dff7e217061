use axum::{extract::State, routing::get, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::ContactRequest,
    repo_types::{ContactMessage, NewContactMessage},
};
use crate::{
    api::{ApiJson, MessageResponse},
    auth::AdminUser,
    error::AppError,
    state::AppState,
};

pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/contact", get(list_messages).post(create_message))
}

fn require_fields(req: ContactRequest) -> Result<NewContactMessage, AppError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let message = req.message.trim().to_string();
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(AppError::Validation("all fields are required".into()));
    }
    Ok(NewContactMessage {
        name,
        email,
        message,
    })
}

/// Public contact form.
#[instrument(skip(state, payload))]
pub async fn create_message(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ContactRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let msg = state.contacts.create(require_fields(payload)?).await?;
    info!(message_id = %msg.id, "contact message stored");
    Ok(Json(MessageResponse::new("message received")))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    Ok(Json(state.contacts.list().await?))
}
