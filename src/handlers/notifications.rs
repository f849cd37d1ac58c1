// src/handlers/notifications.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::{
    common::{error::AppError, extract::AppQuery},
    config::AppState,
    models::notification::Notification,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationQuery {
    pub recipient: Option<String>,
}

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Notificações do destinatário, mais recentes primeiro", body = Vec<Notification>),
        (status = 400, description = "Destinatário ausente")
    )
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> Result<impl IntoResponse, AppError> {
    let recipient = query
        .recipient
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Validation("Recipient is required".into()))?;

    let notifications = app_state
        .notification_service
        .list_for_recipient(recipient)
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": notifications.len(),
        "notifications": notifications,
    })))
}
