// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DealVerification,
    DealStatus,
    ProjectAssignment,
}

// Log append-only: nunca é alterado depois de gravado
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    #[schema(example = "vera.verifier")]
    pub recipient: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub deal_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Notificação ainda não persistida (o que entra no outbox).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient: String,
    pub message: String,
    pub kind: NotificationKind,
    pub link: Option<String>,
    pub deal_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(recipient: impl Into<String>, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            message: message.into(),
            kind,
            link: None,
            deal_id: None,
            project_id: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_deal(mut self, deal_id: Uuid) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    pub fn with_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }
}
