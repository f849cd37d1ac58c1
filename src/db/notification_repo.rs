// src/db/notification_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::notification::{NewNotification, Notification},
};

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, notification: &NewNotification) -> Result<Notification, AppError> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (recipient, message, kind, link, deal_id, project_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&notification.recipient)
        .bind(&notification.message)
        .bind(notification.kind)
        .bind(&notification.link)
        .bind(notification.deal_id)
        .bind(notification.project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    pub async fn list_for_recipient(&self, recipient: &str) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE recipient = $1 ORDER BY created_at DESC",
        )
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }
}
