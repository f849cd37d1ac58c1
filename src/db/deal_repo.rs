// src/db/deal_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::deal::{Deal, DealFilter, DealStatus, NewDeal},
};

#[derive(Clone)]
pub struct DealRepository {
    pool: PgPool,
}

impl DealRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(&self, executor: E, deal: &NewDeal) -> Result<Deal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Deal>(
            r#"
            INSERT INTO deals (
                title, client_id, client_name, contact_info, requirements, description,
                budget, advance_payment, receipt_file, is_multiproject, initiation_date,
                status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'draft', $12)
            RETURNING *
            "#,
        )
        .bind(&deal.title)
        .bind(deal.client_id)
        .bind(&deal.client_name)
        .bind(&deal.contact_info)
        .bind(&deal.requirements)
        .bind(&deal.description)
        .bind(deal.budget)
        .bind(deal.advance_payment)
        .bind(&deal.receipt_file)
        .bind(deal.is_multiproject)
        .bind(deal.initiation_date)
        .bind(&deal.created_by)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>, AppError> {
        let deal = sqlx::query_as::<_, Deal>("SELECT * FROM deals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(deal)
    }

    /// Mais recentes primeiro. Filtros ausentes não restringem nada.
    pub async fn list(&self, filter: &DealFilter) -> Result<Vec<Deal>, AppError> {
        let deals = sqlx::query_as::<_, Deal>(
            r#"
            SELECT * FROM deals
            WHERE ($1::text IS NULL OR created_by = $1)
              AND ($2::deal_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.created_by.as_deref())
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(deals)
    }

    // Sem predicado de status: a última escrita vence.
    pub async fn update_status(&self, id: Uuid, status: DealStatus) -> Result<Deal, AppError> {
        let deal = sqlx::query_as::<_, Deal>(
            "UPDATE deals SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(deal)
    }

    pub async fn record_verification(
        &self,
        id: Uuid,
        status: DealStatus,
        verifier: &str,
        verified_at: DateTime<Utc>,
        rejection_reason: Option<&str>,
    ) -> Result<Deal, AppError> {
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            UPDATE deals SET
                status = $2,
                verified_by = $3,
                verified_at = $4,
                rejection_reason = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(verifier)
        .bind(verified_at)
        .bind(rejection_reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(deal)
    }

    /// Grava o deal editado inteiro.
    pub async fn save_edit(&self, deal: &Deal) -> Result<Deal, AppError> {
        let saved = sqlx::query_as::<_, Deal>(
            r#"
            UPDATE deals SET
                title = $2, client_name = $3, contact_info = $4, budget = $5,
                requirements = $6, advance_payment = $7, description = $8,
                is_multiproject = $9, initiation_date = $10, receipt_file = $11,
                status = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(deal.id)
        .bind(&deal.title)
        .bind(&deal.client_name)
        .bind(&deal.contact_info)
        .bind(deal.budget)
        .bind(&deal.requirements)
        .bind(deal.advance_payment)
        .bind(&deal.description)
        .bind(deal.is_multiproject)
        .bind(deal.initiation_date)
        .bind(&deal.receipt_file)
        .bind(deal.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
