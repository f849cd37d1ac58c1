// src/db/client_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::client::{Client, ClientFields},
};

// Colunas do cliente + username do dono. Usado por todos os SELECTs abaixo.
const CLIENT_COLUMNS: &str = r#"
    c.id, c.name, c.company_name, c.contact_info, c.email, c.phone,
    c.address, c.city, c.state, c.country, c.postal_code, c.website, c.notes,
    c.created_by AS owner_id, u.username AS owner,
    c.created_at, c.updated_at
"#;

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria um cliente. Campos ausentes viram string vazia.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        name: &str,
        fields: &ClientFields,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            WITH c AS (
                INSERT INTO clients (
                    name, company_name, contact_info, email, phone, address,
                    city, state, country, postal_code, website, notes, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING *
            )
            SELECT {CLIENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.created_by
            "#
        );

        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(name)
            .bind(fields.company_name.as_deref().unwrap_or_default())
            .bind(fields.contact_info.as_deref().unwrap_or_default())
            .bind(fields.email.as_deref().unwrap_or_default())
            .bind(fields.phone.as_deref().unwrap_or_default())
            .bind(fields.address.as_deref().unwrap_or_default())
            .bind(fields.city.as_deref().unwrap_or_default())
            .bind(fields.state.as_deref().unwrap_or_default())
            .bind(fields.country.as_deref().unwrap_or_default())
            .bind(fields.postal_code.as_deref().unwrap_or_default())
            .bind(fields.website.as_deref().unwrap_or_default())
            .bind(fields.notes.as_deref().unwrap_or_default())
            .bind(owner_id)
            .fetch_one(executor)
            .await?;

        Ok(client)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c JOIN users u ON u.id = c.created_by WHERE c.id = $1"
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    /// Busca restrita ao dono: cliente de outro vendedor é "não encontrado".
    pub async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Client>, AppError> {
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients c
            JOIN users u ON u.id = c.created_by
            WHERE c.id = $1 AND c.created_by = $2
            "#
        );
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    pub async fn list_owned(
        &self,
        owner_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Client>, AppError> {
        let pattern = search.map(|s| format!("%{}%", s));

        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients c
            JOIN users u ON u.id = c.created_by
            WHERE c.created_by = $1
              AND (
                $2::text IS NULL
                OR c.name ILIKE $2
                OR c.company_name ILIKE $2
                OR c.contact_info ILIKE $2
                OR c.email ILIKE $2
                OR c.phone ILIKE $2
                OR c.address ILIKE $2
                OR c.country ILIKE $2
              )
            ORDER BY c.updated_at DESC
            "#
        );

        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(owner_id)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    /// Grava o cliente inteiro (as mudanças já foram aplicadas em memória).
    pub async fn update(&self, client: &Client) -> Result<Client, AppError> {
        let sql = format!(
            r#"
            WITH c AS (
                UPDATE clients SET
                    name = $2, company_name = $3, contact_info = $4, email = $5,
                    phone = $6, address = $7, city = $8, state = $9, country = $10,
                    postal_code = $11, website = $12, notes = $13, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {CLIENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.created_by
            "#
        );

        let updated = sqlx::query_as::<_, Client>(&sql)
            .bind(client.id)
            .bind(&client.name)
            .bind(&client.company_name)
            .bind(&client.contact_info)
            .bind(&client.email)
            .bind(&client.phone)
            .bind(&client.address)
            .bind(&client.city)
            .bind(&client.state)
            .bind(&client.country)
            .bind(&client.postal_code)
            .bind(&client.website)
            .bind(&client.notes)
            .fetch_one(&self.pool)
            .await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
